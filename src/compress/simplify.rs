use crate::{
    color::Color,
    command::Command,
    foundation::core::Ticks,
    sequence::Node,
};

/// Douglas–Peucker over a ramp-normalized run.
///
/// Breakpoints are the end colors of each node at their cumulative tick. Any
/// span whose interior breakpoints all lie within `epsilon` of the straight
/// interpolation between its endpoints collapses into one `Ramp`, provided
/// the ramp is no longer than `max_span` ticks. Returns the number of
/// collapsed spans; nothing happens for a negative `epsilon`.
pub(crate) fn simplify(nodes: &mut Vec<Node>, epsilon: f64, max_span: Ticks) -> usize {
    if epsilon < 0.0 || nodes.len() < 3 {
        return 0;
    }
    let last = nodes.len() - 1;
    simplify_span(nodes, 0, last, epsilon, max_span)
}

fn end_color(node: &Node) -> Option<Color> {
    node.as_command().and_then(Command::color)
}

fn own_ticks(node: &Node) -> Ticks {
    node.as_command().map_or(0, Command::ticks)
}

fn simplify_span(
    nodes: &mut Vec<Node>,
    first: usize,
    last: usize,
    epsilon: f64,
    max_span: Ticks,
) -> usize {
    if last <= first + 1 {
        return 0;
    }
    let Some(start) = end_color(&nodes[first]) else {
        return 0;
    };
    let Some(end) = end_color(&nodes[last]) else {
        return 0;
    };

    let mut times = Vec::with_capacity(last - first + 1);
    let mut elapsed: Ticks = 0;
    times.push(0);
    for node in &nodes[first + 1..=last] {
        elapsed = elapsed.saturating_add(own_ticks(node));
        times.push(elapsed);
    }
    let span = elapsed;

    let mut max_dev = 0.0_f64;
    let mut max_pos = first;
    for i in first + 1..last {
        let Some(actual) = end_color(&nodes[i]) else {
            return 0;
        };
        let t = if span == 0 {
            0.0
        } else {
            times[i - first] as f64 / span as f64
        };
        let dev = start.lerp(end, t).distance(&actual);
        if dev > max_dev || max_pos == first {
            max_dev = dev;
            max_pos = i;
        }
    }

    if max_dev <= epsilon && span <= max_span {
        let Some(target) = end.to_ints() else {
            return 0;
        };
        let mut annotation = String::new();
        for node in nodes.drain(first + 1..=last) {
            if let Node::Command(mut c) = node {
                annotation.push_str(&c.take_annotation());
            }
        }
        nodes.insert(
            first + 1,
            Command::ramp(target, span).with_annotation(annotation).into(),
        );
        tracing::debug!(first, last, span, max_dev, "collapsed ramp span");
        return 1;
    }

    // Later span first: it only touches indices above `max_pos`.
    simplify_span(nodes, max_pos, last, epsilon, max_span)
        + simplify_span(nodes, first, max_pos, epsilon, max_span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::CommandKind, file::Scope, sequence::Sequence};

    fn render(nodes: &[Node]) -> Vec<Color> {
        let mut seq = Sequence::program();
        seq.extend(nodes.iter().cloned()).unwrap();
        let mut out = Vec::new();
        seq.render_into(Color::BLACK, Scope::detached(), &mut out)
            .unwrap();
        out
    }

    fn linear_steps() -> Vec<Node> {
        vec![
            Command::set_color([0, 0, 0]).into(),
            Command::ramp([10, 10, 10], 10).into(),
            Command::ramp([20, 20, 20], 10).into(),
            Command::ramp([31, 30, 30], 10).into(),
        ]
    }

    #[test]
    fn negative_epsilon_is_a_no_op() {
        let mut nodes = linear_steps();
        assert_eq!(simplify(&mut nodes, -1.0, Ticks::MAX), 0);
        assert_eq!(nodes, linear_steps());
    }

    #[test]
    fn near_linear_run_collapses_into_one_ramp() {
        let mut nodes = linear_steps();
        let before = render(&nodes);
        assert_eq!(simplify(&mut nodes, 1.0, Ticks::MAX), 1);
        assert_eq!(nodes.len(), 2);
        let ramp = nodes[1].as_command().unwrap();
        assert_eq!(ramp.kind(), CommandKind::Ramp);
        assert_eq!(ramp.ticks(), 30);

        let after = render(&nodes);
        assert_eq!(after.len(), before.len());
        assert!(
            before
                .iter()
                .zip(&after)
                .all(|(a, b)| a.distance(b) <= 2.0)
        );
    }

    #[test]
    fn sharp_corner_is_kept() {
        let mut nodes: Vec<Node> = vec![
            Command::set_color([0, 0, 0]).into(),
            Command::ramp([200, 0, 0], 10).into(),
            Command::ramp([0, 0, 0], 10).into(),
        ];
        assert_eq!(simplify(&mut nodes, 5.0, Ticks::MAX), 0);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn span_longer_than_the_limit_is_not_collapsed() {
        let steps = || -> Vec<Node> {
            vec![
                Command::set_color([0, 0, 0]).into(),
                Command::ramp([100, 100, 100], 40000).into(),
                Command::ramp([200, 200, 200], 40000).into(),
            ]
        };

        let mut nodes = steps();
        assert_eq!(simplify(&mut nodes, 1.0, 65535), 0);
        assert_eq!(nodes, steps());

        let mut nodes = steps();
        assert_eq!(simplify(&mut nodes, 1.0, 80000), 1);
        assert_eq!(nodes[1].as_command().unwrap().ticks(), 80000);
    }
}

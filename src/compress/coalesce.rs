use crate::{
    command::{Command, CommandKind},
    foundation::core::Ticks,
    sequence::Node,
};

/// Merge every maximal run of `Delay`/`NoOp` nodes that contains at least one
/// delay into a single delay carrying the run's comments in order.
pub(crate) fn coalesce_delays(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut run: Vec<Node> = Vec::new();
    for node in nodes {
        if node.is_command(CommandKind::Delay) || node.is_command(CommandKind::NoOp) {
            run.push(node);
            continue;
        }
        flush_run(&mut run, &mut out);
        out.push(node);
    }
    flush_run(&mut run, &mut out);
    out
}

fn flush_run(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    if !run.iter().any(|n| n.is_command(CommandKind::Delay)) {
        out.append(run);
        return;
    }

    let mut total: Ticks = 0;
    let mut annotation = String::new();
    for node in run.drain(..) {
        if let Node::Command(mut c) = node {
            total = total.saturating_add(c.ticks());
            annotation.push_str(&c.take_annotation());
        }
    }
    out.push(Command::delay(total).with_annotation(annotation).into());
}

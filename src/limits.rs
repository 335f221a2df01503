use crate::{
    command::{Command, CommandKind},
    file::GloFile,
    foundation::{
        core::{Limits, Ticks},
        error::{GloError, GloResult},
    },
    sequence::{Node, Sequence, SequenceKind},
};

/// Counters reported by [`resolve_limits`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LimitStats {
    /// Delays longer than `max_delay` split into a run of shorter delays.
    pub delays_split: usize,
    /// Zero-tick delays replaced by a comment.
    pub delays_dropped: usize,
    /// Zero-tick ramps replaced by an instant `SetColor`.
    pub ramps_flattened: usize,
    /// Loops with a count above `max_loop` factored into nested loops.
    pub loops_unfolded: usize,
    /// Loops with a count of 0 or 1 removed or inlined.
    pub loops_removed: usize,
}

/// Rewrite the whole file so every delay fits in `(0, max_delay]` and every
/// loop count in `[2, max_loop]`, preserving duration and render exactly.
///
/// Subroutine bodies are rewritten too. Fails with [`GloError::Limit`] on a
/// ramp longer than `max_delay`, and with a validation error when `limits`
/// itself is invalid.
#[tracing::instrument(skip(file))]
pub fn resolve_limits(file: &mut GloFile, limits: &Limits) -> GloResult<LimitStats> {
    limits.validate()?;
    let mut r = Resolver {
        limits: *limits,
        stats: LimitStats::default(),
    };
    r.sequence_in_place(file.main_mut())?;
    for sub in file.subroutines_mut() {
        r.sequence_in_place(sub)?;
    }
    tracing::debug!(stats = ?r.stats, "limits resolved");
    Ok(r.stats)
}

struct Resolver {
    limits: Limits,
    stats: LimitStats,
}

impl Resolver {
    fn sequence_in_place(&mut self, seq: &mut Sequence) -> GloResult<()> {
        let children = self.nodes(seq.take_children())?;
        seq.set_children(children)
    }

    fn nodes(&mut self, nodes: Vec<Node>) -> GloResult<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            out.extend(self.node(node)?);
        }
        Ok(out)
    }

    fn node(&mut self, node: Node) -> GloResult<Vec<Node>> {
        match node {
            Node::Command(c) => self.command(c),
            Node::Sequence(s) if s.kind() == SequenceKind::Loop => self.looped(s),
            Node::Sequence(mut s) => {
                self.sequence_in_place(&mut s)?;
                Ok(vec![s.into()])
            }
        }
    }

    fn command(&mut self, mut cmd: Command) -> GloResult<Vec<Node>> {
        let max = self.limits.max_delay;
        match cmd.kind() {
            CommandKind::Delay => {
                let d = cmd.ticks();
                if d == 0 {
                    self.stats.delays_dropped += 1;
                    let note = format!("; DELAY RESOLVE: 0{}", cmd.annotation());
                    return Ok(vec![Command::noop(note).into()]);
                }
                if d <= max {
                    return Ok(vec![cmd.into()]);
                }
                self.stats.delays_split += 1;
                tracing::debug!(delay = d, max, "splitting delay");
                let note = format!("; DELAY RESOLVE: {d}{}", cmd.annotation());
                let mut out: Vec<Node> = vec![Command::noop(note).into()];
                let full = d / max;
                out.extend((0..full).map(|_| Node::from(Command::delay(max))));
                let rest: Ticks = d % max;
                if rest > 0 {
                    out.push(Command::delay(rest).into());
                }
                Ok(out)
            }
            CommandKind::Ramp => {
                let d = cmd.ticks();
                if d > max {
                    return Err(GloError::limit(format!(
                        "ramp of {d} ticks exceeds max delay {max}: {}",
                        cmd.describe()
                    )));
                }
                if d > 0 {
                    return Ok(vec![cmd.into()]);
                }
                let Some(rgb) = cmd.color().and_then(|c| c.to_ints()) else {
                    return Err(GloError::validation(format!(
                        "ramp without a target color: {}",
                        cmd.describe()
                    )));
                };
                self.stats.ramps_flattened += 1;
                let ann = cmd.take_annotation();
                Ok(vec![Command::set_color(rgb).with_annotation(ann).into()])
            }
            _ => Ok(vec![cmd.into()]),
        }
    }

    fn looped(&mut self, mut lp: Sequence) -> GloResult<Vec<Node>> {
        let body = self.nodes(lp.take_children())?;
        let n = lp.repeat_count();
        let annotation = lp.take_annotation();
        let note = || -> Option<Node> {
            (!annotation.is_empty()).then(|| Command::noop(annotation.clone()).into())
        };

        match n {
            0 => {
                self.stats.loops_removed += 1;
                Ok(note().into_iter().collect())
            }
            1 => {
                self.stats.loops_removed += 1;
                let mut out: Vec<Node> = note().into_iter().collect();
                out.extend(body);
                Ok(out)
            }
            n if n <= self.limits.max_loop => {
                let mut lp = lp.with_annotation(annotation);
                lp.set_children(body)?;
                Ok(vec![lp.into()])
            }
            n => {
                self.stats.loops_unfolded += 1;
                let max = self.limits.max_loop;
                let (q, m, r) = unfold_factors(n, max);
                tracing::debug!(count = n, q, m, r, "unfolding loop");

                let mut inner = Sequence::looped(m);
                inner.set_children(body.clone())?;
                let mut outer = Sequence::looped(q)
                    .with_annotation(format!("; LOOP UNFOLD: {q} * {m} + {r} = {n}{annotation}"));
                outer.push(inner)?;

                let mut out = self.looped(outer)?;
                if r > 0 {
                    let mut rest = Sequence::looped(r);
                    rest.set_children(body)?;
                    out.extend(self.looped(rest)?);
                }
                Ok(out)
            }
        }
    }
}

/// Factor `n = q * m + r` with `m <= max`. Prefers the largest exact divisor
/// above 2; otherwise `m = max` and `r = n % max`.
///
/// Returns `(q, m, r)`.
pub fn unfold_factors(n: u64, max: u64) -> (u64, u64, u64) {
    let m = (3..=max.min(n)).rev().find(|d| n % d == 0);
    match m {
        Some(m) => (n / m, m, 0),
        None => {
            let r = n % max;
            ((n - r) / max, max, r)
        }
    }
}

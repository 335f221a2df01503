use crate::{
    command::{Command, CommandKind},
    sequence::Node,
};

use super::coalesce::coalesce_delays;

/// A child list can be normalized to ramps when it only moves the timeline
/// and starts from a known color.
pub(crate) fn qualifies(nodes: &[Node]) -> bool {
    nodes
        .first()
        .is_some_and(|n| n.is_command(CommandKind::SetColor))
        && nodes
            .iter()
            .all(|n| n.as_command().is_some_and(|c| c.kind().is_timeline()))
}

pub(crate) fn rgb(cmd: &Command) -> Option<[i64; 3]> {
    cmd.color().and_then(|c| c.to_ints())
}

fn into_command(node: Node) -> Result<Command, Node> {
    match node {
        Node::Command(c) => Ok(c),
        other => Err(other),
    }
}

/// Rewrite a qualifying run so that every node after the first `SetColor` is a
/// `Ramp` with the same per-tick color profile.
pub(crate) fn to_ramps(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len() + 1);
    let mut trailing: Option<[i64; 3]> = None;
    let mut iter = nodes.into_iter().map(into_command).peekable();

    while let Some(item) = iter.next() {
        let mut cmd = match item {
            Ok(c) => c,
            Err(node) => {
                out.push(node);
                continue;
            }
        };
        match (cmd.kind(), trailing) {
            (CommandKind::SetColor, None) => {
                trailing = rgb(&cmd);
                out.push(cmd.into());
            }
            (CommandKind::SetColor, Some(_)) => match rgb(&cmd) {
                Some(c) => {
                    let ann = cmd.take_annotation();
                    out.push(Command::ramp(c, 0).with_annotation(ann).into());
                    trailing = Some(c);
                }
                None => out.push(cmd.into()),
            },
            (CommandKind::Ramp, _) => {
                trailing = rgb(&cmd).or(trailing);
                out.push(cmd.into());
            }
            (CommandKind::Delay, Some(cur)) => {
                let d = cmd.ticks();
                let next = match iter.peek() {
                    Some(Ok(n)) if n.kind() == CommandKind::SetColor => {
                        rgb(n).filter(|c| *c != cur)
                    }
                    _ => None,
                };
                match next {
                    Some(next) if d >= 1 => {
                        let set_ann = match iter.next() {
                            Some(Ok(mut set)) => set.take_annotation(),
                            _ => String::new(),
                        };
                        let mut ann = cmd.take_annotation();
                        if d > 1 {
                            out.push(Command::ramp(cur, d - 1).with_annotation(ann).into());
                            ann = String::new();
                        }
                        ann.push_str(&set_ann);
                        out.push(Command::ramp(next, 1).with_annotation(ann).into());
                        trailing = Some(next);
                    }
                    _ => {
                        let ann = cmd.take_annotation();
                        out.push(Command::ramp(cur, d).with_annotation(ann).into());
                    }
                }
            }
            _ => out.push(cmd.into()),
        }
    }
    out
}

/// Inverse of [`to_ramps`]: express flat, instant and one-tick ramps with
/// `Delay`/`SetColor`, then coalesce adjacent delays.
pub(crate) fn from_ramps(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut trailing: Option<[i64; 3]> = None;

    for node in nodes {
        let mut cmd = match into_command(node) {
            Ok(c) => c,
            Err(node) => {
                out.push(node);
                continue;
            }
        };
        match cmd.kind() {
            CommandKind::Ramp => {
                let Some(target) = rgb(&cmd) else {
                    out.push(cmd.into());
                    continue;
                };
                let d = cmd.ticks();
                if d == 0 {
                    let ann = cmd.take_annotation();
                    out.push(Command::set_color(target).with_annotation(ann).into());
                } else if trailing == Some(target) {
                    let ann = cmd.take_annotation();
                    out.push(Command::delay(d).with_annotation(ann).into());
                } else if d == 1 {
                    let ann = cmd.take_annotation();
                    out.push(Command::delay(1).with_annotation(ann).into());
                    out.push(Command::set_color(target).into());
                } else {
                    out.push(cmd.into());
                }
                trailing = Some(target);
            }
            CommandKind::SetColor => {
                trailing = rgb(&cmd).or(trailing);
                out.push(cmd.into());
            }
            _ => out.push(cmd.into()),
        }
    }
    coalesce_delays(out)
}

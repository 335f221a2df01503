use crate::{
    args::Value,
    command::{Command, CommandKind},
    file::{GloFile, Scope},
    foundation::{
        core::Ticks,
        error::{GloError, GloResult},
    },
    labels::Labels,
    sequence::Node,
};

/// What a `time` anchor asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AnchorMode {
    /// Pad with a delay until the target time.
    Set,
    /// Move the time reference without emitting anything.
    SetRef,
}

impl AnchorMode {
    fn parse(word: &str) -> GloResult<Self> {
        match word {
            "set" => Ok(Self::Set),
            "setref" => Ok(Self::SetRef),
            other => Err(GloError::resolution(format!(
                "unknown time anchor mode '{other}' (expected set or setref)"
            ))),
        }
    }
}

fn anchor_target(cmd: &Command, labels: Option<&Labels>) -> GloResult<(AnchorMode, i128)> {
    let values = cmd.args().flatten();
    let mode = match values.first() {
        Some(Value::Ident(m)) => AnchorMode::parse(m)?,
        _ => {
            return Err(GloError::validation(format!(
                "malformed time anchor: {}",
                cmd.describe()
            )));
        }
    };
    let label_start = |name: &str| -> GloResult<i128> {
        let labels = labels.ok_or_else(|| {
            GloError::resolution(format!(
                "time anchor names label '{name}' but no label table was given"
            ))
        })?;
        Ok(i128::from(labels.label_start(name)?))
    };
    let target = match &values[1..] {
        [Value::Int(t)] => i128::from(*t),
        [Value::Ident(label)] => label_start(label)?,
        [Value::Ident(label), Value::Int(delta)] => label_start(label)? + i128::from(*delta),
        _ => {
            return Err(GloError::validation(format!(
                "malformed time anchor: {}",
                cmd.describe()
            )));
        }
    };
    Ok((mode, target))
}

/// Replace every top-level `time` anchor with the delay needed to reach its
/// target. Returns the number of anchors resolved.
#[tracing::instrument(skip(file, labels))]
pub fn resolve_time(file: &mut GloFile, labels: Option<&Labels>) -> GloResult<usize> {
    let children = file.main().children().to_vec();
    let (nodes, count) = resolve_children(children, Scope::root(file), labels)?;
    file.main_mut().set_children(nodes)?;
    Ok(count)
}

fn resolve_children(
    children: Vec<Node>,
    scope: Scope<'_>,
    labels: Option<&Labels>,
) -> GloResult<(Vec<Node>, usize)> {
    let mut out = Vec::with_capacity(children.len());
    let mut elapsed: i128 = 0;
    let mut reference: i128 = 0;
    let mut count = 0;

    for node in children {
        let anchor = match node {
            Node::Command(c) if c.kind() == CommandKind::TimeAnchor => c,
            other => {
                elapsed += i128::from(other.duration(scope)?);
                out.push(other);
                continue;
            }
        };
        count += 1;
        let (mode, target) = anchor_target(&anchor, labels)?;
        match mode {
            AnchorMode::SetRef => {
                tracing::debug!(reference = target, "time reference moved");
                reference = target;
                if !anchor.annotation().is_empty() {
                    out.push(Command::noop(anchor.annotation()).into());
                }
            }
            AnchorMode::Set => {
                let absolute = reference + target;
                let shift = absolute - elapsed;
                if shift < 0 {
                    return Err(GloError::limit(format!(
                        "time anchor '{}' targets tick {absolute} but {elapsed} ticks have already elapsed",
                        anchor.args().body_string()
                    )));
                }
                if shift > 0 {
                    let ticks = Ticks::try_from(shift).map_err(|_| {
                        GloError::limit(format!("time shift {shift} does not fit in ticks"))
                    })?;
                    tracing::debug!(elapsed, target = absolute, shift, "time anchor resolved");
                    out.push(
                        Command::noop(format!(
                            "; TIME RESOLVE: {} at {elapsed} -> {absolute}{}",
                            anchor.args().body_string(),
                            anchor.annotation()
                        ))
                        .into(),
                    );
                    out.push(Command::delay(ticks).into());
                    elapsed = absolute;
                } else if !anchor.annotation().is_empty() {
                    out.push(Command::noop(anchor.annotation()).into());
                }
            }
        }
    }
    Ok((out, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args::{Arg, Arguments},
        sequence::Sequence,
        style::ExportOpts,
    };

    fn anchor(values: &[Value]) -> Command {
        let items = values.iter().cloned().map(Arg::Value).collect();
        Command::new(CommandKind::TimeAnchor, Arguments::new(items), "").unwrap()
    }

    fn ident(s: &str) -> Value {
        Value::Ident(s.into())
    }

    fn file(nodes: Vec<Node>) -> GloFile {
        let mut main = Sequence::program();
        main.extend(nodes).unwrap();
        GloFile::new(main)
    }

    #[test]
    fn set_pads_to_literal_target() {
        let mut f = file(vec![
            Command::set_color([1, 1, 1]).into(),
            Command::delay(30).into(),
            anchor(&[ident("set"), Value::Int(100)]).into(),
            Command::set_color([2, 2, 2]).into(),
        ]);
        assert_eq!(resolve_time(&mut f, None).unwrap(), 1);
        assert_eq!(
            f.export(&ExportOpts::default()),
            "color (1, 1, 1)\ndelay (30)\n; TIME RESOLVE: set, 100 at 30 -> 100\ndelay (70)\ncolor (2, 2, 2)\nend"
        );
        assert_eq!(f.duration().unwrap(), 100);
    }

    #[test]
    fn exact_target_inserts_nothing() {
        let mut f = file(vec![
            Command::delay(50).into(),
            anchor(&[ident("set"), Value::Int(50)]).into(),
        ]);
        resolve_time(&mut f, None).unwrap();
        assert_eq!(f.export(&ExportOpts::default()), "delay (50)\nend");
    }

    #[test]
    fn comments_on_silent_anchors_are_kept() {
        let mut f = file(vec![
            Command::delay(50).into(),
            anchor(&[ident("set"), Value::Int(50)])
                .with_annotation(" ; chorus")
                .into(),
            anchor(&[ident("setref"), Value::Int(50)])
                .with_annotation(" ; bar 2")
                .into(),
        ]);
        assert_eq!(resolve_time(&mut f, None).unwrap(), 2);
        assert_eq!(
            f.export(&ExportOpts::default()),
            "delay (50)\n ; chorus\n ; bar 2\nend"
        );
        assert_eq!(f.duration().unwrap(), 50);
    }

    #[test]
    fn setref_shifts_later_targets_and_labels_resolve() {
        let mut labels = Labels::new();
        labels.insert("drop", 40, 60);
        let mut f = file(vec![
            anchor(&[ident("setref"), Value::Int(10)]).into(),
            anchor(&[ident("set"), ident("drop"), Value::Int(-5)]).into(),
        ]);
        resolve_time(&mut f, Some(&labels)).unwrap();
        assert_eq!(f.duration().unwrap(), 45);
    }

    #[test]
    fn past_target_is_a_limit_error() {
        let mut f = file(vec![
            Command::delay(50).into(),
            anchor(&[ident("set"), Value::Int(20)]).into(),
        ]);
        assert!(matches!(resolve_time(&mut f, None), Err(GloError::Limit(_))));
    }

    #[test]
    fn unresolvable_anchors_are_resolution_errors() {
        let mut f = file(vec![anchor(&[ident("jump"), Value::Int(20)]).into()]);
        assert!(matches!(resolve_time(&mut f, None), Err(GloError::Resolution(_))));

        let mut f = file(vec![anchor(&[ident("set"), ident("intro")]).into()]);
        assert!(matches!(resolve_time(&mut f, None), Err(GloError::Resolution(_))));
        assert!(matches!(
            resolve_time(&mut f, Some(&Labels::new())),
            Err(GloError::Resolution(_))
        ));
    }
}

use std::hash::{Hash, Hasher};

use crate::{
    args::{Arguments, Value},
    color::Color,
    file::Scope,
    foundation::{
        core::Ticks,
        error::{GloError, GloResult},
    },
    style::{ExportOpts, Styles, command_spelling, format_line},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    TimeAnchor,
    ConstantDefine,
    NoOp,
    Delay,
    SetColor,
    SetRed,
    SetGreen,
    SetBlue,
    Ramp,
    SubroutineCall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Int,
    Ident,
}

/// One admissible argument shape, matched against the flattened list.
#[derive(Clone, Copy, Debug)]
pub enum Shape {
    Fixed(&'static [ArgType]),
    OneOrMore(ArgType),
}

impl Shape {
    fn matches(&self, flat: &[Value]) -> bool {
        fn is(t: ArgType, v: &Value) -> bool {
            matches!(
                (t, v),
                (ArgType::Int, Value::Int(_)) | (ArgType::Ident, Value::Ident(_))
            )
        }
        match self {
            Shape::Fixed(types) => {
                types.len() == flat.len() && types.iter().zip(flat).all(|(t, v)| is(*t, v))
            }
            Shape::OneOrMore(t) => !flat.is_empty() && flat.iter().all(|v| is(*t, v)),
        }
    }
}

pub(crate) fn check_shapes(what: &str, shapes: &[Shape], args: &Arguments) -> GloResult<()> {
    let flat = args.flatten();
    if shapes.iter().any(|s| s.matches(&flat)) {
        return Ok(());
    }
    Err(GloError::validation(format!(
        "{what} does not accept arguments ({})",
        flat.iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

use ArgType::{Ident, Int};

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::TimeAnchor,
        CommandKind::ConstantDefine,
        CommandKind::NoOp,
        CommandKind::Delay,
        CommandKind::SetColor,
        CommandKind::SetRed,
        CommandKind::SetGreen,
        CommandKind::SetBlue,
        CommandKind::Ramp,
        CommandKind::SubroutineCall,
    ];

    pub fn shapes(self) -> &'static [Shape] {
        match self {
            CommandKind::TimeAnchor => &[
                Shape::Fixed(&[Ident, Int]),
                Shape::Fixed(&[Ident, Ident]),
                Shape::Fixed(&[Ident, Ident, Int]),
            ],
            CommandKind::ConstantDefine => &[Shape::OneOrMore(Int)],
            CommandKind::NoOp => &[Shape::Fixed(&[])],
            CommandKind::Delay => &[Shape::Fixed(&[Int])],
            CommandKind::SetColor => &[Shape::Fixed(&[Int, Int, Int])],
            CommandKind::SetRed | CommandKind::SetGreen | CommandKind::SetBlue => {
                &[Shape::Fixed(&[Int])]
            }
            CommandKind::Ramp => &[Shape::Fixed(&[Int, Int, Int, Int])],
            CommandKind::SubroutineCall => &[Shape::Fixed(&[Ident])],
        }
    }

    /// Kinds that only change the trailing color and time.
    pub fn is_timeline(self) -> bool {
        matches!(
            self,
            CommandKind::Delay | CommandKind::SetColor | CommandKind::Ramp
        )
    }
}

/// A single command node.
///
/// The annotation is raw trailing source text (`" ; comment"`) or a pass
/// diagnostic. It is printed verbatim and never affects equality, duration or
/// rendering.
#[derive(Clone, Debug)]
pub struct Command {
    kind: CommandKind,
    args: Arguments,
    annotation: String,
}

impl Command {
    /// Build a command, rejecting argument lists that fit none of the kind's shapes.
    pub fn new(
        kind: CommandKind,
        args: Arguments,
        annotation: impl Into<String>,
    ) -> GloResult<Self> {
        check_shapes(&format!("{kind:?}"), kind.shapes(), &args)?;
        let cmd = Self {
            kind,
            args,
            annotation: annotation.into(),
        };
        cmd.check_ranges()?;
        Ok(cmd)
    }

    fn check_ranges(&self) -> GloResult<()> {
        let ints = self.ints();
        let bad = |msg: &str| {
            Err(GloError::validation(format!(
                "{msg}: {}",
                self.describe()
            )))
        };
        match self.kind {
            CommandKind::Delay if ints[0] < 0 => bad("delay must be >= 0"),
            CommandKind::Ramp if ints[3] < 0 => bad("ramp duration must be >= 0"),
            CommandKind::SetColor | CommandKind::Ramp
                if ints.iter().take(3).any(|c| !(0..=255).contains(c)) =>
            {
                bad("color channels must be within 0..=255")
            }
            CommandKind::SetRed | CommandKind::SetGreen | CommandKind::SetBlue
                if !(0..=255).contains(&ints[0]) =>
            {
                bad("color channel must be within 0..=255")
            }
            _ => Ok(()),
        }
    }

    pub fn noop(annotation: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::NoOp,
            args: Arguments::empty(),
            annotation: annotation.into(),
        }
    }

    pub(crate) fn delay(ticks: Ticks) -> Self {
        Self {
            kind: CommandKind::Delay,
            args: Arguments::from_ints(&[ticks_to_i64(ticks)]),
            annotation: String::new(),
        }
    }

    pub(crate) fn set_color(rgb: [i64; 3]) -> Self {
        Self {
            kind: CommandKind::SetColor,
            args: Arguments::from_ints(&rgb),
            annotation: String::new(),
        }
    }

    pub(crate) fn ramp(rgb: [i64; 3], ticks: Ticks) -> Self {
        Self {
            kind: CommandKind::Ramp,
            args: Arguments::from_ints(&[rgb[0], rgb[1], rgb[2], ticks_to_i64(ticks)]),
            annotation: String::new(),
        }
    }

    pub(crate) fn call(name: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::SubroutineCall,
            args: Arguments::from_ident(name),
            annotation: String::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub(crate) fn take_annotation(&mut self) -> String {
        std::mem::take(&mut self.annotation)
    }

    pub(crate) fn prepend_annotation(&mut self, prefix: &str) {
        self.annotation.insert_str(0, prefix);
    }

    fn ints(&self) -> Vec<i64> {
        self.args
            .flatten()
            .into_iter()
            .filter_map(|v| match v {
                Value::Int(i) => Some(i),
                Value::Ident(_) => None,
            })
            .collect()
    }

    /// Own duration in ticks for `Delay` and `Ramp`, 0 otherwise.
    pub fn ticks(&self) -> Ticks {
        match self.kind {
            CommandKind::Delay => self.ints()[0].max(0) as Ticks,
            CommandKind::Ramp => self.ints()[3].max(0) as Ticks,
            _ => 0,
        }
    }

    /// Color set by the command. Single-channel commands leave the other
    /// channels unset.
    pub fn color(&self) -> Option<Color> {
        let ints = self.ints();
        let ch = |i: usize| Some(ints[i] as f64);
        match self.kind {
            CommandKind::SetColor | CommandKind::Ramp => {
                Some(Color::from_ints([ints[0], ints[1], ints[2]]))
            }
            CommandKind::SetRed => Some(Color {
                red: ch(0),
                ..Color::default()
            }),
            CommandKind::SetGreen => Some(Color {
                green: ch(0),
                ..Color::default()
            }),
            CommandKind::SetBlue => Some(Color {
                blue: ch(0),
                ..Color::default()
            }),
            _ => None,
        }
    }

    /// Name of the called subroutine.
    pub fn target(&self) -> Option<&str> {
        if self.kind != CommandKind::SubroutineCall {
            return None;
        }
        match self.args.items().first() {
            Some(crate::args::Arg::Value(Value::Ident(s))) => Some(s),
            _ => None,
        }
    }

    pub fn duration(&self, scope: Scope<'_>) -> GloResult<Ticks> {
        match self.kind {
            CommandKind::Delay | CommandKind::Ramp => Ok(self.ticks()),
            CommandKind::SubroutineCall => {
                let (sub, inner) = scope.enter(self.call_target()?)?;
                sub.duration(inner)
            }
            _ => Ok(0),
        }
    }

    /// Append this command's sampled colors to `out` and return the new
    /// trailing color.
    pub fn render_into(
        &self,
        incoming: Color,
        scope: Scope<'_>,
        out: &mut Vec<Color>,
    ) -> GloResult<Color> {
        match self.kind {
            CommandKind::SetColor => Ok(self.color().unwrap_or(incoming)),
            CommandKind::SetRed | CommandKind::SetGreen | CommandKind::SetBlue => {
                Ok(self.color().map_or(incoming, |c| c | incoming))
            }
            CommandKind::Delay => {
                let n = self.ticks() as usize;
                out.extend(std::iter::repeat_n(incoming, n));
                Ok(incoming)
            }
            CommandKind::Ramp => {
                let target = self.color().unwrap_or(incoming);
                let d = self.ticks();
                out.reserve(d as usize);
                for n in 0..d {
                    let t = n as f64 / d as f64;
                    out.push(incoming.lerp(target, t).round());
                }
                Ok(target)
            }
            CommandKind::SubroutineCall => {
                let (sub, inner) = scope.enter(self.call_target()?)?;
                sub.render_into(incoming, inner, out)
            }
            CommandKind::TimeAnchor | CommandKind::ConstantDefine | CommandKind::NoOp => {
                Ok(incoming)
            }
        }
    }

    fn call_target(&self) -> GloResult<&str> {
        self.target().ok_or_else(|| {
            GloError::validation(format!("malformed subroutine call: {}", self.describe()))
        })
    }

    pub fn export_lines(&self, opts: &ExportOpts, depth: usize) -> Vec<String> {
        match self.kind {
            CommandKind::NoOp if self.annotation.is_empty() => vec![],
            CommandKind::NoOp => vec![format!("{}{}", opts.pad(depth), self.annotation)],
            CommandKind::ConstantDefine => vec![format!(
                "{}#define {} {}{}",
                opts.pad(depth),
                self.args.name().unwrap_or_default(),
                self.args.body_string(),
                self.annotation
            )],
            kind => match command_spelling(kind).pick(opts.styles) {
                Some(word) => vec![format_line(
                    opts,
                    depth,
                    word,
                    &self.args.to_string(),
                    &self.annotation,
                )],
                None => vec![],
            },
        }
    }

    /// Default-spelling single line, used for diagnostics.
    pub fn describe(&self) -> String {
        let opts = ExportOpts {
            styles: Styles::none(),
            indent: 0,
        };
        self.export_lines(&opts, 0)
            .into_iter()
            .next()
            .unwrap_or_else(|| format!("{:?}", self.kind))
    }

    pub fn add_namespace(&mut self, prefix: &str) -> GloResult<()> {
        match self.kind {
            CommandKind::SubroutineCall => self.args.prefix_ident(0, prefix),
            _ => {
                self.args.add_namespace(prefix);
                Ok(())
            }
        }
    }

    /// Turn a definition into a disabled comment; inline constant references
    /// everywhere else.
    pub(crate) fn resolve_constants(&mut self) {
        if self.kind == CommandKind::ConstantDefine {
            let text = format!(";{}", self.describe());
            *self = Command::noop(text);
        } else {
            self.args.inline_constants();
        }
    }
}

fn ticks_to_i64(ticks: Ticks) -> i64 {
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.args == other.args
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.args.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Arg;

    fn cmd(kind: CommandKind, ints: &[i64], annotation: &str) -> Command {
        Command::new(kind, Arguments::from_ints(ints), annotation).unwrap()
    }

    #[test]
    fn export_and_duration_of_basic_commands() {
        let c = cmd(CommandKind::SetColor, &[1, 2, 3], " ; comment");
        assert_eq!(c.duration(Scope::detached()).unwrap(), 0);
        assert_eq!(c.describe(), "color (1, 2, 3) ; comment");

        let d = cmd(CommandKind::Delay, &[1], " ; comment");
        assert_eq!(d.duration(Scope::detached()).unwrap(), 1);
        assert_eq!(d.describe(), "delay (1) ; comment");

        let r = cmd(CommandKind::Ramp, &[1, 2, 3, 4], " ; comment");
        assert_eq!(r.duration(Scope::detached()).unwrap(), 4);
        assert_eq!(r.describe(), "ramp (1, 2, 3, 4) ; comment");

        let n = Command::noop("; comment");
        assert_eq!(n.duration(Scope::detached()).unwrap(), 0);
        assert_eq!(n.describe(), "; comment");
    }

    #[test]
    fn construction_rejects_bad_shapes() {
        assert!(Command::new(CommandKind::SetColor, Arguments::from_ints(&[1, 2]), "").is_err());
        assert!(Command::new(CommandKind::Delay, Arguments::from_ident("x"), "").is_err());
        assert!(Command::new(CommandKind::NoOp, Arguments::from_ints(&[1]), "").is_err());
        assert!(Command::new(CommandKind::Delay, Arguments::from_ints(&[-1]), "").is_err());
        assert!(
            Command::new(CommandKind::SetColor, Arguments::from_ints(&[1, 2, 256]), "").is_err()
        );
        assert!(
            Command::new(CommandKind::SubroutineCall, Arguments::from_ident("s"), "").is_ok()
        );
    }

    #[test]
    fn time_anchor_shapes() {
        let mode = Arg::Value(Value::Ident("set".into()));
        let label = Arg::Value(Value::Ident("intro".into()));
        let int = Arg::Value(Value::Int(5));
        for items in [
            vec![mode.clone(), int.clone()],
            vec![mode.clone(), label.clone()],
            vec![mode.clone(), label.clone(), int.clone()],
        ] {
            assert!(Command::new(CommandKind::TimeAnchor, Arguments::new(items), "").is_ok());
        }
        assert!(
            Command::new(
                CommandKind::TimeAnchor,
                Arguments::new(vec![int.clone(), mode]),
                ""
            )
            .is_err()
        );
    }

    #[test]
    fn ramp_renders_linear_interpolation() {
        let r = cmd(CommandKind::Ramp, &[2, 20, 30, 3], "");
        let mut out = Vec::new();
        let trailing = r
            .render_into(Color::BLACK, Scope::detached(), &mut out)
            .unwrap();
        assert_eq!(trailing, Color::new(2.0, 20.0, 30.0));
        assert_eq!(
            out,
            vec![
                Color::new(0.0, 0.0, 0.0),
                Color::new(1.0, 7.0, 10.0),
                Color::new(1.0, 13.0, 20.0),
            ]
        );
    }

    #[test]
    fn single_channel_overlays_trailing_color() {
        let g = cmd(CommandKind::SetGreen, &[99], "");
        let mut out = Vec::new();
        let trailing = g
            .render_into(Color::new(1.0, 2.0, 3.0), Scope::detached(), &mut out)
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(trailing, Color::new(1.0, 99.0, 3.0));
    }

    #[test]
    fn call_without_root_fails() {
        let s = Command::call("missing");
        assert!(matches!(
            s.duration(Scope::detached()),
            Err(GloError::Resolution(_))
        ));
    }

    #[test]
    fn equality_ignores_annotation_and_constant_names() {
        let constant = Arguments::named("C1", Arguments::from_ints(&[1, 2, 3]).items().to_vec());
        let a = Command::new(
            CommandKind::SetColor,
            Arguments::new(vec![Arg::List(constant)]),
            " ; a",
        )
        .unwrap();
        let b = cmd(CommandKind::SetColor, &[1, 2, 3], "");
        assert_eq!(a, b);
    }
}

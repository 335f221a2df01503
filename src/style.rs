use crate::{command::CommandKind, sequence::SequenceKind};

/// Spelling dialects a program can be exported in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    /// Upper-case single-letter controller mnemonics (`C, 1, 2, 3`).
    Legacy,
    /// `colour` instead of `color`.
    British,
    /// camelCase block markers (`endLoop`, `defSub`).
    Camel,
    /// `call` instead of `sub` for subroutine calls.
    Call,
}

impl Style {
    pub const ALL: [Style; 4] = [Style::Legacy, Style::British, Style::Camel, Style::Call];

    fn bit(self) -> u8 {
        match self {
            Style::Legacy => 1,
            Style::British => 2,
            Style::Camel => 4,
            Style::Call => 8,
        }
    }
}

/// Set of requested [`Style`]s. Empty means the default keyword spelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Styles(u8);

impl Styles {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn with(self, style: Style) -> Self {
        Self(self.0 | style.bit())
    }

    pub fn contains(self, style: Style) -> bool {
        self.0 & style.bit() != 0
    }
}

impl FromIterator<Style> for Styles {
    fn from_iter<I: IntoIterator<Item = Style>>(iter: I) -> Self {
        iter.into_iter().fold(Styles::none(), Styles::with)
    }
}

/// Text export options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportOpts {
    pub styles: Styles,
    /// Spaces per indentation level.
    pub indent: usize,
}

impl ExportOpts {
    pub fn legacy_syntax(&self) -> bool {
        self.styles.contains(Style::Legacy)
    }

    pub(crate) fn pad(&self, depth: usize) -> String {
        " ".repeat(depth * self.indent)
    }
}

/// Per-kind spelling table entry.
#[derive(Debug)]
pub(crate) struct Spelling {
    default: Option<&'static str>,
    variants: &'static [(Style, &'static str)],
}

impl Spelling {
    const fn new(default: &'static str, variants: &'static [(Style, &'static str)]) -> Self {
        Self {
            default: Some(default),
            variants,
        }
    }

    const NONE: Spelling = Spelling {
        default: None,
        variants: &[],
    };

    /// First variant whose style is requested, else the default spelling.
    pub(crate) fn pick(&self, styles: Styles) -> Option<&'static str> {
        self.variants
            .iter()
            .find(|(s, _)| styles.contains(*s))
            .map(|(_, w)| *w)
            .or(self.default)
    }

    fn matches(&self, word: &str) -> bool {
        self.default == Some(word) || self.variants.iter().any(|(_, w)| *w == word)
    }
}

pub(crate) fn command_spelling(kind: CommandKind) -> &'static Spelling {
    static TIME: Spelling = Spelling::new("time", &[(Style::Legacy, "TIME")]);
    static DEFINE: Spelling = Spelling::new("#define", &[]);
    static COLOR: Spelling = Spelling::new(
        "color",
        &[(Style::Legacy, "C"), (Style::British, "colour")],
    );
    static RED: Spelling = Spelling::new("red", &[(Style::Legacy, "R")]);
    static GREEN: Spelling = Spelling::new("green", &[(Style::Legacy, "G")]);
    static BLUE: Spelling = Spelling::new("blue", &[(Style::Legacy, "B")]);
    static DELAY: Spelling = Spelling::new("delay", &[(Style::Legacy, "D")]);
    static RAMP: Spelling = Spelling::new("ramp", &[(Style::Legacy, "RAMP")]);
    static SUB: Spelling = Spelling::new("sub", &[(Style::Legacy, "SUB"), (Style::Call, "call")]);

    match kind {
        CommandKind::TimeAnchor => &TIME,
        CommandKind::ConstantDefine => &DEFINE,
        CommandKind::NoOp => &Spelling::NONE,
        CommandKind::Delay => &DELAY,
        CommandKind::SetColor => &COLOR,
        CommandKind::SetRed => &RED,
        CommandKind::SetGreen => &GREEN,
        CommandKind::SetBlue => &BLUE,
        CommandKind::Ramp => &RAMP,
        CommandKind::SubroutineCall => &SUB,
    }
}

pub(crate) fn begin_spelling(kind: SequenceKind) -> &'static Spelling {
    static LOOP: Spelling = Spelling::new("loop", &[(Style::Legacy, "L")]);
    static DEFSUB: Spelling = Spelling::new(
        "defsub",
        &[(Style::Legacy, "DEFSUB"), (Style::Camel, "defSub")],
    );

    match kind {
        SequenceKind::Program => &Spelling::NONE,
        SequenceKind::SubroutineDef => &DEFSUB,
        SequenceKind::Loop => &LOOP,
    }
}

pub(crate) fn end_spelling(kind: SequenceKind) -> &'static Spelling {
    static END: Spelling = Spelling::new("end", &[(Style::Legacy, "END")]);
    static ENDLOOP: Spelling = Spelling::new(
        "endloop",
        &[(Style::Legacy, "E"), (Style::Camel, "endLoop")],
    );
    static ENDSUB: Spelling = Spelling::new(
        "endsub",
        &[(Style::Legacy, "ENDSUB"), (Style::Camel, "endSub")],
    );

    match kind {
        SequenceKind::Program => &END,
        SequenceKind::SubroutineDef => &ENDSUB,
        SequenceKind::Loop => &ENDLOOP,
    }
}

/// Meaning of a source keyword, in any spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Keyword {
    Command(CommandKind),
    Begin(SequenceKind),
    End(SequenceKind),
}

pub(crate) fn lookup_keyword(word: &str) -> Option<Keyword> {
    if let Some(kind) = CommandKind::ALL
        .into_iter()
        .find(|k| command_spelling(*k).matches(word))
    {
        return Some(Keyword::Command(kind));
    }
    SequenceKind::ALL.into_iter().find_map(|k| {
        if begin_spelling(k).matches(word) {
            Some(Keyword::Begin(k))
        } else if end_spelling(k).matches(word) {
            Some(Keyword::End(k))
        } else {
            None
        }
    })
}

/// Format one exported line: `word (args)` or, in legacy syntax, `WORD, args`.
pub(crate) fn format_line(
    opts: &ExportOpts,
    depth: usize,
    word: &str,
    args: &str,
    annotation: &str,
) -> String {
    let pad = opts.pad(depth);
    if args.is_empty() {
        format!("{pad}{word}{annotation}")
    } else if opts.legacy_syntax() {
        format!("{pad}{word}, {args}{annotation}")
    } else {
        format!("{pad}{word} ({args}){annotation}")
    }
}

use std::hash::{Hash, Hasher};

use crate::{
    args::{Arg, Arguments, Value},
    color::Color,
    command::{ArgType, Command, CommandKind, Shape, check_shapes},
    file::Scope,
    foundation::{
        core::Ticks,
        error::{GloError, GloResult},
    },
    style::{ExportOpts, begin_spelling, end_spelling, format_line},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SequenceKind {
    Program,
    SubroutineDef,
    Loop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Command(CommandKind),
    Sequence(SequenceKind),
}

impl SequenceKind {
    pub const ALL: [SequenceKind; 3] = [
        SequenceKind::Program,
        SequenceKind::SubroutineDef,
        SequenceKind::Loop,
    ];

    pub fn shapes(self) -> &'static [Shape] {
        match self {
            SequenceKind::Program => &[Shape::Fixed(&[])],
            SequenceKind::SubroutineDef => &[Shape::Fixed(&[ArgType::Ident])],
            SequenceKind::Loop => &[Shape::Fixed(&[ArgType::Int])],
        }
    }

    /// Whether a child of kind `child` may be inserted.
    pub fn admits(self, child: NodeKind) -> bool {
        use CommandKind as C;
        match (self, child) {
            (_, NodeKind::Sequence(SequenceKind::Loop)) => true,
            (_, NodeKind::Sequence(_)) => false,
            (SequenceKind::Program, NodeKind::Command(_)) => true,
            (SequenceKind::SubroutineDef, NodeKind::Command(c)) => c != C::TimeAnchor,
            (SequenceKind::Loop, NodeKind::Command(c)) => {
                !matches!(c, C::TimeAnchor | C::ConstantDefine)
            }
        }
    }

    /// Extra indentation levels applied to children on export.
    pub fn indent_level(self) -> usize {
        match self {
            SequenceKind::Program => 0,
            SequenceKind::SubroutineDef | SequenceKind::Loop => 1,
        }
    }
}

/// An ordered block of child nodes plus its own kind, arguments and annotation.
#[derive(Clone, Debug)]
pub struct Sequence {
    kind: SequenceKind,
    args: Arguments,
    annotation: String,
    children: Vec<Node>,
}

impl Sequence {
    pub fn new(
        kind: SequenceKind,
        args: Arguments,
        annotation: impl Into<String>,
    ) -> GloResult<Self> {
        check_shapes(&format!("{kind:?}"), kind.shapes(), &args)?;
        if kind == SequenceKind::Loop && args.ints()?[0] < 0 {
            return Err(GloError::validation(format!(
                "loop count must be >= 0, got ({args})"
            )));
        }
        Ok(Self {
            kind,
            args,
            annotation: annotation.into(),
            children: Vec::new(),
        })
    }

    pub fn program() -> Self {
        Self {
            kind: SequenceKind::Program,
            args: Arguments::empty(),
            annotation: String::new(),
            children: Vec::new(),
        }
    }

    pub fn subroutine(name: impl Into<String>) -> Self {
        Self {
            kind: SequenceKind::SubroutineDef,
            args: Arguments::from_ident(name),
            annotation: String::new(),
            children: Vec::new(),
        }
    }

    pub fn looped(count: u64) -> Self {
        Self {
            kind: SequenceKind::Loop,
            args: Arguments::from_ints(&[i64::try_from(count).unwrap_or(i64::MAX)]),
            annotation: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    pub fn kind(&self) -> SequenceKind {
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

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    fn check_child(&self, node: &Node) -> GloResult<()> {
        if self.kind.admits(node.kind()) {
            return Ok(());
        }
        Err(GloError::validation(format!(
            "{:?} may not contain {:?} ({})",
            self.kind,
            node.kind(),
            node.describe()
        )))
    }

    pub fn push(&mut self, node: impl Into<Node>) -> GloResult<()> {
        let node = node.into();
        self.check_child(&node)?;
        self.children.push(node);
        Ok(())
    }

    pub fn insert(&mut self, idx: usize, node: impl Into<Node>) -> GloResult<()> {
        let node = node.into();
        self.check_child(&node)?;
        if idx > self.children.len() {
            return Err(GloError::validation(format!(
                "insert index {idx} out of bounds (len {})",
                self.children.len()
            )));
        }
        self.children.insert(idx, node);
        Ok(())
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = Node>) -> GloResult<()> {
        for node in nodes {
            self.push(node)?;
        }
        Ok(())
    }

    pub(crate) fn take_children(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    /// Replace all children, validating every one.
    pub(crate) fn set_children(&mut self, nodes: Vec<Node>) -> GloResult<()> {
        for node in &nodes {
            self.check_child(node)?;
        }
        self.children = nodes;
        Ok(())
    }

    /// Subroutine name for `SubroutineDef`.
    pub fn name(&self) -> Option<&str> {
        if self.kind != SequenceKind::SubroutineDef {
            return None;
        }
        match self.args.items().first() {
            Some(Arg::Value(Value::Ident(s))) => Some(s),
            _ => None,
        }
    }

    /// Loop repeat count; 1 for non-loop sequences.
    pub fn repeat_count(&self) -> u64 {
        match self.kind {
            SequenceKind::Loop => self
                .args
                .ints()
                .ok()
                .and_then(|v| v.first().copied())
                .map_or(0, |n| n.max(0) as u64),
            _ => 1,
        }
    }

    pub fn duration(&self, scope: Scope<'_>) -> GloResult<Ticks> {
        let mut total: Ticks = 0;
        for child in &self.children {
            total = total.saturating_add(child.duration(scope)?);
        }
        Ok(total.saturating_mul(self.repeat_count()))
    }

    pub fn render_into(
        &self,
        incoming: Color,
        scope: Scope<'_>,
        out: &mut Vec<Color>,
    ) -> GloResult<Color> {
        let mut color = incoming;
        for _ in 0..self.repeat_count() {
            for child in &self.children {
                color = child.render_into(color, scope, out)?;
            }
        }
        Ok(color)
    }

    pub fn export_lines(&self, opts: &ExportOpts, depth: usize) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(word) = begin_spelling(self.kind).pick(opts.styles) {
            lines.push(format_line(
                opts,
                depth,
                word,
                &self.args.to_string(),
                &self.annotation,
            ));
        }
        let inner = depth + self.kind.indent_level();
        for child in &self.children {
            lines.extend(child.export_lines(opts, inner));
        }
        if let Some(word) = end_spelling(self.kind).pick(opts.styles) {
            lines.push(format_line(opts, depth, word, "", ""));
        }
        lines
    }

    /// Default-spelling begin line, used for diagnostics.
    pub fn describe(&self) -> String {
        let opts = ExportOpts::default();
        match begin_spelling(self.kind).pick(opts.styles) {
            Some(word) => format_line(&opts, 0, word, &self.args.to_string(), &self.annotation),
            None => format!("{:?}", self.kind),
        }
    }

    pub fn add_namespace(&mut self, prefix: &str) -> GloResult<()> {
        match self.kind {
            SequenceKind::SubroutineDef => self.args.prefix_ident(0, prefix)?,
            _ => self.args.add_namespace(prefix),
        }
        for child in &mut self.children {
            child.add_namespace(prefix)?;
        }
        Ok(())
    }

    pub(crate) fn resolve_constants(&mut self) {
        self.args.inline_constants();
        for child in &mut self.children {
            match child {
                Node::Command(c) => c.resolve_constants(),
                Node::Sequence(s) => s.resolve_constants(),
            }
        }
    }

    pub(crate) fn strip_comments(&mut self) {
        self.annotation.clear();
        self.children
            .retain(|n| !matches!(n, Node::Command(c) if c.kind() == CommandKind::NoOp));
        for child in &mut self.children {
            match child {
                Node::Command(c) => {
                    c.take_annotation();
                }
                Node::Sequence(s) => s.strip_comments(),
            }
        }
    }

    /// Number of nodes below this one, counting nested sequences themselves.
    pub fn node_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| match c {
                Node::Command(_) => 1,
                Node::Sequence(s) => 1 + s.node_count(),
            })
            .sum()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.args == other.args && self.children == other.children
    }
}

impl Eq for Sequence {}

impl Hash for Sequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.args.hash(state);
        self.children.hash(state);
    }
}

/// Tree node: a command leaf or a nested sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Command(Command),
    Sequence(Sequence),
}

impl From<Command> for Node {
    fn from(c: Command) -> Self {
        Node::Command(c)
    }
}

impl From<Sequence> for Node {
    fn from(s: Sequence) -> Self {
        Node::Sequence(s)
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Command(c) => NodeKind::Command(c.kind()),
            Node::Sequence(s) => NodeKind::Sequence(s.kind()),
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Node::Command(c) => Some(c),
            Node::Sequence(_) => None,
        }
    }

    pub fn is_command(&self, kind: CommandKind) -> bool {
        self.as_command().is_some_and(|c| c.kind() == kind)
    }

    pub fn duration(&self, scope: Scope<'_>) -> GloResult<Ticks> {
        match self {
            Node::Command(c) => c.duration(scope),
            Node::Sequence(s) => s.duration(scope),
        }
    }

    pub fn render_into(
        &self,
        incoming: Color,
        scope: Scope<'_>,
        out: &mut Vec<Color>,
    ) -> GloResult<Color> {
        match self {
            Node::Command(c) => c.render_into(incoming, scope, out),
            Node::Sequence(s) => s.render_into(incoming, scope, out),
        }
    }

    pub fn export_lines(&self, opts: &ExportOpts, depth: usize) -> Vec<String> {
        match self {
            Node::Command(c) => c.export_lines(opts, depth),
            Node::Sequence(s) => s.export_lines(opts, depth),
        }
    }

    pub fn add_namespace(&mut self, prefix: &str) -> GloResult<()> {
        match self {
            Node::Command(c) => c.add_namespace(prefix),
            Node::Sequence(s) => s.add_namespace(prefix),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Node::Command(c) => c.describe(),
            Node::Sequence(s) => s.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::GloFile;

    fn delay(ticks: i64, annotation: &str) -> Command {
        Command::new(CommandKind::Delay, Arguments::from_ints(&[ticks]), annotation).unwrap()
    }

    #[test]
    fn insertion_checks_legal_children() {
        let mut lp = Sequence::looped(3);
        assert!(lp.push(delay(1, "")).is_ok());
        assert!(lp.push(Sequence::looped(2)).is_ok());
        assert!(lp.push(Sequence::subroutine("x")).is_err());

        let anchor = Command::new(
            CommandKind::TimeAnchor,
            Arguments::new(vec![
                Arg::Value(Value::Ident("set".into())),
                Arg::Value(Value::Int(10)),
            ]),
            "",
        )
        .unwrap();
        assert!(lp.push(anchor.clone()).is_err());
        assert!(Sequence::subroutine("s").push(anchor.clone()).is_err());
        assert!(Sequence::program().push(anchor).is_ok());
    }

    #[test]
    fn loop_rejects_bad_counts() {
        assert!(Sequence::new(SequenceKind::Loop, Arguments::from_ints(&[-2]), "").is_err());
        assert!(Sequence::new(SequenceKind::Loop, Arguments::from_ident("x"), "").is_err());
        assert!(Sequence::new(SequenceKind::Loop, Arguments::from_ints(&[0]), "").is_ok());
    }

    #[test]
    fn subroutine_call_export_and_duration() {
        let mut ds = Sequence::subroutine("sub_name").with_annotation(" ; defsub");
        ds.push(delay(1, " ; comment")).unwrap();
        let call = Command::call("sub_name").with_annotation(" ; comment");

        let mut main = Sequence::program();
        main.push(call.clone()).unwrap();
        let mut file = GloFile::new(main);
        file.add_subroutine(ds.clone()).unwrap();

        let opts = ExportOpts::default();
        assert_eq!(
            ds.export_lines(&opts, 0).join("\n"),
            "defsub (sub_name) ; defsub\ndelay (1) ; comment\nendsub"
        );
        assert_eq!(ds.duration(Scope::detached()).unwrap(), 1);
        assert_eq!(call.duration(Scope::root(&file)).unwrap(), 1);
        assert_eq!(
            file.main().export_lines(&opts, 0).join("\n"),
            "sub (sub_name) ; comment\nend"
        );
        assert_eq!(
            file.export(&opts),
            "sub (sub_name) ; comment\nend\ndefsub (sub_name) ; defsub\ndelay (1) ; comment\nendsub"
        );
        assert_eq!(file.duration().unwrap(), 1);

        let mut lp = Sequence::looped(5);
        lp.push(call).unwrap();
        assert_eq!(
            lp.export_lines(&opts, 0).join("\n"),
            "loop (5)\nsub (sub_name) ; comment\nendloop"
        );
        assert_eq!(lp.duration(Scope::root(&file)).unwrap(), 5);

        file.main_mut().push(lp).unwrap();
        assert_eq!(file.duration().unwrap(), 6);
    }

    #[test]
    fn export_indents_nested_blocks() {
        let mut inner = Sequence::looped(2);
        inner.push(delay(3, "")).unwrap();
        let mut outer = Sequence::looped(4);
        outer.push(inner).unwrap();
        let opts = ExportOpts {
            indent: 2,
            ..ExportOpts::default()
        };
        assert_eq!(
            outer.export_lines(&opts, 0),
            vec![
                "loop (4)",
                "  loop (2)",
                "    delay (3)",
                "  endloop",
                "endloop"
            ]
        );
    }

    #[test]
    fn loop_render_repeats_body() {
        let mut lp = Sequence::looped(3);
        lp.push(Command::set_color([9, 9, 9])).unwrap();
        lp.push(delay(2, "")).unwrap();
        let mut out = Vec::new();
        lp.render_into(Color::BLACK, Scope::detached(), &mut out)
            .unwrap();
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|c| *c == Color::new(9.0, 9.0, 9.0)));
        assert_eq!(lp.duration(Scope::detached()).unwrap(), 6);
    }

    #[test]
    fn equality_ignores_annotations() {
        let mut a = Sequence::looped(2).with_annotation(" ; a");
        a.push(delay(5, " ; x")).unwrap();
        let mut b = Sequence::looped(2);
        b.push(delay(5, "")).unwrap();
        assert_eq!(a, b);
    }
}

use crate::{
    color::Color,
    foundation::{
        core::Ticks,
        error::{GloError, GloResult},
    },
    sequence::{Sequence, SequenceKind},
    style::ExportOpts,
};

/// Calls nested deeper than this are treated as unbounded recursion.
pub const MAX_CALL_DEPTH: usize = 64;

/// Context for resolving subroutine calls.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    file: Option<&'a GloFile>,
    depth: usize,
}

impl<'a> Scope<'a> {
    pub fn root(file: &'a GloFile) -> Self {
        Self {
            file: Some(file),
            depth: 0,
        }
    }

    /// Scope without an enclosing file; any call fails with "no root".
    pub fn detached() -> Self {
        Self {
            file: None,
            depth: 0,
        }
    }

    pub fn file(&self) -> Option<&'a GloFile> {
        self.file
    }

    pub(crate) fn enter(self, name: &str) -> GloResult<(&'a Sequence, Scope<'a>)> {
        let Some(file) = self.file else {
            return Err(GloError::resolution(format!(
                "no root: cannot resolve call to '{name}' outside a program"
            )));
        };
        if self.depth >= MAX_CALL_DEPTH {
            return Err(GloError::resolution(format!(
                "subroutine '{name}' nests deeper than {MAX_CALL_DEPTH} calls (recursive?)"
            )));
        }
        let sub = file.subroutine(name).ok_or_else(|| {
            GloError::resolution(format!("call to undefined subroutine '{name}'"))
        })?;
        Ok((
            sub,
            Scope {
                file: self.file,
                depth: self.depth + 1,
            },
        ))
    }
}

/// One compiled unit: the top-level program plus its subroutine definitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GloFile {
    main: Sequence,
    subroutines: Vec<Sequence>,
}

impl Default for GloFile {
    fn default() -> Self {
        Self::new(Sequence::program())
    }
}

impl GloFile {
    pub fn new(main: Sequence) -> Self {
        Self {
            main,
            subroutines: Vec::new(),
        }
    }

    pub fn from_parts(main: Sequence, subroutines: Vec<Sequence>) -> GloResult<Self> {
        if main.kind() != SequenceKind::Program {
            return Err(GloError::validation(format!(
                "file main block must be a Program, got {:?}",
                main.kind()
            )));
        }
        let mut file = Self::new(main);
        for sub in subroutines {
            file.add_subroutine(sub)?;
        }
        Ok(file)
    }

    pub fn main(&self) -> &Sequence {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Sequence {
        &mut self.main
    }

    pub fn subroutines(&self) -> &[Sequence] {
        &self.subroutines
    }

    pub(crate) fn subroutines_mut(&mut self) -> &mut [Sequence] {
        &mut self.subroutines
    }

    pub fn subroutine(&self, name: &str) -> Option<&Sequence> {
        self.subroutines.iter().find(|s| s.name() == Some(name))
    }

    pub fn add_subroutine(&mut self, sub: Sequence) -> GloResult<()> {
        let Some(name) = sub.name() else {
            return Err(GloError::validation(format!(
                "only subroutine definitions may be added to a file, got {:?}",
                sub.kind()
            )));
        };
        if self.subroutine(name).is_some() {
            return Err(GloError::validation(format!(
                "subroutine '{name}' is defined twice"
            )));
        }
        self.subroutines.push(sub);
        Ok(())
    }

    /// Program duration; subroutines count only through calls.
    pub fn duration(&self) -> GloResult<Ticks> {
        self.main.duration(Scope::root(self))
    }

    /// One color per elapsed tick of the program, starting from black.
    pub fn render(&self) -> GloResult<Vec<Color>> {
        let mut out = Vec::new();
        self.main
            .render_into(Color::BLACK, Scope::root(self), &mut out)?;
        Ok(out)
    }

    pub fn export_lines(&self, opts: &ExportOpts) -> Vec<String> {
        let mut lines = self.main.export_lines(opts, 0);
        for sub in &self.subroutines {
            lines.extend(sub.export_lines(opts, 0));
        }
        lines
    }

    pub fn export(&self, opts: &ExportOpts) -> String {
        self.export_lines(opts).join("\n")
    }

    /// Prefix every symbolic name owned by this file.
    pub fn add_namespace(&mut self, prefix: &str) -> GloResult<()> {
        self.main.add_namespace(prefix)?;
        for sub in &mut self.subroutines {
            sub.add_namespace(prefix)?;
        }
        Ok(())
    }

    /// Append `other`'s program body and subroutines. Namespace both files
    /// first so names cannot collide.
    pub fn merge(&mut self, mut other: GloFile) -> GloResult<()> {
        self.main.extend(other.main.take_children())?;
        for sub in other.subroutines {
            self.add_subroutine(sub)?;
        }
        Ok(())
    }

    /// Replace every constant definition with a comment and inline every
    /// constant reference.
    #[tracing::instrument(skip(self))]
    pub fn resolve_constants(&mut self) {
        self.main.resolve_constants();
        for sub in &mut self.subroutines {
            sub.resolve_constants();
        }
    }

    /// Drop comment-only nodes and clear every annotation.
    pub fn strip_comments(&mut self) {
        self.main.strip_comments();
        for sub in &mut self.subroutines {
            sub.strip_comments();
        }
    }

    pub fn node_count(&self) -> usize {
        self.main.node_count()
            + self
                .subroutines
                .iter()
                .map(|s| 1 + s.node_count())
                .sum::<usize>()
    }
}

//! Line-oriented GLO source reader.

use std::{collections::BTreeMap, path::Path, sync::LazyLock};

use regex::Regex;

use crate::{
    args::{Arg, Arguments, Value},
    command::{Command, CommandKind},
    file::GloFile,
    foundation::error::{GloError, GloResult},
    sequence::{Sequence, SequenceKind},
    style::{Keyword, lookup_keyword},
};

/// One classified source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    /// Comment-only line, starting at the `;`.
    Comment(&'a str),
    Statement {
        keyword: &'a str,
        /// Constant name of a `#define`.
        symbol: Option<&'a str>,
        args: &'a str,
        /// Trailing comment including its leading whitespace.
        comment: Option<&'a str>,
    },
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("line pattern is a valid regex")
}

static COMMENT: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*(;.*)$"));
static DEFINE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(#define)\s+(\w+)\s+([^;]*?)(\s*;.*)?\s*$"));
static PAREN: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(\w+)\s*\(([^)]*?)\s*\)(\s*;.*)?\s*$"));
static COMMA: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(\w+)\s*,\s*([^;]*?)(\s*;.*)?\s*$"));
static BARE: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*(\w+)(\s*;.*)?\s*$"));

/// Classify one source line without interpreting its keyword.
pub fn split_line(line: &str) -> GloResult<Line<'_>> {
    if line.trim().is_empty() {
        return Ok(Line::Blank);
    }
    if let Some(c) = COMMENT.captures(line) {
        return Ok(Line::Comment(c.get(1).map_or("", |m| m.as_str())));
    }
    if let Some(c) = DEFINE.captures(line) {
        return Ok(Line::Statement {
            keyword: c.get(1).map_or("", |m| m.as_str()),
            symbol: c.get(2).map(|m| m.as_str()),
            args: c.get(3).map_or("", |m| m.as_str()),
            comment: c.get(4).map(|m| m.as_str()),
        });
    }
    for re in [&*PAREN, &*COMMA] {
        if let Some(c) = re.captures(line) {
            return Ok(Line::Statement {
                keyword: c.get(1).map_or("", |m| m.as_str()),
                symbol: None,
                args: c.get(2).map_or("", |m| m.as_str()),
                comment: c.get(3).map(|m| m.as_str()),
            });
        }
    }
    if let Some(c) = BARE.captures(line) {
        return Ok(Line::Statement {
            keyword: c.get(1).map_or("", |m| m.as_str()),
            symbol: None,
            args: "",
            comment: c.get(2).map(|m| m.as_str()),
        });
    }
    Err(GloError::format("line matches no GLO statement form"))
}

/// Parse comma-separated arguments; identifiers naming a known constant are
/// embedded as that constant's named list.
fn parse_args(text: &str, constants: &BTreeMap<String, Arguments>) -> GloResult<Arguments> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Arguments::empty());
    }
    let mut items = Vec::new();
    for token in text.split(',').map(str::trim) {
        if token.is_empty() {
            return Err(GloError::format(format!("empty argument in '{text}'")));
        }
        if let Ok(v) = token.parse::<i64>() {
            items.push(Arg::Value(Value::Int(v)));
        } else if let Some(constant) = constants.get(token) {
            items.push(Arg::List(constant.clone()));
        } else if token.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
            items.push(Arg::Value(Value::Ident(token.to_string())));
        } else {
            return Err(GloError::format(format!("invalid argument '{token}'")));
        }
    }
    Ok(Arguments::new(items))
}

/// Builds a [`GloFile`] from lines while tracking open blocks.
struct Builder {
    stack: Vec<Sequence>,
    main: Option<Sequence>,
    subroutines: Vec<Sequence>,
    constants: BTreeMap<String, Arguments>,
}

impl Builder {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            main: None,
            subroutines: Vec::new(),
            constants: BTreeMap::new(),
        }
    }

    /// Innermost open block; opens the program if nothing is open yet.
    fn top(&mut self) -> GloResult<&mut Sequence> {
        if self.stack.is_empty() {
            if self.main.is_some() {
                return Err(GloError::format(
                    "statement after 'end' outside a subroutine definition",
                ));
            }
            self.stack.push(Sequence::program());
        }
        self.stack
            .last_mut()
            .ok_or_else(|| GloError::format("no open block"))
    }

    fn comment(&mut self, text: &str) -> GloResult<()> {
        if self.stack.is_empty() && self.main.is_some() {
            tracing::debug!(comment = text, "dropping comment between subroutines");
            return Ok(());
        }
        self.top()?.push(Command::noop(text))
    }

    fn statement(
        &mut self,
        keyword: &str,
        symbol: Option<&str>,
        args: &str,
        comment: &str,
    ) -> GloResult<()> {
        if keyword == "#define" {
            let name = symbol.ok_or_else(|| GloError::format("#define without a name"))?;
            let body = parse_args(args, &self.constants)?;
            let constant = Arguments::named(name, body.items().to_vec());
            let cmd = Command::new(CommandKind::ConstantDefine, constant.clone(), comment)?;
            self.top()?.push(cmd)?;
            self.constants.insert(name.to_string(), constant);
            return Ok(());
        }

        let kw = lookup_keyword(keyword)
            .ok_or_else(|| GloError::format(format!("unknown keyword '{keyword}'")))?;
        let args = parse_args(args, &self.constants)?;
        match kw {
            Keyword::Command(kind) => {
                let cmd = Command::new(kind, args, comment)?;
                self.top()?.push(cmd)
            }
            Keyword::Begin(SequenceKind::SubroutineDef) => {
                let at_top_level = match self.stack.as_slice() {
                    [] => true,
                    [only] => only.kind() == SequenceKind::Program,
                    _ => false,
                };
                if !at_top_level {
                    return Err(GloError::format(
                        "subroutine definitions cannot be nested inside blocks",
                    ));
                }
                let seq = Sequence::new(SequenceKind::SubroutineDef, args, comment)?;
                self.stack.push(seq);
                Ok(())
            }
            Keyword::Begin(kind) => {
                let seq = Sequence::new(kind, args, comment)?;
                self.top()?;
                self.stack.push(seq);
                Ok(())
            }
            Keyword::End(kind) => self.close(kind),
        }
    }

    fn close(&mut self, kind: SequenceKind) -> GloResult<()> {
        if kind == SequenceKind::Program && self.stack.is_empty() && self.main.is_none() {
            self.stack.push(Sequence::program());
        }
        let Some(seq) = self.stack.pop() else {
            return Err(GloError::format(format!("{kind:?} end without a matching begin")));
        };
        if seq.kind() != kind {
            return Err(GloError::format(format!(
                "{kind:?} end closes an open {:?}",
                seq.kind()
            )));
        }
        match kind {
            SequenceKind::Program => {
                self.main = Some(seq);
                Ok(())
            }
            SequenceKind::SubroutineDef => {
                self.subroutines.push(seq);
                Ok(())
            }
            SequenceKind::Loop => self
                .stack
                .last_mut()
                .ok_or_else(|| GloError::format("loop closed outside any block"))?
                .push(seq),
        }
    }

    fn finish(mut self) -> GloResult<GloFile> {
        if let Some(open) = self.stack.last()
            && open.kind() != SequenceKind::Program
        {
            return Err(GloError::format(format!(
                "unterminated {:?} at end of input",
                open.kind()
            )));
        }
        if let Some(program) = self.stack.pop() {
            tracing::debug!("program closed implicitly at end of input");
            self.main = Some(program);
        }
        let main = self.main.unwrap_or_else(Sequence::program);
        GloFile::from_parts(main, self.subroutines)
    }
}

/// Parse GLO source text into a file.
#[tracing::instrument(skip(text), fields(bytes = text.len()))]
pub fn parse_glo(text: &str) -> GloResult<GloFile> {
    let mut b = Builder::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let res = match split_line(line) {
            Ok(Line::Blank) => Ok(()),
            Ok(Line::Comment(c)) => b.comment(c),
            Ok(Line::Statement {
                keyword,
                symbol,
                args,
                comment,
            }) => b.statement(keyword, symbol, args, comment.unwrap_or_default()),
            Err(e) => Err(e),
        };
        res.map_err(|e| e.at_line(line_no, line))?;
    }
    b.finish()
}

pub fn parse_glo_path(path: &Path) -> GloResult<GloFile> {
    use anyhow::Context as _;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read GLO source '{}'", path.display()))?;
    parse_glo(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ExportOpts;

    fn stmt<'a>(
        keyword: &'a str,
        symbol: Option<&'a str>,
        args: &'a str,
        comment: Option<&'a str>,
    ) -> Line<'a> {
        Line::Statement {
            keyword,
            symbol,
            args,
            comment,
        }
    }

    #[test]
    fn split_line_forms() {
        assert_eq!(split_line(";").unwrap(), Line::Comment(";"));
        assert_eq!(
            split_line("C, 1, 2, 3").unwrap(),
            stmt("C", None, "1, 2, 3", None)
        );
        assert_eq!(
            split_line("   color , 1, 2, 3 ").unwrap(),
            stmt("color", None, "1, 2, 3", None)
        );
        assert_eq!(
            split_line("color   (1, 2, 3)  ;  comment ").unwrap(),
            stmt("color", None, "1, 2, 3", Some("  ;  comment "))
        );
        assert_eq!(
            split_line("color ( 1, 2, 3)").unwrap(),
            stmt("color", None, " 1, 2, 3", None)
        );
        assert_eq!(
            split_line("color ( 1 , 2 , 3 )").unwrap(),
            stmt("color", None, " 1 , 2 , 3", None)
        );
        assert_eq!(
            split_line("#define NAME 1, 2, 3 ; comment").unwrap(),
            stmt("#define", Some("NAME"), "1, 2, 3", Some(" ; comment"))
        );
        assert_eq!(split_line("endloop").unwrap(), stmt("endloop", None, "", None));
        assert_eq!(split_line("   ").unwrap(), Line::Blank);
        assert!(split_line("color (1, 2").is_err());
    }

    #[test]
    fn parses_blocks_constants_and_subroutines() {
        let src = "\
#define COLOR1 10, 10, 10
; intro
color (COLOR1)
loop (3)
  sub (flash) ; go
  D, 5
endloop
end
defsub (flash)
ramp (1, 2, 3, 4)
endsub
";
        let file = parse_glo(src).unwrap();
        assert_eq!(
            file.export(&ExportOpts::default()),
            "#define COLOR1 10, 10, 10\n; intro\ncolor (COLOR1)\nloop (3)\nsub (flash) ; go\n\
             delay (5)\nendloop\nend\ndefsub (flash)\nramp (1, 2, 3, 4)\nendsub"
        );
        assert_eq!(file.duration().unwrap(), 3 * (4 + 5));
    }

    #[test]
    fn errors_carry_line_context() {
        let err = parse_glo("color (1, 2, 3)\nbogus (1)\nend").unwrap_err();
        assert!(matches!(err, GloError::Format(_)));
        assert!(err.to_string().contains("line 2"));

        let err = parse_glo("loop (2)\ndelay (1)\nend").unwrap_err();
        assert!(matches!(err, GloError::Format(_)));

        let err = parse_glo("color (1, 2)\nend").unwrap_err();
        assert!(matches!(err, GloError::Validation(_)));

        assert!(parse_glo("end\ndelay (1)").is_err());
        assert!(parse_glo("loop (2)\ndefsub (x)\nendsub\nendloop\nend").is_err());
    }

    #[test]
    fn namespaced_loop_count_constant_parses_back() {
        let mut file = parse_glo("#define N 3\nloop (N)\ndelay (1)\nendloop\nend").unwrap();
        file.add_namespace("G0_").unwrap();
        let text = file.export(&ExportOpts::default());
        assert_eq!(text, "#define G0_N 3\nloop (G0_N)\ndelay (1)\nendloop\nend");

        let reparsed = parse_glo(&text).unwrap();
        assert_eq!(reparsed.duration().unwrap(), 3);
        assert_eq!(reparsed.export(&ExportOpts::default()), text);
    }

    #[test]
    fn missing_end_closes_program() {
        let file = parse_glo("delay (7)\n").unwrap();
        assert_eq!(file.duration().unwrap(), 7);
    }
}

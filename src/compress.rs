//! Equivalence-preserving size reduction.
//!
//! Each sequence is processed children-first:
//! 1. adjacent delays and comments are coalesced,
//! 2. pure timeline runs are normalized to ramps, optionally simplified
//!    (the only lossy step, bounded by `epsilon`) and converted back,
//! 3. repeated patterns are extracted into new `auto_<n>` subroutines.

mod coalesce;
mod ngram;
mod ramp;
mod simplify;

use std::collections::BTreeSet;

pub use ngram::{find_repeated_ngrams, find_repeated_ngrams_grouped};

use crate::{
    command::{Command, CommandKind},
    file::GloFile,
    fingerprint::{NodeFingerprint, fingerprint_node},
    foundation::{
        core::{Limits, Ticks},
        error::GloResult,
    },
    sequence::{Node, Sequence},
};

/// Counters reported by [`compress_file`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CompressStats {
    /// [`GloFile::node_count`] before compression.
    pub nodes_before: usize,
    /// [`GloFile::node_count`] after compression, new subroutines included.
    pub nodes_after: usize,
    /// Ramp spans collapsed by lossy simplification.
    pub spans_simplified: usize,
    /// `auto_<n>` subroutines created from repeated patterns.
    pub subroutines_extracted: usize,
}

/// Pattern-matching alphabet. Ineligible children become unique barriers so
/// no pattern can span them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Symbol {
    Node(NodeFingerprint),
    Barrier(usize),
}

fn extractable(node: &Node) -> bool {
    node.as_command().is_some_and(|c| {
        matches!(
            c.kind(),
            CommandKind::Delay | CommandKind::SetColor | CommandKind::Ramp | CommandKind::SubroutineCall
        )
    })
}

fn symbols(nodes: &[Node]) -> Vec<Symbol> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            if extractable(n) {
                Symbol::Node(fingerprint_node(n))
            } else {
                Symbol::Barrier(i)
            }
        })
        .collect()
}

struct Compressor {
    epsilon: f64,
    max_span: Ticks,
    taken: BTreeSet<String>,
    next_auto: usize,
    extracted: Vec<Sequence>,
    stats: CompressStats,
}

impl Compressor {
    fn new(file: &GloFile, epsilon: f64, limits: &Limits) -> Self {
        Self {
            epsilon,
            max_span: limits.max_delay,
            taken: file
                .subroutines()
                .iter()
                .filter_map(|s| s.name().map(str::to_owned))
                .collect(),
            next_auto: 0,
            extracted: Vec::new(),
            stats: CompressStats::default(),
        }
    }

    fn fresh_name(&mut self) -> String {
        loop {
            let name = format!("auto_{}", self.next_auto);
            self.next_auto += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    fn sequence(&mut self, seq: &mut Sequence) -> GloResult<()> {
        let mut nodes = seq.take_children();
        for node in &mut nodes {
            if let Node::Sequence(inner) = node {
                self.sequence(inner)?;
            }
        }

        nodes = coalesce::coalesce_delays(nodes);
        if ramp::qualifies(&nodes) {
            let mut ramps = ramp::to_ramps(nodes);
            self.stats.spans_simplified += simplify::simplify(&mut ramps, self.epsilon, self.max_span);
            nodes = ramp::from_ramps(ramps);
        }
        nodes = self.extract(nodes)?;
        seq.set_children(nodes)
    }

    /// Repeatedly replace the most profitable repeated pattern with calls to
    /// a new subroutine until no pattern saves anything.
    fn extract(&mut self, mut nodes: Vec<Node>) -> GloResult<Vec<Node>> {
        while let Some((len, groups)) = ngram::best_candidate(&symbols(&nodes)) {
            let Some(start) = groups.first().and_then(|g| g.first()).copied() else {
                break;
            };
            let name = self.fresh_name();
            let mut sub = Sequence::subroutine(name.clone());
            sub.set_children(nodes[start..start + len].to_vec())?;

            for group in groups.iter().rev() {
                let Some(&at) = group.first() else {
                    continue;
                };
                let call: Node = Command::call(name.clone()).into();
                let replacement = if group.len() > 1 {
                    let mut lp = Sequence::looped(group.len() as u64);
                    lp.push(call)?;
                    Node::from(lp)
                } else {
                    call
                };
                nodes.splice(at..at + len * group.len(), [replacement]);
            }

            tracing::debug!(
                subroutine = %name,
                len,
                groups = groups.len(),
                "extracted repeated pattern"
            );
            self.stats.subroutines_extracted += 1;
            self.extracted.push(sub);
        }
        Ok(nodes)
    }
}

/// Compress the program and every subroutine in place. New subroutines are
/// appended after the existing ones.
///
/// `epsilon` bounds the color error of curve simplification (negative keeps
/// the pass lossless). Simplified ramps never exceed `limits.max_delay`, so
/// the output stays resolvable by [`crate::limits::resolve_limits`].
#[tracing::instrument(skip(file))]
pub fn compress_file(
    file: &mut GloFile,
    epsilon: f64,
    limits: &Limits,
) -> GloResult<CompressStats> {
    let mut c = Compressor::new(file, epsilon, limits);
    c.stats.nodes_before = file.node_count();

    c.sequence(file.main_mut())?;
    for sub in file.subroutines_mut() {
        c.sequence(sub)?;
    }
    for sub in std::mem::take(&mut c.extracted) {
        file.add_subroutine(sub)?;
    }

    c.stats.nodes_after = file.node_count();
    tracing::debug!(stats = ?c.stats, "compression done");
    Ok(c.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ExportOpts;

    fn program(nodes: Vec<Node>) -> GloFile {
        let mut main = Sequence::program();
        main.extend(nodes).unwrap();
        GloFile::new(main)
    }

    fn flashing(times: usize) -> Vec<Node> {
        let mut nodes = Vec::new();
        for _ in 0..times {
            nodes.push(Command::set_color([1, 1, 1]).into());
            nodes.push(Command::delay(5).into());
            nodes.push(Command::set_color([2, 2, 2]).into());
            nodes.push(Command::delay(5).into());
        }
        nodes
    }

    #[test]
    fn back_to_back_repeats_become_a_looped_call() {
        let mut file = program(flashing(4));
        let before = file.render().unwrap();

        let stats = compress_file(&mut file, -1.0, &Limits::default()).unwrap();
        assert_eq!(stats.subroutines_extracted, 1);
        assert_eq!(
            file.export(&ExportOpts::default()),
            "loop (4)\nsub (auto_0)\nendloop\nend\n\
             defsub (auto_0)\ncolor (1, 1, 1)\ndelay (5)\ncolor (2, 2, 2)\ndelay (5)\nendsub"
        );
        assert_eq!(file.render().unwrap(), before);
        assert!(stats.nodes_after < stats.nodes_before);
    }

    #[test]
    fn barriers_and_existing_names_are_respected() {
        let red = Command::new(
            CommandKind::SetRed,
            crate::args::Arguments::from_ints(&[7]),
            "",
        )
        .unwrap();
        let mut nodes = flashing(1);
        nodes.push(red.into());
        nodes.extend(flashing(3));
        let mut file = program(nodes);
        file.add_subroutine(Sequence::subroutine("auto_0")).unwrap();
        let before = file.render().unwrap();

        compress_file(&mut file, -1.0, &Limits::default()).unwrap();
        assert_eq!(file.render().unwrap(), before);
        assert_eq!(
            file.main().export_lines(&ExportOpts::default(), 0).join("\n"),
            "sub (auto_1)\nred (7)\nloop (3)\nsub (auto_1)\nendloop\nend"
        );
        assert_eq!(file.subroutines().len(), 2);
    }

    #[test]
    fn adjacent_delays_merge_inside_loops() {
        let mut lp = Sequence::looped(3);
        lp.push(Command::call("s")).unwrap();
        lp.push(Command::delay(2)).unwrap();
        lp.push(Command::noop(" ; x")).unwrap();
        lp.push(Command::delay(3)).unwrap();
        let mut file = program(vec![lp.into()]);
        file.add_subroutine(Sequence::subroutine("s")).unwrap();

        compress_file(&mut file, -1.0, &Limits::default()).unwrap();
        assert_eq!(
            file.main().export_lines(&ExportOpts::default(), 0).join("\n"),
            "loop (3)\nsub (s)\ndelay (5) ; x\nendloop\nend"
        );
        assert_eq!(file.duration().unwrap(), 15);
    }

    #[test]
    fn lossless_compression_preserves_duration_and_render() {
        let mut nodes = vec![Node::from(Command::set_color([0, 0, 0]))];
        for i in 0..6 {
            nodes.push(Command::ramp([i * 10, 0, 0], 4).into());
            nodes.push(Command::delay(3).into());
            nodes.push(Command::delay(1).into());
        }
        let mut file = program(nodes);
        let before = file.render().unwrap();
        compress_file(&mut file, -1.0, &Limits::default()).unwrap();
        assert_eq!(file.duration().unwrap(), before.len() as u64);
        assert_eq!(file.render().unwrap(), before);
    }
}

use crate::{
    anchor::resolve_time,
    compress::{CompressStats, compress_file},
    file::GloFile,
    foundation::{
        core::{CompileConfig, Ticks},
        error::GloResult,
    },
    labels::Labels,
    limits::{LimitStats, resolve_limits},
};

/// Summary of one [`Compiler::compile`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CompileStats {
    /// Node count of the parsed file.
    pub nodes_before: usize,
    /// Node count of the compiled file.
    pub nodes_after: usize,
    /// Program duration after every pass.
    pub duration_ticks: Ticks,
    /// Number of `time` anchors replaced.
    pub anchors_resolved: usize,
    /// Present when compression ran.
    pub compress: Option<CompressStats>,
    /// Present when controller limits were resolved.
    pub limits: Option<LimitStats>,
}

/// Runs the compiler passes over a parsed file in a fixed order:
/// constants, time anchors, compression, controller limits, comment stripping.
#[derive(Clone, Debug)]
pub struct Compiler {
    cfg: CompileConfig,
}

impl Compiler {
    /// Validate `cfg` and build a compiler that applies it to every file.
    pub fn new(cfg: CompileConfig) -> GloResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// The validated configuration.
    pub fn config(&self) -> &CompileConfig {
        &self.cfg
    }

    /// Run every enabled pass over `file` in place.
    ///
    /// `labels` is only consulted by anchors that name a label. Any error
    /// aborts the compilation; the file may then be partially rewritten.
    #[tracing::instrument(skip(self, file, labels))]
    pub fn compile(&self, file: &mut GloFile, labels: Option<&Labels>) -> GloResult<CompileStats> {
        let mut stats = CompileStats {
            nodes_before: file.node_count(),
            ..CompileStats::default()
        };

        file.resolve_constants();
        stats.anchors_resolved = resolve_time(file, labels)?;
        let duration = file.duration()?;

        if self.cfg.compress {
            stats.compress = Some(compress_file(file, self.cfg.epsilon, &self.cfg.limits)?);
        }
        if self.cfg.resolve_limits {
            stats.limits = Some(resolve_limits(file, &self.cfg.limits)?);
        }
        if self.cfg.strip_comments {
            file.strip_comments();
        }

        stats.duration_ticks = file.duration()?;
        if self.cfg.epsilon < 0.0 && stats.duration_ticks != duration {
            tracing::warn!(
                before = duration,
                after = stats.duration_ticks,
                "program duration changed during compilation"
            );
        }
        stats.nodes_after = file.node_count();
        tracing::debug!(?stats, "compiled");
        Ok(stats)
    }
}

/// Merge independently authored files into one, prefixing file `i`'s names
/// with `G<i>_` so they cannot collide.
#[tracing::instrument(skip(files), fields(count = files.len()))]
pub fn merge_files(files: Vec<GloFile>) -> GloResult<GloFile> {
    let mut merged: Option<GloFile> = None;
    for (i, mut file) in files.into_iter().enumerate() {
        file.add_namespace(&format!("G{i}_"))?;
        match merged.as_mut() {
            Some(m) => m.merge(file)?,
            None => merged = Some(file),
        }
    }
    Ok(merged.unwrap_or_default())
}

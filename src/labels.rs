use std::{collections::BTreeMap, path::Path, sync::LazyLock};

use regex::{Captures, Regex};

use crate::foundation::{
    core::{CompileConfig, Ticks},
    error::{GloError, GloResult},
};

/// Named time markers, in ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels {
    entries: BTreeMap<String, (Ticks, Ticks)>,
}

/// Recognized label-file layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelDialect {
    /// `start<ws>end<ws>name`, times in seconds.
    Audacity,
    /// `id,name,m:ss.fff`
    MarkerMinSec,
    /// `id,name,bar.beat.hundredths`
    MarkerBarsBeats,
    /// `id,name,seconds`
    MarkerSeconds,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("label pattern is a valid regex")
}

static AUDACITY: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)\s+(.+?)\s*$"));
static MARKER_MINSEC: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*[^,]*,\s*([^,]*?)\s*,\s*(\d+):(\d+(?:\.\d+)?)\s*(?:,.*)?$"));
static MARKER_BARS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*[^,]*,\s*([^,]*?)\s*,\s*(\d+)\.(\d+)\.(\d+)\s*(?:,.*)?$"));
static MARKER_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*[^,]*,\s*([^,]*?)\s*,\s*(\d+(?:\.\d+)?)\s*(?:,.*)?$"));

impl LabelDialect {
    const DETECTION_ORDER: [LabelDialect; 4] = [
        LabelDialect::Audacity,
        LabelDialect::MarkerMinSec,
        LabelDialect::MarkerBarsBeats,
        LabelDialect::MarkerSeconds,
    ];

    fn pattern(self) -> &'static Regex {
        match self {
            LabelDialect::Audacity => &AUDACITY,
            LabelDialect::MarkerMinSec => &MARKER_MINSEC,
            LabelDialect::MarkerBarsBeats => &MARKER_BARS,
            LabelDialect::MarkerSeconds => &MARKER_SECONDS,
        }
    }

    /// First dialect whose pattern matches every data row.
    pub fn detect(rows: &[&str]) -> GloResult<Self> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|d| rows.iter().all(|r| d.pattern().is_match(r)))
            .ok_or_else(|| {
                GloError::format(format!(
                    "unrecognized label file dialect (first row: '{}')",
                    rows.first().copied().unwrap_or_default()
                ))
            })
    }

    fn parse_row(self, row: &str, cfg: &CompileConfig) -> GloResult<(String, Ticks, Ticks)> {
        let caps = self
            .pattern()
            .captures(row)
            .ok_or_else(|| GloError::format(format!("malformed label row '{row}'")))?;
        let num = |caps: &Captures<'_>, i: usize| -> GloResult<f64> {
            caps[i]
                .parse::<f64>()
                .map_err(|e| GloError::format(format!("bad number in label row '{row}': {e}")))
        };
        match self {
            LabelDialect::Audacity => {
                let start = cfg.secs_to_ticks(num(&caps, 1)?);
                let end = cfg.secs_to_ticks(num(&caps, 2)?);
                Ok((caps[3].to_string(), start, end))
            }
            LabelDialect::MarkerMinSec => {
                let secs = num(&caps, 2)? * 60.0 + num(&caps, 3)?;
                let t = cfg.secs_to_ticks(secs);
                Ok((caps[1].to_string(), t, t))
            }
            LabelDialect::MarkerBarsBeats => {
                let bar = num(&caps, 2)?;
                let beat = num(&caps, 3)?;
                let hundredths = num(&caps, 4)?;
                let beats = (bar - 1.0) * f64::from(cfg.beats_per_bar) + (beat - 1.0)
                    + hundredths / 100.0;
                let t = cfg.secs_to_ticks(beats * cfg.beat_secs());
                Ok((caps[1].to_string(), t, t))
            }
            LabelDialect::MarkerSeconds => {
                let t = cfg.secs_to_ticks(num(&caps, 2)?);
                Ok((caps[1].to_string(), t, t))
            }
        }
    }
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, start: Ticks, end: Ticks) {
        self.entries.insert(name.into(), (start, end));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<(Ticks, Ticks)> {
        self.entries.get(name).copied()
    }

    pub fn label_start(&self, name: &str) -> GloResult<Ticks> {
        self.get(name)
            .map(|(s, _)| s)
            .ok_or_else(|| GloError::resolution(format!("unknown label '{name}'")))
    }

    pub fn label_end(&self, name: &str) -> GloResult<Ticks> {
        self.get(name)
            .map(|(_, e)| e)
            .ok_or_else(|| GloError::resolution(format!("unknown label '{name}'")))
    }

    /// Parse a label file, detecting its dialect from the data rows.
    #[tracing::instrument(skip(text, cfg))]
    pub fn parse(text: &str, cfg: &CompileConfig) -> GloResult<Self> {
        let rows: Vec<&str> = text
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            .collect();
        let mut labels = Self::new();
        if rows.is_empty() {
            return Ok(labels);
        }

        let dialect = LabelDialect::detect(&rows)?;
        tracing::debug!(?dialect, rows = rows.len(), "detected label dialect");
        for row in rows {
            let (name, start, end) = dialect.parse_row(row, cfg)?;
            if labels.entries.contains_key(&name) {
                tracing::warn!(label = %name, "duplicate label, keeping the last one");
            }
            labels.insert(name, start, end);
        }
        Ok(labels)
    }

    pub fn from_path(path: &Path, cfg: &CompileConfig) -> GloResult<Self> {
        use anyhow::Context as _;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read labels '{}'", path.display()))?;
        Self::parse(&text, cfg)
    }
}

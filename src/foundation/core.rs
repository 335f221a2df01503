use std::path::Path;

use crate::foundation::error::{GloError, GloResult};

/// Compiler time unit. One tick is `1 / ticks_per_second` seconds.
pub type Ticks = u64;

/// Hard limits enforced by the lighting controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest repeat count a single loop may carry.
    pub max_loop: u64,
    /// Longest single delay, in ticks.
    pub max_delay: Ticks,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_loop: 255,
            max_delay: 65535,
        }
    }
}

impl Limits {
    /// Reject limits no rewrite can satisfy: `max_loop` below 2 or a zero
    /// `max_delay`.
    pub fn validate(&self) -> GloResult<()> {
        if self.max_loop < 2 {
            return Err(GloError::validation("limits.max_loop must be >= 2"));
        }
        if self.max_delay == 0 {
            return Err(GloError::validation("limits.max_delay must be > 0"));
        }
        Ok(())
    }
}

/// Settings threaded through every compiler pass.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Tick resolution used when converting label times.
    pub ticks_per_second: u32,
    /// Tempo for bars.beats marker times.
    pub tempo_bpm: f64,
    /// Meter for bars.beats marker times.
    pub beats_per_bar: u32,
    pub limits: Limits,
    /// Run the compression passes.
    pub compress: bool,
    /// Curve simplification threshold; negative disables the lossy step.
    pub epsilon: f64,
    /// Lower loops and delays to `limits`.
    pub resolve_limits: bool,
    /// Drop comments and pass diagnostics from the output.
    pub strip_comments: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 100,
            tempo_bpm: 120.0,
            beats_per_bar: 4,
            limits: Limits::default(),
            compress: false,
            epsilon: -1.0,
            resolve_limits: true,
            strip_comments: false,
        }
    }
}

impl CompileConfig {
    /// Check every field, including the nested [`Limits`].
    pub fn validate(&self) -> GloResult<()> {
        if self.ticks_per_second == 0 {
            return Err(GloError::validation("ticks_per_second must be > 0"));
        }
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Err(GloError::validation("tempo_bpm must be a positive number"));
        }
        if self.beats_per_bar == 0 {
            return Err(GloError::validation("beats_per_bar must be > 0"));
        }
        if !self.epsilon.is_finite() {
            return Err(GloError::validation("epsilon must be finite"));
        }
        self.limits.validate()
    }

    /// Parse and validate a JSON config; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> GloResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| GloError::format(format!("invalid compile config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: &Path) -> GloResult<Self> {
        use anyhow::Context as _;
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read compile config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Convert seconds into ticks using floor semantics.
    pub fn secs_to_ticks(&self, secs: f64) -> Ticks {
        (secs * f64::from(self.ticks_per_second)).floor().max(0.0) as Ticks
    }

    /// Length of one beat in seconds at the configured tempo.
    pub fn beat_secs(&self) -> f64 {
        60.0 / self.tempo_bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_controller() {
        let cfg = CompileConfig::default();
        assert_eq!(cfg.limits.max_loop, 255);
        assert_eq!(cfg.limits.max_delay, 65535);
        assert_eq!(cfg.ticks_per_second, 100);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CompileConfig::from_json_str(r#"{"compress": true, "limits": {"max_loop": 15}}"#)
            .unwrap();
        assert!(cfg.compress);
        assert_eq!(cfg.limits.max_loop, 15);
        assert_eq!(cfg.limits.max_delay, 65535);
        assert_eq!(cfg.epsilon, -1.0);
    }

    #[test]
    fn validate_rejects_bad_limits() {
        let mut cfg = CompileConfig::default();
        cfg.limits.max_loop = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = CompileConfig::default();
        cfg.limits.max_delay = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = CompileConfig::default();
        cfg.ticks_per_second = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let err = CompileConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, GloError::Format(_)));
    }

    #[test]
    fn secs_to_ticks_floors() {
        let cfg = CompileConfig::default();
        assert_eq!(cfg.secs_to_ticks(29.111111), 2911);
        assert_eq!(cfg.secs_to_ticks(31.999999), 3199);
        assert_eq!(cfg.secs_to_ticks(60.125), 6012);
    }
}

//! Engine tunables and initial parameter targets.

use core::ops::RangeInclusive;
use rotor_core::{RampedParam, SpreadMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Nominal cutoff range in Hz. Stage frequencies are clamped further to
/// `5 Hz..sample_rate / 2.1` by the spread distribution.
pub const FREQUENCY_RANGE: RangeInclusive<f32> = 5.0..=20_000.0;

/// Resonance (Q) range.
pub const RESONANCE_RANGE: RangeInclusive<f32> = 0.01..=30.0;

/// Signed spread range in Hz.
pub const SPREAD_RANGE: RangeInclusive<f32> = -20_000.0..=20_000.0;

/// Serialized form of [`SpreadMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadStyle {
    /// Equal Hz steps
    Linear,
    /// Equal pitch steps
    #[default]
    Logarithmic,
}

impl From<SpreadStyle> for SpreadMode {
    fn from(style: SpreadStyle) -> Self {
        match style {
            SpreadStyle::Linear => SpreadMode::Linear,
            SpreadStyle::Logarithmic => SpreadMode::Logarithmic,
        }
    }
}

impl From<SpreadMode> for SpreadStyle {
    fn from(mode: SpreadMode) -> Self {
        match mode {
            SpreadMode::Linear => SpreadStyle::Linear,
            SpreadMode::Logarithmic => SpreadStyle::Logarithmic,
        }
    }
}

/// Engine configuration.
///
/// Loaded from TOML; every field is optional and falls back to its default.
///
/// # TOML Format
///
/// ```toml
/// ramp_duration_ms = 100.0
/// automation_precision = 1
/// recompute_interval = 32
///
/// frequency_hz = 1000.0
/// resonance = 0.5
/// spread_hz = 0.0
/// spread_mode = "logarithmic"
/// stages = 0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RotorConfig {
    /// Duration of a full parameter ramp in milliseconds.
    pub ramp_duration_ms: f32,
    /// Divisor applied to the ramp length. Higher values settle sooner and
    /// recompute coefficients less often.
    pub automation_precision: u32,
    /// Samples between coefficient recomputations while a parameter ramps.
    pub recompute_interval: u32,
    /// Initial center frequency in Hz.
    pub frequency_hz: f32,
    /// Initial resonance (Q).
    pub resonance: f32,
    /// Initial spread in Hz.
    pub spread_hz: f32,
    /// Initial spread interpolation.
    pub spread_mode: SpreadStyle,
    /// Initial stage count.
    pub stages: u32,
}

impl Default for RotorConfig {
    fn default() -> Self {
        Self {
            ramp_duration_ms: RampedParam::DEFAULT_RAMP_MS,
            automation_precision: 1,
            recompute_interval: 32,
            frequency_hz: 1000.0,
            resonance: 0.5,
            spread_hz: 0.0,
            spread_mode: SpreadStyle::Logarithmic,
            stages: 0,
        }
    }
}

impl RotorConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RotorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with.
    ///
    /// Parameter targets are not checked here; they are clamped into
    /// [`FREQUENCY_RANGE`], [`RESONANCE_RANGE`] and [`SPREAD_RANGE`] when
    /// applied, the same way automation is.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ramp_duration_ms.is_finite() || self.ramp_duration_ms < 0.0 {
            return Err(ConfigError::invalid(
                "ramp_duration_ms",
                format!("must be a finite, non-negative duration, got {}", self.ramp_duration_ms),
            ));
        }
        if self.automation_precision == 0 {
            return Err(ConfigError::invalid("automation_precision", "must be at least 1"));
        }
        if self.recompute_interval == 0 {
            return Err(ConfigError::invalid("recompute_interval", "must be at least 1"));
        }
        Ok(())
    }
}

/// Clamp a control value into `range`, mapping NaN to `None`.
pub(crate) fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> Option<f32> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(*range.start(), *range.end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = RotorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recompute_interval, 32);
        assert_eq!(config.spread_mode, SpreadStyle::Logarithmic);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = RotorConfig::from_toml("stages = 12\nspread_mode = \"linear\"").unwrap();
        assert_eq!(config.stages, 12);
        assert_eq!(config.spread_mode, SpreadStyle::Linear);
        assert_eq!(config.frequency_hz, 1000.0);
    }

    #[test]
    fn toml_roundtrip() {
        let config = RotorConfig {
            stages: 64,
            spread_hz: -1500.0,
            ..RotorConfig::default()
        };
        let parsed = RotorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn rejects_zero_interval() {
        let err = RotorConfig::from_toml("recompute_interval = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "recompute_interval", .. }
        ));
    }

    #[test]
    fn rejects_zero_precision() {
        let err = RotorConfig::from_toml("automation_precision = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "automation_precision", .. }
        ));
    }

    #[test]
    fn rejects_negative_ramp() {
        let err = RotorConfig::from_toml("ramp_duration_ms = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ramp_duration_ms", .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            RotorConfig::from_toml("stages = \"many\""),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rotor.toml");
        let config = RotorConfig {
            resonance: 2.5,
            ..RotorConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RotorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_missing_file() {
        let err = RotorConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn clamp_to_handles_nan_and_bounds() {
        assert_eq!(clamp_to(f32::NAN, &RESONANCE_RANGE), None);
        assert_eq!(clamp_to(100.0, &RESONANCE_RANGE), Some(30.0));
        assert_eq!(clamp_to(0.0, &RESONANCE_RANGE), Some(0.01));
        assert_eq!(clamp_to(f32::INFINITY, &FREQUENCY_RANGE), Some(20_000.0));
    }

    #[test]
    fn spread_style_conversions() {
        assert_eq!(SpreadMode::from(SpreadStyle::Linear), SpreadMode::Linear);
        assert_eq!(SpreadStyle::from(SpreadMode::Logarithmic), SpreadStyle::Logarithmic);
    }
}

//! Analyser configuration.
//!
//! All options have defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! transform_size = 32768
//! smoothing = 0.25
//! interval_ms = 100
//! min_search_seconds = 0.0
//! max_search_seconds = 10.0
//! magnitude_floor = 100.0
//! magnitude_ceiling = 1100.0
//! # dtw_band = 8
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::pitch::{DEFAULT_MAGNITUDE_CEILING, DEFAULT_MAGNITUDE_FLOOR, PeakGate};

/// Largest transform the analyser accepts.
pub const MAX_TRANSFORM_SIZE: usize = 32768;
/// Smallest transform the analyser accepts.
pub const MIN_TRANSFORM_SIZE: usize = 32;
/// Longest trajectory a session may keep, in points.
pub const MAX_TRAJECTORY_POINTS: usize = 100_000;

/// Options recognised by the analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Transform size; frames carry `transform_size / 2` bins.
    pub transform_size: usize,
    /// Smoothing time constant applied by the spectrum analyser, in `[0, 1)`.
    pub smoothing: f32,
    /// Tick cadence in milliseconds.
    pub interval_ms: u64,
    /// Trajectory length, in seconds, before matching starts. Zero matches
    /// from the first point.
    pub min_search_seconds: f32,
    /// Trajectory horizon, in seconds, before the buffer resets.
    pub max_search_seconds: f32,
    /// Bins must be louder than this to count as a peak.
    pub magnitude_floor: f32,
    /// Bins must be quieter than this to count as a peak.
    pub magnitude_ceiling: f32,
    /// Optional Sakoe-Chiba band half-width for DTW. Unset means full matrix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtw_band: Option<usize>,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            transform_size: MAX_TRANSFORM_SIZE,
            smoothing: 0.25,
            interval_ms: 100,
            min_search_seconds: 0.0,
            max_search_seconds: 10.0,
            magnitude_floor: DEFAULT_MAGNITUDE_FLOOR,
            magnitude_ceiling: DEFAULT_MAGNITUDE_CEILING,
            dtw_band: None,
        }
    }
}

impl AnalyserConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded analyser config");
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every option against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.transform_size.is_power_of_two()
            || !(MIN_TRANSFORM_SIZE..=MAX_TRANSFORM_SIZE).contains(&self.transform_size)
        {
            return Err(ConfigError::invalid(
                "transform_size",
                format!(
                    "{} is not a power of two between {MIN_TRANSFORM_SIZE} and {MAX_TRANSFORM_SIZE}",
                    self.transform_size
                ),
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(ConfigError::invalid(
                "smoothing",
                format!("{} is outside [0, 1)", self.smoothing),
            ));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::invalid("interval_ms", "must be greater than zero"));
        }
        if !self.max_search_seconds.is_finite() || self.max_search_seconds <= 0.0 {
            return Err(ConfigError::invalid(
                "max_search_seconds",
                "must be a positive number of seconds",
            ));
        }
        if !self.min_search_seconds.is_finite()
            || self.min_search_seconds < 0.0
            || self.min_search_seconds > self.max_search_seconds
        {
            return Err(ConfigError::invalid(
                "min_search_seconds",
                format!(
                    "{} must be between 0 and max_search_seconds ({})",
                    self.min_search_seconds, self.max_search_seconds
                ),
            ));
        }
        if !self.magnitude_floor.is_finite() || !self.magnitude_ceiling.is_finite() {
            return Err(ConfigError::invalid(
                "magnitude_floor",
                format!(
                    "gate bounds must be finite numbers, got {} and {}",
                    self.magnitude_floor, self.magnitude_ceiling
                ),
            ));
        }
        if self.magnitude_floor >= self.magnitude_ceiling {
            return Err(ConfigError::invalid(
                "magnitude_floor",
                format!(
                    "floor {} must be below ceiling {}",
                    self.magnitude_floor, self.magnitude_ceiling
                ),
            ));
        }
        let points = self.horizon_points();
        if points < 1.0 {
            return Err(ConfigError::invalid(
                "max_search_seconds",
                "horizon is shorter than one tick",
            ));
        }
        if points > MAX_TRAJECTORY_POINTS as f64 {
            return Err(ConfigError::invalid(
                "max_search_seconds",
                format!(
                    "horizon of {points:.0} ticks exceeds the limit of {MAX_TRAJECTORY_POINTS}"
                ),
            ));
        }
        Ok(())
    }

    /// Number of bins per spectral frame.
    pub fn bin_count(&self) -> usize {
        self.transform_size / 2
    }

    fn horizon_points(&self) -> f64 {
        (f64::from(self.max_search_seconds) * 1000.0 / self.interval_ms as f64).floor()
    }

    /// Points the trajectory holds before it resets. Never above
    /// [`MAX_TRAJECTORY_POINTS`].
    pub fn trajectory_capacity(&self) -> usize {
        (self.horizon_points() as usize).min(MAX_TRAJECTORY_POINTS)
    }

    /// Points the trajectory needs before matching starts.
    pub fn min_trajectory_len(&self) -> usize {
        (f64::from(self.min_search_seconds) * 1000.0 / self.interval_ms as f64).ceil() as usize
    }

    pub fn gate(&self) -> PeakGate {
        PeakGate {
            floor: self.magnitude_floor,
            ceiling: self.magnitude_ceiling,
        }
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

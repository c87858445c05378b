//! # Analysis Session Module
//!
//! Owns all mutable state of one capture session: the trajectory buffer and
//! the confidence histogram, plus the read-only template library and the
//! settings they were built from. Each tick takes `&mut self`, so exactly one
//! tick can touch that state at a time.

use serde::Serialize;
use std::sync::Arc;

use crate::config::AnalyserConfig;
use crate::confidence::{Confidence, ConfidenceHistogram};
use crate::dtw::{DtwMatcher, MatchRecord};
use crate::error::ConfigError;
use crate::pitch::{self, PeakGate};
use crate::templates::TemplateLibrary;
use crate::trajectory::TrajectoryBuffer;
use crate::tuning;

/// What a single tick produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Dominant frequency of the frame, `None` for silence.
    pub frequency: Option<f32>,
    /// Nearest pitch name, empty for silence.
    pub pitch_name: &'static str,
    /// Trajectory length after this tick's append.
    pub trajectory_len: usize,
    /// Match result, `None` while the trajectory is below the minimum length.
    pub matched: Option<MatchRecord>,
}

/// Consumer-facing view of the session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub enabled: bool,
    pub pitch_name: &'static str,
    pub trajectory: Vec<f32>,
    /// Time span of `trajectory` in milliseconds.
    pub trajectory_ms: u64,
    pub ranking: Vec<Confidence>,
    pub last_winner: Option<String>,
    pub total_matches: u64,
}

/// One active capture and analysis session.
#[derive(Debug)]
pub struct Session {
    config: AnalyserConfig,
    sample_rate: u32,
    gate: PeakGate,
    min_trajectory_len: usize,
    library: Arc<TemplateLibrary>,
    matcher: DtwMatcher,
    trajectory: TrajectoryBuffer,
    histogram: ConfidenceHistogram,
    last_pitch: &'static str,
    enabled: bool,
}

impl Session {
    /// Creates an enabled session with an empty trajectory and histogram.
    ///
    /// # Errors
    /// Returns the config validation error if the config is out of range.
    pub fn new(
        config: AnalyserConfig,
        sample_rate: u32,
        library: Arc<TemplateLibrary>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be greater than zero"));
        }

        tracing::info!(
            sample_rate,
            transform_size = config.transform_size,
            interval_ms = config.interval_ms,
            capacity = config.trajectory_capacity(),
            min_len = config.min_trajectory_len(),
            templates = library.len(),
            "session created"
        );

        Ok(Self {
            gate: config.gate(),
            min_trajectory_len: config.min_trajectory_len(),
            matcher: DtwMatcher::with_band(config.dtw_band),
            trajectory: TrajectoryBuffer::new(config.trajectory_capacity()),
            histogram: ConfidenceHistogram::new(),
            last_pitch: "",
            enabled: true,
            config,
            sample_rate,
            library,
        })
    }

    /// Processes one spectral frame.
    ///
    /// Extracts the fundamental, appends it to the trajectory (silence as
    /// `0.0`) and, once the trajectory reaches the minimum length, runs one
    /// full matching pass and records the winner.
    ///
    /// Returns `None` without touching any state while the session is
    /// disabled.
    pub fn tick(&mut self, frame: &[u8]) -> Option<TickReport> {
        if !self.enabled {
            return None;
        }

        let frequency = pitch::extract_fundamental(
            frame,
            self.sample_rate,
            self.config.transform_size,
            self.gate,
        );
        let pitch_name = frequency.map_or("", tuning::find_nearest_pitch);
        self.last_pitch = pitch_name;

        if self.trajectory.is_full() {
            tracing::debug!(
                horizon_ms = self.trajectory.duration_ms(self.config.interval_ms),
                "search horizon reached, trajectory starts over"
            );
        }
        self.trajectory.append(frequency.unwrap_or(0.0));

        let matched = if self.trajectory.len() >= self.min_trajectory_len {
            self.matcher
                .best_match(self.trajectory.points(), &self.library)
        } else {
            None
        };
        if let Some(record) = &matched {
            self.histogram.record(record);
        }

        Some(TickReport {
            frequency,
            pitch_name,
            trajectory_len: self.trajectory.len(),
            matched,
        })
    }

    /// Turns the session on or off. Switching on from off starts over with an
    /// empty trajectory and histogram.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.reset();
        }
        if enabled != self.enabled {
            tracing::info!(enabled, "session toggled");
        }
        self.enabled = enabled;
    }

    /// Flips the enabled state and returns the new one.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Clears the trajectory and the histogram.
    pub fn reset(&mut self) {
        self.trajectory.reset();
        self.histogram.reset();
        self.last_pitch = "";
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn trajectory(&self) -> &TrajectoryBuffer {
        &self.trajectory
    }

    pub fn histogram(&self) -> &ConfidenceHistogram {
        &self.histogram
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Copies out everything a display needs.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            enabled: self.enabled,
            pitch_name: self.last_pitch,
            trajectory: self.trajectory.points().to_vec(),
            trajectory_ms: self.trajectory.duration_ms(self.config.interval_ms),
            ranking: self.histogram.ranking(),
            last_winner: self.histogram.last_winner().map(str::to_string),
            total_matches: self.histogram.total(),
        }
    }
}

//! Error types for the melody identification core.
//!
//! Conditions that are part of normal operation (no spectral peak, a
//! trajectory too short to match) are modelled as `Option` values and never
//! show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a [`TemplateLibrary`](crate::templates::TemplateLibrary).
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The data set contained no templates at all.
    #[error("template library is empty")]
    EmptyLibrary,

    /// A template has an empty name.
    #[error("template #{index} has an empty name")]
    EmptyName {
        /// Position of the offending template in the data set.
        index: usize,
    },

    /// Two templates share a name.
    #[error("duplicate template name '{0}'")]
    DuplicateName(String),

    /// A template has no frequency values.
    #[error("template '{0}' has no frequency values")]
    EmptyTemplate(String),

    /// A template contains a NaN, infinite or negative frequency.
    #[error("template '{name}' has an invalid frequency {value} at index {index}")]
    InvalidValue {
        /// Template name.
        name: String,
        /// Index of the offending value.
        index: usize,
        /// The rejected value.
        value: f32,
    },

    /// The template file could not be read.
    #[error("failed to read template file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The template data is not valid JSON of the expected shape.
    #[error("failed to parse template data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while loading or validating an [`AnalyserConfig`](crate::config::AnalyserConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// An option holds a value outside its accepted range.
    #[error("invalid option '{option}': {reason}")]
    InvalidOption {
        /// Name of the option, as spelled in the config file.
        option: &'static str,
        /// Description of why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid option error.
    pub fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}

/// Boxed error produced by a frame source backend.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a [`FrameSource`](crate::capture::FrameSource).
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The source could not be opened (device missing, permission denied...).
    /// The session never starts ticking after this.
    #[error("audio acquisition failed: {0}")]
    Acquisition(#[source] SourceError),

    /// The source failed while the session was running.
    #[error("frame read failed: {0}")]
    Read(#[source] SourceError),

    /// The worker thread could not be started.
    #[error("failed to start session worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The source produced a frame of the wrong size.
    #[error("frame has {got} bins, expected {expected}")]
    FrameSize {
        /// Bin count the session was configured for.
        expected: usize,
        /// Bin count the source delivered.
        got: usize,
    },
}

/// Umbrella error for callers that deal with several core operations at once.
#[derive(Debug, Error)]
pub enum MelodyError {
    /// Template library error.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Capture error.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Convenience Result type for melody-core operations.
pub type Result<T> = std::result::Result<T, MelodyError>;

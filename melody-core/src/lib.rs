// melody-core/src/lib.rs

//! The core logic for identifying a hummed or played melody.
//!
//! Each tick a byte magnitude spectrum is reduced to its dominant frequency,
//! the frequency is appended to a bounded pitch trajectory, and the trajectory
//! is compared by dynamic time warping against every segment of every
//! template in a library. Winners accumulate in a confidence histogram.
//!
//! The crate is headless: audio arrives through the [`capture::FrameSource`]
//! trait and results leave as plain values or worker events.

pub mod analyser;
pub mod capture;
pub mod confidence;
pub mod config;
pub mod dtw;
pub mod error;
pub mod pitch;
pub mod session;
pub mod templates;
pub mod trajectory;
pub mod tuning;

pub use analyser::{SampleFrameSource, SpectrumAnalyser, render_trajectory};
pub use capture::{
    FrameRead, FrameSource, SessionWorker, SourceInfo, WorkerCommand, WorkerEvent, run_offline,
};
pub use confidence::{Confidence, ConfidenceHistogram};
pub use config::AnalyserConfig;
pub use dtw::{DtwMatcher, MatchRecord, dtw_distance};
pub use error::{CaptureError, ConfigError, MelodyError, Result, TemplateError};
pub use session::{Session, SessionSnapshot, TickReport};
pub use templates::{Template, TemplateLibrary};
pub use trajectory::TrajectoryBuffer;
pub use tuning::find_nearest_pitch;

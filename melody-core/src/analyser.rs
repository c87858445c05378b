//! # Spectrum Analyser Module
//!
//! Produces byte magnitude frames from time-domain audio, the form the pitch
//! extractor consumes. The transform itself is RustFFT; this module adds the
//! windowing, smoothing and decibel scaling around it.
//!
//! ## Processing steps
//! 1. Take the most recent `transform_size` samples (zero padded at the front)
//! 2. Apply a Blackman window
//! 3. Forward FFT, magnitude of the first `transform_size / 2` bins, scaled by `1 / transform_size`
//! 4. Blend with the previous frame using the smoothing time constant
//! 5. Convert to dB and map `[-100 dB, -30 dB]` onto `0..=255`

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

use crate::capture::{FrameRead, FrameSource, SourceInfo};
use crate::config::AnalyserConfig;
use crate::error::CaptureError;

/// Level mapped to byte 0.
pub const MIN_DECIBELS: f32 = -100.0;
/// Level mapped to byte 255.
pub const MAX_DECIBELS: f32 = -30.0;

/// Windowed FFT with temporal smoothing and byte quantisation.
pub struct SpectrumAnalyser {
    transform_size: usize,
    smoothing: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl std::fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("transform_size", &self.transform_size)
            .field("smoothing", &self.smoothing)
            .finish_non_exhaustive()
    }
}

impl SpectrumAnalyser {
    /// Plans the transform once; `smoothing` is clamped into `[0, 1)`.
    pub fn new(transform_size: usize, smoothing: f32) -> Self {
        let transform_size = transform_size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(transform_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            transform_size,
            smoothing: smoothing.clamp(0.0, 0.999),
            fft,
            window: blackman_window(transform_size),
            buffer: vec![Complex::default(); transform_size],
            scratch,
            smoothed: vec![0.0; transform_size / 2],
        }
    }

    pub fn from_config(config: &AnalyserConfig) -> Self {
        Self::new(config.transform_size, config.smoothing)
    }

    pub fn bin_count(&self) -> usize {
        self.transform_size / 2
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Analyses the latest samples into `frame` (one byte per bin).
    ///
    /// Only the last `transform_size` samples are used; shorter input is
    /// zero padded in front. `frame` may be shorter than the bin count, in
    /// which case the upper bins are dropped.
    pub fn process(&mut self, samples: &[f32], frame: &mut [u8]) {
        let n = self.transform_size;
        let recent = &samples[samples.len().saturating_sub(n)..];
        let pad = n - recent.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / n as f32;
        let tau = self.smoothing;
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[k].norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }

        for (byte, &magnitude) in frame.iter_mut().zip(&self.smoothed) {
            *byte = magnitude_to_byte(magnitude);
        }
    }
}

/// Blackman window (alpha = 0.16) of length `n`.
fn blackman_window(n: usize) -> Vec<f32> {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}

/// Maps a linear magnitude to a byte over the analyser's decibel range.
pub fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / (MAX_DECIBELS - MIN_DECIBELS)) * (db - MIN_DECIBELS);
    scaled.floor().clamp(0.0, 255.0) as u8
}

/// Synthesises a sine tone that follows a pitch trajectory.
///
/// Every value is held for one tick (`sample_rate * interval_ms / 1000`
/// samples); non-positive values are rendered as silence. The phase runs on
/// across value changes so steps don't click.
pub fn render_trajectory(values: &[f32], sample_rate: u32, interval_ms: u64, amplitude: f32) -> Vec<f32> {
    let hop = ((u64::from(sample_rate) * interval_ms) / 1000) as usize;
    let mut out = Vec::with_capacity(values.len() * hop);
    let mut phase = 0.0f64;
    for &freq in values {
        let step = if freq > 0.0 {
            std::f64::consts::TAU * f64::from(freq) / f64::from(sample_rate)
        } else {
            0.0
        };
        for _ in 0..hop {
            let sample = if freq > 0.0 { amplitude * phase.sin() as f32 } else { 0.0 };
            out.push(sample);
            phase = (phase + step) % std::f64::consts::TAU;
        }
    }
    out
}

/// Frame source over an in-memory mono signal.
///
/// Each frame advances the read position by one tick's worth of samples
/// (`sample_rate * interval_ms / 1000`) and analyses the window that ends
/// there, as a live analyser polled on a timer would.
#[derive(Debug)]
pub struct SampleFrameSource {
    samples: Vec<f32>,
    sample_rate: u32,
    hop: usize,
    position: usize,
    analyser: SpectrumAnalyser,
}

impl SampleFrameSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32, config: &AnalyserConfig) -> Self {
        let hop = ((u64::from(sample_rate) * config.interval_ms) / 1000).max(1) as usize;
        Self {
            samples,
            sample_rate,
            hop,
            position: 0,
            analyser: SpectrumAnalyser::from_config(config),
        }
    }

    /// Samples consumed per frame.
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Frames left before the source is exhausted.
    pub fn remaining_frames(&self) -> usize {
        (self.samples.len().saturating_sub(self.position)) / self.hop
    }
}

impl FrameSource for SampleFrameSource {
    fn open(&mut self) -> Result<SourceInfo, CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::Acquisition("sample rate is zero".into()));
        }
        self.position = 0;
        self.analyser.reset();
        Ok(SourceInfo {
            sample_rate: self.sample_rate,
            bin_count: self.analyser.bin_count(),
        })
    }

    fn read_frame(&mut self, frame: &mut [u8]) -> Result<FrameRead, CaptureError> {
        if frame.len() != self.analyser.bin_count() {
            return Err(CaptureError::FrameSize {
                expected: self.analyser.bin_count(),
                got: frame.len(),
            });
        }
        let end = self.position + self.hop;
        if end > self.samples.len() {
            return Ok(FrameRead::Exhausted);
        }
        self.position = end;
        self.analyser.process(&self.samples[..end], frame);
        Ok(FrameRead::Frame)
    }
}

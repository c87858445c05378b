//! Shared CLI helpers: config loading with flag overrides and WAV I/O.

use anyhow::Context;
use clap::Args;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use melody_core::AnalyserConfig;
use std::path::{Path, PathBuf};

/// Options that override the config file.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Analyser config (TOML); every key is optional
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Trajectory length in seconds before matching starts
    #[arg(long)]
    pub min_search_seconds: Option<f32>,

    /// Trajectory horizon in seconds
    #[arg(long)]
    pub max_search_seconds: Option<f32>,

    /// Sakoe-Chiba band half-width for DTW
    #[arg(long)]
    pub band: Option<usize>,
}

impl ConfigArgs {
    /// Loads the config file (or defaults) and applies the flags on top.
    pub fn resolve(&self) -> anyhow::Result<AnalyserConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyserConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalyserConfig::default(),
        };

        if let Some(v) = self.interval_ms {
            config.interval_ms = v;
        }
        if let Some(v) = self.min_search_seconds {
            config.min_search_seconds = v;
        }
        if let Some(v) = self.max_search_seconds {
            config.max_search_seconds = v;
        }
        if self.band.is_some() {
            config.dtw_band = self.band;
        }

        config.validate().context("invalid analyser settings")?;
        Ok(config)
    }
}

/// Reads a WAV file as mono `f32` samples, averaging channels.
pub fn read_wav_mono(path: &Path) -> anyhow::Result<(Vec<f32>, u32)> {
    let reader = WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .context("decoding float samples")?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<f32>, _>>()
                .context("decoding integer samples")?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    tracing::info!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        seconds = mono.len() as f32 / spec.sample_rate.max(1) as f32,
        "decoded input"
    );
    Ok((mono, spec.sample_rate))
}

/// Writes mono samples as 16-bit PCM.
pub fn write_wav_mono(path: &Path, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize().context("finalizing WAV file")?;
    Ok(())
}

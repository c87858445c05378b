//! Renders a template melody to WAV.

use anyhow::Context;
use clap::Args;
use melody_core::{TemplateLibrary, render_trajectory};
use std::path::PathBuf;

use super::common::{ConfigArgs, write_wav_mono};

#[derive(Args)]
pub struct RenderArgs {
    /// Template library (JSON)
    #[arg(long, value_name = "JSON")]
    templates: PathBuf,

    /// Template to render
    #[arg(long)]
    name: String,

    /// Output WAV file
    #[arg(short, long, value_name = "WAV")]
    output: PathBuf,

    /// Sample rate
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Peak amplitude (0-1). Low levels keep the analyser's byte scale from
    /// clipping, so the peak bin stays distinct.
    #[arg(long, default_value = "0.05")]
    amplitude: f32,

    #[command(flatten)]
    config: ConfigArgs,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let config = args.config.resolve()?;
    let library = TemplateLibrary::load(&args.templates)
        .with_context(|| format!("loading templates {}", args.templates.display()))?;
    let template = library.get(&args.name).with_context(|| {
        let known: Vec<_> = library.names().collect();
        format!("no template named '{}' (known: {})", args.name, known.join(", "))
    })?;

    let samples = render_trajectory(
        &template.values,
        args.sample_rate,
        config.interval_ms,
        args.amplitude.clamp(0.0, 1.0),
    );
    write_wav_mono(&args.output, &samples, args.sample_rate)?;

    println!(
        "Rendered '{}' ({} points, {:.2}s) to {}",
        template.name,
        template.values.len(),
        samples.len() as f32 / args.sample_rate as f32,
        args.output.display()
    );
    Ok(())
}

//! Melody identification over a recorded WAV file.

use anyhow::Context;
use clap::Args;
use melody_core::{
    Confidence, SampleFrameSource, SessionSnapshot, SessionWorker, TemplateLibrary, TickReport,
    WorkerEvent, run_offline,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::common::{ConfigArgs, read_wav_mono};

#[derive(Args)]
pub struct IdentifyArgs {
    /// Template library (JSON array of {"name", "values"})
    #[arg(long, value_name = "JSON")]
    templates: PathBuf,

    /// Recording to analyse
    #[arg(long, value_name = "WAV")]
    input: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Tick at the configured interval on a worker thread instead of as fast
    /// as possible
    #[arg(long)]
    realtime: bool,

    /// Number of ranking rows to print
    #[arg(long, default_value = "5")]
    top: usize,
}

pub fn run(args: IdentifyArgs) -> anyhow::Result<()> {
    let config = args.config.resolve()?;
    let library = TemplateLibrary::load(&args.templates)
        .with_context(|| format!("loading templates {}", args.templates.display()))?;
    let library = Arc::new(library);
    let (samples, sample_rate) = read_wav_mono(&args.input)?;

    let source = SampleFrameSource::new(samples, sample_rate, &config);
    tracing::info!(frames = source.remaining_frames(), realtime = args.realtime, "identifying");

    let mut progress = WinnerLog::default();
    let snapshot = if args.realtime {
        run_realtime(config, library, source, &mut progress)?
    } else {
        let mut source = source;
        run_offline(&config, library, &mut source, |report| progress.observe(report))
            .context("analysis failed")?
    };

    print_ranking(&snapshot, args.top);
    Ok(())
}

fn run_realtime(
    config: melody_core::AnalyserConfig,
    library: Arc<TemplateLibrary>,
    source: SampleFrameSource,
    progress: &mut WinnerLog,
) -> anyhow::Result<SessionSnapshot> {
    let worker = SessionWorker::spawn(config, library, source)?;

    let mut snapshot = None;
    for event in worker.events().iter() {
        match event {
            WorkerEvent::Started { sample_rate } => {
                tracing::debug!(sample_rate, "worker started");
            }
            WorkerEvent::Tick(report) => progress.observe(&report),
            WorkerEvent::AcquisitionFailed(e) => return Err(e.into()),
            WorkerEvent::SourceFailed(e) => {
                tracing::warn!(error = %e, "input failed, reporting partial result");
            }
            WorkerEvent::Finished => tracing::debug!("input exhausted"),
            WorkerEvent::Stopped(final_state) => {
                snapshot = Some(final_state);
                break;
            }
        }
    }
    worker.stop();

    snapshot.context("worker ended without a final state")
}

/// Logs each tick at debug level and each change of winner at info level.
#[derive(Default)]
struct WinnerLog {
    ticks: usize,
    current: Option<String>,
}

impl WinnerLog {
    fn observe(&mut self, report: &TickReport) {
        self.ticks += 1;
        tracing::debug!(
            tick = self.ticks,
            frequency = report.frequency.unwrap_or(0.0),
            pitch = report.pitch_name,
            len = report.trajectory_len,
            "tick"
        );
        let Some(record) = &report.matched else {
            return;
        };
        if self.current.as_deref() != Some(record.name.as_str()) {
            tracing::info!(
                tick = self.ticks,
                winner = %record.name,
                distance = record.distance,
                "new best match"
            );
            self.current = Some(record.name.clone());
        }
    }
}

fn print_ranking(snapshot: &SessionSnapshot, top: usize) {
    if snapshot.ranking.is_empty() {
        println!("No matches (trajectory never reached the minimum length)");
        return;
    }
    println!(
        "Matches over {} passes (final trajectory {:.1}s):",
        snapshot.total_matches,
        snapshot.trajectory_ms as f64 / 1000.0
    );
    for row in snapshot.ranking.iter().take(top) {
        println!("{}", format_row(row));
    }
}

fn format_row(row: &Confidence) -> String {
    let marker = if row.last_winner { " *" } else { "" };
    format!(
        "  {:<24} {:>6.1}%  ({}){marker}",
        row.name, row.percentage, row.count
    )
}

//! # Capture Module
//!
//! Connects a frame source (the capture and transform side) to a
//! [`Session`] and schedules the ticks.
//!
//! ## Architecture
//! - **Frame source**: anything that can be opened and then polled for byte
//!   magnitude frames ([`FrameSource`])
//! - **Worker thread**: owns the session and the source; a single
//!   `crossbeam_channel::select!` loop drives ticks, so one tick always
//!   finishes before the next starts
//! - **Communication**: crossbeam channels for commands in and events out
//!
//! The tick channel buffers at most one pending tick. If a matching pass
//! overruns the interval, the ticks that fell due meanwhile collapse into
//! one instead of queueing up.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::AnalyserConfig;
use crate::error::CaptureError;
use crate::session::{Session, SessionSnapshot, TickReport};
use crate::templates::TemplateLibrary;

/// What a source reports after it has been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// Sample rate of the captured audio in Hz; fixed for the session.
    pub sample_rate: u32,
    /// Bins per frame the source produces.
    pub bin_count: usize,
}

/// Outcome of one frame read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRead {
    /// The frame buffer was filled.
    Frame,
    /// The source has no more frames; the session ends normally.
    Exhausted,
}

/// Supplier of spectral frames, one per tick.
pub trait FrameSource {
    /// Acquires the underlying input. A failure here is fatal to the session:
    /// no tick is ever run.
    fn open(&mut self) -> Result<SourceInfo, CaptureError>;

    /// Fills `frame` with the current magnitudes.
    fn read_frame(&mut self, frame: &mut [u8]) -> Result<FrameRead, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<SourceInfo, CaptureError> {
        (**self).open()
    }

    fn read_frame(&mut self, frame: &mut [u8]) -> Result<FrameRead, CaptureError> {
        (**self).read_frame(frame)
    }
}

/// Opens a source and builds the session that will consume it.
fn open_session<S: FrameSource + ?Sized>(
    config: &AnalyserConfig,
    library: Arc<TemplateLibrary>,
    source: &mut S,
) -> Result<Session, CaptureError> {
    let info = source.open()?;
    if info.bin_count != config.bin_count() {
        return Err(CaptureError::FrameSize {
            expected: config.bin_count(),
            got: info.bin_count,
        });
    }
    Session::new(config.clone(), info.sample_rate, library)
        .map_err(|e| CaptureError::Acquisition(Box::new(e)))
}

/// Runs a source to exhaustion as fast as frames can be analysed, without
/// waiting for the tick interval. Used for offline analysis of recordings.
///
/// # Arguments
/// * `config` - Analyser settings for the session
/// * `library` - Templates to match against
/// * `source` - Frame source; opened here
/// * `on_tick` - Called with every tick's report, in order
///
/// # Returns
/// * `Ok(snapshot)` - Session state after the last frame
/// * `Err(e)` - The source failed to open or to deliver a frame
pub fn run_offline<S, F>(
    config: &AnalyserConfig,
    library: Arc<TemplateLibrary>,
    source: &mut S,
    mut on_tick: F,
) -> Result<SessionSnapshot, CaptureError>
where
    S: FrameSource + ?Sized,
    F: FnMut(&TickReport),
{
    let mut session = open_session(config, library, source)?;
    let mut frame = vec![0u8; config.bin_count()];

    while source.read_frame(&mut frame)? == FrameRead::Frame {
        if let Some(report) = session.tick(&frame) {
            on_tick(&report);
        }
    }

    tracing::info!(matches = session.histogram().total(), "offline run finished");
    Ok(session.snapshot())
}

/// Control messages for the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Resume ticking; starts over with a cleared trajectory and histogram.
    Enable,
    /// Pause ticking; the source is not polled while disabled.
    Disable,
    /// Leave the loop and end the thread.
    Shutdown,
}

/// Everything the worker reports back.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The source opened; ticks follow.
    Started {
        /// Sample rate reported by the source.
        sample_rate: u32,
    },
    /// Result of one tick.
    Tick(TickReport),
    /// The source could not be opened. Nothing else follows.
    AcquisitionFailed(CaptureError),
    /// The source failed mid-session. `Stopped` follows.
    SourceFailed(CaptureError),
    /// The source ran out of frames. `Stopped` follows.
    Finished,
    /// The loop ended; final state of the session.
    Stopped(SessionSnapshot),
}

/// Handle to a session running on its own thread at the configured cadence.
#[derive(Debug)]
pub struct SessionWorker {
    commands: Sender<WorkerCommand>,
    events: Receiver<WorkerEvent>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SessionWorker {
    /// Starts the worker thread.
    ///
    /// The config is validated here; problems with the source are reported
    /// asynchronously as [`WorkerEvent::AcquisitionFailed`].
    ///
    /// # Errors
    /// * [`MelodyError::Config`](crate::MelodyError::Config) - The config is out of range
    /// * [`MelodyError::Capture`](crate::MelodyError::Capture) - The thread could not be started
    pub fn spawn<S>(
        config: AnalyserConfig,
        library: Arc<TemplateLibrary>,
        source: S,
    ) -> crate::Result<Self>
    where
        S: FrameSource + Send + 'static,
    {
        config.validate()?;

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let thread_handle = thread::Builder::new()
            .name("melody-session".to_string())
            .spawn(move || worker_loop(config, library, source, command_rx, event_tx))
            .map_err(CaptureError::Spawn)?;

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Receiver for the worker's events.
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    pub fn enable(&self) {
        let _ = self.commands.send(WorkerCommand::Enable);
    }

    pub fn disable(&self) {
        let _ = self.commands.send(WorkerCommand::Disable);
    }

    /// Signals shutdown and waits for the thread. A tick already in progress
    /// completes first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("session worker panicked");
            }
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<S: FrameSource>(
    config: AnalyserConfig,
    library: Arc<TemplateLibrary>,
    mut source: S,
    commands: Receiver<WorkerCommand>,
    events: Sender<WorkerEvent>,
) {
    tracing::info!("session worker starting");

    let mut session = match open_session(&config, library, &mut source) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "audio acquisition failed");
            let _ = events.send(WorkerEvent::AcquisitionFailed(e));
            return;
        }
    };
    let _ = events.send(WorkerEvent::Started {
        sample_rate: session.sample_rate(),
    });

    let ticker = crossbeam_channel::tick(config.interval());
    let mut frame = vec![0u8; config.bin_count()];

    loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => {
                // Disabled sessions skip the read entirely.
                if session.is_enabled() {
                    match source.read_frame(&mut frame) {
                        Ok(FrameRead::Frame) => {
                            if let Some(report) = session.tick(&frame) {
                                if events.send(WorkerEvent::Tick(report)).is_err() {
                                    tracing::warn!("event receiver dropped, stopping");
                                    break;
                                }
                            }
                        }
                        Ok(FrameRead::Exhausted) => {
                            tracing::info!("frame source exhausted");
                            let _ = events.send(WorkerEvent::Finished);
                            break;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "frame source failed");
                            let _ = events.send(WorkerEvent::SourceFailed(e));
                            break;
                        }
                    }
                }
            },
            recv(commands) -> msg => match msg {
                Ok(WorkerCommand::Enable) => session.set_enabled(true),
                Ok(WorkerCommand::Disable) => session.set_enabled(false),
                Ok(WorkerCommand::Shutdown) | Err(_) => {
                    tracing::info!("session worker received shutdown");
                    break;
                }
            },
        }
    }

    let _ = events.send(WorkerEvent::Stopped(session.snapshot()));
    tracing::info!("session worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MelodyError;
    use crate::templates::Template;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays fixed frames, then reports exhaustion.
    struct ScriptedSource {
        frames: Vec<Vec<u8>>,
        next: usize,
        fail_open: bool,
        fail_at: Option<usize>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Vec<u8>>) -> Self {
            Self {
                frames,
                next: 0,
                fail_open: false,
                fail_at: None,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn open(&mut self) -> Result<SourceInfo, CaptureError> {
            if self.fail_open {
                return Err(CaptureError::Acquisition("permission denied".into()));
            }
            Ok(SourceInfo {
                sample_rate: 44100,
                bin_count: 512,
            })
        }

        fn read_frame(&mut self, frame: &mut [u8]) -> Result<FrameRead, CaptureError> {
            if self.fail_at == Some(self.next) {
                return Err(CaptureError::Read("device unplugged".into()));
            }
            match self.frames.get(self.next) {
                Some(data) => {
                    frame.copy_from_slice(data);
                    self.next += 1;
                    Ok(FrameRead::Frame)
                }
                None => Ok(FrameRead::Exhausted),
            }
        }
    }

    fn config() -> AnalyserConfig {
        AnalyserConfig {
            transform_size: 1024,
            interval_ms: 5,
            max_search_seconds: 1.0,
            ..AnalyserConfig::default()
        }
    }

    fn library() -> Arc<TemplateLibrary> {
        Arc::new(
            TemplateLibrary::new(vec![
                Template::new("low", vec![100.0; 8]),
                Template::new("high", vec![900.0; 8]),
            ])
            .unwrap(),
        )
    }

    fn tone_frame() -> Vec<u8> {
        let mut frame = vec![0u8; 512];
        frame[21] = 200;
        frame
    }

    fn collect(worker: &SessionWorker) -> Vec<WorkerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = worker.events().recv_timeout(Duration::from_secs(5)) {
            let done = matches!(
                event,
                WorkerEvent::Stopped(_) | WorkerEvent::AcquisitionFailed(_)
            );
            out.push(event);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn offline_run_ticks_every_frame() {
        let mut source = ScriptedSource::new(vec![tone_frame(); 4]);
        let mut reports = Vec::new();
        let snapshot = run_offline(&config(), library(), &mut source, |r| reports.push(r.clone())).unwrap();
        assert_eq!(reports.len(), 4);
        assert_eq!(snapshot.total_matches, 4);
        assert_eq!(snapshot.last_winner.as_deref(), Some("high"));
    }

    #[test]
    fn offline_run_surfaces_acquisition_failure() {
        let mut source = ScriptedSource::new(vec![]);
        source.fail_open = true;
        let result = run_offline(&config(), library(), &mut source, |_| {});
        assert!(matches!(result, Err(CaptureError::Acquisition(_))));
    }

    #[test]
    fn offline_run_rejects_mismatched_bins() {
        let mut source = ScriptedSource::new(vec![]);
        let config = AnalyserConfig {
            transform_size: 2048,
            ..config()
        };
        let result = run_offline(&config, library(), &mut source, |_| {});
        assert!(matches!(result, Err(CaptureError::FrameSize { expected: 1024, got: 512 })));
    }

    #[test]
    fn worker_runs_until_source_is_exhausted() {
        let worker = SessionWorker::spawn(config(), library(), ScriptedSource::new(vec![tone_frame(); 3])).unwrap();
        let events = collect(&worker);

        assert!(matches!(events[0], WorkerEvent::Started { sample_rate: 44100 }));
        let ticks = events
            .iter()
            .filter(|e| matches!(e, WorkerEvent::Tick(_)))
            .count();
        assert_eq!(ticks, 3);
        assert!(matches!(events[events.len() - 2], WorkerEvent::Finished));
        match events.last() {
            Some(WorkerEvent::Stopped(snapshot)) => assert_eq!(snapshot.total_matches, 3),
            other => panic!("unexpected last event {other:?}"),
        }
        worker.stop();
    }

    #[test]
    fn worker_never_ticks_after_acquisition_failure() {
        let mut source = ScriptedSource::new(vec![tone_frame(); 3]);
        source.fail_open = true;
        let worker = SessionWorker::spawn(config(), library(), source).unwrap();
        let events = collect(&worker);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], WorkerEvent::AcquisitionFailed(_)));
    }

    #[test]
    fn worker_reports_mid_session_failure() {
        let mut source = ScriptedSource::new(vec![tone_frame(); 5]);
        source.fail_at = Some(2);
        let worker = SessionWorker::spawn(config(), library(), source).unwrap();
        let events = collect(&worker);
        assert!(events.iter().any(|e| matches!(e, WorkerEvent::SourceFailed(_))));
        match events.last() {
            Some(WorkerEvent::Stopped(snapshot)) => assert_eq!(snapshot.total_matches, 2),
            other => panic!("unexpected last event {other:?}"),
        }
    }

    #[test]
    fn stop_ends_a_running_worker() {
        let worker = SessionWorker::spawn(config(), library(), ScriptedSource::new(vec![tone_frame(); 100_000])).unwrap();
        worker.disable();
        worker.enable();
        let events = worker.events().clone();
        worker.stop();
        let last = events.try_iter().last();
        assert!(matches!(last, Some(WorkerEvent::Stopped(_))));
    }

    /// Never runs out; every read takes `delay`. Counts reads that start
    /// while another one is still running.
    struct SlowSource {
        delay: Duration,
        in_flight: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
    }

    impl FrameSource for SlowSource {
        fn open(&mut self) -> Result<SourceInfo, CaptureError> {
            Ok(SourceInfo {
                sample_rate: 44100,
                bin_count: 512,
            })
        }

        fn read_frame(&mut self, frame: &mut [u8]) -> Result<FrameRead, CaptureError> {
            if self.in_flight.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(self.delay);
            frame.copy_from_slice(&tone_frame());
            self.in_flight.store(false, Ordering::SeqCst);
            Ok(FrameRead::Frame)
        }
    }

    #[test]
    fn overrunning_ticks_are_dropped() {
        let interval = Duration::from_millis(5);
        let delay = Duration::from_millis(50);
        let window = Duration::from_millis(600);
        let overlaps = Arc::new(AtomicUsize::new(0));
        let source = SlowSource {
            delay,
            in_flight: Arc::new(AtomicBool::new(false)),
            overlaps: overlaps.clone(),
        };

        let worker = SessionWorker::spawn(config(), library(), source).unwrap();
        let events = worker.events().clone();
        let started = std::time::Instant::now();
        thread::sleep(window);
        worker.stop();
        let elapsed = started.elapsed();

        let ticks = events
            .try_iter()
            .filter(|e| matches!(e, WorkerEvent::Tick(_)))
            .count() as u128;
        // One tick per read at most, plus the one in flight when stop arrived.
        let by_read = elapsed.as_millis() / delay.as_millis() + 1;
        let by_interval = elapsed.as_millis() / interval.as_millis();
        assert!(ticks >= 2, "only {ticks} ticks in {elapsed:?}");
        assert!(ticks <= by_read, "{ticks} ticks exceed {by_read} reads");
        assert!(ticks * 4 < by_interval, "ticks were queued: {ticks} of {by_interval}");
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn spawn_rejects_invalid_config() {
        let bad = AnalyserConfig {
            interval_ms: 0,
            ..config()
        };
        assert!(matches!(
            SessionWorker::spawn(bad, library(), ScriptedSource::new(vec![])),
            Err(MelodyError::Config(_))
        ));
    }
}

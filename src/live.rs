//! Continuous live transcription, independent of the job queue.
//!
//! A live session owns one long-lived streaming process and surfaces
//! finished sentences as they stabilize. It shares the process supervisor
//! with the batch pipeline, so a global stop terminates it like any stage.

use crate::console::Console;
use crate::defaults;
use crate::error::Result;
use crate::stage::{CommandSpec, ManagedProcess};
use crate::supervisor::ProcessSupervisor;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Events surfaced by a running live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// A finished, deduplicated sentence.
    Fragment(String),
    /// The streaming process ended, whether stopped or exited on its own.
    Ended,
}

/// Cleans streaming-engine output and suppresses partials and repeats.
///
/// The streaming engine redraws its current capture window continuously:
/// chunks carry ANSI cursor movement, timestamp annotations, silence
/// markers, and the same sentence re-emitted as it stabilizes. A chunk is
/// surfaced only once it is non-empty, ends a sentence, and differs from
/// the previously surfaced line.
pub struct FragmentFilter {
    ansi: Regex,
    timestamps: Regex,
    last: Option<String>,
}

impl Default for FragmentFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentFilter {
    pub fn new() -> Self {
        // SAFETY: hardcoded patterns are always valid
        #[allow(clippy::expect_used)]
        let ansi = Regex::new(r"\x1B\[[0-9;]*[A-Za-z]").expect("hardcoded ANSI pattern");
        #[allow(clippy::expect_used)]
        let timestamps =
            Regex::new(r"\[\d{2}:\d{2}\.\d{2}\]\s*").expect("hardcoded timestamp pattern");
        Self {
            ansi,
            timestamps,
            last: None,
        }
    }

    /// Feeds one raw output chunk; returns a sentence ready to surface, or
    /// `None` while the current sentence is still forming or repeats.
    pub fn push(&mut self, chunk: &str) -> Option<String> {
        let cleaned = self.scrub(chunk);
        if cleaned.is_empty() {
            return None;
        }
        if !cleaned.ends_with(['.', '?', '!']) {
            return None;
        }
        if self.last.as_deref() == Some(cleaned.as_str()) {
            return None;
        }
        self.last = Some(cleaned.clone());
        Some(cleaned)
    }

    fn scrub(&self, chunk: &str) -> String {
        let without_ansi = self.ansi.replace_all(chunk, "");
        let without_timestamps = self.timestamps.replace_all(&without_ansi, "");
        without_timestamps
            .replace(defaults::BLANK_AUDIO_MARKER, "")
            .trim()
            .to_string()
    }
}

/// Idle/Running toggle around one long-lived streaming process.
pub struct LiveSession {
    supervisor: Arc<ProcessSupervisor>,
    console: Arc<dyn Console>,
    streamer: String,
    running: Option<RunningSession>,
}

struct RunningSession {
    stop_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<()>,
}

impl LiveSession {
    pub fn new(supervisor: Arc<ProcessSupervisor>, console: Arc<dyn Console>) -> Self {
        Self {
            supervisor,
            console,
            streamer: defaults::STREAMER_BIN.to_string(),
            running: None,
        }
    }

    /// Overrides the streaming executable (tests).
    pub fn with_streamer(mut self, program: &str) -> Self {
        self.streamer = program.to_string();
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Launches the streaming engine and returns the event receiver.
    ///
    /// No-op when a session is already running: returns `Ok(None)` and the
    /// existing session keeps streaming.
    pub fn start(
        &mut self,
        model_path: &Path,
        language: &str,
        cpu_only: bool,
    ) -> Result<Option<mpsc::UnboundedReceiver<LiveEvent>>> {
        if self.running.is_some() {
            return Ok(None);
        }

        let mut args = vec![
            "-m".to_string(),
            model_path.display().to_string(),
            "-l".to_string(),
            language.to_string(),
            "--step".to_string(),
            defaults::LIVE_STEP_MS.to_string(),
            "--length".to_string(),
            defaults::LIVE_LENGTH_MS.to_string(),
            "-t".to_string(),
            defaults::worker_threads().to_string(),
        ];
        if cpu_only {
            args.push("--no-gpu".to_string());
        }
        let spec = CommandSpec::new(self.streamer.clone(), args);

        let mut process = ManagedProcess::spawn(&spec, self.supervisor.clone())?;
        self.console.line("Starting live transcription.");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut filter = FragmentFilter::new();
            loop {
                tokio::select! {
                    line = process.next_line() => match line {
                        Some(chunk) => {
                            if let Some(fragment) = filter.push(&chunk)
                                && event_tx.send(LiveEvent::Fragment(fragment)).is_err()
                            {
                                break;
                            }
                        }
                        // Pipes closed: the engine is exiting on its own.
                        None => break,
                    },
                    // Fires on stop() and when the session handle is dropped.
                    _ = &mut stop_rx => break,
                }
            }
            process
                .stop(Duration::from_millis(defaults::LIVE_STOP_GRACE_MS))
                .await;
            event_tx.send(LiveEvent::Ended).ok();
            done_tx.send(()).ok();
        });

        self.running = Some(RunningSession { stop_tx, done_rx });
        Ok(Some(event_rx))
    }

    /// Requests termination and waits for the process to wind down
    /// (graceful exit, escalating to a kill after the grace window).
    ///
    /// No-op when idle. Also the way to acknowledge a natural engine exit:
    /// call it after receiving `LiveEvent::Ended` to reset the session.
    pub async fn stop(&mut self) {
        if let Some(session) = self.running.take() {
            self.console.line("Stopping live transcription.");
            session.stop_tx.send(()).ok();
            session.done_rx.await.ok();
        }
    }
}

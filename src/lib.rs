//! whisperq - queued media transcription via whisper.cpp command-line tools
//!
//! Chains an audio converter, a model fetcher, and a transcription engine
//! per input file, one job at a time, plus an independent live streaming
//! mode.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod defaults;
pub mod error;
pub mod job;
pub mod live;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod stage;
pub mod supervisor;
pub mod viewer;

// Core seams (trait + production impl + public test double)
pub use console::{CollectorConsole, Console, StdoutConsole};
pub use stage::{
    CommandSpec, ManagedProcess, MockStageRunner, ProcessStageRunner, StageExit, StageRunner,
};
pub use supervisor::ProcessSupervisor;
pub use viewer::{DesktopViewer, RecordingViewer, TranscriptViewer};

// Queue and pipeline
pub use job::{Job, JobOptions};
pub use pipeline::{JobOutcome, PipelineEnv, PipelineRunner};
pub use queue::JobQueue;

// Live transcription
pub use live::{FragmentFilter, LiveEvent, LiveSession};

// Error handling
pub use error::{Result, WhisperqError};

// Config
pub use config::Settings;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

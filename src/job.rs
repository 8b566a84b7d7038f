//! Jobs: one input file plus the option snapshot taken at enqueue time.

use crate::defaults;
use std::path::PathBuf;

/// Options in effect when a job was enqueued.
///
/// Snapshotted on enqueue so later settings changes never affect queued work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Model identifier, e.g. "medium.en".
    pub model: String,
    /// Target language code passed as `-l`.
    pub language: String,
    /// Write a plain-text transcript (`-otxt`).
    pub text_output: bool,
    /// Write a subtitle file (`-osrt`).
    pub subtitle_output: bool,
    /// Force CPU inference (`--no-gpu`).
    pub cpu_only: bool,
    /// Open the transcript with the system viewer once transcription succeeds.
    pub open_result: bool,
    /// Free-form arguments appended to the engine invocation.
    pub extra_args: String,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            text_output: true,
            subtitle_output: false,
            cpu_only: false,
            open_result: true,
            extra_args: defaults::DEFAULT_EXTRA_ARGS.to_string(),
        }
    }
}

impl JobOptions {
    /// Splits `extra_args` on whitespace into literal engine arguments.
    ///
    /// No quoting or escaping: each whitespace-separated token is passed
    /// through verbatim.
    pub fn extra_tokens(&self) -> Vec<String> {
        self.extra_args
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// One input file tracked through a full pipeline run.
///
/// Immutable once created; dropped when its pipeline reaches a terminal state.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub options: JobOptions,
}

impl Job {
    pub fn new(input: impl Into<PathBuf>, options: JobOptions) -> Self {
        Self {
            input: input.into(),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_option_values() {
        let options = JobOptions::default();
        assert_eq!(options.model, "medium.en");
        assert_eq!(options.language, "en");
        assert!(options.text_output);
        assert!(!options.subtitle_output);
        assert!(!options.cpu_only);
        assert!(options.open_result);
        assert_eq!(options.extra_args, "-tp 0.0 -mc 64 -et 3.0");
    }

    #[test]
    fn extra_tokens_splits_on_whitespace() {
        let options = JobOptions {
            extra_args: "-tp 0.0 -mc 64".to_string(),
            ..Default::default()
        };
        assert_eq!(options.extra_tokens(), vec!["-tp", "0.0", "-mc", "64"]);
    }

    #[test]
    fn extra_tokens_collapses_runs_of_whitespace() {
        let options = JobOptions {
            extra_args: "  -tp   0.0\t-et 3.0  ".to_string(),
            ..Default::default()
        };
        assert_eq!(options.extra_tokens(), vec!["-tp", "0.0", "-et", "3.0"]);
    }

    #[test]
    fn extra_tokens_empty_string_yields_no_tokens() {
        let options = JobOptions {
            extra_args: String::new(),
            ..Default::default()
        };
        assert!(options.extra_tokens().is_empty());
    }

    #[test]
    fn job_snapshots_options() {
        let mut options = JobOptions::default();
        let job = Job::new("a.mp3", options.clone());
        options.model = "tiny".to_string();
        assert_eq!(job.options.model, "medium.en");
        assert_eq!(job.input, PathBuf::from("a.mp3"));
    }
}

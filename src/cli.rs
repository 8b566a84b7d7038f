//! Command-line interface for whisperq
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Settings;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Queued media transcription driven by whisper.cpp command-line tools
#[derive(Parser, Debug)]
#[command(
    name = "whisperq",
    version,
    about = "Queued media transcription driven by whisper.cpp command-line tools",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Media files to enqueue (mp3, mp4, m4a, mkv, m4v, wav, mov, avi, ogg, flac, aac, wma, opus)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Path to the settings file (default: settings.toml next to the executable)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Whisper model identifier (e.g. medium.en, large-v3-turbo)
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Language code passed to the engine (e.g. en, de, es)
    #[arg(long, global = true, value_name = "LANG")]
    pub language: Option<String>,

    /// Also write a subtitle file next to the audio
    #[arg(long, global = true)]
    pub srt: bool,

    /// Skip writing the plain-text transcript
    #[arg(long, global = true)]
    pub no_txt: bool,

    /// Force CPU-only inference
    #[arg(long, global = true)]
    pub cpu: bool,

    /// Do not open the finished transcript
    #[arg(long, global = true)]
    pub no_open: bool,

    /// Extra arguments passed verbatim to the transcription engine
    #[arg(long, global = true, value_name = "ARGS", allow_hyphen_values = true)]
    pub extra_args: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe the microphone continuously until Ctrl+C
    Live,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Folds option overrides into loaded settings.
    ///
    /// Each flag only pushes in the direction it names; absent flags leave
    /// the persisted value untouched.
    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(language) = &self.language {
            settings.language = language.clone();
        }
        if self.srt {
            settings.srt_file = true;
        }
        if self.no_txt {
            settings.txt_file = false;
        }
        if self.cpu {
            settings.cpu_only = true;
        }
        if self.no_open {
            settings.open_result = false;
        }
        if let Some(args) = &self.extra_args {
            settings.args = args.clone();
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_file_list() {
        let cli = Cli::parse_from(["whisperq", "a.mp4", "b.wav"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.files.len(), 2);
    }

    #[test]
    fn parses_live_subcommand() {
        let cli = Cli::parse_from(["whisperq", "live"]);
        assert!(matches!(cli.command, Some(Commands::Live)));
    }

    #[test]
    fn option_flags_are_accepted_after_live() {
        let cli = Cli::parse_from(["whisperq", "live", "--model", "tiny", "--cpu"]);
        assert!(matches!(cli.command, Some(Commands::Live)));
        assert_eq!(cli.model.as_deref(), Some("tiny"));
        assert!(cli.cpu);
    }

    #[test]
    fn parses_option_overrides() {
        let cli = Cli::parse_from([
            "whisperq",
            "--model",
            "tiny.en",
            "--language",
            "de",
            "--srt",
            "--cpu",
            "a.mp4",
        ]);
        assert_eq!(cli.model.as_deref(), Some("tiny.en"));
        assert_eq!(cli.language.as_deref(), Some("de"));
        assert!(cli.srt);
        assert!(cli.cpu);
        assert_eq!(cli.files.len(), 1);
    }

    #[test]
    fn extra_args_accepts_leading_hyphens() {
        let cli = Cli::parse_from(["whisperq", "--extra-args", "-tp 0.0 -mc 64", "a.mp4"]);
        assert_eq!(cli.extra_args.as_deref(), Some("-tp 0.0 -mc 64"));
    }

    #[test]
    fn apply_overrides_only_touches_named_flags() {
        let cli = Cli::parse_from(["whisperq", "--srt", "a.mp4"]);
        let settings = cli.apply_overrides(Settings::default());
        assert!(settings.srt_file);
        // Untouched fields keep their persisted values.
        assert!(settings.txt_file);
        assert!(settings.open_result);
        assert_eq!(settings.model, Settings::default().model);
    }

    #[test]
    fn apply_overrides_replaces_model_language_and_args() {
        let cli = Cli::parse_from([
            "whisperq",
            "--model",
            "base",
            "--language",
            "fr",
            "--extra-args",
            "-bs 5",
            "--no-txt",
            "--no-open",
            "a.mp4",
        ]);
        let settings = cli.apply_overrides(Settings::default());
        assert_eq!(settings.model, "base");
        assert_eq!(settings.language, "fr");
        assert_eq!(settings.args, "-bs 5");
        assert!(!settings.txt_file);
        assert!(!settings.open_result);
    }
}

//! Persistent settings, stored as key/value TOML next to the executable.
//!
//! The settings file mirrors what a job snapshot needs: model, language,
//! output flags, and the free-form engine arguments. Missing fields fall
//! back to defaults, so old files keep loading as fields are added.

use crate::defaults;
use crate::error::{Result, WhisperqError};
use crate::job::JobOptions;
use crate::models;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Model identifier, e.g. "medium.en".
    pub model: String,
    /// Transcription language code.
    pub language: String,
    /// Write a plain-text transcript.
    pub txt_file: bool,
    /// Write a subtitle file.
    pub srt_file: bool,
    /// Force CPU-only inference.
    pub cpu_only: bool,
    /// Open the finished transcript with the system viewer.
    pub open_result: bool,
    /// Free-form arguments appended to every engine invocation.
    pub args: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            txt_file: true,
            srt_file: false,
            cpu_only: false,
            open_result: true,
            args: defaults::DEFAULT_EXTRA_ARGS.to_string(),
        }
    }
}

impl Settings {
    /// Default settings path: `settings.toml` next to the executable.
    pub fn default_path() -> PathBuf {
        models::exe_dir().join("settings.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Load settings, or fall back to defaults.
    ///
    /// A missing file is the normal first-run case. A malformed file is
    /// reported to stderr and replaced by defaults rather than aborting;
    /// a broken settings file should never block transcription.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(WhisperqError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                eprintln!(
                    "whisperq: ignoring unreadable settings file {}: {e}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Persist settings as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| WhisperqError::ConfigParse {
                message: e.to_string(),
            })?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment variable overrides.
    ///
    /// Supported:
    /// - WHISPERQ_MODEL → model
    /// - WHISPERQ_LANGUAGE → language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("WHISPERQ_MODEL")
            && !model.is_empty()
        {
            self.model = model;
        }
        if let Ok(language) = std::env::var("WHISPERQ_LANGUAGE")
            && !language.is_empty()
        {
            self.language = language;
        }
        self
    }

    /// Snapshot these settings as the options for a new job.
    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            model: self.model.clone(),
            language: self.language.clone(),
            text_output: self.txt_file,
            subtitle_output: self.srt_file,
            cpu_only: self.cpu_only,
            open_result: self.open_result,
            extra_args: self.args.clone(),
        }
    }
}

//! Error types for whisperq.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhisperqError {
    // Job failures (each fatal for its job only, never for the queue)
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("Audio conversion failed: {message}")]
    ConversionFailed { message: String },

    #[error("Model download failed: {message}")]
    ModelFetchFailed { message: String },

    #[error("Transcription failed: {message}")]
    TranscriptionFailed { message: String },

    #[error("{tool} terminated abnormally")]
    ProcessCrashed { tool: String },

    // External tool invocation errors
    #[error("Executable not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("Failed to start {tool}: {message}")]
    SpawnFailed { tool: String, message: String },

    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WhisperqError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn input_not_found_display() {
        let error = WhisperqError::InputNotFound {
            path: "/media/talk.mp4".to_string(),
        };
        assert_eq!(error.to_string(), "Input file not found: /media/talk.mp4");
    }

    #[test]
    fn conversion_failed_display() {
        let error = WhisperqError::ConversionFailed {
            message: "exit code 1".to_string(),
        };
        assert_eq!(error.to_string(), "Audio conversion failed: exit code 1");
    }

    #[test]
    fn model_fetch_failed_display() {
        let error = WhisperqError::ModelFetchFailed {
            message: "downloaded file too small (512 bytes)".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Model download failed: downloaded file too small (512 bytes)"
        );
    }

    #[test]
    fn transcription_failed_display() {
        let error = WhisperqError::TranscriptionFailed {
            message: "exit code 3".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription failed: exit code 3");
    }

    #[test]
    fn process_crashed_display() {
        let error = WhisperqError::ProcessCrashed {
            tool: "ffmpeg".to_string(),
        };
        assert_eq!(error.to_string(), "ffmpeg terminated abnormally");
    }

    #[test]
    fn tool_not_found_display() {
        let error = WhisperqError::ToolNotFound {
            tool: "whisper-cli".to_string(),
        };
        assert_eq!(error.to_string(), "Executable not found: whisper-cli");
    }

    #[test]
    fn from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: WhisperqError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("model = = 3").unwrap_err();
        let error: WhisperqError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WhisperqError>();
        assert_sync::<WhisperqError>();
    }

    #[test]
    fn result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}

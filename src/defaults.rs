//! Default configuration constants for whisperq.
//!
//! This module provides shared constants used across the pipeline, live
//! session, and configuration types to ensure consistency and eliminate
//! duplication.

/// Audio container the converter stage produces.
///
/// whisper-cli accepts mp3 directly, so every input is normalized to it.
/// Inputs that already carry this extension skip the converter entirely.
pub const TARGET_EXTENSION: &str = "mp3";

/// ffmpeg variable-bitrate quality passed as `-q:a`.
pub const CONVERTER_QUALITY: &str = "2";

/// File-name prefix of whisper.cpp model assets.
pub const MODEL_PREFIX: &str = "ggml-";

/// File-name suffix of whisper.cpp model assets.
pub const MODEL_SUFFIX: &str = ".bin";

/// Remote base URL model assets are fetched from.
///
/// The "resolve" endpoint serves the raw file rather than an HTML page.
pub const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Minimum plausible size of a downloaded model asset, in bytes.
///
/// Even the smallest quantized models are tens of megabytes; anything under
/// a megabyte is an error page or a truncated transfer and is deleted.
pub const MIN_MODEL_BYTES: u64 = 1_000_000;

/// Well-known whisper.cpp model identifiers, largest first.
pub const MODEL_CHOICES: &[&str] = &[
    "large-v3",
    "large-v3-turbo",
    "medium",
    "medium.en",
    "small",
    "small.en",
    "tiny",
    "tiny.en",
    "base",
    "base.en",
];

/// Default Whisper model.
pub const DEFAULT_MODEL: &str = "medium.en";

/// Default transcription language code.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default free-form arguments appended to every engine invocation.
///
/// Temperature 0.0, max context 64, entropy threshold 3.0: conservative
/// decoding settings that suppress hallucinated repetitions on long files.
pub const DEFAULT_EXTRA_ARGS: &str = "-tp 0.0 -mc 64 -et 3.0";

/// Input extensions the queue is expected to handle (CLI help text).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "mp4", "m4a", "mkv", "m4v", "wav", "mov", "avi", "ogg", "flac", "aac", "wma", "opus",
];

/// Delay before opening a finished transcript, in milliseconds.
///
/// Lets the engine's output file hit the filesystem before the viewer reads it.
pub const VIEWER_DELAY_MS: u64 = 2000;

/// Grace window between SIGTERM and SIGKILL in a bulk stop, in milliseconds.
pub const TERMINATE_GRACE_MS: u64 = 500;

/// Grace window when stopping a live session, in milliseconds.
///
/// The streaming engine flushes its last window on SIGTERM; 1.5 s is enough
/// on slow disks before we give up and kill it.
pub const LIVE_STOP_GRACE_MS: u64 = 1500;

/// Live capture step interval passed as `--step`, in milliseconds.
pub const LIVE_STEP_MS: u32 = 500;

/// Live capture window length passed as `--length`, in milliseconds.
pub const LIVE_LENGTH_MS: u32 = 5000;

/// Marker the streaming engine emits for silent capture windows.
pub const BLANK_AUDIO_MARKER: &str = "[BLANK_AUDIO]";

/// External audio converter executable.
pub const CONVERTER_BIN: &str = "ffmpeg";

/// External model fetcher executable.
pub const FETCHER_BIN: &str = "curl";

/// External transcription engine executable.
pub const TRANSCRIBER_BIN: &str = "whisper-cli";

/// External streaming transcription executable.
pub const STREAMER_BIN: &str = "whisper-stream";

/// Worker-thread count hint for the streaming engine.
pub fn worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_a_known_choice() {
        assert!(MODEL_CHOICES.contains(&DEFAULT_MODEL));
    }

    #[test]
    fn worker_threads_is_positive() {
        assert!(worker_threads() >= 1);
    }

    #[test]
    fn min_model_bytes_is_one_megabyte_order() {
        assert_eq!(MIN_MODEL_BYTES, 1_000_000);
    }
}

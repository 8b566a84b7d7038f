//! Model asset naming and placement.
//!
//! Model files live in a `models/` directory next to the executable and are
//! named `ggml-<identifier>.bin`, matching the whisper.cpp distribution
//! layout on Hugging Face.

use crate::defaults;
use std::path::PathBuf;

/// Directory containing the running executable.
///
/// Falls back to the current directory when the executable path cannot be
/// resolved (e.g. deleted binary).
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The well-known models directory, colocated with the executable.
///
/// Not created here; the pipeline creates it on first use.
pub fn default_models_dir() -> PathBuf {
    exe_dir().join("models")
}

/// File name of a model asset, e.g. `ggml-medium.en.bin`.
pub fn model_file_name(identifier: &str) -> String {
    format!(
        "{}{}{}",
        defaults::MODEL_PREFIX,
        identifier,
        defaults::MODEL_SUFFIX
    )
}

/// Remote URL a model asset is fetched from.
pub fn model_url(identifier: &str) -> String {
    format!(
        "{}/{}",
        defaults::MODEL_BASE_URL,
        model_file_name(identifier)
    )
}

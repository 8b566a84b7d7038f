//! Per-job pipeline state machine: Convert → EnsureModel → Transcribe.
//!
//! Each `PipelineRunner` owns exactly one job for its lifetime and reports
//! exactly one terminal outcome. Stage failures are terminal for the job
//! and never retried; the queue advances regardless of the result.

use crate::console::Console;
use crate::defaults;
use crate::error::WhisperqError;
use crate::job::Job;
use crate::models;
use crate::stage::{CommandSpec, StageExit, StageRunner};
use crate::viewer::TranscriptViewer;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// External tools and shared directories a pipeline run depends on.
///
/// Injected so tests can point the models directory at a tempdir and so the
/// tool names stay in one place.
#[derive(Debug, Clone)]
pub struct PipelineEnv {
    pub models_dir: PathBuf,
    pub converter: String,
    pub fetcher: String,
    pub transcriber: String,
}

impl Default for PipelineEnv {
    fn default() -> Self {
        Self {
            models_dir: models::default_models_dir(),
            converter: defaults::CONVERTER_BIN.to_string(),
            fetcher: defaults::FETCHER_BIN.to_string(),
            transcriber: defaults::TRANSCRIBER_BIN.to_string(),
        }
    }
}

/// Terminal result of one pipeline run. Produced exactly once per job.
#[derive(Debug)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub error: Option<WhisperqError>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Pipeline stages. `Done` carries the job-level error, if any.
#[derive(Debug)]
enum Step {
    Start,
    Converting,
    EnsuringModel,
    Transcribing,
    Done(Option<WhisperqError>),
}

/// Drives one job through the stage sequence.
///
/// Stages execute strictly sequentially; no stage starts before the
/// previous one's exit has been observed.
pub struct PipelineRunner {
    job: Job,
    env: PipelineEnv,
    stages: Arc<dyn StageRunner>,
    console: Arc<dyn Console>,
    viewer: Arc<dyn TranscriptViewer>,
    /// Audio file the engine will read; switches to the converted file.
    audio_path: PathBuf,
}

impl PipelineRunner {
    pub fn new(
        job: Job,
        env: PipelineEnv,
        stages: Arc<dyn StageRunner>,
        console: Arc<dyn Console>,
        viewer: Arc<dyn TranscriptViewer>,
    ) -> Self {
        let audio_path = job.input.clone();
        Self {
            job,
            env,
            stages,
            console,
            viewer,
            audio_path,
        }
    }

    /// Runs the job to completion and returns its terminal outcome.
    pub async fn run(mut self) -> JobOutcome {
        let mut step = Step::Start;
        loop {
            step = match step {
                Step::Start => self.validate_input(),
                Step::Converting => self.convert().await,
                Step::EnsuringModel => self.ensure_model().await,
                Step::Transcribing => self.transcribe().await,
                Step::Done(error) => {
                    match &error {
                        None => self
                            .console
                            .line(&format!("Completed: {}", file_label(&self.job.input))),
                        Some(e) => self.console.line(&format!(
                            "Error processing {}: {e}",
                            self.job.input.display()
                        )),
                    }
                    return JobOutcome {
                        input: self.job.input.clone(),
                        error,
                    };
                }
            };
        }
    }

    fn validate_input(&self) -> Step {
        if !self.job.input.exists() {
            return Step::Done(Some(WhisperqError::InputNotFound {
                path: self.job.input.display().to_string(),
            }));
        }
        self.console
            .line(&format!("Input file: {}", self.job.input.display()));
        Step::Converting
    }

    async fn convert(&mut self) -> Step {
        let already_target = self
            .job
            .input
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(defaults::TARGET_EXTENSION));
        if already_target {
            return Step::EnsuringModel;
        }

        let output = self.job.input.with_extension(defaults::TARGET_EXTENSION);
        self.console.line(&format!(
            "Converting {} to {}...",
            self.job.input.display(),
            defaults::TARGET_EXTENSION.to_uppercase()
        ));

        let spec = CommandSpec::new(
            self.env.converter.clone(),
            vec![
                "-n".to_string(),
                "-i".to_string(),
                path_arg(&self.job.input),
                "-q:a".to_string(),
                defaults::CONVERTER_QUALITY.to_string(),
                path_arg(&output),
            ],
        );

        let exit = match self.stages.run(spec, self.console.as_ref()).await {
            Ok(exit) => exit,
            Err(e) => {
                remove_partial(&output);
                return Step::Done(Some(WhisperqError::ConversionFailed {
                    message: e.to_string(),
                }));
            }
        };

        if exit.success() && nonempty_file(&output) {
            self.console.line("FFmpeg conversion successful.");
            self.audio_path = output;
            Step::EnsuringModel
        } else {
            remove_partial(&output);
            if exit.success() {
                self.console
                    .line("FFmpeg conversion failed: output file missing or empty.");
                Step::Done(Some(WhisperqError::ConversionFailed {
                    message: "output file missing or empty".to_string(),
                }))
            } else {
                self.console
                    .line(&format!("FFmpeg conversion failed: {}.", exit.describe()));
                Step::Done(Some(stage_error(exit, &self.env.converter, |message| {
                    WhisperqError::ConversionFailed { message }
                })))
            }
        }
    }

    async fn ensure_model(&mut self) -> Step {
        if let Err(e) = fs::create_dir_all(&self.env.models_dir) {
            self.console.line(&format!(
                "Failed to create models directory: {}",
                self.env.models_dir.display()
            ));
            return Step::Done(Some(WhisperqError::ModelFetchFailed {
                message: e.to_string(),
            }));
        }

        let model_path = self.model_path();
        if model_path.exists() {
            self.console
                .line(&format!("Model file exists: {}", model_path.display()));
            return Step::Transcribing;
        }

        let url = models::model_url(&self.job.options.model);
        self.console
            .line(&format!("Model file not found: {}", model_path.display()));
        self.console.line(&format!("Downloading model from {url}"));

        let spec = CommandSpec::new(
            self.env.fetcher.clone(),
            vec![
                "-L".to_string(),
                url,
                "-o".to_string(),
                path_arg(&model_path),
            ],
        );

        let exit = match self.stages.run(spec, self.console.as_ref()).await {
            Ok(exit) => exit,
            Err(e) => {
                remove_partial(&model_path);
                return Step::Done(Some(WhisperqError::ModelFetchFailed {
                    message: e.to_string(),
                }));
            }
        };

        if !exit.success() {
            self.console
                .line(&format!("Failed to download model: {}.", exit.describe()));
            remove_partial(&model_path);
            return Step::Done(Some(stage_error(exit, &self.env.fetcher, |message| {
                WhisperqError::ModelFetchFailed { message }
            })));
        }

        // A tiny "model" is an HTML error page, not a model.
        let size = fs::metadata(&model_path).map(|m| m.len()).unwrap_or(0);
        if size < defaults::MIN_MODEL_BYTES {
            self.console.line(&format!(
                "Downloaded model appears to be too small ({size} bytes)."
            ));
            remove_partial(&model_path);
            return Step::Done(Some(WhisperqError::ModelFetchFailed {
                message: format!("downloaded file too small ({size} bytes)"),
            }));
        }

        self.console.line(&format!(
            "Model downloaded successfully: {}",
            model_path.display()
        ));
        Step::Transcribing
    }

    async fn transcribe(&mut self) -> Step {
        let model_path = self.model_path();
        let options = &self.job.options;

        let mut args = vec![
            "-m".to_string(),
            path_arg(&model_path),
            "-f".to_string(),
            path_arg(&self.audio_path),
        ];
        if options.text_output {
            args.push("-otxt".to_string());
        }
        if options.subtitle_output {
            args.push("-osrt".to_string());
        }
        if options.cpu_only {
            args.push("--no-gpu".to_string());
        }
        args.push("-l".to_string());
        args.push(options.language.clone());
        args.extend(options.extra_tokens());

        let spec = CommandSpec::new(self.env.transcriber.clone(), args);
        self.console.line(&format!("Running: {}", spec.rendered()));

        let exit = match self.stages.run(spec, self.console.as_ref()).await {
            Ok(exit) => exit,
            Err(e) => {
                return Step::Done(Some(WhisperqError::TranscriptionFailed {
                    message: e.to_string(),
                }));
            }
        };

        if exit.success() {
            if options.text_output && options.open_result {
                self.console
                    .line("Whisper processing complete. Opening transcript.");
                self.viewer.open_later(&transcript_path(&self.audio_path));
            } else {
                self.console.line("Whisper processing complete.");
            }
            Step::Done(None)
        } else {
            self.console
                .line(&format!("Whisper process failed: {}.", exit.describe()));
            Step::Done(Some(stage_error(exit, &self.env.transcriber, |message| {
                WhisperqError::TranscriptionFailed { message }
            })))
        }
    }

    fn model_path(&self) -> PathBuf {
        self.env
            .models_dir
            .join(models::model_file_name(&self.job.options.model))
    }
}

/// `<audio path>.txt`. The engine appends the suffix, it does not replace
/// the extension.
fn transcript_path(audio: &Path) -> PathBuf {
    let mut name = audio.as_os_str().to_os_string();
    name.push(".txt");
    PathBuf::from(name)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn nonempty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

fn remove_partial(path: &Path) {
    if path.exists()
        && let Err(e) = fs::remove_file(path)
    {
        eprintln!(
            "whisperq: failed to remove partial file {}: {e}",
            path.display()
        );
    }
}

/// Crashes get their own taxonomy entry; normal non-zero exits wrap the
/// stage-specific variant.
fn stage_error<F>(exit: StageExit, tool: &str, wrap: F) -> WhisperqError
where
    F: FnOnce(String) -> WhisperqError,
{
    if exit.crashed {
        WhisperqError::ProcessCrashed {
            tool: tool.to_string(),
        }
    } else {
        wrap(exit.describe())
    }
}

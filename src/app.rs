//! Composition root: wires the queue, pipelines, and live sessions.

use crate::config::Settings;
use crate::console::{Console, StdoutConsole};
use crate::job::{Job, JobOptions};
use crate::live::{LiveEvent, LiveSession};
use crate::models;
use crate::pipeline::{JobOutcome, PipelineEnv, PipelineRunner};
use crate::queue::JobQueue;
use crate::stage::{ProcessStageRunner, StageRunner};
use crate::supervisor::ProcessSupervisor;
use crate::viewer::{DesktopViewer, TranscriptViewer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared collaborators for one application run.
///
/// Built once in `main` with production implementations; tests assemble
/// their own with mocks.
pub struct AppContext {
    pub supervisor: Arc<ProcessSupervisor>,
    pub stages: Arc<dyn StageRunner>,
    pub console: Arc<dyn Console>,
    pub viewer: Arc<dyn TranscriptViewer>,
    pub env: PipelineEnv,
}

impl AppContext {
    /// Production wiring: real processes, stdout console, desktop viewer.
    pub fn production() -> Self {
        let supervisor = Arc::new(ProcessSupervisor::new());
        Self {
            stages: Arc::new(ProcessStageRunner::new(supervisor.clone())),
            supervisor,
            console: Arc::new(StdoutConsole::new()),
            viewer: Arc::new(DesktopViewer::new()),
            env: PipelineEnv::default(),
        }
    }
}

/// Tally of a finished queue run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub completed: usize,
    pub failed: usize,
    /// True when the user aborted the run.
    pub stopped: bool,
}

/// Transcribes `files` in FIFO order, one pipeline at a time.
///
/// Every enqueued job produces exactly one outcome, failures included.
/// Ctrl+C is the global stop: pending jobs are discarded and every
/// registered process is terminated; the in-flight job then reports its
/// outcome and the loop drains.
pub async fn run_queue(files: Vec<PathBuf>, options: JobOptions, ctx: &AppContext) -> QueueSummary {
    let mut queue = JobQueue::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<JobOutcome>();
    let mut summary = QueueSummary::default();

    let jobs: Vec<Job> = files
        .into_iter()
        .map(|file| Job::new(file, options.clone()))
        .collect();
    match queue.enqueue(jobs) {
        Some(job) => dispatch(job, ctx, &done_tx),
        None => return summary,
    }

    loop {
        tokio::select! {
            outcome = done_rx.recv() => {
                let Some(outcome) = outcome else { break };
                if outcome.succeeded() {
                    summary.completed += 1;
                } else {
                    summary.failed += 1;
                }
                match queue.on_job_finished() {
                    Some(job) => dispatch(job, ctx, &done_tx),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c(), if !summary.stopped => {
                summary.stopped = true;
                ctx.console.line("The user stopped the process.");
                queue.clear();
                ctx.supervisor.terminate_all().await;
                // The active pipeline sees its process die and reports a
                // failed outcome, which drains the loop above.
            }
        }
    }

    summary
}

fn dispatch(job: Job, ctx: &AppContext, done_tx: &mpsc::UnboundedSender<JobOutcome>) {
    let runner = PipelineRunner::new(
        job,
        ctx.env.clone(),
        ctx.stages.clone(),
        ctx.console.clone(),
        ctx.viewer.clone(),
    );
    let done_tx = done_tx.clone();
    tokio::spawn(async move {
        let outcome = runner.run().await;
        done_tx.send(outcome).ok();
    });
}

/// Runs a live session until Ctrl+C or a natural engine exit.
pub async fn run_live(settings: &Settings, ctx: &AppContext) -> crate::error::Result<()> {
    let model_path = ctx
        .env
        .models_dir
        .join(models::model_file_name(&settings.model));
    if !model_path.exists() {
        ctx.console
            .line(&format!("Model file not found: {}", model_path.display()));
    }

    let mut session = LiveSession::new(ctx.supervisor.clone(), ctx.console.clone());
    let Some(mut events) = session.start(&model_path, &settings.language, settings.cpu_only)?
    else {
        return Ok(());
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(LiveEvent::Fragment(text)) => ctx.console.line(&text),
                Some(LiveEvent::Ended) | None => {
                    session.stop().await;
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                session.stop().await;
                // Ended arrives through the channel and exits the loop.
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CollectorConsole;
    use crate::stage::MockStageRunner;
    use crate::viewer::RecordingViewer;
    use std::fs;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        console: Arc<CollectorConsole>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                console: Arc::new(CollectorConsole::new()),
            }
        }

        fn ctx(&self, stages: Arc<MockStageRunner>) -> AppContext {
            let supervisor = Arc::new(ProcessSupervisor::new());
            AppContext {
                supervisor,
                stages,
                console: self.console.clone(),
                viewer: Arc::new(RecordingViewer::new()),
                env: PipelineEnv {
                    models_dir: self.dir.path().join("models"),
                    ..Default::default()
                },
            }
        }

        fn media(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"media").unwrap();
            path
        }

        fn install_model(&self, model: &str) {
            let dir = self.dir.path().join("models");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(models::model_file_name(model)), b"model").unwrap();
        }
    }

    fn options() -> JobOptions {
        JobOptions {
            open_result: false,
            ..JobOptions::default()
        }
    }

    #[tokio::test]
    async fn empty_file_list_finishes_immediately() {
        let harness = Harness::new();
        let ctx = harness.ctx(Arc::new(MockStageRunner::new()));
        let summary = run_queue(Vec::new(), options(), &ctx).await;
        assert_eq!(summary, QueueSummary::default());
    }

    #[tokio::test]
    async fn every_job_reports_one_outcome_even_when_some_fail() {
        let harness = Harness::new();
        harness.install_model("medium.en");
        let a = harness.media("a.mp3");
        let b = harness.media("b.mp3");
        let c = harness.media("c.mp3");

        // Engine runs: a succeeds, b fails, c succeeds.
        let stages = Arc::new(
            MockStageRunner::new()
                .expect_success()
                .expect_exit_code(1)
                .expect_success(),
        );
        let ctx = harness.ctx(stages.clone());

        let summary = run_queue(vec![a.clone(), b.clone(), c.clone()], options(), &ctx).await;

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.stopped);

        // Jobs ran in enqueue order, one at a time.
        let inputs: Vec<String> = stages
            .invocations()
            .iter()
            .map(|spec| spec.args.clone())
            .map(|args| args[3].clone())
            .collect();
        assert_eq!(
            inputs,
            vec![
                a.display().to_string(),
                b.display().to_string(),
                c.display().to_string()
            ]
        );
    }

    #[tokio::test]
    async fn stages_of_consecutive_jobs_never_interleave() {
        let harness = Harness::new();
        harness.install_model("medium.en");
        let a = harness.media("a.wav");
        let b = harness.media("b.wav");

        let a_mp3 = a.with_extension("mp3");
        let b_mp3 = b.with_extension("mp3");
        let (a_out, b_out) = (a_mp3.clone(), b_mp3.clone());
        let stages = Arc::new(
            MockStageRunner::new()
                .expect_success()
                .with_effect(move |_| fs::write(&a_out, b"audio").unwrap())
                .expect_success() // whisper for a
                .expect_success()
                .with_effect(move |_| fs::write(&b_out, b"audio").unwrap())
                .expect_success(), // whisper for b
        );
        let ctx = harness.ctx(stages.clone());

        let summary = run_queue(vec![a, b], options(), &ctx).await;
        assert_eq!(summary.completed, 2);

        let programs: Vec<String> = stages
            .invocations()
            .iter()
            .map(|spec| spec.program.clone())
            .collect();
        assert_eq!(programs, vec!["ffmpeg", "whisper-cli", "ffmpeg", "whisper-cli"]);
    }

    #[tokio::test]
    async fn shared_model_is_fetched_once_across_sequential_jobs() {
        let harness = Harness::new();
        let a = harness.media("a.mp3");
        let b = harness.media("b.mp3");
        let model_path = harness
            .dir
            .path()
            .join("models")
            .join(models::model_file_name("medium.en"));

        // First job fetches the model; the second finds it on disk.
        let stages = Arc::new(
            MockStageRunner::new()
                .expect_success()
                .with_effect(move |_| fs::write(&model_path, vec![0u8; 1_100_000]).unwrap())
                .expect_success() // whisper for a
                .expect_success(), // whisper for b
        );
        let ctx = harness.ctx(stages.clone());

        let summary = run_queue(vec![a, b], options(), &ctx).await;
        assert_eq!(summary.completed, 2);

        let fetches = stages
            .invocations()
            .iter()
            .filter(|spec| spec.program == "curl")
            .count();
        assert_eq!(fetches, 1, "second job must reuse the downloaded model");
    }

    #[tokio::test]
    async fn input_not_found_does_not_block_later_jobs() {
        let harness = Harness::new();
        harness.install_model("medium.en");
        let missing = harness.dir.path().join("missing.mp3");
        let b = harness.media("b.mp3");

        let stages = Arc::new(MockStageRunner::new());
        let ctx = harness.ctx(stages.clone());

        let summary = run_queue(vec![missing, b], options(), &ctx).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(stages.invocations().len(), 1, "only the real file runs");
        assert!(harness.console.contains("Input file not found"));
    }
}

//! Single external-process invocations with merged output streaming.
//!
//! `ManagedProcess` wraps one spawned child: stdout and stderr are merged
//! into a single line stream, and the process is registered with the
//! `ProcessSupervisor` from spawn to reap. `StageRunner` is the seam the
//! pipeline state machine runs stages through, so tests can script stage
//! results without starting any process.

use crate::console::Console;
use crate::error::{Result, WhisperqError};
use crate::supervisor::{self, ProcessSupervisor};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Program plus arguments for one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-style rendering for `Running: …` log lines.
    pub fn rendered(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// How an external process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageExit {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// True when the process did not exit normally.
    pub crashed: bool,
}

impl StageExit {
    pub fn success(&self) -> bool {
        !self.crashed && self.code == Some(0)
    }

    /// Human-readable exit description for failure log lines.
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "killed by signal".to_string(),
        }
    }

    fn from_status(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            crashed: status.code().is_none(),
        }
    }
}

/// A spawned external process with merged stdout/stderr line stream.
///
/// Registered with the supervisor for its whole lifetime; `wait` and `stop`
/// unregister on reap. The supervisor only ever signals the pid; ownership
/// of the child stays here.
pub struct ManagedProcess {
    pid: u32,
    child: Child,
    lines: UnboundedReceiver<String>,
    supervisor: Arc<ProcessSupervisor>,
}

impl ManagedProcess {
    /// Spawns the command. The caller is never blocked; output arrives
    /// through `next_line` as the process produces it.
    pub fn spawn(spec: &CommandSpec, supervisor: Arc<ProcessSupervisor>) -> Result<Self> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => WhisperqError::ToolNotFound {
                    tool: spec.program.clone(),
                },
                _ => WhisperqError::SpawnFailed {
                    tool: spec.program.clone(),
                    message: e.to_string(),
                },
            })?;

        let (tx, lines) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx));
        }

        let pid = child.id().unwrap_or_default();
        supervisor.register(pid, &spec.program);

        Ok(Self {
            pid,
            child,
            lines,
            supervisor,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Next merged output line; `None` once both pipes have closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Waits for the process to exit and unregisters it.
    pub async fn wait(mut self) -> Result<StageExit> {
        let status = self.child.wait().await;
        self.supervisor.unregister(self.pid);
        Ok(StageExit::from_status(status?))
    }

    /// Requests graceful termination, escalating to a kill if the process
    /// has not exited when `grace` elapses. Unregisters on reap.
    pub async fn stop(mut self, grace: Duration) -> StageExit {
        supervisor::request_terminate(self.pid);
        let status = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(waited) => waited.ok(),
            Err(_) => {
                self.child.start_kill().ok();
                self.child.wait().await.ok()
            }
        };
        self.supervisor.unregister(self.pid);
        match status {
            Some(status) => StageExit::from_status(status),
            None => StageExit {
                code: None,
                crashed: true,
            },
        }
    }
}

async fn forward_lines<R>(reader: R, tx: UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Runs one external process to completion, streaming merged output.
///
/// This trait is the seam between the pipeline state machine and real
/// processes: the binary injects `ProcessStageRunner`, tests inject
/// `MockStageRunner`.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Delivers every output line to `console` and resolves once the
    /// process exits. Exactly one `StageExit` per invocation.
    async fn run(&self, spec: CommandSpec, console: &dyn Console) -> Result<StageExit>;
}

/// Production stage runner backed by real child processes.
pub struct ProcessStageRunner {
    supervisor: Arc<ProcessSupervisor>,
}

impl ProcessStageRunner {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl StageRunner for ProcessStageRunner {
    async fn run(&self, spec: CommandSpec, console: &dyn Console) -> Result<StageExit> {
        let mut process = ManagedProcess::spawn(&spec, self.supervisor.clone())?;
        while let Some(line) = process.next_line().await {
            console.line(&line);
        }
        process.wait().await
    }
}

/// Scripted stage runner for tests.
///
/// Records every invocation and replays canned exits without spawning
/// anything. Scripted entries are consumed in order; once the script runs
/// dry, further invocations succeed silently.
#[derive(Default)]
pub struct MockStageRunner {
    invocations: std::sync::Mutex<Vec<CommandSpec>>,
    script: std::sync::Mutex<std::collections::VecDeque<ScriptedStage>>,
}

struct ScriptedStage {
    result: Result<StageExit>,
    output: Vec<String>,
    effect: Option<Box<dyn Fn(&CommandSpec) + Send>>,
}

impl MockStageRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a normal exit with the given code.
    pub fn expect_exit_code(self, code: i32) -> Self {
        self.push(Ok(StageExit {
            code: Some(code),
            crashed: false,
        }))
    }

    /// Queue a successful exit (code 0).
    pub fn expect_success(self) -> Self {
        self.expect_exit_code(0)
    }

    /// Queue an abnormal termination.
    pub fn expect_crash(self) -> Self {
        self.push(Ok(StageExit {
            code: None,
            crashed: true,
        }))
    }

    /// Queue a spawn failure (tool not installed).
    pub fn expect_spawn_error(self, tool: &str) -> Self {
        self.push(Err(WhisperqError::ToolNotFound {
            tool: tool.to_string(),
        }))
    }

    /// Attach output lines to the most recently queued stage.
    pub fn with_output(self, lines: &[&str]) -> Self {
        if let Ok(mut script) = self.script.lock()
            && let Some(stage) = script.back_mut()
        {
            stage.output = lines.iter().map(|l| l.to_string()).collect();
        }
        self
    }

    /// Attach a side effect (e.g. creating the stage's output file) to the
    /// most recently queued stage. Runs before the exit is reported.
    pub fn with_effect(self, effect: impl Fn(&CommandSpec) + Send + 'static) -> Self {
        if let Ok(mut script) = self.script.lock()
            && let Some(stage) = script.back_mut()
        {
            stage.effect = Some(Box::new(effect));
        }
        self
    }

    /// Every `CommandSpec` this runner has been asked to run, in order.
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations
            .lock()
            .map(|i| i.clone())
            .unwrap_or_default()
    }

    fn push(self, result: Result<StageExit>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(ScriptedStage {
                result,
                output: Vec::new(),
                effect: None,
            });
        }
        self
    }
}

#[async_trait]
impl StageRunner for MockStageRunner {
    async fn run(&self, spec: CommandSpec, console: &dyn Console) -> Result<StageExit> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(spec.clone());
        }
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(stage) => {
                if let Some(effect) = &stage.effect {
                    effect(&spec);
                }
                for line in &stage.output {
                    console.line(line);
                }
                stage.result
            }
            None => Ok(StageExit {
                code: Some(0),
                crashed: false,
            }),
        }
    }
}

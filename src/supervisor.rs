//! Registry of running external processes, for user-initiated bulk stop.
//!
//! Stage runners and live sessions register each child for its lifetime.
//! The registry holds pids only, never a child handle, so it can request
//! termination but never reaps or destroys a process out from under its
//! owner.

use crate::defaults;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Shared registry of external processes currently running.
///
/// Passed explicitly (`Arc`) to every component that spawns processes;
/// there is no process-wide singleton.
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    registered: Mutex<HashMap<u32, String>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a freshly spawned process. Re-registering a pid is idempotent.
    pub fn register(&self, pid: u32, label: &str) {
        if let Ok(mut registered) = self.registered.lock() {
            registered.insert(pid, label.to_string());
        }
    }

    /// Stops tracking a process that has been reaped. Unknown pids are a no-op.
    pub fn unregister(&self, pid: u32) {
        if let Ok(mut registered) = self.registered.lock() {
            registered.remove(&pid);
        }
    }

    /// Number of processes currently tracked.
    pub fn registered_count(&self) -> usize {
        self.registered.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Terminates every tracked process: SIGTERM, a short grace window,
    /// then SIGKILL for stragglers. Clears the registry.
    ///
    /// Idempotent: an empty registry returns immediately, and pids whose
    /// processes already exited are harmless to signal.
    pub async fn terminate_all(&self) {
        let pids: Vec<u32> = match self.registered.lock() {
            Ok(registered) => registered.keys().copied().collect(),
            Err(_) => return,
        };
        if pids.is_empty() {
            return;
        }

        for &pid in &pids {
            send_signal(pid, Signal::Term);
        }

        tokio::time::sleep(Duration::from_millis(defaults::TERMINATE_GRACE_MS)).await;

        // Anything still registered did not exit in the grace window; its
        // owner would have unregistered it on reap.
        let stragglers: Vec<u32> = match self.registered.lock() {
            Ok(registered) => registered.keys().copied().collect(),
            Err(_) => Vec::new(),
        };
        for pid in stragglers {
            send_signal(pid, Signal::Kill);
        }

        if let Ok(mut registered) = self.registered.lock() {
            registered.clear();
        }
    }
}

/// Asks a single process to exit (SIGTERM on unix). Used by process owners
/// that manage their own grace window, e.g. a live session's stop.
pub(crate) fn request_terminate(pid: u32) {
    send_signal(pid, Signal::Term);
}

#[derive(Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) {
    // pid 0 would address the whole process group.
    if pid == 0 {
        return;
    }
    let signum = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: kill() with a valid signal number; ESRCH (process already
    // gone) is the expected benign failure and needs no handling.
    unsafe {
        libc::kill(pid as libc::pid_t, signum);
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: Signal) {}

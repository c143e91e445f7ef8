//! External process control for bundle implementations
//!
//! Bundle drivers delegate process work here: phase commands that run to
//! completion (prepare, stop, clean scripts) and long-lived server
//! processes launched detached and tracked by pid.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessStatus, System};
use tracing::{debug, warn};

use crate::errors::{HarnessError, Result};

/// How long a terminated process may linger before escalation
const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(50);
const TERMINATE_POLL_ATTEMPTS: usize = 20;

/// Program invocation for one lifecycle phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSpec {
    /// Program name or path, resolved relative to the working directory
    pub program: String,

    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a spec from a program and its arguments
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args,
        }
    }
}

/// Process launching collaborator
///
/// The lifecycle core never spawns processes itself; bundle drivers call
/// through this seam so tests can substitute a recording fake.
pub trait ProcessLauncher: Send + Sync {
    /// Run a command to completion in the working directory
    ///
    /// # Errors
    ///
    /// `Process` if the command cannot be spawned or exits non-zero
    fn run(
        &self,
        workdir: &Path,
        command: &CommandSpec,
        env: &HashMap<String, String>,
    ) -> Result<()>;

    /// Launch a detached, long-lived process
    ///
    /// # Returns
    ///
    /// The pid of the spawned process
    fn launch(
        &self,
        workdir: &Path,
        command: &CommandSpec,
        env: &HashMap<String, String>,
    ) -> Result<u32>;

    /// Ask a launched process to terminate, escalating if it lingers
    fn terminate(&self, pid: u32) -> Result<()>;

    /// Check if process with given pid is running
    fn is_alive(&self, pid: u32) -> bool;
}

/// Default launcher backed by `std::process::Command`
///
/// Spawned servers are detached from stdio but their child handles are
/// kept for reaping: an exited child is waited on the next time it is
/// observed, so it never lingers as a zombie that still looks alive.
/// Pids the launcher did not spawn are checked against the system
/// process table instead.
pub struct ShellLauncher {
    children: Mutex<HashMap<u32, Child>>,
}

impl ShellLauncher {
    /// Create a launcher with no tracked children
    pub fn new() -> Self {
        ShellLauncher {
            children: Mutex::new(HashMap::new()),
        }
    }

    fn command(workdir: &Path, spec: &CommandSpec, env: &HashMap<String, String>) -> Command {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).current_dir(workdir).envs(env);
        command
    }

    /// Send SIGTERM or SIGKILL to process
    #[cfg(unix)]
    fn send_signal(pid: u32, kill_hard: bool) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let signal = if kill_hard {
            Signal::SIGKILL
        } else {
            Signal::SIGTERM
        };

        kill(Pid::from_raw(pid as i32), signal).is_ok()
    }

    #[cfg(not(unix))]
    fn send_signal(_pid: u32, _kill_hard: bool) -> bool {
        // Windows support would go here
        false
    }

    fn wait_for_exit(&self, pid: u32) -> bool {
        for _ in 0..TERMINATE_POLL_ATTEMPTS {
            if !self.is_alive(pid) {
                return true;
            }
            std::thread::sleep(TERMINATE_POLL_INTERVAL);
        }
        false
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for ShellLauncher {
    fn run(
        &self,
        workdir: &Path,
        command: &CommandSpec,
        env: &HashMap<String, String>,
    ) -> Result<()> {
        debug!(program = %command.program, workdir = %workdir.display(), "Running phase command");

        let status = Self::command(workdir, command, env)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| {
                HarnessError::Process(format!("Failed to run {}: {}", command.program, e))
            })?;

        if !status.success() {
            return Err(HarnessError::Process(format!(
                "Command {} exited with {}",
                command.program, status
            )));
        }

        Ok(())
    }

    fn launch(
        &self,
        workdir: &Path,
        command: &CommandSpec,
        env: &HashMap<String, String>,
    ) -> Result<u32> {
        // Spawn detached from stdio; keep the handle for reaping.
        let child = Self::command(workdir, command, env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                HarnessError::Process(format!("Failed to launch {}: {}", command.program, e))
            })?;

        let pid = child.id();
        self.children.lock().unwrap().insert(pid, child);

        debug!(program = %command.program, pid, "Launched detached process");
        Ok(pid)
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        if !self.is_alive(pid) {
            return Ok(());
        }

        Self::send_signal(pid, false);
        if self.wait_for_exit(pid) {
            debug!(pid, "Process terminated");
            return Ok(());
        }

        warn!(pid, "Process ignored SIGTERM, escalating");
        Self::send_signal(pid, true);
        if self.wait_for_exit(pid) {
            return Ok(());
        }

        Err(HarnessError::Process(format!(
            "Process {} did not terminate",
            pid
        )))
    }

    fn is_alive(&self, pid: u32) -> bool {
        // Own children answer (and reap) through the held handle.
        let mut children = self.children.lock().unwrap();
        if let Some(child) = children.get_mut(&pid) {
            return match child.try_wait() {
                Ok(Some(_)) => {
                    children.remove(&pid);
                    false
                }
                Ok(None) => true,
                Err(_) => false,
            };
        }
        drop(children);

        // Foreign pids fall back to the system process table.
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All);
        match sys.process(Pid::from_u32(pid)) {
            Some(process) => process.status() != ProcessStatus::Zombie,
            None => false,
        }
    }
}

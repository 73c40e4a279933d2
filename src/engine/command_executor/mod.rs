//! Secure Command Executor Module
//!
//! Spawns programs directly with an argument vector via
//! `tokio::process::Command`. No shell is involved, so metacharacters in
//! arguments are inert.
//!
//! Each run races process completion against a deadline. When the deadline
//! wins, the whole process group is killed and the child reaped before the
//! result is built, so nothing outlives a `timed_out` result.

pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command as TokioCommand};
use tracing::{debug, warn};

pub use registry::{ProcessRegistry, RunningProcess};

/// Core command specification (secure, no shell)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    /// Program to execute (must be in PATH or absolute path)
    pub program: String,
    /// Arguments to pass to the program
    pub args: Vec<String>,
    /// Working directory for execution
    pub working_dir: Option<PathBuf>,
    /// Environment variables (extends the inherited environment)
    pub env_vars: HashMap<String, String>,
}

impl Command {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Default::default()
        }
    }
}

/// Result of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code, absent on timeout, spawn failure or signal termination
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Signal that ended a process which did run; not set for our own timeout kill
    #[serde(default)]
    pub signal: Option<i32>,
    /// Set only when the program could not be started or waited on
    pub error: Option<String>,
}

impl ExecutionResult {
    /// The program could not be started at all
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            signal: None,
            error: Some(message.into()),
        }
    }

    /// Ran to completion with exit code zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && self.error.is_none()
    }
}

/// Something that can run a command to completion or timeout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &Command, timeout: Duration) -> ExecutionResult;

    /// Commands currently in flight
    fn running(&self) -> Vec<RunningProcess> {
        Vec::new()
    }
}

/// The production runner backed by OS processes
#[derive(Default)]
pub struct CommandExecutor {
    registry: ProcessRegistry,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience wrapper taking a program and its arguments
    pub async fn run_program(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> ExecutionResult {
        self.execute(&Command::new(program, args.to_vec()), timeout)
            .await
    }

    async fn execute(&self, command: &Command, timeout: Duration) -> ExecutionResult {
        let mut cmd = TokioCommand::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        // Own process group, so a timeout can take descendants down too
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = describe_spawn_error(&command.program, &e);
                debug!("{}", message);
                return ExecutionResult::spawn_failure(message);
            }
        };

        let pid = child.id();
        let _tracked = pid.map(|pid| self.registry.track(pid, command));
        debug!(
            "Spawned '{}' (pid {:?}) with {} arg(s)",
            command.program,
            pid,
            command.args.len()
        );

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let waited = tokio::time::timeout(timeout, async {
            let (status, _, _) = tokio::join!(
                child.wait(),
                drain(stdout_pipe.as_mut(), &mut stdout_buf),
                drain(stderr_pipe.as_mut(), &mut stderr_buf),
            );
            status
        })
        .await;

        let status = match waited {
            Ok(status) => Some(status),
            Err(_) => {
                warn!(
                    target: "security",
                    "'{}' exceeded {}s timeout, terminating",
                    command.program,
                    timeout.as_secs_f64()
                );
                terminate(&mut child, pid).await;
                None
            }
        };

        build_result(
            status,
            String::from_utf8_lossy(&stdout_buf).into_owned(),
            String::from_utf8_lossy(&stderr_buf).into_owned(),
        )
    }
}

#[async_trait]
impl CommandRunner for CommandExecutor {
    async fn run(&self, command: &Command, timeout: Duration) -> ExecutionResult {
        self.execute(command, timeout).await
    }

    fn running(&self) -> Vec<RunningProcess> {
        self.registry.snapshot()
    }
}

/// Single construction point for completed, failed and timed-out runs
fn build_result(
    status: Option<std::io::Result<ExitStatus>>,
    stdout: String,
    stderr: String,
) -> ExecutionResult {
    let mut result = ExecutionResult {
        exit_code: None,
        stdout,
        stderr,
        timed_out: false,
        signal: None,
        error: None,
    };

    match status {
        None => result.timed_out = true,
        Some(Err(e)) => result.error = Some(format!("failed to wait for process: {e}")),
        Some(Ok(status)) => {
            result.exit_code = status.code();
            if result.exit_code.is_none() {
                result.signal = termination_signal(&status);
            }
        }
    }

    result
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    if let Some(pipe) = pipe {
        if let Err(e) = pipe.read_to_end(buf).await {
            debug!("Failed to read process output: {}", e);
        }
    }
}

/// Kill the child's process group, then the child, and reap it
async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        if let Err(e) = kill_process_group(pid) {
            debug!("Failed to kill process group {}: {}", pid, e);
        }
    }

    if let Err(e) = child.kill().await {
        debug!("kill after timeout returned {}", e);
        let _ = child.wait().await;
    }
}

/// The group id equals the child's pid because it was spawned with process_group(0)
#[cfg(unix)]
fn kill_process_group(pgid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| std::io::Error::other("process group id out of range"))?;

    // SAFETY: killpg only delivers a signal and touches no memory.
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) -> std::io::Result<()> {
    Ok(())
}

fn describe_spawn_error(program: &str, e: &std::io::Error) -> String {
    match e.kind() {
        std::io::ErrorKind::NotFound => format!("command not found: {program}"),
        std::io::ErrorKind::PermissionDenied => format!("permission denied: {program}"),
        _ => format!("failed to start {program}: {e}"),
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

//! Interactive approval collaborators.
//!
//! The engine only sees [`ApprovalPrompter`]; whether the answer comes from a
//! terminal, a fixed policy or a remote round-trip is up to the implementation.

use crate::{GatewayError, Result};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// The three answers a human can give
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalChoice {
    AllowOnce,
    AllowAlways,
    Deny,
}

impl ApprovalChoice {
    /// Parse a numbered menu answer
    pub fn from_input(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::AllowOnce),
            "2" => Some(Self::AllowAlways),
            "3" => Some(Self::Deny),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ApprovalPrompter: Send + Sync {
    /// Ask whether `command` may run with `args`. Blocks until an answer arrives.
    async fn request_approval(&self, command: &str, args: &[String]) -> Result<ApprovalChoice>;
}

/// Non-interactive collaborator that denies everything it is asked about
pub struct DenyPrompter;

#[async_trait]
impl ApprovalPrompter for DenyPrompter {
    async fn request_approval(&self, command: &str, _args: &[String]) -> Result<ApprovalChoice> {
        debug!("Auto-denying unapproved command '{}'", command);
        Ok(ApprovalChoice::Deny)
    }
}

/// Prompts on the controlling terminal.
///
/// stdin/stdout belong to the RPC transport, so the terminal device is opened
/// directly. Concurrent requests take turns at the terminal.
pub struct TerminalPrompter {
    tty_path: PathBuf,
    turn: Mutex<()>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::with_device("/dev/tty")
    }

    pub fn with_device(tty_path: impl Into<PathBuf>) -> Self {
        Self {
            tty_path: tty_path.into(),
            turn: Mutex::new(()),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalPrompter for TerminalPrompter {
    async fn request_approval(&self, command: &str, args: &[String]) -> Result<ApprovalChoice> {
        let _turn = self.turn.lock().await;
        let tty_path = self.tty_path.clone();
        let command = command.to_string();
        let args = args.to_vec();

        tokio::task::spawn_blocking(move || {
            let tty = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&tty_path)
                .map_err(|e| {
                    GatewayError::Prompt(format!(
                        "no terminal available at {}: {}",
                        tty_path.display(),
                        e
                    ))
                })?;
            let writer = tty.try_clone()?;
            prompt_loop(BufReader::new(tty), writer, &command, &args)
        })
        .await
        .map_err(|e| GatewayError::Prompt(format!("prompt task failed: {e}")))?
    }
}

/// Render the approval menu shown to the human
pub fn render_prompt(command: &str, args: &[String]) -> String {
    let shown_args = if args.is_empty() {
        "(none)".to_string()
    } else {
        shell_words::join(args)
    };

    format!(
        "\nCommand approval required\n  command: {command}\n  args:    {shown_args}\n  1) Allow once\n  2) Allow and remember\n  3) Deny\nChoice [1-3]: "
    )
}

/// Ask until a valid answer is read; EOF is an error
pub fn prompt_loop<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    command: &str,
    args: &[String],
) -> Result<ApprovalChoice> {
    write!(writer, "{}", render_prompt(command, args))?;
    writer.flush()?;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(GatewayError::Prompt(
                "terminal closed before an answer was given".to_string(),
            ));
        }

        if let Some(choice) = ApprovalChoice::from_input(&line) {
            return Ok(choice);
        }

        write!(writer, "Please enter 1, 2 or 3: ")?;
        writer.flush()?;
    }
}

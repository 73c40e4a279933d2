//! Turns gateway outcomes into the text returned to tool callers

use super::command_executor::{ExecutionResult, RunningProcess};
use super::gateway::GatewayOutcome;
use crate::approval::{ApprovalMap, CommandIdentity};
use crate::Result;
use std::time::Duration;

/// Text plus error flag, as carried by a tool-call result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

pub fn format_outcome(outcome: &GatewayOutcome) -> ToolOutput {
    match outcome {
        GatewayOutcome::Executed {
            result, timeout, ..
        } => format_result(result, *timeout),
        GatewayOutcome::Denied { identity } => ToolOutput::error(format!(
            "Execution of '{identity}' was denied by the user."
        )),
        GatewayOutcome::NotRun { message } => ToolOutput::error(format!("Error: {message}")),
    }
}

fn format_result(result: &ExecutionResult, timeout: Duration) -> ToolOutput {
    let mut text = if let Some(error) = &result.error {
        format!("Error: {error}")
    } else if result.timed_out {
        format!(
            "Command timed out after {} seconds and was terminated.",
            timeout.as_secs()
        )
    } else {
        match (result.exit_code, result.signal) {
            (Some(code), _) => format!("Exit code: {code}"),
            (None, Some(signal)) => format!("Terminated by signal {signal}"),
            (None, None) => "Exit code: unknown".to_string(),
        }
    };

    if !result.stdout.is_empty() {
        text.push_str("\n\nstdout:\n");
        text.push_str(&result.stdout);
    }
    if !result.stderr.is_empty() {
        text.push_str("\n\nstderr:\n");
        text.push_str(&result.stderr);
    }
    if result.success() && result.stdout.is_empty() && result.stderr.is_empty() {
        text.push_str("\n\n(no output)");
    }

    if result.success() {
        ToolOutput::ok(text)
    } else {
        ToolOutput::error(text)
    }
}

pub fn revoke_message(identity: &CommandIdentity, removed: bool) -> String {
    if removed {
        format!("Approval for '{identity}' revoked.")
    } else {
        format!("'{identity}' was not approved.")
    }
}

/// JSON object of identity -> record, for the approved-commands resource
pub fn format_approvals(approvals: &ApprovalMap) -> Result<String> {
    Ok(serde_json::to_string_pretty(approvals)?)
}

pub fn format_running(running: &[RunningProcess]) -> String {
    if running.is_empty() {
        return "No commands are running.".to_string();
    }

    running
        .iter()
        .map(|p| {
            let mut line = format!("pid {}  {}", p.pid, p.program);
            if !p.args.is_empty() {
                line.push(' ');
                line.push_str(&shell_words::join(&p.args));
            }
            line.push_str(&format!("  (started {})", p.started_at.to_rfc3339()));
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

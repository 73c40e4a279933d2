//! Approval management commands: list, revoke, approve

use super::identity::CommandIdentity;
use super::store::{ApprovalRecord, ApprovalStore};
use crate::engine::response::{format_approvals, revoke_message};
use crate::Result;
use clap::{Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ListFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum ApprovalsCommand {
    /// List remembered approvals
    List {
        /// Output format
        #[clap(long, value_enum, default_value = "text")]
        format: ListFormat,
    },

    /// Revoke a remembered approval
    Revoke {
        /// Command whose approval should be removed
        command: String,
    },

    /// Pre-approve a command so it never prompts
    Approve {
        /// Command to approve
        command: String,
    },
}

impl ApprovalsCommand {
    /// Run against `store` and return the text to print
    pub fn run(&self, store: &ApprovalStore) -> Result<String> {
        match self {
            ApprovalsCommand::List { format } => list(store, *format),
            ApprovalsCommand::Revoke { command } => revoke(store, command),
            ApprovalsCommand::Approve { command } => approve(store, command),
        }
    }
}

fn list(store: &ApprovalStore, format: ListFormat) -> Result<String> {
    let records = store.list();

    if format == ListFormat::Json {
        return format_approvals(&records);
    }

    if records.is_empty() {
        return Ok("No commands are approved.".to_string());
    }

    let width = records
        .keys()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0)
        .max("COMMAND".len());

    let mut out = format!("{:<width$}  APPROVED AT", "COMMAND");
    for (identity, record) in &records {
        out.push('\n');
        out.push_str(&format!(
            "{:<width$}  {}",
            identity.as_str(),
            record.approved_at.to_rfc3339()
        ));
    }
    Ok(out)
}

fn revoke(store: &ApprovalStore, command: &str) -> Result<String> {
    let identity = CommandIdentity::from_command(command)?;
    let removed = store.remove(&identity)?;
    Ok(revoke_message(&identity, removed))
}

fn approve(store: &ApprovalStore, command: &str) -> Result<String> {
    let identity = CommandIdentity::from_command(command)?;
    store.put(identity.clone(), ApprovalRecord::approved_now())?;
    Ok(format!("'{identity}' approved."))
}

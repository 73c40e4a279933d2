use super::{CommandHandler, CommandResult};
use crate::cli::AuditFormat;
use crate::engine::audit::{read_entries, AuditEntry, OutcomeSummary};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Handler for the `audit` command
pub struct AuditCommand {
    audit_file: PathBuf,
    tail: Option<usize>,
    format: AuditFormat,
}

impl AuditCommand {
    pub fn new(audit_file: PathBuf, tail: Option<usize>, format: AuditFormat) -> Self {
        Self {
            audit_file,
            tail,
            format,
        }
    }

    fn render(&self, entries: &[AuditEntry]) -> Result<String> {
        let start = self
            .tail
            .map(|n| entries.len().saturating_sub(n))
            .unwrap_or(0);
        let shown = &entries[start..];

        if self.format == AuditFormat::Json {
            let lines = shown
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(lines.join("\n"));
        }

        if shown.is_empty() {
            return Ok("No audit entries.".to_string());
        }

        Ok(shown.iter().map(format_entry).collect::<Vec<_>>().join("\n"))
    }
}

fn format_entry(entry: &AuditEntry) -> String {
    let mut invocation = entry.command.clone();
    if !entry.args.is_empty() {
        invocation.push(' ');
        invocation.push_str(&shell_words::join(&entry.args));
    }

    let outcome = match &entry.outcome {
        None => "-".to_string(),
        Some(OutcomeSummary {
            error: Some(error), ..
        }) => format!("error: {error}"),
        Some(o) if o.timed_out => "timed out".to_string(),
        Some(o) => match (o.exit_code, o.signal) {
            (Some(code), _) => format!("exit {code}"),
            (None, Some(signal)) => format!("signal {signal}"),
            (None, None) => "exit unknown".to_string(),
        },
    };

    format!(
        "{}  {:<18}  {}  [{}]",
        entry.timestamp.to_rfc3339(),
        entry.decision.as_str(),
        invocation,
        outcome
    )
}

#[async_trait]
impl CommandHandler for AuditCommand {
    async fn execute(&self) -> Result<CommandResult> {
        let entries = read_entries(&self.audit_file)?;
        Ok(CommandResult::Success(Some(self.render(&entries)?)))
    }

    fn name(&self) -> &'static str {
        "audit"
    }
}

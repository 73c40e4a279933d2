use super::{CommandHandler, CommandResult};
use crate::engine::response::format_outcome;
use crate::engine::{ExecutionRequest, Gateway};
use crate::Result;
use async_trait::async_trait;

/// Handler for the `exec` command
pub struct ExecCommand {
    gateway: Gateway,
    command: String,
    args: Vec<String>,
}

impl ExecCommand {
    pub fn new(gateway: Gateway, command: String, args: Vec<String>) -> Self {
        Self {
            gateway,
            command,
            args,
        }
    }
}

#[async_trait]
impl CommandHandler for ExecCommand {
    async fn execute(&self) -> Result<CommandResult> {
        let outcome = self
            .gateway
            .execute(ExecutionRequest {
                command: self.command.clone(),
                args: self.args.clone(),
                timeout: None,
            })
            .await;

        let output = format_outcome(&outcome);
        Ok(if output.is_error {
            CommandResult::Error(output.text)
        } else {
            CommandResult::Success(Some(output.text))
        })
    }

    fn name(&self) -> &'static str {
        "exec"
    }
}

use super::{CommandHandler, CommandResult};
use crate::approval::{ApprovalStore, ApprovalsCommand};
use crate::Result;
use async_trait::async_trait;

/// Handler for the `approvals` command family
pub struct ApprovalsHandler {
    store: ApprovalStore,
    command: ApprovalsCommand,
}

impl ApprovalsHandler {
    pub fn new(store: ApprovalStore, command: ApprovalsCommand) -> Self {
        Self { store, command }
    }
}

#[async_trait]
impl CommandHandler for ApprovalsHandler {
    async fn execute(&self) -> Result<CommandResult> {
        let output = self.command.run(&self.store)?;
        Ok(CommandResult::Success(Some(output)))
    }

    fn name(&self) -> &'static str {
        "approvals"
    }
}

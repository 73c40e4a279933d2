use super::{CommandHandler, CommandResult};
use crate::cli::GatewayContext;
use crate::server::McpServer;
use crate::Result;
use async_trait::async_trait;

/// Handler for the `serve` command
pub struct ServeCommand {
    context: GatewayContext,
}

impl ServeCommand {
    pub fn new(context: GatewayContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl CommandHandler for ServeCommand {
    async fn execute(&self) -> Result<CommandResult> {
        let server = McpServer::new(self.context.gateway());
        server.run_stdio().await?;
        Ok(CommandResult::Success(None))
    }

    fn name(&self) -> &'static str {
        "serve"
    }
}

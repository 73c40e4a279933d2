//! execgate - approval-gated command execution
//!
//! Logs go to stderr; stdout belongs to the MCP protocol when serving.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use execgate::cli::commands::{
    approvals::ApprovalsHandler, audit::AuditCommand, exec::ExecCommand, serve::ServeCommand,
    CommandHandler,
};
use execgate::cli::{Cli, Commands, GatewayContext, LogLevel};

fn initialize_tracing(log_level: LogLevel, json: bool) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_tracing(cli.log_level, cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let context = GatewayContext::load(
        cli.config_dir.as_deref(),
        cli.config.as_deref(),
        cli.timeout,
    )
    .context("failed to initialise execgate")?;

    let handler: Box<dyn CommandHandler + Send + Sync> = match cli.command {
        Commands::Serve => Box::new(ServeCommand::new(context)),
        Commands::Exec { command, args } => {
            Box::new(ExecCommand::new(context.gateway(), command, args))
        }
        Commands::Approvals { command } => {
            Box::new(ApprovalsHandler::new(context.store(), command))
        }
        Commands::Audit { tail, format } => {
            Box::new(AuditCommand::new(context.audit_file(), tail, format))
        }
    };

    debug!("Running '{}'", handler.name());
    let result = handler
        .execute()
        .await
        .with_context(|| format!("{} failed", handler.name()))?;

    if let Some(message) = result.message() {
        println!("{message}");
    }

    Ok(if result.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

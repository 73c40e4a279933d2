//! Gateway - per-request orchestration
//!
//! Normalizes the identity, obtains a decision, runs the command when allowed,
//! and records the attempt. Every failure is folded into a [`GatewayOutcome`];
//! nothing here returns an error for a single bad request.

use super::audit::{AuditEntry, AuditSinkImpl, NullSink, OutcomeSummary};
use super::command_executor::{
    Command, CommandExecutor, CommandRunner, ExecutionResult, RunningProcess,
};
use crate::approval::{
    split_command, ApprovalEngine, ApprovalMap, ApprovalPrompter, ApprovalStore, CommandIdentity,
    Decision,
};
use crate::config::Settings;
use crate::io::GatewayPaths;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A request to run `command` with `args`
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// Program, optionally followed by leading arguments ("git status")
    pub command: String,
    pub args: Vec<String>,
    /// Overrides the configured default
    pub timeout: Option<Duration>,
}

/// A request to run a program inside a Python virtual environment
#[derive(Debug, Clone, Default)]
pub struct VenvRequest {
    pub venv_path: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    /// The command was allowed and ran (successfully or not)
    Executed {
        decision: Decision,
        result: ExecutionResult,
        timeout: Duration,
    },
    /// The human denied the request
    Denied { identity: CommandIdentity },
    /// Nothing ran: invalid request, no approval answer, or approval not persisted
    NotRun { message: String },
}

pub struct Gateway {
    store: Arc<ApprovalStore>,
    engine: ApprovalEngine,
    runner: Arc<dyn CommandRunner>,
    audit: AuditSinkImpl,
    default_timeout: Duration,
}

impl Gateway {
    pub fn new(
        store: Arc<ApprovalStore>,
        prompter: Arc<dyn ApprovalPrompter>,
        runner: Arc<dyn CommandRunner>,
        audit: AuditSinkImpl,
        default_timeout: Duration,
    ) -> Self {
        Self {
            engine: ApprovalEngine::new(store.clone(), prompter),
            store,
            runner,
            audit,
            default_timeout,
        }
    }

    /// Wire up the production collaborators from settings
    pub fn from_settings(
        paths: &GatewayPaths,
        settings: &Settings,
        prompter: Arc<dyn ApprovalPrompter>,
    ) -> Self {
        let audit = if settings.audit_logging {
            AuditSinkImpl::file(settings.audit_path(paths))
        } else {
            AuditSinkImpl::Null(NullSink)
        };

        Self::new(
            Arc::new(ApprovalStore::open(settings.approvals_path(paths))),
            prompter,
            Arc::new(CommandExecutor::new()),
            audit,
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn execute(&self, request: ExecutionRequest) -> GatewayOutcome {
        let (program, mut args) = match split_command(&request.command) {
            Ok(split) => split,
            Err(e) => return self.not_run(&request.command, &request.args, e.to_string()).await,
        };
        args.extend(request.args);

        let identity = CommandIdentity::from_program(&program);
        self.authorize_and_run(identity, Command::new(program, args), request.timeout)
            .await
    }

    /// Run inside a virtual environment without a shell.
    ///
    /// The program resolves to `<venv>/bin/<program>` when that exists, and the
    /// environment gets `VIRTUAL_ENV` plus `<venv>/bin` at the front of `PATH`.
    pub async fn run_in_venv(&self, request: VenvRequest) -> GatewayOutcome {
        if !request.venv_path.is_dir() {
            return self
                .not_run(
                    &request.command,
                    &request.args,
                    format!(
                        "virtual environment not found: {}",
                        request.venv_path.display()
                    ),
                )
                .await;
        }

        let (program, mut args) = match split_command(&request.command) {
            Ok(split) => split,
            Err(e) => return self.not_run(&request.command, &request.args, e.to_string()).await,
        };
        args.extend(request.args);

        let identity = CommandIdentity::from_program(&program);
        let bin_dir = request.venv_path.join("bin");
        let candidate = bin_dir.join(&program);
        let resolved = if !program.contains('/') && candidate.is_file() {
            candidate.to_string_lossy().into_owned()
        } else {
            program.clone()
        };

        let mut command = Command::new(resolved, args);
        command.env_vars.insert(
            "VIRTUAL_ENV".to_string(),
            request.venv_path.to_string_lossy().into_owned(),
        );
        let mut search_path = vec![bin_dir];
        if let Some(existing) = std::env::var_os("PATH") {
            search_path.extend(std::env::split_paths(&existing));
        }
        match std::env::join_paths(search_path) {
            Ok(joined) => {
                command
                    .env_vars
                    .insert("PATH".to_string(), joined.to_string_lossy().into_owned());
            }
            Err(e) => warn!("Could not build PATH for virtual environment: {}", e),
        }

        self.authorize_and_run(identity, command, request.timeout)
            .await
    }

    /// Remove a remembered approval; `Ok(false)` when there was none
    pub async fn revoke(&self, command: &str) -> Result<(CommandIdentity, bool)> {
        let identity = CommandIdentity::from_command(command)?;
        let removed = self.store.remove_async(identity.clone()).await?;
        Ok((identity, removed))
    }

    pub fn approvals(&self) -> ApprovalMap {
        self.store.list()
    }

    pub fn running(&self) -> Vec<RunningProcess> {
        self.runner.running()
    }

    async fn authorize_and_run(
        &self,
        identity: CommandIdentity,
        command: Command,
        timeout: Option<Duration>,
    ) -> GatewayOutcome {
        let decision = match self
            .engine
            .decide(&identity, &command.program, &command.args)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!("No approval for '{}': {}", identity, e);
                return self
                    .not_run(&command.program, &command.args, e.to_string())
                    .await;
            }
        };

        if !decision.is_allowed() {
            self.audit
                .record(&AuditEntry::new(
                    command.program.as_str(),
                    &command.args,
                    Decision::Deny,
                    None,
                ))
                .await;
            return GatewayOutcome::Denied { identity };
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        info!(
            "Running '{}' ({:?}, timeout {}s)",
            identity,
            decision,
            timeout.as_secs()
        );
        let result = self.runner.run(&command, timeout).await;
        debug!(
            "'{}' finished: exit={:?} signal={:?} timed_out={} error={:?}",
            identity, result.exit_code, result.signal, result.timed_out, result.error
        );

        self.audit
            .record(&AuditEntry::new(
                command.program.as_str(),
                &command.args,
                decision,
                Some(OutcomeSummary::from(&result)),
            ))
            .await;

        GatewayOutcome::Executed {
            decision,
            result,
            timeout,
        }
    }

    async fn not_run(&self, command: &str, args: &[String], message: String) -> GatewayOutcome {
        self.audit
            .record(&AuditEntry::new(
                command,
                args,
                Decision::Deny,
                Some(OutcomeSummary::not_run(message.as_str())),
            ))
            .await;
        GatewayOutcome::NotRun { message }
    }
}

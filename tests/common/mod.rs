//! Shared test doubles for gateway-level tests

#![allow(dead_code)]

use async_trait::async_trait;
use execgate::approval::{ApprovalChoice, ApprovalPrompter, ApprovalStore};
use execgate::engine::audit::AuditSinkImpl;
use execgate::engine::{Command, CommandExecutor, CommandRunner, ExecutionResult, Gateway};
use execgate::{GatewayError, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers approval requests from a fixed queue and counts how often it was asked.
/// An exhausted queue behaves like a closed terminal.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<ApprovalChoice>>,
    calls: AtomicUsize,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = ApprovalChoice>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApprovalPrompter for ScriptedPrompter {
    async fn request_approval(&self, _command: &str, _args: &[String]) -> Result<ApprovalChoice> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::Prompt("terminal closed".to_string()))
    }
}

/// Records every command it is handed and reports a clean exit without running anything
#[derive(Default)]
pub struct SpyRunner {
    seen: Mutex<Vec<Command>>,
}

impl SpyRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<Command> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for SpyRunner {
    async fn run(&self, command: &Command, _timeout: Duration) -> ExecutionResult {
        self.seen.lock().unwrap().push(command.clone());
        ExecutionResult {
            exit_code: Some(0),
            stdout: "ok\n".to_string(),
            stderr: String::new(),
            timed_out: false,
            signal: None,
            error: None,
        }
    }
}

pub fn store_in(dir: &Path) -> Arc<ApprovalStore> {
    Arc::new(ApprovalStore::open(dir.join("approved_commands.json")))
}

/// Gateway over a spy runner, auditing to `<dir>/audit.log`
pub fn spy_gateway(
    dir: &Path,
    prompter: Arc<ScriptedPrompter>,
    runner: Arc<SpyRunner>,
) -> (Gateway, Arc<ApprovalStore>) {
    let store = store_in(dir);
    let gateway = Gateway::new(
        store.clone(),
        prompter,
        runner,
        AuditSinkImpl::file(dir.join("audit.log")),
        Duration::from_secs(30),
    );
    (gateway, store)
}

/// Gateway over the real process executor
pub fn real_gateway(
    dir: &Path,
    prompter: Arc<ScriptedPrompter>,
    default_timeout: Duration,
) -> (Gateway, Arc<ApprovalStore>) {
    let store = store_in(dir);
    let gateway = Gateway::new(
        store.clone(),
        prompter,
        Arc::new(CommandExecutor::new()),
        AuditSinkImpl::file(dir.join("audit.log")),
        default_timeout,
    );
    (gateway, store)
}

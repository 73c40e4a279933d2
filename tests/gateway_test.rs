//! Gateway behaviour: approval gating, persistence, audit trail, execution limits

mod common;

use common::{real_gateway, spy_gateway, store_in, ScriptedPrompter, SpyRunner};
use execgate::approval::{ApprovalChoice, ApprovalRecord, ApprovalStore, CommandIdentity, Decision};
use execgate::engine::audit::read_entries;
use execgate::engine::{ExecutionRequest, GatewayOutcome};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn request(command: &str, args: &[&str]) -> ExecutionRequest {
    ExecutionRequest {
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        timeout: None,
    }
}

#[tokio::test]
async fn test_denial_never_reaches_executor() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([ApprovalChoice::Deny]);
    let runner = SpyRunner::new();
    let (gateway, store) = spy_gateway(temp.path(), prompter.clone(), runner.clone());

    let outcome = gateway.execute(request("rm", &["-rf", "build"])).await;

    assert_eq!(
        outcome,
        GatewayOutcome::Denied {
            identity: CommandIdentity::from_program("rm")
        }
    );
    assert_eq!(runner.calls(), 0);
    assert!(store.list().is_empty());

    let entries = read_entries(&temp.path().join("audit.log")).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].command, "rm");
    assert_eq!(entries[0].args, vec!["-rf", "build"]);
    assert_eq!(entries[0].decision, Decision::Deny);
    assert!(entries[0].outcome.is_none());
}

#[tokio::test]
async fn test_allow_once_is_not_remembered() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([ApprovalChoice::AllowOnce, ApprovalChoice::AllowOnce]);
    let runner = SpyRunner::new();
    let (gateway, store) = spy_gateway(temp.path(), prompter.clone(), runner.clone());

    for _ in 0..2 {
        let outcome = gateway.execute(request("ls", &[])).await;
        assert!(matches!(
            outcome,
            GatewayOutcome::Executed {
                decision: Decision::AllowOnce,
                ..
            }
        ));
    }

    assert_eq!(prompter.calls(), 2);
    assert_eq!(runner.calls(), 2);
    assert!(store.list().is_empty());
    assert!(!temp.path().join("approved_commands.json").exists());
}

#[tokio::test]
async fn test_allow_always_covers_every_argument_list() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([ApprovalChoice::AllowAlways]);
    let runner = SpyRunner::new();
    let (gateway, _store) = spy_gateway(temp.path(), prompter.clone(), runner.clone());

    let first = gateway.execute(request("git status", &[])).await;
    let second = gateway.execute(request("git", &["log", "--oneline"])).await;

    for outcome in [&first, &second] {
        assert!(matches!(
            outcome,
            GatewayOutcome::Executed {
                decision: Decision::AllowPersistent,
                ..
            }
        ));
    }
    assert_eq!(prompter.calls(), 1);

    let seen = runner.seen();
    assert_eq!(seen[0].program, "git");
    assert_eq!(seen[0].args, vec!["status"]);
    assert_eq!(seen[1].args, vec!["log", "--oneline"]);
}

#[tokio::test]
async fn test_path_qualified_program_is_a_separate_identity() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([ApprovalChoice::Deny]);
    let runner = SpyRunner::new();
    let (gateway, store) = spy_gateway(temp.path(), prompter.clone(), runner.clone());
    store
        .put(CommandIdentity::from_program("git"), ApprovalRecord::approved_now())
        .unwrap();

    let outcome = gateway.execute(request("/usr/bin/git", &["status"])).await;

    assert!(matches!(outcome, GatewayOutcome::Denied { .. }));
    assert_eq!(prompter.calls(), 1);
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_persistent_approval_survives_restart() {
    let temp = tempdir().unwrap();
    {
        let prompter = ScriptedPrompter::new([ApprovalChoice::AllowAlways]);
        let (gateway, _) = spy_gateway(temp.path(), prompter, SpyRunner::new());
        gateway.execute(request("cargo", &["build"])).await;
    }

    let reopened = ApprovalStore::open(temp.path().join("approved_commands.json"));
    assert!(reopened
        .get(&CommandIdentity::from_program("cargo"))
        .is_some());

    // A fresh gateway with no answers left must not need to ask
    let prompter = ScriptedPrompter::new([]);
    let runner = SpyRunner::new();
    let (gateway, _) = spy_gateway(temp.path(), prompter.clone(), runner.clone());
    let outcome = gateway.execute(request("cargo", &["test"])).await;

    assert!(matches!(outcome, GatewayOutcome::Executed { .. }));
    assert_eq!(prompter.calls(), 0);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn test_revoke_is_idempotent_and_restores_prompting() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([ApprovalChoice::AllowAlways, ApprovalChoice::Deny]);
    let runner = SpyRunner::new();
    let (gateway, store) = spy_gateway(temp.path(), prompter.clone(), runner.clone());

    gateway.execute(request("git", &[])).await;
    assert_eq!(store.list().len(), 1);

    let (identity, removed) = gateway.revoke("git").await.unwrap();
    assert_eq!(identity.as_str(), "git");
    assert!(removed);

    let (_, removed_again) = gateway.revoke("git").await.unwrap();
    assert!(!removed_again);
    assert!(store.list().is_empty());

    let outcome = gateway.execute(request("git", &[])).await;
    assert!(matches!(outcome, GatewayOutcome::Denied { .. }));
    assert_eq!(prompter.calls(), 2);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn test_unanswered_prompt_is_treated_as_denial() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([]);
    let runner = SpyRunner::new();
    let (gateway, _) = spy_gateway(temp.path(), prompter.clone(), runner.clone());

    let outcome = gateway.execute(request("make", &[])).await;

    match outcome {
        GatewayOutcome::NotRun { message } => {
            assert!(message.contains("Approval could not be obtained"), "{message}")
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(runner.calls(), 0);

    let entries = read_entries(&temp.path().join("audit.log")).unwrap();
    assert_eq!(entries[0].decision, Decision::Deny);
}

#[tokio::test]
async fn test_unpersistable_approval_does_not_run() {
    let temp = tempdir().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let store = std::sync::Arc::new(ApprovalStore::open(blocker.join("approved_commands.json")));
    let prompter = ScriptedPrompter::new([ApprovalChoice::AllowAlways]);
    let runner = SpyRunner::new();
    let gateway = execgate::engine::Gateway::new(
        store.clone(),
        prompter,
        runner.clone(),
        execgate::engine::audit::AuditSinkImpl::Null(execgate::engine::audit::NullSink),
        Duration::from_secs(30),
    );

    let outcome = gateway.execute(request("npm", &["install"])).await;

    assert!(matches!(outcome, GatewayOutcome::NotRun { .. }));
    assert_eq!(runner.calls(), 0);
    assert!(store.list().is_empty());
}

#[tokio::test]
async fn test_empty_command_is_rejected_without_prompting() {
    let temp = tempdir().unwrap();
    let prompter = ScriptedPrompter::new([ApprovalChoice::AllowOnce]);
    let runner = SpyRunner::new();
    let (gateway, _) = spy_gateway(temp.path(), prompter.clone(), runner.clone());

    for bad in ["", "   ", "git 'unterminated"] {
        let outcome = gateway.execute(request(bad, &[])).await;
        assert!(matches!(outcome, GatewayOutcome::NotRun { .. }), "{bad:?}");
    }
    assert_eq!(prompter.calls(), 0);
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_arguments_are_never_interpreted_by_a_shell() {
    let temp = tempdir().unwrap();
    let canary = temp.path().join("canary");
    let (gateway, store) = real_gateway(
        temp.path(),
        ScriptedPrompter::new([]),
        Duration::from_secs(10),
    );
    store
        .put(CommandIdentity::from_program("echo"), ApprovalRecord::approved_now())
        .unwrap();

    let injected = format!("; touch {}", canary.display());
    let outcome = gateway
        .execute(ExecutionRequest {
            command: "echo".to_string(),
            args: vec![injected.clone(), "$(whoami)".to_string(), "a|b".to_string()],
            timeout: None,
        })
        .await;

    match outcome {
        GatewayOutcome::Executed { result, .. } => {
            assert_eq!(result.exit_code, Some(0));
            assert_eq!(result.stdout, format!("{injected} $(whoami) a|b\n"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!canary.exists());
}

#[tokio::test]
async fn test_failures_are_reported_not_raised() {
    let temp = tempdir().unwrap();
    let (gateway, store) = real_gateway(
        temp.path(),
        ScriptedPrompter::new([ApprovalChoice::AllowOnce]),
        Duration::from_secs(10),
    );
    store
        .put(CommandIdentity::from_program("sh"), ApprovalRecord::approved_now())
        .unwrap();

    match gateway.execute(request("sh", &["-c", "echo oops >&2; exit 3"])).await {
        GatewayOutcome::Executed { result, .. } => {
            assert_eq!(result.exit_code, Some(3));
            assert_eq!(result.stderr, "oops\n");
            assert!(!result.timed_out);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    match gateway
        .execute(request("definitely-not-a-real-program-xyz", &[]))
        .await
    {
        GatewayOutcome::Executed { result, .. } => {
            assert!(result.exit_code.is_none());
            let error = result.error.unwrap();
            assert!(error.contains("definitely-not-a-real-program-xyz"), "{error}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let entries = read_entries(&temp.path().join("audit.log")).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].outcome.as_ref().unwrap().exit_code, Some(3));
    assert!(entries[1].outcome.as_ref().unwrap().error.is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_kills_the_process() {
    let temp = tempdir().unwrap();
    let pid_file = temp.path().join("pid");
    let (gateway, store) = real_gateway(
        temp.path(),
        ScriptedPrompter::new([]),
        Duration::from_secs(300),
    );
    store
        .put(CommandIdentity::from_program("sh"), ApprovalRecord::approved_now())
        .unwrap();

    let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());
    let started = Instant::now();
    let outcome = gateway
        .execute(ExecutionRequest {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script],
            timeout: Some(Duration::from_secs(1)),
        })
        .await;
    let elapsed = started.elapsed();

    match outcome {
        GatewayOutcome::Executed {
            result, timeout, ..
        } => {
            assert!(result.timed_out);
            assert_eq!(timeout, Duration::from_secs(1));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    // SAFETY: signal 0 only checks for existence
    let alive = unsafe { libc::kill(pid, 0) } == 0;
    assert!(!alive, "process {pid} survived the timeout");
    assert!(gateway.running().is_empty());

    let entries = read_entries(&temp.path().join("audit.log")).unwrap();
    assert!(entries[0].outcome.as_ref().unwrap().timed_out);
}

/// State letter from `/proc/<pid>/stat`; `None` once the process is fully gone
#[cfg(target_os = "linux")]
fn proc_state(pid: i32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // The command name may contain spaces or parens, so parse after the last ')'
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_timeout_kills_background_descendants() {
    let temp = tempdir().unwrap();
    let pid_file = temp.path().join("grandchild.pid");
    let (gateway, store) = real_gateway(
        temp.path(),
        ScriptedPrompter::new([]),
        Duration::from_secs(300),
    );
    store
        .put(CommandIdentity::from_program("sh"), ApprovalRecord::approved_now())
        .unwrap();

    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let outcome = gateway
        .execute(ExecutionRequest {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script],
            timeout: Some(Duration::from_secs(1)),
        })
        .await;
    match outcome {
        GatewayOutcome::Executed { result, .. } => assert!(result.timed_out),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();

    // kill(pid, 0) succeeds on zombies, so check the scheduler state instead.
    // The orphan is reaped by init shortly after it dies.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut state = proc_state(pid);
    while matches!(state, Some(s) if s != 'Z' && s != 'X') && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
        state = proc_state(pid);
    }
    assert!(
        matches!(state, None | Some('Z') | Some('X')),
        "background sleep {pid} survived the timeout in state {state:?}"
    );
}

#[tokio::test]
async fn test_audit_disabled_gateway_still_runs() {
    let temp = tempdir().unwrap();
    let store = store_in(temp.path());
    store
        .put(CommandIdentity::from_program("true"), ApprovalRecord::approved_now())
        .unwrap();
    let gateway = execgate::engine::Gateway::new(
        store,
        ScriptedPrompter::new([]),
        std::sync::Arc::new(execgate::engine::CommandExecutor::new()),
        execgate::engine::audit::AuditSinkImpl::Null(execgate::engine::audit::NullSink),
        Duration::from_secs(10),
    );

    let outcome = gateway.execute(request("true", &[])).await;
    assert!(matches!(outcome, GatewayOutcome::Executed { .. }));
    assert!(!temp.path().join("audit.log").exists());
}

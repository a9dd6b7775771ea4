//! Deployment registry integration tests
//!
//! Drives the registry with real shell child processes.

use std::path::PathBuf;
use std::time::Duration;

use modelboard::deploy::launcher::LaunchSpec;
use modelboard::deploy::registry::{DeployRegistry, RegistryOptions};
use modelboard::errors::DashboardError;
use modelboard::models::deploy::{DeployBackend, DeployStatus, LogSource};

fn sh(script: &str) -> LaunchSpec {
    LaunchSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        cwd: PathBuf::from("."),
    }
}

fn registry() -> DeployRegistry {
    DeployRegistry::new(RegistryOptions {
        cleanup_grace: Duration::from_secs(30),
    })
}

async fn wait_terminal(registry: &DeployRegistry, deploy_id: &str) -> DeployStatus {
    for _ in 0..250 {
        match registry.status(deploy_id).await {
            Some(status) if status.is_terminal() => return status,
            Some(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            None => panic!("deployment disappeared before reaching terminal status"),
        }
    }
    panic!("deployment did not finish within 5s");
}

#[tokio::test]
async fn test_successful_deployment_logs_and_summary() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("printf 'one\\ntwo\\nthree\\n'"))
        .await
        .unwrap();

    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, DeployStatus::Completed);

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["one", "two", "three", "✅ Deployment completed successfully!"]
    );
    assert_eq!(registry.exit_code(&id).await, Some(0));
}

#[tokio::test]
async fn test_failed_deployment_summary_carries_exit_code() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("echo starting; exit 3"))
        .await
        .unwrap();

    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, DeployStatus::Failed);

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    let last = &lines.last().unwrap().text;
    assert_eq!(last, "❌ Deployment failed with exit code 3");
    assert_eq!(registry.exit_code(&id).await, Some(3));
}

#[tokio::test]
async fn test_stderr_lines_are_tagged() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("echo out; echo oops 1>&2"))
        .await
        .unwrap();

    wait_terminal(&registry, &id).await;

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    let stderr_line = lines
        .iter()
        .find(|l| l.source == LogSource::Stderr)
        .expect("no stderr line captured");
    assert_eq!(stderr_line.text, "[stderr] oops");
    assert!(lines
        .iter()
        .any(|l| l.source == LogSource::Stdout && l.text == "out"));
}

#[tokio::test]
async fn test_empty_lines_are_dropped() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("printf 'a\\n\\n\\nb\\n'"))
        .await
        .unwrap();

    wait_terminal(&registry, &id).await;

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts[..2], ["a", "b"]);
}

#[tokio::test]
async fn test_admission_rejects_second_deployment() {
    let registry = registry();
    let first = registry
        .create(DeployBackend::Cpu, sh("sleep 5"))
        .await
        .unwrap();

    let second = registry.create(DeployBackend::Gpu, sh("echo hi")).await;
    assert!(matches!(
        second,
        Err(DashboardError::DeploymentInProgress)
    ));

    // The rejected attempt must not have registered anything
    assert_eq!(registry.status(&first).await, Some(DeployStatus::Running));
    assert!(registry.remove(&first).await);
}

#[tokio::test]
async fn test_admission_reopens_after_terminal_status() {
    let registry = registry();
    let first = registry
        .create(DeployBackend::Cpu, sh("echo done"))
        .await
        .unwrap();
    wait_terminal(&registry, &first).await;

    // A finished entry still in its grace window does not block admission
    let second = registry.create(DeployBackend::Cpu, sh("echo again")).await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_tail_cursor_is_prefix_consistent() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("seq 1 20"))
        .await
        .unwrap();

    wait_terminal(&registry, &id).await;
    let (all, _) = registry.tail(&id, 0).await.unwrap();

    // Reading in chunks from any cursor yields the same suffix
    let (from_five, _) = registry.tail(&id, 5).await.unwrap();
    assert_eq!(from_five.len(), all.len() - 5);
    assert_eq!(from_five[0].text, all[5].text);

    // A cursor past the end yields nothing
    let (past_end, _) = registry.tail(&id, all.len() + 10).await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_stdin_relay_reaches_process() {
    let registry = registry();
    let id = registry
        .create(
            DeployBackend::Cpu,
            sh("read answer; echo \"got $answer\""),
        )
        .await
        .unwrap();

    registry.send_input(&id, "hello").await.unwrap();

    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, DeployStatus::Completed);

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    assert!(lines.iter().any(|l| l.text == "got hello"));
}

#[tokio::test]
async fn test_invalid_utf8_output_does_not_truncate_log() {
    let registry = registry();
    let id = registry
        .create(
            DeployBackend::Cpu,
            sh("printf 'before\\n'; printf '\\377\\376garbage\\n'; printf 'after\\n'"),
        )
        .await
        .unwrap();

    // A bad chunk must not kill the reader; the rest of the log and the
    // clean exit survive
    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, DeployStatus::Completed);

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[0], "before");
    assert!(texts[1].contains("garbage"));
    assert_eq!(texts[2], "after");
    assert_eq!(texts[3], "✅ Deployment completed successfully!");
    assert_eq!(registry.exit_code(&id).await, Some(0));
}

#[tokio::test]
async fn test_stdin_relay_repeated_sends() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("read a; read b; echo \"got $a $b\""))
        .await
        .unwrap();

    // The handle must come back after each write
    registry.send_input(&id, "first").await.unwrap();
    registry.send_input(&id, "second").await.unwrap();

    let status = wait_terminal(&registry, &id).await;
    assert_eq!(status, DeployStatus::Completed);

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    assert!(lines.iter().any(|l| l.text == "got first second"));
}

#[tokio::test]
async fn test_stdin_rejected_after_terminal_status() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("true"))
        .await
        .unwrap();
    wait_terminal(&registry, &id).await;

    let result = registry.send_input(&id, "y").await;
    assert!(matches!(result, Err(DashboardError::DeploymentNotRunning)));
}

#[tokio::test]
async fn test_stdin_rejected_for_unknown_deployment() {
    let registry = registry();
    let result = registry.send_input("no-such-id", "y").await;
    assert!(matches!(result, Err(DashboardError::DeploymentNotFound)));
}

#[tokio::test]
async fn test_spawn_failure_registers_failed_entry() {
    let registry = registry();
    let spec = LaunchSpec {
        program: "definitely-not-a-real-binary-4242".to_string(),
        args: vec![],
        cwd: PathBuf::from("."),
    };

    // Spawn failure is reported through the entry, not the create call
    let id = registry.create(DeployBackend::Cpu, spec).await.unwrap();
    assert_eq!(registry.status(&id).await, Some(DeployStatus::Failed));

    let (lines, _) = registry.tail(&id, 0).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].text.starts_with("[error] "));
}

#[tokio::test]
async fn test_cleanup_removes_entry_after_grace() {
    let registry = DeployRegistry::new(RegistryOptions {
        cleanup_grace: Duration::from_millis(100),
    });
    let id = registry
        .create(DeployBackend::Cpu, sh("echo done"))
        .await
        .unwrap();

    wait_terminal(&registry, &id).await;
    assert!(registry.status(&id).await.is_some());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(registry.status(&id).await.is_none());

    // Removal is idempotent
    assert!(!registry.remove(&id).await);
}

#[tokio::test]
async fn test_backend_recorded() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Gpu, sh("true"))
        .await
        .unwrap();
    assert_eq!(registry.backend(&id).await, Some(DeployBackend::Gpu));
}

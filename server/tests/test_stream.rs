//! Deployment event stream integration tests

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use modelboard::deploy::registry::{DeployRegistry, RegistryOptions};
use modelboard::deploy::stream;
use modelboard::models::deploy::{DeployBackend, DeployEvent, DeployEventKind};

fn sh(script: &str) -> modelboard::deploy::launcher::LaunchSpec {
    modelboard::deploy::launcher::LaunchSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        cwd: PathBuf::from("."),
    }
}

fn registry() -> Arc<DeployRegistry> {
    Arc::new(DeployRegistry::new(RegistryOptions {
        cleanup_grace: Duration::from_secs(30),
    }))
}

async fn collect_events(registry: Arc<DeployRegistry>, deploy_id: String) -> Vec<DeployEvent> {
    let events = stream::subscribe(registry, deploy_id)
        .await
        .expect("deployment should be streamable");
    tokio::time::timeout(Duration::from_secs(5), events.collect::<Vec<_>>())
        .await
        .expect("stream did not close within 5s")
}

#[tokio::test]
async fn test_stream_full_event_sequence() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("printf 'alpha\\nbeta\\n'"))
        .await
        .unwrap();

    let events = collect_events(registry, id).await;

    // Connected status first, complete last
    assert_eq!(events[0].kind, DeployEventKind::Status);
    assert_eq!(events[0].data, "connected");
    assert!(events[0].timestamp.is_none());

    let last = events.last().unwrap();
    assert_eq!(last.kind, DeployEventKind::Complete);
    assert_eq!(last.data, "completed");
    assert!(last.timestamp.is_some());

    // Log lines arrive in append order, ending with the summary line
    let outputs: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == DeployEventKind::Output)
        .map(|e| e.data.as_str())
        .collect();
    assert_eq!(
        outputs,
        vec!["alpha", "beta", "✅ Deployment completed successfully!"]
    );
}

#[tokio::test]
async fn test_stream_failure_reports_failed() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("exit 7"))
        .await
        .unwrap();

    let events = collect_events(registry, id).await;
    let last = events.last().unwrap();
    assert_eq!(last.kind, DeployEventKind::Complete);
    assert_eq!(last.data, "failed");
}

#[tokio::test]
async fn test_stream_stderr_maps_to_error_events() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("echo fine; echo broken 1>&2"))
        .await
        .unwrap();

    let events = collect_events(registry, id).await;
    let error_events: Vec<&DeployEvent> = events
        .iter()
        .filter(|e| e.kind == DeployEventKind::Error)
        .collect();
    assert_eq!(error_events.len(), 1);
    assert_eq!(error_events[0].data, "[stderr] broken");
}

#[tokio::test]
async fn test_stream_unknown_id_rejected_before_streaming() {
    let registry = registry();
    assert!(stream::subscribe(registry, "missing".to_string())
        .await
        .is_none());
}

#[tokio::test]
async fn test_stream_spawn_failure_emits_error_then_complete() {
    let registry = registry();
    let spec = modelboard::deploy::launcher::LaunchSpec {
        program: "definitely-not-a-real-binary-4242".to_string(),
        args: vec![],
        cwd: PathBuf::from("."),
    };
    let id = registry.create(DeployBackend::Cpu, spec).await.unwrap();

    let events = collect_events(registry, id).await;
    assert!(events
        .iter()
        .any(|e| e.kind == DeployEventKind::Error && e.data.starts_with("[error] ")));
    assert_eq!(events.last().unwrap().data, "failed");
}

#[tokio::test]
async fn test_independent_subscribers_see_same_sequence() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("seq 1 5"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        collect_events(registry.clone(), id.clone()),
        collect_events(registry.clone(), id.clone()),
    );

    let texts = |events: &[DeployEvent]| -> Vec<String> {
        events.iter().map(|e| e.data.clone()).collect()
    };
    assert_eq!(texts(&a), texts(&b));
    assert_eq!(a.last().unwrap().data, "completed");
}

#[tokio::test]
async fn test_late_subscriber_still_gets_full_log() {
    let registry = registry();
    let id = registry
        .create(DeployBackend::Cpu, sh("printf 'early\\n'"))
        .await
        .unwrap();

    // Subscribe only after the deployment already finished
    for _ in 0..250 {
        if registry
            .status(&id)
            .await
            .map(|s| s.is_terminal())
            .unwrap_or(false)
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let events = collect_events(registry, id).await;
    assert!(events.iter().any(|e| e.data == "early"));
    assert_eq!(events.last().unwrap().data, "completed");
}

//! Deployment registry
//!
//! Single source of truth for active and recently finished deployments.
//! Owns admission control (at most one running deployment), the per-entry
//! append-only log, status transitions, stdin access, and delayed cleanup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::ChildStdin;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::deploy::launcher::{self, LaunchSpec};
use crate::errors::DashboardError;
use crate::models::deploy::{DeployBackend, DeployStatus, LogLine, LogSource};
use crate::utils::generate_uuid;

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// How long a finished deployment stays queryable before removal
    pub cleanup_grace: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            cleanup_grace: Duration::from_secs(60),
        }
    }
}

struct DeploymentEntry {
    backend: DeployBackend,
    status: DeployStatus,
    lines: Vec<LogLine>,
    stdin: Option<ChildStdin>,
    exit_code: Option<i32>,
    // Revision counter bumped on every append and on the terminal
    // transition; subscribers wake on it instead of polling.
    notify: watch::Sender<u64>,
}

impl DeploymentEntry {
    fn new(backend: DeployBackend) -> Self {
        let (notify, _) = watch::channel(0u64);
        Self {
            backend,
            status: DeployStatus::Running,
            lines: Vec::new(),
            stdin: None,
            exit_code: None,
            notify,
        }
    }

    fn push_line(&mut self, line: LogLine) {
        self.lines.push(line);
        self.notify.send_modify(|rev| *rev += 1);
    }
}

type Entries = Arc<Mutex<HashMap<String, DeploymentEntry>>>;

/// In-memory deployment registry
pub struct DeployRegistry {
    entries: Entries,
    cleanup_grace: Duration,
}

impl DeployRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            cleanup_grace: options.cleanup_grace,
        }
    }

    /// Create a new deployment from a launch spec.
    ///
    /// The admission check and the entry insertion happen under one lock
    /// acquisition, so two concurrent calls can never both be admitted.
    /// A spawn failure still yields a registered (failed) deployment so the
    /// caller can stream the error line; it is not surfaced as an error here.
    pub async fn create(
        &self,
        backend: DeployBackend,
        spec: LaunchSpec,
    ) -> Result<String, DashboardError> {
        let mut entries = self.entries.lock().await;
        if entries.values().any(|e| e.status == DeployStatus::Running) {
            return Err(DashboardError::DeploymentInProgress);
        }

        let deploy_id = generate_uuid();
        let mut entry = DeploymentEntry::new(backend);

        match launcher::spawn(&spec) {
            Ok(mut child) => {
                entry.stdin = child.stdin.take();
                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                entries.insert(deploy_id.clone(), entry);
                drop(entries);

                info!(
                    "Deployment {} started: {} {}",
                    deploy_id,
                    spec.program,
                    spec.args.join(" ")
                );

                let mut readers: Vec<JoinHandle<()>> = Vec::new();
                if let Some(out) = stdout {
                    readers.push(tokio::spawn(pump_lines(
                        self.entries.clone(),
                        deploy_id.clone(),
                        out,
                        LogSource::Stdout,
                    )));
                }
                if let Some(err) = stderr {
                    readers.push(tokio::spawn(pump_lines(
                        self.entries.clone(),
                        deploy_id.clone(),
                        err,
                        LogSource::Stderr,
                    )));
                }

                tokio::spawn(await_exit(
                    self.entries.clone(),
                    deploy_id.clone(),
                    child,
                    readers,
                    self.cleanup_grace,
                ));
            }
            Err(e) => {
                error!("Deployment {} failed to spawn: {}", deploy_id, e);
                entry.status = DeployStatus::Failed;
                entry.push_line(LogLine {
                    text: format!("[error] {}", e),
                    source: LogSource::System,
                });
                entries.insert(deploy_id.clone(), entry);
                drop(entries);

                tokio::spawn(cleanup_later(
                    self.entries.clone(),
                    deploy_id.clone(),
                    self.cleanup_grace,
                ));
            }
        }

        Ok(deploy_id)
    }

    /// Current status, or `None` if unknown (never created or cleaned up)
    pub async fn status(&self, deploy_id: &str) -> Option<DeployStatus> {
        let entries = self.entries.lock().await;
        entries.get(deploy_id).map(|e| e.status)
    }

    /// Backend of a registered deployment
    pub async fn backend(&self, deploy_id: &str) -> Option<DeployBackend> {
        let entries = self.entries.lock().await;
        entries.get(deploy_id).map(|e| e.backend)
    }

    /// Exit code of a finished deployment, when the process reported one
    pub async fn exit_code(&self, deploy_id: &str) -> Option<i32> {
        let entries = self.entries.lock().await;
        entries.get(deploy_id).and_then(|e| e.exit_code)
    }

    /// Log lines appended after `cursor`, plus the current status.
    ///
    /// Returns `None` if the deployment is unknown. Never blocks on
    /// process I/O.
    pub async fn tail(
        &self,
        deploy_id: &str,
        cursor: usize,
    ) -> Option<(Vec<LogLine>, DeployStatus)> {
        let entries = self.entries.lock().await;
        let entry = entries.get(deploy_id)?;
        let lines = if cursor < entry.lines.len() {
            entry.lines[cursor..].to_vec()
        } else {
            Vec::new()
        };
        Some((lines, entry.status))
    }

    /// Subscribe to change notifications for a deployment.
    ///
    /// The receiver resolves with an error once the entry is removed,
    /// which lets subscribers distinguish cleanup from quiescence.
    pub async fn subscribe(&self, deploy_id: &str) -> Option<watch::Receiver<u64>> {
        let entries = self.entries.lock().await;
        entries.get(deploy_id).map(|e| e.notify.subscribe())
    }

    /// Relay one line of input to a running deployment's stdin.
    ///
    /// Writes `input` plus a newline exactly once, with no queuing. The
    /// handle is taken out of the entry for the duration of the write so a
    /// child that never drains its pipe cannot stall the registry lock.
    pub async fn send_input(&self, deploy_id: &str, input: &str) -> Result<(), DashboardError> {
        let mut stdin = {
            let mut entries = self.entries.lock().await;
            let entry = entries
                .get_mut(deploy_id)
                .ok_or(DashboardError::DeploymentNotFound)?;

            if entry.status != DeployStatus::Running {
                return Err(DashboardError::DeploymentNotRunning);
            }

            entry
                .stdin
                .take()
                .ok_or(DashboardError::StdinUnavailable)?
        };

        let payload = format!("{}\n", input);
        let write_ok =
            stdin.write_all(payload.as_bytes()).await.is_ok() && stdin.flush().await.is_ok();

        if !write_ok {
            // The pipe is gone; the handle stays dropped so later calls
            // fail fast
            return Err(DashboardError::StdinUnavailable);
        }

        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(deploy_id) {
            if entry.status == DeployStatus::Running {
                entry.stdin = Some(stdin);
            }
        }

        debug!("Relayed {} bytes to deployment {}", payload.len(), deploy_id);
        Ok(())
    }

    /// Remove a deployment entry. Idempotent.
    pub async fn remove(&self, deploy_id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(deploy_id).is_some();
        if removed {
            debug!("Deployment {} removed from registry", deploy_id);
        }
        removed
    }
}

/// Read one output stream line by line into the deployment's log.
///
/// Empty lines are dropped; stderr lines carry a display prefix. Reads raw
/// bytes so invalid UTF-8 degrades to replacement characters instead of
/// closing the pipe mid-run.
async fn pump_lines<R>(entries: Entries, deploy_id: String, reader: R, source: LogSource)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Deployment {} {:?} reader closed: {}", deploy_id, source, e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        let text = match source {
            LogSource::Stderr => format!("[stderr] {}", line),
            _ => line.to_string(),
        };
        let mut entries = entries.lock().await;
        if let Some(entry) = entries.get_mut(&deploy_id) {
            entry.push_line(LogLine { text, source });
        }
    }
}

/// Wait for process exit, then transition status and append the summary
/// line. Readers are drained first so the summary is always the last line.
async fn await_exit(
    entries: Entries,
    deploy_id: String,
    mut child: tokio::process::Child,
    readers: Vec<JoinHandle<()>>,
    cleanup_grace: Duration,
) {
    let exit = child.wait().await;
    for reader in readers {
        let _ = reader.await;
    }

    let (success, code) = match exit {
        Ok(status) => (status.success(), status.code()),
        Err(e) => {
            error!("Failed to await deployment {}: {}", deploy_id, e);
            (false, None)
        }
    };

    {
        let mut entries = entries.lock().await;
        if let Some(entry) = entries.get_mut(&deploy_id) {
            if entry.status == DeployStatus::Running {
                entry.status = if success {
                    DeployStatus::Completed
                } else {
                    DeployStatus::Failed
                };
                entry.exit_code = code;
                entry.stdin = None;
                let text = if success {
                    "✅ Deployment completed successfully!".to_string()
                } else {
                    let code = code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string());
                    format!("❌ Deployment failed with exit code {}", code)
                };
                entry.push_line(LogLine {
                    text,
                    source: LogSource::System,
                });
                info!(
                    "Deployment {} finished: {}",
                    deploy_id,
                    entry.status.as_str()
                );
            }
        }
    }

    cleanup_later(entries, deploy_id, cleanup_grace).await;
}

async fn cleanup_later(entries: Entries, deploy_id: String, cleanup_grace: Duration) {
    tokio::time::sleep(cleanup_grace).await;
    let mut entries = entries.lock().await;
    if entries.remove(&deploy_id).is_some() {
        debug!("Deployment {} cleaned up", deploy_id);
    }
}

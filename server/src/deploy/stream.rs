//! Live deployment event streaming
//!
//! Turns a registry entry into an ordered stream of events: an initial
//! connected status, one event per log line, and a final complete event.
//! Each subscriber keeps its own cursor and wakes on the registry's change
//! notification rather than a poll timer.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;

use crate::deploy::registry::DeployRegistry;
use crate::models::deploy::{DeployEvent, DeployEventKind, LogLine};
use crate::utils::epoch_millis;

/// Subscribe to a deployment's event stream.
///
/// Returns `None` when the deployment id is unknown, so callers can reject
/// before any stream output is produced.
pub async fn subscribe(
    registry: Arc<DeployRegistry>,
    deploy_id: String,
) -> Option<impl Stream<Item = DeployEvent>> {
    let notify = registry.subscribe(&deploy_id).await?;
    Some(event_stream(registry, deploy_id, notify))
}

struct StreamState {
    registry: Arc<DeployRegistry>,
    deploy_id: String,
    notify: watch::Receiver<u64>,
    cursor: usize,
    queue: VecDeque<DeployEvent>,
    connected: bool,
    finished: bool,
}

fn line_event(line: LogLine) -> DeployEvent {
    // Error styling follows the display prefix, like the terminal view does
    let kind = if line.text.starts_with("[stderr]") || line.text.starts_with("[error]") {
        DeployEventKind::Error
    } else {
        DeployEventKind::Output
    };
    DeployEvent::line(kind, line.text, epoch_millis())
}

fn event_stream(
    registry: Arc<DeployRegistry>,
    deploy_id: String,
    notify: watch::Receiver<u64>,
) -> impl Stream<Item = DeployEvent> {
    let state = StreamState {
        registry,
        deploy_id,
        notify,
        cursor: 0,
        queue: VecDeque::new(),
        connected: false,
        finished: false,
    };

    stream::unfold(state, |mut s| async move {
        if !s.connected {
            s.connected = true;
            return Some((DeployEvent::status("connected"), s));
        }

        loop {
            if let Some(event) = s.queue.pop_front() {
                return Some((event, s));
            }
            if s.finished {
                return None;
            }

            // Entry vanished mid-stream: close without error
            let (lines, status) = s.registry.tail(&s.deploy_id, s.cursor).await?;

            let had_lines = !lines.is_empty();
            s.cursor += lines.len();
            for line in lines {
                s.queue.push_back(line_event(line));
            }

            if status.is_terminal() {
                s.queue.push_back(DeployEvent::complete(status, epoch_millis()));
                s.finished = true;
                continue;
            }
            if had_lines {
                continue;
            }

            // Nothing new; wait for the next append or the terminal
            // transition. An error means the entry was removed.
            if s.notify.changed().await.is_err() {
                return None;
            }
        }
    })
}

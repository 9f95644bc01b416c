//! Debounced change notifications to full rescans.
//!
//! Every notification restarts the quiet window; when it elapses one rescan
//! request is sent to the owner, tagged with the generation of the
//! subscription that produced it. Stopping (or restarting for another vault)
//! bumps the generation so nothing queued for the old vault is applied.

use crate::kernel::services::ports::{ChangeEvent, ChangeStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescanRequest {
    pub generation: u64,
    pub vault_path: PathBuf,
    /// Notifications coalesced into this request.
    pub events: usize,
}

pub struct WatchReconciler {
    debounce: Duration,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
    vault_path: Option<PathBuf>,
    requests_tx: mpsc::UnboundedSender<RescanRequest>,
    requests_rx: mpsc::UnboundedReceiver<RescanRequest>,
}

impl WatchReconciler {
    pub fn new(debounce: Duration) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        Self {
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
            vault_path: None,
            requests_tx,
            requests_rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn vault_path(&self) -> Option<&Path> {
        self.vault_path.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts debouncing `stream` for `vault_path`, stopping any previous
    /// subscription first. Must be called inside a tokio runtime.
    pub fn start(&mut self, vault_path: &Path, stream: ChangeStream) {
        self.stop();
        let generation = self.generation();
        let task = tokio::spawn(debounce_loop(
            stream,
            self.debounce,
            Arc::clone(&self.generation),
            generation,
            vault_path.to_path_buf(),
            self.requests_tx.clone(),
        ));
        self.task = Some(task);
        self.vault_path = Some(vault_path.to_path_buf());
        tracing::debug!(vault = %vault_path.display(), generation, "reconciler started");
    }

    /// Cancels the subscription: pending timers die with the task and any
    /// request already queued becomes stale.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.vault_path = None;
    }

    pub fn is_current(&self, request: &RescanRequest) -> bool {
        request.generation == self.generation()
    }

    /// Drains queued requests without waiting and returns the newest current
    /// one. Several requests collapse into one rescan.
    pub fn try_next(&mut self) -> Option<RescanRequest> {
        let mut latest = None;
        while let Ok(request) = self.requests_rx.try_recv() {
            if self.is_current(&request) {
                latest = Some(request);
            } else {
                tracing::debug!(generation = request.generation, "stale rescan request dropped");
            }
        }
        latest
    }

    /// Waits for the next current request. Never resolves while stopped.
    pub async fn next(&mut self) -> RescanRequest {
        loop {
            // the sender half lives in `self`, so the channel never closes
            let Some(request) = self.requests_rx.recv().await else {
                std::future::pending::<()>().await;
                continue;
            };
            if self.is_current(&request) {
                return request;
            }
            tracing::debug!(generation = request.generation, "stale rescan request dropped");
        }
    }
}

impl Drop for WatchReconciler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn debounce_loop(
    mut stream: ChangeStream,
    debounce: Duration,
    current: Arc<AtomicU64>,
    generation: u64,
    vault_path: PathBuf,
    requests: mpsc::UnboundedSender<RescanRequest>,
) {
    let mut deadline: Option<Instant> = None;
    let mut pending = 0usize;

    loop {
        tokio::select! {
            event = stream.recv() => {
                let Some(ChangeEvent { kind, path }) = event else {
                    break;
                };
                tracing::trace!(?kind, path = %path.display(), "change notification");
                pending += 1;
                deadline = Some(Instant::now() + debounce);
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }
                let request = RescanRequest {
                    generation,
                    vault_path: vault_path.clone(),
                    events: std::mem::take(&mut pending),
                };
                if requests.send(request).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/watch.rs"]
mod tests;

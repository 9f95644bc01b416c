use crate::kernel::services::adapters::file::local::should_ignore;
use crate::kernel::services::ports::{
    BackendError, BackendResult, BoxFuture, ChangeEvent, ChangeKind, ChangeStream, ChangeWatcher,
};
use notify::event::ModifyKind;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

const WATCHER_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Default)]
struct Subscribers {
    senders: Mutex<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<ChangeEvent>>> {
        self.senders.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn add(&self) -> ChangeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Sends `event` to every live subscriber, dropping the ones whose
    /// receiver is gone.
    fn broadcast(&self, event: &ChangeEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

struct ActiveWatch {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

/// `ChangeWatcher` backed by the platform's recommended `notify` watcher.
/// One vault folder is watched at a time.
#[derive(Default)]
pub struct NotifyWatcher {
    subscribers: Arc<Subscribers>,
    active: Mutex<Option<ActiveWatch>>,
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watched_root(&self) -> Option<PathBuf> {
        self.lock_active().as_ref().map(|w| w.root.clone())
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveWatch>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn watch(&self, root: &Path) -> BackendResult<()> {
        let subscribers = Arc::clone(&self.subscribers);
        let event_root = root.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in normalize_notify_event(event, &event_root) {
                        tracing::debug!(kind = ?change.kind, path = %change.path.display(), "fs change");
                        subscribers.broadcast(&change);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "watcher error"),
            },
            Config::default().with_poll_interval(WATCHER_POLL_INTERVAL),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        // dropping the previous watcher unregisters it
        *self.lock_active() = Some(ActiveWatch {
            _watcher: watcher,
            root: root.to_path_buf(),
        });
        tracing::info!(root = %root.display(), "watching vault");
        Ok(())
    }
}

impl ChangeWatcher for NotifyWatcher {
    fn start_watching<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            if !path.is_dir() {
                return Err(BackendError::new(format!(
                    "Not a directory: {}",
                    path.display()
                )));
            }
            self.watch(path)
        })
    }

    fn stop_watching(&self) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            if let Some(active) = self.lock_active().take() {
                tracing::info!(root = %active.root.display(), "stopped watching vault");
            }
            Ok(())
        })
    }

    fn subscribe(&self) -> ChangeStream {
        self.subscribers.add()
    }
}

fn contains_ignored_component(path: &Path, root: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| {
        if let Component::Normal(name) = component {
            should_ignore(&name.to_string_lossy())
        } else {
            false
        }
    })
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Remove(_) => Some(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
        EventKind::Modify(_) => Some(ChangeKind::Modify),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

fn normalize_notify_event(event: notify::Event, root: &Path) -> Vec<ChangeEvent> {
    let Some(kind) = change_kind(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .into_iter()
        .filter(|path| !contains_ignored_component(path, root))
        .map(|path| ChangeEvent::new(kind, path))
        .collect()
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/file_watcher.rs"]
mod tests;

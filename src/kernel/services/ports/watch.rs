//! Filesystem change notification capability.

use super::error::BackendResult;
use super::runtime::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Delete,
    Rename,
    Modify,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Receiving half of a subscription. Dropping it unsubscribes.
pub type ChangeStream = mpsc::UnboundedReceiver<ChangeEvent>;

pub trait ChangeWatcher: Send + Sync {
    /// Starts watching `path` recursively, replacing any previous watch.
    fn start_watching<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<()>>;

    fn stop_watching(&self) -> BoxFuture<'_, BackendResult<()>>;

    fn subscribe(&self) -> ChangeStream;
}

//! Open tabs of the active vault.
//!
//! The registry is bounded by `max_tabs` with least-recently-opened eviction,
//! keeps an active pointer, and persists itself per vault after a quiet
//! period. Tab activation and file selection drive each other; `TabSync`
//! breaks that loop.

use crate::kernel::error::{BackendResultExt, Result, WorkspaceError};
use crate::kernel::services::ports::settings::DEFAULT_MAX_TABS;
use crate::kernel::services::ports::{Clock, KvStore, StoreName, WorkspaceConfig};
use crate::models::tab::eviction_candidates;
use crate::models::{Node, NodeId, Tab, VaultId, VaultTabs};
use rustc_hash::FxHashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TabSync {
    #[default]
    Idle,
    /// A tab activation is pushing its file into the tree; selection
    /// notifications are ignored until `until`.
    Syncing { tab_id: NodeId, until: Instant },
}

pub struct TabRegistry {
    clock: Arc<dyn Clock>,
    store: Arc<dyn KvStore>,
    persist_debounce: Duration,
    sync_settle: Duration,
    vault_id: Option<VaultId>,
    tabs: Vec<Tab>,
    active: Option<NodeId>,
    max_tabs: usize,
    last_stamp: u64,
    sync: TabSync,
    persist_deadline: Option<Instant>,
    error: Option<WorkspaceError>,
}

impl TabRegistry {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn KvStore>, config: &WorkspaceConfig) -> Self {
        Self {
            clock,
            store,
            persist_debounce: config.tab_persist_debounce,
            sync_settle: config.tab_sync_settle,
            vault_id: None,
            tabs: Vec::new(),
            active: None,
            max_tabs: DEFAULT_MAX_TABS,
            last_stamp: 0,
            sync: TabSync::Idle,
            persist_deadline: None,
            error: None,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Tab> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    pub fn active_tab_id(&self) -> Option<&NodeId> {
        self.active.as_ref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    pub fn vault_id(&self) -> Option<&VaultId> {
        self.vault_id.as_ref()
    }

    pub fn sync_state(&self) -> &TabSync {
        &self.sync
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self.sync, TabSync::Syncing { .. })
    }

    pub fn error(&self) -> Option<&WorkspaceError> {
        self.error.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.persist_deadline.is_some()
    }

    /// Next `openedAt` value: wall clock, but strictly after every stamp
    /// issued before.
    fn stamp(&mut self) -> u64 {
        let stamp = self.clock.now_millis().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        stamp
    }

    fn touch(&mut self, id: &NodeId) {
        let stamp = self.stamp();
        if let Some(tab) = self.tabs.iter_mut().find(|t| &t.id == id) {
            tab.opened_at = stamp;
        }
    }

    fn mark_dirty(&mut self) {
        if self.vault_id.is_some() {
            self.persist_deadline = Some(Instant::now() + self.persist_debounce);
        }
    }

    /// Drops the oldest tabs until the bound holds; `protect` survives.
    fn enforce_bound(&mut self, protect: Option<&NodeId>) {
        let evicted = eviction_candidates(&self.tabs, self.max_tabs, protect);
        if evicted.is_empty() {
            return;
        }
        tracing::debug!(count = evicted.len(), "evicting tabs");
        self.tabs.retain(|t| !evicted.contains(&t.id));
        if self.active.as_ref().is_some_and(|id| evicted.contains(id)) {
            self.active = None;
        }
    }

    fn most_recent(&self) -> Option<NodeId> {
        self.tabs
            .iter()
            .max_by_key(|t| t.opened_at)
            .map(|t| t.id.clone())
    }

    /// Opens `node` as a tab, or re-activates its existing tab. Folders are
    /// ignored.
    pub fn open(&mut self, node: &Node) {
        if !node.is_file() {
            return;
        }

        if self.get(&node.id).is_some() {
            self.touch(&node.id);
        } else {
            let stamp = self.stamp();
            self.tabs.push(Tab::from_node(node, stamp));
            self.enforce_bound(Some(&node.id));
        }
        self.active = Some(node.id.clone());
        self.mark_dirty();
    }

    pub fn close(&mut self, id: &NodeId) -> Result<()> {
        let Some(pos) = self.tabs.iter().position(|t| &t.id == id) else {
            return Err(WorkspaceError::not_found("tab", id));
        };
        self.tabs.remove(pos);
        if self.active.as_ref() == Some(id) {
            self.active = self.most_recent();
        }
        self.mark_dirty();
        Ok(())
    }

    /// Makes `id` the active tab and returns the file to select. Unknown ids
    /// are ignored.
    pub fn activate(&mut self, id: &NodeId) -> Option<Node> {
        self.get(id)?;
        self.touch(id);
        self.active = Some(id.clone());
        self.sync = TabSync::Syncing {
            tab_id: id.clone(),
            until: Instant::now() + self.sync_settle,
        };
        self.mark_dirty();
        self.get(id).map(Tab::to_node)
    }

    pub fn close_all(&mut self) {
        self.tabs.clear();
        self.active = None;
        self.mark_dirty();
    }

    /// Selection changed in the file tree. Ignored while a tab activation is
    /// being synced back into the tree.
    pub fn on_selection_changed(&mut self, node: &Node) {
        if self.is_syncing() {
            return;
        }
        self.open(node);
    }

    /// Ends the `Syncing` state once its settle period is over.
    pub fn settle(&mut self, now: Instant) {
        if let TabSync::Syncing { until, .. } = &self.sync {
            if now >= *until {
                self.sync = TabSync::Idle;
            }
        }
    }

    pub fn set_max_tabs(&mut self, max_tabs: usize) {
        let max_tabs = max_tabs.max(1);
        if max_tabs == self.max_tabs {
            return;
        }
        self.max_tabs = max_tabs;
        let active = self.active.clone();
        let before = self.tabs.len();
        self.enforce_bound(active.as_ref());
        if self.tabs.len() != before {
            self.mark_dirty();
        }
    }

    /// Closes every tab at or below `path`; returns the closed ids.
    pub fn remove_under(&mut self, path: &Path) -> Vec<NodeId> {
        let removed: Vec<NodeId> = self
            .tabs
            .iter()
            .filter(|t| t.path.starts_with(path))
            .map(|t| t.id.clone())
            .collect();
        if removed.is_empty() {
            return removed;
        }

        self.tabs.retain(|t| !t.path.starts_with(path));
        if self.active.as_ref().is_some_and(|id| removed.contains(id)) {
            self.active = self.most_recent();
        }
        self.mark_dirty();
        removed
    }

    /// Follows a rename: the tab for `old_path` now points at `node`, tabs
    /// nested under a renamed folder are closed.
    pub fn retarget(&mut self, old_path: &Path, node: &Node) {
        let mut changed = false;
        let mut seen = FxHashSet::default();
        let mut kept = Vec::with_capacity(self.tabs.len());

        for mut tab in std::mem::take(&mut self.tabs) {
            if tab.path == old_path && node.is_file() {
                if self.active.as_ref() == Some(&tab.id) {
                    self.active = Some(node.id.clone());
                }
                tab.id = node.id.clone();
                tab.name = node.name.clone();
                tab.path = node.path.clone();
                changed = true;
            } else if tab.path.starts_with(old_path) {
                if self.active.as_ref() == Some(&tab.id) {
                    self.active = None;
                }
                changed = true;
                continue;
            }
            if seen.insert(tab.id.clone()) {
                kept.push(tab);
            }
        }
        self.tabs = kept;

        if changed {
            if self.active.is_none() {
                self.active = self.most_recent();
            }
            self.mark_dirty();
        }
    }

    /// Earliest moment `settle` or `flush_if_due` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let sync = match &self.sync {
            TabSync::Syncing { until, .. } => Some(*until),
            TabSync::Idle => None,
        };
        match (sync, self.persist_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Saves the current vault's tabs now, whether or not a save is pending.
    pub async fn flush(&mut self) -> Result<()> {
        self.persist_deadline = None;
        let Some(vault_id) = self.vault_id.clone() else {
            return Ok(());
        };

        let record = VaultTabs {
            vault_id: vault_id.clone(),
            tabs: self.tabs.clone(),
            active_tab_id: self.active.clone(),
        };
        let result = async {
            let value = serde_json::to_value(&record)
                .map_err(|e| WorkspaceError::io("save_tabs", e.into()))?;
            self.store
                .save(StoreName::Tabs, vault_id.as_str(), value)
                .await
                .op("save_tabs")
        }
        .await;

        match result {
            Ok(()) => {
                tracing::debug!(vault = %vault_id, tabs = self.tabs.len(), "tabs saved");
                Ok(())
            }
            Err(e) => {
                // in-memory tabs stay as they are
                tracing::warn!(vault = %vault_id, error = %e, "failed to save tabs");
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub async fn flush_if_due(&mut self, now: Instant) -> Result<()> {
        match self.persist_deadline {
            Some(deadline) if now >= deadline => self.flush().await,
            _ => Ok(()),
        }
    }

    /// Saves the previous vault's tabs, then loads `vault_id`'s. With `None`
    /// the registry is left empty. Pending changes are saved even when the
    /// same vault is reloaded.
    pub async fn switch_vault(&mut self, vault_id: Option<VaultId>) -> Result<()> {
        if self.vault_id.is_some() && (self.vault_id != vault_id || self.is_dirty()) {
            // a failed save is recorded; the switch goes on
            let _ = self.flush().await;
        }

        self.vault_id = None;
        self.tabs.clear();
        self.active = None;
        self.sync = TabSync::Idle;
        self.persist_deadline = None;

        let Some(vault_id) = vault_id else {
            return Ok(());
        };
        self.vault_id = Some(vault_id.clone());
        self.load(&vault_id).await
    }

    async fn load(&mut self, vault_id: &VaultId) -> Result<()> {
        let loaded = self
            .store
            .load(StoreName::Tabs, vault_id.as_str())
            .await
            .and_then(|value| match value {
                Some(value) => Ok(Some(serde_json::from_value::<VaultTabs>(value)?)),
                None => Ok(None),
            })
            .op("load_tabs");

        let record = match loaded {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!(vault = %vault_id, error = %e, "failed to load tabs");
                self.error = Some(e.clone());
                return Err(e);
            }
        };

        let mut seen = FxHashSet::default();
        self.tabs = record
            .tabs
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        self.active = record.active_tab_id.filter(|id| seen.contains(id));
        self.last_stamp = self
            .tabs
            .iter()
            .map(|t| t.opened_at)
            .max()
            .unwrap_or(0)
            .max(self.last_stamp);
        let active = self.active.clone();
        self.enforce_bound(active.as_ref());
        tracing::info!(vault = %vault_id, tabs = self.tabs.len(), "tabs loaded");
        Ok(())
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/tabs.rs"]
mod tests;

//! The workspace context: owns every component and the port handles, and is
//! the only write surface the UI talks to.
//!
//! All entry points take `&mut self`, so mutations are serialized by
//! construction. Time-driven work (watch rescans, tab sync settling, tab
//! persistence) is applied by `tick`, which the host calls whenever
//! `next_wake` passes or a rescan request arrives; `run_until` does both.

use crate::kernel::error::{Result, WorkspaceError};
use crate::kernel::file_tree::FileTreeController;
use crate::kernel::services::ports::{
    ChangeWatcher, Clock, FolderPicker, KvStore, Settings, VaultFs, WorkspaceConfig,
};
use crate::kernel::settings::SettingsService;
use crate::kernel::tabs::TabRegistry;
use crate::kernel::templates::TemplateRegistry;
use crate::kernel::vaults::VaultRegistry;
use crate::kernel::watch::{RescanRequest, WatchReconciler};
use crate::models::{Node, NodeId, Tab, Vault, VaultId};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;

/// Handles to the external capabilities.
#[derive(Clone)]
pub struct WorkspacePorts {
    pub fs: Arc<dyn VaultFs>,
    pub watcher: Arc<dyn ChangeWatcher>,
    pub picker: Arc<dyn FolderPicker>,
    pub store: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
}

/// Read-only view of the whole workspace for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub vaults: Vec<Vault>,
    pub current_vault: Option<Vault>,
    pub file_tree: Vec<Node>,
    pub selected_file: Option<Node>,
    pub file_content: Option<String>,
    pub expanded_folder_ids: Vec<NodeId>,
    pub renaming_node_id: Option<NodeId>,
    pub tabs: Vec<Tab>,
    pub active_tab_id: Option<NodeId>,
    pub settings: Settings,
    pub is_loading: bool,
    pub errors: Vec<String>,
}

pub struct Workspace {
    ports: WorkspacePorts,
    vaults: VaultRegistry,
    tree: FileTreeController,
    tabs: TabRegistry,
    reconciler: WatchReconciler,
    settings: SettingsService,
    templates: TemplateRegistry,
    active_vault: Option<VaultId>,
}

impl Workspace {
    pub fn new(ports: WorkspacePorts, config: WorkspaceConfig) -> Self {
        Self {
            vaults: VaultRegistry::new(ports.store.clone(), ports.picker.clone()),
            tree: FileTreeController::new(ports.fs.clone()),
            tabs: TabRegistry::new(ports.clock.clone(), ports.store.clone(), &config),
            reconciler: WatchReconciler::new(config.watch_debounce),
            settings: SettingsService::new(ports.store.clone()),
            templates: TemplateRegistry::new(ports.store.clone()),
            active_vault: None,
            ports,
        }
    }

    pub fn vaults(&self) -> &VaultRegistry {
        &self.vaults
    }

    pub fn tree(&self) -> &FileTreeController {
        &self.tree
    }

    /// Direct access for the purely local tree state (expansion, rename
    /// mode). Filesystem commands go through the workspace so tabs follow.
    pub fn tree_mut(&mut self) -> &mut FileTreeController {
        &mut self.tree
    }

    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn reconciler(&self) -> &WatchReconciler {
        &self.reconciler
    }

    pub fn active_vault_id(&self) -> Option<&VaultId> {
        self.active_vault.as_ref()
    }

    /// Loads settings, templates and vaults, then opens the current vault.
    /// Settings and template failures fall back to defaults.
    pub async fn startup(&mut self) -> Result<()> {
        let _ = self.settings.load().await;
        let _ = self.templates.load().await;
        self.tabs.set_max_tabs(self.settings.get().max_tabs());
        self.vaults.load().await?;
        self.activate_current_vault().await
    }

    /// Brings the tree, the tabs and the watcher in line with the current
    /// vault. Nothing happens when it is already active.
    pub async fn activate_current_vault(&mut self) -> Result<()> {
        let current = self.vaults.current_vault().cloned();
        if current.as_ref().map(|v| &v.id) == self.active_vault.as_ref()
            && current.as_ref().map(|v| v.path.as_path()) == self.tree.vault_path()
        {
            return Ok(());
        }

        self.reconciler.stop();
        if let Err(e) = self.ports.watcher.stop_watching().await {
            tracing::warn!(error = %e, "failed to stop watcher");
        }
        let _ = self
            .tabs
            .switch_vault(current.as_ref().map(|v| v.id.clone()))
            .await;
        self.tree.clear();
        self.active_vault = current.as_ref().map(|v| v.id.clone());

        let Some(vault) = current else {
            tracing::info!("no vault configured");
            return Ok(());
        };
        tracing::info!(vault = %vault.id, path = %vault.path.display(), "activating vault");

        let loaded = self.tree.load(&vault.path).await;

        // subscribe first so nothing between start and subscribe is missed
        let stream = self.ports.watcher.subscribe();
        match self.ports.watcher.start_watching(&vault.path).await {
            Ok(()) => self.reconciler.start(&vault.path, stream),
            Err(e) => {
                tracing::warn!(vault = %vault.id, error = %e, "live reload disabled");
                if loaded.is_ok() {
                    self.tree.record_error(WorkspaceError::WatchSetup { message: e.message });
                }
            }
        }

        loaded
    }

    pub async fn add_vault(&mut self) -> Result<Option<Vault>> {
        let added = self.vaults.add().await?;
        if added.is_some() {
            self.activate_current_vault().await?;
        }
        Ok(added)
    }

    pub async fn add_vault_path(&mut self, path: PathBuf) -> Result<Vault> {
        let vault = self.vaults.add_path(path).await?;
        self.activate_current_vault().await?;
        Ok(vault)
    }

    pub async fn set_default_vault(&mut self, id: &VaultId) -> Result<()> {
        self.vaults.set_default(id).await?;
        self.activate_current_vault().await
    }

    pub async fn remove_vault(&mut self, id: &VaultId) -> Result<()> {
        self.vaults.remove(id).await?;
        self.activate_current_vault().await
    }

    pub async fn rename_vault(&mut self, id: &VaultId, name: &str) -> Result<()> {
        self.vaults.rename(id, name).await
    }

    /// Selects `node` in the tree and mirrors the selection into the tabs.
    pub async fn select_file(&mut self, node: &Node) -> Result<()> {
        self.tree.select_file(node).await?;
        self.sync_selection_to_tabs();
        Ok(())
    }

    fn sync_selection_to_tabs(&mut self) {
        if let Some(selected) = self.tree.selected_file().cloned() {
            self.tabs.on_selection_changed(&selected);
        }
    }

    pub async fn activate_tab(&mut self, id: &NodeId) -> Result<()> {
        let Some(node) = self.tabs.activate(id) else {
            return Ok(());
        };
        self.tree.select_file(&node).await?;
        // echo is swallowed by the sync state
        self.sync_selection_to_tabs();
        Ok(())
    }

    pub async fn close_tab(&mut self, id: &NodeId) -> Result<()> {
        let was_active = self.tabs.active_tab_id() == Some(id);
        self.tabs.close(id)?;
        if was_active {
            if let Some(next) = self.tabs.active_tab_id().cloned() {
                return self.activate_tab(&next).await;
            }
        }
        Ok(())
    }

    pub fn close_all_tabs(&mut self) {
        self.tabs.close_all();
    }

    pub async fn save_content(&mut self, path: &Path, content: &str) -> Result<()> {
        self.tree.save_content(path, content).await
    }

    pub async fn create_note(&mut self, parent: &Path) -> Result<Node> {
        let template = self.templates.get(parent).map(str::to_string);
        let node = self.tree.create_note_seeded(parent, template.as_deref()).await?;
        self.sync_selection_to_tabs();
        Ok(node)
    }

    pub async fn create_folder(&mut self, parent: &Path) -> Result<Node> {
        self.tree.create_folder(parent).await
    }

    /// Tabs follow a successful delete even when the rescan after it fails.
    pub async fn delete_node(&mut self, path: &Path) -> Result<()> {
        let rescanned = self.tree.delete_then_rescan(path).await?;
        let removed = self.tabs.remove_under(path);
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "closed tabs of deleted path");
        }
        rescanned
    }

    pub async fn duplicate_file(&mut self, path: &Path) -> Result<Node> {
        let node = self.tree.duplicate_file(path).await?;
        self.sync_selection_to_tabs();
        Ok(node)
    }

    pub async fn rename_path(&mut self, old_path: &Path, new_path: &Path) -> Result<Node> {
        let node = self.tree.rename_path(old_path, new_path).await?;
        self.tabs.retarget(old_path, &node);
        Ok(node)
    }

    /// Inline rename confirmation; `Ok(None)` when nothing was renamed.
    pub async fn rename_node(&mut self, id: &NodeId, new_name: &str) -> Result<Option<Node>> {
        let old_path = self.tree.tree().get(id).map(|n| n.path.clone());
        let renamed = self.tree.rename_node(id, new_name).await?;
        if let (Some(old_path), Some(node)) = (old_path, &renamed) {
            self.tabs.retarget(&old_path, node);
        }
        Ok(renamed)
    }

    pub async fn update_settings<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let max_tabs = self.settings.update(f).await?.max_tabs();
        self.tabs.set_max_tabs(max_tabs);
        Ok(())
    }

    pub async fn set_template(&mut self, folder: &Path, text: &str) -> Result<()> {
        self.templates.set(folder, text).await
    }

    pub async fn remove_template(&mut self, folder: &Path) -> Result<()> {
        self.templates.remove(folder).await
    }

    async fn apply_rescan(&mut self, request: RescanRequest) {
        if !self.reconciler.is_current(&request)
            || self.tree.vault_path() != Some(request.vault_path.as_path())
        {
            tracing::debug!(generation = request.generation, "rescan for inactive vault ignored");
            return;
        }
        tracing::debug!(events = request.events, "rescanning after external changes");
        let _ = self.tree.rescan().await;
    }

    /// Applies everything that is due: pending watch rescans, tab sync
    /// settling and debounced tab persistence.
    pub async fn tick(&mut self) {
        let now = Instant::now();
        self.tabs.settle(now);
        if let Some(request) = self.reconciler.try_next() {
            self.apply_rescan(request).await;
        }
        let _ = self.tabs.flush_if_due(now).await;
    }

    /// When `tick` next has timed work to do.
    pub fn next_wake(&self) -> Option<Instant> {
        self.tabs.next_deadline()
    }

    /// Drives the workspace until `shutdown` resolves, then shuts down.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let wake = self.next_wake();
            tokio::select! {
                _ = &mut shutdown => break,
                request = self.reconciler.next() => {
                    self.apply_rescan(request).await;
                }
                _ = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                    self.tick().await;
                }
            }
        }
        self.shutdown().await;
    }

    /// Stops watching and writes pending tab state.
    pub async fn shutdown(&mut self) {
        self.reconciler.stop();
        if let Err(e) = self.ports.watcher.stop_watching().await {
            tracing::warn!(error = %e, "failed to stop watcher");
        }
        let _ = self.tabs.flush().await;
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let mut expanded: Vec<NodeId> = self.tree.expanded_ids().iter().cloned().collect();
        expanded.sort();

        let errors = [
            self.vaults.error(),
            self.tree.error(),
            self.tabs.error(),
            self.settings.error(),
            self.templates.error(),
        ]
        .into_iter()
        .flatten()
        .map(ToString::to_string)
        .collect();

        WorkspaceSnapshot {
            vaults: self.vaults.vaults().to_vec(),
            current_vault: self.vaults.current_vault().cloned(),
            file_tree: self.tree.nodes().to_vec(),
            selected_file: self.tree.selected_file().cloned(),
            file_content: self.tree.file_content().map(str::to_string),
            expanded_folder_ids: expanded,
            renaming_node_id: self.tree.renaming_node_id().cloned(),
            tabs: self.tabs.tabs().to_vec(),
            active_tab_id: self.tabs.active_tab_id().cloned(),
            settings: self.settings.get().clone(),
            is_loading: self.vaults.is_loading() || self.tree.is_loading(),
            errors,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/workspace.rs"]
mod tests;

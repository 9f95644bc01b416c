//! File tree controller: the vault tree, selection, expansion and inline
//! rename state, plus every mutating filesystem command.

use crate::kernel::error::{require_path, BackendResultExt, Result, WorkspaceError};
use crate::kernel::services::ports::VaultFs;
use crate::models::{Node, NodeId, PathTree};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStats {
    pub word_count: usize,
    pub char_count: usize,
}

impl FileStats {
    pub fn of(text: &str) -> Self {
        Self {
            word_count: text.unicode_words().count(),
            char_count: text.chars().count(),
        }
    }
}

pub struct FileTreeController {
    fs: Arc<dyn VaultFs>,
    tree: PathTree,
    vault_path: Option<PathBuf>,
    selected: Option<Node>,
    content: Option<String>,
    expanded: FxHashSet<NodeId>,
    renaming: Option<NodeId>,
    rename_draft: Option<String>,
    is_loading: bool,
    error: Option<WorkspaceError>,
}

impl FileTreeController {
    pub fn new(fs: Arc<dyn VaultFs>) -> Self {
        Self {
            fs,
            tree: PathTree::new(),
            vault_path: None,
            selected: None,
            content: None,
            expanded: FxHashSet::default(),
            renaming: None,
            rename_draft: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    pub fn nodes(&self) -> &[Node] {
        self.tree.nodes()
    }

    pub fn vault_path(&self) -> Option<&Path> {
        self.vault_path.as_deref()
    }

    pub fn selected_file(&self) -> Option<&Node> {
        self.selected.as_ref()
    }

    pub fn file_content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn file_stats(&self) -> Option<FileStats> {
        self.content.as_deref().map(FileStats::of)
    }

    pub fn expanded_ids(&self) -> &FxHashSet<NodeId> {
        &self.expanded
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    pub fn renaming_node_id(&self) -> Option<&NodeId> {
        self.renaming.as_ref()
    }

    pub fn rename_draft(&self) -> Option<&str> {
        self.rename_draft.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&WorkspaceError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Records a failure that does not originate in this controller (watch
    /// setup) so the UI sees it through the same channel.
    pub fn record_error(&mut self, error: WorkspaceError) {
        self.error = Some(error);
    }

    fn fail<T>(&mut self, error: WorkspaceError) -> Result<T> {
        self.error = Some(error.clone());
        Err(error)
    }

    /// Resets everything; used when no vault is active.
    pub fn clear(&mut self) {
        self.tree = PathTree::new();
        self.vault_path = None;
        self.selected = None;
        self.content = None;
        self.expanded.clear();
        self.renaming = None;
        self.rename_draft = None;
        self.is_loading = false;
        self.error = None;
    }

    pub async fn load(&mut self, vault_path: &Path) -> Result<()> {
        if let Err(e) = require_path(vault_path) {
            self.tree = PathTree::new();
            self.is_loading = false;
            return self.fail(e);
        }

        self.vault_path = Some(vault_path.to_path_buf());
        self.is_loading = true;
        self.error = None;
        let result = self.fs.scan_directory(vault_path).await.op("scan_directory");
        self.is_loading = false;

        match result {
            Ok(nodes) => {
                self.tree = PathTree::from_nodes(nodes);
                tracing::info!(
                    vault = %vault_path.display(),
                    nodes = self.tree.len(),
                    "file tree loaded"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(vault = %vault_path.display(), error = %e, "file tree load failed");
                self.tree = PathTree::new();
                self.fail(e)
            }
        }
    }

    pub async fn rescan(&mut self) -> Result<()> {
        let Some(path) = self.vault_path.clone() else {
            return Ok(());
        };
        self.load(&path).await
    }

    pub async fn select_file(&mut self, node: &Node) -> Result<()> {
        if !node.is_file() {
            return Ok(());
        }
        if self.selected.as_ref().is_some_and(|s| s.id == node.id) {
            return Ok(());
        }
        if let Err(e) = require_path(&node.path) {
            return self.fail(e);
        }

        if node.is_image() {
            self.selected = Some(node.shallow());
            self.content = None;
            return Ok(());
        }

        self.is_loading = true;
        self.error = None;
        let result = self.fs.read_file(&node.path).await.op("read_file");
        self.is_loading = false;

        match result {
            Ok(content) => {
                self.selected = Some(node.shallow());
                self.content = Some(content);
                Ok(())
            }
            Err(e) => {
                // the previous selection stays; only the error is surfaced
                tracing::warn!(path = %node.path.display(), error = %e, "read failed");
                self.fail(e)
            }
        }
    }

    pub async fn save_content(&mut self, path: &Path, content: &str) -> Result<()> {
        if let Err(e) = require_path(path) {
            return self.fail(e);
        }
        if let Err(e) = self.fs.write_file(path, content).await.op("write_file") {
            return self.fail(e);
        }
        if self.selected.as_ref().is_some_and(|s| s.path == path) {
            self.content = Some(content.to_string());
        }
        Ok(())
    }

    pub async fn create_note(&mut self, parent: &Path) -> Result<Node> {
        self.create_note_seeded(parent, None).await
    }

    /// Creates a note and, when `seed` is given, writes it as the initial
    /// body.
    pub async fn create_note_seeded(&mut self, parent: &Path, seed: Option<&str>) -> Result<Node> {
        if let Err(e) = require_path(parent) {
            return self.fail(e);
        }

        self.is_loading = true;
        self.error = None;
        let created = self.fs.create_note(parent).await.op("create_note");
        self.is_loading = false;
        let node = match created {
            Ok(node) => node,
            Err(e) => return self.fail(e),
        };
        tracing::info!(path = %node.path.display(), "note created");

        self.renaming = Some(node.id.clone());
        self.rename_draft = None;
        self.reveal_path(&node.path);

        let mut seed_result = Ok(());
        if let Some(seed) = seed.filter(|s| !s.is_empty()) {
            seed_result = self.fs.write_file(&node.path, seed).await.op("write_file");
        }

        // the tree must reflect the new note before it is selected
        self.rescan().await?;
        let fresh = self.tree.get(&node.id).cloned().unwrap_or_else(|| node.clone());
        self.select_file(&fresh).await?;

        if let Err(e) = seed_result {
            return self.fail(e);
        }
        Ok(fresh)
    }

    pub async fn create_folder(&mut self, parent: &Path) -> Result<Node> {
        if let Err(e) = require_path(parent) {
            return self.fail(e);
        }

        self.is_loading = true;
        self.error = None;
        let created = self.fs.create_folder(parent).await.op("create_folder");
        self.is_loading = false;
        let node = match created {
            Ok(node) => node,
            Err(e) => return self.fail(e),
        };
        tracing::info!(path = %node.path.display(), "folder created");

        self.renaming = Some(node.id.clone());
        self.rename_draft = None;
        self.reveal_path(&node.path);
        self.rescan().await?;
        Ok(self.tree.get(&node.id).cloned().unwrap_or(node))
    }

    pub async fn delete_node(&mut self, path: &Path) -> Result<()> {
        self.delete_then_rescan(path).await?
    }

    /// Deletes `path` and rescans. The outer result is the delete itself, the
    /// inner one the rescan that always follows it.
    pub async fn delete_then_rescan(&mut self, path: &Path) -> Result<Result<()>> {
        if let Err(e) = require_path(path) {
            return self.fail(e);
        }

        // deletion intent clears everything that points into `path` before
        // the command is issued
        if self.selected.as_ref().is_some_and(|s| s.is_at_or_under(path)) {
            self.selected = None;
            self.content = None;
        }
        if let Some(id) = &self.renaming {
            if self.tree.get(id).is_some_and(|n| n.is_at_or_under(path)) {
                self.renaming = None;
                self.rename_draft = None;
            }
        }
        let doomed: Vec<NodeId> = self
            .expanded
            .iter()
            .filter(|id| self.tree.get(id).is_some_and(|n| n.is_at_or_under(path)))
            .cloned()
            .collect();
        for id in doomed {
            self.expanded.remove(&id);
        }

        self.is_loading = true;
        self.error = None;
        let result = self.fs.delete_path(path).await.op("delete_path");
        self.is_loading = false;

        match &result {
            Ok(()) => tracing::info!(path = %path.display(), "path deleted"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "delete failed"),
        }

        let rescan = self.rescan().await;
        match result {
            Ok(()) => Ok(rescan),
            Err(e) => self.fail(e),
        }
    }

    pub async fn duplicate_file(&mut self, path: &Path) -> Result<Node> {
        if let Err(e) = require_path(path) {
            return self.fail(e);
        }

        self.is_loading = true;
        self.error = None;
        let result = self.fs.duplicate_file(path).await.op("duplicate_file");
        self.is_loading = false;
        let node = match result {
            Ok(node) => node,
            Err(e) => return self.fail(e),
        };
        tracing::info!(from = %path.display(), to = %node.path.display(), "file duplicated");

        self.rescan().await?;
        let fresh = self.tree.get(&node.id).cloned().unwrap_or(node);
        self.select_file(&fresh).await?;
        Ok(fresh)
    }

    pub async fn rename_path(&mut self, old_path: &Path, new_path: &Path) -> Result<Node> {
        if let Err(e) = require_path(old_path).and_then(|_| require_path(new_path)) {
            return self.fail(e);
        }

        let old_id = NodeId::for_path(old_path);
        self.is_loading = true;
        self.error = None;
        let result = self.fs.rename_path(old_path, new_path).await.op("rename_path");
        self.is_loading = false;

        let outcome = match result {
            Ok(node) => {
                tracing::info!(from = %old_path.display(), to = %node.path.display(), "path renamed");
                let selection = self
                    .selected
                    .as_ref()
                    .map(|sel| (sel.path == old_path, sel.is_at_or_under(old_path)));
                match selection {
                    Some((true, _)) => self.selected = Some(node.shallow()),
                    Some((false, true)) => {
                        // nested paths are not recomputed
                        self.selected = None;
                        self.content = None;
                    }
                    _ => {}
                }
                if self.expanded.remove(&old_id) {
                    self.expanded.insert(node.id.clone());
                }
                self.renaming = None;
                self.rename_draft = None;
                Ok(node)
            }
            Err(e) => {
                tracing::error!(from = %old_path.display(), error = %e, "rename failed");
                // stay in rename mode with the attempted name so the user can retry
                self.renaming = Some(old_id);
                self.rename_draft = new_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string());
                self.error = Some(e.clone());
                Err(e)
            }
        };

        let _ = self.rescan().await;
        if let Err(e) = &outcome {
            self.error = Some(e.clone());
        }
        outcome
    }

    /// Confirms an inline rename of `id` to `new_name` within the same folder.
    /// Returns `Ok(None)` when there was nothing to rename.
    pub async fn rename_node(&mut self, id: &NodeId, new_name: &str) -> Result<Option<Node>> {
        let Some(node) = self.tree.get(id).cloned() else {
            return self.fail(WorkspaceError::not_found("node", id));
        };

        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == node.name {
            self.cancel_rename();
            return Ok(None);
        }
        if new_name.contains(['/', '\\']) {
            return self.fail(WorkspaceError::InvalidName(new_name.to_string()));
        }

        let new_path = match node.path.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        self.rename_path(&node.path, &new_path).await.map(Some)
    }

    pub fn begin_rename(&mut self, id: &NodeId) -> Result<()> {
        if !self.tree.contains(id) {
            return self.fail(WorkspaceError::not_found("node", id));
        }
        self.renaming = Some(id.clone());
        self.rename_draft = None;
        Ok(())
    }

    pub fn cancel_rename(&mut self) {
        self.renaming = None;
        self.rename_draft = None;
    }

    pub fn toggle_expand(&mut self, id: &NodeId) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
        }
    }

    pub fn set_expanded_ids<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.expanded = ids.into_iter().collect();
    }

    /// Expands every folder containing `path` so it becomes visible. Works for
    /// paths the current tree does not know yet.
    pub fn reveal_path(&mut self, path: &Path) {
        let Some(root) = self.vault_path.clone() else {
            return;
        };
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == root || !dir.starts_with(&root) {
                break;
            }
            self.expanded.insert(NodeId::for_path(dir));
            current = dir.parent();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/file_tree.rs"]
mod tests;

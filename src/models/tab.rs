use super::path_tree::{Node, NodeId};
use super::vault::VaultId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: NodeId,
    pub name: String,
    pub path: PathBuf,
    /// Epoch millis of the last open/activation; the LRU key.
    pub opened_at: u64,
}

impl Tab {
    pub fn from_node(node: &Node, opened_at: u64) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            opened_at,
        }
    }

    /// The file node this tab points at, for pushing into the file tree.
    pub fn to_node(&self) -> Node {
        Node {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            kind: super::path_tree::NodeKind::File,
            children: None,
        }
    }
}

/// Persisted tab state of one vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultTabs {
    pub vault_id: VaultId,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub active_tab_id: Option<NodeId>,
}

impl VaultTabs {
    pub fn empty(vault_id: VaultId) -> Self {
        Self {
            vault_id,
            tabs: Vec::new(),
            active_tab_id: None,
        }
    }
}

/// Picks the tabs to drop so at most `max_tabs` remain: oldest `opened_at`
/// first, never `protect`.
pub fn eviction_candidates(tabs: &[Tab], max_tabs: usize, protect: Option<&NodeId>) -> Vec<NodeId> {
    if tabs.len() <= max_tabs {
        return Vec::new();
    }

    let mut by_age: Vec<&Tab> = tabs.iter().collect();
    by_age.sort_by_key(|t| t.opened_at);

    by_age
        .into_iter()
        .filter(|t| Some(&t.id) != protect)
        .take(tabs.len() - max_tabs)
        .map(|t| t.id.clone())
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/models/tab.rs"]
mod tests;

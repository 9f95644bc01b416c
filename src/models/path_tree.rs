//! Vault file tree snapshot.
//!
//! A `PathTree` is an ordered forest rebuilt from every directory scan. Node
//! ids are derived from paths, so the same file keeps the same id across
//! rescans and restarts.

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn for_path(path: &Path) -> Self {
        let mut hasher = FxHasher::default();
        path.to_string_lossy().hash(&mut hasher);
        Self(format!("{:016x}", hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), NodeKind::File, None)
    }

    pub fn folder(path: impl Into<PathBuf>, children: Vec<Node>) -> Self {
        Self::new(path.into(), NodeKind::Folder, Some(children))
    }

    fn new(path: PathBuf, kind: NodeKind, children: Option<Vec<Node>>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: NodeId::for_path(&path),
            name,
            path,
            kind,
            children,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_image(&self) -> bool {
        self.is_file() && is_image_path(&self.path)
    }

    /// `true` when `self.path` equals `path` or lies inside it.
    pub fn is_at_or_under(&self, path: &Path) -> bool {
        self.path.starts_with(path)
    }

    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Same node without its subtree.
    pub fn shallow(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            kind: self.kind,
            children: match self.kind {
                NodeKind::File => None,
                NodeKind::Folder => Some(Vec::new()),
            },
        }
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Folders first, then case-insensitive by name.
pub fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    match (a.kind, b.kind) {
        (NodeKind::Folder, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Folder) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

pub fn sort_nodes(nodes: &mut [Node]) {
    nodes.sort_by(compare_nodes);
}

#[derive(Clone, Debug, Default)]
pub struct PathTree {
    roots: Vec<Node>,
    // child-index chain from `roots` down to the node
    index: FxHashMap<NodeId, Vec<usize>>,
    by_path: FxHashMap<PathBuf, NodeId>,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from raw scan output, restoring the ordering and
    /// uniqueness invariants the backend is not trusted to uphold.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut seen = FxHashSet::default();
        let mut roots = normalize_level(nodes, &mut seen);
        sort_nodes(&mut roots);

        let mut tree = Self {
            roots,
            index: FxHashMap::default(),
            by_path: FxHashMap::default(),
        };
        tree.reindex();
        tree
    }

    fn reindex(&mut self) {
        let mut index = FxHashMap::default();
        let mut by_path = FxHashMap::default();
        let mut stack: Vec<(Vec<usize>, &Node)> = self
            .roots
            .iter()
            .enumerate()
            .map(|(i, node)| (vec![i], node))
            .collect();

        while let Some((chain, node)) = stack.pop() {
            by_path.insert(node.path.clone(), node.id.clone());
            for (i, child) in node.children().iter().enumerate() {
                let mut child_chain = chain.clone();
                child_chain.push(i);
                stack.push((child_chain, child));
            }
            index.insert(node.id.clone(), chain);
        }

        self.index = index;
        self.by_path = by_path;
    }

    pub fn nodes(&self) -> &[Node] {
        &self.roots
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.roots
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        let chain = self.index.get(id)?;
        let (first, rest) = chain.split_first()?;
        let mut node = self.roots.get(*first)?;
        for &i in rest {
            node = node.children().get(i)?;
        }
        Some(node)
    }

    pub fn get_by_path(&self, path: &Path) -> Option<&Node> {
        self.by_path.get(path).and_then(|id| self.get(id))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// Folder nodes strictly containing `path`, outermost first. The path
    /// itself does not need to be in the tree.
    pub fn ancestors_of(&self, path: &Path) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut level = self.roots.as_slice();
        loop {
            let Some(next) = level
                .iter()
                .find(|n| n.is_folder() && path != n.path && path.starts_with(&n.path))
            else {
                break;
            };
            out.push(next);
            level = next.children();
        }
        out
    }

    /// Every node in display order (pre-order, depth first).
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        let mut stack: Vec<&Node> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &Node> {
        self.iter().filter(|n| n.is_file())
    }
}

fn normalize_level(nodes: Vec<Node>, seen: &mut FxHashSet<PathBuf>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        if !seen.insert(node.path.clone()) {
            tracing::warn!(path = %node.path.display(), "duplicate path in scan result, dropped");
            continue;
        }
        node.id = NodeId::for_path(&node.path);
        match node.kind {
            NodeKind::File => node.children = None,
            NodeKind::Folder => {
                let children = node.children.take().unwrap_or_default();
                let mut children = normalize_level(children, seen);
                sort_nodes(&mut children);
                node.children = Some(children);
            }
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/models/path_tree.rs"]
mod tests;

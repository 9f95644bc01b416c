//! Data models: the vault file tree, vaults and tabs.

pub mod path_tree;
pub mod tab;
pub mod vault;

pub use path_tree::{Node, NodeId, NodeKind, PathTree};
pub use tab::{Tab, VaultTabs};
pub use vault::{Vault, VaultId, VaultStore};

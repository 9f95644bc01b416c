//! Headless workspace core: file tree, tabs, vaults and their reconciliation
//! with the filesystem.

pub mod error;
pub mod file_tree;
pub mod services;
pub mod settings;
pub mod tabs;
pub mod templates;
pub mod vaults;
pub mod watch;
pub mod workspace;

pub use error::{Result, WorkspaceError};
pub use file_tree::{FileStats, FileTreeController};
pub use settings::SettingsService;
pub use tabs::{TabRegistry, TabSync};
pub use templates::TemplateRegistry;
pub use vaults::VaultRegistry;
pub use watch::{RescanRequest, WatchReconciler};
pub use workspace::{Workspace, WorkspacePorts, WorkspaceSnapshot};

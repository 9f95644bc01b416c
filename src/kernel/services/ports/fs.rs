//! Vault filesystem capability.

use super::error::BackendResult;
use super::runtime::BoxFuture;
use crate::models::Node;
use std::path::Path;

pub trait VaultFs: Send + Sync {
    /// Hierarchical listing of `path`; the returned nodes are the roots of
    /// the vault tree.
    fn scan_directory<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<Vec<Node>>>;

    fn read_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<String>>;

    fn write_file<'a>(
        &'a self,
        path: &'a Path,
        content: &'a str,
    ) -> BoxFuture<'a, BackendResult<()>>;

    /// Creates a uniquely named empty note inside `parent`.
    fn create_note<'a>(&'a self, parent: &'a Path) -> BoxFuture<'a, BackendResult<Node>>;

    /// Creates a uniquely named empty folder inside `parent`.
    fn create_folder<'a>(&'a self, parent: &'a Path) -> BoxFuture<'a, BackendResult<Node>>;

    /// Removes a file, or a folder with everything below it.
    fn delete_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<()>>;

    fn duplicate_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, BackendResult<Node>>;

    fn rename_path<'a>(
        &'a self,
        from: &'a Path,
        to: &'a Path,
    ) -> BoxFuture<'a, BackendResult<Node>>;
}

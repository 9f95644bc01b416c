use super::error::BackendResult;
use super::runtime::BoxFuture;
use std::path::PathBuf;

/// User folder chooser. `Ok(None)` means the user cancelled.
pub trait FolderPicker: Send + Sync {
    fn choose_folder(&self) -> BoxFuture<'_, BackendResult<Option<PathBuf>>>;
}

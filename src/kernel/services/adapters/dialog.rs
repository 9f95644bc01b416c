use crate::kernel::services::ports::{BackendResult, BoxFuture, FolderPicker};
use std::path::PathBuf;

/// Folder "dialog" for headless use: answers with a folder fixed up front,
/// typically taken from the command line. `None` behaves like a cancel.
#[derive(Debug, Clone, Default)]
pub struct PresetFolderPicker {
    folder: Option<PathBuf>,
}

impl PresetFolderPicker {
    pub fn new(folder: Option<PathBuf>) -> Self {
        Self { folder }
    }
}

impl FolderPicker for PresetFolderPicker {
    fn choose_folder(&self) -> BoxFuture<'_, BackendResult<Option<PathBuf>>> {
        Box::pin(async move { Ok(self.folder.clone()) })
    }
}

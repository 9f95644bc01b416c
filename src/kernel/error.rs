use crate::kernel::services::ports::BackendError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkspaceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// Empty or blank path argument; raised before any I/O.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("{what} `{id}` not found")]
    NotFound { what: &'static str, id: String },

    /// An external capability rejected the call.
    #[error("{op} failed: {message}")]
    Io { op: &'static str, message: String },

    /// Live reconciliation is unavailable; the tree still works.
    #[error("Failed to start file watcher: {message}")]
    WatchSetup { message: String },
}

impl WorkspaceError {
    pub fn io(op: &'static str, err: BackendError) -> Self {
        WorkspaceError::Io {
            op,
            message: err.message,
        }
    }

    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        WorkspaceError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(self, WorkspaceError::Io { .. })
    }
}

/// Lifts a port result into the core's error type.
pub(crate) trait BackendResultExt<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T> BackendResultExt<T> for std::result::Result<T, BackendError> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|e| WorkspaceError::io(op, e))
    }
}

pub(crate) fn require_path(path: &std::path::Path) -> Result<()> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(WorkspaceError::InvalidPath("path is empty".to_string()));
    }
    Ok(())
}

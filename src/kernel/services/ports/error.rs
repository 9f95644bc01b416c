use std::fmt;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Rejection raised by an external capability. Carries only a message; the
/// core wraps it into its own error type at the call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("invalid record: {}", e))
    }
}

impl From<notify::Error> for BackendError {
    fn from(e: notify::Error) -> Self {
        Self::new(e.to_string())
    }
}

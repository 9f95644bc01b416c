use std::time::Duration;

#[derive(Clone, Debug)]
pub struct WorkspaceConfig {
    /// Quiet period after the last change notification before a rescan.
    pub watch_debounce: Duration,
    /// Delay between the last tab change and its persistence.
    pub tab_persist_debounce: Duration,
    /// How long selection notifications are ignored after a tab activation.
    pub tab_sync_settle: Duration,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            watch_debounce: Duration::from_millis(300),
            tab_persist_debounce: Duration::from_millis(500),
            tab_sync_settle: Duration::from_millis(100),
        }
    }
}

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TABS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub hide_editor_toolbar: bool,
    pub max_tabs: usize,
    pub auto_check_updates: bool,
    pub dev_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hide_editor_toolbar: false,
            max_tabs: DEFAULT_MAX_TABS,
            auto_check_updates: true,
            dev_mode: false,
        }
    }
}

impl Settings {
    pub fn max_tabs(&self) -> usize {
        self.max_tabs.max(1)
    }
}

/// Persisted layout of the settings record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsStore {
    #[serde(default)]
    pub settings: Settings,
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;

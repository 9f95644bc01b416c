use crate::kernel::error::{BackendResultExt, Result, WorkspaceError};
use crate::kernel::services::ports::settings::SettingsStore;
use crate::kernel::services::ports::store::DATA_KEY;
use crate::kernel::services::ports::{KvStore, Settings, StoreName};
use std::sync::Arc;

pub struct SettingsService {
    store: Arc<dyn KvStore>,
    settings: Settings,
    error: Option<WorkspaceError>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            settings: Settings::default(),
            error: None,
        }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn error(&self) -> Option<&WorkspaceError> {
        self.error.as_ref()
    }

    /// Loads the persisted settings over the defaults. On failure the
    /// defaults stay in effect.
    pub async fn load(&mut self) -> Result<()> {
        let loaded = self
            .store
            .load(StoreName::Settings, DATA_KEY)
            .await
            .and_then(|value| match value {
                Some(value) => Ok(serde_json::from_value::<SettingsStore>(value)?.settings),
                None => Ok(Settings::default()),
            })
            .op("load_settings");

        match loaded {
            Ok(settings) => {
                self.settings = settings;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load settings, using defaults");
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Applies `f` to a copy of the settings, persists it, then commits.
    pub async fn update<F>(&mut self, f: F) -> Result<&Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = self.settings.clone();
        f(&mut next);

        let record = SettingsStore { settings: next };
        let saved = match serde_json::to_value(&record) {
            Ok(value) => self
                .store
                .save(StoreName::Settings, DATA_KEY, value)
                .await
                .op("save_settings"),
            Err(e) => Err(WorkspaceError::io("save_settings", e.into())),
        };

        if let Err(e) = saved {
            tracing::error!(error = %e, "failed to save settings");
            self.error = Some(e.clone());
            return Err(e);
        }
        self.settings = record.settings;
        self.error = None;
        Ok(&self.settings)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/settings.rs"]
mod tests;

//! Per-folder note templates. A note created directly inside a folder with a
//! template starts out with the template's text.

use crate::kernel::error::{BackendResultExt, Result, WorkspaceError};
use crate::kernel::services::ports::store::DATA_KEY;
use crate::kernel::services::ports::{KvStore, StoreName};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Persisted layout of the template map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesStore {
    #[serde(default)]
    pub templates: FxHashMap<PathBuf, String>,
}

pub struct TemplateRegistry {
    store: Arc<dyn KvStore>,
    templates: FxHashMap<PathBuf, String>,
    error: Option<WorkspaceError>,
}

impl TemplateRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            templates: FxHashMap::default(),
            error: None,
        }
    }

    pub fn get(&self, folder: &Path) -> Option<&str> {
        self.templates.get(folder).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn error(&self) -> Option<&WorkspaceError> {
        self.error.as_ref()
    }

    pub async fn load(&mut self) -> Result<()> {
        let loaded = self
            .store
            .load(StoreName::Templates, DATA_KEY)
            .await
            .and_then(|value| match value {
                Some(value) => Ok(serde_json::from_value::<TemplatesStore>(value)?.templates),
                None => Ok(FxHashMap::default()),
            })
            .op("load_templates");

        match loaded {
            Ok(templates) => {
                self.templates = templates;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load templates");
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub async fn set(&mut self, folder: &Path, text: &str) -> Result<()> {
        let mut next = self.templates.clone();
        next.insert(folder.to_path_buf(), text.to_string());
        self.commit(next).await
    }

    pub async fn remove(&mut self, folder: &Path) -> Result<()> {
        if !self.templates.contains_key(folder) {
            return Ok(());
        }
        let mut next = self.templates.clone();
        next.remove(folder);
        self.commit(next).await
    }

    async fn commit(&mut self, next: FxHashMap<PathBuf, String>) -> Result<()> {
        let record = TemplatesStore { templates: next };
        let saved = match serde_json::to_value(&record) {
            Ok(value) => self
                .store
                .save(StoreName::Templates, DATA_KEY, value)
                .await
                .op("save_templates"),
            Err(e) => Err(WorkspaceError::io("save_templates", e.into())),
        };
        if let Err(e) = saved {
            tracing::error!(error = %e, "failed to save templates");
            self.error = Some(e.clone());
            return Err(e);
        }
        self.templates = record.templates;
        self.error = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/templates.rs"]
mod tests;

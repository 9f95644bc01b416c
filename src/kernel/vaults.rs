use crate::kernel::error::{BackendResultExt, Result, WorkspaceError};
use crate::kernel::services::ports::store::DATA_KEY;
use crate::kernel::services::ports::{FolderPicker, KvStore, StoreName};
use crate::models::vault::normalize_default;
use crate::models::{Vault, VaultId, VaultStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Configured vaults. Every mutation is persisted before it becomes visible
/// in memory.
pub struct VaultRegistry {
    store: Arc<dyn KvStore>,
    picker: Arc<dyn FolderPicker>,
    vaults: Vec<Vault>,
    is_loading: bool,
    error: Option<WorkspaceError>,
}

impl VaultRegistry {
    pub fn new(store: Arc<dyn KvStore>, picker: Arc<dyn FolderPicker>) -> Self {
        Self {
            store,
            picker,
            vaults: Vec::new(),
            is_loading: false,
            error: None,
        }
    }

    pub fn vaults(&self) -> &[Vault] {
        &self.vaults
    }

    pub fn get(&self, id: &VaultId) -> Option<&Vault> {
        self.vaults.iter().find(|v| &v.id == id)
    }

    /// The default vault; `None` only when no vault is configured.
    pub fn current_vault(&self) -> Option<&Vault> {
        self.vaults.iter().find(|v| v.is_default)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&WorkspaceError> {
        self.error.as_ref()
    }

    fn fail<T>(&mut self, error: WorkspaceError) -> Result<T> {
        self.error = Some(error.clone());
        Err(error)
    }

    pub async fn load(&mut self) -> Result<()> {
        self.is_loading = true;
        self.error = None;
        let loaded = self
            .store
            .load(StoreName::Vaults, DATA_KEY)
            .await
            .and_then(|value| match value {
                Some(value) => Ok(serde_json::from_value::<VaultStore>(value)?),
                None => Ok(VaultStore::default()),
            })
            .op("load_vaults");
        self.is_loading = false;

        match loaded {
            Ok(stored) => {
                let mut vaults = stored.vaults;
                normalize_default(&mut vaults);
                self.vaults = vaults;
                tracing::info!(vaults = self.vaults.len(), "vaults loaded");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load vaults");
                self.vaults.clear();
                self.fail(e)
            }
        }
    }

    /// Persists `next` and, only once that succeeded, makes it current.
    async fn commit(&mut self, mut next: Vec<Vault>) -> Result<()> {
        normalize_default(&mut next);
        let record = VaultStore { vaults: next };
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => return self.fail(WorkspaceError::io("save_vaults", e.into())),
        };

        self.error = None;
        if let Err(e) = self
            .store
            .save(StoreName::Vaults, DATA_KEY, value)
            .await
            .op("save_vaults")
        {
            tracing::error!(error = %e, "failed to save vaults");
            return self.fail(e);
        }
        self.vaults = record.vaults;
        Ok(())
    }

    /// Asks the folder picker for a vault folder. A cancelled pick returns
    /// `Ok(None)` and changes nothing.
    pub async fn add(&mut self) -> Result<Option<Vault>> {
        let picked = match self.picker.choose_folder().await.op("choose_folder") {
            Ok(picked) => picked,
            Err(e) => return self.fail(e),
        };
        match picked {
            Some(path) => self.add_path(path).await.map(Some),
            None => Ok(None),
        }
    }

    /// Registers `path` as a vault. An already registered folder is returned
    /// as is.
    pub async fn add_path(&mut self, path: PathBuf) -> Result<Vault> {
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return self.fail(WorkspaceError::InvalidPath("path is empty".to_string()));
        }
        if let Some(existing) = self.vaults.iter().find(|v| v.path == path) {
            return Ok(existing.clone());
        }

        let vault = Vault::new(path, self.vaults.is_empty());
        let mut next = self.vaults.clone();
        next.push(vault.clone());
        self.commit(next).await?;
        tracing::info!(vault = %vault.id, path = %vault.path.display(), "vault added");
        Ok(vault)
    }

    pub async fn set_default(&mut self, id: &VaultId) -> Result<()> {
        if self.get(id).is_none() {
            return self.fail(WorkspaceError::not_found("vault", id));
        }
        let next = self
            .vaults
            .iter()
            .cloned()
            .map(|mut v| {
                v.is_default = &v.id == id;
                v
            })
            .collect();
        self.commit(next).await
    }

    pub async fn remove(&mut self, id: &VaultId) -> Result<()> {
        if self.get(id).is_none() {
            return self.fail(WorkspaceError::not_found("vault", id));
        }
        // a removed default hands over to the first remaining vault
        let next = self.vaults.iter().filter(|v| &v.id != id).cloned().collect();
        self.commit(next).await?;
        tracing::info!(vault = %id, "vault removed");
        Ok(())
    }

    pub async fn rename(&mut self, id: &VaultId, name: &str) -> Result<()> {
        if self.get(id).is_none() {
            return self.fail(WorkspaceError::not_found("vault", id));
        }
        let name = name.trim();
        if name.is_empty() {
            return self.fail(WorkspaceError::InvalidName("vault name is empty".to_string()));
        }
        let next = self
            .vaults
            .iter()
            .cloned()
            .map(|mut v| {
                if &v.id == id {
                    v.name = name.to_string();
                }
                v
            })
            .collect();
        self.commit(next).await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/vaults.rs"]
mod tests;

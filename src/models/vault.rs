use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultId(String);

impl VaultId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VaultId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: VaultId,
    pub path: PathBuf,
    pub name: String,
    pub is_default: bool,
}

impl Vault {
    pub fn new(path: PathBuf, is_default: bool) -> Self {
        let name = folder_name(&path);
        Self {
            id: VaultId::generate(),
            path,
            name,
            is_default,
        }
    }
}

/// Last segment of a folder path, accepting either separator and a trailing
/// one.
pub fn folder_name(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    raw.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Repairs the single-default invariant in place: with several defaults the
/// first one wins, with none the first vault becomes default.
pub fn normalize_default(vaults: &mut [Vault]) {
    let winner = vaults
        .iter()
        .position(|v| v.is_default)
        .or(if vaults.is_empty() { None } else { Some(0) });
    for (i, vault) in vaults.iter_mut().enumerate() {
        vault.is_default = Some(i) == winner;
    }
}

/// Persisted layout of the vault list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultStore {
    #[serde(default)]
    pub vaults: Vec<Vault>,
}

#[cfg(test)]
#[path = "../../tests/unit/models/vault.rs"]
mod tests;

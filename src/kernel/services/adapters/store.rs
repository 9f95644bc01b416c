//! Key-value persistence adapters.
//!
//! `JsonFileStore` keeps one JSON object per store file, mapping key to
//! record. Writes go through a sibling temp file and a rename so a crash never
//! leaves a half written store behind.

use crate::kernel::services::ports::{BackendError, BackendResult, BoxFuture, KvStore, StoreName};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct JsonFileStore {
    dir: PathBuf,
    // serializes read-modify-write cycles on the store files
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store_path(&self, store: StoreName) -> PathBuf {
        self.dir.join(store.file_name())
    }

    async fn read_map(&self, store: StoreName) -> BackendResult<Map<String, Value>> {
        let path = self.store_path(store);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&data)? {
            Value::Object(map) => Ok(map),
            _ => Err(BackendError::new(format!(
                "{} is not a JSON object",
                path.display()
            ))),
        }
    }

    async fn write_map(&self, store: StoreName, map: Map<String, Value>) -> BackendResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.store_path(store);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn load<'a>(
        &'a self,
        store: StoreName,
        key: &'a str,
    ) -> BoxFuture<'a, BackendResult<Option<Value>>> {
        Box::pin(async move {
            let mut map = self.read_map(store).await?;
            Ok(map.remove(key))
        })
    }

    fn save<'a>(
        &'a self,
        store: StoreName,
        key: &'a str,
        record: Value,
    ) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut map = self.read_map(store).await?;
            map.insert(key.to_string(), record);
            self.write_map(store, map).await?;
            tracing::debug!(store = store.file_name(), key, "record saved");
            Ok(())
        })
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<FxHashMap<(StoreName, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, store: StoreName, key: &str) -> Option<Value> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.get(&(store, key.to_string())).cloned()
    }

    pub fn insert(&self, store: StoreName, key: &str, record: Value) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert((store, key.to_string()), record);
    }
}

impl KvStore for MemoryStore {
    fn load<'a>(
        &'a self,
        store: StoreName,
        key: &'a str,
    ) -> BoxFuture<'a, BackendResult<Option<Value>>> {
        Box::pin(async move { Ok(self.get(store, key)) })
    }

    fn save<'a>(
        &'a self,
        store: StoreName,
        key: &'a str,
        record: Value,
    ) -> BoxFuture<'a, BackendResult<()>> {
        Box::pin(async move {
            self.insert(store, key, record);
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/store.rs"]
mod tests;

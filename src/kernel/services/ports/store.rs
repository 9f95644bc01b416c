//! Key-value persistence capability.

use super::error::BackendResult;
use super::runtime::BoxFuture;
use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoreName {
    Vaults,
    Tabs,
    Settings,
    Templates,
}

impl StoreName {
    pub fn file_name(self) -> &'static str {
        match self {
            StoreName::Vaults => "vaults.json",
            StoreName::Tabs => "tabs.json",
            StoreName::Settings => "settings.json",
            StoreName::Templates => "templates.json",
        }
    }
}

/// Key used by single-record stores.
pub const DATA_KEY: &str = "data";

pub trait KvStore: Send + Sync {
    fn load<'a>(&'a self, store: StoreName, key: &'a str)
        -> BoxFuture<'a, BackendResult<Option<Value>>>;

    fn save<'a>(
        &'a self,
        store: StoreName,
        key: &'a str,
        record: Value,
    ) -> BoxFuture<'a, BackendResult<()>>;
}

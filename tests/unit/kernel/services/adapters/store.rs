use super::*;
use crate::kernel::services::ports::store::DATA_KEY;
use serde_json::json;

#[tokio::test]
async fn missing_store_file_loads_as_none() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let store = JsonFileStore::new(dir.path());

    let record = store.load(StoreName::Vaults, DATA_KEY).await.unwrap();
    assert_eq!(record, None);
}

#[tokio::test]
async fn saved_record_is_loaded_back_by_key() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let store = JsonFileStore::new(dir.path());

    store
        .save(StoreName::Tabs, "vault-a", json!({"tabs": [], "activeTabId": null}))
        .await
        .unwrap();
    store
        .save(StoreName::Tabs, "vault-b", json!({"tabs": [1]}))
        .await
        .unwrap();

    let a = store.load(StoreName::Tabs, "vault-a").await.unwrap();
    let b = store.load(StoreName::Tabs, "vault-b").await.unwrap();
    assert_eq!(a, Some(json!({"tabs": [], "activeTabId": null})));
    assert_eq!(b, Some(json!({"tabs": [1]})));

    // other stores live in other files
    assert_eq!(store.load(StoreName::Vaults, "vault-a").await.unwrap(), None);
    assert!(store.store_path(StoreName::Tabs).exists());
    assert!(!store.store_path(StoreName::Vaults).exists());
}

#[tokio::test]
async fn save_overwrites_existing_key_without_leaving_temp_files() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let store = JsonFileStore::new(dir.path().join("nested"));

    store.save(StoreName::Settings, DATA_KEY, json!(1)).await.unwrap();
    store.save(StoreName::Settings, DATA_KEY, json!(2)).await.unwrap();

    assert_eq!(
        store.load(StoreName::Settings, DATA_KEY).await.unwrap(),
        Some(json!(2))
    );
    let leftovers: Vec<_> = std::fs::read_dir(store.dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn corrupt_store_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let store = JsonFileStore::new(dir.path());
    std::fs::write(store.store_path(StoreName::Vaults), "{not json").unwrap();

    let err = store.load(StoreName::Vaults, DATA_KEY).await.unwrap_err();
    assert!(err.message.contains("invalid record"));

    std::fs::write(store.store_path(StoreName::Vaults), "[1, 2]").unwrap();
    let err = store.load(StoreName::Vaults, DATA_KEY).await.unwrap_err();
    assert!(err.message.contains("not a JSON object"));
}

#[tokio::test]
async fn memory_store_round_trips_records() {
    let store = MemoryStore::new();
    assert_eq!(store.load(StoreName::Templates, DATA_KEY).await.unwrap(), None);

    store
        .save(StoreName::Templates, DATA_KEY, json!({"/v/daily": "# Daily"}))
        .await
        .unwrap();
    assert_eq!(
        store.get(StoreName::Templates, DATA_KEY),
        Some(json!({"/v/daily": "# Daily"}))
    );
}

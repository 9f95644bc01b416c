use super::*;
use crate::test_support::{FlakyStore, QueuedPicker};
use serde_json::json;

struct Fixture {
    store: Arc<FlakyStore>,
    picker: Arc<QueuedPicker>,
    vaults: VaultRegistry,
}

fn fixture() -> Fixture {
    let store = Arc::new(FlakyStore::new());
    let picker = Arc::new(QueuedPicker::new());
    let vaults = VaultRegistry::new(store.clone(), picker.clone());
    Fixture {
        store,
        picker,
        vaults,
    }
}

fn defaults(vaults: &VaultRegistry) -> usize {
    vaults.vaults().iter().filter(|v| v.is_default).count()
}

#[tokio::test]
async fn first_added_vault_becomes_default() {
    let mut f = fixture();
    f.picker.push(Some("/home/me/Notes"));
    f.picker.push(Some("/home/me/Work/"));

    let first = f.vaults.add().await.unwrap().unwrap();
    let second = f.vaults.add().await.unwrap().unwrap();

    assert!(first.is_default);
    assert!(!second.is_default);
    assert_eq!(first.name, "Notes");
    assert_eq!(second.name, "Work");
    assert_ne!(first.id, second.id);
    assert_eq!(f.vaults.current_vault().map(|v| &v.id), Some(&first.id));
}

#[tokio::test]
async fn cancelled_pick_changes_nothing() {
    let mut f = fixture();
    f.picker.push(None);

    assert_eq!(f.vaults.add().await.unwrap(), None);
    assert!(f.vaults.vaults().is_empty());
    assert_eq!(f.store.saves(), 0);
}

#[tokio::test]
async fn adding_a_registered_folder_returns_the_existing_vault() {
    let mut f = fixture();
    let first = f.vaults.add_path("/notes".into()).await.unwrap();
    let again = f.vaults.add_path("/notes".into()).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(f.vaults.vaults().len(), 1);
}

#[tokio::test]
async fn set_default_moves_the_flag() {
    let mut f = fixture();
    let a = f.vaults.add_path("/a".into()).await.unwrap();
    let b = f.vaults.add_path("/b".into()).await.unwrap();

    f.vaults.set_default(&b.id).await.unwrap();
    assert_eq!(f.vaults.current_vault().map(|v| &v.id), Some(&b.id));
    assert_eq!(defaults(&f.vaults), 1);
    assert!(!f.vaults.get(&a.id).unwrap().is_default);

    let err = f.vaults.set_default(&VaultId::from("missing")).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::NotFound { what: "vault", .. }));
}

#[tokio::test]
async fn removing_the_default_promotes_the_first_remaining() {
    let mut f = fixture();
    let a = f.vaults.add_path("/a".into()).await.unwrap();
    let b = f.vaults.add_path("/b".into()).await.unwrap();
    let c = f.vaults.add_path("/c".into()).await.unwrap();
    f.vaults.set_default(&c.id).await.unwrap();

    f.vaults.remove(&c.id).await.unwrap();
    assert_eq!(f.vaults.current_vault().map(|v| &v.id), Some(&a.id));

    f.vaults.remove(&a.id).await.unwrap();
    assert_eq!(f.vaults.current_vault().map(|v| &v.id), Some(&b.id));
}

#[tokio::test]
async fn removing_the_only_vault_leaves_no_current_vault() {
    let mut f = fixture();
    let only = f.vaults.add_path("/only".into()).await.unwrap();

    f.vaults.remove(&only.id).await.unwrap();
    assert!(f.vaults.vaults().is_empty());
    assert!(f.vaults.current_vault().is_none());

    let err = f.vaults.remove(&only.id).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::NotFound { .. }));
}

#[tokio::test]
async fn single_default_holds_across_mutations() {
    let mut f = fixture();
    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(f.vaults.add_path(format!("/v{i}").into()).await.unwrap().id);
        assert_eq!(defaults(&f.vaults), 1);
    }
    f.vaults.set_default(&ids[2]).await.unwrap();
    assert_eq!(defaults(&f.vaults), 1);
    f.vaults.remove(&ids[2]).await.unwrap();
    assert_eq!(defaults(&f.vaults), 1);
    f.vaults.remove(&ids[0]).await.unwrap();
    assert_eq!(defaults(&f.vaults), 1);
}

#[tokio::test]
async fn rename_trims_and_rejects_blank_names() {
    let mut f = fixture();
    let v = f.vaults.add_path("/notes".into()).await.unwrap();

    f.vaults.rename(&v.id, "  Journal ").await.unwrap();
    assert_eq!(f.vaults.get(&v.id).unwrap().name, "Journal");

    let err = f.vaults.rename(&v.id, "   ").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::InvalidName(_)));
    assert_eq!(f.vaults.get(&v.id).unwrap().name, "Journal");
}

#[tokio::test]
async fn failed_save_keeps_the_previous_list() {
    let mut f = fixture();
    let a = f.vaults.add_path("/a".into()).await.unwrap();
    f.store.set_fail_saves(true);

    let err = f.vaults.add_path("/b".into()).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Io { op: "save_vaults", .. }));
    assert_eq!(f.vaults.vaults().len(), 1);
    assert_eq!(f.vaults.error(), Some(&err));

    assert!(f.vaults.remove(&a.id).await.is_err());
    assert_eq!(f.vaults.current_vault().map(|v| &v.id), Some(&a.id));
}

#[tokio::test]
async fn load_repairs_the_default_flag() {
    let mut f = fixture();
    f.store.inner.insert(
        StoreName::Vaults,
        DATA_KEY,
        json!({"vaults": [
            {"id": "1", "path": "/a", "name": "a", "isDefault": false},
            {"id": "2", "path": "/b", "name": "b", "isDefault": true},
            {"id": "3", "path": "/c", "name": "c", "isDefault": true},
        ]}),
    );

    f.vaults.load().await.unwrap();
    assert_eq!(f.vaults.vaults().len(), 3);
    assert_eq!(defaults(&f.vaults), 1);
    assert_eq!(f.vaults.current_vault().unwrap().id, VaultId::from("2"));
}

#[tokio::test]
async fn load_round_trips_saved_vaults() {
    let mut f = fixture();
    let a = f.vaults.add_path("/a".into()).await.unwrap();

    let mut reloaded = VaultRegistry::new(f.store.clone(), f.picker.clone());
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.vaults(), &[a]);
}

#[tokio::test]
async fn load_failure_leaves_an_empty_list() {
    let mut f = fixture();
    f.store.set_fail_loads(true);

    let err = f.vaults.load().await.unwrap_err();
    assert!(err.is_io());
    assert!(f.vaults.vaults().is_empty());
    assert!(!f.vaults.is_loading());
}

use super::*;

fn tab(name: &str, opened_at: u64) -> Tab {
    Tab::from_node(&Node::file(format!("/v/{name}")), opened_at)
}

#[test]
fn test_no_eviction_within_bound() {
    let tabs = vec![tab("a.md", 1), tab("b.md", 2)];
    assert!(eviction_candidates(&tabs, 2, None).is_empty());
}

#[test]
fn test_evicts_oldest_first() {
    let tabs = vec![tab("c.md", 30), tab("a.md", 10), tab("b.md", 20)];
    let evicted = eviction_candidates(&tabs, 1, None);
    assert_eq!(evicted, vec![tabs[1].id.clone(), tabs[2].id.clone()]);
}

#[test]
fn test_protected_tab_is_never_evicted() {
    let tabs = vec![tab("a.md", 10), tab("b.md", 20), tab("c.md", 30)];
    let evicted = eviction_candidates(&tabs, 2, Some(&tabs[0].id));
    assert_eq!(evicted, vec![tabs[1].id.clone()]);
}

#[test]
fn test_tab_round_trips_to_node() {
    let node = Node::file("/v/a.md");
    let tab = Tab::from_node(&node, 7);
    assert_eq!(tab.to_node(), node);
}

#[test]
fn test_serialized_shape() {
    let record = VaultTabs {
        vault_id: VaultId::from("v1"),
        tabs: vec![tab("a.md", 5)],
        active_tab_id: None,
    };
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["vaultId"], "v1");
    assert_eq!(value["tabs"][0]["openedAt"], 5);
    assert!(value["activeTabId"].is_null());

    let empty: VaultTabs = serde_json::from_value(serde_json::json!({"vaultId": "v2"})).unwrap();
    assert_eq!(empty, VaultTabs::empty(VaultId::from("v2")));
}

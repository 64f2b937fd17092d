use super::*;
use serde_json::json;
use std::cell::Cell;

fn id(raw: &str) -> NodeId {
    NodeId::from(raw)
}

fn sample_store() -> (NodeStore, Arc<LayoutPages>) {
    let store = NodeStore::default();
    let tree = Arc::new(LayoutPages::new());
    store.reset(Arc::clone(&tree));
    store.add_pages([PageData::new("page1"), PageData::new("page2")], &tree);
    store.add_nodes(
        [
            NodeData::new("Group", "RepeatingGroup", "page1").with_pagination(2),
            NodeData::new("Name-0", "Input", "page1").with_parent("Group", Some(0)),
            NodeData::new("Name-1", "Input", "page1").with_parent("Group", Some(1)),
            NodeData::new("Box-2", "Group", "page1").with_parent("Group", Some(2)),
            NodeData::new("Field-2", "Input", "page1").with_parent("Box-2", None),
            NodeData::new("other", "Input", "page2"),
        ],
        &tree,
    );
    (store, tree)
}

fn count_commits(store: &NodeStore) -> (Rc<Cell<usize>>, Subscription) {
    let commits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&commits);
    let subscription = store.subscribe(move || counter.set(counter.get() + 1));
    (commits, subscription)
}

#[test]
fn pagination_hides_rows_outside_the_current_page() {
    let (store, _tree) = sample_store();
    assert_eq!(store.hidden_reason("Name-0"), Ok(None));
    assert_eq!(store.hidden_reason("Name-1"), Ok(None));
    assert_eq!(
        store.hidden_reason("Box-2"),
        Ok(Some(HiddenReason::Container { parent: id("Group") }))
    );
    assert_eq!(
        store.hidden_reason("Field-2"),
        Ok(Some(HiddenReason::Inherited { from: id("Box-2") }))
    );

    assert_eq!(
        store.set_node_props([NodePropPatch::new("Group").pagination_page(1)]),
        Ok(true)
    );
    assert_eq!(store.is_hidden("Name-0"), Ok(true));
    assert_eq!(store.is_hidden("Box-2"), Ok(false));
    assert_eq!(store.is_hidden("Field-2"), Ok(false));
}

#[test]
fn hidden_cascade_checks_page_then_flag_then_rules() {
    let (store, _tree) = sample_store();
    store.set_page_hidden("page2", true).unwrap();
    store
        .set_node_props([NodePropPatch::new("Name-0").hidden(Some(true))])
        .unwrap();
    store.mark_hidden_via_rule([(id("Name-1"), true), (id("other"), true)]);

    assert_eq!(
        store.hidden_reason("other"),
        Ok(Some(HiddenReason::Page { key: "page2".into() }))
    );
    assert_eq!(store.hidden_reason("Name-0"), Ok(Some(HiddenReason::Explicit)));
    assert_eq!(store.hidden_reason("Name-1"), Ok(Some(HiddenReason::Rule)));

    store.mark_hidden_via_rule([(id("Group"), true)]);
    assert_eq!(store.hidden_reason("Name-1"), Ok(Some(HiddenReason::Inherited { from: id("Group") })));
    assert_eq!(store.hidden_reason("Group"), Ok(Some(HiddenReason::Rule)));

    store.set_force_visible(true);
    for node in ["Group", "Name-0", "Name-1", "Box-2", "Field-2", "other"] {
        assert_eq!(store.is_hidden(node), Ok(false), "{node}");
    }
}

#[test]
fn pages_left_out_of_the_order_hide_their_nodes() {
    let (store, _tree) = sample_store();
    assert!(store.set_page_order(&["page1"]));
    assert_eq!(
        store.hidden_reason("other"),
        Ok(Some(HiddenReason::Page { key: "page2".into() }))
    );
    assert!(!store.set_page_order(&["page1"]));
}

#[test]
fn unknown_ids_are_contract_errors() {
    let (store, _tree) = sample_store();
    assert_eq!(store.is_hidden("nope"), Err(StoreError::UnknownNode { id: id("nope") }));
    assert_eq!(
        store.add_error("required", "nope", ErrorKind::Node),
        Err(StoreError::UnknownNode { id: id("nope") })
    );
    assert_eq!(
        store.set_page_hidden("nope", true),
        Err(StoreError::UnknownPage { key: "nope".into() })
    );
}

#[test]
fn identical_props_do_not_notify() {
    let (store, _tree) = sample_store();
    let (commits, _subscription) = count_commits(&store);

    assert_eq!(
        store.set_node_props([NodePropPatch::new("Name-0").hidden(None)]),
        Ok(false)
    );
    assert_eq!(commits.get(), 0);

    let patch = NodePropPatch::new("Name-0").plugin("validations", json!(["required"]));
    assert_eq!(store.set_node_props([patch.clone()]), Ok(true));
    assert_eq!(store.set_node_props([patch]), Ok(false));
    assert_eq!(commits.get(), 1);
    assert_eq!(
        store.node("Name-0").unwrap().plugins["validations"],
        json!(["required"])
    );
}

#[test]
fn prop_batches_apply_all_or_nothing() {
    let (store, _tree) = sample_store();
    let (commits, _subscription) = count_commits(&store);
    let result = store.set_node_props([
        NodePropPatch::new("Name-0").hidden(Some(true)),
        NodePropPatch::new("ghost").hidden(Some(true)),
    ]);
    assert_eq!(result, Err(StoreError::UnknownNode { id: id("ghost") }));
    assert_eq!(store.node("Name-0").unwrap().hidden, None);

    let result = store.set_node_props([NodePropPatch::new("Name-0").pagination_page(3)]);
    assert_eq!(
        result,
        Err(StoreError::Unsupported {
            id: id("Name-0"),
            node_type: "Input".into(),
            feature: "pagination",
        })
    );
    assert_eq!(commits.get(), 0);
}

#[test]
fn removal_cascades_to_descendants() {
    let (store, tree) = sample_store();
    assert_eq!(store.remove_nodes(&[id("Group")], &tree), 5);
    store.with_state(|state| {
        assert_eq!(state.len(), 1);
        assert!(state.contains("other"));
    });
}

#[test]
fn stale_removal_after_reset_is_dropped() {
    let (store, old_tree) = sample_store();
    let new_tree = Arc::new(LayoutPages::new());
    store.reset(Arc::clone(&new_tree));
    store.add_nodes([NodeData::new("Name-0", "Input", "page1")], &new_tree);

    let (commits, _subscription) = count_commits(&store);
    assert_eq!(store.remove_nodes(&[id("Name-0")], &old_tree), 0);
    assert!(store.node("Name-0").is_some());
    assert_eq!(commits.get(), 0);

    assert_eq!(store.remove_nodes(&[id("Name-0")], &new_tree), 1);
    assert!(store.node("Name-0").is_none());
}

#[test]
fn stale_additions_after_reset_are_dropped() {
    let (store, old_tree) = sample_store();
    let new_tree = Arc::new(LayoutPages::new());
    store.reset(Arc::clone(&new_tree));

    let (commits, _subscription) = count_commits(&store);
    assert!(!store.add_nodes([NodeData::new("Name-0", "Input", "page1")], &old_tree));
    assert!(!store.add_pages([PageData::new("page1")], &old_tree));
    assert_eq!(commits.get(), 0);
    store.with_state(|state| {
        assert!(state.is_empty());
        assert!(state.pages().is_empty());
    });

    assert!(store.add_nodes([NodeData::new("Name-0", "Input", "page1")], &new_tree));
    assert!(store.node("Name-0").is_some());
    assert_eq!(commits.get(), 1);
}

#[test]
fn equal_rule_results_do_not_commit() {
    let (store, _tree) = sample_store();
    assert!(store.mark_hidden_via_rule([(id("Name-0"), true), (id("Name-1"), false)]));
    let (commits, _subscription) = count_commits(&store);
    assert!(!store.mark_hidden_via_rule([(id("Name-0"), true)]));
    assert_eq!(commits.get(), 0);
}

#[test]
fn errors_show_up_in_diagnostics() {
    let (store, _tree) = sample_store();
    assert!(store.diagnostics().is_empty());
    assert_eq!(store.add_error("required", "Name-0", ErrorKind::Node), Ok(true));
    assert_eq!(store.add_error("required", "Name-0", ErrorKind::Node), Ok(false));
    assert_eq!(store.add_error("order", "page2", ErrorKind::Page), Ok(true));

    let diagnostics = store.diagnostics();
    assert_eq!(diagnostics.nodes.len(), 1);
    assert!(diagnostics.nodes[&id("Name-0")].contains("required"));
    assert!(diagnostics.pages["page2"].contains("order"));
}

#[test]
fn reset_starts_a_new_generation() {
    let (store, _tree) = sample_store();
    store.set_force_visible(true);
    let generation = store.generation();
    store.reset(Arc::new(LayoutPages::new()));
    assert_eq!(store.generation(), generation + 1);
    store.with_state(|state| {
        assert!(state.is_empty());
        assert!(state.pages().is_empty());
        assert!(state.force_visible());
    });
}

#[test]
fn dropped_subscription_is_not_notified() {
    let (store, _tree) = sample_store();
    let (commits, subscription) = count_commits(&store);
    store.set_force_visible(true);
    drop(subscription);
    store.set_force_visible(false);
    assert_eq!(commits.get(), 1);
}

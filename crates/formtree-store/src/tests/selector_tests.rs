use super::*;
use crate::{NodeData, NodePropPatch, NodeStore, NodesState};
use formtree_layout::LayoutPages;
use std::cell::Cell;
use std::sync::Arc;

type HiddenSelector<O> = DelayedSelector<O, String, Option<bool>>;

fn store() -> NodeStore {
    let store = NodeStore::default();
    let tree = Arc::new(LayoutPages::new());
    store.reset(Arc::clone(&tree));
    store.add_nodes(
        [
            NodeData::new("a", "Input", "page1"),
            NodeData::new("b", "Input", "page1"),
        ],
        &tree,
    );
    store
}

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

fn hidden_config(runs: &Rc<Cell<usize>>) -> DelayedSelectorConfig<NodesState, String, Option<bool>> {
    let runs = Rc::clone(runs);
    DelayedSelectorConfig::new(move |state: &NodesState, key: &String| {
        runs.set(runs.get() + 1);
        state.node(key).and_then(|node| node.hidden)
    })
}

fn hide(store: &NodeStore, id: &str) {
    store
        .set_node_props([NodePropPatch::new(id).hidden(Some(true))])
        .unwrap();
}

#[derive(Clone)]
struct SpyStore {
    store: NodeStore,
    subscribes: Rc<Cell<usize>>,
}

impl Observable for SpyStore {
    type State = NodesState;

    fn with_state<R>(&self, f: impl FnOnce(&NodesState) -> R) -> R {
        self.store.with_state(f)
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.subscribes.set(self.subscribes.get() + 1);
        Observable::subscribe(&self.store, listener)
    }
}

#[test]
fn repeated_reads_run_the_selector_once() {
    let store = store();
    let runs = counter();
    let selector: HiddenSelector<NodeStore> =
        DelayedSelector::new(hidden_config(&runs), Some(store), || {});

    assert_eq!(selector.select("a".into()), Ok(Selected::Value(None)));
    assert_eq!(selector.select("a".into()), Ok(Selected::Value(None)));
    assert_eq!(runs.get(), 1);
    assert_eq!(selector.cache_len(), 1);
}

#[test]
fn changed_value_invalidates_the_whole_cache() {
    let store = store();
    let runs = counter();
    let invalidations = counter();
    let on_invalidate = Rc::clone(&invalidations);
    let selector: HiddenSelector<NodeStore> = DelayedSelector::new(
        hidden_config(&runs),
        Some(store.clone()),
        move || on_invalidate.set(on_invalidate.get() + 1),
    );

    selector.select("a".into()).unwrap();
    selector.select("b".into()).unwrap();
    assert_eq!(selector.cache_len(), 2);

    hide(&store, "a");
    assert_eq!(invalidations.get(), 1);
    assert_eq!(selector.cache_len(), 0);

    let runs_before = runs.get();
    assert_eq!(selector.select("a".into()), Ok(Selected::Value(Some(true))));
    assert_eq!(runs.get(), runs_before + 1);
}

#[test]
fn unrelated_commit_keeps_the_cache() {
    let store = store();
    let runs = counter();
    let invalidations = counter();
    let on_invalidate = Rc::clone(&invalidations);
    let selector: HiddenSelector<NodeStore> = DelayedSelector::new(
        hidden_config(&runs),
        Some(store.clone()),
        move || on_invalidate.set(on_invalidate.get() + 1),
    );

    selector.select("a".into()).unwrap();
    hide(&store, "b");
    assert_eq!(invalidations.get(), 0);
    assert_eq!(selector.cache_len(), 1);
    // one initial run plus one replay
    assert_eq!(runs.get(), 2);
}

#[test]
fn consumer_that_never_reads_never_subscribes() {
    let store = store();
    let spy = SpyStore {
        store: store.clone(),
        subscribes: counter(),
    };
    let invalidations = counter();
    let on_invalidate = Rc::clone(&invalidations);
    let selector: HiddenSelector<SpyStore> = DelayedSelector::new(
        hidden_config(&counter()),
        Some(spy.clone()),
        move || on_invalidate.set(on_invalidate.get() + 1),
    );

    hide(&store, "a");
    assert_eq!(spy.subscribes.get(), 0);
    assert!(!selector.is_subscribed());
    assert_eq!(invalidations.get(), 0);

    selector.select("a".into()).unwrap();
    selector.select("b".into()).unwrap();
    assert_eq!(spy.subscribes.get(), 1);
    assert!(selector.is_subscribed());
}

#[test]
fn strictness_decides_reads_without_a_store() {
    let strict: HiddenSelector<NodeStore> =
        DelayedSelector::new(hidden_config(&counter()), None, || {});
    assert_eq!(strict.select("a".into()), Err(SelectorError::StoreNotProvided));

    let lax: HiddenSelector<NodeStore> = DelayedSelector::new(
        hidden_config(&counter()).strictness(Strictness::Lax),
        None,
        || {},
    );
    assert_eq!(lax.select("a".into()), Ok(Selected::NotProvided));
    assert!(!lax.is_subscribed());

    let store = store();
    hide(&store, "a");
    lax.attach(store);
    assert_eq!(lax.select("a".into()).unwrap().value(), Some(Some(true)));
    assert!(lax.is_subscribed());
}

#[test]
fn gate_skips_replay_until_its_probe_changes() {
    let store = store();
    let invalidations = counter();
    let on_invalidate = Rc::clone(&invalidations);
    let config = hidden_config(&counter())
        .only_rerender_when(WhenChanged::new(|state: &NodesState| state.force_visible()));
    let selector: HiddenSelector<NodeStore> = DelayedSelector::new(
        config,
        Some(store.clone()),
        move || on_invalidate.set(on_invalidate.get() + 1),
    );

    selector.select("a".into()).unwrap();
    hide(&store, "a");
    assert_eq!(invalidations.get(), 0);
    assert_eq!(selector.select("a".into()), Ok(Selected::Value(None)));

    store.set_force_visible(true);
    assert_eq!(invalidations.get(), 1);
    assert_eq!(selector.select("a".into()), Ok(Selected::Value(Some(true))));
}

#[test]
fn select_with_uses_the_given_selector() {
    let store = store();
    let selector: DelayedSelector<NodeStore, &'static str, usize> = DelayedSelector::new(
        DelayedSelectorConfig::new(|state: &NodesState, _key: &&'static str| state.len()),
        Some(store.clone()),
        || {},
    );
    let hidden = selector
        .select_with("hidden-count", |state: &NodesState| {
            state.nodes().filter(|node| node.hidden == Some(true)).count()
        })
        .unwrap();
    assert_eq!(hidden, Selected::Value(0));
    assert_eq!(selector.select("total"), Ok(Selected::Value(2)));
}

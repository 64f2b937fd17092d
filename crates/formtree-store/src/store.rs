//! The reactive node store.
//!
//! A [`NodeStore`] is a cheap-clone, single-threaded handle. Every mutation is
//! one synchronous commit: the state is changed under a borrow, the borrow is
//! released, and then every subscribed listener runs. Mutations that turn out
//! to change nothing do not commit and do not notify.

use crate::behavior::ComponentRegistry;
use crate::error::StoreError;
use crate::node_data::{Diagnostics, ErrorKind, HiddenReason, NodeData, NodeProp, NodePropPatch, PageData};
use crate::observable::{ListenerRegistry, Observable, Subscription};
use crate::state::NodesState;
use crate::wait::WaitFor;
use formtree_layout::collections::NodeSet;
use formtree_layout::{LayoutPages, NodeId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct NodeStoreConfig {
    /// Container behaviors by component type.
    pub registry: ComponentRegistry,
    /// Start with the developer force-visible override on.
    pub force_visible: bool,
}

struct StoreInner {
    state: RefCell<NodesState>,
    listeners: ListenerRegistry,
}

#[derive(Clone)]
pub struct NodeStore {
    inner: Rc<StoreInner>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new(NodeStoreConfig::default())
    }
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore")
            .field("state", &*self.inner.state.borrow())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl NodeStore {
    pub fn new(config: NodeStoreConfig) -> Self {
        let state = NodesState::new(Rc::new(config.registry), config.force_visible);
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Applies `mutation` and commits when it reports a change.
    fn mutate(&self, mutation: impl FnOnce(&mut NodesState) -> bool) -> bool {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let changed = mutation(&mut state);
            if changed {
                state.touch();
                log::trace!("node store commit {}", state.commit);
            }
            changed
        };
        if changed {
            self.inner.listeners.notify();
        }
        changed
    }

    /// Adds nodes; an existing id is replaced.
    ///
    /// `guard` is the tree the batch was computed against. A batch for a tree
    /// the store has since moved away from is stale and dropped.
    pub fn add_nodes(
        &self,
        batch: impl IntoIterator<Item = NodeData>,
        guard: &Arc<LayoutPages>,
    ) -> bool {
        self.mutate(|state| {
            if !is_current(state, guard, "addition of nodes") {
                return false;
            }
            insert_nodes(state, batch)
        })
    }

    /// Adds pages; an existing key is replaced. Guarded like
    /// [`NodeStore::add_nodes`].
    pub fn add_pages(
        &self,
        batch: impl IntoIterator<Item = PageData>,
        guard: &Arc<LayoutPages>,
    ) -> bool {
        self.mutate(|state| {
            if !is_current(state, guard, "addition of pages") {
                return false;
            }
            let mut changed = false;
            for page in batch {
                match state.page_mut(&page.page_key) {
                    Some(existing) if *existing == page => {}
                    Some(existing) => {
                        *existing = page;
                        changed = true;
                    }
                    None => {
                        state.pages.push(page);
                        changed = true;
                    }
                }
            }
            changed
        })
    }

    /// Removes `ids` and every descendant of them.
    ///
    /// Guarded like [`NodeStore::add_nodes`]: a removal computed against an
    /// older tree is dropped. Returns how many nodes were removed.
    pub fn remove_nodes(&self, ids: &[NodeId], guard: &Arc<LayoutPages>) -> usize {
        let mut removed = 0;
        self.mutate(|state| {
            if !is_current(state, guard, "removal") {
                return false;
            }
            removed = remove_with_descendants(state, ids.iter().cloned());
            removed > 0
        });
        removed
    }

    /// Commits one generation for `tree` in a single commit.
    ///
    /// With `reset` the store starts over with `pages` and `nodes`. Otherwise
    /// the tree reference advances, absent pages and nodes are added, and
    /// nodes missing from `nodes` are removed with their descendants.
    /// Returns how many nodes were added and removed.
    pub(crate) fn commit_generation(
        &self,
        tree: Arc<LayoutPages>,
        reset: bool,
        pages: Vec<PageData>,
        nodes: Vec<NodeData>,
    ) -> (usize, usize) {
        let (mut added, mut removed) = (0, 0);
        self.mutate(|state| {
            let mut changed = true;
            if reset {
                clear(state, tree);
            } else {
                changed = !state.tree.as_ref().is_some_and(|current| Arc::ptr_eq(current, &tree));
                state.tree = Some(tree);
            }

            let fresh: NodeSet = nodes.iter().map(|node| node.id.clone()).collect();
            for page in pages {
                if state.page(&page.page_key).is_none() {
                    state.pages.push(page);
                    changed = true;
                }
            }
            for node in nodes {
                if !state.nodes.contains_key(&node.id) {
                    state.nodes.insert(node.id.clone(), node);
                    added += 1;
                }
            }
            if !reset {
                let stale: Vec<NodeId> = state
                    .nodes
                    .keys()
                    .filter(|id| !fresh.contains(*id))
                    .cloned()
                    .collect();
                removed = remove_with_descendants(state, stale);
            }
            changed || added > 0 || removed > 0
        });
        (added, removed)
    }

    /// Patches nodes shallowly.
    ///
    /// The whole batch is validated before anything is applied; an unknown
    /// id or an unsupported prop fails the batch. Returns whether anything
    /// changed.
    pub fn set_node_props(
        &self,
        batch: impl IntoIterator<Item = NodePropPatch>,
    ) -> Result<bool, StoreError> {
        let batch: Vec<NodePropPatch> = batch.into_iter().collect();
        {
            let state = self.inner.state.borrow();
            for patch in &batch {
                let node = state.node(&patch.id).ok_or_else(|| StoreError::UnknownNode {
                    id: patch.id.clone(),
                })?;
                let paginates = patch
                    .props
                    .iter()
                    .any(|prop| matches!(prop, NodeProp::PaginationPage(_)));
                if paginates && node.pagination.is_none() {
                    return Err(StoreError::Unsupported {
                        id: patch.id.clone(),
                        node_type: node.node_type.clone(),
                        feature: "pagination",
                    });
                }
            }
        }

        Ok(self.mutate(|state| {
            let mut changed = false;
            for patch in batch {
                let Some(node) = state.nodes.get_mut(&patch.id) else {
                    continue;
                };
                for prop in patch.props {
                    changed |= apply_prop(node, prop);
                }
            }
            changed
        }))
    }

    /// Replaces the rule-hidden set with the ids mapped to `true`.
    pub fn mark_hidden_via_rule(&self, results: impl IntoIterator<Item = (NodeId, bool)>) -> bool {
        let hidden: NodeSet = results
            .into_iter()
            .filter_map(|(id, hidden)| hidden.then_some(id))
            .collect();
        self.mutate(|state| {
            if state.hidden_via_rule == hidden {
                return false;
            }
            state.hidden_via_rule = hidden;
            true
        })
    }

    /// Adds the error `key` to a node or a page.
    pub fn add_error(&self, key: &str, target: &str, kind: ErrorKind) -> Result<bool, StoreError> {
        {
            let state = self.inner.state.borrow();
            match kind {
                ErrorKind::Node if !state.contains(target) => {
                    return Err(StoreError::UnknownNode {
                        id: NodeId::from(target),
                    })
                }
                ErrorKind::Page if state.page(target).is_none() => {
                    return Err(StoreError::UnknownPage {
                        key: target.to_owned(),
                    })
                }
                _ => {}
            }
        }
        Ok(self.mutate(|state| {
            let errors = match kind {
                ErrorKind::Node => state.nodes.get_mut(target).map(|node| &mut node.errors),
                ErrorKind::Page => state.page_mut(target).map(|page| &mut page.errors),
            };
            errors.is_some_and(|errors| errors.insert(key.to_owned()))
        }))
    }

    pub fn set_page_hidden(&self, key: &str, hidden: bool) -> Result<bool, StoreError> {
        if self.inner.state.borrow().page(key).is_none() {
            return Err(StoreError::UnknownPage {
                key: key.to_owned(),
            });
        }
        Ok(self.mutate(|state| match state.page_mut(key) {
            Some(page) if page.hidden != hidden => {
                page.hidden = hidden;
                true
            }
            _ => false,
        }))
    }

    /// Pages named in `order` are in order; every other page is not.
    pub fn set_page_order<S: AsRef<str>>(&self, order: &[S]) -> bool {
        self.mutate(|state| {
            let mut changed = false;
            for page in &mut state.pages {
                let in_order = order.iter().any(|key| key.as_ref() == page.page_key);
                if page.in_order != in_order {
                    page.in_order = in_order;
                    changed = true;
                }
            }
            changed
        })
    }

    /// Developer override that makes every node visible.
    pub fn set_force_visible(&self, force_visible: bool) -> bool {
        self.mutate(|state| {
            if state.force_visible == force_visible {
                return false;
            }
            state.force_visible = force_visible;
            true
        })
    }

    /// Discards every node, page and rule result and starts a new generation
    /// for `tree`. The force-visible override survives.
    pub fn reset(&self, tree: Arc<LayoutPages>) {
        self.mutate(|state| {
            clear(state, tree);
            true
        });
    }

    /// Moves to a regenerated tree for the same layout without discarding
    /// any node.
    pub fn set_tree(&self, tree: Arc<LayoutPages>) -> bool {
        self.mutate(|state| {
            if state.tree.as_ref().is_some_and(|current| Arc::ptr_eq(current, &tree)) {
                return false;
            }
            state.tree = Some(tree);
            true
        })
    }

    pub fn tree(&self) -> Option<Arc<LayoutPages>> {
        self.inner.state.borrow().tree.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.borrow().generation
    }

    pub fn node(&self, id: &str) -> Option<NodeData> {
        self.inner.state.borrow().node(id).cloned()
    }

    pub fn is_hidden(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.state.borrow().is_hidden(id)
    }

    pub fn hidden_reason(&self, id: &str) -> Result<Option<HiddenReason>, StoreError> {
        self.inner.state.borrow().hidden_reason(id)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.inner.state.borrow().diagnostics()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.inner.listeners.subscribe(Rc::new(listener))
    }

    /// Resolves once `predicate` holds for the store state. The predicate is
    /// checked when polled, and the future is woken after every commit.
    pub fn wait_for<P>(&self, predicate: P) -> WaitFor<P>
    where
        P: Fn(&NodesState) -> bool,
    {
        WaitFor::new(self.clone(), predicate)
    }
}

fn is_current(state: &NodesState, guard: &Arc<LayoutPages>, what: &str) -> bool {
    let current = state.tree.as_ref().is_some_and(|tree| Arc::ptr_eq(tree, guard));
    if !current {
        log::debug!("dropping stale {what} computed against an old tree");
    }
    current
}

fn clear(state: &mut NodesState, tree: Arc<LayoutPages>) {
    state.nodes.clear();
    state.pages.clear();
    state.hidden_via_rule.clear();
    state.tree = Some(tree);
    state.generation += 1;
    log::debug!("node store reset to generation {}", state.generation);
}

fn insert_nodes(state: &mut NodesState, batch: impl IntoIterator<Item = NodeData>) -> bool {
    let mut changed = false;
    for node in batch {
        if state.nodes.get(&node.id) != Some(&node) {
            state.nodes.insert(node.id.clone(), node);
            changed = true;
        }
    }
    changed
}

fn remove_with_descendants(state: &mut NodesState, ids: impl IntoIterator<Item = NodeId>) -> usize {
    let mut doomed: NodeSet = ids
        .into_iter()
        .filter(|id| state.nodes.contains_key(id))
        .collect();
    loop {
        let descendants: Vec<NodeId> = state
            .nodes
            .values()
            .filter(|node| !doomed.contains(&node.id))
            .filter(|node| node.parent_id.as_ref().is_some_and(|parent| doomed.contains(parent)))
            .map(|node| node.id.clone())
            .collect();
        if descendants.is_empty() {
            break;
        }
        doomed.extend(descendants);
    }
    for id in &doomed {
        state.nodes.remove(id);
        state.hidden_via_rule.remove(id);
    }
    doomed.len()
}

fn apply_prop(node: &mut NodeData, prop: NodeProp) -> bool {
    match prop {
        NodeProp::Hidden(hidden) => {
            let changed = node.hidden != hidden;
            node.hidden = hidden;
            changed
        }
        NodeProp::PaginationPage(page) => match node.pagination.as_mut() {
            Some(pagination) if pagination.current_page != page => {
                pagination.current_page = page;
                true
            }
            _ => false,
        },
        NodeProp::Plugin { key, value } => {
            if node.plugins.get(&key) == Some(&value) {
                return false;
            }
            node.plugins.insert(key, value);
            true
        }
    }
}

impl Observable for NodeStore {
    type State = NodesState;

    fn with_state<R>(&self, f: impl FnOnce(&NodesState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;

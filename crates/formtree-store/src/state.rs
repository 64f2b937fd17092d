//! Snapshot of everything the node store knows, as seen by readers.

use crate::behavior::ComponentRegistry;
use crate::error::StoreError;
use crate::node_data::{Diagnostics, HiddenReason, NodeData, PageData};
use formtree_layout::collections::{NodeMap, NodeSet};
use formtree_layout::{LayoutPages, NodeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Store contents. Readers get `&NodesState` through
/// [`Observable::with_state`](crate::Observable::with_state); only the
/// store mutates it.
pub struct NodesState {
    pub(crate) nodes: NodeMap<NodeData>,
    pub(crate) pages: Vec<PageData>,
    pub(crate) hidden_via_rule: NodeSet,
    pub(crate) force_visible: bool,
    pub(crate) tree: Option<Arc<LayoutPages>>,
    pub(crate) generation: u64,
    pub(crate) commit: u64,
    registry: Rc<ComponentRegistry>,
    hidden_memo: RefCell<NodeMap<Option<HiddenReason>>>,
}

impl fmt::Debug for NodesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodesState")
            .field("nodes", &self.nodes.len())
            .field("pages", &self.pages.len())
            .field("hidden_via_rule", &self.hidden_via_rule.len())
            .field("force_visible", &self.force_visible)
            .field("generation", &self.generation)
            .field("commit", &self.commit)
            .finish()
    }
}

impl NodesState {
    pub(crate) fn new(registry: Rc<ComponentRegistry>, force_visible: bool) -> Self {
        Self {
            nodes: NodeMap::default(),
            pages: Vec::new(),
            hidden_via_rule: NodeSet::default(),
            force_visible,
            tree: None,
            generation: 0,
            commit: 0,
            registry,
            hidden_memo: RefCell::new(NodeMap::default()),
        }
    }

    /// Marks a commit. Memoized visibility is only valid within one commit.
    pub(crate) fn touch(&mut self) {
        self.commit += 1;
        self.hidden_memo.get_mut().clear();
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> + '_ {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn page(&self, key: &str) -> Option<&PageData> {
        self.pages.iter().find(|page| page.page_key == key)
    }

    pub(crate) fn page_mut(&mut self, key: &str) -> Option<&mut PageData> {
        self.pages.iter_mut().find(|page| page.page_key == key)
    }

    /// Pages in the order they were added.
    pub fn pages(&self) -> &[PageData] {
        &self.pages
    }

    pub fn is_hidden_via_rule(&self, id: &str) -> bool {
        self.hidden_via_rule.contains(id)
    }

    pub fn force_visible(&self) -> bool {
        self.force_visible
    }

    /// The tree the current nodes were generated from.
    pub fn tree(&self) -> Option<&Arc<LayoutPages>> {
        self.tree.as_ref()
    }

    /// Bumped by every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped by every commit.
    pub fn commit(&self) -> u64 {
        self.commit
    }

    pub fn is_hidden(&self, id: &str) -> Result<bool, StoreError> {
        self.hidden_reason(id).map(|reason| reason.is_some())
    }

    /// Resolves visibility for `id`, first rule wins:
    ///
    /// 1. force-visible makes everything visible;
    /// 2. the node's page is hidden;
    /// 3. the node's explicit `hidden` flag;
    /// 4. the rule-hidden set;
    /// 5. the parent's [`ContainerBehavior`](crate::ContainerBehavior);
    /// 6. the parent's own resolution.
    ///
    /// A root node that matched nothing is visible.
    pub fn hidden_reason(&self, id: &str) -> Result<Option<HiddenReason>, StoreError> {
        let node = self.nodes.get(id).ok_or_else(|| StoreError::UnknownNode {
            id: NodeId::from(id),
        })?;
        if self.force_visible {
            return Ok(None);
        }
        Ok(self.resolve(node, 0))
    }

    fn resolve(&self, node: &NodeData, depth: usize) -> Option<HiddenReason> {
        let cached = self.hidden_memo.borrow().get(&node.id).cloned();
        if let Some(reason) = cached {
            return reason;
        }
        let reason = self
            .own_reason(node)
            .or_else(|| self.parent_reason(node, depth));
        self.hidden_memo
            .borrow_mut()
            .insert(node.id.clone(), reason.clone());
        reason
    }

    fn own_reason(&self, node: &NodeData) -> Option<HiddenReason> {
        if self.page(&node.page_key).is_some_and(PageData::is_hidden) {
            return Some(HiddenReason::Page {
                key: node.page_key.clone(),
            });
        }
        if node.hidden == Some(true) {
            return Some(HiddenReason::Explicit);
        }
        if self.hidden_via_rule.contains(&node.id) {
            return Some(HiddenReason::Rule);
        }
        None
    }

    fn parent_reason(&self, node: &NodeData, depth: usize) -> Option<HiddenReason> {
        let parent = node.parent_id.as_ref().and_then(|id| self.nodes.get(id))?;
        if depth > self.nodes.len() {
            log::warn!("parent chain of {} loops; treating it as visible", node.id);
            return None;
        }
        if let Some(behavior) = self.registry.behavior(&parent.node_type) {
            if behavior.is_child_hidden(parent, node, self) {
                return Some(HiddenReason::Container {
                    parent: parent.id.clone(),
                });
            }
        }
        match self.resolve(parent, depth + 1)? {
            HiddenReason::Inherited { from } => Some(HiddenReason::Inherited { from }),
            _ => Some(HiddenReason::Inherited {
                from: parent.id.clone(),
            }),
        }
    }

    /// Error keys of every node and page that has any.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            nodes: self
                .nodes
                .values()
                .filter(|node| !node.errors.is_empty())
                .map(|node| (node.id.clone(), node.errors.clone()))
                .collect(),
            pages: self
                .pages
                .iter()
                .filter(|page| !page.errors.is_empty())
                .map(|page| (page.page_key.clone(), page.errors.clone()))
                .collect(),
        }
    }
}

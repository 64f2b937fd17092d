//! Populates a [`NodeStore`] from an expanded layout.
//!
//! A layout change (new definitions) discards the store and rebuilds it. A
//! data change (same definitions, new rows) keeps the existing nodes, adds
//! the new ones and removes the ones that no longer exist. Either way the
//! whole generation lands in one commit, so listeners never see a tree
//! without its nodes.

use crate::node_data::{NodeData, PageData};
use crate::store::NodeStore;
use formtree_layout::collections::NodeSet;
use formtree_layout::{LayoutPages, NodeRef};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub generation: u64,
    /// True when the store was reset for a new layout.
    pub reset: bool,
    pub added: usize,
    pub removed: usize,
}

/// Runs generations against one store and remembers which layout it last
/// generated, to tell layout changes from data changes.
#[derive(Debug)]
pub struct NodeGenerator {
    store: NodeStore,
    layout_fingerprint: Option<u64>,
}

impl NodeGenerator {
    pub fn new(store: NodeStore) -> Self {
        Self {
            store,
            layout_fingerprint: None,
        }
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Commits NodeData for every node of `tree` as one store commit.
    ///
    /// A changed layout fingerprint resets the store. Otherwise the existing
    /// records are kept, new ones are added and the ones no longer in the
    /// tree are removed.
    pub fn run(&mut self, tree: Arc<LayoutPages>) -> GenerationReport {
        let nodes = collect_node_data(&tree);
        let pages: Vec<PageData> = tree
            .pages()
            .iter()
            .map(|page| PageData::new(page.key()))
            .collect();
        let fingerprint = tree.layout_fingerprint();
        let reset = self.layout_fingerprint != Some(fingerprint);

        let (added, removed) = self.store.commit_generation(tree, reset, pages, nodes);
        self.layout_fingerprint = Some(fingerprint);
        let report = GenerationReport {
            generation: self.store.generation(),
            reset,
            added,
            removed,
        };
        log::debug!(
            "generation {} committed: reset={} added={} removed={}",
            report.generation,
            report.reset,
            report.added,
            report.removed
        );
        report
    }
}

/// NodeData for every node of every page. A NodeId that appears on several
/// pages keeps the record from the first page.
pub fn collect_node_data(tree: &LayoutPages) -> Vec<NodeData> {
    let mut seen = NodeSet::default();
    let mut nodes = Vec::new();
    for node in tree.all_nodes() {
        if !seen.insert(node.id().clone()) {
            log::warn!(
                "node {} on page {} collides with a node on an earlier page",
                node.id(),
                node.page_key()
            );
            continue;
        }
        nodes.push(node_data(node));
    }
    nodes
}

/// The initial store record for one tree node.
pub fn node_data(node: NodeRef<'_>) -> NodeData {
    let definition = node.definition();
    let mut data = NodeData::new(node.id().clone(), definition.component_type.clone(), node.page_key());

    if let Some(parent) = node.parent() {
        let in_rows = parent
            .as_group()
            .map(|group| group.is_repeating())
            .unwrap_or(false);
        let row_index = if in_rows { node.row_index() } else { None };
        data = data.with_parent(parent.id().clone(), row_index);
    }
    data.hidden = definition.hidden;
    if let Some(pagination) = definition.pagination {
        if definition.is_repeating() {
            data = data.with_pagination(pagination.rows_per_page);
        }
    }
    data.errors = node.errors().iter().map(|error| error.key()).collect();
    data
}

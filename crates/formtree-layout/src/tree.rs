//! Queryable node index over one expanded page.
//!
//! The expanded hierarchy is flattened into an arena keyed by [`NodeId`].
//! Parent and child relations are stored as ids and resolved through the
//! arena, so a [`LayoutPage`] holds no reference cycles and is immutable once
//! built.

use crate::binding::{DataModelBindings, DataModelReference};
use crate::collections::map::{HashMap, HashSet};
use crate::collections::NodeMap;
use crate::definition::LayoutComponentDefinition;
use crate::error::{ConfigError, NodeError};
use crate::form_data::RowSource;
use crate::hash::fingerprint;
use crate::hierarchy::{self, ExpandedNode, NodeContent, RowRef, RowScope};
use crate::NodeId;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowChildren {
    pub index: usize,
    pub uuid: String,
    pub items: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeChildren {
    None,
    Plain(Vec<NodeId>),
    Rows(Vec<RowChildren>),
}

/// Arena record of one node.
#[derive(Clone, Debug)]
pub struct LayoutNode {
    id: NodeId,
    base_component_id: String,
    definition: Arc<LayoutComponentDefinition>,
    bindings: DataModelBindings,
    row: Option<RowRef>,
    row_scopes: SmallVec<[RowScope; 2]>,
    multi_page_index: Option<usize>,
    errors: Vec<ConfigError>,
    parent: Option<NodeId>,
    children: NodeChildren,
    /// Position in preorder.
    position: usize,
}

/// One page's expanded node tree.
pub struct LayoutPage {
    key: String,
    nodes: NodeMap<LayoutNode>,
    order: Vec<NodeId>,
    top_level: Vec<NodeId>,
    by_base: HashMap<String, SmallVec<[NodeId; 1]>>,
    layout_fingerprint: u64,
}

impl fmt::Debug for LayoutPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutPage")
            .field("key", &self.key)
            .field("nodes", &self.order.len())
            .field("top_level", &self.top_level)
            .finish()
    }
}

impl LayoutPage {
    /// Indexes an already expanded hierarchy.
    ///
    /// The layout fingerprint covers the definitions present in `expanded`.
    /// Children of repeating groups without rows are not part of it; pages
    /// built with [`LayoutPage::build`] fingerprint the full layout instead.
    pub fn new(key: impl Into<String>, expanded: Vec<ExpandedNode>) -> Self {
        let layout_fingerprint = expanded_fingerprint(&expanded);
        let mut page = Self {
            key: key.into(),
            nodes: NodeMap::default(),
            order: Vec::new(),
            top_level: Vec::new(),
            by_base: HashMap::default(),
            layout_fingerprint,
        };
        for node in expanded {
            if let Some(id) = page.insert(node, None) {
                page.top_level.push(id);
            }
        }
        page
    }

    /// Expands `layout` and indexes the result.
    pub fn build(
        key: impl Into<String>,
        layout: &[LayoutComponentDefinition],
        rows: &dyn RowSource,
    ) -> Self {
        let mut page = Self::new(key, hierarchy::build(layout, rows));
        page.layout_fingerprint = fingerprint(layout);
        page
    }

    fn insert(&mut self, node: ExpandedNode, parent: Option<&NodeId>) -> Option<NodeId> {
        let ExpandedNode {
            id,
            base_component_id,
            definition,
            bindings,
            row,
            row_scopes,
            multi_page_index,
            errors,
            content,
        } = node;

        if self.nodes.contains_key(&id) {
            log::warn!("page {}: node {id} expanded twice; keeping the first", self.key);
            return None;
        }

        let position = self.order.len();
        self.order.push(id.clone());
        self.by_base
            .entry(base_component_id.clone())
            .or_default()
            .push(id.clone());
        self.nodes.insert(
            id.clone(),
            LayoutNode {
                id: id.clone(),
                base_component_id,
                definition,
                bindings,
                row,
                row_scopes,
                multi_page_index,
                errors,
                parent: parent.cloned(),
                children: NodeChildren::None,
                position,
            },
        );

        let children = match content {
            NodeContent::Leaf => NodeChildren::None,
            NodeContent::Group { children } => NodeChildren::Plain(
                children
                    .into_iter()
                    .filter_map(|child| self.insert(child, Some(&id)))
                    .collect(),
            ),
            NodeContent::Repeating { rows } => NodeChildren::Rows(
                rows.into_iter()
                    .map(|row| RowChildren {
                        index: row.index,
                        uuid: row.uuid,
                        items: row
                            .items
                            .into_iter()
                            .filter_map(|child| self.insert(child, Some(&id)))
                            .collect(),
                    })
                    .collect(),
            ),
        };
        if let Some(record) = self.nodes.get_mut(&id) {
            record.children = children;
        }
        Some(id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Hash of the definitions this page was expanded from.
    pub fn layout_fingerprint(&self) -> u64 {
        self.layout_fingerprint
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Exact NodeId lookup.
    pub fn node(&self, id: &str) -> Option<NodeRef<'_>> {
        self.nodes.get(id).map(|node| NodeRef { page: self, node })
    }

    /// Exact NodeId lookup that treats a missing node as a caller error.
    pub fn get(&self, id: &str) -> Result<NodeRef<'_>, NodeError> {
        self.node(id).ok_or_else(|| NodeError::Missing { id: id.to_owned() })
    }

    /// Finds a node by NodeId, falling back to its base component id.
    ///
    /// When `id` is a base component id shared by several row instances the
    /// first instance in preorder wins. Inside a repeating context prefer
    /// [`NodeRef::closest`] or [`GroupRef::children_in_row`], which pick the
    /// instance from the right row.
    pub fn find_by_id(&self, id: &str) -> Option<NodeRef<'_>> {
        self.node(id).or_else(|| {
            self.by_base
                .get(id)
                .and_then(|ids| ids.first())
                .and_then(|first| self.node(first))
        })
    }

    /// Every node whose NodeId or base component id equals `id`, in preorder.
    pub fn find_all_by_id(&self, id: &str) -> Vec<NodeRef<'_>> {
        let mut found: Vec<NodeRef<'_>> = self
            .by_base
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|node_id| self.node(node_id))
            .collect();
        if let Some(exact) = self.node(id) {
            if exact.base_component_id() != id {
                found.push(exact);
                found.sort_by_key(|node| node.node.position);
            }
        }
        found
    }

    /// Every node in preorder, optionally without group containers.
    pub fn flat(&self, include_groups: bool) -> Vec<NodeRef<'_>> {
        self.iter()
            .filter(|node| include_groups || !node.is_group())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.order.iter().filter_map(move |id| self.node(id))
    }

    pub fn top_level(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.top_level.iter().filter_map(move |id| self.node(id))
    }
}

/// Fingerprint of the distinct definitions of `expanded`, in preorder.
fn expanded_fingerprint(expanded: &[ExpandedNode]) -> u64 {
    let mut seen: HashSet<&str> = HashSet::default();
    let mut definitions: Vec<&LayoutComponentDefinition> = Vec::new();
    let mut stack: Vec<&ExpandedNode> = expanded.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if seen.insert(node.base_component_id.as_str()) {
            definitions.push(&node.definition);
        }
        let children: Vec<&ExpandedNode> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }
    fingerprint(&definitions)
}

/// Borrowed view of one node together with the page it lives on.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    page: &'a LayoutPage,
    node: &'a LayoutNode,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.page, other.page) && self.node.id == other.node.id
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("page", &self.page.key)
            .field("id", &self.node.id)
            .field("type", &self.node.definition.component_type)
            .finish()
    }
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a NodeId {
        &self.node.id
    }

    pub fn base_component_id(&self) -> &'a str {
        &self.node.base_component_id
    }

    pub fn component_type(&self) -> &'a str {
        &self.node.definition.component_type
    }

    pub fn definition(&self) -> &'a Arc<LayoutComponentDefinition> {
        &self.node.definition
    }

    pub fn page(&self) -> &'a LayoutPage {
        self.page
    }

    pub fn page_key(&self) -> &'a str {
        &self.page.key
    }

    pub fn bindings(&self) -> &'a DataModelBindings {
        &self.node.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&'a DataModelReference> {
        self.node.bindings.get(name)
    }

    /// The repeating-group row this node was cloned into, if its parent is
    /// a repeating group.
    pub fn row(&self) -> Option<&'a RowRef> {
        self.node.row.as_ref()
    }

    pub fn row_index(&self) -> Option<usize> {
        self.node.row.as_ref().map(|row| row.index)
    }

    /// Every enclosing repeating row, outermost first.
    pub fn row_scopes(&self) -> &'a [RowScope] {
        &self.node.row_scopes
    }

    pub fn multi_page_index(&self) -> Option<usize> {
        self.node.multi_page_index
    }

    pub fn errors(&self) -> &'a [ConfigError] {
        &self.node.errors
    }

    pub fn is_group(&self) -> bool {
        !matches!(self.node.children, NodeChildren::None) || self.node.definition.is_group()
    }

    pub fn parent_id(&self) -> Option<&'a NodeId> {
        self.node.parent.as_ref()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node.parent.as_ref().and_then(|id| self.page.node(id))
    }

    /// Typed access to the group operations.
    pub fn as_group(&self) -> Result<GroupRef<'a>, NodeError> {
        if self.is_group() {
            Ok(GroupRef { node: *self })
        } else {
            Err(NodeError::TypeMismatch {
                id: self.node.id.clone(),
                expected: "group",
            })
        }
    }

    /// Ancestors from the immediate parent up to the page root.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// Ancestors matching `predicate`, from the immediate parent outward.
    pub fn parents<F>(&self, predicate: F) -> Vec<NodeRef<'a>>
    where
        F: Fn(&NodeRef<'a>) -> bool,
    {
        self.ancestors().filter(|node| predicate(node)).collect()
    }

    /// Nearest match, favouring locality.
    ///
    /// Checks this node, then the other direct children of its parent (only
    /// those in the same row when the parent is a repeating group), then
    /// continues from the parent. Top-level nodes search the page's other
    /// top-level nodes.
    pub fn closest<F>(&self, predicate: F) -> Option<NodeRef<'a>>
    where
        F: Fn(&NodeRef<'a>) -> bool,
    {
        let mut current = *self;
        loop {
            if predicate(&current) {
                return Some(current);
            }
            let Some(parent) = current.parent() else {
                return self.page.top_level().find(|node| predicate(node));
            };
            let group = GroupRef { node: parent };
            let sibling = group
                .row_items(current.row_index())
                .iter()
                .filter_map(|id| self.page.node(id))
                .find(|node| predicate(node));
            if sibling.is_some() {
                return sibling;
            }
            current = parent;
        }
    }

    pub fn raw(&self) -> &'a LayoutNode {
        self.node
    }
}

pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

/// Group view of a node, obtained from [`NodeRef::as_group`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupRef<'a> {
    node: NodeRef<'a>,
}

impl<'a> GroupRef<'a> {
    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    pub fn is_repeating(&self) -> bool {
        matches!(self.node.node.children, NodeChildren::Rows(_)) || self.node.definition().is_repeating()
    }

    pub fn rows(&self) -> &'a [RowChildren] {
        match &self.node.node.children {
            NodeChildren::Rows(rows) => rows,
            _ => &[],
        }
    }

    fn row_items(&self, row_index: Option<usize>) -> &'a [NodeId] {
        match &self.node.node.children {
            NodeChildren::None => &[],
            NodeChildren::Plain(items) => items,
            NodeChildren::Rows(rows) => {
                let row = match row_index {
                    Some(index) => rows.iter().find(|row| row.index == index),
                    None => rows.first(),
                };
                row.map(|row| row.items.as_slice()).unwrap_or(&[])
            }
        }
    }

    /// First direct child matching `predicate`.
    ///
    /// For a repeating group `row_index` selects the row; when it is `None`
    /// only the first row is searched. Callers iterating a multi-row group
    /// should pass the row explicitly or use [`GroupRef::children_in_row`].
    pub fn children<F>(&self, predicate: F, row_index: Option<usize>) -> Option<NodeRef<'a>>
    where
        F: Fn(&NodeRef<'a>) -> bool,
    {
        self.all_children(row_index)
            .into_iter()
            .find(|node| predicate(node))
    }

    /// First direct child in row `row_index` matching `predicate`.
    pub fn children_in_row<F>(&self, predicate: F, row_index: usize) -> Option<NodeRef<'a>>
    where
        F: Fn(&NodeRef<'a>) -> bool,
    {
        self.children(predicate, Some(row_index))
    }

    /// Direct children; for repeating groups the same row rules as
    /// [`GroupRef::children`] apply.
    pub fn all_children(&self, row_index: Option<usize>) -> Vec<NodeRef<'a>> {
        self.row_items(row_index)
            .iter()
            .filter_map(|id| self.node.page.node(id))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tests;

//! Runtime records kept per node and per page.

use formtree_layout::NodeId;
use serde::Serialize;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Per-node runtime record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub id: NodeId,
    /// Component type, as written in the layout.
    pub node_type: String,
    pub page_key: String,
    pub parent_id: Option<NodeId>,
    /// Row within the parent repeating group.
    pub row_index: Option<usize>,
    /// Explicit hidden flag. `None` leaves the decision to rules and ancestors.
    pub hidden: Option<bool>,
    pub errors: BTreeSet<String>,
    pub pagination: Option<PaginationState>,
    /// Fields contributed by plugins (`validations`, `attachments`, ...).
    pub plugins: Map<String, Value>,
}

impl NodeData {
    pub fn new(
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        page_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            page_key: page_key.into(),
            parent_id: None,
            row_index: None,
            hidden: None,
            errors: BTreeSet::new(),
            pagination: None,
            plugins: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>, row_index: Option<usize>) -> Self {
        self.parent_id = Some(parent.into());
        self.row_index = row_index;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn with_pagination(mut self, rows_per_page: usize) -> Self {
        self.pagination = Some(PaginationState::new(rows_per_page));
        self
    }
}

/// Visible page of a paginated repeating group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub rows_per_page: usize,
    pub current_page: usize,
}

impl PaginationState {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            rows_per_page,
            current_page: 0,
        }
    }

    pub fn contains_row(&self, row_index: usize) -> bool {
        self.rows_per_page == 0 || row_index / self.rows_per_page == self.current_page
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub page_key: String,
    pub hidden: bool,
    /// False when the page-order rule left this page out.
    pub in_order: bool,
    pub errors: BTreeSet<String>,
}

impl PageData {
    pub fn new(page_key: impl Into<String>) -> Self {
        Self {
            page_key: page_key.into(),
            hidden: false,
            in_order: true,
            errors: BTreeSet::new(),
        }
    }

    /// Hidden by its own rule or dropped from the page order.
    pub fn is_hidden(&self) -> bool {
        self.hidden || !self.in_order
    }
}

/// One shallow change to a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeProp {
    Hidden(Option<bool>),
    PaginationPage(usize),
    Plugin { key: String, value: Value },
}

/// The changes [`NodeStore::set_node_props`](crate::NodeStore::set_node_props)
/// applies to one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePropPatch {
    pub id: NodeId,
    pub props: SmallVec<[NodeProp; 2]>,
}

impl NodePropPatch {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            props: SmallVec::new(),
        }
    }

    pub fn hidden(mut self, hidden: Option<bool>) -> Self {
        self.props.push(NodeProp::Hidden(hidden));
        self
    }

    pub fn pagination_page(mut self, page: usize) -> Self {
        self.props.push(NodeProp::PaginationPage(page));
        self
    }

    pub fn plugin(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.push(NodeProp::Plugin {
            key: key.into(),
            value,
        });
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Node,
    Page,
}

/// Why [`NodesState::hidden_reason`](crate::NodesState::hidden_reason)
/// reported a node hidden.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum HiddenReason {
    /// The node's page is hidden or out of order.
    Page { key: String },
    /// The node's own `hidden` flag.
    Explicit,
    /// A hidden rule matched the node.
    Rule,
    /// The parent's component type hides this child (pagination).
    Container { parent: NodeId },
    /// An ancestor is hidden for one of the reasons above.
    Inherited { from: NodeId },
}

/// Error keys per node and per page, for developer tooling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub nodes: BTreeMap<NodeId, BTreeSet<String>>,
    pub pages: BTreeMap<String, BTreeSet<String>>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_window_by_page() {
        let mut state = PaginationState::new(2);
        assert!(state.contains_row(0));
        assert!(state.contains_row(1));
        assert!(!state.contains_row(2));
        state.current_page = 1;
        assert!(!state.contains_row(1));
        assert!(state.contains_row(3));
        assert!(PaginationState::new(0).contains_row(40));
    }

    #[test]
    fn node_data_serializes_camel_case() {
        let data = NodeData::new("Name-0", "Input", "page1").with_parent("Group", Some(0));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["parentId"], "Group");
        assert_eq!(json["rowIndex"], 0);
        assert_eq!(json["pageKey"], "page1");
    }
}

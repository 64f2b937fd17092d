use formtree_layout::NodeId;
use thiserror::Error;

/// Contract errors raised by [`NodeStore`](crate::NodeStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("node {id} is not in the store")]
    UnknownNode { id: NodeId },
    #[error("page {key} is not in the store")]
    UnknownPage { key: String },
    #[error("node {id} of type {node_type} does not support {feature}")]
    Unsupported {
        id: NodeId,
        node_type: String,
        feature: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("selector used before a store was provided")]
    StoreNotProvided,
}

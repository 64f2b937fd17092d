//! Reactive runtime store for expanded form layouts.
//!
//! [`NodeStore`] keeps per-node and per-page runtime data (visibility,
//! pagination, error keys, plugin fields) keyed by [`NodeId`]. The tree shape
//! lives in [`formtree_layout`]; the store only keeps a reference to the tree
//! it was generated from. Consumers read the store through
//! [`DelayedSelector`]s, which cache per key and re-render only when a value
//! they read actually changed.

pub mod behavior;
mod error;
pub mod generation;
mod node_data;
mod observable;
pub mod selector;
mod state;
mod store;
mod wait;

pub use behavior::{ComponentRegistry, ContainerBehavior, PaginatedRows};
pub use error::{SelectorError, StoreError};
pub use formtree_layout::NodeId;
pub use generation::{collect_node_data, node_data, GenerationReport, NodeGenerator};
pub use node_data::{
    Diagnostics, ErrorKind, HiddenReason, NodeData, NodeProp, NodePropPatch, PageData,
    PaginationState,
};
pub use observable::{ListenerRegistry, Observable, Subscription};
pub use selector::{
    DelayedSelector, DelayedSelectorConfig, ReRenderGate, Selected, Strictness, WhenChanged,
};
pub use state::NodesState;
pub use store::{NodeStore, NodeStoreConfig};
pub use wait::WaitFor;

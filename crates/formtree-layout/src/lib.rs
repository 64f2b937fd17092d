//! Layout node hierarchy for schema-driven forms.
//!
//! A page layout arrives as a flat list of component definitions. This crate
//! expands it into a tree (groups own their children, repeating groups get one
//! copy of their children per data row) and indexes the result so nodes can
//! be found by id, by row, or by proximity to another node.

pub mod binding;
pub mod collections;
pub mod definition;
mod error;
pub mod form_data;
pub mod hash;
pub mod hierarchy;
mod node_id;
mod pages;
pub mod tree;

pub use binding::{
    transpose, DataModelBindings, DataModelReference, FieldPath, PathSegment, RowContext,
    GROUP_BINDING,
};
pub use definition::{
    parse_layout, ChildRef, ComponentKind, GroupEdit, LayoutComponentDefinition, Pagination,
    RowWindow,
};
pub use error::{ConfigError, LayoutError, NodeError};
pub use form_data::{
    FormDataAccessor, FormDataRowSource, JsonFormData, NoRows, RowDescriptor, RowQuery, RowSource,
    ROW_ID_KEY,
};
pub use hierarchy::{ExpandedNode, ExpandedRow, NodeContent, RowRef, RowScope};
pub use node_id::NodeId;
pub use pages::LayoutPages;
pub use tree::{GroupRef, LayoutPage, NodeChildren, NodeRef, RowChildren};

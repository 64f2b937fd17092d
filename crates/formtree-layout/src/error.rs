use crate::NodeId;

/// Contract violations when querying a built tree.
///
/// These point at a bug in the caller (asking a leaf for its rows, switching
/// to a page that was never registered), not at malformed layout input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node {id} missing")]
    Missing { id: String },
    #[error("node {id} type mismatch; expected {expected}")]
    TypeMismatch { id: NodeId, expected: &'static str },
    #[error("page {key} is not registered")]
    UnknownPage { key: String },
}

/// Malformed layout configuration found while expanding a page.
///
/// Recorded on the node where it was detected; never raised.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ConfigError {
    #[error("child {child} is already an ancestor of this group")]
    CyclicChild { child: String },
    #[error("child {child} does not exist in this layout")]
    MissingChild { child: String },
    #[error("repeating group has no `group` data model binding")]
    MissingGroupBinding,
    #[error("component id {id} is defined more than once")]
    DuplicateId { id: String },
    #[error("child {child} already belongs to another group")]
    SharedChild { child: String },
    #[error("component is only referenced from inside a children cycle")]
    OnlyInCycle,
}

impl ConfigError {
    /// Stable key used when the error is copied into an error bag.
    pub fn key(&self) -> String {
        match self {
            ConfigError::CyclicChild { child } => format!("config.cyclic-child:{child}"),
            ConfigError::MissingChild { child } => format!("config.missing-child:{child}"),
            ConfigError::MissingGroupBinding => "config.missing-group-binding".to_owned(),
            ConfigError::DuplicateId { id } => format!("config.duplicate-id:{id}"),
            ConfigError::SharedChild { child } => format!("config.shared-child:{child}"),
            ConfigError::OnlyInCycle => "config.only-in-cycle".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid layout json: {0}")]
    Json(#[from] serde_json::Error),
}

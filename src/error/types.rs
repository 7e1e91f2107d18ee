use thiserror::Error;

use crate::tree::NodeId;

/// Unified result type for the blocktree crate.
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Structural errors raised by the registry, the composition tree and the
/// render pipeline. Every variant aborts the operation that produced it.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("unknown component type `{0}`")]
    UnknownType(String),
    #[error("component type `{0}` is already registered")]
    DuplicateType(String),
    #[error("zone `{zone}` is not declared by component type `{type_id}`")]
    UnknownZone { type_id: String, zone: String },
    #[error("category `{0}` not found")]
    UnknownCategory(String),
    #[error("component type `{type_id}` already belongs to category `{existing}`")]
    CategoryConflict { type_id: String, existing: String },
    #[error("invalid descriptor `{type_id}`: {reason}")]
    InvalidDescriptor { type_id: String, reason: String },
    #[error("node `{0}` not found")]
    NodeNotFound(NodeId),
    #[error("node `{0}` is attached to the tree")]
    NodeAttached(NodeId),
    #[error("inserting `{child}` under `{parent}` would make it its own descendant")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("node `{child}` is not in zone `{zone}` of `{parent}`")]
    ChildNotFound {
        parent: NodeId,
        zone: String,
        child: NodeId,
    },
    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(NodeId),
    #[error("render of `{type_id}` failed: {reason}")]
    Render { type_id: String, reason: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ComposeError {
    pub(crate) fn invalid_descriptor(type_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            type_id: type_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_zone(type_id: &str, zone: &str) -> Self {
        Self::UnknownZone {
            type_id: type_id.to_string(),
            zone: zone.to_string(),
        }
    }
}

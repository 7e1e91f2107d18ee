//! Composition tree module orchestrator.
//!
//! Nodes live in an arena keyed by id and point at their parent; zones hold
//! child ids only. A node sits in at most one zone, and insertion rejects a
//! node that is the target parent or one of its ancestors, so the attached
//! tree stays acyclic.

mod core;
mod document;
mod walk;

pub use self::core::{CompositionTree, Created, Node, NodeId, ParentLink, Zones};
pub use self::document::{LoadedTree, NodeDocument};
pub use self::walk::Walk;

//! Registry module orchestrator.
//!
//! The [`Registry`] is built once at startup, then shared read-only through an
//! `Arc` with every composition tree that interprets nodes against it.

mod core;

pub use self::core::{Category, CategoryIndex, CategoryIter, Registry};

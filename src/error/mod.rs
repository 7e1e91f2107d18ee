//! Error module orchestrator.
//!
//! Structural failures live in [`ComposeError`]; field level failures are
//! described by [`crate::schema::FieldError`] because they are recovered by the
//! prop resolver instead of aborting the caller.

mod types;

pub use types::{ComposeError, Result};

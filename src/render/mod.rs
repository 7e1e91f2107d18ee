//! Render module orchestrator.
//!
//! Rendering walks the attached tree from the root. Zone content is produced
//! on demand through [`ZoneContentProvider`](crate::ZoneContentProvider), so a
//! zone the render function never asks for is never rendered.
//!
//! Each nesting level runs inside the parent's render function, so the call
//! stack grows with tree depth. Serialization and walks do not have this
//! limit; render very deep trees on a thread with a larger stack.

mod core;

pub use self::core::{RenderReport, render, render_subtree};

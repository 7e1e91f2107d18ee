//! Field schema module orchestrator.
//!
//! A [`FieldSpec`] describes one configurable input of a component. The kind
//! is a tagged variant so that select options and repeating-group item
//! schemas only exist on the kinds that use them.

mod core;
mod validate;

pub use self::core::{FieldKind, FieldMap, FieldSpec, SelectOption};
pub use validate::{FieldError, validate};

pub(crate) use validate::{check_spec, value_kind};

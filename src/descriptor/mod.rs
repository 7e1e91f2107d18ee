//! Component descriptor module orchestrator.
//!
//! A [`ComponentDescriptor`] bundles the field schema, the default props and
//! the render contract of one component type. Descriptors are checked when
//! built, so a registered descriptor is always well formed.

mod component;
mod core;

pub use self::component::Component;
pub use self::core::{
    ComponentDescriptor, DescriptorBuilder, DescriptorExport, Fragment, Props, RenderFn,
    ZoneContentProvider,
};

//! Descriptor contract and composition engine for a drag-and-drop page builder.
//!
//! Components are described by a [`ComponentDescriptor`] (field schema,
//! defaults, zones, render function) and registered once in a [`Registry`].
//! A [`CompositionTree`] instantiates nodes through the prop resolver, nests
//! them through named zones, and renders or serializes the whole page.

pub mod audit;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod outline;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod schema;
pub mod tree;
pub mod width;

#[cfg(test)]
pub(crate) mod fixtures;

pub use audit::{
    BufferedTreeAudit, NullTreeAudit, TreeAudit, TreeAuditEvent, TreeAuditEventBuilder,
    TreeAuditStage,
};
pub use config::{CategoryPolicy, EngineConfig, PlaceholderStyle};
pub use descriptor::{
    Component, ComponentDescriptor, DescriptorBuilder, DescriptorExport, Fragment, Props,
    RenderFn, ZoneContentProvider,
};
pub use error::{ComposeError, Result};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{EngineMetrics, MetricSnapshot};
pub use registry::{Category, CategoryIndex, CategoryIter, Registry};
pub use render::{RenderReport, render, render_subtree};
pub use resolve::{FieldValidationWarning, Resolution, WarningReason, resolve};
pub use schema::{FieldError, FieldKind, FieldMap, FieldSpec, SelectOption, validate};
pub use tree::{
    CompositionTree, Created, LoadedTree, Node, NodeDocument, NodeId, ParentLink, Walk, Zones,
};
pub use width::display_width;

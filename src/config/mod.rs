use std::sync::{Arc, Mutex};

use crate::audit::{NullTreeAudit, TreeAudit, TreeAuditEvent};
use crate::descriptor::Fragment;
use crate::logging::Logger;
use crate::metrics::EngineMetrics;

/// How the registry treats a type id listed in more than one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryPolicy {
    /// Allow it and log a warning.
    #[default]
    Advisory,
    /// Reject the second membership with `CategoryConflict`.
    Exclusive,
}

/// Output produced for nodes whose type is missing from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// A visible marker element carrying the type and node id.
    #[default]
    Badge,
    /// An HTML comment.
    Comment,
    /// Nothing at all.
    Silent,
}

impl PlaceholderStyle {
    pub fn render(&self, type_id: &str, node_id: &str) -> Fragment {
        match self {
            PlaceholderStyle::Badge => format!(
                "<div data-unknown-type=\"{type_id}\" data-node-id=\"{node_id}\">Unknown component: {type_id}</div>"
            ),
            PlaceholderStyle::Comment => format!("<!-- unknown component {type_id} ({node_id}) -->"),
            PlaceholderStyle::Silent => Fragment::new(),
        }
    }
}

/// Configuration knobs shared by the registry and composition trees.
#[derive(Clone)]
pub struct EngineConfig {
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Shared counters, updated on every mutation and render when present.
    pub metrics: Option<Arc<Mutex<EngineMetrics>>>,
    /// Receiver of tree lifecycle events.
    pub audit: Arc<dyn TreeAudit>,
    pub category_policy: CategoryPolicy,
    pub placeholder: PlaceholderStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            audit: Arc::new(NullTreeAudit),
            category_policy: CategoryPolicy::default(),
            placeholder: PlaceholderStyle::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn TreeAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_category_policy(mut self, policy: CategoryPolicy) -> Self {
        self.category_policy = policy;
        self
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderStyle) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(EngineMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<EngineMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    pub(crate) fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    pub(crate) fn record_metrics(&self, update: impl FnOnce(&mut EngineMetrics)) {
        if let Some(metrics) = &self.metrics {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }

    pub(crate) fn audit(&self, event: TreeAuditEvent) {
        self.audit.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_opt_in() {
        let mut config = EngineConfig::default();
        config.record_metrics(|m| m.record_insert());
        assert!(config.metrics_handle().is_none());

        config.enable_metrics();
        config.record_metrics(|m| m.record_insert());
        let handle = config.metrics_handle().unwrap();
        assert_eq!(handle.lock().unwrap().snapshot().inserts, 1);

        config.disable_metrics();
        assert!(config.metrics_handle().is_none());
    }

    #[test]
    fn placeholder_styles() {
        assert!(PlaceholderStyle::Badge.render("Map", "map-1").contains("data-unknown-type=\"Map\""));
        assert_eq!(
            PlaceholderStyle::Comment.render("Map", "map-1"),
            "<!-- unknown component Map (map-1) -->"
        );
        assert!(PlaceholderStyle::Silent.render("Map", "map-1").is_empty());
    }
}

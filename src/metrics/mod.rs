use crate::logging::{LogEvent, LogFields, LogLevel};
use serde::Serialize;
use serde_json::json;

/// Counters for tree mutations and render passes.
#[derive(Debug, Default, Clone)]
pub struct EngineMetrics {
    nodes_created: u64,
    inserts: u64,
    removals: u64,
    moves: u64,
    renders: u64,
    nodes_rendered: u64,
    placeholders: u64,
    warnings: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_node_created(&mut self, warnings: usize) {
        self.nodes_created = self.nodes_created.saturating_add(1);
        self.record_warnings(warnings);
    }

    pub fn record_insert(&mut self) {
        self.inserts = self.inserts.saturating_add(1);
    }

    pub fn record_removal(&mut self) {
        self.removals = self.removals.saturating_add(1);
    }

    pub fn record_move(&mut self) {
        self.moves = self.moves.saturating_add(1);
    }

    pub fn record_warnings(&mut self, count: usize) {
        if count > 0 {
            self.warnings = self.warnings.saturating_add(count as u64);
        }
    }

    pub fn record_render(&mut self, nodes: usize, placeholders: usize) {
        self.renders = self.renders.saturating_add(1);
        self.nodes_rendered = self.nodes_rendered.saturating_add(nodes as u64);
        self.placeholders = self.placeholders.saturating_add(placeholders as u64);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            nodes_created: self.nodes_created,
            inserts: self.inserts,
            removals: self.removals,
            moves: self.moves,
            renders: self.renders,
            nodes_rendered: self.nodes_rendered,
            placeholders: self.placeholders,
            warnings: self.warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub nodes_created: u64,
    pub inserts: u64,
    pub removals: u64,
    pub moves: u64,
    pub renders: u64,
    pub nodes_rendered: u64,
    pub placeholders: u64,
    pub warnings: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "engine_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("nodes_created".to_string(), json!(self.nodes_created));
        map.insert("inserts".to_string(), json!(self.inserts));
        map.insert("removals".to_string(), json!(self.removals));
        map.insert("moves".to_string(), json!(self.moves));
        map.insert("renders".to_string(), json!(self.renders));
        map.insert("nodes_rendered".to_string(), json!(self.nodes_rendered));
        map.insert("placeholders".to_string(), json!(self.placeholders));
        map.insert("warnings".to_string(), json!(self.warnings));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::METRICS_TARGET;

    #[test]
    fn counters_accumulate() {
        let mut metrics = EngineMetrics::new();
        metrics.record_node_created(2);
        metrics.record_node_created(0);
        metrics.record_insert();
        metrics.record_render(5, 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.nodes_created, 2);
        assert_eq!(snapshot.warnings, 2);
        assert_eq!(snapshot.inserts, 1);
        assert_eq!(snapshot.nodes_rendered, 5);
        assert_eq!(snapshot.placeholders, 1);
    }

    #[test]
    fn snapshot_converts_to_log_event() {
        let mut metrics = EngineMetrics::new();
        metrics.record_move();
        let event = metrics.snapshot().to_log_event(METRICS_TARGET);
        assert_eq!(event.message, "engine_metrics");
        assert_eq!(event.fields["moves"], json!(1));
    }
}

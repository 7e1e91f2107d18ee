use crate::audit::{TreeAuditEventBuilder, TreeAuditStage};
use crate::descriptor::{Fragment, ZoneContentProvider};
use crate::error::{ComposeError, Result};
use crate::logging::{LogLevel, RENDER_TARGET, emit, json_kv};
use crate::tree::{CompositionTree, Node, NodeId};

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub output: Fragment,
    /// Nodes whose descriptor render function ran.
    pub nodes_rendered: usize,
    /// Nodes rendered as placeholders because their type is not registered.
    pub placeholders: Vec<NodeId>,
}

/// Render the whole attached tree.
pub fn render(tree: &CompositionTree) -> Result<RenderReport> {
    render_subtree(tree, tree.root_id())
}

/// Render the subtree rooted at `id`.
pub fn render_subtree(tree: &CompositionTree, id: &str) -> Result<RenderReport> {
    let mut pass = RenderPass {
        tree,
        nodes_rendered: 0,
        placeholders: Vec::new(),
    };
    let output = pass.render_node(id)?;

    let report = RenderReport {
        output,
        nodes_rendered: pass.nodes_rendered,
        placeholders: pass.placeholders,
    };

    let config = tree.config();
    config.record_metrics(|metrics| {
        metrics.record_render(report.nodes_rendered, report.placeholders.len())
    });
    config.audit(
        TreeAuditEventBuilder::new(TreeAuditStage::RenderCompleted)
            .detail("root", id)
            .detail("nodes", report.nodes_rendered)
            .detail("placeholders", report.placeholders.len())
            .finish(),
    );
    emit(
        config.logger(),
        LogLevel::Debug,
        RENDER_TARGET,
        "render_completed",
        [
            json_kv("root", id),
            json_kv("nodes", report.nodes_rendered),
            json_kv("placeholders", report.placeholders.len()),
            json_kv("bytes", report.output.len()),
        ],
    );
    Ok(report)
}

impl CompositionTree {
    /// Render the attached tree and return its output.
    pub fn render(&self) -> Result<Fragment> {
        render(self).map(|report| report.output)
    }
}

struct RenderPass<'a> {
    tree: &'a CompositionTree,
    nodes_rendered: usize,
    placeholders: Vec<NodeId>,
}

impl<'a> RenderPass<'a> {
    fn render_node(&mut self, id: &str) -> Result<Fragment> {
        let tree = self.tree;
        let node = tree.get(id)?;

        let Some(descriptor) = tree.registry().get(node.type_id()) else {
            emit(
                tree.config().logger(),
                LogLevel::Warn,
                RENDER_TARGET,
                "placeholder_rendered",
                [json_kv("node", id), json_kv("type_id", node.type_id())],
            );
            self.placeholders.push(node.id().to_string());
            return Ok(tree.config().placeholder.render(node.type_id(), node.id()));
        };

        self.nodes_rendered += 1;
        let mut slots = ZoneSlots { pass: self, node };
        descriptor
            .render(node.props(), &mut slots)
            .map_err(|err| match err {
                ComposeError::Json(source) => ComposeError::Render {
                    type_id: node.type_id().to_string(),
                    reason: source.to_string(),
                },
                other => other,
            })
    }
}

/// Zone content provider bound to one node during a render pass.
struct ZoneSlots<'p, 'a> {
    pass: &'p mut RenderPass<'a>,
    node: &'a Node,
}

impl ZoneSlots<'_, '_> {
    fn children(&self, name: &str) -> Result<&[NodeId]> {
        self.node
            .zone(name)
            .ok_or_else(|| ComposeError::unknown_zone(self.node.type_id(), name))
    }
}

impl ZoneContentProvider for ZoneSlots<'_, '_> {
    fn zone(&mut self, name: &str) -> Result<Fragment> {
        let node = self.node;
        let children = node
            .zone(name)
            .ok_or_else(|| ComposeError::unknown_zone(node.type_id(), name))?;

        let mut out = Fragment::new();
        for child in children {
            out.push_str(&self.pass.render_node(child)?);
        }
        Ok(out)
    }

    fn child_count(&self, name: &str) -> Result<usize> {
        self.children(name).map(<[NodeId]>::len)
    }
}

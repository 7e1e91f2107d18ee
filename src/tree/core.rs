use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::audit::{TreeAuditEventBuilder, TreeAuditStage};
use crate::config::EngineConfig;
use crate::descriptor::{ComponentDescriptor, Props};
use crate::error::{ComposeError, Result};
use crate::logging::{LogLevel, TREE_TARGET, emit, json_kv};
use crate::registry::Registry;
use crate::resolve::{FieldValidationWarning, resolve};

/// Unique identifier for nodes within one tree.
pub type NodeId = String;

/// Zone name to ordered child ids, in the descriptor's declaration order.
pub type Zones = IndexMap<String, Vec<NodeId>>;

/// One configured occurrence of a component type.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) type_id: String,
    pub(crate) props: Props,
    pub(crate) zones: Zones,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn zones(&self) -> &Zones {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&[NodeId]> {
        self.zones.get(name).map(Vec::as_slice)
    }

    /// Child ids across every zone, zone by zone.
    pub fn children(&self) -> impl Iterator<Item = &NodeId> {
        self.zones.values().flatten()
    }
}

/// Where an attached node sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: NodeId,
    pub zone: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) node: Node,
    pub(crate) parent: Option<ParentLink>,
}

/// Result of creating a node: its id plus any prop warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub id: NodeId,
    pub warnings: Vec<FieldValidationWarning>,
}

/// One page: a root node, every node created for it, and the registry used to
/// interpret them.
///
/// Nodes that are not reachable from the root are detached. They keep their
/// props and subtrees so they can be inserted again, but walking, rendering
/// and serialization only see the attached tree.
#[derive(Clone)]
pub struct CompositionTree {
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: EngineConfig,
    pub(crate) root: NodeId,
    pub(crate) slots: HashMap<NodeId, Slot>,
    pub(crate) id_counter: u64,
}

impl CompositionTree {
    /// Start a tree whose root is a default-configured `root_type` node.
    pub fn new(registry: Arc<Registry>, root_type: &str) -> Result<Self> {
        let config = registry.config().clone();
        let mut tree = Self::empty(registry, config);
        let created = tree.spawn(root_type, &Props::new())?;
        tree.root = created.id;

        tree.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::TreeCreated)
                .detail("root", tree.root.as_str())
                .detail("type_id", root_type)
                .finish(),
        );
        Ok(tree)
    }

    pub(crate) fn empty(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            root: NodeId::new(),
            slots: HashMap::new(),
            id_counter: 0,
        }
    }

    /// Replace the configuration inherited from the registry.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    pub fn root(&self) -> &Node {
        // The root slot is created with the tree and can never be discarded.
        &self.slots[&self.root].node
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.slots.get(id).map(|slot| &slot.node)
    }

    pub fn get(&self, id: &str) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| ComposeError::NodeNotFound(id.to_string()))
    }

    pub fn parent_of(&self, id: &str) -> Option<&ParentLink> {
        self.slots.get(id).and_then(|slot| slot.parent.as_ref())
    }

    pub fn descriptor_of(&self, id: &str) -> Result<&ComponentDescriptor> {
        let node = self.get(id)?;
        self.registry.lookup(&node.type_id)
    }

    /// True when `id` is the root or hangs below it.
    pub fn is_attached(&self, id: &str) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent_of(current) {
                Some(link) => current = link.parent.as_str(),
                None => return false,
            }
        }
    }

    /// Number of nodes in the attached tree.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Ids of every node in the arena that is not part of the attached tree.
    pub fn detached_ids(&self) -> Vec<&str> {
        let attached: HashSet<&str> = self.iter().map(|(node, _)| node.id()).collect();
        let mut ids: Vec<&str> = self
            .slots
            .keys()
            .map(String::as_str)
            .filter(|id| !attached.contains(id))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Resolved props of `id` converted into a concrete props type.
    pub fn props_as<P: DeserializeOwned>(&self, id: &str) -> Result<P> {
        let node = self.get(id)?;
        Ok(serde_json::from_value(Value::Object(node.props.clone()))?)
    }

    /// Create a detached node of `type_id` with `overrides` resolved over the
    /// descriptor defaults and one empty list per declared zone.
    pub fn create_node(&mut self, type_id: &str, overrides: &Props) -> Result<Created> {
        let created = self.spawn(type_id, overrides)?;
        self.report_warnings(&created.warnings);
        self.config
            .record_metrics(|metrics| metrics.record_node_created(created.warnings.len()));
        self.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::NodeCreated)
                .detail("id", created.id.as_str())
                .detail("type_id", type_id)
                .detail("warnings", created.warnings.len())
                .finish(),
        );
        Ok(created)
    }

    fn spawn(&mut self, type_id: &str, overrides: &Props) -> Result<Created> {
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.lookup(type_id)?;
        let resolution = resolve(descriptor, overrides);
        let id = self.next_node_id(type_id);

        let zones = descriptor
            .zone_names()
            .iter()
            .map(|zone| (zone.clone(), Vec::new()))
            .collect();
        let warnings: Vec<_> = resolution
            .warnings
            .into_iter()
            .map(|warning| warning.for_node(&id))
            .collect();

        self.slots.insert(
            id.clone(),
            Slot {
                node: Node {
                    id: id.clone(),
                    type_id: type_id.to_string(),
                    props: resolution.props,
                    zones,
                },
                parent: None,
            },
        );
        Ok(Created { id, warnings })
    }

    fn next_node_id(&mut self, type_id: &str) -> NodeId {
        let prefix = type_id.to_lowercase();
        loop {
            self.id_counter = self.id_counter.saturating_add(1);
            let id = format!("{prefix}-{}", self.id_counter);
            if !self.slots.contains_key(&id) {
                return id;
            }
        }
    }

    /// Attach the detached node `child` to `zone` of `parent`.
    ///
    /// `index` past the end of the zone is clamped to the end. Returns the
    /// index the child landed at.
    pub fn insert_child(
        &mut self,
        parent: &str,
        zone: &str,
        child: &str,
        index: usize,
    ) -> Result<usize> {
        self.check_destination(parent, zone, child)?;
        if child == self.root || self.parent_of(child).is_some() {
            return Err(ComposeError::NodeAttached(child.to_string()));
        }

        let at = self.attach(parent, zone, child, index)?;
        self.config.record_metrics(|metrics| metrics.record_insert());
        self.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::ChildInserted)
                .detail("parent", parent)
                .detail("zone", zone)
                .detail("child", child)
                .detail("index", at)
                .finish(),
        );
        emit(
            self.config.logger(),
            LogLevel::Debug,
            TREE_TARGET,
            "child_inserted",
            [
                json_kv("parent", parent),
                json_kv("zone", zone),
                json_kv("child", child),
                json_kv("index", at),
            ],
        );
        Ok(at)
    }

    /// Checks shared by insertion and moves, run before anything changes.
    fn check_destination(&self, parent: &str, zone: &str, child: &str) -> Result<()> {
        let parent_node = self.get(parent)?;
        self.get(child)?;

        let descriptor = self.registry.lookup(&parent_node.type_id)?;
        if !descriptor.has_zone(zone) || !parent_node.zones.contains_key(zone) {
            return Err(ComposeError::unknown_zone(&parent_node.type_id, zone));
        }
        if self.is_self_or_ancestor(child, parent) {
            return Err(ComposeError::Cycle {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        Ok(())
    }

    fn is_self_or_ancestor(&self, candidate: &str, of: &str) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent_of(id).map(|link| link.parent.as_str());
        }
        false
    }

    fn attach(&mut self, parent: &str, zone: &str, child: &str, index: usize) -> Result<usize> {
        let slot = self
            .slots
            .get_mut(parent)
            .ok_or_else(|| ComposeError::NodeNotFound(parent.to_string()))?;
        let type_id = &slot.node.type_id;
        let list = slot
            .node
            .zones
            .get_mut(zone)
            .ok_or_else(|| ComposeError::unknown_zone(type_id, zone))?;
        let at = index.min(list.len());
        list.insert(at, child.to_string());

        if let Some(child_slot) = self.slots.get_mut(child) {
            child_slot.parent = Some(ParentLink {
                parent: parent.to_string(),
                zone: zone.to_string(),
            });
        }
        Ok(at)
    }

    fn detach(&mut self, parent: &str, zone: &str, child: &str) -> Result<usize> {
        let slot = self
            .slots
            .get_mut(parent)
            .ok_or_else(|| ComposeError::NodeNotFound(parent.to_string()))?;
        let type_id = &slot.node.type_id;
        let list = slot
            .node
            .zones
            .get_mut(zone)
            .ok_or_else(|| ComposeError::unknown_zone(type_id, zone))?;
        let position = list
            .iter()
            .position(|id| id == child)
            .ok_or_else(|| ComposeError::ChildNotFound {
                parent: parent.to_string(),
                zone: zone.to_string(),
                child: child.to_string(),
            })?;
        list.remove(position);

        if let Some(child_slot) = self.slots.get_mut(child) {
            child_slot.parent = None;
        }
        Ok(position)
    }

    /// Detach `child` (with its subtree) from `zone` of `parent`. The node stays
    /// in the arena and may be inserted elsewhere. Returns its former index.
    pub fn remove_child(&mut self, parent: &str, zone: &str, child: &str) -> Result<usize> {
        let position = self.detach(parent, zone, child)?;
        self.config.record_metrics(|metrics| metrics.record_removal());
        self.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::ChildRemoved)
                .detail("parent", parent)
                .detail("zone", zone)
                .detail("child", child)
                .detail("index", position)
                .finish(),
        );
        Ok(position)
    }

    /// Reorder `child` inside `zone` of `parent`. `to` is clamped to the last
    /// position. Returns the new index.
    pub fn move_child(&mut self, parent: &str, zone: &str, child: &str, to: usize) -> Result<usize> {
        let from = self.detach(parent, zone, child)?;
        let at = self.attach(parent, zone, child, to)?;
        self.config.record_metrics(|metrics| metrics.record_move());
        self.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::ChildMoved)
                .detail("parent", parent)
                .detail("zone", zone)
                .detail("child", child)
                .detail("from", from)
                .detail("to", at)
                .finish(),
        );
        Ok(at)
    }

    /// Move `child` from wherever it sits into `zone` of `parent` at `index`
    /// (an index into the destination after `child` left it). Every check runs
    /// before the node is detached, so a failed move leaves the tree as it was.
    pub fn move_node(&mut self, child: &str, parent: &str, zone: &str, index: usize) -> Result<usize> {
        self.check_destination(parent, zone, child)?;
        if child == self.root {
            return Err(ComposeError::NodeAttached(child.to_string()));
        }

        let previous = self.parent_of(child).cloned();
        let from = match &previous {
            Some(link) => Some(self.detach(&link.parent, &link.zone, child)?),
            None => None,
        };
        let at = self.attach(parent, zone, child, index)?;

        self.config.record_metrics(|metrics| metrics.record_move());
        let mut event = TreeAuditEventBuilder::new(TreeAuditStage::ChildMoved)
            .detail("parent", parent)
            .detail("zone", zone)
            .detail("child", child)
            .detail("to", at);
        if let (Some(link), Some(from)) = (previous, from) {
            event = event
                .detail("from_parent", link.parent)
                .detail("from_zone", link.zone)
                .detail("from", from);
        }
        self.config.audit(event.finish());
        Ok(at)
    }

    /// Merge `overrides` over the current props of `id` and resolve the result
    /// again. A `null` override resets that field to its default.
    pub fn update_props(&mut self, id: &str, overrides: &Props) -> Result<Vec<FieldValidationWarning>> {
        let registry = Arc::clone(&self.registry);
        let slot = self
            .slots
            .get_mut(id)
            .ok_or_else(|| ComposeError::NodeNotFound(id.to_string()))?;
        let descriptor = registry.lookup(&slot.node.type_id)?;

        let mut explicit = slot.node.props.clone();
        explicit.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        let resolution = resolve(descriptor, &explicit);
        slot.node.props = resolution.props;

        let warnings: Vec<_> = resolution
            .warnings
            .into_iter()
            .map(|warning| warning.for_node(id))
            .collect();
        self.report_warnings(&warnings);
        self.config
            .record_metrics(|metrics| metrics.record_warnings(warnings.len()));
        self.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::PropsUpdated)
                .detail("id", id)
                .detail("fields", overrides.keys().cloned().collect::<Vec<_>>())
                .detail("warnings", warnings.len())
                .finish(),
        );
        Ok(warnings)
    }

    /// Drop a detached node and its whole subtree from the arena. Returns the
    /// number of nodes dropped.
    pub fn discard(&mut self, id: &str) -> Result<usize> {
        self.get(id)?;
        if id == self.root || self.parent_of(id).is_some() {
            return Err(ComposeError::NodeAttached(id.to_string()));
        }

        let mut stack = vec![id.to_string()];
        let mut dropped = 0;
        while let Some(next) = stack.pop() {
            if let Some(slot) = self.slots.remove(&next) {
                stack.extend(slot.node.zones.into_values().flatten());
                dropped += 1;
            }
        }

        self.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::NodeDiscarded)
                .detail("id", id)
                .detail("dropped", dropped)
                .finish(),
        );
        Ok(dropped)
    }

    /// Check the structural invariants of the arena: parent links match zone
    /// membership and every node of a registered type carries exactly the
    /// declared zones.
    pub fn verify(&self) -> Result<()> {
        for (id, slot) in &self.slots {
            if let Some(descriptor) = self.registry.get(&slot.node.type_id) {
                let extra = slot.node.zones.keys().find(|zone| !descriptor.has_zone(zone));
                let missing = descriptor
                    .zone_names()
                    .iter()
                    .find(|zone| !slot.node.zones.contains_key(*zone));
                if let Some(zone) = extra.or(missing) {
                    return Err(ComposeError::unknown_zone(&slot.node.type_id, zone));
                }
            }

            for (zone, children) in &slot.node.zones {
                for child in children {
                    let link = self.parent_of(child);
                    if link.map(|l| (l.parent.as_str(), l.zone.as_str())) != Some((id.as_str(), zone.as_str())) {
                        return Err(ComposeError::ChildNotFound {
                            parent: id.clone(),
                            zone: zone.clone(),
                            child: child.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn report_warnings(&self, warnings: &[FieldValidationWarning]) {
        for warning in warnings {
            emit(
                self.config.logger(),
                LogLevel::Warn,
                TREE_TARGET,
                "field_validation_warning",
                [
                    json_kv("node", warning.node.clone()),
                    json_kv("field", warning.field.as_str()),
                    json_kv("detail", warning.to_string()),
                ],
            );
        }
    }
}

impl fmt::Debug for CompositionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionTree")
            .field("root", &self.root)
            .field("nodes", &self.slots.len())
            .finish_non_exhaustive()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::audit::{TreeAuditEventBuilder, TreeAuditStage};
use crate::descriptor::Props;
use crate::error::{ComposeError, Result};
use crate::logging::{LogLevel, TREE_TARGET, emit, json_kv};
use crate::registry::Registry;
use crate::resolve::{FieldValidationWarning, resolve};

use super::core::{CompositionTree, Node, NodeId, ParentLink, Slot, Zones};

/// Persisted form of a node and, recursively, its zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    pub id: NodeId,
    pub type_id: String,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub zones: IndexMap<String, Vec<NodeDocument>>,
}

/// A tree rebuilt from a document together with what the load noticed.
#[derive(Debug)]
pub struct LoadedTree {
    pub tree: CompositionTree,
    /// Prop warnings raised while re-resolving known node types.
    pub warnings: Vec<FieldValidationWarning>,
    /// Nodes whose type is not in the registry. They are kept verbatim and
    /// render as placeholders.
    pub unknown_types: Vec<NodeId>,
}

impl CompositionTree {
    /// Serialize the attached tree.
    pub fn to_document(&self) -> NodeDocument {
        // Pre-order puts every child after its parent, so building in reverse
        // finishes all children before the node that holds them.
        let order: Vec<&Node> = self.iter().map(|(node, _)| node).collect();
        let mut built: HashMap<&str, NodeDocument> = HashMap::with_capacity(order.len());

        for node in order.into_iter().rev() {
            let zones = node
                .zones
                .iter()
                .map(|(zone, children)| {
                    let docs = children
                        .iter()
                        .filter_map(|child| built.remove(child.as_str()))
                        .collect();
                    (zone.clone(), docs)
                })
                .collect();
            built.insert(
                node.id.as_str(),
                NodeDocument {
                    id: node.id.clone(),
                    type_id: node.type_id.clone(),
                    props: node.props.clone(),
                    zones,
                },
            );
        }

        built.remove(self.root.as_str()).unwrap_or_else(|| NodeDocument {
            id: self.root.clone(),
            type_id: String::new(),
            props: Props::new(),
            zones: IndexMap::new(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_document())?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Digest of the serialized attached tree. Two trees with the same
    /// document have the same fingerprint.
    pub fn fingerprint(&self) -> Result<blake3::Hash> {
        let bytes = serde_json::to_vec(&self.to_document())?;
        Ok(blake3::hash(&bytes))
    }

    /// Parse and load a document. `serde_json` limits nesting while parsing,
    /// so documents nested deeper than about forty levels of zones are
    /// rejected with a `Json` error; build such trees through
    /// [`from_document`](Self::from_document) instead.
    pub fn from_json(registry: Arc<Registry>, json: &str) -> Result<LoadedTree> {
        let document: NodeDocument = serde_json::from_str(json)?;
        Self::from_document(registry, document)
    }

    /// Rebuild a tree from `document`.
    ///
    /// Nodes of registered types get their props resolved again and carry
    /// exactly the declared zones (missing ones start empty, undeclared ones
    /// fail with `UnknownZone`). Nodes of unknown types are kept as they are.
    /// Repeated ids fail with `DuplicateNodeId`.
    pub fn from_document(registry: Arc<Registry>, document: NodeDocument) -> Result<LoadedTree> {
        let config = registry.config().clone();
        let mut tree = Self::empty(Arc::clone(&registry), config);
        tree.root = document.id.clone();

        let mut slots: HashMap<NodeId, Slot> = HashMap::new();
        let mut warnings = Vec::new();
        let mut unknown_types = Vec::new();
        let mut stack: Vec<(NodeDocument, Option<ParentLink>)> = vec![(document, None)];

        while let Some((doc, parent)) = stack.pop() {
            let NodeDocument {
                id,
                type_id,
                props,
                zones: doc_zones,
            } = doc;
            if slots.contains_key(&id) {
                return Err(ComposeError::DuplicateNodeId(id));
            }

            let (props, mut zones): (Props, Zones) = match registry.get(&type_id) {
                Some(descriptor) => {
                    if let Some(zone) = doc_zones.keys().find(|zone| !descriptor.has_zone(zone)) {
                        return Err(ComposeError::unknown_zone(&type_id, zone));
                    }
                    let resolution = resolve(descriptor, &props);
                    warnings.extend(
                        resolution
                            .warnings
                            .into_iter()
                            .map(|warning| warning.for_node(&id)),
                    );
                    let zones = descriptor
                        .zone_names()
                        .iter()
                        .map(|zone| (zone.clone(), Vec::new()))
                        .collect();
                    (resolution.props, zones)
                }
                None => {
                    emit(
                        tree.config.logger(),
                        LogLevel::Warn,
                        TREE_TARGET,
                        "unknown_type_loaded",
                        [json_kv("node", id.as_str()), json_kv("type_id", type_id.as_str())],
                    );
                    unknown_types.push(id.clone());
                    let zones = doc_zones
                        .keys()
                        .map(|zone| (zone.clone(), Vec::new()))
                        .collect();
                    (props, zones)
                }
            };

            for (zone, children) in doc_zones {
                let list = zones.entry(zone.clone()).or_default();
                list.extend(children.iter().map(|child| child.id.clone()));
                for child in children.into_iter().rev() {
                    let link = ParentLink {
                        parent: id.clone(),
                        zone: zone.clone(),
                    };
                    stack.push((child, Some(link)));
                }
            }

            slots.insert(
                id.clone(),
                Slot {
                    node: Node {
                        id,
                        type_id,
                        props,
                        zones,
                    },
                    parent,
                },
            );
        }

        tree.id_counter = slots.len() as u64;
        tree.slots = slots;

        emit(
            tree.config.logger(),
            LogLevel::Info,
            TREE_TARGET,
            "tree_loaded",
            [
                json_kv("root", tree.root.as_str()),
                json_kv("nodes", tree.slots.len()),
                json_kv("warnings", warnings.len()),
                json_kv("unknown_types", unknown_types.len()),
            ],
        );
        tree.config.audit(
            TreeAuditEventBuilder::new(TreeAuditStage::TreeLoaded)
                .detail("root", tree.root.as_str())
                .detail("nodes", tree.slots.len())
                .finish(),
        );

        Ok(LoadedTree {
            tree,
            warnings,
            unknown_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{props, registry};
    use serde_json::json;

    fn sample() -> CompositionTree {
        let mut tree = CompositionTree::new(registry(), "Page").unwrap();
        let root = tree.root_id().to_string();
        let card = tree
            .create_node("Card", &props(json!({"title": "Pricing"})))
            .unwrap()
            .id;
        let text = tree
            .create_node("Text", &props(json!({"body": "From $9"})))
            .unwrap()
            .id;
        tree.insert_child(&root, "content", &card, 0).unwrap();
        tree.insert_child(&card, "body", &text, 0).unwrap();
        tree.create_node("Text", &Props::new()).unwrap();
        tree
    }

    #[test]
    fn document_has_persisted_shape() {
        let value = serde_json::to_value(sample().to_document()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "page-1",
                "typeId": "Page",
                "props": {"title": "Home"},
                "zones": {"content": [{
                    "id": "card-2",
                    "typeId": "Card",
                    "props": {"title": "Pricing", "highlighted": false},
                    "zones": {"body": [{
                        "id": "text-3",
                        "typeId": "Text",
                        "props": {"body": "From $9"},
                        "zones": {}
                    }]}
                }]}
            })
        );
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let tree = sample();
        let json = tree.to_json().unwrap();
        let loaded = CompositionTree::from_json(registry(), &json).unwrap();

        assert!(loaded.warnings.is_empty());
        assert!(loaded.unknown_types.is_empty());
        assert_eq!(loaded.tree.to_document(), tree.to_document());
        assert_eq!(loaded.tree.fingerprint().unwrap(), tree.fingerprint().unwrap());
        assert_eq!(loaded.tree.render().unwrap(), tree.render().unwrap());
        loaded.tree.verify().unwrap();
    }

    #[test]
    fn loaded_tree_keeps_issuing_fresh_ids() {
        let json = sample().to_json().unwrap();
        let mut loaded = CompositionTree::from_json(registry(), &json).unwrap().tree;
        let created = loaded.create_node("Card", &Props::new()).unwrap();
        assert!(!["page-1", "card-2", "text-3"].contains(&created.id.as_str()));
    }

    #[test]
    fn fingerprint_tracks_edits() {
        let mut tree = sample();
        let before = tree.fingerprint().unwrap();
        tree.update_props("card-2", &props(json!({"highlighted": true})))
            .unwrap();
        assert_ne!(tree.fingerprint().unwrap(), before);
    }

    #[test]
    fn load_keeps_unknown_types_verbatim() {
        let document = json!({
            "id": "page-1",
            "typeId": "Page",
            "props": {"title": "Docs"},
            "zones": {"content": [{
                "id": "legacy-1",
                "typeId": "LegacyWidget",
                "props": {"speed": 3},
                "zones": {"inner": [{"id": "text-9", "typeId": "Text", "props": {"body": "hi"}}]}
            }]}
        });
        let loaded = CompositionTree::from_json(registry(), &document.to_string()).unwrap();

        assert_eq!(loaded.unknown_types, vec!["legacy-1".to_string()]);
        let legacy = loaded.tree.get("legacy-1").unwrap();
        assert_eq!(legacy.prop("speed"), Some(&json!(3)));
        assert!(loaded.tree.is_attached("text-9"));
        assert_eq!(serde_json::to_value(loaded.tree.to_document()).unwrap(), {
            let mut expected = document.clone();
            expected["zones"]["content"][0]["zones"]["inner"][0]["zones"] = json!({});
            expected
        });
    }

    #[test]
    fn load_reresolves_known_props() {
        let document = json!({
            "id": "root",
            "typeId": "Page",
            "props": {"title": 7, "theme": "dark"}
        });
        let loaded = CompositionTree::from_json(registry(), &document.to_string()).unwrap();

        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].field, "theme");
        let root = loaded.tree.root();
        assert_eq!(root.prop("title"), Some(&json!("7")));
        assert_eq!(root.zone("content"), Some(&[][..]));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let document = json!({
            "id": "page-1",
            "typeId": "Page",
            "zones": {"content": [
                {"id": "text-1", "typeId": "Text"},
                {"id": "text-1", "typeId": "Text"}
            ]}
        });
        let err = CompositionTree::from_json(registry(), &document.to_string()).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateNodeId(ref id) if id == "text-1"));
    }

    #[test]
    fn load_rejects_undeclared_zones() {
        let document = json!({
            "id": "card-1",
            "typeId": "Card",
            "zones": {"footer": []}
        });
        let err = CompositionTree::from_json(registry(), &document.to_string()).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownZone { ref zone, .. } if zone == "footer"));
    }

    #[test]
    fn deep_trees_serialize_without_recursion() {
        const DEPTH: usize = 20_000;
        let mut tree = CompositionTree::new(registry(), "Page").unwrap();
        let root = tree.root_id().to_string();

        // Built bottom-up so every parent is still detached when it adopts.
        let mut top = tree.create_node("Card", &Props::new()).unwrap().id;
        for _ in 1..DEPTH {
            let parent = tree.create_node("Card", &Props::new()).unwrap().id;
            tree.insert_child(&parent, "body", &top, 0).unwrap();
            top = parent;
        }
        tree.insert_child(&root, "content", &top, 0).unwrap();

        let mut document = tree.to_document();
        let mut cards = 0;
        let mut next = document.zones.get_mut("content").and_then(Vec::pop);
        while let Some(mut card) = next {
            assert_eq!(card.type_id, "Card");
            cards += 1;
            next = card.zones.get_mut("body").and_then(Vec::pop);
        }
        assert_eq!(cards, DEPTH);
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = CompositionTree::from_json(registry(), "{\"id\": 1}").unwrap_err();
        assert!(matches!(err, ComposeError::Json(_)));
    }
}

use std::slice;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{CategoryPolicy, EngineConfig};
use crate::descriptor::{ComponentDescriptor, DescriptorExport};
use crate::error::{ComposeError, Result};
use crate::logging::{LogLevel, REGISTRY_TARGET, emit, json_kv};

/// Palette group shown by the host editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub title: String,
    pub components: Vec<String>,
}

/// Category name to palette group, in category creation order.
pub type CategoryIndex = IndexMap<String, Category>;

/// Lookup table from component type id to descriptor plus the category index.
#[derive(Default)]
pub struct Registry {
    descriptors: IndexMap<String, ComponentDescriptor>,
    categories: CategoryIndex,
    config: EngineConfig,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Store `descriptor`, optionally appending it to `category`.
    pub fn register(
        &mut self,
        descriptor: ComponentDescriptor,
        category: Option<&str>,
    ) -> Result<()> {
        descriptor.check()?;
        let type_id = descriptor.type_id().to_string();
        if self.descriptors.contains_key(&type_id) {
            return Err(ComposeError::DuplicateType(type_id));
        }

        emit(
            self.config.logger(),
            LogLevel::Debug,
            REGISTRY_TARGET,
            "component_registered",
            [
                json_kv("type_id", type_id.as_str()),
                json_kv("fields", descriptor.fields().len()),
                json_kv("zones", descriptor.zone_names().to_vec()),
                json_kv("category", category),
            ],
        );
        self.descriptors.insert(type_id.clone(), descriptor);

        if let Some(category) = category {
            self.add_to_category(category, &type_id)?;
        }
        Ok(())
    }

    /// Create `name` with a display title, or retitle it if it exists.
    pub fn define_category(&mut self, name: &str, title: impl Into<String>) {
        let title = title.into();
        self.categories
            .entry(name.to_string())
            .and_modify(|category| category.title = title.clone())
            .or_insert_with(|| Category {
                title,
                components: Vec::new(),
            });
    }

    /// Add an already registered type to `category`, creating the category
    /// (titled after its name) when it does not exist yet. Members stay in
    /// registration order regardless of when they were added.
    pub fn add_to_category(&mut self, category: &str, type_id: &str) -> Result<()> {
        if !self.descriptors.contains_key(type_id) {
            return Err(ComposeError::UnknownType(type_id.to_string()));
        }

        if let Some(existing) = self
            .categories_of(type_id)
            .into_iter()
            .find(|name| *name != category)
        {
            let existing = existing.to_string();
            match self.config.category_policy {
                CategoryPolicy::Exclusive => {
                    return Err(ComposeError::CategoryConflict {
                        type_id: type_id.to_string(),
                        existing,
                    });
                }
                CategoryPolicy::Advisory => emit(
                    self.config.logger(),
                    LogLevel::Warn,
                    REGISTRY_TARGET,
                    "category_conflict",
                    [
                        json_kv("type_id", type_id),
                        json_kv("existing", existing),
                        json_kv("category", category),
                    ],
                ),
            }
        }

        let descriptors = &self.descriptors;
        let rank = |id: &str| descriptors.get_index_of(id).unwrap_or(usize::MAX);
        let entry = self
            .categories
            .entry(category.to_string())
            .or_insert_with(|| Category {
                title: category.to_string(),
                components: Vec::new(),
            });
        if !entry.components.iter().any(|id| id == type_id) {
            let own = rank(type_id);
            let at = entry
                .components
                .iter()
                .position(|id| rank(id.as_str()) > own)
                .unwrap_or(entry.components.len());
            entry.components.insert(at, type_id.to_string());
        }
        Ok(())
    }

    pub fn lookup(&self, type_id: &str) -> Result<&ComponentDescriptor> {
        self.descriptors
            .get(type_id)
            .ok_or_else(|| ComposeError::UnknownType(type_id.to_string()))
    }

    pub fn get(&self, type_id: &str) -> Option<&ComponentDescriptor> {
        self.descriptors.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.descriptors.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Every descriptor in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors.values()
    }

    /// Descriptors of `name` in registration order. The iterator is lazy and
    /// can be cloned to restart it.
    pub fn list_by_category(&self, name: &str) -> Result<CategoryIter<'_>> {
        let category = self
            .categories
            .get(name)
            .ok_or_else(|| ComposeError::UnknownCategory(name.to_string()))?;
        Ok(CategoryIter {
            registry: self,
            ids: category.components.iter(),
        })
    }

    /// Names of the categories listing `type_id`.
    pub fn categories_of(&self, type_id: &str) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, category)| category.components.iter().any(|id| id == type_id))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Registered descriptors that belong to no category.
    pub fn uncategorized(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors
            .iter()
            .filter(|(id, _)| self.categories_of(id).is_empty())
            .map(|(_, descriptor)| descriptor)
    }

    pub fn category_index(&self) -> &CategoryIndex {
        &self.categories
    }

    /// Export shapes for every registered type, keyed by type id.
    pub fn catalog(&self) -> IndexMap<String, DescriptorExport> {
        self.descriptors
            .iter()
            .map(|(id, descriptor)| (id.clone(), descriptor.export()))
            .collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[derive(Clone)]
pub struct CategoryIter<'a> {
    registry: &'a Registry,
    ids: slice::Iter<'a, String>,
}

impl<'a> Iterator for CategoryIter<'a> {
    type Item = &'a ComponentDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        // Category members are only added after their descriptor is stored.
        let registry = self.registry;
        self.ids.by_ref().find_map(|id| registry.get(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Logger, MemorySink};
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn descriptor(type_id: &str) -> ComponentDescriptor {
        ComponentDescriptor::builder(type_id, type_id)
            .field("title", FieldSpec::text("Title"), "Untitled")
            .build()
            .unwrap()
    }

    #[test]
    fn register_then_lookup() {
        let mut registry = Registry::new();
        registry.register(descriptor("Card"), None).unwrap();
        assert_eq!(registry.lookup("Card").unwrap().type_id(), "Card");
        assert!(matches!(
            registry.lookup("Hero"),
            Err(ComposeError::UnknownType(ref id)) if id == "Hero"
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = Registry::new();
        registry.register(descriptor("Card"), Some("layout")).unwrap();
        let err = registry.register(descriptor("Card"), None).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateType(ref id) if id == "Card"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn list_by_category_in_registration_order() {
        let mut registry = Registry::new();
        registry.register(descriptor("Columns"), Some("layout")).unwrap();
        registry.register(descriptor("Heading"), Some("typography")).unwrap();
        registry.register(descriptor("Grid"), Some("layout")).unwrap();

        let iter = registry.list_by_category("layout").unwrap();
        let first: Vec<_> = iter.clone().map(|d| d.type_id()).collect();
        let again: Vec<_> = iter.map(|d| d.type_id()).collect();
        assert_eq!(first, vec!["Columns", "Grid"]);
        assert_eq!(first, again);
    }

    #[test]
    fn late_category_member_keeps_registration_order() {
        let mut registry = Registry::new();
        registry.register(descriptor("Alpha"), None).unwrap();
        registry.register(descriptor("Beta"), Some("layout")).unwrap();
        registry.register(descriptor("Gamma"), Some("layout")).unwrap();
        registry.add_to_category("layout", "Alpha").unwrap();

        let ids: Vec<_> = registry
            .list_by_category("layout")
            .unwrap()
            .map(|d| d.type_id())
            .collect();
        assert_eq!(ids, vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(
            registry.category_index()["layout"].components,
            vec!["Alpha", "Beta", "Gamma"]
        );
    }

    #[test]
    fn unknown_category_fails() {
        let registry = Registry::new();
        assert!(matches!(
            registry.list_by_category("forms"),
            Err(ComposeError::UnknownCategory(_))
        ));
    }

    #[test]
    fn category_index_export_shape() {
        let mut registry = Registry::new();
        registry.define_category("layout", "Layout");
        registry.register(descriptor("Columns"), Some("layout")).unwrap();
        registry.register(descriptor("Heading"), None).unwrap();

        let index = serde_json::to_value(registry.category_index()).unwrap();
        assert_eq!(
            index,
            json!({"layout": {"title": "Layout", "components": ["Columns"]}})
        );
        let loose: Vec<_> = registry.uncategorized().map(|d| d.type_id()).collect();
        assert_eq!(loose, vec!["Heading"]);
    }

    #[test]
    fn advisory_policy_allows_second_category_and_logs() {
        let sink = MemorySink::new();
        let config = EngineConfig::default().with_logger(Logger::new(sink.clone()));
        let mut registry = Registry::with_config(config);
        registry.register(descriptor("Card"), Some("layout")).unwrap();
        registry.add_to_category("content", "Card").unwrap();

        assert_eq!(registry.categories_of("Card"), vec!["layout", "content"]);
        assert!(sink.messages().contains(&"category_conflict".to_string()));
    }

    #[test]
    fn exclusive_policy_rejects_second_category() {
        let config = EngineConfig::default().with_category_policy(CategoryPolicy::Exclusive);
        let mut registry = Registry::with_config(config);
        registry.register(descriptor("Card"), Some("layout")).unwrap();
        let err = registry.add_to_category("content", "Card").unwrap_err();
        assert!(matches!(
            err,
            ComposeError::CategoryConflict { ref existing, .. } if existing == "layout"
        ));
        registry.add_to_category("layout", "Card").unwrap();
        assert_eq!(registry.category_index()["layout"].components, vec!["Card"]);
    }

    #[test]
    fn add_to_category_requires_registration() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.add_to_category("layout", "Ghost"),
            Err(ComposeError::UnknownType(_))
        ));
    }

    #[test]
    fn catalog_lists_every_descriptor() {
        let mut registry = Registry::new();
        registry.register(descriptor("Card"), None).unwrap();
        registry.register(descriptor("Hero"), None).unwrap();
        let catalog = registry.catalog();
        assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["Card", "Hero"]);
        assert_eq!(catalog["Hero"].default_props["title"], json!("Untitled"));
    }
}

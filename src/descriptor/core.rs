use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ComposeError, Result};
use crate::schema::{FieldMap, FieldSpec, check_spec, validate};

/// Resolved or explicit prop values keyed by field.
pub type Props = Map<String, Value>;

/// Output produced by a render function.
pub type Fragment = String;

/// Handed to render functions so they can pull the rendered content of a
/// zone. Nothing inside a zone is rendered until [`zone`](Self::zone) is
/// called for it.
pub trait ZoneContentProvider {
    /// Render the children of `name` depth-first and return their output.
    fn zone(&mut self, name: &str) -> Result<Fragment>;

    /// Number of children currently in `name`, without rendering them.
    fn child_count(&self, name: &str) -> Result<usize>;
}

pub type RenderFn =
    Arc<dyn Fn(&Props, &mut dyn ZoneContentProvider) -> Result<Fragment> + Send + Sync>;

/// Schema, defaults and render contract of one component type.
#[derive(Clone)]
pub struct ComponentDescriptor {
    type_id: String,
    display_name: String,
    fields: FieldMap,
    defaults: Props,
    zone_names: Vec<String>,
    render: RenderFn,
}

impl ComponentDescriptor {
    pub fn builder(
        type_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> DescriptorBuilder {
        DescriptorBuilder::new(type_id.into(), display_name.into())
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    pub fn defaults(&self) -> &Props {
        &self.defaults
    }

    /// Declared zone names in declaration order.
    pub fn zone_names(&self) -> &[String] {
        &self.zone_names
    }

    pub fn has_zone(&self, name: &str) -> bool {
        self.zone_names.iter().any(|zone| zone == name)
    }

    pub fn render(&self, props: &Props, zones: &mut dyn ZoneContentProvider) -> Result<Fragment> {
        (self.render)(props, zones)
    }

    /// Shape handed to the host editor. The render function is not part of it.
    pub fn export(&self) -> DescriptorExport {
        DescriptorExport {
            label: self.display_name.clone(),
            fields: self.fields.clone(),
            default_props: self.defaults.clone(),
            zones: self.zone_names.clone(),
        }
    }

    /// Re-run the well-formedness rules applied by [`DescriptorBuilder::build`].
    pub fn check(&self) -> Result<()> {
        let fail = |reason: String| ComposeError::invalid_descriptor(&self.type_id, reason);

        if self.type_id.trim().is_empty() {
            return Err(fail("type id must not be empty".to_string()));
        }

        for (key, spec) in &self.fields {
            check_spec(key, spec).map_err(fail)?;
            let default = self
                .defaults
                .get(key)
                .ok_or_else(|| fail(format!("field `{key}` has no default")))?;
            validate(spec, default)
                .map_err(|err| fail(format!("default for `{key}` is invalid: {err}")))?;
        }

        if let Some(key) = self.defaults.keys().find(|key| !self.fields.contains_key(*key)) {
            return Err(fail(format!("default `{key}` names no field")));
        }

        let mut seen = HashSet::new();
        for zone in &self.zone_names {
            if zone.trim().is_empty() {
                return Err(fail("zone names must not be empty".to_string()));
            }
            if !seen.insert(zone.as_str()) {
                return Err(fail(format!("zone `{zone}` is declared twice")));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_id", &self.type_id)
            .field("display_name", &self.display_name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("zone_names", &self.zone_names)
            .finish_non_exhaustive()
    }
}

/// Export shape consumed by the host editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorExport {
    pub label: String,
    pub fields: FieldMap,
    pub default_props: Props,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

pub struct DescriptorBuilder {
    type_id: String,
    display_name: String,
    fields: FieldMap,
    defaults: Props,
    zone_names: Vec<String>,
    render: Option<RenderFn>,
}

impl DescriptorBuilder {
    fn new(type_id: String, display_name: String) -> Self {
        Self {
            type_id,
            display_name,
            fields: FieldMap::new(),
            defaults: Props::new(),
            zone_names: Vec::new(),
            render: None,
        }
    }

    /// Add a field together with its default value.
    pub fn field(mut self, key: impl Into<String>, spec: FieldSpec, default: impl Into<Value>) -> Self {
        let key = key.into();
        self.defaults.insert(key.clone(), default.into());
        self.fields.insert(key, spec);
        self
    }

    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn defaults(mut self, defaults: Props) -> Self {
        self.defaults.extend(defaults);
        self
    }

    pub fn zone(mut self, name: impl Into<String>) -> Self {
        self.zone_names.push(name.into());
        self
    }

    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Props, &mut dyn ZoneContentProvider) -> Result<Fragment> + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    /// Finish the descriptor. Without an explicit render function the
    /// descriptor renders its zones back to back in declaration order.
    pub fn build(self) -> Result<ComponentDescriptor> {
        let render = match self.render {
            Some(render) => render,
            None => {
                let zones = self.zone_names.clone();
                Arc::new(
                    move |_: &Props, provider: &mut dyn ZoneContentProvider| -> Result<Fragment> {
                        let mut out = Fragment::new();
                        for zone in &zones {
                            out.push_str(&provider.zone(zone)?);
                        }
                        Ok(out)
                    },
                ) as RenderFn
            }
        };

        let descriptor = ComponentDescriptor {
            type_id: self.type_id,
            display_name: self.display_name,
            fields: self.fields,
            defaults: self.defaults,
            zone_names: self.zone_names,
            render,
        };
        descriptor.check()?;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SelectOption;
    use serde_json::json;

    struct NoZones;

    impl ZoneContentProvider for NoZones {
        fn zone(&mut self, name: &str) -> Result<Fragment> {
            Err(ComposeError::unknown_zone("test", name))
        }

        fn child_count(&self, _name: &str) -> Result<usize> {
            Ok(0)
        }
    }

    fn card() -> DescriptorBuilder {
        ComponentDescriptor::builder("Card", "Card")
            .field("title", FieldSpec::text("Title"), "Untitled")
            .field("highlighted", FieldSpec::boolean("Highlighted"), false)
            .zone("body")
    }

    #[test]
    fn build_accepts_well_formed_descriptor() {
        let descriptor = card().build().unwrap();
        assert_eq!(descriptor.type_id(), "Card");
        assert_eq!(descriptor.zone_names(), ["body".to_string()]);
        assert!(descriptor.has_zone("body"));
        assert_eq!(descriptor.defaults()["title"], json!("Untitled"));
    }

    #[test]
    fn build_rejects_field_without_default() {
        let mut fields = FieldMap::new();
        fields.insert("subtitle".to_string(), FieldSpec::text("Subtitle"));
        let err = card().fields(fields).build().unwrap_err();
        assert!(matches!(err, ComposeError::InvalidDescriptor { ref reason, .. } if reason.contains("subtitle")));
    }

    #[test]
    fn build_rejects_default_for_missing_field() {
        let mut extra = Props::new();
        extra.insert("ghost".to_string(), json!(1));
        let err = card().defaults(extra).build().unwrap_err();
        assert!(matches!(err, ComposeError::InvalidDescriptor { ref reason, .. } if reason.contains("ghost")));
    }

    #[test]
    fn build_rejects_invalid_default() {
        let err = ComponentDescriptor::builder("Align", "Align")
            .field(
                "align",
                FieldSpec::single_select("Align", vec![SelectOption::new("Left", "left")]),
                "center",
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ComposeError::InvalidDescriptor { .. }));
    }

    #[test]
    fn build_rejects_duplicate_zone() {
        let err = card().zone("body").build().unwrap_err();
        assert!(matches!(err, ComposeError::InvalidDescriptor { ref reason, .. } if reason.contains("twice")));
    }

    #[test]
    fn explicit_render_receives_props() {
        let descriptor = card()
            .render(|props, _zones| Ok(format!("<h2>{}</h2>", props["title"].as_str().unwrap_or(""))))
            .build()
            .unwrap();
        let out = descriptor.render(descriptor.defaults(), &mut NoZones).unwrap();
        assert_eq!(out, "<h2>Untitled</h2>");
    }

    #[test]
    fn export_uses_editor_shape() {
        let export = serde_json::to_value(card().build().unwrap().export()).unwrap();
        assert_eq!(export["label"], json!("Card"));
        assert_eq!(export["defaultProps"], json!({"title": "Untitled", "highlighted": false}));
        assert_eq!(export["fields"]["highlighted"]["type"], json!("booleanChoice"));
        assert_eq!(export["zones"], json!(["body"]));
    }
}

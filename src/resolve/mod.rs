//! Prop resolution: explicit instance props merged over descriptor defaults.
//!
//! Resolution is fail-soft. A rejected value falls back to the default and is
//! reported as a [`FieldValidationWarning`], so one bad field never blocks the
//! rest of a page.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::descriptor::{ComponentDescriptor, Props};
use crate::error::Result;
use crate::schema::{FieldError, validate};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "error", rename_all = "camelCase")]
pub enum WarningReason {
    /// The value failed validation; the default was used instead.
    Invalid(FieldError),
    /// The key names no field of the descriptor and was dropped.
    UnknownField,
}

/// Non-fatal report about one explicit prop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub field: String,
    pub rejected: Value,
    #[serde(flatten)]
    pub reason: WarningReason,
}

impl FieldValidationWarning {
    pub(crate) fn for_node(mut self, node: &str) -> Self {
        self.node = Some(node.to_string());
        self
    }
}

impl fmt::Display for FieldValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "node `{node}`: ")?;
        }
        match &self.reason {
            WarningReason::Invalid(err) => {
                write!(f, "field `{}` rejected {}: {err}", self.field, self.rejected)
            }
            WarningReason::UnknownField => write!(f, "unknown field `{}` dropped", self.field),
        }
    }
}

/// Props total over the descriptor's fields plus the warnings raised while
/// building them.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub props: Props,
    pub warnings: Vec<FieldValidationWarning>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Convert the resolved props into the component's concrete props type.
    pub fn typed<P: DeserializeOwned>(&self) -> Result<P> {
        Ok(serde_json::from_value(Value::Object(self.props.clone()))?)
    }
}

/// Resolve `explicit` against `descriptor`.
///
/// For each field: a valid explicit value wins, an absent or `null` value uses
/// the default, an invalid value uses the default and adds a warning. Explicit
/// keys that name no field are dropped with a warning.
pub fn resolve(descriptor: &ComponentDescriptor, explicit: &Props) -> Resolution {
    let mut props = Props::new();
    let mut warnings = Vec::new();

    for (key, spec) in descriptor.fields() {
        let default = || descriptor.defaults().get(key).cloned().unwrap_or(Value::Null);
        let value = match explicit.get(key) {
            None | Some(Value::Null) => default(),
            Some(candidate) => match validate(spec, candidate) {
                Ok(accepted) => accepted,
                Err(err) => {
                    warnings.push(FieldValidationWarning {
                        node: None,
                        field: key.clone(),
                        rejected: candidate.clone(),
                        reason: WarningReason::Invalid(err),
                    });
                    default()
                }
            },
        };
        props.insert(key.clone(), value);
    }

    for (key, value) in explicit {
        if descriptor.field(key).is_none() {
            warnings.push(FieldValidationWarning {
                node: None,
                field: key.clone(),
                rejected: value.clone(),
                reason: WarningReason::UnknownField,
            });
        }
    }

    Resolution { props, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, SelectOption};
    use serde::Deserialize;
    use serde_json::json;

    fn card() -> ComponentDescriptor {
        ComponentDescriptor::builder("Card", "Card")
            .field("title", FieldSpec::text("Title"), "Untitled")
            .field("highlighted", FieldSpec::boolean("Highlighted"), false)
            .field(
                "variant",
                FieldSpec::single_select(
                    "Variant",
                    vec![SelectOption::new("A", "a"), SelectOption::new("B", "b")],
                ),
                "a",
            )
            .zone("body")
            .build()
            .unwrap()
    }

    fn props(value: Value) -> Props {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn empty_explicit_props_yield_defaults() {
        let resolution = resolve(&card(), &Props::new());
        assert!(resolution.is_clean());
        assert_eq!(
            Value::Object(resolution.props),
            json!({"title": "Untitled", "highlighted": false, "variant": "a"})
        );
    }

    #[test]
    fn valid_explicit_value_wins() {
        let resolution = resolve(&card(), &props(json!({"title": "Pricing"})));
        assert_eq!(resolution.props["title"], json!("Pricing"));
        assert_eq!(resolution.props["highlighted"], json!(false));
    }

    #[test]
    fn invalid_option_falls_back_with_warning() {
        let resolution = resolve(&card(), &props(json!({"variant": "c"})));
        assert_eq!(resolution.props["variant"], json!("a"));
        assert_eq!(resolution.warnings.len(), 1);
        let warning = &resolution.warnings[0];
        assert_eq!(warning.field, "variant");
        assert_eq!(warning.rejected, json!("c"));
        assert_eq!(
            warning.reason,
            WarningReason::Invalid(FieldError::InvalidOption { value: json!("c") })
        );
    }

    #[test]
    fn null_counts_as_absent() {
        let resolution = resolve(&card(), &props(json!({"title": null})));
        assert!(resolution.is_clean());
        assert_eq!(resolution.props["title"], json!("Untitled"));
    }

    #[test]
    fn unknown_keys_are_dropped_and_reported() {
        let resolution = resolve(&card(), &props(json!({"subtitle": "x"})));
        assert!(!resolution.props.contains_key("subtitle"));
        assert_eq!(resolution.warnings[0].reason, WarningReason::UnknownField);
        assert_eq!(
            resolution.warnings[0].to_string(),
            "unknown field `subtitle` dropped"
        );
    }

    #[test]
    fn warnings_serialize_for_the_editor() {
        let resolution = resolve(&card(), &props(json!({"highlighted": "maybe"})));
        let warning = resolution.warnings[0].clone().for_node("card-1");
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["node"], json!("card-1"));
        assert_eq!(value["field"], json!("highlighted"));
        assert_eq!(value["reason"], json!("invalid"));
        assert_eq!(value["error"]["kind"], json!("typeMismatch"));
    }

    #[test]
    fn typed_props_follow_resolution() {
        #[derive(Deserialize)]
        struct CardProps {
            title: String,
            highlighted: bool,
        }

        let resolution = resolve(&card(), &props(json!({"highlighted": "true"})));
        let typed: CardProps = resolution.typed().unwrap();
        assert_eq!(typed.title, "Untitled");
        assert!(typed.highlighted);
    }
}

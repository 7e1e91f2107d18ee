use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered mapping of field key to field schema. Keys are unique by
/// construction and keep their declaration order for editor forms.
pub type FieldMap = IndexMap<String, FieldSpec>;

/// One `{label, value}` entry of a select field. Matching is always done on
/// `value`; `label` is presentation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Input kind of a field together with the data only that kind carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    LongText,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    BooleanChoice,
    SingleSelect {
        options: Vec<SelectOption>,
    },
    MultiSelect {
        options: Vec<SelectOption>,
    },
    RepeatingGroup {
        #[serde(rename = "itemSchema")]
        item_schema: FieldMap,
    },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "longText",
            FieldKind::Number { .. } => "number",
            FieldKind::BooleanChoice => "booleanChoice",
            FieldKind::SingleSelect { .. } => "singleSelect",
            FieldKind::MultiSelect { .. } => "multiSelect",
            FieldKind::RepeatingGroup { .. } => "repeatingGroup",
        }
    }

    pub fn options(&self) -> Option<&[SelectOption]> {
        match self {
            FieldKind::SingleSelect { options } | FieldKind::MultiSelect { options } => {
                Some(options)
            }
            _ => None,
        }
    }

    pub fn item_schema(&self) -> Option<&FieldMap> {
        match self {
            FieldKind::RepeatingGroup { item_schema } => Some(item_schema),
            _ => None,
        }
    }
}

/// Schema of a single configurable input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        Self::new(label, FieldKind::Text)
    }

    pub fn long_text(label: impl Into<String>) -> Self {
        Self::new(label, FieldKind::LongText)
    }

    pub fn number(label: impl Into<String>) -> Self {
        Self::new(label, FieldKind::Number { min: None, max: None })
    }

    pub fn boolean(label: impl Into<String>) -> Self {
        Self::new(label, FieldKind::BooleanChoice)
    }

    pub fn single_select(label: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::new(label, FieldKind::SingleSelect { options })
    }

    pub fn multi_select(label: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::new(label, FieldKind::MultiSelect { options })
    }

    pub fn repeating_group(label: impl Into<String>, item_schema: FieldMap) -> Self {
        Self::new(label, FieldKind::RepeatingGroup { item_schema })
    }

    /// Bound a number field. No effect on other kinds.
    pub fn with_range(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        if let FieldKind::Number { min, max } = &mut self.kind {
            *min = lower;
            *max = upper;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_spec_serializes_with_type_tag() {
        let spec = FieldSpec::single_select(
            "Align",
            vec![SelectOption::new("Left", "left"), SelectOption::new("Right", "right")],
        );
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "label": "Align",
                "type": "singleSelect",
                "options": [
                    {"label": "Left", "value": "left"},
                    {"label": "Right", "value": "right"}
                ]
            })
        );
    }

    #[test]
    fn repeating_group_parses_item_schema() {
        let raw = json!({
            "label": "Items",
            "type": "repeatingGroup",
            "itemSchema": {
                "name": {"label": "Name", "type": "text"},
                "price": {"label": "Price", "type": "number", "min": 0.0}
            }
        });
        let spec: FieldSpec = serde_json::from_value(raw).unwrap();
        let schema = spec.kind.item_schema().unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["name", "price"]);
        assert_eq!(
            schema["price"].kind,
            FieldKind::Number {
                min: Some(0.0),
                max: None
            }
        );
        assert!(spec.kind.options().is_none());
    }

    #[test]
    fn with_range_ignores_non_numbers() {
        let spec = FieldSpec::text("Title").with_range(Some(1.0), None);
        assert_eq!(spec.kind, FieldKind::Text);
    }
}

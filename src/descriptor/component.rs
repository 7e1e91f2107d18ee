use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ComposeError, Result};
use crate::schema::{FieldMap, value_kind};

use super::core::{ComponentDescriptor, Fragment, ZoneContentProvider};

/// Statically typed component definition.
///
/// `Props` is the concrete props struct of the component; its serde form must
/// be an object whose keys match [`fields`](Component::fields). The default
/// value of every field is taken from [`defaults`](Component::defaults), so a
/// field can never be left without one.
pub trait Component: 'static {
    type Props: Serialize + DeserializeOwned;

    const TYPE_ID: &'static str;
    const DISPLAY_NAME: &'static str;
    const ZONES: &'static [&'static str] = &[];

    fn fields() -> FieldMap;

    fn defaults() -> Self::Props;

    fn render(props: &Self::Props, zones: &mut dyn ZoneContentProvider) -> Result<Fragment>;
}

impl ComponentDescriptor {
    /// Build the untyped descriptor for `C`. Resolved props are converted back
    /// into `C::Props` before `C::render` runs.
    pub fn of<C: Component>() -> Result<Self> {
        let defaults = match serde_json::to_value(C::defaults())? {
            Value::Object(map) => map,
            other => {
                return Err(ComposeError::invalid_descriptor(
                    C::TYPE_ID,
                    format!("defaults serialize to {} instead of an object", value_kind(&other)),
                ));
            }
        };

        let mut builder = Self::builder(C::TYPE_ID, C::DISPLAY_NAME)
            .fields(C::fields())
            .defaults(defaults);
        for zone in C::ZONES {
            builder = builder.zone(*zone);
        }

        builder
            .render(|props, zones| {
                let typed: C::Props = serde_json::from_value(Value::Object(props.clone()))?;
                C::render(&typed, zones)
            })
            .build()
    }
}

//! Small component catalog shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use crate::descriptor::{ComponentDescriptor, Props};
use crate::registry::Registry;
use crate::schema::{FieldSpec, SelectOption};
use crate::config::EngineConfig;

pub(crate) fn props(value: Value) -> Props {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub(crate) fn page() -> ComponentDescriptor {
    ComponentDescriptor::builder("Page", "Page")
        .field("title", FieldSpec::text("Page title"), "Home")
        .zone("content")
        .render(|props, zones| {
            Ok(format!(
                "<main title=\"{}\">{}</main>",
                props["title"].as_str().unwrap_or_default(),
                zones.zone("content")?
            ))
        })
        .build()
        .unwrap()
}

pub(crate) fn card() -> ComponentDescriptor {
    ComponentDescriptor::builder("Card", "Card")
        .field("title", FieldSpec::text("Title"), "Untitled")
        .field("highlighted", FieldSpec::boolean("Highlighted"), false)
        .zone("body")
        .render(|props, zones| {
            Ok(format!(
                "<section><h3>{}</h3>{}</section>",
                props["title"].as_str().unwrap_or_default(),
                zones.zone("body")?
            ))
        })
        .build()
        .unwrap()
}

pub(crate) fn columns() -> ComponentDescriptor {
    ComponentDescriptor::builder("Columns", "Columns")
        .field(
            "layout",
            FieldSpec::single_select(
                "Layout",
                vec![
                    SelectOption::new("Two columns", "two"),
                    SelectOption::new("Left only", "left"),
                ],
            ),
            "two",
        )
        .zone("left")
        .zone("right")
        .render(|props, zones| {
            let left = zones.zone("left")?;
            if props["layout"] == json!("left") {
                return Ok(format!("<div>{left}</div>"));
            }
            Ok(format!("<div>{left}|{}</div>", zones.zone("right")?))
        })
        .build()
        .unwrap()
}

pub(crate) fn text() -> ComponentDescriptor {
    ComponentDescriptor::builder("Text", "Text")
        .field("body", FieldSpec::long_text("Body"), "")
        .render(|props, _| Ok(format!("<p>{}</p>", props["body"].as_str().unwrap_or_default())))
        .build()
        .unwrap()
}

/// A leaf that counts how often it is rendered.
pub(crate) fn probe(counter: Arc<AtomicUsize>) -> ComponentDescriptor {
    ComponentDescriptor::builder("Probe", "Probe")
        .render(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("<probe/>".to_string())
        })
        .build()
        .unwrap()
}

pub(crate) fn registry_with(config: EngineConfig) -> Registry {
    let mut registry = Registry::with_config(config);
    registry.register(page(), None).unwrap();
    registry.register(card(), Some("layout")).unwrap();
    registry.register(columns(), Some("layout")).unwrap();
    registry.register(text(), Some("typography")).unwrap();
    registry
}

pub(crate) fn registry() -> Arc<Registry> {
    Arc::new(registry_with(EngineConfig::default()))
}

use std::sync::Arc;

use blocktree::{
    BufferedTreeAudit, Component, ComponentDescriptor, CompositionTree, EngineConfig, FieldMap,
    FieldSpec, Fragment, Logger, MemorySink, Props, Registry, SelectOption, ZoneContentProvider,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
struct HeroProps {
    headline: String,
    tone: String,
}

struct Hero;

impl Component for Hero {
    type Props = HeroProps;

    const TYPE_ID: &'static str = "Hero";
    const DISPLAY_NAME: &'static str = "Hero banner";
    const ZONES: &'static [&'static str] = &["actions"];

    fn fields() -> FieldMap {
        FieldMap::from([
            ("headline".to_string(), FieldSpec::text("Headline")),
            (
                "tone".to_string(),
                FieldSpec::single_select(
                    "Tone",
                    vec![
                        SelectOption::new("Light", "light"),
                        SelectOption::new("Dark", "dark"),
                    ],
                ),
            ),
        ])
    }

    fn defaults() -> HeroProps {
        HeroProps {
            headline: "Welcome".to_string(),
            tone: "light".to_string(),
        }
    }

    fn render(props: &HeroProps, zones: &mut dyn ZoneContentProvider) -> blocktree::Result<Fragment> {
        Ok(format!(
            "<header class=\"hero {}\"><h1>{}</h1>{}</header>",
            props.tone,
            props.headline,
            zones.zone("actions")?
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Feature {
    name: String,
    included: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PricingProps {
    plan: String,
    price: f64,
    features: Vec<Feature>,
}

struct Pricing;

impl Component for Pricing {
    type Props = PricingProps;

    const TYPE_ID: &'static str = "Pricing";
    const DISPLAY_NAME: &'static str = "Pricing table";

    fn fields() -> FieldMap {
        let feature = FieldMap::from([
            ("name".to_string(), FieldSpec::text("Feature")),
            ("included".to_string(), FieldSpec::boolean("Included")),
        ]);
        FieldMap::from([
            ("plan".to_string(), FieldSpec::text("Plan")),
            (
                "price".to_string(),
                FieldSpec::number("Monthly price").with_range(Some(0.0), None),
            ),
            ("features".to_string(), FieldSpec::repeating_group("Features", feature)),
        ])
    }

    fn defaults() -> PricingProps {
        PricingProps {
            plan: "Starter".to_string(),
            price: 0.0,
            features: Vec::new(),
        }
    }

    fn render(props: &PricingProps, _zones: &mut dyn ZoneContentProvider) -> blocktree::Result<Fragment> {
        let rows: String = props
            .features
            .iter()
            .map(|feature| {
                let mark = if feature.included { "yes" } else { "no" };
                format!("<li>{} ({mark})</li>", feature.name)
            })
            .collect();
        Ok(format!(
            "<section><h2>{} ${}</h2><ul>{rows}</ul></section>",
            props.plan, props.price
        ))
    }
}

fn object(value: serde_json::Value) -> Props {
    value.as_object().cloned().unwrap_or_default()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = MemorySink::new();
    let audit = Arc::new(BufferedTreeAudit::new());
    let mut config = EngineConfig::default()
        .with_logger(Logger::new(sink.clone()))
        .with_audit(audit.clone());
    config.enable_metrics();

    let mut registry = Registry::with_config(config);
    registry.define_category("marketing", "Marketing");
    registry.register(
        ComponentDescriptor::builder("Page", "Page")
            .field("title", FieldSpec::text("Page title"), "Untitled page")
            .zone("content")
            .build()?,
        None,
    )?;
    registry.register(ComponentDescriptor::of::<Hero>()?, Some("marketing"))?;
    registry.register(ComponentDescriptor::of::<Pricing>()?, Some("marketing"))?;
    registry.register(
        ComponentDescriptor::builder("Button", "Button")
            .field("label", FieldSpec::text("Label"), "Click")
            .render(|props, _| {
                Ok(format!(
                    "<a class=\"button\">{}</a>",
                    props["label"].as_str().unwrap_or_default()
                ))
            })
            .build()?,
        Some("basics"),
    )?;

    println!("palette:");
    println!("{}", serde_json::to_string_pretty(registry.category_index())?);

    let mut tree = CompositionTree::new(Arc::new(registry), "Page")?;
    let root = tree.root_id().to_string();

    let hero = tree.create_node("Hero", &object(json!({"headline": "Ship pages faster", "tone": "dark"})))?;
    let button = tree.create_node("Button", &object(json!({"label": "Start free"})))?;
    let pricing = tree.create_node(
        "Pricing",
        &object(json!({
            "plan": "Team",
            "price": "29",
            "features": [
                {"name": "Unlimited pages", "included": true},
                {"name": "Custom domain", "included": "false"}
            ],
            "badge": "popular"
        })),
    )?;
    for warning in &pricing.warnings {
        println!("warning: {warning}");
    }

    tree.insert_child(&root, "content", &hero.id, 0)?;
    tree.insert_child(&hero.id, "actions", &button.id, 0)?;
    tree.insert_child(&root, "content", &pricing.id, 99)?;

    println!("\noutline:");
    for line in tree.outline(48) {
        println!("{line}");
    }

    println!("\nhtml:\n{}", tree.render()?);
    println!("\ndocument:\n{}", tree.to_json_pretty()?);
    println!("\nfingerprint: {}", tree.fingerprint()?);

    if let Some(metrics) = tree.config().metrics_handle() {
        if let Ok(metrics) = metrics.lock() {
            println!("\nmetrics: {:?}", metrics.snapshot());
        }
    }
    println!("audit stages: {:?}", audit.stages());
    println!("log events: {}", sink.events().len());
    Ok(())
}

//! Text outline of a composition tree for an editor sidebar.
//!
//! Each node gets one line (`Card #card-3`), followed by one line per zone
//! (`[body]`) with the zone's children indented below it. Lines are fitted to
//! the requested display width.

use crate::tree::CompositionTree;
use crate::width::fit_to_width;

const INDENT: &str = "  ";

enum Row<'a> {
    Node { id: &'a str, level: usize },
    Zone { name: &'a str, level: usize, empty: bool },
}

/// Outline lines of the attached tree, each at most `width` columns wide.
pub fn outline(tree: &CompositionTree, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack = vec![Row::Node {
        id: tree.root_id(),
        level: 0,
    }];

    while let Some(row) = stack.pop() {
        let line = match row {
            Row::Node { id, level } => {
                let Some(node) = tree.node(id) else {
                    continue;
                };
                let label = match tree.registry().get(node.type_id()) {
                    Some(descriptor) => descriptor.display_name().to_string(),
                    None => format!("? {}", node.type_id()),
                };

                for (name, children) in node.zones().iter().rev() {
                    for child in children.iter().rev() {
                        stack.push(Row::Node {
                            id: child,
                            level: level + 2,
                        });
                    }
                    stack.push(Row::Zone {
                        name,
                        level: level + 1,
                        empty: children.is_empty(),
                    });
                }
                format!("{}{label} #{}", INDENT.repeat(level), node.id())
            }
            Row::Zone { name, level, empty } => {
                let suffix = if empty { " (empty)" } else { "" };
                format!("{}[{name}]{suffix}", INDENT.repeat(level))
            }
        };
        lines.push(fit_to_width(&line, width));
    }
    lines
}

impl CompositionTree {
    pub fn outline(&self, width: usize) -> Vec<String> {
        outline(self, width)
    }
}

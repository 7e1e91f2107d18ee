use super::core::{CompositionTree, Node};

/// Depth-first pre-order iterator over the attached tree, yielding each node
/// with its depth (the root is depth 0). Children are visited zone by zone in
/// declaration order.
pub struct Walk<'a> {
    tree: &'a CompositionTree,
    stack: Vec<(&'a str, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a Node, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some((id, depth)) = self.stack.pop() {
            let Some(node) = tree.node(id) else {
                continue;
            };
            for children in node.zones.values().rev() {
                for child in children.iter().rev() {
                    self.stack.push((child.as_str(), depth + 1));
                }
            }
            return Some((node, depth));
        }
        None
    }
}

impl CompositionTree {
    pub fn iter(&self) -> Walk<'_> {
        self.iter_from(&self.root)
    }

    /// Walk the subtree rooted at `id`, attached or not.
    pub fn iter_from<'a>(&'a self, id: &'a str) -> Walk<'a> {
        Walk {
            tree: self,
            stack: vec![(id, 0)],
        }
    }

    /// Invoke `visitor(node, depth)` for every attached node, depth-first,
    /// parents before children.
    pub fn walk(&self, mut visitor: impl FnMut(&Node, usize)) {
        for (node, depth) in self.iter() {
            visitor(node, depth);
        }
    }
}

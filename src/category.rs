//! Category taxonomy with DFS range numbering.
//!
//! POIs belong to exactly one category but are visible under every ancestor
//! of that category. The taxonomy assigns each category a postorder
//! `order_number` and the smallest number of its subtree
//! (`first_descendant_order_number`), so "category X and all descendants"
//! becomes the contiguous range `[first_descendant, order]` usable as one
//! axis of a box query.
//!
//! The taxonomy is immutable once built: the ancestor set computed at insert
//! time is therefore guaranteed identical at remove time.

use rustc_hash::FxHashMap;

use crate::error::{PoidexError, Result};

struct CategoryNode {
    parent: Option<String>,
    children: Vec<String>,
    order_number: u32,
    first_descendant: u32,
}

/// An immutable tree (or forest) of named categories.
pub struct CategoryTaxonomy {
    nodes: FxHashMap<String, CategoryNode>,
    roots: Vec<String>,
}

impl CategoryTaxonomy {
    /// Build a taxonomy from `(name, parent)` pairs.
    ///
    /// Parents may appear in any order relative to their children. Returns an
    /// error for duplicate names, unknown parents, or parent cycles.
    pub fn from_categories<I>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut nodes: FxHashMap<String, CategoryNode> = FxHashMap::default();
        let mut insertion_order: Vec<(String, Option<String>)> = Vec::new();

        for (name, parent) in categories {
            if nodes.contains_key(&name) {
                return Err(PoidexError::InvalidTaxonomy(format!(
                    "duplicate category: {name}"
                )));
            }
            nodes.insert(
                name.clone(),
                CategoryNode {
                    parent: parent.clone(),
                    children: Vec::new(),
                    order_number: 0,
                    first_descendant: 0,
                },
            );
            insertion_order.push((name, parent));
        }

        let mut roots = Vec::new();
        for (name, parent) in &insertion_order {
            match parent {
                None => roots.push(name.clone()),
                Some(parent_name) => {
                    if parent_name == name {
                        return Err(PoidexError::InvalidTaxonomy(format!(
                            "category {name} is its own parent"
                        )));
                    }
                    match nodes.get_mut(parent_name) {
                        Some(parent_node) => parent_node.children.push(name.clone()),
                        None => {
                            return Err(PoidexError::InvalidTaxonomy(format!(
                                "category {name} references unknown parent {parent_name}"
                            )));
                        }
                    }
                }
            }
        }

        let mut taxonomy = Self { nodes, roots };
        let mut counter = 0u32;
        let roots = taxonomy.roots.clone();
        for root in &roots {
            taxonomy.assign_order_numbers(root, &mut counter);
        }
        if counter as usize != taxonomy.nodes.len() {
            return Err(PoidexError::InvalidTaxonomy(
                "parent references form a cycle".to_string(),
            ));
        }
        Ok(taxonomy)
    }

    /// Postorder numbering: descendants receive numbers before their parent,
    /// so a subtree occupies the contiguous range ending at its root.
    fn assign_order_numbers(&mut self, name: &str, counter: &mut u32) -> u32 {
        let children = self.nodes[name].children.clone();
        let mut first = None;
        for child in &children {
            let child_first = self.assign_order_numbers(child, counter);
            first.get_or_insert(child_first);
        }
        let order = *counter;
        *counter += 1;
        let first = first.unwrap_or(order);

        let node = self
            .nodes
            .get_mut(name)
            .unwrap_or_else(|| unreachable!("numbering pass visited unknown category"));
        node.order_number = order;
        node.first_descendant = first;
        first
    }

    /// Whether `name` is part of the taxonomy.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the taxonomy has no categories.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every category name, in no particular order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// The category itself followed by its ancestors up to the root.
    ///
    /// Empty when `name` is unknown.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get_key_value(name);
        while let Some((category, node)) = current {
            chain.push(category.clone());
            current = node
                .parent
                .as_deref()
                .and_then(|parent| self.nodes.get_key_value(parent));
        }
        chain
    }

    /// The category itself and every category below it.
    ///
    /// Empty when `name` is unknown.
    pub fn descendants(&self, name: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut result = vec![name.to_string()];
        let mut pending: Vec<&str> = node.children.iter().map(String::as_str).collect();
        while let Some(current) = pending.pop() {
            result.push(current.to_string());
            pending.extend(self.nodes[current].children.iter().map(String::as_str));
        }
        result
    }

    /// The category's postorder number.
    pub fn order_number(&self, name: &str) -> Option<u32> {
        self.nodes.get(name).map(|node| node.order_number)
    }

    /// The smallest postorder number in the category's subtree.
    pub fn first_descendant_order_number(&self, name: &str) -> Option<u32> {
        self.nodes.get(name).map(|node| node.first_descendant)
    }
}

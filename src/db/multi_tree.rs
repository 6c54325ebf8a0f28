//! One spatial tree per category.
//!
//! Every POI is indexed once per ancestor of its category, so a query for a
//! broad category finds items tagged with any descendant without touching
//! the taxonomy at query time. Removal recomputes the same ancestor set from
//! the immutable taxonomy.

use rustc_hash::FxHashMap;

use crate::category::CategoryTaxonomy;
use crate::config::Config;
use crate::error::{PoidexError, Result};
use crate::rtree::SpatialIndex;
use crate::shape::Rect;

use super::{Poi, PoiIndex, PoiIndexStats, apply_limit, query_rect_to_grid};

/// Category-aware POI index backed by one Hilbert R-tree per category.
pub struct MultiTreeIndex {
    taxonomy: CategoryTaxonomy,
    trees: FxHashMap<String, SpatialIndex<u64, Rect>>,
    pois: FxHashMap<u64, Poi>,
}

impl MultiTreeIndex {
    /// Create an index over the given taxonomy with default configuration.
    pub fn new(taxonomy: CategoryTaxonomy) -> Self {
        Self::with_config(taxonomy, &Config::default())
            .unwrap_or_else(|_| unreachable!("default configuration is valid"))
    }

    /// Create an index over the given taxonomy.
    pub fn with_config(taxonomy: CategoryTaxonomy, config: &Config) -> Result<Self> {
        config.validate().map_err(PoidexError::InvalidConfig)?;
        let trees = taxonomy
            .categories()
            .map(|category| {
                (
                    category.to_string(),
                    SpatialIndex::new(config.page_capacity, config.cooperating_siblings),
                )
            })
            .collect();
        Ok(Self {
            taxonomy,
            trees,
            pois: FxHashMap::default(),
        })
    }

    /// The taxonomy this index was built over.
    pub fn taxonomy(&self) -> &CategoryTaxonomy {
        &self.taxonomy
    }

    fn tree(&self, category: &str) -> &SpatialIndex<u64, Rect> {
        match self.trees.get(category) {
            Some(tree) => tree,
            None => unreachable!("taxonomy category {category} has no tree"),
        }
    }

    fn tree_mut(&mut self, category: &str) -> &mut SpatialIndex<u64, Rect> {
        match self.trees.get_mut(category) {
            Some(tree) => tree,
            None => unreachable!("taxonomy category {category} has no tree"),
        }
    }
}

impl PoiIndex for MultiTreeIndex {
    fn insert_poi(&mut self, poi: Poi) -> Result<()> {
        if self.pois.contains_key(&poi.id) {
            return Err(PoidexError::DuplicatePoi(poi.id));
        }
        let ancestors = self.taxonomy.ancestors(&poi.category);
        if ancestors.is_empty() {
            return Err(PoidexError::UnknownCategory(poi.category.clone()));
        }
        let key = poi.key_rect()?;

        for category in &ancestors {
            self.tree_mut(category).insert(key, poi.id);
        }
        log::trace!("indexed poi {} under {} categories", poi.id, ancestors.len());
        self.pois.insert(poi.id, poi);
        Ok(())
    }

    fn remove_poi(&mut self, id: u64) -> Result<bool> {
        let Some(poi) = self.pois.remove(&id) else {
            return Ok(false);
        };
        // The taxonomy is immutable, so this is the exact ancestor set the
        // POI was inserted under.
        let key = poi.key_rect()?;
        for category in self.taxonomy.ancestors(&poi.category) {
            self.tree_mut(&category).remove(&key, &id);
        }
        Ok(true)
    }

    fn find_in_rect(&self, rect: &geo::Rect, category: &str, limit: usize) -> Vec<Poi> {
        if !self.taxonomy.contains(category) {
            log::trace!("query for unknown category {category}");
            return Vec::new();
        }
        let Some(query) = query_rect_to_grid(rect) else {
            return Vec::new();
        };

        let mut results: Vec<Poi> = self
            .tree(category)
            .find(&query)
            .into_iter()
            .filter_map(|id| self.pois.get(&id).cloned())
            .collect();
        apply_limit(&mut results, limit);
        results
    }

    fn pack_insert(&mut self, pois: Vec<Poi>) -> Result<()> {
        if !self.pois.is_empty() {
            return Err(PoidexError::IndexNotEmpty);
        }

        // Validate the whole batch before touching any tree.
        let mut per_category: FxHashMap<String, Vec<(Rect, u64)>> = FxHashMap::default();
        let mut seen = rustc_hash::FxHashSet::default();
        for poi in &pois {
            let ancestors = self.taxonomy.ancestors(&poi.category);
            if ancestors.is_empty() {
                return Err(PoidexError::UnknownCategory(poi.category.clone()));
            }
            if !seen.insert(poi.id) {
                return Err(PoidexError::DuplicatePoi(poi.id));
            }
            let key = poi.key_rect()?;
            for category in ancestors {
                per_category.entry(category).or_default().push((key, poi.id));
            }
        }

        for (category, entries) in per_category {
            self.tree_mut(&category).pack_insert(entries)?;
        }
        self.pois.extend(pois.into_iter().map(|poi| (poi.id, poi)));
        log::debug!("packed {} pois into {} trees", self.pois.len(), self.trees.len());
        Ok(())
    }

    fn purge(&mut self) {
        for tree in self.trees.values_mut() {
            tree.purge();
        }
        self.pois.clear();
    }

    fn len(&self) -> usize {
        self.pois.len()
    }

    fn get(&self, id: u64) -> Option<&Poi> {
        self.pois.get(&id)
    }

    fn stats(&self) -> PoiIndexStats {
        PoiIndexStats {
            categories: self.taxonomy.len(),
            pois: self.pois.len(),
            pages: self.trees.values().map(|tree| tree.stats().pages).sum(),
        }
    }
}

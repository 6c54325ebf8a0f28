//! Single 3D tree over location and category rank.
//!
//! Instead of one tree per category, each POI is indexed once with a 3D key
//! whose third axis is its category's order number times a spread factor.
//! Because subtrees of the taxonomy occupy contiguous number ranges,
//! "this rectangle, this category or any descendant" is a single box query.

use rustc_hash::FxHashMap;

use crate::category::CategoryTaxonomy;
use crate::config::Config;
use crate::error::{PoidexError, Result};
use crate::rtree::SpatialIndex;
use crate::shape::Box3;

use super::{Poi, PoiIndex, PoiIndexStats, apply_limit, query_rect_to_grid};

/// Category-aware POI index backed by a single 3D Hilbert R-tree.
pub struct VolumeIndex {
    taxonomy: CategoryTaxonomy,
    tree: SpatialIndex<u64, Box3>,
    pois: FxHashMap<u64, Poi>,
    spread: u32,
}

impl VolumeIndex {
    /// Create an index over the given taxonomy with default configuration.
    pub fn new(taxonomy: CategoryTaxonomy) -> Self {
        Self::with_config(taxonomy, &Config::default())
            .unwrap_or_else(|_| unreachable!("default configuration is valid"))
    }

    /// Create an index over the given taxonomy.
    pub fn with_config(taxonomy: CategoryTaxonomy, config: &Config) -> Result<Self> {
        config.validate().map_err(PoidexError::InvalidConfig)?;
        Ok(Self {
            taxonomy,
            tree: SpatialIndex::new(config.page_capacity, config.cooperating_siblings),
            pois: FxHashMap::default(),
            spread: config.category_spread_factor,
        })
    }

    /// The taxonomy this index was built over.
    pub fn taxonomy(&self) -> &CategoryTaxonomy {
        &self.taxonomy
    }

    /// The POI's 3D key: its location point extruded to the category axis.
    fn key_box(&self, poi: &Poi) -> Result<Box3> {
        let order = self
            .taxonomy
            .order_number(&poi.category)
            .ok_or_else(|| PoidexError::UnknownCategory(poi.category.clone()))?;
        let rect = poi.key_rect()?;
        let z = order * self.spread;
        Ok(Box3::from_rect(rect, z, z))
    }
}

impl PoiIndex for VolumeIndex {
    fn insert_poi(&mut self, poi: Poi) -> Result<()> {
        if self.pois.contains_key(&poi.id) {
            return Err(PoidexError::DuplicatePoi(poi.id));
        }
        let key = self.key_box(&poi)?;
        self.tree.insert(key, poi.id);
        log::trace!("indexed poi {} at category rank {}", poi.id, key.min_z);
        self.pois.insert(poi.id, poi);
        Ok(())
    }

    fn remove_poi(&mut self, id: u64) -> Result<bool> {
        let Some(poi) = self.pois.remove(&id) else {
            return Ok(false);
        };
        // Same taxonomy, same order number, same key as at insert time.
        let key = self.key_box(&poi)?;
        self.tree.remove(&key, &id);
        Ok(true)
    }

    fn find_in_rect(&self, rect: &geo::Rect, category: &str, limit: usize) -> Vec<Poi> {
        let (Some(order), Some(first)) = (
            self.taxonomy.order_number(category),
            self.taxonomy.first_descendant_order_number(category),
        ) else {
            log::trace!("query for unknown category {category}");
            return Vec::new();
        };
        let Some(query) = query_rect_to_grid(rect) else {
            return Vec::new();
        };

        let volume = Box3::from_rect(query, first * self.spread, order * self.spread);
        let mut results: Vec<Poi> = self
            .tree
            .find(&volume)
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

        let mut entries = Vec::with_capacity(pois.len());
        let mut seen = rustc_hash::FxHashSet::default();
        for poi in &pois {
            if !seen.insert(poi.id) {
                return Err(PoidexError::DuplicatePoi(poi.id));
            }
            entries.push((self.key_box(poi)?, poi.id));
        }

        self.tree.pack_insert(entries)?;
        self.pois.extend(pois.into_iter().map(|poi| (poi.id, poi)));
        log::debug!("packed {} pois into the volume tree", self.pois.len());
        Ok(())
    }

    fn purge(&mut self) {
        self.tree.purge();
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
            pages: self.tree.stats().pages,
        }
    }
}

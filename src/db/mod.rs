//! Category-aware POI indexes.
//!
//! This module defines the public facade over the Hilbert R-tree: a POI
//! record type and two interchangeable index backends. [`MultiTreeIndex`]
//! keeps one 2D tree per category and fans every POI out to all of its
//! ancestor categories; [`VolumeIndex`] keeps a single 3D tree whose third
//! axis is the category's order number, so an ancestor query becomes a box
//! query over the subtree's contiguous number range. Both answer the same
//! queries with the same results.
//!
//! # Thread Safety
//!
//! The backends are single-writer and not internally synchronized. Readers
//! may run concurrently with each other but not with a writer. For shared
//! mutation, enable the `sync` feature and use `SyncPoiIndex`, or wrap a
//! backend in a lock of your choice.

use bytes::Bytes;

use crate::error::Result;
use crate::shape::{Rect, lat_to_grid, lon_to_grid};

mod multi_tree;
mod volume;

#[cfg(feature = "sync")]
mod sync;

pub use multi_tree::MultiTreeIndex;
pub use volume::VolumeIndex;

#[cfg(feature = "sync")]
pub use sync::SyncPoiIndex;

/// A point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    /// Caller-assigned unique id.
    pub id: u64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Name of the POI's (leaf) category.
    pub category: String,
    /// Opaque payload.
    pub data: Bytes,
}

impl Poi {
    /// Create a POI from degree coordinates.
    pub fn new(id: u64, lon: f64, lat: f64, category: impl Into<String>, data: Bytes) -> Self {
        Self {
            id,
            lon,
            lat,
            category: category.into(),
            data,
        }
    }

    /// Create a POI at a `geo` point.
    pub fn at_point(id: u64, point: &geo::Point, category: impl Into<String>, data: Bytes) -> Self {
        Self::new(id, point.x(), point.y(), category, data)
    }

    /// The POI's zero-area key rectangle on the grid.
    pub(crate) fn key_rect(&self) -> Result<Rect> {
        let x = lon_to_grid(self.lon)?;
        let y = lat_to_grid(self.lat)?;
        Ok(Rect::point(x, y))
    }
}

/// Counters describing a POI index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoiIndexStats {
    /// Categories known to the taxonomy.
    pub categories: usize,
    /// Indexed POIs.
    pub pois: usize,
    /// Live tree pages across every spatial index.
    pub pages: usize,
}

/// Common surface of the category-aware index backends.
pub trait PoiIndex {
    /// Index a POI under its category and every ancestor category.
    ///
    /// Fails if the id is already present, the category is unknown, or a
    /// coordinate is out of range.
    fn insert_poi(&mut self, poi: Poi) -> Result<()>;

    /// Remove a POI everywhere it was indexed.
    ///
    /// Returns `Ok(false)` if the id is not present.
    fn remove_poi(&mut self, id: u64) -> Result<bool>;

    /// All POIs inside `rect` (degrees) tagged with `category` or any of its
    /// descendants. `limit` caps the result; 0 means unlimited. An unknown
    /// category yields an empty result.
    fn find_in_rect(&self, rect: &geo::Rect, category: &str, limit: usize) -> Vec<Poi>;

    /// Bulk load an empty index.
    fn pack_insert(&mut self, pois: Vec<Poi>) -> Result<()>;

    /// Drop every POI and every page.
    fn purge(&mut self);

    /// Number of indexed POIs.
    fn len(&self) -> usize;

    /// Whether the index holds no POIs.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a POI by id.
    fn get(&self, id: u64) -> Option<&Poi>;

    /// Counters describing the index.
    fn stats(&self) -> PoiIndexStats;
}

/// Convert a degree query rectangle to the grid, clamping to the globe.
///
/// Returns `None` (query yields nothing) for non-finite coordinates.
pub(crate) fn query_rect_to_grid(rect: &geo::Rect) -> Option<Rect> {
    let min = rect.min();
    let max = rect.max();
    if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
        log::warn!("rejecting query rectangle with non-finite coordinates");
        return None;
    }
    let min_x = lon_to_grid(min.x.clamp(-180.0, 180.0)).ok()?;
    let min_y = lat_to_grid(min.y.clamp(-90.0, 90.0)).ok()?;
    let max_x = lon_to_grid(max.x.clamp(-180.0, 180.0)).ok()?;
    let max_y = lat_to_grid(max.y.clamp(-90.0, 90.0)).ok()?;
    Some(Rect::new(min_x, min_y, max_x, max_y))
}

/// Apply the shared limit convention: 0 keeps everything.
pub(crate) fn apply_limit(results: &mut Vec<Poi>, limit: usize) {
    if limit > 0 && results.len() > limit {
        results.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rect_rejects_non_finite() {
        let rect = geo::Rect::new(
            geo::coord! { x: f64::NAN, y: 0.0 },
            geo::coord! { x: 1.0, y: 1.0 },
        );
        assert!(query_rect_to_grid(&rect).is_none());
    }

    #[test]
    fn test_query_rect_clamps_to_globe() {
        let rect = geo::Rect::new(
            geo::coord! { x: -500.0, y: -100.0 },
            geo::coord! { x: 500.0, y: 100.0 },
        );
        let grid = query_rect_to_grid(&rect).unwrap();
        assert_eq!(grid, Rect::new(0, 0, 360_000_000, 180_000_000));
    }

    #[test]
    fn test_poi_key_rect_is_point() {
        let poi = Poi::new(1, 13.4, 52.5, "shop", Bytes::from_static(b"berlin"));
        let key = poi.key_rect().unwrap();
        assert_eq!(key.min_x, key.max_x);
        assert_eq!(key.min_y, key.max_y);
    }
}

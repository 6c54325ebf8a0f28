//! Thread-safe wrapper for concurrent index access.
//!
//! The index backends are single-writer by design. `SyncPoiIndex` wraps a
//! backend in `Arc<RwLock<...>>` so multiple threads can query concurrently
//! while writes take exclusive access.
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! poidex = { version = "0.1", features = ["sync"] }
//! ```

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::Result;

use super::{Poi, PoiIndex, PoiIndexStats};

/// Thread-safe wrapper around a [`PoiIndex`] backend.
///
/// Clones share the same underlying index. Read operations take a shared
/// lock; mutations take an exclusive lock.
pub struct SyncPoiIndex<I> {
    inner: Arc<RwLock<I>>,
}

impl<I> Clone for SyncPoiIndex<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: PoiIndex> SyncPoiIndex<I> {
    /// Wrap a backend.
    pub fn new(index: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// See [`PoiIndex::insert_poi`].
    pub fn insert_poi(&self, poi: Poi) -> Result<()> {
        self.inner.write().insert_poi(poi)
    }

    /// See [`PoiIndex::remove_poi`].
    pub fn remove_poi(&self, id: u64) -> Result<bool> {
        self.inner.write().remove_poi(id)
    }

    /// See [`PoiIndex::find_in_rect`].
    pub fn find_in_rect(&self, rect: &geo::Rect, category: &str, limit: usize) -> Vec<Poi> {
        self.inner.read().find_in_rect(rect, category, limit)
    }

    /// See [`PoiIndex::pack_insert`].
    pub fn pack_insert(&self, pois: Vec<Poi>) -> Result<()> {
        self.inner.write().pack_insert(pois)
    }

    /// See [`PoiIndex::purge`].
    pub fn purge(&self) {
        self.inner.write().purge();
    }

    /// See [`PoiIndex::len`].
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// See [`PoiIndex::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Look up a POI by id, cloning it out of the index.
    pub fn get(&self, id: u64) -> Option<Poi> {
        self.inner.read().get(id).cloned()
    }

    /// See [`PoiIndex::stats`].
    pub fn stats(&self) -> PoiIndexStats {
        self.inner.read().stats()
    }
}

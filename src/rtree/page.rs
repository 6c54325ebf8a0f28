//! R-tree pages and their entries.

use crate::shape::SpatialShape;

use super::arena::PageId;

/// A child slot: either another page or an opaque leaf item.
///
/// Children are stored homogeneously; whether a page is a leaf follows from
/// its depth in the tree, which callers track, not from the page itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child<T> {
    /// Reference to a deeper page.
    Page(PageId),
    /// Leaf data item.
    Item(T),
}

/// One `(shape, child)` slot of a page.
#[derive(Debug, Clone)]
pub struct Entry<T, S> {
    /// Bounding shape of the child.
    pub shape: S,
    /// The child itself.
    pub child: Child<T>,
}

/// A fixed-capacity node of the tree.
///
/// Entries are kept sorted ascending by their shape's Hilbert value; the
/// largest value is cached for the choose-leaf descent. The parent handle is
/// a non-owning back-reference used for upward rebalancing only.
pub(crate) struct Page<T, S> {
    pub entries: Vec<Entry<T, S>>,
    pub parent: Option<PageId>,
    pub largest_value: u64,
}

impl<T, S: SpatialShape> Page<T, S> {
    pub(crate) fn empty(parent: Option<PageId>) -> Self {
        Self {
            entries: Vec::new(),
            parent,
            largest_value: 0,
        }
    }

    pub(crate) fn with_entry(entry: Entry<T, S>, parent: Option<PageId>) -> Self {
        let mut page = Self::empty(parent);
        page.insert_sorted(entry);
        page
    }

    /// Insert an entry at its Hilbert-ordered position.
    pub(crate) fn insert_sorted(&mut self, entry: Entry<T, S>) {
        let value = entry.shape.linear_order_value();
        let at = self
            .entries
            .partition_point(|existing| existing.shape.linear_order_value() <= value);
        self.entries.insert(at, entry);
        self.refresh_largest();
    }

    /// Re-sort entries after shapes changed in place.
    pub(crate) fn resort(&mut self) {
        self.entries
            .sort_by_cached_key(|entry| entry.shape.linear_order_value());
        self.refresh_largest();
    }

    /// Recompute the cached largest Hilbert value from the last entry.
    pub(crate) fn refresh_largest(&mut self) {
        self.largest_value = self
            .entries
            .last()
            .map(|entry| entry.shape.linear_order_value())
            .unwrap_or(0);
    }

    /// Position of the entry referencing `page_id`.
    pub(crate) fn index_of_page(&self, page_id: PageId) -> usize {
        let found = self
            .entries
            .iter()
            .position(|entry| matches!(entry.child, Child::Page(id) if id == page_id));
        match found {
            Some(index) => index,
            None => unreachable!("page {page_id} missing from its parent"),
        }
    }

    /// Minimal shape containing every entry.
    ///
    /// Pages are never left empty between operations, so a bounding shape
    /// always exists.
    pub(crate) fn bounding_shape(&self) -> S {
        let mut iter = self.entries.iter();
        let mut shape = match iter.next() {
            Some(entry) => entry.shape.clone(),
            None => unreachable!("empty page has no bounding shape"),
        };
        for entry in iter {
            shape.join(&entry.shape);
        }
        shape
    }
}

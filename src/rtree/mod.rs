//! Hilbert-curve-ordered R-tree.
//!
//! A self-balancing, page-oriented spatial index. Pages keep their entries
//! sorted by the Hilbert value of each entry's shape, inserts descend by
//! linear Hilbert-order comparison instead of cost-based enlargement, and
//! overflow or underflow is absorbed by redistributing entries across a small
//! window of sibling pages. A page is split only once every page in its
//! window is simultaneously full (the deferred split), and discarded only
//! once the window as a whole drops below minimum fill.
//!
//! The tree stores no per-page level; the index tracks its height and passes
//! the remaining depth down each recursion.
//!
//! Mutating operations assume exclusive access. Concurrent readers are fine
//! as long as no writer runs; callers needing shared mutation should
//! serialize writers externally (see the `sync` feature on the facade).

mod arena;
mod page;

use smallvec::SmallVec;

use crate::error::{PoidexError, Result};
use crate::shape::SpatialShape;

pub use arena::PageId;

use arena::PageArena;
use page::{Child, Entry, Page};

/// Window buffer sized for the default cooperation width.
type Window = SmallVec<[PageId; 4]>;

/// Counters describing the physical shape of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Live pages in the arena.
    pub pages: usize,
    /// Indexed items.
    pub items: usize,
    /// Tree height in levels (0 for an empty index).
    pub height: usize,
}

/// A Hilbert R-tree over items of type `T` keyed by shapes of type `S`.
pub struct SpatialIndex<T, S> {
    arena: PageArena<T, S>,
    root: Option<PageId>,
    height: usize,
    capacity: usize,
    siblings: usize,
    items: usize,
}

impl<T, S> SpatialIndex<T, S>
where
    T: Copy + PartialEq,
    S: SpatialShape,
{
    /// Create an empty index.
    ///
    /// `capacity` is the number of entries per page, `cooperating_siblings`
    /// the number of neighbors consulted during overflow and underflow
    /// handling.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` or `cooperating_siblings < 1`.
    pub fn new(capacity: usize, cooperating_siblings: usize) -> Self {
        assert!(capacity >= 2, "page capacity must be at least 2");
        assert!(
            cooperating_siblings >= 1,
            "at least one cooperating sibling is required"
        );
        Self {
            arena: PageArena::new(),
            root: None,
            height: 0,
            capacity,
            siblings: cooperating_siblings,
            items: 0,
        }
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items
    }

    /// Whether the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Physical counters of the index.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            pages: self.arena.len(),
            items: self.items,
            height: self.height,
        }
    }

    fn min_fill(&self) -> usize {
        self.capacity / 2
    }

    /// Collect every item whose shape intersects `query`.
    pub fn find(&self, query: &S) -> Vec<T> {
        let mut results = Vec::new();
        if let Some(root) = self.root {
            self.find_recursive(root, query, self.height, &mut results);
        }
        results
    }

    fn find_recursive(&self, page_id: PageId, query: &S, level: usize, results: &mut Vec<T>) {
        let page = self.arena.get(page_id);
        if level > 1 {
            for entry in &page.entries {
                if query.intersects(&entry.shape) {
                    if let Child::Page(child) = entry.child {
                        self.find_recursive(child, query, level - 1, results);
                    }
                }
            }
        } else {
            for entry in &page.entries {
                if query.intersects(&entry.shape) {
                    if let Child::Item(item) = entry.child {
                        results.push(item);
                    }
                }
            }
        }
    }

    /// Insert an item under the given key shape.
    ///
    /// The owning leaf is located by linear Hilbert-order comparison from the
    /// root; a full leaf first redistributes into its sibling window and only
    /// splits once the whole window is full. Root growth is handled
    /// internally.
    pub fn insert(&mut self, shape: S, item: T) {
        let value = shape.linear_order_value();
        let entry = Entry {
            shape,
            child: Child::Item(item),
        };
        match self.root {
            None => {
                self.root = Some(self.arena.allocate(Page::with_entry(entry, None)));
                self.height = 1;
            }
            Some(root) => {
                let leaf = self.choose_leaf(root, self.height, value);
                if let Some(new_root) = self.put(leaf, entry) {
                    self.root = Some(new_root);
                }
            }
        }
        self.items += 1;
    }

    /// Descend into the first child whose largest Hilbert value exceeds the
    /// new key, falling back to the last child.
    fn choose_leaf(&self, page_id: PageId, level: usize, value: u64) -> PageId {
        if level <= 1 {
            return page_id;
        }
        let page = self.arena.get(page_id);
        for entry in &page.entries {
            if let Child::Page(child) = entry.child {
                if self.arena.get(child).largest_value > value {
                    return self.choose_leaf(child, level - 1, value);
                }
            }
        }
        match page.entries.last() {
            Some(Entry {
                child: Child::Page(child),
                ..
            }) => self.choose_leaf(*child, level - 1, value),
            _ => unreachable!("internal page without page children"),
        }
    }

    /// Add an entry to a page, redistributing or splitting as needed.
    /// Returns the new root when the tree grew a level.
    fn put(&mut self, page_id: PageId, entry: Entry<T, S>) -> Option<PageId> {
        if self.arena.get(page_id).entries.len() < self.capacity {
            self.arena.get_mut(page_id).insert_sorted(entry);
            self.refresh_ancestor_shapes(page_id);
            None
        } else {
            self.distribute_on_put(page_id, entry)
        }
    }

    fn distribute_on_put(&mut self, page_id: PageId, entry: Entry<T, S>) -> Option<PageId> {
        // A root that must split first wraps itself in a fresh root, so it
        // redistributes against itself alone and overflows into a sibling
        // under the new root.
        let mut created_root = None;
        if self.arena.get(page_id).parent.is_none() {
            let shape = self.arena.get(page_id).bounding_shape();
            let root = Page::with_entry(
                Entry {
                    shape,
                    child: Child::Page(page_id),
                },
                None,
            );
            let root_id = self.arena.allocate(root);
            self.arena.get_mut(page_id).parent = Some(root_id);
            self.height += 1;
            created_root = Some(root_id);
            log::debug!("index grew to height {}", self.height);
        }

        let parent_id = match self.arena.get(page_id).parent {
            Some(id) => id,
            None => unreachable!("page left without a parent during split"),
        };
        let index = self.arena.get(parent_id).index_of_page(page_id);
        let mut window = self.sibling_window(parent_id, index);

        let overflowing = window
            .iter()
            .all(|&id| self.arena.get(id).entries.len() >= self.capacity);
        let mut new_sibling = None;
        if overflowing {
            let sibling = self.arena.allocate(Page::empty(Some(parent_id)));
            window.push(sibling);
            new_sibling = Some(sibling);
            log::debug!(
                "deferred split: window of {} pages was full, created page {sibling}",
                window.len() - 1
            );
        }

        self.distribute_entries(&window, vec![entry]);
        // The new sibling has no slot in the parent yet; only the
        // pre-existing window pages have shapes to refresh.
        let existing = match new_sibling {
            Some(_) => &window[..window.len() - 1],
            None => &window[..],
        };
        self.refresh_window_shapes(parent_id, existing);

        let deeper_root = match new_sibling {
            Some(sibling) => {
                let shape = self.arena.get(sibling).bounding_shape();
                self.put(
                    parent_id,
                    Entry {
                        shape,
                        child: Child::Page(sibling),
                    },
                )
            }
            None => {
                self.refresh_ancestor_shapes(parent_id);
                None
            }
        };
        deeper_root.or(created_root)
    }

    /// Remove the entry holding `item` from the leaf that contains it.
    ///
    /// Removing an item that is not present is a no-op and returns `false`.
    pub fn remove(&mut self, shape: &S, item: &T) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let Some((leaf, index)) = self.find_containing_leaf(root, shape, self.height, item) else {
            return false;
        };
        if let Some(new_root) = self.remove_branch(leaf, index) {
            self.root = Some(new_root);
        }
        self.items -= 1;
        true
    }

    /// Intersection-guided descent to the leaf actually holding `item`.
    /// Search-path descent, backtracking across intersecting branches.
    fn find_containing_leaf(
        &self,
        page_id: PageId,
        shape: &S,
        level: usize,
        item: &T,
    ) -> Option<(PageId, usize)> {
        let page = self.arena.get(page_id);
        if level > 1 {
            for entry in &page.entries {
                if shape.intersects(&entry.shape) {
                    if let Child::Page(child) = entry.child {
                        if let Some(found) =
                            self.find_containing_leaf(child, shape, level - 1, item)
                        {
                            return Some(found);
                        }
                    }
                }
            }
            None
        } else {
            page.entries
                .iter()
                .position(|entry| matches!(&entry.child, Child::Item(held) if held == item))
                .map(|index| (page_id, index))
        }
    }

    /// Drop the entry at `index`, rebalancing when the page falls below
    /// minimum fill. Returns the new root when the tree shrank a level.
    fn remove_branch(&mut self, page_id: PageId, index: usize) -> Option<PageId> {
        let min_fill = self.min_fill();
        let page = self.arena.get_mut(page_id);
        page.entries.remove(index);
        page.refresh_largest();
        if page.entries.len() < min_fill {
            self.distribute_on_remove(page_id)
        } else {
            None
        }
    }

    fn distribute_on_remove(&mut self, page_id: PageId) -> Option<PageId> {
        let Some(parent_id) = self.arena.get(page_id).parent else {
            // Root underflow: collapse height once the root is down to a
            // single page child. A small root leaf is left alone.
            let page = self.arena.get(page_id);
            if page.entries.len() == 1 {
                if let Child::Page(child) = page.entries[0].child {
                    self.arena.deallocate(page_id);
                    self.arena.get_mut(child).parent = None;
                    self.height -= 1;
                    log::debug!("root collapsed to height {}", self.height);
                    return Some(child);
                }
            }
            return None;
        };

        let index = self.arena.get(parent_id).index_of_page(page_id);
        let window = self.sibling_window(parent_id, index);
        if window.len() <= 1 {
            // No sibling to cooperate with; tolerate the underfull page.
            return None;
        }

        let total: usize = window
            .iter()
            .map(|&id| self.arena.get(id).entries.len())
            .sum();
        if total < self.min_fill() * window.len() {
            // The window as a whole is underflowing: drain this page into the
            // surviving siblings and drop it from the parent.
            let survivors: Window = window.iter().copied().filter(|&id| id != page_id).collect();
            let orphaned = std::mem::take(&mut self.arena.get_mut(page_id).entries);
            self.distribute_entries(&survivors, orphaned);
            self.refresh_window_shapes(parent_id, &survivors);
            let parent_index = self.arena.get(parent_id).index_of_page(page_id);
            self.arena.deallocate(page_id);
            log::debug!("page {page_id} drained into {} siblings", survivors.len());
            self.remove_branch(parent_id, parent_index)
        } else {
            self.distribute_entries(&window, Vec::new());
            self.refresh_window_shapes(parent_id, &window);
            None
        }
    }

    /// Select the contiguous window of up to `siblings + 1` children of
    /// `parent_id` around `index`, preferring `index` in the middle and
    /// clamped to the valid child range. Trees narrower than the window get
    /// every child.
    fn sibling_window(&self, parent_id: PageId, index: usize) -> Window {
        let parent = self.arena.get(parent_id);
        let n = parent.entries.len();
        let width = self.siblings + 1;
        let mut offset = index.saturating_sub(self.siblings / 2);
        if offset + width > n {
            offset = n.saturating_sub(width);
        }
        let end = n.min(offset + width);
        debug_assert!(offset <= index && index < end, "window must cover the page");

        (offset..end)
            .map(|i| match parent.entries[i].child {
                Child::Page(id) => id,
                Child::Item(_) => unreachable!("sibling window over leaf items"),
            })
            .collect()
    }

    /// Pool the entries of every window page plus `extra`, sort by Hilbert
    /// value, and deal them back out evenly; the first `len % pages` pages
    /// receive one extra entry.
    fn distribute_entries(&mut self, window: &[PageId], extra: Vec<Entry<T, S>>) {
        let mut pooled: Vec<Entry<T, S>> = Vec::with_capacity(window.len() * self.capacity);
        for &id in window {
            pooled.append(&mut self.arena.get_mut(id).entries);
        }
        pooled.extend(extra);
        pooled.sort_by_cached_key(|entry| entry.shape.linear_order_value());
        debug_assert!(
            pooled.len() <= window.len() * self.capacity,
            "window cannot hold its pooled entries"
        );

        let step = pooled.len() / window.len();
        let remainder = pooled.len() % window.len();
        let mut pool = pooled.into_iter();
        for (i, &id) in window.iter().enumerate() {
            let take = step + usize::from(i < remainder);
            let share: Vec<Entry<T, S>> = pool.by_ref().take(take).collect();
            self.replace_children(id, share);
        }
    }

    /// Install a new sorted entry list on a page, re-homing page children.
    fn replace_children(&mut self, page_id: PageId, entries: Vec<Entry<T, S>>) {
        debug_assert!(entries.len() <= self.capacity);
        for entry in &entries {
            if let Child::Page(child) = entry.child {
                self.arena.get_mut(child).parent = Some(page_id);
            }
        }
        let page = self.arena.get_mut(page_id);
        page.entries = entries;
        page.refresh_largest();
    }

    /// Refresh the parent's shape slot for every window page, then restore
    /// the parent's sort order.
    fn refresh_window_shapes(&mut self, parent_id: PageId, window: &[PageId]) {
        for &id in window {
            let shape = self.arena.get(id).bounding_shape();
            let parent = self.arena.get_mut(parent_id);
            let index = parent.index_of_page(id);
            parent.entries[index].shape = shape;
        }
        self.arena.get_mut(parent_id).resort();
    }

    /// Propagate a page's changed bounding shape up to the root.
    fn refresh_ancestor_shapes(&mut self, mut page_id: PageId) {
        while let Some(parent_id) = self.arena.get(page_id).parent {
            let shape = self.arena.get(page_id).bounding_shape();
            let parent = self.arena.get_mut(parent_id);
            let index = parent.index_of_page(page_id);
            parent.entries[index].shape = shape;
            parent.resort();
            page_id = parent_id;
        }
    }

    /// Bulk load a sorted or unsorted sequence into an empty index.
    ///
    /// All pairs are sorted by Hilbert value once, sliced into evenly filled
    /// leaf pages, and the tree is built bottom-up; the result has minimum
    /// height and every non-root page at or above minimum fill. Incremental
    /// insertion and redistribution are bypassed entirely.
    ///
    /// Returns [`PoidexError::IndexNotEmpty`] if the index holds items.
    pub fn pack_insert<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, T)>,
    {
        if self.items > 0 {
            return Err(PoidexError::IndexNotEmpty);
        }
        self.purge();

        let mut entries: Vec<Entry<T, S>> = pairs
            .into_iter()
            .map(|(shape, item)| Entry {
                shape,
                child: Child::Item(item),
            })
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        entries.sort_by_cached_key(|entry| entry.shape.linear_order_value());
        self.items = entries.len();

        let mut level = self.build_level(entries);
        self.height = 1;
        while level.len() > 1 {
            let parents: Vec<Entry<T, S>> = level
                .iter()
                .map(|&id| Entry {
                    shape: self.arena.get(id).bounding_shape(),
                    child: Child::Page(id),
                })
                .collect();
            level = self.build_level(parents);
            self.height += 1;
        }
        self.root = Some(level[0]);
        log::debug!(
            "packed {} items into {} pages, height {}",
            self.items,
            self.arena.len(),
            self.height
        );
        Ok(())
    }

    /// Deal one level's entries into evenly filled pages.
    ///
    /// Even slicing keeps every page of the level at or above minimum fill
    /// whenever more than one page is needed.
    fn build_level(&mut self, entries: Vec<Entry<T, S>>) -> Vec<PageId> {
        let pages = entries.len().div_ceil(self.capacity);
        let step = entries.len() / pages;
        let remainder = entries.len() % pages;
        let mut out = Vec::with_capacity(pages);
        let mut pool = entries.into_iter();
        for i in 0..pages {
            let take = step + usize::from(i < remainder);
            let share: Vec<Entry<T, S>> = pool.by_ref().take(take).collect();
            let id = self.arena.allocate(Page::empty(None));
            self.replace_children(id, share);
            // Bounding shapes of an upper level are not ordered by the child
            // order they were produced in.
            self.arena.get_mut(id).resort();
            out.push(id);
        }
        out
    }

    /// Deallocate every page, leaving an empty index.
    pub fn purge(&mut self) {
        if let Some(root) = self.root.take() {
            self.purge_recursive(root, self.height);
        }
        self.height = 0;
        self.items = 0;
    }

    fn purge_recursive(&mut self, page_id: PageId, level: usize) {
        if level > 1 {
            let children: Vec<PageId> = self
                .arena
                .get(page_id)
                .entries
                .iter()
                .filter_map(|entry| match entry.child {
                    Child::Page(child) => Some(child),
                    Child::Item(_) => None,
                })
                .collect();
            for child in children {
                self.purge_recursive(child, level - 1);
            }
        }
        self.arena.deallocate(page_id);
    }

    /// Visit every item in tree order (approximately Hilbert order).
    pub fn iter(&self) -> HilbertIter<'_, T, S> {
        HilbertIter {
            index: self,
            stack: self.root.map(|root| vec![(root, 0)]).unwrap_or_default(),
        }
    }

    /// Drain the identities of pages mutated since the last call, for
    /// write-back by an external store.
    pub fn take_dirty_pages(&mut self) -> Vec<PageId> {
        self.arena.take_dirty()
    }

    /// Verify the structural invariants of the whole tree.
    ///
    /// Checks capacity and minimum fill bounds, page-local Hilbert sort
    /// order, parent back-references, bounding-shape containment, and level
    /// homogeneity. Intended for tests and diagnostics.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let Some(root) = self.root else {
            return Ok(());
        };
        self.check_page(root, self.height, true)
    }

    fn check_page(
        &self,
        page_id: PageId,
        level: usize,
        is_root: bool,
    ) -> std::result::Result<(), String> {
        let page = self.arena.get(page_id);
        let n = page.entries.len();
        if n > self.capacity {
            return Err(format!(
                "page {page_id} holds {n} entries, capacity is {}",
                self.capacity
            ));
        }
        if !is_root && n < self.min_fill() {
            return Err(format!(
                "page {page_id} holds {n} entries, minimum fill is {}",
                self.min_fill()
            ));
        }
        for pair in page.entries.windows(2) {
            if pair[0].shape.linear_order_value() > pair[1].shape.linear_order_value() {
                return Err(format!("page {page_id} entries out of Hilbert order"));
            }
        }
        if let Some(last) = page.entries.last() {
            if page.largest_value != last.shape.linear_order_value() {
                return Err(format!("page {page_id} caches a stale largest value"));
            }
        }

        if level > 1 {
            for entry in &page.entries {
                let Child::Page(child) = entry.child else {
                    return Err(format!("item entry inside internal page {page_id}"));
                };
                let child_page = self.arena.get(child);
                if child_page.parent != Some(page_id) {
                    return Err(format!("page {child} has a stale parent reference"));
                }
                if !entry.shape.contains(&child_page.bounding_shape()) {
                    return Err(format!(
                        "bounding shape of page {child} escapes its parent slot"
                    ));
                }
                self.check_page(child, level - 1, false)?;
            }
        } else if page
            .entries
            .iter()
            .any(|entry| matches!(entry.child, Child::Page(_)))
        {
            return Err(format!("page entry inside leaf page {page_id}"));
        }
        Ok(())
    }
}

/// Depth-first iterator yielding items in tree order.
pub struct HilbertIter<'a, T, S> {
    index: &'a SpatialIndex<T, S>,
    stack: Vec<(PageId, usize)>,
}

impl<T, S> Iterator for HilbertIter<'_, T, S>
where
    T: Copy + PartialEq,
    S: SpatialShape,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let (page_id, position) = self.stack.last_mut()?;
            let page = self.index.arena.get(*page_id);
            if *position >= page.entries.len() {
                self.stack.pop();
                continue;
            }
            let at = *position;
            *position += 1;
            match page.entries[at].child {
                Child::Page(child) => self.stack.push((child, 0)),
                Child::Item(item) => return Some(item),
            }
        }
    }
}

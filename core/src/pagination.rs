//! Fixed-size, 1-indexed pagination over an in-memory sequence.
//!
//! The whole list is always held client-side; a page is a contiguous slice.

use serde::{Deserialize, Serialize};
use std::hash::{DefaultHasher, Hash, Hasher};

/// Page size used by the ticket catalog when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Number of pages needed for `len` items (0 for an empty list)
#[must_use]
pub const fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// The `page`-th slice (1-indexed). Out-of-range pages are empty.
#[must_use]
pub fn page<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    let end = start.saturating_add(page_size).min(items.len());
    items.get(start..end).unwrap_or(&[])
}

/// Current page plus enough memory to notice when the underlying sequence changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-indexed current page
    pub current: usize,
    /// Items per page
    pub page_size: usize,
    #[serde(skip)]
    fingerprint: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    /// Start on page 1
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            current: 1,
            page_size,
            fingerprint: None,
        }
    }

    /// Record the sequence being paged. Resets to page 1 if it differs from
    /// the previously synced one. Returns `true` on reset.
    pub fn sync<K: Hash>(&mut self, keys: impl IntoIterator<Item = K>) -> bool {
        let fingerprint = fingerprint(keys);
        let changed = self.fingerprint != Some(fingerprint);
        if changed {
            self.fingerprint = Some(fingerprint);
            self.current = 1;
        }
        changed
    }

    /// Page to show for `keys` without recording them: the current page if
    /// `keys` is the synced sequence, page 1 otherwise.
    #[must_use]
    pub fn page_for<K: Hash>(&self, keys: impl IntoIterator<Item = K>) -> usize {
        if self.fingerprint == Some(fingerprint(keys)) {
            self.current
        } else {
            1
        }
    }

    /// Jump to `page`, clamped to `1..=total_pages` (page 1 for empty lists)
    pub fn go_to(&mut self, page: usize, len: usize) {
        let total = page_count(len, self.page_size).max(1);
        self.current = page.clamp(1, total);
    }

    /// Total pages for `len` items
    #[must_use]
    pub const fn total_pages(&self, len: usize) -> usize {
        page_count(len, self.page_size)
    }
}

fn fingerprint<K: Hash>(keys: impl IntoIterator<Item = K>) -> u64 {
    let mut hasher = DefaultHasher::new();
    let mut count = 0usize;
    for key in keys {
        key.hash(&mut hasher);
        count += 1;
    }
    count.hash(&mut hasher);
    hasher.finish()
}

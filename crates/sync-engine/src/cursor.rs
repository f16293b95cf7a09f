// crates/sync-engine/src/cursor.rs
//! Pagination over the remote collection

/// Number of records the remote store returns per page
pub const PAGE_SIZE: usize = 15;

/// Tracks how far the remote collection has been loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    loaded: usize,
    exhausted: bool,
}

/// A page request: offset and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub from: usize,
    pub size: usize,
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the request for the next page
    pub fn request_more(&self) -> PageRequest {
        PageRequest {
            from: self.loaded,
            size: PAGE_SIZE,
        }
    }

    /// Records a returned page; a short page means the collection is exhausted
    pub fn advance(&mut self, returned: usize) {
        self.loaded += returned;
        self.exhausted = returned < PAGE_SIZE;
    }

    /// Starts over from the beginning of the collection
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

use crate::model::PageId;

/// Hands out page identities
///
/// The crawler owns one allocator per session, so tests can predict which id
/// a page or delta page will receive.
#[derive(Debug, Clone)]
pub struct PageIdAllocator {
    next: PageId,
}

impl PageIdAllocator {
    /// Allocator whose first id is 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: PageId) -> Self {
        Self { next: first }
    }

    pub fn allocate(&mut self) -> PageId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to `allocate` returns
    pub fn peek(&self) -> PageId {
        self.next
    }
}

impl Default for PageIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

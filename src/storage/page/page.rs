use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::config::{PageId, PAGE_SIZE};

/// A frame of the buffer pool: a fixed-size byte buffer plus the bookkeeping
/// (`page_id`, `pin_count`, `is_dirty`) the buffer pool manager needs to
/// decide whether the frame can be repurposed. `Page` is a cheap `Clone`
/// handle (an `Arc` around the actual storage) so a caller can go on reading
/// or writing the frame's bytes after the pool's own latch has been
/// released, as long as the pin it took out is still held.
#[derive(Debug, Clone)]
pub struct Page(Arc<RwLock<PageInner>>);

#[derive(Debug)]
struct PageInner {
    data: [u8; PAGE_SIZE],
    page_id: Option<PageId>,
    pin_count: i32,
    is_dirty: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// A frame with no resident page: zeroed data, unpinned, clean.
    pub fn new() -> Page {
        let inner = PageInner {
            data: [0; PAGE_SIZE],
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        };
        Page(Arc::new(RwLock::new(inner)))
    }

    /// Returns this frame to the empty state: zeroed data, no page id, no
    /// pin, not dirty. Used when a frame is repurposed (`update_page`) and
    /// when a page is deleted outright.
    pub fn reset(&self) {
        let mut inner = self.0.write();
        inner.data.fill(0);
        inner.page_id = None;
        inner.pin_count = 0;
        inner.is_dirty = false;
    }

    pub fn get_data(&self) -> MappedRwLockReadGuard<'_, [u8; PAGE_SIZE]> {
        RwLockReadGuard::map(self.0.read(), |inner| &inner.data)
    }

    pub fn get_data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8; PAGE_SIZE]> {
        RwLockWriteGuard::map(self.0.write(), |inner| &mut inner.data)
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.0.write().page_id = Some(page_id);
    }

    pub fn get_page_id(&self) -> Option<PageId> {
        self.0.read().page_id
    }

    pub fn get_pin_count(&self) -> i32 {
        self.0.read().pin_count
    }

    pub fn pin(&self) {
        self.0.write().pin_count += 1;
    }

    /// Decrements the pin count. Returns `None` if the page was already
    /// unpinned (caller error), `Some(new_count)` otherwise.
    pub fn unpin(&self) -> Option<i32> {
        let mut inner = self.0.write();
        if inner.pin_count == 0 {
            return None;
        }
        inner.pin_count -= 1;
        Some(inner.pin_count)
    }

    pub fn is_dirty(&self) -> bool {
        self.0.read().is_dirty
    }

    /// ORs `dirty` into the frame's dirty bit. Never clears it: dirtiness is
    /// a monotone latch that only a flush or a full reset may clear.
    pub fn mark_dirty(&self, dirty: bool) {
        if dirty {
            self.0.write().is_dirty = true;
        }
    }

    pub fn clear_dirty(&self) {
        self.0.write().is_dirty = false;
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::lru_replacer::LRUReplacer;
use crate::common::config::{FileId, FrameId, PageId};
use crate::common::error::Result;
use crate::storage::disk::{DiskManager, DiskRequest, DiskScheduler};
use crate::storage::page::Page;

/// All of the buffer pool's mutable state, behind a single latch. Disk I/O
/// for a miss is performed with this latch held: the lock granularity is
/// coarse by design (see module docs), so every public operation is
/// linearizable with respect to it.
struct PoolState {
    /// Every frame in the pool. Never resized after construction.
    pages: Vec<Page>,
    /// Resident pages: PageId -> the frame holding it.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no logical page, ready for immediate reuse.
    free_list: VecDeque<FrameId>,
    /// Eviction candidates among the resident, unpinned frames.
    replacer: LRUReplacer,
}

/// BufferPoolManager reads disk pages into, and writes them back out of, a
/// fixed-size array of in-memory frames. It is the sole arbiter of which
/// pages are resident at any moment: callers never see a page outside of a
/// pinned frame, and a frame is never repurposed while any caller still
/// holds a pin on it.
pub struct BufferPoolManager {
    pool_size: usize,
    disk_manager: Arc<DiskManager>,
    disk_scheduler: DiskScheduler,
    state: Mutex<PoolState>,
}

impl BufferPoolManager {
    /// Creates a new pool of `pool_size` frames backed by `disk_manager`.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> BufferPoolManager {
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in (0..pool_size).rev() {
            free_list.push_back(i as FrameId);
        }
        Self {
            pool_size,
            disk_scheduler: DiskScheduler::new(disk_manager.clone()),
            disk_manager,
            state: Mutex::new(PoolState {
                pages: (0..pool_size).map(|_| Page::new()).collect(),
                page_table: HashMap::new(),
                free_list,
                replacer: LRUReplacer::new(pool_size),
            }),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Picks a replacement frame: the free list first (no write-back
    /// needed), then the replacer's LRU victim. Returns `None` if every
    /// frame is pinned.
    fn find_victim(state: &mut PoolState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Some(frame_id);
        }
        state.replacer.victim()
    }

    /// Repurposes the frame at `frame_id` to hold `new_page_id`: flushes its
    /// current contents if dirty, removes its old page-table entry, installs
    /// the new one, and zeroes the buffer. The single chokepoint that keeps
    /// the page table and frame identity consistent across a frame's reuse.
    fn update_page(
        &self,
        state: &mut PoolState,
        frame_id: FrameId,
        new_page_id: PageId,
    ) -> Result<()> {
        let page = state.pages[frame_id as usize].clone();
        if page.is_dirty() {
            self.write_back(page.clone())?;
            page.clear_dirty();
        }
        if let Some(old_page_id) = page.get_page_id() {
            state.page_table.remove(&old_page_id);
        }
        page.reset();
        page.set_page_id(new_page_id);
        state.page_table.insert(new_page_id, frame_id);
        Ok(())
    }

    fn write_back(&self, page: Page) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.disk_scheduler
            .schedule(DiskRequest::Write { page, callback: tx });
        rx.blocking_recv().expect("disk scheduler dropped the response channel")
    }

    fn read_in(&self, page: Page) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.disk_scheduler
            .schedule(DiskRequest::Read { page, callback: tx });
        rx.blocking_recv().expect("disk scheduler dropped the response channel")
    }

    /// Fetches `page_id`, reading it from disk on a miss. Returns `Ok(None)`
    /// if every frame is pinned and none could be evicted. On success the
    /// returned frame is pinned; the caller must eventually `unpin_page` it.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Option<Page>> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let page = state.pages[frame_id as usize].clone();
            state.replacer.pin(frame_id);
            page.pin();
            tracing::trace!(%page_id, frame_id, "fetch_page hit");
            return Ok(Some(page));
        }

        let Some(frame_id) = Self::find_victim(&mut state) else {
            tracing::warn!(%page_id, "fetch_page miss with no victim available");
            return Ok(None);
        };

        self.update_page(&mut state, frame_id, page_id)?;
        let page = state.pages[frame_id as usize].clone();
        self.read_in(page.clone())?;
        state.replacer.pin(frame_id);
        page.pin();
        tracing::debug!(%page_id, frame_id, "fetch_page miss, read from disk");
        Ok(Some(page))
    }

    /// Allocates a brand-new page in `file_id` and returns it pinned, with a
    /// zeroed buffer. Returns `Ok(None)` if every frame is pinned.
    pub fn new_page(&self, file_id: FileId) -> Result<Option<Page>> {
        let mut state = self.state.lock();

        let Some(frame_id) = Self::find_victim(&mut state) else {
            tracing::warn!(file_id, "new_page with no victim available");
            return Ok(None);
        };

        let page_id = self.disk_manager.allocate_page(file_id)?;
        self.update_page(&mut state, frame_id, page_id)?;
        let page = state.pages[frame_id as usize].clone();
        state.replacer.pin(frame_id);
        page.pin();
        tracing::debug!(%page_id, frame_id, "new_page allocated");
        Ok(Some(page))
    }

    /// Decrements `page_id`'s pin count, marking it evictable once it
    /// reaches zero. `is_dirty` ORs into the frame's dirty bit; it never
    /// clears it. Returns `false` if the page isn't resident or was already
    /// unpinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let page = state.pages[frame_id as usize].clone();

        let Some(remaining) = page.unpin() else {
            return false;
        };
        page.mark_dirty(is_dirty);
        if remaining == 0 {
            state.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes `page_id`'s buffer to disk regardless of its dirty flag and
    /// clears it. Returns `false` if the page isn't resident. Holds the pool
    /// latch across the write so this is linearizable with respect to every
    /// other public operation, matching fetch/new/delete.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };
        let page = state.pages[frame_id as usize].clone();

        self.write_back(page.clone())?;
        page.clear_dirty();
        Ok(true)
    }

    /// Flushes every resident page belonging to `file_id`, clearing their
    /// dirty flags. Stops at the first I/O error, leaving later pages'
    /// dirty flags untouched so a retry can pick up where it left off. Holds
    /// the pool latch across every write in the batch, so a racing
    /// fetch/new/delete cannot repurpose a frame this call is still writing.
    pub fn flush_all_pages(&self, file_id: FileId) -> Result<()> {
        let state = self.state.lock();
        let pages: Vec<Page> = state
            .pages
            .iter()
            .filter(|page| matches!(page.get_page_id(), Some(id) if id.file_id == file_id))
            .cloned()
            .collect();

        for page in pages {
            self.write_back(page.clone())?;
            page.clear_dirty();
        }
        Ok(())
    }

    /// Deletes `page_id` from the pool. Returns `Ok(true)` if the page
    /// wasn't resident (nothing to do) or was successfully deleted,
    /// `Ok(false)` if it is still pinned. Does not call the disk manager's
    /// deallocation: file-level free-space management is the caller's
    /// concern (see DESIGN.md).
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(true);
        };
        let page = state.pages[frame_id as usize].clone();
        if page.get_pin_count() > 0 {
            return Ok(false);
        }

        // Written unconditionally, not just when dirty: a caller that deletes a
        // page it never marked dirty must still see its last writes durable.
        self.write_back(page.clone())?;
        state.page_table.remove(&page_id);
        page.reset();
        state.free_list.push_back(frame_id);
        tracing::debug!(%page_id, frame_id, "delete_page");
        Ok(true)
    }
}

//! End-to-end scenarios for the buffer pool manager, following the
//! documented scenarios: allocate-and-read-back, LRU eviction, pin blocking
//! eviction, dirty survives eviction, delete-while-pinned, and redundant
//! unpin detection.

use std::sync::Arc;

use bustubx_bufferpool::{BufferPoolManager, DiskManager, PAGE_SIZE};
use rand::distributions::{Distribution, Uniform};
use rand::thread_rng;
use tempdir::TempDir;

const POOL_SIZE: usize = 3;

fn create_pool() -> (BufferPoolManager, u32, TempDir) {
    let dir = TempDir::new("bufferpool_integration").unwrap();
    let disk_manager = Arc::new(DiskManager::new());
    let file_id = disk_manager.open_file(dir.path().join("test.db")).unwrap();
    let bpm = BufferPoolManager::new(POOL_SIZE, disk_manager);
    (bpm, file_id, dir)
}

#[test]
fn full_lifecycle_survives_eviction_and_deletion() {
    let (bpm, file_id, _dir) = create_pool();

    // 1. Allocate and read back.
    let p0 = bpm.new_page(file_id).unwrap().unwrap();
    let p0_id = p0.get_page_id().unwrap();
    assert_eq!(p0_id.page_no, 0);
    p0.get_data_mut().fill(0xAA);
    assert!(bpm.unpin_page(p0_id, true));
    assert!(bpm.flush_page(p0_id).unwrap());

    let mut raw = [0u8; PAGE_SIZE];
    bpm_disk_manager_read(&bpm, p0_id, &mut raw);
    assert_eq!(raw, [0xAAu8; PAGE_SIZE]);

    // 2. Fill the pool past capacity; p0 (LRU) must be evicted.
    let p1 = bpm.new_page(file_id).unwrap().unwrap();
    let p1_id = p1.get_page_id().unwrap();
    bpm.unpin_page(p1_id, false);

    let p2 = bpm.new_page(file_id).unwrap().unwrap();
    let p2_id = p2.get_page_id().unwrap();
    bpm.unpin_page(p2_id, false);

    let p3 = bpm.new_page(file_id).unwrap().unwrap();
    let p3_id = p3.get_page_id().unwrap();
    bpm.unpin_page(p3_id, false);

    // 3. Pin blocks eviction: re-fetch every resident page so all frames
    // are pinned, then a new page must fail.
    let f1 = bpm.fetch_page(p1_id).unwrap().unwrap();
    let f2 = bpm.fetch_page(p2_id).unwrap().unwrap();
    let f3 = bpm.fetch_page(p3_id).unwrap().unwrap();
    assert!(bpm.new_page(file_id).unwrap().is_none());
    bpm.unpin_page(p1_id, false);
    bpm.unpin_page(p2_id, false);
    bpm.unpin_page(p3_id, false);
    drop((f1, f2, f3));

    // 4. Dirty survives eviction: p0 was flushed above, but its original
    // write (0xAA) must still be the content we read back now that it's
    // been evicted once already.
    let refetched = bpm.fetch_page(p0_id).unwrap().unwrap();
    assert_eq!(*refetched.get_data(), [0xAAu8; PAGE_SIZE]);
    bpm.unpin_page(p0_id, true);

    // 5. Delete while pinned fails; unpinning then deleting succeeds.
    let pinned = bpm.fetch_page(p1_id).unwrap().unwrap();
    assert!(!bpm.delete_page(p1_id).unwrap());
    drop(pinned);
    assert!(bpm.unpin_page(p1_id, false));
    assert!(bpm.delete_page(p1_id).unwrap());

    // 6. Redundant unpin is detected.
    let p_last = bpm.new_page(file_id).unwrap().unwrap();
    let p_last_id = p_last.get_page_id().unwrap();
    assert!(bpm.unpin_page(p_last_id, false));
    assert!(!bpm.unpin_page(p_last_id, false));
}

#[test]
fn pinning_every_frame_then_requesting_new_page_fails() {
    let (bpm, file_id, _dir) = create_pool();

    let _p0 = bpm.new_page(file_id).unwrap().unwrap();
    let _p1 = bpm.new_page(file_id).unwrap().unwrap();
    let _p2 = bpm.new_page(file_id).unwrap().unwrap();

    assert!(bpm.new_page(file_id).unwrap().is_none());
    assert!(bpm.new_page(file_id).unwrap().is_none());
}

#[test]
fn n_plus_one_unpinned_pages_forces_an_eviction() {
    let (bpm, file_id, _dir) = create_pool();

    let mut ids = Vec::new();
    for _ in 0..POOL_SIZE + 1 {
        let page = bpm.new_page(file_id).unwrap().unwrap();
        let id = page.get_page_id().unwrap();
        bpm.unpin_page(id, false);
        ids.push(id);
    }

    // the first page allocated must have been evicted to make room for the
    // (pool_size + 1)-th; fetching it again must succeed (a fresh disk read).
    let first = ids[0];
    let refetched = bpm.fetch_page(first).unwrap();
    assert!(refetched.is_some());
    bpm.unpin_page(first, false);
}

#[test]
fn binary_data_survives_a_flush_and_fetch_round_trip() {
    let (bpm, file_id, _dir) = create_pool();

    let mut rng = thread_rng();
    let byte = Uniform::new_inclusive(0u8, 255u8);
    let original: Vec<u8> = (0..PAGE_SIZE).map(|_| byte.sample(&mut rng)).collect();

    let page = bpm.new_page(file_id).unwrap().unwrap();
    let page_id = page.get_page_id().unwrap();
    page.get_data_mut().copy_from_slice(&original);
    assert!(bpm.unpin_page(page_id, true));
    assert!(bpm.flush_page(page_id).unwrap());

    // force the frame out of the pool so the fetch below is a real disk read.
    for _ in 0..POOL_SIZE {
        let filler = bpm.new_page(file_id).unwrap().unwrap();
        let filler_id = filler.get_page_id().unwrap();
        bpm.unpin_page(filler_id, false);
    }

    let fetched = bpm.fetch_page(page_id).unwrap().unwrap();
    assert_eq!(&*fetched.get_data(), original.as_slice());
    bpm.unpin_page(page_id, false);
}

fn bpm_disk_manager_read(
    bpm: &BufferPoolManager,
    page_id: bustubx_bufferpool::PageId,
    buf: &mut [u8; PAGE_SIZE],
) {
    // flush_page already wrote the data; fetch_page reads it straight back
    // through the public API instead of poking at internals from outside
    // the crate.
    let page = bpm.fetch_page(page_id).unwrap().unwrap();
    buf.copy_from_slice(&*page.get_data());
    bpm.unpin_page(page_id, false);
}

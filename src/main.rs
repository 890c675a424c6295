use std::sync::Arc;

use bustubx_bufferpool::common::config::BufferPoolConfig;
use bustubx_bufferpool::{BufferPoolManager, DiskManager, Result};

/// Minimal demo driving the buffer pool end to end: allocates a page, writes
/// through it, unpins it dirty, then fetches it back to show the write
/// survived. Exists so the crate has a runnable surface beyond its test
/// suite; not part of the public API.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = BufferPoolConfig::from_env();
    tracing::info!(pool_size = config.pool_size, db_file = %config.db_file, "starting buffer pool demo");

    let disk_manager = Arc::new(DiskManager::new());
    let file_id = disk_manager.open_file(&config.db_file)?;
    let bpm = BufferPoolManager::new(config.pool_size, disk_manager);

    let page = bpm
        .new_page(file_id)?
        .expect("a fresh pool always has a free frame for the first page");
    let page_id = page.get_page_id().expect("just-allocated page has an id");

    {
        let mut data = page.get_data_mut();
        data[..5].copy_from_slice(b"hello");
    }
    bpm.unpin_page(page_id, true);
    bpm.flush_page(page_id)?;

    let fetched = bpm
        .fetch_page(page_id)?
        .expect("the page we just flushed is still on disk");
    let data = fetched.get_data();
    println!("page {page_id} bytes[0..5] = {:?}", &data[..5]);
    drop(data);
    bpm.unpin_page(page_id, false);

    Ok(())
}

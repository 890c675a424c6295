use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;

use crate::common::error::Result;
use crate::storage::disk::DiskManager;
use crate::storage::page::Page;

/// A Read or Write request for the background disk worker to execute against
/// a [`Page`] already pinned in the buffer pool. The page carries its own
/// `page_id`, so the request only needs to say which direction to go.
pub enum DiskRequest {
    Read {
        page: Page,
        callback: oneshot::Sender<Result<()>>,
    },
    Write {
        page: Page,
        callback: oneshot::Sender<Result<()>>,
    },
}

/// Schedules disk read/write requests onto a single background worker
/// thread, so that the buffer pool manager's own latch is held for the
/// request's round trip without doing the syscalls on whichever caller
/// thread happens to be holding that latch.
pub struct DiskScheduler {
    request_queue: std::sync::mpsc::Sender<Option<DiskRequest>>,
    background_thread: Option<thread::JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        Self {
            request_queue: tx,
            background_thread: Some(thread::spawn(move || Self::worker_loop(rx, disk_manager))),
        }
    }

    /// Schedules `request`. The worker thread processes requests in order.
    pub fn schedule(&self, request: DiskRequest) {
        self.request_queue
            .send(Some(request))
            .expect("disk scheduler worker thread has exited");
    }

    fn worker_loop(
        rx: std::sync::mpsc::Receiver<Option<DiskRequest>>,
        disk_manager: Arc<DiskManager>,
    ) {
        while let Ok(Some(request)) = rx.recv() {
            match request {
                DiskRequest::Read { page, callback } => {
                    let page_id = page.get_page_id().expect("page has no id to read into");
                    let result = {
                        let mut data = page.get_data_mut();
                        disk_manager.read_page(page_id, &mut data)
                    };
                    let _ = callback.send(result);
                }
                DiskRequest::Write { page, callback } => {
                    let page_id = page.get_page_id().expect("page has no id to write from");
                    let result = disk_manager.write_page(page_id, &page.get_data());
                    let _ = callback.send(result);
                }
            }
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        // A `None` tells the worker thread to stop; ignore send failure if
        // it has already exited on its own.
        let _ = self.request_queue.send(None);
        if let Some(handle) = self.background_thread.take() {
            let _ = handle.join();
        }
    }
}

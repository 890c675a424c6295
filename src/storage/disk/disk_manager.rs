use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::common::config::{FileId, PageId, PageNo, PAGE_SIZE};
use crate::common::error::{Error, Result};

/// Per-file state: the open handle, a monotonic page-number allocator
/// recovered from the file's length at open time, and flush/write counters
/// kept for observability (mirrors the teacher's `num_flushes`/`num_writes`).
struct FileHandle {
    path: PathBuf,
    file: Mutex<File>,
    next_page_no: AtomicU32,
    num_writes: AtomicU64,
    num_flushes: AtomicU64,
}

/// Snapshot of a single file's I/O counters, returned by
/// [`DiskManager::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskManagerStats {
    pub num_writes: u64,
    pub num_flushes: u64,
}

/// DiskManager takes care of opening database files and reading/writing
/// fixed-size pages to and from them. Unlike the single-implicit-file
/// version this was grown from, it multiplexes any number of open files,
/// each addressed by an opaque [`FileId`], so that a [`PageId`] can name a
/// page in any of them.
pub struct DiskManager {
    files: Mutex<HashMap<FileId, FileHandle>>,
    next_file_id: AtomicU32,
}

impl Default for DiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskManager {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            next_file_id: AtomicU32::new(0),
        }
    }

    /// Opens (creating if absent) the database file at `path` and assigns it
    /// a fresh [`FileId`]. The next page number is recovered from the
    /// current file length so a reopened file resumes allocation correctly.
    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<FileId> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let len = file.metadata()?.len();
        let next_page_no = (len / PAGE_SIZE as u64) as u32;

        let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        let handle = FileHandle {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            next_page_no: AtomicU32::new(next_page_no),
            num_writes: AtomicU64::new(0),
            num_flushes: AtomicU64::new(0),
        };
        self.files.lock().unwrap().insert(file_id, handle);
        tracing::debug!(file_id, path = %path.display(), "opened database file");
        Ok(file_id)
    }

    /// Allocates a fresh page number for `file_id`. Never returns
    /// `INVALID_PAGE_NO`.
    pub fn allocate_page(&self, file_id: FileId) -> Result<PageId> {
        let files = self.files.lock().unwrap();
        let handle = files.get(&file_id).ok_or(Error::UnknownFile(file_id))?;
        let page_no: PageNo = handle.next_page_no.fetch_add(1, Ordering::SeqCst);
        Ok(PageId::new(file_id, page_no))
    }

    /// Reads exactly `PAGE_SIZE` bytes for `page_id` into `dst`. A read that
    /// runs past the current end of file (a page that was allocated but
    /// never flushed) is tolerated: the remainder of `dst` is zero-filled.
    pub fn read_page(&self, page_id: PageId, dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let files = self.files.lock().unwrap();
        let handle = files
            .get(&page_id.file_id)
            .ok_or(Error::UnknownFile(page_id.file_id))?;

        let offset = page_id.page_no as u64 * PAGE_SIZE as u64;
        let mut file = handle.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        let read = read_best_effort(&mut file, dst)?;
        if read < PAGE_SIZE {
            tracing::trace!(%page_id, read, "short read, zero-filling remainder");
            dst[read..].fill(0);
        }
        Ok(())
    }

    /// Writes exactly `PAGE_SIZE` bytes for `page_id` from `src`, flushing
    /// the OS buffer before returning.
    pub fn write_page(&self, page_id: PageId, src: &[u8; PAGE_SIZE]) -> Result<()> {
        let files = self.files.lock().unwrap();
        let handle = files
            .get(&page_id.file_id)
            .ok_or(Error::UnknownFile(page_id.file_id))?;

        let offset = page_id.page_no as u64 * PAGE_SIZE as u64;
        let mut file = handle.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(src)?;
        file.flush()?;
        handle.num_writes.fetch_add(1, Ordering::Relaxed);
        handle.num_flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self, file_id: FileId) -> Result<DiskManagerStats> {
        let files = self.files.lock().unwrap();
        let handle = files.get(&file_id).ok_or(Error::UnknownFile(file_id))?;
        Ok(DiskManagerStats {
            num_writes: handle.num_writes.load(Ordering::Relaxed),
            num_flushes: handle.num_flushes.load(Ordering::Relaxed),
        })
    }

    pub fn path_of(&self, file_id: FileId) -> Result<PathBuf> {
        let files = self.files.lock().unwrap();
        files
            .get(&file_id)
            .map(|h| h.path.clone())
            .ok_or(Error::UnknownFile(file_id))
    }
}

/// Reads into `dst` until it is full or the file is exhausted, tolerating
/// a short read instead of treating it as an error.
fn read_best_effort(file: &mut File, dst: &mut [u8; PAGE_SIZE]) -> Result<usize> {
    let mut total = 0;
    loop {
        match file.read(&mut dst[total..]) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                total += n;
                if total == PAGE_SIZE {
                    return Ok(total);
                }
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

use std::env;

/// Size in bytes of every page, on disk and in memory.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel page number meaning "no page".
pub const INVALID_PAGE_NO: u32 = u32::MAX;

/// Sentinel frame id meaning "no frame".
pub const INVALID_FRAME_ID: FrameId = u32::MAX;

/// Dense index into the buffer pool's frame array.
pub type FrameId = u32;

/// A page number, unique within a single file.
pub type PageNo = u32;

/// Opaque handle to an open database file, assigned by the disk manager.
pub type FileId = u32;

/// Identifies a logical page uniquely across every file the disk manager has open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub file_id: FileId,
    pub page_no: PageNo,
}

impl PageId {
    pub fn new(file_id: FileId, page_no: PageNo) -> Self {
        Self { file_id, page_no }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_id, self.page_no)
    }
}

const ENV_POOL_SIZE: &str = "BUSTUBX_POOL_SIZE";
const ENV_DB_FILE: &str = "BUSTUBX_DB_FILE";

const DEFAULT_POOL_SIZE: usize = 64;
const DEFAULT_DB_FILE: &str = "bustubx.db";

/// Runtime configuration for a [`crate::buffer::BufferPoolManager`], with
/// environment-variable overrides so a binary embedding this crate doesn't
/// need its own flag parsing to pick a pool size or data file.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    pub pool_size: usize,
    pub db_file: String,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            db_file: DEFAULT_DB_FILE.to_string(),
        }
    }
}

impl BufferPoolConfig {
    /// Builds a config from defaults, overridden by `BUSTUBX_POOL_SIZE` /
    /// `BUSTUBX_DB_FILE` when present. Malformed overrides are logged and
    /// ignored rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(ENV_POOL_SIZE) {
            match raw.parse::<usize>() {
                Ok(size) if size > 0 => config.pool_size = size,
                _ => tracing::warn!(value = %raw, "ignoring invalid {ENV_POOL_SIZE}"),
            }
        }

        if let Ok(path) = env::var(ENV_DB_FILE) {
            config.db_file = path;
        }

        config
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_db_file(mut self, db_file: impl Into<String>) -> Self {
        self.db_file = db_file.into();
        self
    }
}

use thiserror::Error;

use crate::common::config::FileId;

/// Failure modes the buffer pool surfaces to callers. Everything else in the
/// public API (miss-no-victim, not-resident, unpin-underflow, delete-while-pinned)
/// is a plain `bool`/`Option` outcome, not an error: only I/O and file-handle
/// misuse go through this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown file id {0}")]
    UnknownFile(FileId),
}

pub type Result<T> = std::result::Result<T, Error>;

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("symbol name `{0}` is not nul-terminated")]
    InvalidName(String),
    #[error("no next definition of `{0}` in the dynamic linker's search order")]
    NotFound(String),
}

/// Why a record was dropped. Never surfaced past the sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is locked by another writer", path.display())]
    Contended { path: PathBuf },
    #[error("failed to lock {}: {errno}", path.display())]
    Lock { path: PathBuf, errno: Errno },
    #[error("failed to write record: {0}")]
    Write(#[from] io::Error),
}

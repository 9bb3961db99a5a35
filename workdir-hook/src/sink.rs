//! Best-effort recording of the working directory.
//!
//! Every failure (open, lock contention, write) drops the record. Nothing
//! here blocks on another writer or reports an error to the intercepted call.

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::error::SinkError;
use crate::log_path::LogPath;

pub const RECORD_TAG: &[u8] = b"GETCWD:";

/// A destination for observed working directories.
///
/// `record` has no return value: implementations swallow their own failures
/// and must not wait on other writers.
pub trait BestEffortSink {
    fn record(&self, cwd: &CStr);
}

impl<S: BestEffortSink + ?Sized> BestEffortSink for &S {
    fn record(&self, cwd: &CStr) {
        (**self).record(cwd)
    }
}

/// `GETCWD: <cwd>\n`, with the directory bytes written verbatim.
pub fn format_record(cwd: &[u8]) -> Vec<u8> {
    let mut line = Vec::with_capacity(RECORD_TAG.len() + 1 + cwd.len() + 1);
    line.extend_from_slice(RECORD_TAG);
    line.push(b' ');
    line.extend_from_slice(cwd);
    line.push(b'\n');
    line
}

/// Single-record log file guarded by an advisory `flock`.
///
/// Each record truncates the file, so it holds at most the latest line.
#[derive(Debug, Default)]
pub struct FileSink {
    path: LogPath,
}

impl FileSink {
    /// Sink whose path is derived from `HOME` on first use.
    pub const fn new() -> Self {
        Self {
            path: LogPath::new(),
        }
    }

    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: LogPath::fixed(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.get()
    }

    /// One open-lock-write-close transaction. The lock and descriptor are
    /// released on every return path.
    pub fn try_record(&self, cwd: &[u8]) -> Result<(), SinkError> {
        let path = self.path();
        let file = open_truncated(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut locked = Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(
            |(_file, errno)| match errno {
                Errno::EWOULDBLOCK => SinkError::Contended {
                    path: path.to_path_buf(),
                },
                errno => SinkError::Lock {
                    path: path.to_path_buf(),
                    errno,
                },
            },
        )?;

        locked.write_all(&format_record(cwd))?;
        Ok(())
    }
}

impl BestEffortSink for FileSink {
    fn record(&self, cwd: &CStr) {
        if let Err(err) = self.try_record(cwd.to_bytes()) {
            tracing::trace!(%err, "dropped workdir record");
        }
    }
}

fn open_truncated(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

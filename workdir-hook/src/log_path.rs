//! Where records go: `$HOME/game_workdir.log`, or a fixed file under `/tmp`.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const HOME_VAR: &str = "HOME";
pub const LOG_FILE_NAME: &str = "game_workdir.log";
pub const FALLBACK_LOG_PATH: &str = "/tmp/game_workdir.log";

/// Log file path, computed on first use and fixed for the life of the process.
///
/// Later changes to `HOME` are ignored once the path has been computed.
#[derive(Debug, Default)]
pub struct LogPath {
    cached: OnceLock<PathBuf>,
}

impl LogPath {
    pub const fn new() -> Self {
        Self {
            cached: OnceLock::new(),
        }
    }

    /// A cache that is already resolved to `path`.
    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        let cached = OnceLock::new();
        let _ = cached.set(path.into());
        Self { cached }
    }

    pub fn get(&self) -> &Path {
        self.get_or_resolve_with(|| env::var_os(HOME_VAR))
    }

    /// Like [`LogPath::get`], with the home lookup supplied by the caller.
    /// `home` runs at most once per cache.
    pub fn get_or_resolve_with(&self, home: impl FnOnce() -> Option<OsString>) -> &Path {
        self.cached.get_or_init(|| {
            let path = Self::derive(home().as_deref());
            tracing::debug!(path = %path.display(), "workdir log path resolved");
            path
        })
    }

    /// `<home>/game_workdir.log` by plain concatenation, so an empty home
    /// yields `/game_workdir.log`.
    pub fn derive(home: Option<&OsStr>) -> PathBuf {
        match home {
            Some(home) => {
                let mut path = OsString::with_capacity(home.len() + 1 + LOG_FILE_NAME.len());
                path.push(home);
                path.push("/");
                path.push(LOG_FILE_NAME);
                PathBuf::from(path)
            }
            None => PathBuf::from(FALLBACK_LOG_PATH),
        }
    }
}

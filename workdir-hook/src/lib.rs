//! Runtime for the `getcwd` interposer.
//!
//! The preloaded module (`intercept-workdir`) exports `getcwd`; everything it
//! does on each call lives here so it can be exercised without preloading:
//!
//! - [`NextSymbol`] finds and caches the next `getcwd` via `dlsym(RTLD_NEXT)`.
//! - [`forward_getcwd`] calls it and reports successful results to a sink.
//! - [`FileSink`] writes `GETCWD: <dir>` to `$HOME/game_workdir.log`, dropping
//!   the record if the file cannot be opened or is locked.

pub mod diagnostics;
pub mod errno;
pub mod error;
pub mod intercept;
pub mod log_path;
pub mod resolver;
pub mod sink;

pub use error::{ResolveError, SinkError};
pub use intercept::{forward_getcwd, GetcwdFn};
pub use log_path::LogPath;
pub use resolver::{NextInChain, NextSymbol, SymbolLookup};
pub use sink::{BestEffortSink, FileSink};

// Used by `#[interpose]` expansions.
#[doc(hidden)]
pub use ctor;
#[doc(hidden)]
pub use tracing;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    /// Serializes tests that mutate the process environment.
    pub(crate) static ENV_GUARD: Mutex<()> = Mutex::new(());
}

//! Preloadable module that records the working directory a program sees.
//!
//! ```text
//! cargo build --release -p intercept-workdir
//! LD_PRELOAD=target/release/libintercept_workdir.so some-game
//! cat "$HOME/game_workdir.log"     # GETCWD: /path/the/game/asked/for
//! ```
//!
//! On macOS use `DYLD_INSERT_LIBRARIES` (with `DYLD_FORCE_FLAT_NAMESPACE=1`)
//! instead of `LD_PRELOAD`. Set `WORKDIR_HOOK_LOG=debug` to see the module's
//! own diagnostics on stderr.

use libc::{c_char, size_t};
use workdir_hook::{forward_getcwd, FileSink};
use workdir_hook_macro::interpose;

/// Log destination shared by every thread of the host process.
static SINK: FileSink = FileSink::new();

#[interpose(symbol = "getcwd")]
fn log_getcwd(
    original: unsafe extern "C" fn(buf: *mut c_char, size: size_t) -> *mut c_char,
    buf: *mut c_char,
    size: size_t,
) -> *mut c_char {
    // SAFETY: the arguments come straight from the host's getcwd call.
    unsafe { forward_getcwd(original, &SINK, buf, size) }
}

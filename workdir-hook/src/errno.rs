//! Saving and restoring the calling thread's `errno`.

use libc::c_int;

#[cfg(any(target_os = "linux", target_os = "android"))]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns the calling thread's errno slot.
    unsafe { libc::__errno_location() }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns the calling thread's errno slot.
    unsafe { libc::__error() }
}

pub fn get() -> c_int {
    // SAFETY: the slot is valid and thread-local for the life of the thread.
    unsafe { *errno_location() }
}

pub fn set(value: c_int) {
    // SAFETY: see `get`.
    unsafe { *errno_location() = value }
}

/// Restores the `errno` captured by [`ErrnoGuard::save`] when dropped.
#[must_use = "errno is restored when the guard is dropped"]
#[derive(Debug)]
pub struct ErrnoGuard {
    saved: c_int,
}

impl ErrnoGuard {
    pub fn save() -> Self {
        Self { saved: get() }
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        set(self.saved);
    }
}

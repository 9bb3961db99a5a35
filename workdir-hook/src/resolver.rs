//! Lookup of the next definition of a symbol via `dlsym(RTLD_NEXT, ...)`.

use std::ffi::{c_void, CStr};
use std::mem;
use std::ptr::NonNull;
use std::sync::OnceLock;

use crate::error::ResolveError;

/// Something that can find the next definition of a named symbol.
pub trait SymbolLookup {
    fn lookup(&self, name: &CStr) -> Option<NonNull<c_void>>;
}

/// Resolves against the dynamic linker's search order, skipping the module
/// that contains the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextInChain;

impl SymbolLookup for NextInChain {
    fn lookup(&self, name: &CStr) -> Option<NonNull<c_void>> {
        // SAFETY: `name` is nul-terminated; dlsym is thread-safe.
        NonNull::new(unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) })
    }
}

/// Write-once slot holding the original implementation of a symbol.
///
/// The slot starts empty, may be filled at load time, and is filled lazily by
/// [`NextSymbol::ensure`] otherwise. Once set it is never replaced; racing
/// resolutions all observe the first stored pointer.
pub struct NextSymbol<F> {
    name: &'static [u8],
    slot: OnceLock<F>,
}

impl<F: Copy> NextSymbol<F> {
    /// Creates an empty slot for the nul-terminated symbol `name`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the ABI and signature of
    /// the symbol named by `name`.
    pub const unsafe fn new(name: &'static [u8]) -> Self {
        Self {
            name,
            slot: OnceLock::new(),
        }
    }

    /// Symbol name without the trailing nul.
    pub fn name(&self) -> &str {
        let bytes = self.name.strip_suffix(b"\0").unwrap_or(self.name);
        std::str::from_utf8(bytes).unwrap_or("<non-utf8 symbol>")
    }

    /// The cached original, without attempting resolution.
    pub fn get(&self) -> Option<F> {
        self.slot.get().copied()
    }

    pub fn resolve(&self) -> Result<F, ResolveError> {
        self.resolve_with(&NextInChain)
    }

    /// Returns the cached original, or looks it up and caches it.
    ///
    /// A failed lookup leaves the slot empty so a later call can try again.
    pub fn resolve_with(&self, lookup: &dyn SymbolLookup) -> Result<F, ResolveError> {
        if let Some(original) = self.get() {
            return Ok(original);
        }

        let name = CStr::from_bytes_with_nul(self.name)
            .map_err(|_| ResolveError::InvalidName(self.name().to_owned()))?;
        let addr = lookup
            .lookup(name)
            .ok_or_else(|| ResolveError::NotFound(self.name().to_owned()))?;

        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
        // SAFETY: `new` requires `F` to be the function pointer type of this
        // symbol, and `addr` is that symbol's address.
        let original = unsafe { mem::transmute_copy::<*mut c_void, F>(&addr.as_ptr()) };
        let stored = *self.slot.get_or_init(|| original);
        tracing::debug!(symbol = self.name(), "resolved next definition");
        Ok(stored)
    }

    /// Hot-path accessor used by the exported wrapper.
    ///
    /// Calling through a missing original is undefined, so an unresolvable
    /// symbol aborts the process.
    pub fn ensure(&self) -> F {
        if let Some(original) = self.get() {
            return original;
        }
        match self.resolve() {
            Ok(original) => original,
            Err(err) => {
                tracing::error!(%err, "cannot forward intercepted call");
                eprintln!("[intercept-workdir] FATAL: {err}. Aborting.");
                std::process::abort();
            }
        }
    }
}

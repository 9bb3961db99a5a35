//! Opt-in `tracing` output for the injected module.
//!
//! Silent unless `WORKDIR_HOOK_LOG` holds an `EnvFilter` directive such as
//! `debug` or `workdir_hook=trace`. Events go to stderr of the host process.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "WORKDIR_HOOK_LOG";

static INIT: Once = Once::new();

/// Installs a stderr subscriber if `WORKDIR_HOOK_LOG` is set. Runs once; a
/// global subscriber that is already installed is left in place.
pub fn init_from_env() {
    INIT.call_once(|| {
        let Some(directives) = std::env::var(LOG_ENV).ok().filter(|v| !v.trim().is_empty())
        else {
            return;
        };
        let filter = match EnvFilter::try_new(&directives) {
            Ok(filter) => filter,
            Err(err) => {
                eprintln!("[intercept-workdir] ignoring {LOG_ENV}={directives:?}: {err}");
                return;
            }
        };
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(pid = std::process::id(), "workdir interposer loaded");
        }
    });
}

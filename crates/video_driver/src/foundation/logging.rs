//! Logging utilities
//!
//! The library only talks to the `log` facade. Binaries call [`init`] once to
//! install `env_logger`; `RUST_LOG` selects the level.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Defaults to `info` when `RUST_LOG` is not set. Calling it twice is harmless.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

//! Logging utilities
//!
//! The engine logs through the `log` facade only. Binaries decide how the
//! records are printed; [`init`] is the zero-configuration choice.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level that `RUST_LOG` can still override
pub fn init_with_level(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

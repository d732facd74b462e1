//! Logging setup plus per-module switchable logging macros.
//!
//! Modules with chatty loops opt into the macros by declaring a flag:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info};
//!
//! log_info!("only emitted while ENABLE_LOGS is true");
//! ```

use log::LevelFilter;

/// Install the `env_logger` backend. Defaults to `Info` (`Debug` when
/// `QRSCAN_DEBUG` is set), and `RUST_LOG` directives take precedence.
/// Calling it again is harmless.
pub fn init_logging() {
    let debug_mode = std::env::var("QRSCAN_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let level = if debug_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

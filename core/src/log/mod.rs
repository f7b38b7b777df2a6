//! Logger setup and logging macros.
//!
//! Call sites throughout the workspace use the macros re-exported here
//! (`trace!`, `debug!`, `info!`, `warn!`, `error!`) rather than depending on
//! the `log` crate directly, so a single place controls how logging is
//! wired up for binaries and tests.

#[allow(unused_imports)]
pub use log::{Level, LevelFilter};

mod consts;

use consts::{DEFAULT_LOGGER_ENV, LOG_LINE_PATTERN_COLORED};

/// Initializes a colored stdout logger driven by `RUST_LOG`, falling back to `default_level`.
///
/// Safe to call multiple times (e.g. from several test modules); only the first call wins.
pub fn try_init_logger(default_level: &str) {
    use log4rs::{
        append::console::{ConsoleAppender, Target},
        config::{Appender, Root},
        encode::pattern::PatternEncoder,
        Config,
    };

    let level = std::env::var(DEFAULT_LOGGER_ENV).ok().and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        default_level.parse().unwrap_or(LevelFilter::Info)
    });
    let stdout = ConsoleAppender::builder().target(Target::Stdout).encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN_COLORED))).build();
    if let Ok(config) = Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout))).build(Root::builder().appender("stdout").build(level)) {
        let _ = log4rs::init_config(config);
    }
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => { log::trace!($($t)*) }
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => { log::debug!($($t)*) }
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => { log::info!($($t)*) }
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => { log::warn!($($t)*) }
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => { log::error!($($t)*) }
}

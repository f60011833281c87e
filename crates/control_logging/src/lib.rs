#![deny(missing_docs)]
//! Shared logging utilities for the scrape-control workspace.
//!
//! This crate provides the `control_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Everything logged through these macros is diagnostic output. Messages meant
//! for the operator of a task live in the core's log aggregator instead.

#[doc(hidden)]
pub use log as __log;

/// Log target shared by every `control_*` macro.
pub const DIAGNOSTIC_TARGET: &str = "scrape_control";

/// Logs a trace-level diagnostic message.
#[macro_export]
macro_rules! control_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!(target: $crate::DIAGNOSTIC_TARGET, $($arg)*);
    }};
}

/// Logs an info-level diagnostic message.
#[macro_export]
macro_rules! control_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!(target: $crate::DIAGNOSTIC_TARGET, $($arg)*);
    }};
}

/// Logs a debug-level diagnostic message.
#[macro_export]
macro_rules! control_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!(target: $crate::DIAGNOSTIC_TARGET, $($arg)*);
    }};
}

/// Logs a warn-level diagnostic message.
#[macro_export]
macro_rules! control_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!(target: $crate::DIAGNOSTIC_TARGET, $($arg)*);
    }};
}

/// Logs an error-level diagnostic message.
#[macro_export]
macro_rules! control_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!(target: $crate::DIAGNOSTIC_TARGET, $($arg)*);
    }};
}

/// Picks the diagnostic level for a run: debug when verbose, info otherwise.
pub fn level_for(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = level_for(cfg!(debug_assertions));

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_selects_debug() {
        assert_eq!(level_for(true), log::LevelFilter::Debug);
        assert_eq!(level_for(false), log::LevelFilter::Info);
    }

    #[test]
    fn macros_expand_without_a_logger() {
        initialize_for_tests();
        control_trace!("trace {}", 1);
        control_debug!("debug {}", 2);
        control_info!("info {}", 3);
        control_warn!("warn {}", 4);
        control_error!("error {}", 5);
    }
}

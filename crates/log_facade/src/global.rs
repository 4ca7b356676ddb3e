//! The process-wide logger.
//!
//! Prefer passing a [`Logger`] explicitly; this module exists for application entry points and
//! code that cannot easily receive one.

use std::{
    cell::Cell,
    fmt,
    sync::{Arc, LazyLock},
};

use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::{LogConfig, Logger, LoggerError, PanicReporter, RecoveredPanic};

static CONFIG: LazyLock<RwLock<LogConfig>> = LazyLock::new(|| RwLock::new(LogConfig::default()));

static LOGGER: ArcSwapOption<Logger> = ArcSwapOption::const_empty();

/// Serializes installations of the process-wide logger.
static INSTALL: Mutex<()> = Mutex::new(());

thread_local! {
    static BUILDING_DEFAULT: Cell<bool> = const { Cell::new(false) };
}

/// Returns a copy of the configuration of the process-wide logger.
///
/// Changes to the copy take effect only once passed to [`initialize`].
pub fn configuration() -> LogConfig {
    CONFIG.read().clone()
}

/// Replaces the process-wide logger with one built from `config`.
///
/// The new logger is fully built before it is swapped in; the previous logger is flushed and its
/// files are closed once no caller uses it anymore. Calls racing with the swap use either the
/// previous or the new logger.
///
/// # Errors
///
/// Returns [`LoggerError`] if the logger cannot be built, in which case the previous logger and
/// configuration remain in place.
pub fn initialize(config: LogConfig) -> Result<(), LoggerError> {
    let logger = Logger::new(&config)?;

    let previous = {
        let _install = INSTALL.lock();
        let previous = LOGGER.swap(Some(Arc::new(logger)));
        *CONFIG.write() = config;
        previous
    };

    if let Some(previous) = previous {
        let _ = previous.flush();
    }

    Ok(())
}

/// Returns the process-wide logger, initializing it from the default configuration on first use.
///
/// If the default log files cannot be created, the process-wide logger writes to the console
/// only.
pub fn logger() -> Logger {
    if let Some(logger) = &*LOGGER.load() {
        return Logger::clone(logger);
    }

    // Records emitted while the default logger is being built have nowhere to go yet
    if BUILDING_DEFAULT.with(Cell::get) {
        return Logger::builder().build();
    }

    let _install = INSTALL.lock();
    if let Some(logger) = &*LOGGER.load() {
        return Logger::clone(logger);
    }

    let config = configuration();
    BUILDING_DEFAULT.with(|building| building.set(true));
    let built = Logger::new(&config);
    BUILDING_DEFAULT.with(|building| building.set(false));

    let logger = built.unwrap_or_else(|error| {
        #[allow(clippy::print_stderr)]
        {
            eprintln!(
                "[WARN] {}: Unable to create log files, logging to the console only: {error}",
                env!("CARGO_PKG_NAME")
            );
        }
        Logger::console_only(&config)
    });
    LOGGER.store(Some(Arc::new(logger.clone())));

    logger
}

/// Flushes every sink of the process-wide logger.
///
/// # Errors
///
/// Returns the first flush failure.
pub fn flush() -> Result<(), LoggerError> {
    logger().flush()
}

/// Returns a logger adding the given alternating keys and values to every record of the
/// process-wide logger.
///
/// The returned logger keeps the sinks current at the time of the call.
pub fn with_fields(keys_and_values: &[Value]) -> Logger {
    logger().with_fields(keys_and_values)
}

/// Runs `f`, reporting a panic raised by it to the process-wide logger and suppressing it.
///
/// See [`PanicReporter`] to choose a different logger or to resume the panic.
///
/// # Errors
///
/// Returns the [`RecoveredPanic`] if `f` panicked.
pub fn report_panic_if_any<F, R>(
    diagnostics: &[&dyn fmt::Debug],
    f: F,
) -> Result<R, RecoveredPanic>
where
    F: FnOnce() -> R,
{
    PanicReporter::global().run(diagnostics, f)
}

/// Generates the plain, formatted and structured functions of one level.
macro_rules! leveled_functions {
    ($name:literal, $plain:ident, $formatted:ident, $structured:ident) => {
        #[doc = concat!("Logs a message at `", $name, "` level with the process-wide logger.")]
        pub fn $plain(message: impl fmt::Display) {
            logger().$plain(message);
        }

        #[doc = concat!(
            "Logs a message built with [`format_args!`] at `",
            $name,
            "` level with the process-wide logger."
        )]
        pub fn $formatted(args: fmt::Arguments<'_>) {
            logger().$formatted(args);
        }

        #[doc = concat!(
            "Logs a message with alternating keys and values at `",
            $name,
            "` level with the process-wide logger."
        )]
        pub fn $structured(message: impl fmt::Display, keys_and_values: &[Value]) {
            logger().$structured(message, keys_and_values);
        }
    };
}

leveled_functions!("debug", debug, debugf, debugw);
leveled_functions!("info", info, infof, infow);
leveled_functions!("warn", warn, warnf, warnw);
leveled_functions!("error", error, errorf, errorw);

/// Logs a message at `fatal` level with the process-wide logger, then exits the process.
pub fn fatal(message: impl fmt::Display) -> ! {
    logger().fatal(message)
}

/// Logs a message built with [`format_args!`] at `fatal` level with the process-wide logger, then
/// exits the process.
pub fn fatalf(args: fmt::Arguments<'_>) -> ! {
    logger().fatalf(args)
}

/// Logs a message with alternating keys and values at `fatal` level with the process-wide logger,
/// then exits the process.
pub fn fatalw(message: impl fmt::Display, keys_and_values: &[Value]) -> ! {
    logger().fatalw(message, keys_and_values)
}

/// Logs a message at `panic` level with the process-wide logger, then panics.
pub fn panic(message: impl fmt::Display) -> ! {
    logger().panic(message)
}

/// Logs a message built with [`format_args!`] at `panic` level with the process-wide logger, then
/// panics.
pub fn panicf(args: fmt::Arguments<'_>) -> ! {
    logger().panicf(args)
}

/// Logs a message with alternating keys and values at `panic` level with the process-wide logger,
/// then panics.
pub fn panicw(message: impl fmt::Display, keys_and_values: &[Value]) -> ! {
    logger().panicw(message, keys_and_values)
}

//! `log_facade` provides leveled logging that fans each record out to rolling log files and the
//! standard streams, routed by severity.
//!
//! It offers:
//! - A [`Logger`] writing every record at or above the configured minimum level to a rolling main
//!   log file, error-level records and above additionally to a rolling error-only log file, and
//!   each record to either standard output (below error level) or standard error.
//! - Plain, formatted and structured (alternating key-value) variants for every level, as
//!   [`Logger`] methods, free functions and macros.
//! - A process-wide logger, lazily built from [`LogConfig::default`] and replaceable at any time
//!   with [`initialize`].
//! - A [`PanicReporter`] logging the message, stack frames and diagnostics of a panic raised in a
//!   protected closure.
//! - A [`FacadeLayer`] forwarding `tracing` events to a [`Logger`].
//!
//! # Example
//!
//! ```no_run
//! use log_facade::{Level, LogConfig};
//!
//! let config = LogConfig {
//!     file_name: "payments".to_string(),
//!     level: Level::Info,
//!     ..log_facade::configuration()
//! };
//! log_facade::initialize(config).expect("failed to initialize logging");
//!
//! log_facade::info!("service started on port ", 8080);
//! log_facade::warnf!("queue depth is {}", 512);
//! log_facade::errorw!("charge failed", "merchant_id", "m-42", "amount", 1999);
//!
//! let _ = log_facade::report_panic_if_any(&[&"nightly settlement"], || {
//!     panic!("settlement file missing");
//! });
//!
//! log_facade::flush().expect("failed to flush logs");
//! ```

mod config;
mod encoder;
mod global;
mod level;
mod logger;
mod macros;
mod panic;
mod record;
mod router;
mod sink;

#[cfg(feature = "tracing-layer")]
mod layer;
#[cfg(feature = "tracing-layer")]
mod storage;

pub use self::{
    config::{LogConfig, RotationPolicy},
    encoder::Encoder,
    global::{
        configuration, debug, debugf, debugw, error, errorf, errorw, fatal, fatalf, fatalw, flush,
        info, infof, infow, initialize, logger, panic, panicf, panicw, report_panic_if_any, warn,
        warnf, warnw, with_fields,
    },
    level::Level,
    logger::{Logger, LoggerBuilder},
    panic::{Disposition, Frame, PanicReporter, RecoveredPanic},
    record::{Fields, Record},
    router::{Destination, Route},
    sink::{MemorySink, MemoryWriter, RotatingFile, RotatingFileWriter, Sink},
};
#[cfg(feature = "tracing-layer")]
pub use self::layer::FacadeLayer;

mod keys {
    pub(crate) const IGNORED: &str = "ignored";

    #[cfg(feature = "tracing-layer")]
    pub(crate) const MESSAGE: &str = "message";
}

/// Items used by the exported macros.
#[doc(hidden)]
pub mod __private {
    pub use crate::record::{concat, field_value};
}

/// Errors that can occur within the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// An unrecognized level name.
    #[error("Unrecognized log level `{0}`, expected one of debug, info, warn, error, dpanic, panic, fatal")]
    InvalidLevel(String),

    /// Represents an error in configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Represents an error during JSON serialization of structured fields.
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Represents an error during initialization of the rolling file appender.
    #[error("Failed to initialize rolling file appender: {0}")]
    FileAppenderInitialization(#[from] tracing_appender::rolling::InitError),

    /// Represents an I/O error while preparing, writing or flushing a sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

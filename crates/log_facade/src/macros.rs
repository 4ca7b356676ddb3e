//! Leveled logging macros.
//!
//! Each level has three macros:
//! - `info!(a, b, ...)` concatenates the [`Display`][std::fmt::Display] renderings of its
//!   arguments with no separator, whatever their types: `info!(1, 2)` logs `12`, so spaces must
//!   be passed explicitly (`info!(1, " ", 2)`),
//! - `infof!("template {}", x)` formats its arguments like [`format!`],
//! - `infow!("message", "key", value, ...)` attaches alternating keys and values, each serialized
//!   with serde.
//!
//! By default the process-wide logger is used. A leading `logger: <expr>,` targets a specific
//! [`Logger`][crate::Logger] instead:
//!
//! ```
//! use log_facade::{Logger, infow};
//!
//! let logger = Logger::builder().build();
//! infow!(logger: logger, "order placed", "order_id", 1234, "amount", 9.99);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __plain {
    ($method:ident, logger: $logger:expr, $($value:expr),+ $(,)?) => {
        $logger.$method($crate::__private::concat(&[$(&$value as &dyn ::core::fmt::Display),+]))
    };
    ($method:ident, $($value:expr),+ $(,)?) => {
        $crate::logger().$method($crate::__private::concat(&[$(&$value as &dyn ::core::fmt::Display),+]))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __formatted {
    ($method:ident, logger: $logger:expr, $($arg:tt)+) => {
        $logger.$method(::core::format_args!($($arg)+))
    };
    ($method:ident, $($arg:tt)+) => {
        $crate::logger().$method(::core::format_args!($($arg)+))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __structured {
    ($method:ident, logger: $logger:expr, $message:expr $(, $kv:expr)* $(,)?) => {
        $logger.$method($message, &[$($crate::__private::field_value(&$kv)),*])
    };
    ($method:ident, $message:expr $(, $kv:expr)* $(,)?) => {
        $crate::logger().$method($message, &[$($crate::__private::field_value(&$kv)),*])
    };
}

/// Logs the concatenation of its arguments at `debug` level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__plain!(debug, $($arg)+) };
}

/// Logs a formatted message at `debug` level.
#[macro_export]
macro_rules! debugf {
    ($($arg:tt)+) => { $crate::__formatted!(debugf, $($arg)+) };
}

/// Logs a message with alternating keys and values at `debug` level.
#[macro_export]
macro_rules! debugw {
    ($($arg:tt)+) => { $crate::__structured!(debugw, $($arg)+) };
}

/// Logs the concatenation of its arguments at `info` level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__plain!(info, $($arg)+) };
}

/// Logs a formatted message at `info` level.
#[macro_export]
macro_rules! infof {
    ($($arg:tt)+) => { $crate::__formatted!(infof, $($arg)+) };
}

/// Logs a message with alternating keys and values at `info` level.
#[macro_export]
macro_rules! infow {
    ($($arg:tt)+) => { $crate::__structured!(infow, $($arg)+) };
}

/// Logs the concatenation of its arguments at `warn` level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__plain!(warn, $($arg)+) };
}

/// Logs a formatted message at `warn` level.
#[macro_export]
macro_rules! warnf {
    ($($arg:tt)+) => { $crate::__formatted!(warnf, $($arg)+) };
}

/// Logs a message with alternating keys and values at `warn` level.
#[macro_export]
macro_rules! warnw {
    ($($arg:tt)+) => { $crate::__structured!(warnw, $($arg)+) };
}

/// Logs the concatenation of its arguments at `error` level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__plain!(error, $($arg)+) };
}

/// Logs a formatted message at `error` level.
#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => { $crate::__formatted!(errorf, $($arg)+) };
}

/// Logs a message with alternating keys and values at `error` level.
#[macro_export]
macro_rules! errorw {
    ($($arg:tt)+) => { $crate::__structured!(errorw, $($arg)+) };
}

/// Logs the concatenation of its arguments at `fatal` level, then exits the process.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => { $crate::__plain!(fatal, $($arg)+) };
}

/// Logs a formatted message at `fatal` level, then exits the process.
#[macro_export]
macro_rules! fatalf {
    ($($arg:tt)+) => { $crate::__formatted!(fatalf, $($arg)+) };
}

/// Logs a message with alternating keys and values at `fatal` level, then exits the process.
#[macro_export]
macro_rules! fatalw {
    ($($arg:tt)+) => { $crate::__structured!(fatalw, $($arg)+) };
}

/// Logs the concatenation of its arguments at `panic` level, then panics.
#[macro_export]
macro_rules! panic {
    ($($arg:tt)+) => { $crate::__plain!(panic, $($arg)+) };
}

/// Logs a formatted message at `panic` level, then panics.
#[macro_export]
macro_rules! panicf {
    ($($arg:tt)+) => { $crate::__formatted!(panicf, $($arg)+) };
}

/// Logs a message with alternating keys and values at `panic` level, then panics.
#[macro_export]
macro_rules! panicw {
    ($($arg:tt)+) => { $crate::__structured!(panicw, $($arg)+) };
}

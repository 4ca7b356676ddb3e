//! Severity levels understood by the facade.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer};

use crate::LoggerError;

/// Ordered severity of a log record.
///
/// The ordering is `Debug < Info < Warn < Error < DPanic < Panic < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Verbose diagnostics, usually disabled in production.
    Debug,

    /// Routine operational messages.
    Info,

    /// Something unexpected that does not prevent progress.
    Warn,

    /// A failure that needs attention.
    Error,

    /// A condition that should never happen in a correct program.
    DPanic,

    /// Logged right before the calling thread panics.
    Panic,

    /// Logged right before the process exits.
    Fatal,
}

impl Level {
    /// All levels, in ascending order of severity.
    pub const ALL: [Self; 7] = [
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::DPanic,
        Self::Panic,
        Self::Fatal,
    ];

    /// Lowercase name, as accepted by [`Level::from_str`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::DPanic => "dpanic",
            Self::Panic => "panic",
            Self::Fatal => "fatal",
        }
    }

    /// Uppercase name used in rendered log lines.
    pub fn capital_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::DPanic => "DPANIC",
            Self::Panic => "PANIC",
            Self::Fatal => "FATAL",
        }
    }

    /// Whether records at this level go to the error-only destinations.
    pub fn is_error_or_above(self) -> bool {
        self >= Self::Error
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "dpanic" => Ok(Self::DPanic),
            "panic" => Ok(Self::Panic),
            "fatal" => Ok(Self::Fatal),
            _ => Err(LoggerError::InvalidLevel(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            _ => Self::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(
            Level::ALL
                .windows(2)
                .all(|pair| matches!(pair, [lower, higher] if lower < higher))
        );
        assert!(Level::Error.is_error_or_above());
        assert!(Level::Fatal.is_error_or_above());
        assert!(!Level::Warn.is_error_or_above());
    }

    #[test]
    fn parses_every_level_name() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().ok(), Some(level));
        }
        assert_eq!("WARNING".parse::<Level>().ok(), Some(Level::Warn));
        assert_eq!(" Info ".parse::<Level>().ok(), Some(Level::Info));
    }

    #[test]
    fn rejects_unknown_level_names() {
        let err = "verbose".parse::<Level>().err();
        assert!(matches!(err, Some(LoggerError::InvalidLevel(name)) if name == "verbose"));
    }

    #[test]
    fn maps_tracing_levels() {
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Debug);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }
}

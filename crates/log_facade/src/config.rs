//! Configuration of a [`Logger`][crate::Logger].

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{Level, LoggerError};

/// Configuration for the whole logging system.
///
/// All fields have defaults, so a partial configuration section can be deserialized:
///
/// ```
/// use log_facade::{Level, LogConfig};
///
/// let config: LogConfig =
///     serde_json::from_str(r#"{ "file_name": "billing", "level": "warn" }"#).unwrap();
/// assert_eq!(config.file_name, "billing");
/// assert_eq!(config.level, Level::Warn);
/// assert_eq!(config.max_age_days, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Stem of the log file names: `<stem>.log` and `<stem>_err.log`.
    pub file_name: String,

    /// Minimum level of records that are written anywhere.
    pub level: Level,

    /// Log files not modified for this many days are deleted. `0` keeps files forever.
    pub max_age_days: u32,

    /// Render timestamps in local time if `true`, in UTC otherwise.
    pub local_time: bool,

    /// Directory where log files will be stored.
    pub directory: PathBuf,

    /// How often the log files are rolled over.
    pub rotation: RotationPolicy,

    /// Whether records are also written to the standard output and error streams.
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_name: "log".to_string(),
            level: Level::Debug,
            max_age_days: 20,
            local_time: true,
            directory: PathBuf::from("./logs"),
            rotation: RotationPolicy::Daily,
            console: true,
        }
    }
}

impl LogConfig {
    /// Checks that the configuration can be used to build file sinks.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Configuration`] if the file name stem is empty or contains a path
    /// separator.
    pub fn validate(&self) -> Result<(), LoggerError> {
        if self.file_name.trim().is_empty() {
            return Err(LoggerError::Configuration(
                "the log file name must not be empty".to_string(),
            ));
        }

        if self.file_name.contains(['/', '\\']) {
            return Err(LoggerError::Configuration(format!(
                "the log file name `{}` must not contain path separators; use `directory` instead",
                self.file_name
            )));
        }

        Ok(())
    }

    /// File name prefix of the main log file.
    pub fn main_file_prefix(&self) -> String {
        self.file_name.clone()
    }

    /// File name prefix of the error-only log file.
    pub fn error_file_prefix(&self) -> String {
        format!("{}_err", self.file_name)
    }

    /// Maximum age of retained log files, if pruning is enabled.
    pub fn max_age(&self) -> Option<Duration> {
        (self.max_age_days > 0).then(|| Duration::from_secs(u64::from(self.max_age_days) * 86_400))
    }
}

/// How often the active log file is moved aside into a dated archive.
///
/// The active file is always `<stem>.log`. At the first write of a new period it is renamed to
/// `<stem>.<stamp>.log`, where the stamp is the UTC start of the period it covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// Archives named `<stem>.YYYY-MM-DD-HH-MM.log`.
    Minutely,

    /// Archives named `<stem>.YYYY-MM-DD-HH.log`.
    Hourly,

    /// Archives named `<stem>.YYYY-MM-DD.log`.
    Daily,

    /// A single file that is never rolled over.
    Never,
}

impl RotationPolicy {
    /// Interval between retention passes. A policy that never rotates still re-checks retention
    /// hourly.
    pub fn period(self) -> Duration {
        self.rollover_period().unwrap_or(Duration::from_secs(60 * 60))
    }

    /// Length of the period covered by one file, `None` if files never roll over.
    pub fn rollover_period(self) -> Option<Duration> {
        match self {
            Self::Minutely => Some(Duration::from_secs(60)),
            Self::Hourly => Some(Duration::from_secs(60 * 60)),
            Self::Daily => Some(Duration::from_secs(24 * 60 * 60)),
            Self::Never => None,
        }
    }

    pub(crate) fn stamp_format(self) -> &'static [BorrowedFormatItem<'static>] {
        match self {
            Self::Minutely => format_description!("[year]-[month]-[day]-[hour]-[minute]"),
            Self::Hourly => format_description!("[year]-[month]-[day]-[hour]"),
            Self::Daily | Self::Never => format_description!("[year]-[month]-[day]"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LogConfig::default();
        assert_eq!(config.file_name, "log");
        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.max_age_days, 20);
        assert!(config.local_time);
        assert_eq!(config.directory, PathBuf::from("./logs"));
        assert_eq!(config.error_file_prefix(), "log_err");
        assert_eq!(config.rotation, RotationPolicy::Daily);
    }

    #[test]
    fn rotation_periods() {
        assert_eq!(
            RotationPolicy::Daily.rollover_period(),
            Some(Duration::from_secs(86_400))
        );
        assert_eq!(RotationPolicy::Never.rollover_period(), None);
        assert_eq!(RotationPolicy::Never.period(), Duration::from_secs(3_600));
        assert_eq!(RotationPolicy::Minutely.period(), Duration::from_secs(60));
    }

    #[test]
    fn deserialization_rejects_unknown_levels() {
        let result = serde_json::from_value::<LogConfig>(json!({ "level": "loud" }));
        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("loud"), "unexpected error: {message}");
    }

    #[test]
    fn deserializes_rotation_policies() {
        let config: LogConfig =
            serde_json::from_value(json!({ "rotation": "never", "console": false })).unwrap();
        assert_eq!(config.rotation, RotationPolicy::Never);
        assert!(!config.console);
    }

    #[test]
    fn validation_rejects_bad_file_names() {
        let mut config = LogConfig::default();
        assert!(config.validate().is_ok());

        config.file_name = "  ".to_string();
        assert!(matches!(config.validate(), Err(LoggerError::Configuration(_))));

        config.file_name = "nested/name".to_string();
        assert!(matches!(config.validate(), Err(LoggerError::Configuration(_))));
    }

    #[test]
    fn zero_max_age_disables_pruning() {
        let config = LogConfig {
            max_age_days: 0,
            ..LogConfig::default()
        };
        assert_eq!(config.max_age(), None);
        assert_eq!(
            LogConfig::default().max_age(),
            Some(Duration::from_secs(20 * 86_400))
        );
    }
}

//! Renders [`Record`]s into human-readable lines.

use std::io::Write;

use colored::Color;
use serde::ser::{SerializeMap, Serializer};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Level, LoggerError, record::Record};

const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

/// Renders records as tab-separated lines: time, level, message and, if present, the structured
/// fields as a compact JSON object. Records at error level or above are followed by their stack
/// trace.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    color: bool,
    offset: UtcOffset,
}

impl Encoder {
    /// Creates an encoder that writes level names with ANSI colors.
    pub fn colored(local_time: bool) -> Self {
        Self {
            color: true,
            offset: resolve_offset(local_time),
        }
    }

    /// Creates an encoder that writes plain text.
    pub fn plain(local_time: bool) -> Self {
        Self {
            color: false,
            offset: resolve_offset(local_time),
        }
    }

    /// Renders a record, including the trailing newline.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, LoggerError> {
        let mut buffer = Vec::with_capacity(128 + record.message.len());

        let timestamp = record.time.to_offset(self.offset);
        let timestamp = timestamp
            .format(TIME_FORMAT)
            .unwrap_or_else(|_| timestamp.to_string());

        if self.color {
            write!(
                buffer,
                "{timestamp}\t{}\t{}",
                colorize(record.level),
                record.message
            )?;
        } else {
            write!(
                buffer,
                "{timestamp}\t{}\t{}",
                record.level.capital_str(),
                record.message
            )?;
        }

        if !record.fields.is_empty() {
            buffer.write_all(b"\t")?;
            let mut serializer = serde_json::Serializer::new(&mut buffer);
            let mut map_serializer = serializer.serialize_map(Some(record.fields.len()))?;
            for (key, value) in &record.fields {
                map_serializer.serialize_entry(key, value)?;
            }
            map_serializer.end()?;
        }

        buffer.write_all(b"\n")?;

        if let Some(stack) = &record.stack {
            buffer.write_all(stack.as_bytes())?;
            if !stack.ends_with('\n') {
                buffer.write_all(b"\n")?;
            }
        }

        Ok(buffer)
    }
}

/// Wraps the level name in ANSI color codes.
///
/// The codes are always written; the logger decides which destinations use a colored encoder.
fn colorize(level: Level) -> String {
    let color = match level {
        Level::Debug => Color::Magenta,
        Level::Info => Color::Blue,
        Level::Warn => Color::Yellow,
        Level::Error | Level::DPanic | Level::Panic | Level::Fatal => Color::Red,
    };
    format!("\x1b[{}m{}\x1b[0m", color.to_fg_str(), level.capital_str())
}

/// Resolves the offset used to render timestamps.
///
/// The local offset cannot always be determined (for example on some platforms once several
/// threads are running), in which case UTC is used.
fn resolve_offset(local_time: bool) -> UtcOffset {
    if !local_time {
        return UtcOffset::UTC;
    }

    UtcOffset::current_local_offset().unwrap_or_else(|error| {
        tracing::debug!("Unable to determine the local UTC offset, using UTC: {error}");
        UtcOffset::UTC
    })
}

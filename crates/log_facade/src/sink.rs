//! Destinations for rendered records.
//!
//! Any [`MakeWriter`] is a [`Sink`], so the standard streams, rolling files and in-memory buffers
//! are handled uniformly by the logger.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::{Mutex, MutexGuard};
use time::OffsetDateTime;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;

use crate::{LoggerError, RotationPolicy};

const LOG_FILE_SUFFIX: &str = "log";

/// A destination that receives fully rendered records.
pub trait Sink: Send + Sync {
    /// Writes one rendered record.
    ///
    /// Implementations should issue a single write so that records from concurrent callers are
    /// not interleaved.
    fn write_record(&self, buffer: &[u8]) -> io::Result<()>;

    /// Flushes any buffered output.
    fn flush(&self) -> io::Result<()>;
}

impl<W> Sink for W
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    fn write_record(&self, buffer: &[u8]) -> io::Result<()> {
        self.make_writer().write_all(buffer)
    }

    fn flush(&self) -> io::Result<()> {
        self.make_writer().flush()
    }
}

/// A log file `<directory>/<prefix>.log` rolled over into dated archives, with age-based
/// retention.
///
/// The active file keeps its name. At the first write of a new rotation period it is renamed to
/// `<prefix>.<stamp>.log` and a fresh active file is opened. Files of this sink last modified more
/// than `max_age` ago are deleted when the sink is created and once per rotation period
/// afterwards. The most recently modified file is never deleted.
#[derive(Debug)]
pub struct RotatingFile {
    active: Mutex<ActiveFile>,
    directory: PathBuf,
    prefix: String,
    rotation: RotationPolicy,
    max_age: Option<Duration>,
    next_prune: AtomicU64,
}

#[derive(Debug)]
struct ActiveFile {
    appender: RollingFileAppender,

    /// Index of the rotation period the active file belongs to.
    period: u64,
}

impl RotatingFile {
    /// Opens (creating if needed) the log file `<directory>/<prefix>.log`.
    ///
    /// A file left by a previous run is archived right away if it was last written in an earlier
    /// rotation period.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the log file cannot be created.
    pub fn new(
        directory: &Path,
        prefix: impl Into<String>,
        rotation: RotationPolicy,
        max_age: Option<Duration>,
    ) -> Result<Self, LoggerError> {
        let prefix = prefix.into();
        fs::create_dir_all(directory)?;

        let last_written = fs::metadata(directory.join(active_file_name(&prefix)))
            .and_then(|metadata| metadata.modified())
            .unwrap_or_else(|_| SystemTime::now());

        let sink = Self {
            active: Mutex::new(ActiveFile {
                appender: open_appender(directory, &prefix)?,
                period: period_index(rotation, last_written),
            }),
            directory: directory.to_path_buf(),
            prefix,
            rotation,
            max_age,
            next_prune: AtomicU64::new(0),
        };

        let now = SystemTime::now();
        sink.roll_over_if_due(now);
        sink.prune_if_due(now);

        Ok(sink)
    }

    /// Directory holding the files of this sink.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name prefix of this sink.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path of the file currently written to.
    pub fn active_path(&self) -> PathBuf {
        self.directory.join(active_file_name(&self.prefix))
    }

    /// Deletes files of this sink last modified more than `max_age` before `now`.
    ///
    /// Returns the paths of the deleted files.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed. Files that cannot be inspected or
    /// deleted are skipped.
    pub fn prune_expired(&self, now: SystemTime) -> io::Result<Vec<PathBuf>> {
        let Some(max_age) = self.max_age else {
            return Ok(Vec::new());
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() || !self.owns(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if let Ok(modified) = metadata.modified() {
                files.push((entry.path(), modified));
            }
        }

        let newest = files.iter().map(|(_, modified)| *modified).max();

        let mut removed = Vec::new();
        for (path, modified) in files {
            if Some(modified) == newest {
                continue;
            }

            let expired = now
                .duration_since(modified)
                .is_ok_and(|age| age > max_age);
            if !expired {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(error) => {
                    tracing::warn!("Failed to remove expired log file `{}`: {error}", path.display());
                }
            }
        }

        Ok(removed)
    }

    /// Whether a file name belongs to this sink: `<prefix>.log` or `<prefix>.<stamp>.log`.
    fn owns(&self, file_name: &str) -> bool {
        let Some(rest) = file_name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            return false;
        };

        rest == LOG_FILE_SUFFIX
            || rest
                .strip_suffix(LOG_FILE_SUFFIX)
                .and_then(|stamp| stamp.strip_suffix('.'))
                .is_some_and(is_period_stamp)
    }

    fn roll_over_if_due(&self, now: SystemTime) {
        // Reported once the lock is released, the warning may be written through this sink
        let outcome = self.roll_over(&mut self.active.lock(), now);
        if let Err(message) = outcome {
            tracing::warn!("{message}");
        }
    }

    fn roll_over(&self, active: &mut ActiveFile, now: SystemTime) -> Result<(), String> {
        let current = period_index(self.rotation, now);
        if current <= active.period {
            return Ok(());
        }

        let archive = self.archive_path(active.period);
        active.period = current;

        if archive.exists() {
            return Err(format!(
                "Log archive `{}` already exists, continuing to write to `{}`",
                archive.display(),
                self.active_path().display()
            ));
        }

        fs::rename(self.active_path(), &archive).map_err(|error| {
            format!(
                "Failed to archive log file `{}`: {error}",
                self.active_path().display()
            )
        })?;

        active.appender = open_appender(&self.directory, &self.prefix).map_err(|error| {
            format!(
                "Failed to reopen log file `{}`, writing to `{}` instead: {error}",
                self.active_path().display(),
                archive.display()
            )
        })?;

        Ok(())
    }

    /// Path of the archive holding the records of rotation period `period`.
    fn archive_path(&self, period: u64) -> PathBuf {
        let length = self
            .rotation
            .rollover_period()
            .map(|length| length.as_secs())
            .unwrap_or_default();
        let start = UNIX_EPOCH
            .checked_add(Duration::from_secs(period.saturating_mul(length)))
            .unwrap_or(UNIX_EPOCH);
        let start = OffsetDateTime::from(start);
        let stamp = start
            .format(self.rotation.stamp_format())
            .unwrap_or_else(|_| start.date().to_string());

        self.directory.join(format!("{}.{stamp}.{LOG_FILE_SUFFIX}", self.prefix))
    }

    fn prune_if_due(&self, now: SystemTime) {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        let due = self.next_prune.load(Ordering::Acquire);
        if now_secs < due {
            return;
        }

        let next = now_secs.saturating_add(self.rotation.period().as_secs());
        if self
            .next_prune
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another writer is already pruning
            return;
        }

        if let Err(error) = self.prune_expired(now) {
            tracing::warn!(
                "Failed to prune log files in `{}`: {error}",
                self.directory.display()
            );
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        let now = SystemTime::now();
        self.roll_over_if_due(now);
        self.prune_if_due(now);
        RotatingFileWriter(self.active.lock())
    }
}

/// Writer handed out by [`RotatingFile`]; holds the active file lock while alive.
#[derive(Debug)]
pub struct RotatingFileWriter<'a>(MutexGuard<'a, ActiveFile>);

impl Write for RotatingFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.appender.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.appender.flush()
    }
}

fn active_file_name(prefix: &str) -> String {
    format!("{prefix}.{LOG_FILE_SUFFIX}")
}

fn open_appender(directory: &Path, prefix: &str) -> Result<RollingFileAppender, LoggerError> {
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(directory)?)
}

/// Index of the rotation period containing `time`, counted from the Unix epoch in UTC.
fn period_index(rotation: RotationPolicy, time: SystemTime) -> u64 {
    let Some(length) = rotation.rollover_period() else {
        return 0;
    };
    time.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| elapsed.as_secs().checked_div(length.as_secs()))
        .unwrap_or_default()
}

/// Whether `stamp` has the shape `YYYY-MM-DD`, optionally followed by `-HH` and `-MM`.
fn is_period_stamp(stamp: &str) -> bool {
    fn digits(part: &str, len: usize) -> bool {
        part.len() == len && part.bytes().all(|byte| byte.is_ascii_digit())
    }

    let mut parts = stamp.split('-');
    let year = parts.next().is_some_and(|year| digits(year, 4));
    let rest: Vec<&str> = parts.collect();

    year && (2..=4).contains(&rest.len()) && rest.iter().all(|part| digits(part, 2))
}

/// An in-memory sink, mostly useful for inspecting output in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// The lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Discards everything written so far.
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Writer handed out by [`MemorySink`]; holds the buffer lock while alive.
#[derive(Debug)]
pub struct MemoryWriter<'a>(MutexGuard<'a, Vec<u8>>);

impl Write for MemoryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemorySink {
    type Writer = MemoryWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        MemoryWriter(self.buffer.lock())
    }
}

//! The composite logger: encoders, sinks and routes behind a single leveled API.

use std::{
    backtrace::Backtrace,
    fmt,
    io::{self, IsTerminal},
    sync::Arc,
};

use serde_json::Value;

use crate::{
    Level, LogConfig, LoggerError,
    encoder::Encoder,
    record::{self, Fields, Record},
    router::{Destination, Route},
    sink::{RotatingFile, Sink},
};

/// Exit status used by the `fatal` family of methods.
const FATAL_EXIT_CODE: i32 = 1;

/// A logger fanning each record out to the destinations whose route accepts its level.
///
/// Cloning is cheap: clones share the same sinks. Loggers are independent of the process-wide
/// logger, so they can be passed explicitly to the code that needs them.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
    fields: Arc<Fields>,
}

struct Inner {
    minimum: Level,
    cores: Vec<Core>,
}

struct Core {
    route: Route,
    encoder: Encoder,
    sink: Arc<dyn Sink>,
}

/// Generates the plain, formatted and structured methods of one level.
macro_rules! leveled_methods {
    ($level:expr, $name:literal, $plain:ident, $formatted:ident, $structured:ident) => {
        #[doc = concat!("Logs a message at `", $name, "` level.")]
        pub fn $plain(&self, message: impl fmt::Display) {
            self.log($level, message, &[]);
        }

        #[doc = concat!("Logs a message built with [`format_args!`] at `", $name, "` level.")]
        pub fn $formatted(&self, args: fmt::Arguments<'_>) {
            self.log($level, args, &[]);
        }

        #[doc = concat!("Logs a message with alternating keys and values at `", $name, "` level.")]
        pub fn $structured(&self, message: impl fmt::Display, keys_and_values: &[Value]) {
            self.log($level, message, keys_and_values);
        }
    };
}

impl Logger {
    /// Builds a logger writing to the rolling main and error files described by `config`, and to
    /// the standard streams if `config.console` is set.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if the configuration is invalid or a log file cannot be created.
    pub fn new(config: &LogConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        let max_age = config.max_age();
        let main_file = RotatingFile::new(
            &config.directory,
            config.main_file_prefix(),
            config.rotation,
            max_age,
        )?;
        let error_file = RotatingFile::new(
            &config.directory,
            config.error_file_prefix(),
            config.rotation,
            max_age,
        )?;

        let mut builder = Self::builder()
            .minimum(config.level)
            .local_time(config.local_time)
            .sink(Destination::MainFile, Arc::new(main_file))
            .sink(Destination::ErrorFile, Arc::new(error_file));

        if config.console {
            builder = builder.standard_streams();
        }

        Ok(builder.build())
    }

    /// Builds a logger that only writes to the standard streams.
    pub fn console_only(config: &LogConfig) -> Self {
        Self::builder()
            .minimum(config.level)
            .local_time(config.local_time)
            .standard_streams()
            .build()
    }

    /// Starts building a logger with custom sinks.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// The minimum level of records this logger writes.
    pub fn minimum_level(&self) -> Level {
        self.inner.minimum
    }

    /// Whether a record at `level` would be written anywhere.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.inner.minimum
            && self
                .inner
                .cores
                .iter()
                .any(|core| core.route.accepts(level))
    }

    /// Returns a logger adding the given alternating keys and values to every record.
    ///
    /// Fields already bound to `self` come first.
    pub fn with_fields(&self, keys_and_values: &[Value]) -> Self {
        let mut fields = Fields::clone(&self.fields);
        fields.extend(record::pair_fields(keys_and_values));

        Self {
            inner: Arc::clone(&self.inner),
            fields: Arc::new(fields),
        }
    }

    /// Logs a message with alternating keys and values at the given level.
    ///
    /// Records at error level and above carry the stack trace of the caller.
    pub fn log(&self, level: Level, message: impl fmt::Display, keys_and_values: &[Value]) {
        if !self.enabled(level) {
            return;
        }
        let fields = record::pair_fields(keys_and_values);
        self.emit(level, message.to_string(), fields, level.is_error_or_above());
    }

    /// Builds the record and writes it to each accepting destination.
    ///
    /// Write failures are ignored: logging never fails the caller.
    pub(crate) fn emit(&self, level: Level, message: String, fields: Fields, with_stack: bool) {
        if !self.enabled(level) {
            return;
        }

        let mut all_fields = Fields::clone(&self.fields);
        all_fields.extend(fields);

        let mut record = Record::new(level, message, all_fields);
        if with_stack {
            record.stack = Some(Backtrace::force_capture().to_string());
        }

        for core in self.inner.cores.iter().filter(|core| core.route.accepts(level)) {
            if let Ok(encoded) = core.encoder.encode(&record) {
                let _ = core.sink.write_record(&encoded);
            }
        }
    }

    /// Flushes every sink.
    ///
    /// # Errors
    ///
    /// Returns the first flush failure; the remaining sinks are still flushed.
    pub fn flush(&self) -> Result<(), LoggerError> {
        let mut first_error = None;
        for core in &self.inner.cores {
            if let Err(error) = core.sink.flush() {
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(LoggerError::Io(error)),
            None => Ok(()),
        }
    }

    leveled_methods!(Level::Debug, "debug", debug, debugf, debugw);
    leveled_methods!(Level::Info, "info", info, infof, infow);
    leveled_methods!(Level::Warn, "warn", warn, warnf, warnw);
    leveled_methods!(Level::Error, "error", error, errorf, errorw);

    /// Logs a message at `fatal` level, flushes, then exits the process.
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        self.fatalw(message, &[])
    }

    /// Logs a message built with [`format_args!`] at `fatal` level, flushes, then exits the
    /// process.
    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.fatalw(args, &[])
    }

    /// Logs a message with alternating keys and values at `fatal` level, flushes, then exits the
    /// process.
    pub fn fatalw(&self, message: impl fmt::Display, keys_and_values: &[Value]) -> ! {
        self.log(Level::Fatal, message, keys_and_values);
        let _ = self.flush();
        std::process::exit(FATAL_EXIT_CODE)
    }

    /// Logs a message at `panic` level, then panics with the message as payload.
    pub fn panic(&self, message: impl fmt::Display) -> ! {
        self.panicw(message, &[])
    }

    /// Logs a message built with [`format_args!`] at `panic` level, then panics with the message
    /// as payload.
    pub fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        self.panicw(args, &[])
    }

    /// Logs a message with alternating keys and values at `panic` level, then panics with the
    /// message as payload.
    pub fn panicw(&self, message: impl fmt::Display, keys_and_values: &[Value]) -> ! {
        let message = message.to_string();
        self.log(Level::Panic, &message, keys_and_values);
        std::panic::panic_any(message)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("minimum", &self.inner.minimum)
            .field(
                "destinations",
                &self
                    .inner
                    .cores
                    .iter()
                    .map(|core| core.route.destination())
                    .collect::<Vec<_>>(),
            )
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for a [`Logger`] with custom sinks.
///
/// ```
/// use std::sync::Arc;
///
/// use log_facade::{Destination, Level, Logger, MemorySink};
///
/// let errors = MemorySink::new();
/// let logger = Logger::builder()
///     .minimum(Level::Info)
///     .local_time(false)
///     .sink(Destination::ErrorFile, Arc::new(errors.clone()))
///     .build();
///
/// logger.info("not an error");
/// logger.error("disk full");
/// assert!(errors.contents().contains("disk full"));
/// assert!(!errors.contents().contains("not an error"));
/// ```
#[allow(missing_debug_implementations)] // Sinks are `dyn Trait` objects
pub struct LoggerBuilder {
    minimum: Level,
    local_time: bool,
    sinks: Vec<(Destination, Arc<dyn Sink>, bool)>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            minimum: Level::Debug,
            local_time: true,
            sinks: Vec::new(),
        }
    }
}

impl LoggerBuilder {
    /// Sets the minimum level of written records.
    pub fn minimum(mut self, level: Level) -> Self {
        self.minimum = level;
        self
    }

    /// Renders timestamps in local time if `true`, in UTC otherwise.
    pub fn local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    /// Adds a sink for a destination. Console destinations use colored output, file destinations
    /// plain text.
    pub fn sink(self, destination: Destination, sink: Arc<dyn Sink>) -> Self {
        let color = matches!(destination, Destination::Stdout | Destination::Stderr);
        self.sink_with_color(destination, sink, color)
    }

    /// Adds a sink for a destination, writing level names with ANSI colors if `color` is set.
    pub fn sink_with_color(
        mut self,
        destination: Destination,
        sink: Arc<dyn Sink>,
        color: bool,
    ) -> Self {
        self.sinks.push((destination, sink, color));
        self
    }

    /// Adds the process's standard output and error streams. Each stream is colored only if it is
    /// a terminal.
    pub fn standard_streams(self) -> Self {
        self.sink_with_color(
            Destination::Stdout,
            Arc::new(io::stdout),
            io::stdout().is_terminal(),
        )
        .sink_with_color(
            Destination::Stderr,
            Arc::new(io::stderr),
            io::stderr().is_terminal(),
        )
    }

    /// Builds the logger.
    pub fn build(self) -> Logger {
        let colored = Encoder::colored(self.local_time);
        let plain = Encoder::plain(self.local_time);

        let cores = self
            .sinks
            .into_iter()
            .map(|(destination, sink, color)| {
                let encoder = if color { colored } else { plain };
                Core {
                    route: Route::new(destination, self.minimum),
                    encoder,
                    sink,
                }
            })
            .collect();

        Logger {
            inner: Arc::new(Inner {
                minimum: self.minimum,
                cores,
            }),
            fields: Arc::new(Fields::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod tests {
    use std::{fs, panic};

    use serde_json::json;

    use super::*;
    use crate::MemorySink;

    /// In-memory sinks for each destination.
    #[derive(Clone, Default)]
    pub(crate) struct Captured {
        pub(crate) main: MemorySink,
        pub(crate) error: MemorySink,
        pub(crate) stdout: MemorySink,
        pub(crate) stderr: MemorySink,
    }

    impl Captured {
        pub(crate) fn logger(&self, minimum: Level) -> Logger {
            Logger::builder()
                .minimum(minimum)
                .local_time(false)
                .sink(Destination::MainFile, Arc::new(self.main.clone()))
                .sink(Destination::ErrorFile, Arc::new(self.error.clone()))
                .sink(Destination::Stdout, Arc::new(self.stdout.clone()))
                .sink(Destination::Stderr, Arc::new(self.stderr.clone()))
                .build()
        }
    }

    #[test]
    fn routes_records_by_severity() {
        let captured = Captured::default();
        let logger = captured.logger(Level::Info);

        logger.debug("debug-line");
        logger.info("info-line");
        logger.warn("warn-line");
        logger.error("error-line");

        let main = captured.main.contents();
        assert!(!main.contains("debug-line"));
        assert!(main.contains("info-line"));
        assert!(main.contains("warn-line"));
        assert!(main.contains("error-line"));

        let error = captured.error.contents();
        assert!(!error.contains("info-line"));
        assert!(!error.contains("warn-line"));
        assert!(error.contains("error-line"));

        let stdout = captured.stdout.contents();
        assert!(stdout.contains("info-line"));
        assert!(stdout.contains("warn-line"));
        assert!(!stdout.contains("error-line"));

        let stderr = captured.stderr.contents();
        assert!(stderr.contains("error-line"));
        assert!(!stderr.contains("warn-line"));
    }

    #[test]
    fn records_below_minimum_are_dropped_everywhere() {
        let captured = Captured::default();
        let logger = captured.logger(Level::Error);

        logger.warn("quiet");
        assert!(!logger.enabled(Level::Warn));
        assert!(logger.enabled(Level::Error));
        assert!(captured.main.contents().is_empty());
        assert!(captured.stdout.contents().is_empty());
    }

    #[test]
    fn formatted_and_structured_shapes() {
        let captured = Captured::default();
        let logger = captured.logger(Level::Debug);

        logger.infof(format_args!("charged {} cents", 250));
        logger.warnw("retrying", &[json!("attempt"), json!(2), json!("backoff_ms"), json!(50)]);

        let lines = captured.main.lines();
        assert!(lines[0].ends_with("\tINFO\tcharged 250 cents"));
        assert!(lines[1].ends_with("\tWARN\tretrying\t{\"attempt\":2,\"backoff_ms\":50}"));
    }

    #[test]
    fn odd_structured_arguments_do_not_crash() {
        let captured = Captured::default();
        let logger = captured.logger(Level::Debug);

        logger.infow("odd", &[json!("user"), json!("bob"), json!("orphan")]);

        let main = captured.main.contents();
        assert!(main.contains("{\"user\":\"bob\",\"ignored\":\"orphan\"}"));
    }

    #[test]
    fn bound_fields_come_first() {
        let captured = Captured::default();
        let logger = captured
            .logger(Level::Debug)
            .with_fields(&[json!("request_id"), json!("r-1")]);
        let nested = logger.with_fields(&[json!("merchant"), json!("m-9")]);

        nested.infow("done", &[json!("status"), json!(200)]);
        logger.info("parent");

        let lines = captured.main.lines();
        assert!(
            lines[0].ends_with("\tdone\t{\"request_id\":\"r-1\",\"merchant\":\"m-9\",\"status\":200}")
        );
        assert!(lines[1].ends_with("\tparent\t{\"request_id\":\"r-1\"}"));
    }

    #[test]
    fn error_records_carry_a_stack_trace() {
        let captured = Captured::default();
        let logger = captured.logger(Level::Debug);

        logger.warn("no stack");
        assert_eq!(captured.main.lines().len(), 1);

        logger.error("with stack");
        assert!(captured.error.lines().len() > 1);
    }

    #[test]
    fn panic_methods_log_then_unwind() {
        let captured = Captured::default();
        let logger = captured.logger(Level::Debug);

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            logger.panicf(format_args!("invariant {} broken", 7));
        }));

        let payload = result.err().unwrap();
        assert_eq!(
            payload.downcast_ref::<String>().map(String::as_str),
            Some("invariant 7 broken")
        );
        assert!(captured.stderr.contents().contains("invariant 7 broken"));
        assert!(captured.main.contents().contains("PANIC"));
    }

    #[test]
    fn builds_file_sinks_from_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file_name: "orders".to_string(),
            directory: dir.path().to_path_buf(),
            rotation: crate::RotationPolicy::Never,
            console: false,
            local_time: false,
            ..LogConfig::default()
        };

        let logger = Logger::new(&config).unwrap();
        logger.info("created");
        logger.error("failed");
        logger.flush().unwrap();

        let main = fs::read_to_string(dir.path().join("orders.log")).unwrap();
        let error = fs::read_to_string(dir.path().join("orders_err.log")).unwrap();
        assert!(main.contains("created") && main.contains("failed"));
        assert!(error.contains("failed") && !error.contains("created"));
    }

    #[test]
    fn default_configuration_writes_fixed_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            directory: dir.path().to_path_buf(),
            ..LogConfig::default()
        };

        let logger = Logger::new(&config).unwrap();
        assert_eq!(logger.minimum_level(), Level::Debug);
        logger.info("hello");
        logger.error("boom");
        logger.flush().unwrap();

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["log.log", "log_err.log"]);
        assert!(fs::read_to_string(dir.path().join("log_err.log")).unwrap().contains("boom"));
    }

    #[test]
    fn console_coloring_is_chosen_per_sink() {
        let colored = MemorySink::new();
        let plain = MemorySink::new();
        let logger = Logger::builder()
            .local_time(false)
            .sink(Destination::Stderr, Arc::new(colored.clone()))
            .sink_with_color(Destination::Stdout, Arc::new(plain.clone()), false)
            .build();

        logger.error("disk full");
        logger.info("recovered");

        assert!(colored.contents().contains("\t\x1b[31mERROR\x1b[0m\tdisk full"));
        assert!(plain.contents().contains("\tINFO\trecovered"));
        assert!(!plain.contents().contains('\x1b'));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = LogConfig {
            file_name: String::new(),
            ..LogConfig::default()
        };
        assert!(matches!(
            Logger::new(&config),
            Err(LoggerError::Configuration(_))
        ));
    }
}

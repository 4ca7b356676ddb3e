//! Recovery and reporting of panics raised inside a protected closure.
//!
//! A process-wide panic hook, installed on first use, captures the stack of threads that are
//! inside a [`PanicReporter::run`] call at the moment the panic is raised. Panics on other threads
//! are forwarded to the previously installed hook untouched.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Once},
};

use crate::{Level, Logger};

static INSTALL_HOOK: Once = Once::new();

thread_local! {
    static PROTECTED_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Capture>> = const { RefCell::new(None) };
}

/// Stack and location recorded by the panic hook.
#[derive(Debug, Clone)]
struct Capture {
    location: Option<String>,
    frames: Vec<Frame>,
}

/// One frame of the stack captured when a panic was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Demangled function name, or `<unknown>` if no symbol was found.
    pub function: String,

    /// Source file, if debug information is available.
    pub file: Option<String>,

    /// Source line, if debug information is available.
    pub line: Option<u32>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[func:{},file:{},line:{}]",
            self.function,
            self.file.as_deref().unwrap_or("?"),
            self.line.map_or_else(|| "?".to_string(), |line| line.to_string())
        )
    }
}

/// A panic recovered by a [`PanicReporter`].
#[derive(Debug, Clone)]
pub struct RecoveredPanic {
    /// The panic payload if it was a string, a placeholder otherwise.
    pub message: String,

    /// Source location of the panic, if known.
    pub location: Option<String>,

    /// The stack at the time of the panic, innermost frame first.
    pub frames: Vec<Frame>,
}

impl fmt::Display for RecoveredPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "panicked at {location}: {}", self.message),
            None => write!(f, "panicked: {}", self.message),
        }
    }
}

impl std::error::Error for RecoveredPanic {}

/// What happens to a panic once it has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Swallow the panic; [`PanicReporter::run`] returns the [`RecoveredPanic`] as an error.
    Suppress,

    /// Continue unwinding with the original payload.
    Resume,
}

type Handler = Arc<dyn Fn(&RecoveredPanic) -> Disposition + Send + Sync>;

/// Runs closures in a protected frame, logging any panic they raise.
///
/// For a recovered panic, the reporter logs at error level, in order: the panic message, one
/// record per captured stack frame, and a pretty debug dump of each supplied diagnostic value.
/// The handler then decides whether the panic is suppressed (the default) or resumed.
///
/// ```
/// use log_facade::{Disposition, Logger, PanicReporter};
///
/// let reporter = PanicReporter::new(Logger::builder().build())
///     .on_panic(|recovered| {
///         if recovered.message.contains("fatal") {
///             Disposition::Resume
///         } else {
///             Disposition::Suppress
///         }
///     });
///
/// let outcome = reporter.run(&[&"job-42"], || -> u32 { panic!("transient failure") });
/// assert_eq!(outcome.unwrap_err().message, "transient failure");
///
/// assert_eq!(reporter.run(&[], || 7).unwrap(), 7);
/// ```
#[derive(Clone)]
pub struct PanicReporter {
    logger: Option<Logger>,
    handler: Handler,
}

impl PanicReporter {
    /// Creates a reporter logging to `logger`.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
            handler: Arc::new(suppress),
        }
    }

    /// Creates a reporter logging to the process-wide logger current at the time of the panic.
    pub fn global() -> Self {
        Self {
            logger: None,
            handler: Arc::new(suppress),
        }
    }

    /// Sets the handler deciding what happens to a panic after it has been reported.
    pub fn on_panic<H>(mut self, handler: H) -> Self
    where
        H: Fn(&RecoveredPanic) -> Disposition + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Runs `f`, reporting a panic raised by it.
    ///
    /// Without a panic this returns `Ok` with the result of `f` and logs nothing.
    ///
    /// # Errors
    ///
    /// Returns the [`RecoveredPanic`] if `f` panicked and the handler suppressed the panic.
    pub fn run<F, R>(&self, diagnostics: &[&dyn fmt::Debug], f: F) -> Result<R, RecoveredPanic>
    where
        F: FnOnce() -> R,
    {
        install_hook();

        let outcome = {
            let _protected = ProtectedFrame::enter();
            panic::catch_unwind(AssertUnwindSafe(f))
        };

        let payload = match outcome {
            Ok(value) => return Ok(value),
            Err(payload) => payload,
        };

        let capture = CAPTURED
            .with(|captured| captured.borrow_mut().take())
            .unwrap_or_else(|| Capture {
                location: None,
                frames: capture_frames(),
            });

        let recovered = RecoveredPanic {
            message: payload_message(payload.as_ref()),
            location: capture.location.clone(),
            frames: capture.frames.clone(),
        };

        match &self.logger {
            Some(logger) => report(logger, &recovered, diagnostics),
            None => report(&crate::logger(), &recovered, diagnostics),
        }

        match (self.handler)(&recovered) {
            Disposition::Suppress => Err(recovered),
            Disposition::Resume => {
                // An enclosing reporter reuses the stack of the original panic
                CAPTURED.with(|captured| *captured.borrow_mut() = Some(capture));
                panic::resume_unwind(payload)
            }
        }
    }
}

impl fmt::Debug for PanicReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicReporter")
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

fn suppress(_: &RecoveredPanic) -> Disposition {
    Disposition::Suppress
}

/// Marks the current thread as running inside a protected frame while alive.
struct ProtectedFrame;

impl ProtectedFrame {
    fn enter() -> Self {
        PROTECTED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for ProtectedFrame {
    fn drop(&mut self) {
        PROTECTED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if PROTECTED_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }

            let capture = Capture {
                location: info.location().map(ToString::to_string),
                frames: capture_frames(),
            };
            CAPTURED.with(|captured| *captured.borrow_mut() = Some(capture));
        }));
    });
}

/// Walks the current stack, skipping the frames of the capturing machinery itself.
fn capture_frames() -> Vec<Frame> {
    let backtrace = backtrace::Backtrace::new();

    backtrace
        .frames()
        .iter()
        .flat_map(backtrace::BacktraceFrame::symbols)
        .map(|symbol| Frame {
            function: symbol
                .name()
                .map_or_else(|| "<unknown>".to_string(), |name| format!("{name:#}")),
            file: symbol.filename().map(|path| path.display().to_string()),
            line: symbol.lineno(),
        })
        .skip_while(|frame| {
            frame.function.starts_with("backtrace::")
                || frame.function.starts_with("log_facade::panic::")
        })
        .collect()
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

fn report(logger: &Logger, recovered: &RecoveredPanic, diagnostics: &[&dyn fmt::Debug]) {
    let fields = recovered
        .location
        .as_ref()
        .map(|location| vec![("location".to_string(), location.as_str().into())])
        .unwrap_or_default();
    logger.emit(Level::Error, recovered.message.clone(), fields, false);

    for (index, frame) in recovered.frames.iter().enumerate() {
        logger.emit(Level::Error, format!("frame {index}:{frame}"), Vec::new(), false);
    }

    for (index, diagnostic) in diagnostics.iter().enumerate() {
        logger.emit(
            Level::Error,
            format!("EXTRAS#{index} DATA:{diagnostic:#?}"),
            Vec::new(),
            false,
        );
    }
}

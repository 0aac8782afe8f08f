//! Warnings, errors, and fatal events.
//!
//! Every anomaly the library detects is reported as an [`Event`] carrying a
//! stable numeric code, the source filename, and a line number. Warnings and
//! errors accumulate in an [`Events`] dispatcher and are forwarded to an
//! optional caller-installed callback; a fatal event aborts the current
//! operation by becoming the [`Error`] returned from the entry point.

use std::fmt;

use tracing::trace;

/// How serious an [`Event`] is.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Severity {
    /// The document loaded (or will dump), but something is questionable.
    Warning,
    /// Something is wrong, but the operation can make forward progress.
    Error,
    /// The operation cannot continue; reported as the returned [`Error`].
    Fatal,
}

impl Severity {
    fn letter(self) -> char {
        match self {
            Severity::Warning => 'W',
            Severity::Error => 'E',
            Severity::Fatal => 'F',
        }
    }
}

/// A single diagnostic: severity, stable code, source position, message.
#[derive(Clone, Debug)]
pub struct Event {
    /// How serious this event is.
    pub severity: Severity,
    /// The stable numeric code; codes are grouped by failure family
    /// (I/O and header, lexical, value model, parser, imports, registry).
    pub code: u16,
    /// The file (or pseudo-filename for string sources) being processed.
    pub filename: String,
    /// 1-based line number; 0 when no position applies.
    pub lineno: usize,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uxf:{}{}:{}:{}:{}",
            self.severity.letter(),
            self.code,
            self.filename,
            self.lineno,
            self.message
        )
    }
}

/// The error returned by every fallible operation in this crate.
///
/// An `Error` is always fatal: it carries the same code/position payload as
/// the fatal [`Event`] that produced it.
#[derive(Clone, Debug)]
pub struct Error {
    /// The stable numeric code.
    pub code: u16,
    /// The file being processed when the error arose.
    pub filename: String,
    /// 1-based line number; 0 when no position applies.
    pub lineno: usize,
    /// Human-readable description.
    pub message: String,
}

impl Error {
    /// Creates an error with no associated file or line.
    ///
    /// Used by the value-model mutation methods, which run outside any
    /// parse and so have no source position.
    pub fn new<S: Into<String>>(code: u16, message: S) -> Self {
        Error { code, filename: String::new(), lineno: 0, message: message.into() }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uxf:F{}:{}:{}:{}",
            self.code, self.filename, self.lineno, self.message
        )
    }
}

impl From<Event> for Error {
    fn from(event: Event) -> Self {
        Error {
            code: event.code,
            filename: event.filename,
            lineno: event.lineno,
            message: event.message,
        }
    }
}

/// The callback type for receiving events as they are raised.
pub type OnEventFn<'a> = &'a mut dyn FnMut(&Event);

/// Accumulates warnings and errors and constructs fatal [`Error`]s.
///
/// Non-fatal events are pushed onto an internal list and forwarded to the
/// handler if one is installed; without a handler, verbose mode writes each
/// event to stderr. [`Events::fatal`] dispatches the event and returns the
/// `Error` for `?` propagation.
pub struct Events<'a> {
    filename: String,
    verbose: bool,
    handler: Option<OnEventFn<'a>>,
    events: Vec<Event>,
}

impl<'a> Events<'a> {
    /// Creates a dispatcher for the given source name.
    ///
    /// With `verbose` true and no handler installed, events are echoed to
    /// stderr, which is the behaviour of the convenience entry points.
    pub fn new(filename: &str, verbose: bool) -> Self {
        Events {
            filename: filename.to_string(),
            verbose,
            handler: None,
            events: Vec::new(),
        }
    }

    /// Creates a dispatcher that forwards every event to `handler`.
    pub fn with_handler(filename: &str, handler: OnEventFn<'a>) -> Self {
        Events {
            filename: filename.to_string(),
            verbose: false,
            handler: Some(handler),
            events: Vec::new(),
        }
    }

    /// The source name used for subsequently raised events.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Switches the source name; returns the previous one.
    ///
    /// The import resolver uses this when it descends into an imported
    /// document and restores the outer name afterwards.
    pub fn swap_filename(&mut self, filename: &str) -> String {
        std::mem::replace(&mut self.filename, filename.to_string())
    }

    /// All events raised so far, in source order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// True if any `Error`-severity event has been raised.
    pub fn has_errors(&self) -> bool {
        self.events.iter().any(|e| e.severity == Severity::Error)
    }

    /// True if any warning has been raised.
    pub fn has_warnings(&self) -> bool {
        self.events.iter().any(|e| e.severity == Severity::Warning)
    }

    /// Raises a warning.
    pub fn warning<S: Into<String>>(&mut self, code: u16, lineno: usize, message: S) {
        self.dispatch(Severity::Warning, code, lineno, message.into());
    }

    /// Raises a non-fatal error; the caller continues if it can.
    pub fn error<S: Into<String>>(&mut self, code: u16, lineno: usize, message: S) {
        self.dispatch(Severity::Error, code, lineno, message.into());
    }

    /// Raises a fatal event and returns the `Error` to propagate.
    #[must_use = "a fatal event aborts the current operation"]
    pub fn fatal<S: Into<String>>(&mut self, code: u16, lineno: usize, message: S) -> Error {
        let message = message.into();
        self.dispatch(Severity::Fatal, code, lineno, message.clone());
        Error {
            code,
            filename: self.filename.clone(),
            lineno,
            message,
        }
    }

    fn dispatch(&mut self, severity: Severity, code: u16, lineno: usize, message: String) {
        let event = Event {
            severity,
            code,
            filename: self.filename.clone(),
            lineno,
            message,
        };
        trace!("event: {event}");
        if let Some(handler) = self.handler.as_mut() {
            handler(&event);
        } else if self.verbose {
            eprintln!("{event}");
        }
        self.events.push(event);
    }
}

//! Bridge between the registry and the thread's unwinding machinery.
//!
//! Raising a staged error resumes unwinding with the [`ErrorValue`] as panic payload,
//! so it travels up the calling thread exactly like a fresh panic would, without
//! re-running the panic hook. Capturing does the reverse: a panic payload or an `Err`
//! result is classified into an [`ErrorValue`] when it is recognized as an error.
//!
//! Recognized payloads:
//! - [`ErrorValue`] (what [`install`] unwinds with)
//! - [`ErrorKind`]
//! - `Arc<dyn Error + Send + Sync>` and `Box<dyn Error + Send + Sync>`
//! - `String` and `&'static str` panic messages, which become [`PanicError`]s

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use crate::config::ReportOptions;
use crate::error_value::{ErrorKind, ErrorValue, PanicError, SharedError};
use crate::StateId;

/// Type-erased panic payload.
pub type Payload = Box<dyn Any + Send + 'static>;

/// Outcome of a failed callee run through [`catch`].
pub enum Captured {
    /// The failure was recognized as an error.
    Error(ErrorValue),
    /// A panic payload that is not an error; handed back untouched.
    Unrecognized(Payload),
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Captured::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Captured::Unrecognized(_) => f.write_str("Unrecognized(..)"),
        }
    }
}

/// Admission check: is `candidate` something the registry can stage?
pub fn is_error(candidate: &(dyn Any + Send)) -> bool {
    candidate.is::<ErrorValue>()
        || candidate.is::<ErrorKind>()
        || candidate.is::<SharedError>()
        || candidate.is::<Box<dyn Error + Send + Sync>>()
        || candidate.is::<String>()
        || candidate.is::<&'static str>()
}

/// Converts a recognized candidate into an [`ErrorValue`].
///
/// Unrecognized candidates are returned unchanged in `Err`.
pub fn admit(candidate: Payload) -> Result<ErrorValue, Payload> {
    let candidate = match candidate.downcast::<ErrorValue>() {
        Ok(value) => return Ok(*value),
        Err(candidate) => candidate,
    };
    let candidate = match candidate.downcast::<ErrorKind>() {
        Ok(kind) => return Ok(ErrorValue::Kind(*kind)),
        Err(candidate) => candidate,
    };
    let candidate = match candidate.downcast::<SharedError>() {
        Ok(error) => return Ok(ErrorValue::from_arc(*error)),
        Err(candidate) => candidate,
    };
    let candidate = match candidate.downcast::<Box<dyn Error + Send + Sync>>() {
        Ok(error) => return Ok(ErrorValue::from_arc(SharedError::from(*error))),
        Err(candidate) => candidate,
    };
    let candidate = match candidate.downcast::<String>() {
        Ok(message) => return Ok(PanicError::new(*message).into()),
        Err(candidate) => candidate,
    };
    match candidate.downcast::<&'static str>() {
        Ok(message) => Ok(PanicError::new(*message).into()),
        Err(candidate) => Err(candidate),
    }
}

/// Hands `error` to the calling thread's unwinding machinery. Never returns.
///
/// A kind is instantiated first; instances travel unchanged.
pub fn install(error: ErrorValue) -> ! {
    let error = match error {
        ErrorValue::Kind(kind) => kind.instantiate(),
        instance => instance,
    };
    panic::resume_unwind(Box::new(error))
}

/// Writes a human-readable rendering of `error` to `sink`.
///
/// Nothing is unwound, so the caller's own state is unaffected.
pub fn report<W: Write + ?Sized>(
    error: &ErrorValue,
    state: StateId,
    options: &ReportOptions,
    sink: &mut W,
) -> io::Result<()> {
    let error = match error {
        ErrorValue::Kind(kind) => kind.instantiate(),
        instance => instance.clone(),
    };

    if options.show_state {
        write!(sink, "[state {state}] ")?;
    }
    writeln!(sink, "{error}")?;

    if options.show_sources {
        let mut source = error.error().and_then(|e| e.source());
        if source.is_some() {
            writeln!(sink, "\nCaused by:")?;
        }
        let mut depth = 0;
        while let Some(cause) = source {
            writeln!(sink, "    {depth}: {cause}")?;
            depth += 1;
            source = cause.source();
        }
    }

    sink.flush()
}

/// Runs `func`, converting its failure into data.
///
/// `Err` results are always captured. Panics are captured only when `capture_panics`
/// is set; otherwise they keep unwinding. The panic hook runs before the panic is
/// captured.
pub fn catch<T, E, F>(func: F, capture_panics: bool) -> Result<T, Captured>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<ErrorValue>,
{
    let outcome = if capture_panics {
        match panic::catch_unwind(AssertUnwindSafe(func)) {
            Ok(outcome) => outcome,
            Err(payload) => {
                return Err(match admit(payload) {
                    Ok(error) => Captured::Error(error),
                    Err(payload) => Captured::Unrecognized(payload),
                });
            }
        }
    } else {
        func()
    };

    outcome.map_err(|e| Captured::Error(e.into()))
}

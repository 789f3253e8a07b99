//! Error values staged in the registry.
//!
//! A staged error is either a bare error *kind* (a type marker with no payload) or a
//! concrete error *instance* carrying its message and `source()` chain. Both are cheap
//! to clone: instances are shared through an `Arc`, so a value handed out by `get`
//! stays valid even if another thread clears the slot in the meantime.

use std::any::type_name;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::StateId;

/// Shared, type-erased error instance.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

fn build<E: Error + Default + Send + Sync + 'static>() -> SharedError {
    Arc::new(E::default())
}

/// A type marker naming an error type without carrying an instance of it.
///
/// Raising a kind builds a fresh, default-constructed instance at that point.
///
/// # Examples
///
/// ```rust
/// use exc_registry::{ErrorKind, NothingStaged};
///
/// let kind = ErrorKind::of::<NothingStaged>();
/// assert!(kind.name().ends_with("NothingStaged"));
/// ```
#[derive(Clone, Copy)]
pub struct ErrorKind {
    name: &'static str,
    build: fn() -> SharedError,
}

impl ErrorKind {
    /// Marker for the error type `E`.
    pub fn of<E: Error + Default + Send + Sync + 'static>() -> Self {
        Self {
            name: type_name::<E>(),
            build: build::<E>,
        }
    }

    /// Fully qualified type name of the marked error type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds a fresh instance of the marked error type.
    pub fn instantiate(&self) -> ErrorValue {
        ErrorValue::Instance {
            type_name: self.name,
            error: (self.build)(),
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ErrorKind {}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorKind").field(&self.name).finish()
    }
}

/// An error parked in the registry.
#[derive(Clone)]
pub enum ErrorValue {
    /// A type marker; no payload until it is raised.
    Kind(ErrorKind),
    /// A concrete error with payload and context.
    Instance {
        /// Type name recorded when the error was converted.
        type_name: &'static str,
        /// The error itself, shared with every reader.
        error: SharedError,
    },
}

impl ErrorValue {
    /// Wraps an already shared error without re-allocating it.
    ///
    /// The recorded type name is the erased one; prefer `From` when the concrete type
    /// is at hand.
    pub fn from_arc(error: SharedError) -> Self {
        ErrorValue::Instance {
            type_name: type_name::<SharedError>(),
            error,
        }
    }

    /// `true` for a bare type marker.
    pub fn is_kind(&self) -> bool {
        matches!(self, ErrorValue::Kind(_))
    }

    /// Type name of the staged error (the marker name for kinds).
    pub fn type_name(&self) -> &'static str {
        match self {
            ErrorValue::Kind(kind) => kind.name(),
            ErrorValue::Instance { type_name, .. } => type_name,
        }
    }

    /// The error instance, if this value carries one.
    pub fn error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            ErrorValue::Kind(_) => None,
            ErrorValue::Instance { error, .. } => Some(error.as_ref()),
        }
    }

    /// Downcasts the carried instance to a concrete error type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error().and_then(|e| e.downcast_ref::<E>())
    }

    /// Identity comparison: both values refer to the same staged error.
    ///
    /// Kinds compare by the type they mark.
    pub fn ptr_eq(&self, other: &ErrorValue) -> bool {
        match (self, other) {
            (ErrorValue::Kind(a), ErrorValue::Kind(b)) => a == b,
            (ErrorValue::Instance { error: a, .. }, ErrorValue::Instance { error: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl<E: Error + Send + Sync + 'static> From<E> for ErrorValue {
    fn from(error: E) -> Self {
        ErrorValue::Instance {
            type_name: type_name::<E>(),
            error: Arc::new(error),
        }
    }
}

impl From<ErrorKind> for ErrorValue {
    fn from(kind: ErrorKind) -> Self {
        ErrorValue::Kind(kind)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorValue::Kind(kind) => f.write_str(kind.name()),
            ErrorValue::Instance { type_name, error } => write!(f, "{type_name}: {error}"),
        }
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorValue::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            ErrorValue::Instance { type_name, error } => f
                .debug_struct("Instance")
                .field("type_name", type_name)
                .field("error", error)
                .finish(),
        }
    }
}

/// Raised by `raise` when nothing is staged at the requested state.
#[derive(Debug, Default, Clone, PartialEq, Eq, Error)]
#[error("no error staged at state {state}")]
pub struct NothingStaged {
    /// The empty state that was raised.
    pub state: StateId,
}

/// A captured panic whose payload was a message.
#[derive(Debug, Default, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PanicError {
    /// The panic message.
    pub message: String,
}

impl PanicError {
    /// Creates an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

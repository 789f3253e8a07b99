//! # Exception Registry
//!
//! A thread-safe registry for staging errors that cannot be propagated right away,
//! for example across a callback boundary, so a supervisor can retrieve, raise or
//! report them later.
//!
//! Every *state* (an `i32` slot id, `0` by convention) holds at most one staged error.
//!
//! ## Quick Start
//!
//! ```rust
//! use exc_registry::{get, occurred, set, PanicError, DEFAULT_STATE};
//!
//! // Park an error
//! set(PanicError::new("device offline"), DEFAULT_STATE, false).unwrap();
//!
//! // Inspect it later
//! assert!(occurred(DEFAULT_STATE));
//! let staged = get(DEFAULT_STATE).unwrap();
//! assert_eq!(staged.downcast_ref::<PanicError>().unwrap().message, "device offline");
//! # exc_registry::clear_all();
//! ```
//!
//! ## Features
//!
//! - **Thread-safe**: one lock guards the slots and the callback; it is never held
//!   while user code runs
//! - **Shared ownership**: staged errors are `Arc`-backed, so values handed out by
//!   [`get`] outlive a concurrent [`clear`]
//! - **Notification**: an optional callback fires after every successful store
//! - **Call wrappers**: [`call`] and [`rcall`] turn a callee's `Err` or panic into data
//!
//! ## Main Functions
//!
//! - [`set`] / [`set_any`] - Stage an error, optionally refusing to overwrite
//! - [`get`] / [`occurred`] - Inspect a state
//! - [`clear`] / [`clear_all`] - Drop staged errors
//! - [`raise`] - Resume unwinding with a staged error
//! - [`print`] - Report a staged error to stderr
//! - [`set_callback`] - Get notified of every store
//! - [`call`] / [`rcall`] - Capture a callee's failure
//!
//! Isolated registries are created with [`define_registry!`] or by owning an
//! [`ExceptionRegistry`] directly.

#[macro_use]
mod macros;

pub mod bridge;
mod config;
mod error_value;
mod registry;
mod registry_error;

/// Identifier of a staging slot.
pub type StateId = i32;

/// The state used when a caller has no reason to pick another.
pub const DEFAULT_STATE: StateId = 0;

pub use bridge::{Captured, Payload};
pub use config::{RegistryConfig, ReportOptions};
pub use error_value::{ErrorKind, ErrorValue, NothingStaged, PanicError, SharedError};
pub use registry::{Callback, ExceptionRecord, ExceptionRegistry};
pub use registry_error::{CallbackError, RegistryError};

define_registry!(global);

// Re-export the process-wide registry API
pub use global::{
    call, clear, clear_all, clear_callback, get, last_state, max_state, occurred, print,
    print_to, raise, rcall, records, registry, replace_callback, set, set_any, set_callback,
    size, states,
};

/// Crate version as `(major, minor, patch)`.
pub fn version() -> (u32, u32, u32) {
    (1, 1, 0)
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------

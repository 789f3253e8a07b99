//! A thread-safe registry of staged errors, keyed by state.
//!
//! Each state holds at most one [`ErrorValue`]. Errors are parked with [`set`], inspected
//! with [`get`] and [`occurred`], and later handed back to the unwinding machinery with
//! [`raise`] or written out with [`print`]. An optional callback is notified after every
//! successful store.
//!
//! # Examples
//!
//! ```
//! use exc_registry::{ExceptionRegistry, PanicError};
//!
//! let registry = ExceptionRegistry::new();
//! assert!(registry.set(PanicError::new("lost connection"), 1, false).unwrap());
//! assert!(registry.occurred(1));
//!
//! // A blocking set refuses to overwrite.
//! assert!(!registry.set(PanicError::new("second"), 1, true).unwrap());
//! assert!(registry.get(1).unwrap().to_string().ends_with("lost connection"));
//! ```
//!
//! [`set`]: ExceptionRegistry::set
//! [`get`]: ExceptionRegistry::get
//! [`occurred`]: ExceptionRegistry::occurred
//! [`raise`]: ExceptionRegistry::raise
//! [`print`]: ExceptionRegistry::print

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::bridge::{self, Captured, Payload};
use crate::config::RegistryConfig;
use crate::error_value::{ErrorValue, NothingStaged};
use crate::registry_error::{CallbackError, RegistryError};
use crate::StateId;

/// Notification hook invoked after every successful store.
///
/// Receives the state and the stored error. Returning `Err` is reported to the caller
/// of `set` as [`RegistryError::Callback`]; the stored error stays in place.
pub type Callback =
    dyn Fn(StateId, &ErrorValue) -> Result<(), CallbackError> + Send + Sync + 'static;

/// Snapshot of one occupied state.
#[derive(Debug, Clone)]
pub struct ExceptionRecord {
    pub state_id: StateId,
    pub error: ErrorValue,
}

#[derive(Default)]
struct Slots {
    exceptions: HashMap<StateId, ErrorValue>,
    last_state: Option<StateId>,
    callback: Option<Arc<Callback>>,
}

/// Keyed storage of staged errors plus a notification callback.
///
/// All state lives behind a single mutex that is held only for container access.
/// Callbacks, raising and reporting always run after the lock is released, so a
/// callback may freely call back into the same registry.
pub struct ExceptionRegistry {
    slots: Mutex<Slots>,
    config: RegistryConfig,
}

impl Default for ExceptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExceptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.lock();
        f.debug_struct("ExceptionRegistry")
            .field("name", &self.config.name)
            .field("states", &slots.exceptions.len())
            .field("last_state", &slots.last_state)
            .field("callback", &slots.callback.is_some())
            .finish()
    }
}

impl ExceptionRegistry {
    /// Creates an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            config,
        }
    }

    /// The configuration this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // A panic can never happen while the lock is held (callbacks and unwinding run
    // outside it), so a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------------------------------

    /// `true` if an error is staged at `state`.
    pub fn occurred(&self, state: StateId) -> bool {
        let found = self.lock().exceptions.contains_key(&state);
        trace!(registry = self.config.name, state, found, "occurred");
        found
    }

    /// The error staged at `state`, without removing it.
    ///
    /// The returned value shares the staged error; the registry keeps its own handle
    /// until the state is cleared.
    pub fn get(&self, state: StateId) -> Option<ErrorValue> {
        let error = self.lock().exceptions.get(&state).cloned();
        trace!(registry = self.config.name, state, found = error.is_some(), "get");
        error
    }

    /// Number of occupied states.
    pub fn size(&self) -> usize {
        self.lock().exceptions.len()
    }

    /// Largest occupied state, or `0` when no occupied state is positive.
    pub fn max_state(&self) -> StateId {
        self.lock().exceptions.keys().copied().fold(0, Ord::max)
    }

    /// Occupied states, in no particular order.
    pub fn states(&self) -> Vec<StateId> {
        self.lock().exceptions.keys().copied().collect()
    }

    /// The state most recently stored to, if any store has happened.
    pub fn last_state(&self) -> Option<StateId> {
        self.lock().last_state
    }

    /// Snapshot of every staged error, in no particular order.
    pub fn records(&self) -> Vec<ExceptionRecord> {
        self.lock()
            .exceptions
            .iter()
            .map(|(state_id, error)| ExceptionRecord {
                state_id: *state_id,
                error: error.clone(),
            })
            .collect()
    }

    // -------------------------------------------------------------------------------------------------
    // Staging
    // -------------------------------------------------------------------------------------------------

    /// Stages `error` at `state`.
    ///
    /// Returns `Ok(true)` once stored. With `block` set and `state` already occupied,
    /// nothing changes and `Ok(false)` is returned. Without `block` the previous error
    /// is released and replaced.
    ///
    /// After a store, the callback (if any) is invoked with `(state, &error)`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Callback`] if the callback returns `Err`. The error remains
    /// staged in that case.
    pub fn set(
        &self,
        error: impl Into<ErrorValue>,
        state: StateId,
        block: bool,
    ) -> Result<bool, RegistryError> {
        self.store(error.into(), state, block)
    }

    /// Stages a type-erased candidate, such as a panic payload.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ValidationFailed`] if the candidate is not recognized as an
    /// error; the registry is left untouched. Otherwise as [`set`](Self::set).
    pub fn set_any(
        &self,
        candidate: Payload,
        state: StateId,
        block: bool,
    ) -> Result<bool, RegistryError> {
        let error = bridge::admit(candidate).map_err(|_| {
            debug!(registry = self.config.name, state, "rejected non-error value");
            RegistryError::not_an_error()
        })?;
        self.store(error, state, block)
    }

    fn store(&self, error: ErrorValue, state: StateId, block: bool) -> Result<bool, RegistryError> {
        let stored = {
            let mut slots = self.lock();
            if block && slots.exceptions.contains_key(&state) {
                None
            } else {
                let previous = slots.exceptions.insert(state, error.clone());
                slots.last_state = Some(state);
                Some((previous, slots.callback.clone()))
            }
        };

        let Some((previous, callback)) = stored else {
            debug!(registry = self.config.name, state, "state occupied, store blocked");
            return Ok(false);
        };

        debug!(
            registry = self.config.name,
            state,
            error = %error,
            replaced = previous.is_some(),
            "error staged"
        );
        drop(previous);

        if let Some(callback) = callback {
            callback(state, &error).map_err(|source| {
                warn!(registry = self.config.name, state, %source, "callback failed");
                RegistryError::Callback { state, source }
            })?;
        }

        Ok(true)
    }

    /// Removes the error staged at `state`. Returns `false` if there was none.
    pub fn clear(&self, state: StateId) -> bool {
        let removed = self.lock().exceptions.remove(&state);
        debug!(registry = self.config.name, state, found = removed.is_some(), "clear");
        removed.is_some()
    }

    /// Removes every staged error. Returns `false` if the registry was already empty.
    pub fn clear_all(&self) -> bool {
        let drained: Vec<ErrorValue> = {
            let mut slots = self.lock();
            slots.exceptions.drain().map(|(_, error)| error).collect()
        };
        debug!(registry = self.config.name, count = drained.len(), "clear all");
        !drained.is_empty()
    }

    // -------------------------------------------------------------------------------------------------
    // Handing errors back
    // -------------------------------------------------------------------------------------------------

    /// Resumes unwinding with the error staged at `state`. Never returns.
    ///
    /// With `clear` set, the state is emptied first. When nothing is staged, a
    /// [`NothingStaged`] error is raised instead. The unwind payload is an
    /// [`ErrorValue`].
    pub fn raise(&self, state: StateId, clear: bool) -> ! {
        match self.take(state, clear) {
            Some(error) => {
                debug!(registry = self.config.name, state, clear, error = %error, "raising staged error");
                bridge::install(error)
            }
            None => {
                debug!(registry = self.config.name, state, "raising on empty state");
                bridge::install(NothingStaged { state }.into())
            }
        }
    }

    /// Writes the error staged at `state` to stderr.
    ///
    /// Returns `false`, without side effects, when nothing is staged. With `clear` set,
    /// a printed error is removed.
    pub fn print(&self, state: StateId, clear: bool) -> bool {
        let Some(error) = self.take(state, clear) else {
            return false;
        };

        // stderr is locked only after the registry lock is released; a subscriber
        // writing to stderr may log while holding it.
        let written = self.report(&error, state, clear, &mut io::stderr().lock());
        if let Err(e) = written {
            warn!(registry = self.config.name, state, error = %e, "failed to write error report");
        }
        true
    }

    /// Like [`print`](Self::print), writing to `sink`.
    ///
    /// The error is taken out of the registry (when `clear` is set) before the sink
    /// is written, so a failing sink still consumes it.
    pub fn print_to<W: Write + ?Sized>(
        &self,
        state: StateId,
        clear: bool,
        sink: &mut W,
    ) -> io::Result<bool> {
        let Some(error) = self.take(state, clear) else {
            return Ok(false);
        };

        self.report(&error, state, clear, sink)?;
        Ok(true)
    }

    fn report<W: Write + ?Sized>(
        &self,
        error: &ErrorValue,
        state: StateId,
        clear: bool,
        sink: &mut W,
    ) -> io::Result<()> {
        debug!(registry = self.config.name, state, clear, "printing staged error");
        bridge::report(error, state, &self.config.report, sink)
    }

    // Fetches the error at `state`, removing it when `clear` is set.
    fn take(&self, state: StateId, clear: bool) -> Option<ErrorValue> {
        let mut slots = self.lock();
        if clear {
            slots.exceptions.remove(&state)
        } else {
            slots.exceptions.get(&state).cloned()
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Callback
    // -------------------------------------------------------------------------------------------------

    /// Sets the callback notified after every successful store, replacing any previous one.
    ///
    /// A callback already running on another thread keeps its own handle and finishes
    /// normally.
    pub fn set_callback(
        &self,
        callback: impl Fn(StateId, &ErrorValue) -> Result<(), CallbackError> + Send + Sync + 'static,
    ) {
        self.replace_callback(Some(Arc::new(callback)));
    }

    /// Removes the callback. Already staged errors are unaffected.
    pub fn clear_callback(&self) {
        self.replace_callback(None);
    }

    /// Swaps the callback slot, returning the previous callback.
    pub fn replace_callback(&self, callback: Option<Arc<Callback>>) -> Option<Arc<Callback>> {
        let installed = callback.is_some();
        let previous = std::mem::replace(&mut self.lock().callback, callback);
        debug!(registry = self.config.name, installed, "callback replaced");
        previous
    }

    // -------------------------------------------------------------------------------------------------
    // Call wrappers
    // -------------------------------------------------------------------------------------------------

    /// Runs `func`, staging its failure at `state` instead of propagating it.
    ///
    /// Returns `Ok(Some(value))` on success with the registry untouched. On failure
    /// (an `Err` result, or a panic when panics are captured) the error overwrites
    /// whatever was staged at `state` and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ValidationFailed`] if `func` panicked with a payload that is
    ///   not an error
    /// - [`RegistryError::Callback`] if the notification callback failed
    ///
    /// # Panics
    ///
    /// A captured panic still runs the process panic hook, which by default prints a
    /// `thread '..' panicked at` line to stderr. Install a quiet hook with
    /// [`std::panic::set_hook`] for silent capture.
    pub fn call<T, E, F>(&self, func: F, state: StateId) -> Result<Option<T>, RegistryError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<ErrorValue>,
    {
        match bridge::catch(func, self.config.capture_panics) {
            Ok(value) => Ok(Some(value)),
            Err(Captured::Error(error)) => {
                self.store(error, state, false)?;
                Ok(None)
            }
            Err(Captured::Unrecognized(_)) => {
                debug!(registry = self.config.name, state, "captured panic payload is not an error");
                Err(RegistryError::not_an_error())
            }
        }
    }

    /// Runs `func`, returning its failure as a value. The registry is never touched.
    ///
    /// A panic whose payload is not recognized as an error keeps unwinding. As with
    /// [`call`](Self::call), captured panics still run the panic hook.
    pub fn rcall<T, E, F>(&self, func: F) -> Result<T, ErrorValue>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<ErrorValue>,
    {
        match bridge::catch(func, self.config.capture_panics) {
            Ok(value) => Ok(value),
            Err(Captured::Error(error)) => Err(error),
            Err(Captured::Unrecognized(payload)) => std::panic::resume_unwind(payload),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------

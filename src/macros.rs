//! Macros for creating module-scoped exception registries.

/// Creates an isolated, lazily initialized exception registry with a single macro
/// invocation.
///
/// The macro generates a module containing:
/// - The registry static (hidden), named after the module in its log events
/// - Free functions mirroring every [`ExceptionRegistry`](crate::ExceptionRegistry)
///   operation
/// - A `registry()` accessor for the underlying instance
///
/// # Examples
///
/// ```rust
/// use exc_registry::{define_registry, PanicError};
///
/// define_registry!(workers);
///
/// workers::set(PanicError::new("job 7 failed"), 7, false).unwrap();
/// assert!(workers::occurred(7));
/// assert_eq!(workers::states(), vec![7]);
/// ```
///
/// # Multiple Registries
///
/// Each invocation is fully isolated:
///
/// ```rust
/// use exc_registry::{define_registry, PanicError};
///
/// define_registry!(ingest);
/// define_registry!(export);
///
/// ingest::set(PanicError::new("bad record"), 0, false).unwrap();
///
/// assert!(ingest::occurred(0));
/// assert!(!export::occurred(0));
/// ```
#[macro_export]
macro_rules! define_registry {
    ($name:ident) => {
        pub mod $name {
            use std::io;
            use std::sync::{Arc, LazyLock};

            use $crate::{
                Callback, CallbackError, ErrorValue, ExceptionRecord, ExceptionRegistry, Payload,
                RegistryConfig, RegistryError, StateId,
            };

            // Registry instance (module-private)
            static REGISTRY: LazyLock<ExceptionRegistry> = LazyLock::new(|| {
                ExceptionRegistry::with_config(
                    RegistryConfig::default().with_name(stringify!($name)),
                )
            });

            /// The registry behind this module's free functions.
            pub fn registry() -> &'static ExceptionRegistry {
                &REGISTRY
            }

            /// `true` if an error is staged at `state`.
            pub fn occurred(state: StateId) -> bool {
                REGISTRY.occurred(state)
            }

            /// The error staged at `state`, without removing it.
            pub fn get(state: StateId) -> Option<ErrorValue> {
                REGISTRY.get(state)
            }

            /// Stages `error` at `state`; see [`ExceptionRegistry::set`].
            pub fn set(
                error: impl Into<ErrorValue>,
                state: StateId,
                block: bool,
            ) -> Result<bool, RegistryError> {
                REGISTRY.set(error, state, block)
            }

            /// Stages a type-erased candidate; see [`ExceptionRegistry::set_any`].
            pub fn set_any(
                candidate: Payload,
                state: StateId,
                block: bool,
            ) -> Result<bool, RegistryError> {
                REGISTRY.set_any(candidate, state, block)
            }

            /// Removes the error staged at `state`.
            pub fn clear(state: StateId) -> bool {
                REGISTRY.clear(state)
            }

            /// Removes every staged error.
            pub fn clear_all() -> bool {
                REGISTRY.clear_all()
            }

            /// Resumes unwinding with the error staged at `state`.
            pub fn raise(state: StateId, clear: bool) -> ! {
                REGISTRY.raise(state, clear)
            }

            /// Writes the error staged at `state` to stderr.
            pub fn print(state: StateId, clear: bool) -> bool {
                REGISTRY.print(state, clear)
            }

            /// Writes the error staged at `state` to `sink`.
            pub fn print_to<W: io::Write + ?Sized>(
                state: StateId,
                clear: bool,
                sink: &mut W,
            ) -> io::Result<bool> {
                REGISTRY.print_to(state, clear, sink)
            }

            /// Sets the store notification callback.
            pub fn set_callback(
                callback: impl Fn(StateId, &ErrorValue) -> Result<(), CallbackError>
                    + Send
                    + Sync
                    + 'static,
            ) {
                REGISTRY.set_callback(callback)
            }

            /// Removes the store notification callback.
            pub fn clear_callback() {
                REGISTRY.clear_callback()
            }

            /// Swaps the callback slot, returning the previous callback.
            pub fn replace_callback(callback: Option<Arc<Callback>>) -> Option<Arc<Callback>> {
                REGISTRY.replace_callback(callback)
            }

            /// Runs `func`, staging its failure at `state`.
            pub fn call<T, E, F>(func: F, state: StateId) -> Result<Option<T>, RegistryError>
            where
                F: FnOnce() -> Result<T, E>,
                E: Into<ErrorValue>,
            {
                REGISTRY.call(func, state)
            }

            /// Runs `func`, returning its failure as a value.
            pub fn rcall<T, E, F>(func: F) -> Result<T, ErrorValue>
            where
                F: FnOnce() -> Result<T, E>,
                E: Into<ErrorValue>,
            {
                REGISTRY.rcall(func)
            }

            /// Number of occupied states.
            pub fn size() -> usize {
                REGISTRY.size()
            }

            /// Largest occupied state, `0` when empty.
            pub fn max_state() -> StateId {
                REGISTRY.max_state()
            }

            /// Occupied states, unordered.
            pub fn states() -> Vec<StateId> {
                REGISTRY.states()
            }

            /// The state most recently stored to.
            pub fn last_state() -> Option<StateId> {
                REGISTRY.last_state()
            }

            /// Snapshot of every staged error.
            pub fn records() -> Vec<ExceptionRecord> {
                REGISTRY.records()
            }
        }
    };
}

//! End-to-end scenarios against the process-wide registry.
//!
//! NOTE: All tests use #[serial] because they share the crate-level registry.
//! Running them in parallel would cause interference and non-deterministic failures.

use exc_registry::{
    call, clear, clear_all, clear_callback, get, max_state, occurred, print_to, raise, rcall,
    set, set_any, set_callback, size, states, ErrorKind, ErrorValue, NothingStaged, PanicError,
    RegistryError, DEFAULT_STATE,
};
use serial_test::serial;
use std::convert::Infallible;
use std::hint::black_box;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct ValueError(&'static str);

#[derive(Debug, Default, thiserror::Error)]
#[error("type error")]
struct TypeError;

fn catch_raise(state: i32, clear: bool) -> ErrorValue {
    let payload = panic::catch_unwind(AssertUnwindSafe(|| raise(state, clear))).unwrap_err();
    *payload.downcast::<ErrorValue>().unwrap()
}

#[test]
#[serial]
fn test_stage_block_raise_sequence() {
    clear_all();

    // set(ValueError("x"), state=1) -> true
    let value_error = ErrorValue::from(ValueError("x"));
    assert!(set(value_error.clone(), 1, false).unwrap());
    assert!(occurred(1));
    assert!(get(1).unwrap().ptr_eq(&value_error));

    // set(TypeError, state=1, block=true) -> false
    assert!(!set(ErrorKind::of::<TypeError>(), 1, true).unwrap());
    assert!(get(1).unwrap().ptr_eq(&value_error));

    // raise(state=1) re-raises and clears
    let raised = catch_raise(1, true);
    assert!(raised.ptr_eq(&value_error));
    assert!(!occurred(1));
}

#[test]
#[serial]
fn test_call_stages_division_by_zero() {
    clear_all();

    let divisor = black_box(0);
    let result = call(|| Ok::<_, Infallible>(1 / divisor), 2).unwrap();

    assert_eq!(result, None);
    assert!(occurred(2));
    let staged = get(2).unwrap();
    assert!(staged
        .downcast_ref::<PanicError>()
        .unwrap()
        .message
        .contains("divide by zero"));

    clear_all();
}

#[test]
#[serial]
fn test_rcall_returns_division_by_zero() {
    clear_all();

    let divisor = black_box(0);
    let error = rcall(|| Ok::<_, Infallible>(1 / divisor)).unwrap_err();

    assert!(error
        .downcast_ref::<PanicError>()
        .unwrap()
        .message
        .contains("divide by zero"));
    assert!(!occurred(DEFAULT_STATE));
    assert_eq!(size(), 0);
}

#[test]
#[serial]
fn test_raise_empty_state() {
    clear_all();

    let raised = catch_raise(DEFAULT_STATE, true);
    assert_eq!(
        raised.downcast_ref::<NothingStaged>(),
        Some(&NothingStaged {
            state: DEFAULT_STATE
        })
    );
}

#[test]
#[serial]
fn test_set_any_validation() {
    clear_all();

    let err = set_any(Box::new(vec![1, 2, 3]), 0, false).unwrap_err();
    assert!(matches!(err, RegistryError::ValidationFailed { .. }));
    assert_eq!(size(), 0);

    assert!(set_any(Box::new(String::from("worker lost")), 0, false).unwrap());
    assert!(occurred(0));

    clear_all();
}

#[test]
#[serial]
fn test_introspection_and_clear() {
    clear_all();

    set(ValueError("a"), 10, false).unwrap();
    set(ValueError("b"), 20, false).unwrap();
    set(ValueError("c"), 15, false).unwrap();

    assert_eq!(size(), 3);
    assert_eq!(max_state(), 20);
    let mut staged = states();
    staged.sort_unstable();
    assert_eq!(staged, vec![10, 15, 20]);

    assert!(clear(20));
    assert!(!clear(20));
    assert_eq!(max_state(), 15);

    assert!(clear_all());
    assert!(!clear_all());
    assert_eq!(max_state(), 0);
}

#[test]
#[serial]
fn test_print_to_consumes_by_default() {
    clear_all();

    set(ValueError("printed"), 7, false).unwrap();
    let mut out = Vec::new();
    assert!(print_to(7, true, &mut out).unwrap());
    assert!(!occurred(7));
    assert!(!print_to(7, true, &mut out).unwrap());

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("[state 7] "));
    assert!(text.trim_end().ends_with("printed"));
}

#[test]
#[serial]
fn test_callback_on_call_capture() {
    clear_all();

    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    set_callback(move |state, _| {
        seen_clone.lock().unwrap().push(state);
        Ok(())
    });

    call(|| Err::<(), _>(ValueError("captured")), 3).unwrap();
    call(|| Ok::<_, Infallible>(()), 4).unwrap();
    clear_callback();

    assert_eq!(*seen.lock().unwrap(), vec![3]);
    clear_all();
}

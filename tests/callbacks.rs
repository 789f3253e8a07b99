//! Integration tests for the store notification callback.
//!
//! The callback fires once per successful store, after the error is in place, and
//! never while the registry lock is held.

use exc_registry::{define_registry, ErrorValue, PanicError, RegistryError, StateId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_callback_fires_once_per_store() {
    define_registry!(notified1);

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    notified1::set_callback(move |state, error| {
        events_clone.lock().unwrap().push(format!("{state}: {error}"));
        Ok(())
    });

    notified1::set(PanicError::new("first"), 1, false).unwrap();
    notified1::set(PanicError::new("second"), 1, false).unwrap();
    notified1::set(PanicError::new("blocked"), 1, true).unwrap();
    notified1::clear(1);

    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert!(captured[0].starts_with("1: "));
    assert!(captured[0].ends_with("first"));
    assert!(captured[1].ends_with("second"));
}

#[test]
fn test_callback_sees_stored_error() {
    define_registry!(notified2);

    let observed = Arc::new(AtomicUsize::new(0));
    let observed_clone = observed.clone();
    notified2::set_callback(move |state, error| {
        let staged = notified2::get(state).expect("stored before notification");
        assert!(staged.ptr_eq(error));
        observed_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    notified2::set(PanicError::new("visible"), 4, false).unwrap();
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_failure_does_not_roll_back() {
    define_registry!(notified3);

    notified3::set_callback(|state, _| Err(format!("cannot forward state {state}").into()));

    let err = notified3::set(PanicError::new("kept"), 5, false).unwrap_err();
    assert!(matches!(err, RegistryError::Callback { state: 5, .. }));
    assert_eq!(err.to_string(), "callback failed for state 5: cannot forward state 5");
    assert!(notified3::occurred(5));
    assert_eq!(notified3::last_state(), Some(5));
}

#[test]
fn test_callback_panic_propagates_and_keeps_record() {
    define_registry!(notified4);

    notified4::set_callback(|_, _| panic!("callback exploded"));

    let outcome = std::panic::catch_unwind(|| notified4::set(PanicError::new("kept"), 0, false));
    assert!(outcome.is_err());

    // The lock was not held while the callback ran.
    assert!(notified4::occurred(0));
    notified4::clear_callback();
    assert!(notified4::set(PanicError::new("next"), 1, false).unwrap());
}

#[test]
fn test_clear_callback_keeps_staged_errors() {
    define_registry!(notified5);

    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    notified5::set_callback(move |_, _| {
        count_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    notified5::set(PanicError::new("a"), 1, false).unwrap();
    notified5::clear_callback();
    notified5::set(PanicError::new("b"), 2, false).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(notified5::occurred(1));
    assert!(notified5::occurred(2));
}

#[test]
fn test_callback_replacement() {
    define_registry!(notified6);

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let first_clone = first.clone();
    let second_clone = second.clone();

    notified6::set_callback(move |_, _| {
        first_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    notified6::set(PanicError::new("a"), 0, false).unwrap();

    notified6::set_callback(move |_, _| {
        second_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    notified6::set(PanicError::new("b"), 0, false).unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_can_stage_into_other_registry() {
    define_registry!(primary);
    define_registry!(escalated);

    primary::set_callback(|state, error: &ErrorValue| {
        escalated::set(error.clone(), state, true)?;
        Ok(())
    });

    primary::set(PanicError::new("disk full"), 2, false).unwrap();

    let forwarded = escalated::get(2).unwrap();
    assert!(forwarded.ptr_eq(&primary::get(2).unwrap()));
}

#[test]
fn test_replacing_callback_during_invocation() {
    define_registry!(notified7);

    let entered = Arc::new(Barrier::new(2));
    let finished = Arc::new(AtomicUsize::new(0));
    let entered_clone = entered.clone();
    let finished_clone = finished.clone();

    notified7::set_callback(move |_state: StateId, _| {
        entered_clone.wait();
        thread::sleep(Duration::from_millis(20));
        finished_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let worker = thread::spawn(|| notified7::set(PanicError::new("slow"), 0, false));

    entered.wait();
    // Other operations are not stalled by the running callback.
    notified7::clear_callback();
    assert!(notified7::occurred(0));

    assert!(worker.join().unwrap().unwrap());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

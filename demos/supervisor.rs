//! Supervisor example for exc-registry.
//!
//! Demonstrates:
//! - Worker threads staging failures with `call()` instead of unwinding
//! - A notification callback forwarding every staged error
//! - A supervisor inspecting, printing and re-raising staged errors
//!
//! Run with: `RUST_LOG=exc_registry=debug cargo run --example supervisor`

use exc_registry::{define_registry, ErrorValue, PanicError};
use std::convert::Infallible;
use std::sync::mpsc;
use std::thread;
use tracing_subscriber::EnvFilter;

// Create an isolated registry for this example
define_registry!(jobs);

#[derive(Debug, thiserror::Error)]
#[error("job {0} rejected its input")]
struct Rejected(i32);

fn run_job(id: i32) -> Result<i32, Rejected> {
    match id {
        2 => Err(Rejected(id)),
        3 => {
            let divisor = std::hint::black_box(id - 3);
            Ok(100 / divisor)
        }
        _ => Ok(id * 10),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== exc-registry: Supervisor ===\n");

    // -------------------------------------------------------------------------
    // 1. Forward every staged error to the supervisor
    // -------------------------------------------------------------------------
    let (tx, rx) = mpsc::channel::<(i32, ErrorValue)>();
    let tx = std::sync::Mutex::new(tx);
    jobs::set_callback(move |state, error| {
        tx.lock()
            .map_err(|_| "notification channel poisoned")?
            .send((state, error.clone()))?;
        Ok(())
    });

    // -------------------------------------------------------------------------
    // 2. Workers stage failures at their own state
    // -------------------------------------------------------------------------
    println!("1. Running jobs...");
    let workers: Vec<_> = (1..=4)
        .map(|id| {
            thread::spawn(move || match jobs::call(|| run_job(id), id) {
                Ok(Some(value)) => println!("   job {id} -> {value}"),
                Ok(None) => println!("   job {id} failed, error staged"),
                Err(e) => println!("   job {id} could not stage its error: {e}"),
            })
        })
        .collect();
    for worker in workers {
        let _ = worker.join();
    }
    jobs::clear_callback();

    // -------------------------------------------------------------------------
    // 3. Notifications received
    // -------------------------------------------------------------------------
    println!("\n2. Notifications:");
    for (state, error) in rx.try_iter() {
        println!("   state {state}: {error}");
    }

    // -------------------------------------------------------------------------
    // 4. Inspect and report
    // -------------------------------------------------------------------------
    let mut states = jobs::states();
    states.sort_unstable();
    println!("\n3. Staged states: {states:?} (max {})", jobs::max_state());

    println!("\n4. Printing state 2 to stderr...");
    jobs::print(2, true);

    // -------------------------------------------------------------------------
    // 5. Re-raise and catch as data
    // -------------------------------------------------------------------------
    println!("\n5. Re-raising state 3...");
    match jobs::rcall(|| -> Result<(), Infallible> { jobs::raise(3, true) }) {
        Ok(()) => unreachable!("raise never returns"),
        Err(error) => match error.downcast_ref::<PanicError>() {
            Some(panic) => println!("   caught panic: {}", panic.message),
            None => println!("   caught: {error}"),
        },
    }

    println!("\n=== Example Complete ===");
    println!("Remaining staged errors: {}", jobs::size());
}

//! Readiness gate retry budget on virtual time.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use edge_executor::LocalExecutor;
use futures_lite::future::block_on;

use fluidctl::app::ports::ProbeOutcome;
use fluidctl::app::shutdown::Shutdown;
use fluidctl::error::ReadinessError;
use fluidctl::readiness::{MAX_RETRY, ReadinessGate, ReadinessSignal};

use crate::mock_hw::*;

fn run_gate(
    registry: &ScriptedRegistry,
    companion: &ScriptedProbe,
    shutdown: &Shutdown,
) -> (Result<(), ReadinessError>, SimClock) {
    let clock = SimClock::new();
    let outcome = Cell::new(None);
    {
        let ex: LocalExecutor = LocalExecutor::new();
        ex.spawn(async {
            let gate = ReadinessGate::new(registry, companion, "device-gpiod");
            outcome.set(Some(gate.wait(&clock, shutdown).await));
        })
        .detach();
        drive_until(&ex, &clock, secs(120), || outcome.get().is_some());
    }
    (outcome.get().unwrap(), clock)
}

#[test]
fn waits_until_device_is_registered() {
    let registry = ScriptedRegistry::new([false, false], true);
    let companion = ScriptedProbe::new([], ScriptedProbe::ok());

    let (outcome, clock) = run_gate(&registry, &companion, &Shutdown::new());
    assert_eq!(outcome, Ok(()));
    assert_eq!(clock.now(), secs(10));
    assert_eq!(companion.calls.get(), 1);
}

#[test]
fn unreadable_companion_needs_status_200() {
    let registry = ScriptedRegistry::new([], true);
    let companion = ScriptedProbe::new(
        [ProbeOutcome::Responded {
            status: 503,
            body: None,
        }],
        ProbeOutcome::Responded {
            status: 200,
            body: None,
        },
    );

    let (outcome, clock) = run_gate(&registry, &companion, &Shutdown::new());
    assert_eq!(outcome, Ok(()));
    assert_eq!(clock.now(), secs(5));
}

#[test]
fn budget_exhaustion_is_reported_after_max_retry_attempts() {
    let registry = ScriptedRegistry::new([], true);
    let companion = ScriptedProbe::new([], ScriptedProbe::down());

    let (outcome, clock) = run_gate(&registry, &companion, &Shutdown::new());
    assert_eq!(
        outcome,
        Err(ReadinessError::Exhausted {
            attempts: MAX_RETRY
        })
    );
    assert_eq!(companion.calls.get(), MAX_RETRY);
    assert_eq!(clock.now(), secs(5 * u64::from(MAX_RETRY - 1)));
}

#[test]
fn shutdown_cancels_the_wait() {
    let registry = ScriptedRegistry::new([], false);
    let companion = ScriptedProbe::new([], ScriptedProbe::ok());
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let (outcome, _) = run_gate(&registry, &companion, &shutdown);
    assert_eq!(outcome, Err(ReadinessError::Cancelled));
}

#[test]
fn gate_thread_hands_its_outcome_to_the_executor() {
    let ready = Arc::new(ReadinessSignal::new());
    let gate = {
        let ready = Arc::clone(&ready);
        thread::spawn(move || {
            let registry = ScriptedRegistry::new([], true);
            let companion = ScriptedProbe::new([], ScriptedProbe::ok());
            let gate = ReadinessGate::new(&registry, &companion, "device-gpiod");
            block_on(gate.publish(&SimClock::new(), &Shutdown::new(), &ready));
        })
    };

    assert_eq!(block_on(ready.wait()), Ok(()));
    gate.join().unwrap();
}

#[test]
fn cancelled_gate_thread_still_publishes() {
    let ready = Arc::new(ReadinessSignal::new());
    let shutdown = Shutdown::new();
    shutdown.trigger();
    let gate = {
        let ready = Arc::clone(&ready);
        thread::spawn(move || {
            let registry = ScriptedRegistry::new([], false);
            let companion = ScriptedProbe::new([], ScriptedProbe::ok());
            let gate = ReadinessGate::new(&registry, &companion, "device-gpiod");
            block_on(gate.publish(&SimClock::new(), &shutdown, &ready));
        })
    };

    assert_eq!(block_on(ready.wait()), Err(ReadinessError::Cancelled));
    gate.join().unwrap();
}

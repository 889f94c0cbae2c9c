//! Application core — port traits, telemetry payloads and the shutdown token.
//!
//! All interaction with hardware, clocks and the network happens through
//! the **port traits** defined in [`ports`], keeping the sequencer, the
//! indicator controller and the watchdog testable without real peripherals.

pub mod ports;
pub mod shutdown;
pub mod telemetry;

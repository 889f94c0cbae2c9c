//! Fluid circuit controller library.
//!
//! Exposes the pure-logic modules (sequencer, indicators, watchdog,
//! readiness gate) and their adapters for integration testing. The binary
//! in `main.rs` only wires them together.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod indicators;
pub mod lines;
pub mod readiness;
pub mod sequencer;
pub mod watchdog;

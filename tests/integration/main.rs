//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters and a virtual clock. All tests run on the host
//! with no real hardware or network required.

mod indicator_tests;
mod readiness_tests;
mod watchdog_tests;

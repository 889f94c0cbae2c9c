//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Sequencer · Indicators · Watchdog (domain)
//! ```
//!
//! Driven adapters (GPIO lines, clocks, HTTP probes, telemetry sinks)
//! implement these traits. The domain consumes them via generics, so the
//! state machines never touch hardware or the network directly.

use core::time::Duration;

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::app::telemetry::Reading;
use crate::error::ActuationError;
use crate::lines::LineAssignment;

// ───────────────────────────────────────────────────────────────
// Line port (driven adapter: domain → GPIO controller)
// ───────────────────────────────────────────────────────────────

/// Opens digital lines on demand.
///
/// Lines are opened immediately before an actuation and closed (dropped)
/// immediately after, so no line is held across a sleep. The returned line
/// is already driven to `level`.
pub trait LinePort {
    /// A `DigitalLine`: `set(state)` is [`OutputPin::set_state`], `read()`
    /// is [`InputPin::is_high`].
    type Line: OutputPin + InputPin;

    fn open(&self, assignment: &LineAssignment, level: PinState)
    -> Result<Self::Line, ActuationError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain → timers)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source and cooperative sleep.
///
/// Tasks run on a single-threaded executor, so the returned futures need
/// not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Probe ports (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// Result of one HTTP-style probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered. `body` is `None` when it could not be read.
    Responded { status: u16, body: Option<String> },
    /// No answer at all (connection refused, DNS failure, ...).
    Unreachable(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Responded { .. })
    }
}

/// A single blocking reachability check. No timeout is imposed by the
/// caller; a slow probe delays whatever loop is driving it.
pub trait ReachabilityProbe {
    fn probe(&self) -> ProbeOutcome;
}

/// Looks devices up by name in the external device registry.
pub trait DeviceRegistry {
    fn contains(&self, device_name: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Telemetry sink (driven adapter: domain → host telemetry)
// ───────────────────────────────────────────────────────────────

/// Receives one [`Reading`] per line transition.
pub trait TelemetrySink {
    fn push(&mut self, reading: Reading);
}

//! Error types for the circuit sequencer.
//!
//! One `Copy` enum per subsystem, so errors pass through the sequencer,
//! the indicator controller and the watchdog without allocation. The
//! bootstrap wraps them in `anyhow` with context.

use core::fmt;

// ---------------------------------------------------------------------------
// Actuation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationError {
    /// The line could not be requested from its controller chip.
    OpenFailed,
    /// Driving the line high/low failed.
    WriteFailed,
    /// Reading the line back failed.
    ReadFailed,
    /// The line read back a level other than the one just driven.
    Verify,
}

impl fmt::Display for ActuationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "line request failed"),
            Self::WriteFailed => write!(f, "line write failed"),
            Self::ReadFailed => write!(f, "line read failed"),
            Self::Verify => write!(f, "line read back a different level"),
        }
    }
}

impl std::error::Error for ActuationError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Raised only where no default can stand in. Malformed environment
/// values never surface here; they fall back to their documented default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The line configuration document could not be read.
    Unreadable,
    /// The line configuration document is not valid YAML of the expected shape.
    Malformed,
    /// No configured line carries the pump trigger name.
    MissingPumpLine,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable => write!(f, "line configuration unreadable"),
            Self::Malformed => write!(f, "line configuration malformed"),
            Self::MissingPumpLine => write!(f, "no line assigned to the pump trigger"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Readiness errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessError {
    /// Every attempt in the retry budget failed.
    Exhausted { attempts: u32 },
    /// Shutdown was requested before the environment became ready.
    Cancelled,
}

impl fmt::Display for ReadinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts } => {
                write!(f, "environment not ready after {attempts} attempts")
            }
            Self::Cancelled => write!(f, "cancelled by shutdown"),
        }
    }
}

impl std::error::Error for ReadinessError {}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The reading could not be serialised to JSON.
    Serialization,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization => write!(f, "reading serialisation failed"),
        }
    }
}

impl std::error::Error for TelemetryError {}

// ---------------------------------------------------------------------------
// Alarm escalation errors
// ---------------------------------------------------------------------------

/// The red indicator could not be raised while handling another failure.
/// Logged only; never escalated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmEscalationError(pub ActuationError);

impl fmt::Display for AlarmEscalationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault indicator unavailable ({})", self.0)
    }
}

impl std::error::Error for AlarmEscalationError {}

//! Pre-cycle readiness gate.
//!
//! Before the first pump cycle the hosting environment must be up: the
//! device is known to the registry by name, and the companion measurement
//! endpoint answers. Both are re-checked every [`RETRY_INTERVAL`]; after
//! [`MAX_RETRY`] failed attempts the gate gives up and the caller exits.
//!
//! The checks are blocking network calls, so the gate runs on its own
//! thread and hands its outcome to the executor through a
//! [`ReadinessSignal`].

use core::fmt;
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

use crate::app::ports::{Clock, DeviceRegistry, ProbeOutcome, ReachabilityProbe};
use crate::app::shutdown::Shutdown;
use crate::error::ReadinessError;

pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_RETRY: u32 = 5;

/// Gate outcome, published once by [`ReadinessGate::publish`].
pub type ReadinessSignal = Signal<CriticalSectionRawMutex, Result<(), ReadinessError>>;

/// Why a single readiness attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReady {
    Unregistered,
    CompanionUnreachable(String),
    CompanionUnreadable { status: u16 },
}

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "device not registered"),
            Self::CompanionUnreachable(e) => write!(f, "companion device not available: {e}"),
            Self::CompanionUnreadable { status } => {
                write!(f, "companion response unreadable (status {status})")
            }
        }
    }
}

pub struct ReadinessGate<'a, R, Q> {
    registry: &'a R,
    companion: &'a Q,
    device_name: &'a str,
}

impl<'a, R: DeviceRegistry, Q: ReachabilityProbe> ReadinessGate<'a, R, Q> {
    pub fn new(registry: &'a R, companion: &'a Q, device_name: &'a str) -> Self {
        Self {
            registry,
            companion,
            device_name,
        }
    }

    /// One attempt. A readable response of any status is accepted; an
    /// unreadable one only with status 200.
    pub fn check(&self) -> Result<(), NotReady> {
        if !self.registry.contains(self.device_name) {
            return Err(NotReady::Unregistered);
        }
        match self.companion.probe() {
            ProbeOutcome::Responded {
                body: Some(body), ..
            } => {
                info!("Companion device response: {body}");
                Ok(())
            }
            ProbeOutcome::Responded { status, body: None } => {
                info!("Companion response status code: {status}");
                if status == 200 {
                    Ok(())
                } else {
                    Err(NotReady::CompanionUnreadable { status })
                }
            }
            ProbeOutcome::Unreachable(e) => Err(NotReady::CompanionUnreachable(e)),
        }
    }

    /// Block until ready. Every failed attempt counts against the budget.
    pub async fn wait<C: Clock>(&self, clock: &C, shutdown: &Shutdown) -> Result<(), ReadinessError> {
        let mut attempt = 0;
        loop {
            shutdown.check().map_err(|_| ReadinessError::Cancelled)?;
            match self.check() {
                Ok(()) => {
                    info!("Device '{}' ready, starting pipeline", self.device_name);
                    return Ok(());
                }
                Err(reason) => {
                    attempt += 1;
                    warn!("Attempt: {attempt}. Device '{}' not ready: {reason}", self.device_name);
                    if attempt >= MAX_RETRY {
                        return Err(ReadinessError::Exhausted { attempts: attempt });
                    }
                }
            }
            shutdown
                .sleep(clock, RETRY_INTERVAL)
                .await
                .map_err(|_| ReadinessError::Cancelled)?;
        }
    }

    /// [`wait`](Self::wait), then signal the outcome.
    pub async fn publish<C: Clock>(&self, clock: &C, shutdown: &Shutdown, signal: &ReadinessSignal) {
        signal.signal(self.wait(clock, shutdown).await);
    }
}

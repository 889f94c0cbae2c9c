//! Pump / reverse / clean actuation sequencer.
//!
//! One strictly linear pipeline per cycle:
//!
//! ```text
//!  IDLE ──▶ PUMP RUNNING ──[pump_duration]──▶ PUMP OFF
//!    ▲                                          │
//!    │                              [reverse enabled]
//!    │                                          ▼
//!    │                    REVERTING ──▶ REVERT COMPLETE
//!    │                                          │
//!    │                               [clean enabled]
//!    │                                          ▼
//!    │      SWITCHING CIRCUIT ──▶ OPENING INLET ──▶ CLEANING
//!    │                                                  │
//!    │      RESTORING CIRCUIT ◀── GRAVITY DRAIN ◀── CLOSING INLET
//!    │              │
//!    └──[command_gap]┘
//! ```
//!
//! The pump never gives up: a failed on/off actuation raises the red alarm
//! and is retried every [`PUMP_RETRY_INTERVAL`]. The reverse and clean
//! sub-pipelines are auxiliary and abort the rest of their steps on the
//! first failure.
//!
//! Every timed wait goes through [`Shutdown::sleep`], so the whole cycle
//! can be stopped at any suspension point.

mod pipelines;

use core::fmt;
use core::time::Duration;

use log::{error, info, warn};

use crate::app::ports::{Clock, LinePort, TelemetrySink};
use crate::app::shutdown::{Shutdown, Stopped};
use crate::app::telemetry::Reading;
use crate::config::SequencerConfig;
use crate::error::ActuationError;
use crate::indicators::{Color, IndicatorController};
use crate::lines::{CircuitLines, LineHandle};

/// Backoff between two attempts to switch the pump.
pub const PUMP_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Settle time after moving the switching valve.
pub const SWITCHING_SETTLE: Duration = Duration::from_secs(15);

/// Settle time after moving the inlet (open) valve.
pub const OPENING_SETTLE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequencerState {
    Idle,
    PumpRunning,
    PumpOff,
    Reverting,
    RevertComplete,
    SwitchingCircuit,
    OpeningInlet,
    Cleaning,
    ClosingInlet,
    GravityDrain,
    RestoringCircuit,
}

impl SequencerState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::PumpRunning => "PumpRunning",
            Self::PumpOff => "PumpOff",
            Self::Reverting => "Reverting",
            Self::RevertComplete => "RevertComplete",
            Self::SwitchingCircuit => "SwitchingCircuit",
            Self::OpeningInlet => "OpeningInlet",
            Self::Cleaning => "Cleaning",
            Self::ClosingInlet => "ClosingInlet",
            Self::GravityDrain => "GravityDrain",
            Self::RestoringCircuit => "RestoringCircuit",
        }
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Line roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Pump,
    Reverse,
    Clean,
    OpenValve,
    SwitchingValve,
}

/// Runtime handles for every circuit line, each owned by the sequencer.
struct CircuitHandles {
    pump: LineHandle,
    reverse: Option<LineHandle>,
    clean: Option<LineHandle>,
    open_valve: Option<LineHandle>,
    switching_valve: Option<LineHandle>,
}

impl CircuitHandles {
    fn new(lines: CircuitLines) -> Self {
        Self {
            pump: LineHandle::new(lines.pump),
            reverse: lines.reverse.map(LineHandle::new),
            clean: lines.clean.map(LineHandle::new),
            open_valve: lines.open_valve.map(LineHandle::new),
            switching_valve: lines.switching_valve.map(LineHandle::new),
        }
    }

    fn get_mut(&mut self, role: Role) -> Option<&mut LineHandle> {
        match role {
            Role::Pump => Some(&mut self.pump),
            Role::Reverse => self.reverse.as_mut(),
            Role::Clean => self.clean.as_mut(),
            Role::OpenValve => self.open_valve.as_mut(),
            Role::SwitchingValve => self.switching_valve.as_mut(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct ActuationSequencer<'a, P: LinePort, C: Clock, S: TelemetrySink> {
    port: &'a P,
    clock: &'a C,
    indicators: &'a IndicatorController<'a, P>,
    sink: S,
    config: SequencerConfig,
    handles: CircuitHandles,
    state: SequencerState,
    /// Clock reading at the last successful pump-on.
    started_at: Duration,
}

impl<'a, P: LinePort, C: Clock, S: TelemetrySink> ActuationSequencer<'a, P, C, S> {
    /// Sub-pipelines whose lines are not all assigned are disabled here.
    pub fn new(
        port: &'a P,
        clock: &'a C,
        indicators: &'a IndicatorController<'a, P>,
        sink: S,
        lines: CircuitLines,
        config: SequencerConfig,
    ) -> Self {
        let config = lines.effective(config.clamped());
        Self {
            port,
            clock,
            indicators,
            sink,
            config,
            handles: CircuitHandles::new(lines),
            state: SequencerState::Idle,
            started_at: Duration::ZERO,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// The effective configuration, as reported in telemetry.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Run cycles until shutdown.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Stopped {
        info!("Sequencer started");
        loop {
            if let Err(stopped) = self.run_cycle(shutdown).await {
                info!("Sequencer stopped in state {}", self.state);
                return stopped;
            }
        }
    }

    /// One full cycle: pump on, hold, pump off, optional sub-pipelines,
    /// then the command gap.
    pub async fn run_cycle(&mut self, shutdown: &Shutdown) -> Result<(), Stopped> {
        shutdown.check()?;
        self.pump_on(shutdown).await?;
        self.hold_pump(shutdown).await?;
        self.pump_off(shutdown).await?;

        if self.config.reverse_enabled {
            self.reverse_pass(shutdown).await?;
        }

        self.enter(SequencerState::Idle);
        info!(
            "Pump timeout. Sleeping for {} minutes...",
            self.config.command_gap.as_secs() / 60
        );
        shutdown.sleep(self.clock, self.config.command_gap).await
    }

    // ── Pump ──────────────────────────────────────────────────

    async fn pump_on(&mut self, shutdown: &Shutdown) -> Result<(), Stopped> {
        self.switch_pump(true, shutdown).await?;
        self.started_at = self.clock.now();
        if let Err(e) = self.indicators.set_solid(Color::Green).await {
            warn!("Pump running without green light: {e}");
        }
        self.report(Role::Pump);
        self.enter(SequencerState::PumpRunning);
        Ok(())
    }

    /// Sleep the remaining run time; off fires once `pump_duration` has
    /// fully elapsed since pump-on.
    async fn hold_pump(&mut self, shutdown: &Shutdown) -> Result<(), Stopped> {
        loop {
            let elapsed = self.clock.now().saturating_sub(self.started_at);
            let Some(remaining) = self.config.pump_duration.checked_sub(elapsed) else {
                return Ok(());
            };
            if remaining.is_zero() {
                return Ok(());
            }
            info!("Pump will run for {} s...", remaining.as_secs());
            shutdown.sleep(self.clock, remaining).await?;
        }
    }

    async fn pump_off(&mut self, shutdown: &Shutdown) -> Result<(), Stopped> {
        self.switch_pump(false, shutdown).await?;
        if let Err(e) = self.indicators.clear(Color::Green).await {
            warn!("Pump stopped but green light still on: {e}");
        }
        self.report(Role::Pump);
        self.enter(SequencerState::PumpOff);
        Ok(())
    }

    /// Retry without limit, raising the red alarm on every failure.
    async fn switch_pump(&mut self, high: bool, shutdown: &Shutdown) -> Result<(), Stopped> {
        loop {
            shutdown.check()?;
            let port = self.port;
            match self.handles.pump.actuate(port, high) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.indicators.raise_alarm().await;
                    error!(
                        "Cannot {} pump on line {}. Error: {e}",
                        if high { "activate" } else { "deactivate" },
                        self.handles.pump.assignment().line
                    );
                    shutdown.sleep(self.clock, PUMP_RETRY_INTERVAL).await?;
                }
            }
        }
    }

    // ── Shared helpers ────────────────────────────────────────

    /// Actuate one line and report the transition.
    fn actuate(&mut self, role: Role, high: bool) -> Result<(), ActuationError> {
        let port = self.port;
        let Some(handle) = self.handles.get_mut(role) else {
            warn!("No line assigned to {role:?}");
            return Err(ActuationError::OpenFailed);
        };
        handle.actuate(port, high)?;
        self.report(role);
        Ok(())
    }

    /// Push one telemetry reading for the current state of `role`.
    fn report(&mut self, role: Role) {
        let Some(handle) = self.handles.get_mut(role) else {
            return;
        };
        let reading = Reading::transition(handle, &self.config);
        info!("Pushing gpio reading for '{}'", handle.name());
        self.sink.push(reading);
    }

    fn enter(&mut self, next: SequencerState) {
        if next != self.state {
            info!("Sequencer transition: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

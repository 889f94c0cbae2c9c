//! Status light controller.
//!
//! Owns the green / yellow / red lights behind one lock, so the sequencer
//! and the connectivity watchdog never race on the solid/flashing flags.
//!
//! ## Semantics
//!
//! | Colour | Solid                 | Flashing                 |
//! |--------|-----------------------|--------------------------|
//! | Green  | pump running          | reverse pass in progress |
//! | Yellow | cleaning in progress  | —                        |
//! | Red    | actuation fault       | connectivity lost        |
//!
//! At most one colour is solid at a time: [`IndicatorController::set_solid`]
//! drives the other solid lights low and clears their flags, flashing
//! included. Flashing on several colours at once is permitted. A colour
//! that is both solid and flashing stays lit; the solid state wins.
//!
//! ## Escalation
//!
//! A failed actuation on green or yellow raises red as a best-effort alarm.
//! A failure of red itself is logged and goes no further.

use core::fmt;
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::ports::{Clock, LinePort};
use crate::app::shutdown::{Shutdown, Stopped};
use crate::error::{ActuationError, AlarmEscalationError};
use crate::lines::{self, IndicatorLines, LineAssignment};

/// Half-period of a flash: on for this long, then off for this long.
pub const BLINK_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Green,
    Yellow,
    Red,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Green, Color::Yellow, Color::Red];

    const fn index(self) -> usize {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

/// Logical flags of one light.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorStatus {
    pub solid_on: bool,
    pub flashing: bool,
}

struct Indicator {
    line: Option<LineAssignment>,
    status: IndicatorStatus,
}

type Bank = [Indicator; 3];

enum FlashStep {
    Lit,
    Stopped,
    Failed,
}

pub struct IndicatorController<'a, P: LinePort> {
    port: &'a P,
    bank: Mutex<CriticalSectionRawMutex, Bank>,
    /// Wakes the flasher task of each colour.
    wake: [Signal<CriticalSectionRawMutex, ()>; 3],
}

impl<'a, P: LinePort> IndicatorController<'a, P> {
    pub fn new(port: &'a P, lines: IndicatorLines) -> Self {
        let light = |line| Indicator {
            line,
            status: IndicatorStatus::default(),
        };
        Self {
            port,
            bank: Mutex::new([light(lines.green), light(lines.yellow), light(lines.red)]),
            wake: [Signal::new(), Signal::new(), Signal::new()],
        }
    }

    // ── Solid ─────────────────────────────────────────────────

    /// Light `color` solid and clear every other colour's solid/flashing
    /// state. On failure red is raised (unless `color` is red).
    pub async fn set_solid(&self, color: Color) -> Result<(), ActuationError> {
        let mut bank = self.bank.lock().await;
        self.set_solid_locked(&mut bank, color)
    }

    /// Turn `color` off and clear its solid flag.
    pub async fn clear(&self, color: Color) -> Result<(), ActuationError> {
        let mut bank = self.bank.lock().await;
        let light = &mut bank[color.index()];
        match self.drive(light.line.as_ref(), false) {
            Ok(()) => {
                light.status.solid_on = false;
                Ok(())
            }
            Err(e) => {
                error!("Cannot stop light {color}: {e}");
                if color != Color::Red {
                    self.escalate_locked(&mut bank);
                }
                Err(e)
            }
        }
    }

    /// Raise red solid as an alarm. Failure is logged only.
    pub async fn raise_alarm(&self) {
        let mut bank = self.bank.lock().await;
        self.escalate_locked(&mut bank);
    }

    // ── Flashing ──────────────────────────────────────────────

    /// Start flashing `color`. Other colours' flashing is left alone.
    pub async fn start_flashing(&self, color: Color) {
        let mut bank = self.bank.lock().await;
        let status = &mut bank[color.index()].status;
        if !status.flashing {
            status.flashing = true;
            self.wake[color.index()].signal(());
        }
    }

    /// Stop flashing `color`. The flasher notices at the top of its next
    /// cycle, so the light settles off within one [`BLINK_INTERVAL`].
    pub async fn stop_flashing(&self, color: Color) {
        let mut bank = self.bank.lock().await;
        bank[color.index()].status.flashing = false;
    }

    /// Long-lived flasher for one colour. Idles until
    /// [`start_flashing`](Self::start_flashing), then toggles the light
    /// every [`BLINK_INTERVAL`] while the flag holds. Returns on shutdown.
    pub async fn run_flasher<C: Clock>(&self, color: Color, clock: &C, shutdown: &Shutdown) {
        let wake = &self.wake[color.index()];
        while shutdown.check().is_ok() {
            let started = future::or(
                async {
                    wake.wait().await;
                    true
                },
                async {
                    shutdown.wait().await;
                    false
                },
            )
            .await;
            if !started || self.flash_while_set(color, clock, shutdown).await.is_err() {
                break;
            }
        }
        debug!("Flasher {color} stopped");
    }

    async fn flash_while_set<C: Clock>(
        &self,
        color: Color,
        clock: &C,
        shutdown: &Shutdown,
    ) -> Result<(), Stopped> {
        info!("Flashing light {color}");
        loop {
            match self.flash_on(color).await {
                FlashStep::Lit => {}
                FlashStep::Stopped | FlashStep::Failed => return Ok(()),
            }
            shutdown.sleep(clock, BLINK_INTERVAL).await?;
            if !self.flash_off(color).await {
                return Ok(());
            }
            shutdown.sleep(clock, BLINK_INTERVAL).await?;
        }
    }

    /// Check the flag and light the colour under one lock.
    async fn flash_on(&self, color: Color) -> FlashStep {
        let mut bank = self.bank.lock().await;
        if !bank[color.index()].status.flashing {
            return FlashStep::Stopped;
        }
        match self.drive(bank[color.index()].line.as_ref(), true) {
            Ok(()) => FlashStep::Lit,
            Err(e) => {
                error!("Cannot start light {color}. Error: {e}");
                self.abandon_flash_locked(&mut bank, color);
                FlashStep::Failed
            }
        }
    }

    /// End the lit half of a blink. A colour that is also solid rests
    /// high, so an alarm raised mid-flash is never blinked away.
    async fn flash_off(&self, color: Color) -> bool {
        let mut bank = self.bank.lock().await;
        let light = &bank[color.index()];
        let rest = light.status.solid_on;
        match self.drive(light.line.as_ref(), rest) {
            Ok(()) => true,
            Err(e) => {
                error!("Cannot stop light {color}. Error: {e}");
                self.abandon_flash_locked(&mut bank, color);
                false
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub async fn status(&self, color: Color) -> IndicatorStatus {
        self.bank.lock().await[color.index()].status
    }

    /// Flags of all three lights, in [`Color::ALL`] order.
    pub async fn snapshot(&self) -> [IndicatorStatus; 3] {
        let bank = self.bank.lock().await;
        [bank[0].status, bank[1].status, bank[2].status]
    }

    // ── Internal ──────────────────────────────────────────────

    fn set_solid_locked(&self, bank: &mut Bank, color: Color) -> Result<(), ActuationError> {
        for other in Color::ALL.into_iter().filter(|c| *c != color) {
            let light = &mut bank[other.index()];
            light.status.flashing = false;
            if light.status.solid_on {
                if let Err(e) = self.drive(light.line.as_ref(), false) {
                    warn!("Cannot clear light {other} while lighting {color}: {e}");
                }
                light.status.solid_on = false;
            }
        }

        let light = &mut bank[color.index()];
        match self.drive(light.line.as_ref(), true) {
            Ok(()) => {
                light.status.solid_on = true;
                Ok(())
            }
            Err(e) => {
                error!("Cannot start light {color}: {e}");
                if color != Color::Red {
                    self.escalate_locked(bank);
                }
                Err(e)
            }
        }
    }

    /// Single-level escalation: red is attempted once, never retried.
    fn escalate_locked(&self, bank: &mut Bank) {
        if let Err(e) = self.set_solid_locked(bank, Color::Red) {
            error!("{}", AlarmEscalationError(e));
        }
    }

    fn abandon_flash_locked(&self, bank: &mut Bank, color: Color) {
        bank[color.index()].status.flashing = false;
        if color != Color::Red {
            self.escalate_locked(bank);
        }
    }

    fn drive(&self, line: Option<&LineAssignment>, high: bool) -> Result<(), ActuationError> {
        match line {
            Some(assignment) => lines::drive(self.port, assignment, high),
            None => Ok(()),
        }
    }
}

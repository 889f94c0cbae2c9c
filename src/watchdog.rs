//! Connectivity watchdog.
//!
//! Two cooperating loops joined by a bounded channel:
//!
//! ```text
//!   prober (own thread)                reporter (executor task)
//!   ┌──────────────────┐   Channel    ┌─────────────────────┐
//!   │ probe every 30 s │ ───────────▶ │ FlashDebounce        │──▶ red flashing
//!   └──────────────────┘ Connectivity └─────────────────────┘
//! ```
//!
//! The prober never touches the indicators and the reporter never touches
//! the network, so a slow probe only delays the next poll.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future;
use log::{debug, info, warn};

use crate::app::ports::{Clock, LinePort, ReachabilityProbe};
use crate::app::shutdown::Shutdown;
use crate::indicators::{Color, IndicatorController};

/// Pause between two reachability probes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Observations in flight between prober and reporter.
pub const CHANNEL_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Disconnected,
}

pub type ConnectivityChannel = Channel<CriticalSectionRawMutex, Connectivity, CHANNEL_DEPTH>;

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorAction {
    StartFlashing,
    StopFlashing,
}

/// Turns a stream of observations into at most one indicator action per
/// transition. Pure; the reporter applies the actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlashDebounce {
    armed: bool,
}

impl FlashDebounce {
    pub const fn new() -> Self {
        Self { armed: false }
    }

    /// `true` while red flashing has been requested and not yet cleared.
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Follow the controller's red flashing flag. Lighting another colour
    /// solid clears red flashing behind the reporter's back; disarming here
    /// lets the next `Disconnected` start it again.
    pub fn sync(&mut self, red_flashing: bool) {
        if !red_flashing {
            self.armed = false;
        }
    }

    pub fn observe(&mut self, observed: Connectivity) -> Option<IndicatorAction> {
        match (observed, self.armed) {
            (Connectivity::Disconnected, false) => {
                self.armed = true;
                Some(IndicatorAction::StartFlashing)
            }
            (Connectivity::Connected, true) => {
                self.armed = false;
                Some(IndicatorAction::StopFlashing)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Prober
// ---------------------------------------------------------------------------

/// One probe, one observation.
pub fn observe<R: ReachabilityProbe>(probe: &R) -> Connectivity {
    let outcome = probe.probe();
    if outcome.is_reachable() {
        Connectivity::Connected
    } else {
        debug!("Reachability probe failed: {outcome:?}");
        Connectivity::Disconnected
    }
}

/// Probe, push, sleep, until shutdown. Exactly one push per poll.
pub async fn run_prober<R, C>(
    probe: &R,
    clock: &C,
    channel: &ConnectivityChannel,
    shutdown: &Shutdown,
) where
    R: ReachabilityProbe,
    C: Clock,
{
    info!("Connectivity prober started ({}s interval)", POLL_INTERVAL.as_secs());
    while shutdown.check().is_ok() {
        let observed = observe(probe);
        let delivered = future::or(
            async {
                channel.send(observed).await;
                true
            },
            async {
                shutdown.wait().await;
                false
            },
        )
        .await;
        if !delivered || shutdown.sleep(clock, POLL_INTERVAL).await.is_err() {
            break;
        }
    }
    info!("Connectivity prober stopped");
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Consume observations and drive red flashing through the debounce.
pub async fn run_reporter<P: LinePort>(
    channel: &ConnectivityChannel,
    indicators: &IndicatorController<'_, P>,
    shutdown: &Shutdown,
) {
    let mut debounce = FlashDebounce::new();
    loop {
        let next = future::or(async { Some(channel.receive().await) }, async {
            shutdown.wait().await;
            None
        })
        .await;
        let Some(observed) = next else { break };

        let red_flashing = indicators.status(Color::Red).await.flashing;
        if debounce.is_armed() && !red_flashing {
            debug!("Red flashing was cleared by another light");
        }
        debounce.sync(red_flashing);
        match debounce.observe(observed) {
            Some(IndicatorAction::StartFlashing) => {
                warn!("Check connection");
                indicators.start_flashing(Color::Red).await;
            }
            Some(IndicatorAction::StopFlashing) => {
                info!("Connectivity restored");
                indicators.stop_flashing(Color::Red).await;
            }
            None => {}
        }
    }
    debug!("Connectivity reporter stopped");
}

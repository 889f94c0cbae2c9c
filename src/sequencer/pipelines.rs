//! Reverse and clean sub-pipelines.
//!
//! Both abort the remainder of their steps on the first actuation failure
//! and raise the red alarm; the next cycle starts normally.

use log::{error, info, warn};

use super::{ActuationSequencer, OPENING_SETTLE, Role, SWITCHING_SETTLE, SequencerState};
use crate::app::ports::{Clock, LinePort, TelemetrySink};
use crate::app::shutdown::{Shutdown, Stopped};
use crate::error::ActuationError;
use crate::indicators::Color;

/// Why a sub-pipeline ended early.
enum Abort {
    Stopped(Stopped),
    Failed(&'static str, ActuationError),
}

impl From<Stopped> for Abort {
    fn from(s: Stopped) -> Self {
        Self::Stopped(s)
    }
}

trait StepContext<T> {
    fn step(self, what: &'static str) -> Result<T, Abort>;
}

impl<T> StepContext<T> for Result<T, ActuationError> {
    fn step(self, what: &'static str) -> Result<T, Abort> {
        self.map_err(|e| Abort::Failed(what, e))
    }
}

impl<P: LinePort, C: Clock, S: TelemetrySink> ActuationSequencer<'_, P, C, S> {
    /// Reverse pass, followed by the clean pass when enabled.
    pub(super) async fn reverse_pass(&mut self, shutdown: &Shutdown) -> Result<(), Stopped> {
        self.enter(SequencerState::Reverting);
        info!("Reverting pump...");
        let reversed = self.reverse_steps(shutdown).await;
        if !self.settle(reversed).await? {
            return Ok(());
        }
        self.enter(SequencerState::RevertComplete);
        info!("Circuit is now empty!");

        if self.config.clean_enabled {
            self.enter(SequencerState::SwitchingCircuit);
            let cleaned = self.clean_steps(shutdown).await;
            if self.settle(cleaned).await? {
                info!("Circuit cleaned!");
            }
        }
        Ok(())
    }

    async fn reverse_steps(&mut self, shutdown: &Shutdown) -> Result<(), Abort> {
        self.actuate(Role::Reverse, true).step("start reverting process")?;
        self.indicators.start_flashing(Color::Green).await;

        shutdown.sleep(self.clock, self.config.reverse_duration).await?;

        self.actuate(Role::Reverse, false).step("stop reverting process")?;
        self.indicators.stop_flashing(Color::Green).await;
        Ok(())
    }

    /// Valve-up order is switching, open, clean; teardown is the mirror.
    async fn clean_steps(&mut self, shutdown: &Shutdown) -> Result<(), Abort> {
        info!("Step 1 -> Switching hydraulic circuit with switching valve");
        self.actuate(Role::SwitchingValve, true).step("switch the hydraulic circuit")?;
        shutdown.sleep(self.clock, SWITCHING_SETTLE).await?;

        self.enter(SequencerState::OpeningInlet);
        info!("Step 2 -> Enable cleaning inlet with open valve");
        self.actuate(Role::OpenValve, true).step("open the washing circuit")?;
        shutdown.sleep(self.clock, OPENING_SETTLE).await?;

        self.enter(SequencerState::Cleaning);
        info!("Step 3 -> Performing circuit clean up...");
        self.actuate(Role::Clean, true).step("start cleaning process")?;
        if let Err(e) = self.indicators.set_solid(Color::Yellow).await {
            warn!("Cleaning without yellow light: {e}");
        }
        shutdown.sleep(self.clock, self.config.clean_duration).await?;

        self.actuate(Role::Clean, false).step("stop cleaning process")?;
        if let Err(e) = self.indicators.clear(Color::Yellow).await {
            warn!("Cleaning done but yellow light still on: {e}");
        }

        self.enter(SequencerState::ClosingInlet);
        info!("Restoring circuit behaviour...");
        self.actuate(Role::OpenValve, false).step("close the washing circuit")?;
        shutdown.sleep(self.clock, OPENING_SETTLE).await?;

        self.enter(SequencerState::GravityDrain);
        shutdown.sleep(self.clock, self.config.gravity_duration).await?;

        self.enter(SequencerState::RestoringCircuit);
        self.actuate(Role::SwitchingValve, false).step("restore hydraulic circuit behaviour")?;
        shutdown.sleep(self.clock, SWITCHING_SETTLE).await?;
        Ok(())
    }

    /// `Ok(true)` when the steps completed, `Ok(false)` after an abort.
    async fn settle(&mut self, outcome: Result<(), Abort>) -> Result<bool, Stopped> {
        match outcome {
            Ok(()) => Ok(true),
            Err(Abort::Stopped(s)) => Err(s),
            Err(Abort::Failed(what, e)) => {
                error!("Cannot {what} in state {}. Error: {e}", self.state);
                self.indicators.raise_alarm().await;
                Ok(false)
            }
        }
    }
}

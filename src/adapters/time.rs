//! Host time adapter.
//!
//! Monotonic time from `std::time::Instant`; sleeps are
//! `async_io_mini::Timer`s, so they suspend the calling task rather than
//! the executor thread. The timers run on embassy-time's std driver.

use core::time::Duration;
use std::time::Instant;

use async_io_mini::Timer;

use crate::app::ports::Clock;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        Timer::after(duration).await;
    }
}

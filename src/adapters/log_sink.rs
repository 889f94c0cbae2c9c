//! Log-based telemetry sink adapter.
//!
//! Implements [`TelemetrySink`] by writing every reading to the log. A
//! message-bus adapter would implement the same trait.

use log::info;

use crate::app::ports::TelemetrySink;
use crate::app::telemetry::Reading;

/// Adapter that logs every [`Reading`].
#[derive(Debug, Default)]
pub struct LogTelemetrySink {
    pushed: u64,
}

impl LogTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn push(&mut self, reading: Reading) {
        self.pushed += 1;
        info!(
            "TELEM #{} | device={} | resource={} | value={}",
            self.pushed, reading.device_name, reading.resource, reading.value
        );
    }
}

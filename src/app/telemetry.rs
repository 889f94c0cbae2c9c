//! Outbound telemetry readings.
//!
//! After every state-changing actuation the sequencer pushes exactly one
//! [`Reading`] through the [`TelemetrySink`](super::ports::TelemetrySink)
//! port. The payload is a JSON object:
//!
//! ```text
//! {
//!   "gpio":       { "name": "pump", "chip": "gpiochip0", "line": 17, "state": true },
//!   "gpioConfig": { "pumpDuration": 300, "commandGap": 3600, ... }
//! }
//! ```
//!
//! An encoding failure never drops the reading: the error text is sent as
//! the value instead.

use log::warn;
use serde::Serialize;

use crate::config::SequencerConfig;
use crate::error::TelemetryError;
use crate::lines::LineHandle;

/// Device name every reading is tagged with.
pub const READING_DEVICE: &str = "device-gpiod";

/// Resource name of the single string-valued reading.
pub const READING_RESOURCE: &str = "GPIO";

/// One string-valued reading, ready for the host telemetry protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub device_name: &'static str,
    pub resource: &'static str,
    pub value: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    gpio: &'a LineHandle,
    #[serde(rename = "gpioConfig")]
    gpio_config: &'a SequencerConfig,
}

impl Reading {
    /// Encode a line transition together with the full resolved config.
    pub fn transition(line: &LineHandle, config: &SequencerConfig) -> Self {
        let payload = Payload {
            gpio: line,
            gpio_config: config,
        };
        Self::from_encoded(serde_json::to_string(&payload).map_err(|e| {
            warn!("Cannot encode reading for '{}': {}", line.name(), e);
            format!("{}: {e}", TelemetryError::Serialization)
        }))
    }

    /// Build from an already-attempted encoding; the error text stands in
    /// for a failed payload.
    pub fn from_encoded(encoded: Result<String, String>) -> Self {
        let value = match encoded {
            Ok(json) | Err(json) => json,
        };
        Self {
            device_name: READING_DEVICE,
            resource: READING_RESOURCE,
            value,
        }
    }
}

//! Runtime configuration
//!
//! All tunable parameters for the circuit sequencer. Values come from the
//! process environment once at startup and are clamped to their floors;
//! nothing here is ever fatal.

use core::time::Duration;

use log::warn;
use serde::{Serialize, Serializer};

// --- Floors and defaults ---

pub const MIN_PUMP: Duration = Duration::from_secs(5 * 60);
pub const MIN_COMMAND_GAP: Duration = Duration::from_secs(10 * 60);
pub const MIN_CLEAN: Duration = Duration::from_secs(5 * 60);
pub const MIN_REVERSE: Duration = Duration::from_secs(5 * 60);
pub const MIN_GRAVITY: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_PUMP: Duration = MIN_PUMP;
pub const DEFAULT_COMMAND_GAP: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CLEAN: Duration = MIN_CLEAN;
pub const DEFAULT_REVERSE: Duration = MIN_REVERSE;
pub const DEFAULT_GRAVITY: Duration = MIN_GRAVITY;

/// Resolved timing and feature flags for the pump / reverse / clean cycle.
///
/// Serialised verbatim into every telemetry reading (`gpioConfig`), with
/// durations in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerConfig {
    #[serde(serialize_with = "as_secs")]
    pub pump_duration: Duration,
    #[serde(serialize_with = "as_secs")]
    pub command_gap: Duration,
    pub clean_enabled: bool,
    #[serde(serialize_with = "as_secs")]
    pub clean_duration: Duration,
    pub reverse_enabled: bool,
    #[serde(serialize_with = "as_secs")]
    pub reverse_duration: Duration,
    #[serde(serialize_with = "as_secs")]
    pub gravity_duration: Duration,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            pump_duration: DEFAULT_PUMP,
            command_gap: DEFAULT_COMMAND_GAP,
            clean_enabled: false,
            clean_duration: DEFAULT_CLEAN,
            reverse_enabled: false,
            reverse_duration: DEFAULT_REVERSE,
            gravity_duration: DEFAULT_GRAVITY,
        }
    }
}

impl SequencerConfig {
    /// Read every field from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Each field is parsed on its own;
    /// a missing or malformed value falls back to its default, and every
    /// duration is raised to its floor.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            pump_duration: duration_var(&lookup, "PUMP_TIMEOUT", DEFAULT_PUMP, MIN_PUMP),
            command_gap: duration_var(
                &lookup,
                "COMMAND_GAP",
                DEFAULT_COMMAND_GAP,
                MIN_COMMAND_GAP,
            ),
            clean_enabled: bool_var(&lookup, "ENABLE_CLEAN", false),
            clean_duration: duration_var(&lookup, "CLEAN_TIMEOUT", DEFAULT_CLEAN, MIN_CLEAN),
            reverse_enabled: bool_var(&lookup, "ENABLE_REVERSE", false),
            reverse_duration: duration_var(
                &lookup,
                "REVERSE_TIMEOUT",
                DEFAULT_REVERSE,
                MIN_REVERSE,
            ),
            gravity_duration: duration_var(
                &lookup,
                "GRAVITY_TIMEOUT",
                DEFAULT_GRAVITY,
                MIN_GRAVITY,
            ),
        }
    }

    /// Raise every duration to its floor. Idempotent.
    pub fn clamped(mut self) -> Self {
        self.pump_duration = self.pump_duration.max(MIN_PUMP);
        self.command_gap = self.command_gap.max(MIN_COMMAND_GAP);
        self.clean_duration = self.clean_duration.max(MIN_CLEAN);
        self.reverse_duration = self.reverse_duration.max(MIN_REVERSE);
        self.gravity_duration = self.gravity_duration.max(MIN_GRAVITY);
        self
    }
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
    floor: Duration,
) -> Duration {
    let raw = lookup(key).unwrap_or_default();
    let value = match parse_duration(&raw) {
        Some(d) => d,
        None => {
            warn!("Cannot parse {key}={raw:?}. Picking default value {default:?}");
            default
        }
    };
    if value < floor {
        warn!("{key} below minimum ({value:?} < {floor:?}), using {floor:?}");
        floor
    } else {
        value
    }
}

fn bool_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let raw = lookup(key).unwrap_or_default();
    parse_bool(&raw).unwrap_or_else(|| {
        warn!("Cannot parse {key}={raw:?}. Picking default value {default}");
        default
    })
}

/// Parse a human duration ("5m", "1h 30m", "90s"). Empty and negative
/// inputs are rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    humantime::parse_duration(raw).ok()
}

/// Boolean spellings accepted for feature flags.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// ───────────────────────────────────────────────────────────────
// Bootstrap settings
// ───────────────────────────────────────────────────────────────

/// Environment names that select which configured line plays which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleNames {
    pub pump: String,
    pub reverse: String,
    pub clean: String,
    pub open_valve: String,
    pub switching_valve: String,
    pub green: String,
    pub yellow: String,
    pub red: String,
}

/// Everything the bootstrap needs besides [`SequencerConfig`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub verbose: bool,
    pub line_config_file: String,
    pub roles: RoleNames,
    /// Name this service is registered under in the device registry.
    pub device_name: String,
    /// Base URL of the device registry (core metadata).
    pub registry_url: String,
    /// Companion measurement device endpoint polled before the first cycle.
    pub companion_endpoint: String,
    /// Well-known endpoint probed by the connectivity watchdog.
    pub reachability_url: String,
}

pub const DEFAULT_DEVICE_NAME: &str = "device-gpiod";
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:59881";
pub const DEFAULT_REACHABILITY_URL: &str = "http://clients3.google.com/generate_204";

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Self {
            verbose: bool_var(&lookup, "VERBOSE", false),
            line_config_file: text("GPIO_CONFIG_FILE", "gpio.yaml"),
            roles: RoleNames {
                pump: text("START_TRIGGER", "pump"),
                reverse: text("REVERSE_TRIGGER", "reverse"),
                clean: text("CLEAN_TRIGGER", "clean"),
                open_valve: text("OPEN_VALVE", "open-valve"),
                switching_valve: text("SWITCHING_VALVE", "switching-valve"),
                green: text("GREEN_LIGHT", "light-green"),
                yellow: text("YELLOW_LIGHT", "light-yellow"),
                red: text("RED_LIGHT", "light-red"),
            },
            device_name: text("DEVICE_NAME", DEFAULT_DEVICE_NAME),
            registry_url: text("METADATA_URL", DEFAULT_REGISTRY_URL),
            companion_endpoint: text("MODBUS_DEVICE_ENDPOINT", ""),
            reachability_url: text("REACHABILITY_URL", DEFAULT_REACHABILITY_URL),
        }
    }
}

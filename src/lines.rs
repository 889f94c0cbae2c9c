//! Line assignments for the fluid circuit and its status lights.
//!
//! Single source of truth for which controller chip / offset plays which
//! role. The assignments are loaded once from a YAML document:
//!
//! ```yaml
//! gpio:
//!   - { name: pump,        chip: gpiochip0, line: 17 }
//!   - { name: light-green, chip: gpiochip0, line: 5 }
//! ```
//!
//! and mapped to roles through the names configured in the environment.

use std::path::Path;

use embedded_hal::digital::{Error as _, InputPin, OutputPin, PinState};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::LinePort;
use crate::config::{RoleNames, SequencerConfig};
use crate::error::{ActuationError, ConfigError};

// ---------------------------------------------------------------------------
// Static configuration
// ---------------------------------------------------------------------------

/// A physical line: controller chip plus offset. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineAssignment {
    pub name: String,
    pub chip: String,
    pub line: u32,
}

impl LineAssignment {
    pub fn new(name: impl Into<String>, chip: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            chip: chip.into(),
            line,
        }
    }
}

/// The parsed line configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default)]
    pub gpio: Vec<LineAssignment>,
}

impl LineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| {
            warn!("Cannot unmarshal line configuration: {e}");
            ConfigError::Malformed
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            warn!("Cannot read line configuration {}: {e}", path.display());
            ConfigError::Unreadable
        })?;
        Self::from_yaml(&text)
    }
}

// ---------------------------------------------------------------------------
// Role resolution
// ---------------------------------------------------------------------------

/// Lines driven by the actuation sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitLines {
    pub pump: LineAssignment,
    pub reverse: Option<LineAssignment>,
    pub clean: Option<LineAssignment>,
    pub open_valve: Option<LineAssignment>,
    pub switching_valve: Option<LineAssignment>,
}

impl CircuitLines {
    /// Disable any sub-pipeline whose lines are not all assigned.
    pub fn effective(&self, mut config: SequencerConfig) -> SequencerConfig {
        if config.reverse_enabled && self.reverse.is_none() {
            warn!("Reverse enabled but no reverse line assigned; disabling reverse");
            config.reverse_enabled = false;
        }
        let clean_ready =
            self.clean.is_some() && self.open_valve.is_some() && self.switching_valve.is_some();
        if config.clean_enabled && !clean_ready {
            warn!("Clean enabled but clean/open/switching lines incomplete; disabling clean");
            config.clean_enabled = false;
        }
        if config.clean_enabled && !config.reverse_enabled {
            warn!("Clean circuit only runs after a reverse pass; it will stay idle");
        }
        config
    }
}

/// Lines wired to the three status lights. Missing lights are tolerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorLines {
    pub green: Option<LineAssignment>,
    pub yellow: Option<LineAssignment>,
    pub red: Option<LineAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRoles {
    pub circuit: CircuitLines,
    pub indicators: IndicatorLines,
}

impl LineRoles {
    /// Map every configured line to the role whose name it carries.
    /// Unknown names are logged and ignored; the pump line is mandatory.
    pub fn resolve(config: &LineConfig, names: &RoleNames) -> Result<Self, ConfigError> {
        let mut pump = None;
        let mut circuit_optional: [Option<LineAssignment>; 4] = Default::default();
        let mut indicators = IndicatorLines::default();

        for a in &config.gpio {
            let slot = match a.name.as_str() {
                n if n == names.pump => &mut pump,
                n if n == names.reverse => &mut circuit_optional[0],
                n if n == names.clean => &mut circuit_optional[1],
                n if n == names.open_valve => &mut circuit_optional[2],
                n if n == names.switching_valve => &mut circuit_optional[3],
                n if n == names.green => &mut indicators.green,
                n if n == names.yellow => &mut indicators.yellow,
                n if n == names.red => &mut indicators.red,
                other => {
                    info!("Unknown gpio {other}.");
                    continue;
                }
            };
            if slot.is_some() {
                warn!("Line name '{}' configured twice; keeping the last", a.name);
            }
            *slot = Some(a.clone());
        }

        let [reverse, clean, open_valve, switching_valve] = circuit_optional;
        let pump = pump.ok_or(ConfigError::MissingPumpLine)?;

        Ok(Self {
            circuit: CircuitLines {
                pump,
                reverse,
                clean,
                open_valve,
                switching_valve,
            },
            indicators,
        })
    }

    /// Startup summary of every resolved role.
    pub fn log_summary(&self, config: &SequencerConfig) {
        fn describe(a: Option<&LineAssignment>) -> String {
            a.map_or_else(|| "unassigned".to_owned(), |a| format!("{}:{}", a.chip, a.line))
        }
        let c = &self.circuit;
        info!("Device GPIO configuration:");
        info!("  PUMP: {}", describe(Some(&c.pump)));
        info!(
            "  REVERSE: {} (enabled: {})",
            describe(c.reverse.as_ref()),
            config.reverse_enabled
        );
        info!(
            "  CLEAN: {} (enabled: {})",
            describe(c.clean.as_ref()),
            config.clean_enabled
        );
        info!("  OPEN VALVE: {}", describe(c.open_valve.as_ref()));
        info!("  SWITCHING VALVE: {}", describe(c.switching_valve.as_ref()));
        let i = &self.indicators;
        info!(
            "  LIGHTS: green={} yellow={} red={}",
            describe(i.green.as_ref()),
            describe(i.yellow.as_ref()),
            describe(i.red.as_ref())
        );
    }
}

// ---------------------------------------------------------------------------
// Actuation
// ---------------------------------------------------------------------------

/// Open → set → read back → close, in one call. The line is never held
/// open past the return.
pub fn drive<P: LinePort>(
    port: &P,
    assignment: &LineAssignment,
    high: bool,
) -> Result<(), ActuationError> {
    let level = PinState::from(high);
    let mut line = port.open(assignment, level).inspect_err(|e| {
        warn!(
            "Error setting up line {} from chip {}: {}",
            assignment.line, assignment.chip, e
        );
    })?;

    line.set_state(level).map_err(|e| {
        warn!(
            "Error driving line {} from chip {}: {:?}",
            assignment.line,
            assignment.chip,
            e.kind()
        );
        ActuationError::WriteFailed
    })?;

    let readback = line.is_high().map_err(|e| {
        warn!(
            "Error reading line {} from chip {}: {:?}",
            assignment.line,
            assignment.chip,
            e.kind()
        );
        ActuationError::ReadFailed
    })?;

    drop(line);
    debug!("Line '{}' -> {}", assignment.name, if high { "high" } else { "low" });

    if readback == high {
        Ok(())
    } else {
        Err(ActuationError::Verify)
    }
}

/// Runtime binding of an assignment plus its cached logical state.
///
/// Owned by exactly one actuating component; the cached state changes only
/// after a successful [`actuate`](Self::actuate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineHandle {
    #[serde(flatten)]
    assignment: LineAssignment,
    state: bool,
}

impl LineHandle {
    pub fn new(assignment: LineAssignment) -> Self {
        Self {
            assignment,
            state: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.assignment.name
    }

    pub fn assignment(&self) -> &LineAssignment {
        &self.assignment
    }

    /// Last successfully actuated logical state.
    pub fn state(&self) -> bool {
        self.state
    }

    pub fn actuate<P: LinePort>(&mut self, port: &P, high: bool) -> Result<(), ActuationError> {
        drive(port, &self.assignment, high)?;
        self.state = high;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn mark(&mut self, state: bool) {
        self.state = state;
    }
}

//! Linux GPIO character-device adapter.
//!
//! Each open requests the line as an output with its initial value, under
//! the consumer label `fluidctl`; dropping the [`CdevLine`] releases it.

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin, PinState};
use gpio_cdev::{Chip, LineHandle as CdevHandle, LineRequestFlags};
use log::warn;

use crate::app::ports::LinePort;
use crate::error::ActuationError;
use crate::lines::LineAssignment;

const CONSUMER: &str = "fluidctl";

/// Opens lines under `/dev/<chip>`.
#[derive(Debug, Clone)]
pub struct CdevLines {
    dev_root: String,
}

impl Default for CdevLines {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl CdevLines {
    pub fn new(dev_root: impl Into<String>) -> Self {
        Self {
            dev_root: dev_root.into(),
        }
    }

    fn chip_path(&self, chip: &str) -> String {
        format!("{}/{}", self.dev_root.trim_end_matches('/'), chip)
    }
}

pub struct CdevLine {
    handle: CdevHandle,
}

impl LinePort for CdevLines {
    type Line = CdevLine;

    fn open(&self, assignment: &LineAssignment, level: PinState) -> Result<CdevLine, ActuationError> {
        let path = self.chip_path(&assignment.chip);
        let mut chip = Chip::new(&path).map_err(|e| {
            warn!("Cannot open chip {path}: {e}");
            ActuationError::OpenFailed
        })?;
        let line = chip.get_line(assignment.line).map_err(|e| {
            warn!("Cannot get line {} from chip {path}: {e}", assignment.line);
            ActuationError::OpenFailed
        })?;
        let handle = line
            .request(LineRequestFlags::OUTPUT, u8::from(level == PinState::High), CONSUMER)
            .map_err(|e| {
                warn!("Cannot request line {} from chip {path}: {e}", assignment.line);
                ActuationError::OpenFailed
            })?;
        Ok(CdevLine { handle })
    }
}

impl CdevLine {
    fn write(&mut self, value: u8) -> Result<(), ErrorKind> {
        self.handle.set_value(value).map_err(|e| {
            warn!("Line write failed: {e}");
            ErrorKind::Other
        })
    }
}

impl ErrorType for CdevLine {
    type Error = ErrorKind;
}

impl OutputPin for CdevLine {
    fn set_low(&mut self) -> Result<(), ErrorKind> {
        self.write(0)
    }

    fn set_high(&mut self) -> Result<(), ErrorKind> {
        self.write(1)
    }
}

impl InputPin for CdevLine {
    fn is_high(&mut self) -> Result<bool, ErrorKind> {
        self.handle.get_value().map(|v| v != 0).map_err(|e| {
            warn!("Line read failed: {e}");
            ErrorKind::Other
        })
    }

    fn is_low(&mut self) -> Result<bool, ErrorKind> {
        self.is_high().map(|high| !high)
    }
}

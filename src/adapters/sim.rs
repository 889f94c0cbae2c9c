//! In-memory line adapter.
//!
//! Stands in for the GPIO character device on hosts without one (or when
//! the `cdev` feature is off). Levels survive close/reopen, so read-back
//! behaves like a real latched output.

use core::cell::RefCell;
use core::convert::Infallible;
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};
use log::debug;

use crate::app::ports::LinePort;
use crate::error::ActuationError;
use crate::lines::LineAssignment;

type Levels = Rc<RefCell<HashMap<(String, u32), bool>>>;

#[derive(Debug, Clone, Default)]
pub struct SimLines {
    levels: Levels,
}

impl SimLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of `chip:line`; never-driven lines read low.
    pub fn level(&self, chip: &str, line: u32) -> bool {
        self.levels
            .borrow()
            .get(&(chip.to_owned(), line))
            .copied()
            .unwrap_or(false)
    }
}

pub struct SimLine {
    key: (String, u32),
    levels: Levels,
}

impl LinePort for SimLines {
    type Line = SimLine;

    fn open(&self, assignment: &LineAssignment, level: PinState) -> Result<SimLine, ActuationError> {
        let key = (assignment.chip.clone(), assignment.line);
        debug!("sim: open {}:{} as {:?}", key.0, key.1, level);
        self.levels.borrow_mut().insert(key.clone(), level == PinState::High);
        Ok(SimLine {
            key,
            levels: Rc::clone(&self.levels),
        })
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().insert(self.key.clone(), false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().insert(self.key.clone(), true);
        Ok(())
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.levels.borrow().get(&self.key).copied().unwrap_or(false))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

//! Keyboard-driven analog sticks.
//!
//! Each stick axis is derived from two direction flags. Pressing a direction always
//! clears its opposite first, so at most one flag of an opposite pair is ever set
//! and the axis value reduces to a three-way branch.

use crate::controller::input::{AnalogDirection, Direction, Stick};
use crate::controller::state::ControllerState;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

pub const MIN_SENSITIVITY: f64 = 0.1;
pub const MAX_SENSITIVITY: f64 = 2.0;
pub const DEFAULT_SENSITIVITY: f64 = 0.6;

/// Stick deflection scale, always inside `[0.1, 2.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Sensitivity(f64);

impl Sensitivity {
    /// Clamps into range. NaN falls back to the default.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(DEFAULT_SENSITIVITY)
    }
}

impl<'de> Deserialize<'de> for Sensitivity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Sensitivity::new)
    }
}

/// Pressed flags of the eight analog directions
#[derive(Debug, Clone, Default)]
pub struct AnalogResolver {
    flags: [bool; 8],
}

impl AnalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a direction, clearing its opposite first.
    pub fn press(&mut self, dir: AnalogDirection) {
        self.flags[dir.opposite().slot()] = false;
        self.flags[dir.slot()] = true;
    }

    pub fn release(&mut self, dir: AnalogDirection) {
        self.flags[dir.slot()] = false;
    }

    pub fn is_pressed(&self, dir: AnalogDirection) -> bool {
        self.flags[dir.slot()]
    }

    pub fn clear(&mut self) {
        self.flags = [false; 8];
    }

    /// Raw `(x, y)` in `{-1, 0, 1}` for one stick
    pub fn direction(&self, stick: Stick) -> (f64, f64) {
        let flag = |direction| self.is_pressed(AnalogDirection::new(stick, direction));
        let x = if flag(Direction::Left) {
            -1.0
        } else if flag(Direction::Right) {
            1.0
        } else {
            0.0
        };
        let y = if flag(Direction::Up) {
            -1.0
        } else if flag(Direction::Down) {
            1.0
        } else {
            0.0
        };
        (x, y)
    }

    /// Writes both sticks into the controller state.
    pub fn recompute(&self, sensitivity: Sensitivity, state: &mut ControllerState) {
        let s = sensitivity.get();
        for stick in [Stick::Left, Stick::Right] {
            let (x, y) = self.direction(stick);
            state.set_stick(stick, x * s, y * s);
        }
        debug!("Recomputed axes: {:?}", state.axes());
    }
}

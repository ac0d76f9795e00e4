//! The virtual controller as a single unit: record, direction flags and sensitivity.

use crate::controller::analog::{AnalogResolver, Sensitivity};
use crate::controller::input::{LogicalInput, Stick};
use crate::controller::state::{ControllerProfile, ControllerState, GamepadSnapshot};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct VirtualController {
    state: ControllerState,
    analog: AnalogResolver,
    sensitivity: Sensitivity,
}

impl VirtualController {
    pub fn new(profile: ControllerProfile, sensitivity: Sensitivity) -> Self {
        Self {
            state: ControllerState::new(profile),
            analog: AnalogResolver::new(),
            sensitivity,
        }
    }

    /// Drives a logical input down. Analog directions clear their opposite and
    /// recompute the sticks, digital inputs press their button slot.
    pub fn press_input(&mut self, input: LogicalInput) {
        match input.analog() {
            Some(dir) => {
                self.analog.press(dir);
                self.analog.recompute(self.sensitivity, &mut self.state);
            }
            None => self.state.press_digital(input),
        }
    }

    pub fn release_input(&mut self, input: LogicalInput) {
        match input.analog() {
            Some(dir) => {
                self.analog.release(dir);
                self.analog.recompute(self.sensitivity, &mut self.state);
            }
            None => self.state.release_digital(input),
        }
    }

    /// Whether the input is currently held (button slot or direction flag)
    pub fn is_pressed(&self, input: LogicalInput) -> bool {
        match (input.analog(), input.button_index()) {
            (Some(dir), _) => self.analog.is_pressed(dir),
            (None, Some(index)) => self.state.button(index).is_some_and(|b| b.pressed),
            (None, None) => false,
        }
    }

    pub fn pressed_inputs(&self) -> Vec<LogicalInput> {
        LogicalInput::all().filter(|i| self.is_pressed(*i)).collect()
    }

    pub fn press_button(&mut self, index: usize) -> bool {
        self.state.set_button(index, true)
    }

    pub fn release_button(&mut self, index: usize) -> bool {
        self.state.set_button(index, false)
    }

    /// Direct stick control; values are scaled by the sensitivity and clamped.
    pub fn set_stick(&mut self, stick: Stick, x: f64, y: f64) {
        let s = self.sensitivity.get();
        self.state.set_stick(stick, x * s, y * s);
    }

    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
        self.analog.recompute(self.sensitivity, &mut self.state);
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn set_profile(&mut self, profile: ControllerProfile) {
        self.state.set_profile(profile);
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.state.set_connected(connected);
    }

    /// Releases everything: direction flags, button records and axes.
    pub fn reset(&mut self) {
        debug!("Resetting all controller inputs");
        self.analog.clear();
        self.state.clear_inputs();
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn snapshot(&self) -> GamepadSnapshot {
        self.state.snapshot()
    }
}

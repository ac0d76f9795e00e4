//! Canonical in-memory representation of the virtual controller.
//!
//! The [`ControllerState`] is created once and mutated in place for the life of the
//! engine. Pollers never see it directly, they receive a [`GamepadSnapshot`] copy
//! shaped like the record a standard gamepad query returns.

use crate::controller::input::{LogicalInput, Stick, BUTTON_COUNT};
use crate::mapping::MappingError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// Press/touch/value triple of one button.
///
/// `touched` and `value` always follow `pressed`; the only way to change a record is
/// [`ButtonRecord::set`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ButtonRecord {
    pub pressed: bool,
    pub touched: bool,
    pub value: f64,
}

impl ButtonRecord {
    fn set(&mut self, pressed: bool) {
        self.pressed = pressed;
        self.touched = pressed;
        self.value = if pressed { 1.0 } else { 0.0 };
    }
}

/// Controller identities the virtual pad can pose as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControllerProfile {
    #[default]
    #[serde(rename = "xbox360")]
    Xbox360,
    #[serde(rename = "xboxone")]
    XboxOne,
    #[serde(rename = "ps4")]
    Ps4,
    #[serde(rename = "ps5")]
    Ps5,
}

impl ControllerProfile {
    pub const ALL: [ControllerProfile; 4] = [
        ControllerProfile::Xbox360,
        ControllerProfile::XboxOne,
        ControllerProfile::Ps4,
        ControllerProfile::Ps5,
    ];

    /// Identity string reported in the `id` field of the gamepad record
    pub const fn identity(self) -> &'static str {
        match self {
            ControllerProfile::Xbox360 => "Xbox 360 Controller (XInput STANDARD GAMEPAD)",
            ControllerProfile::XboxOne => {
                "Xbox One Controller (STANDARD GAMEPAD Vendor: 045e Product: 02ea)"
            }
            ControllerProfile::Ps4 => {
                "Wireless Controller (STANDARD GAMEPAD Vendor: 054c Product: 09cc)"
            }
            ControllerProfile::Ps5 => {
                "DualSense Wireless Controller (STANDARD GAMEPAD Vendor: 054c Product: 0ce6)"
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ControllerProfile::Xbox360 => "xbox360",
            ControllerProfile::XboxOne => "xboxone",
            ControllerProfile::Ps4 => "ps4",
            ControllerProfile::Ps5 => "ps5",
        }
    }
}

impl Display for ControllerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ControllerProfile {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControllerProfile::ALL
            .into_iter()
            .find(|profile| profile.name() == s)
            .ok_or_else(|| MappingError::UnknownProfile(s.to_string()))
    }
}

/// Copy of the controller record as handed out to pollers and event listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamepadSnapshot {
    pub id: String,
    pub index: u32,
    pub connected: bool,
    pub mapping: String,
    pub timestamp: f64,
    pub axes: [f64; 4],
    pub buttons: Vec<ButtonRecord>,
}

/// The one virtual controller slot
#[derive(Debug, Clone)]
pub struct ControllerState {
    axes: [f64; 4],
    buttons: [ButtonRecord; BUTTON_COUNT],
    connected: bool,
    profile: ControllerProfile,

    // Milliseconds since `epoch`, never decreases
    timestamp: f64,
    epoch: Instant,
}

impl ControllerState {
    pub fn new(profile: ControllerProfile) -> Self {
        debug!("Creating controller state for profile {}", profile);
        Self {
            axes: [0.0; 4],
            buttons: [ButtonRecord::default(); BUTTON_COUNT],
            connected: false,
            profile,
            timestamp: 0.0,
            epoch: Instant::now(),
        }
    }

    /// Advances the timestamp to "now", keeping it monotonic.
    pub fn touch(&mut self) {
        let now = self.epoch.elapsed().as_secs_f64() * 1000.0;
        if now > self.timestamp {
            self.timestamp = now;
        }
    }

    /// Presses the button slot of a digital input. Inputs without a slot are ignored.
    pub fn press_digital(&mut self, input: LogicalInput) {
        if let Some(index) = input.button_index() {
            self.set_button(index, true);
        }
    }

    pub fn release_digital(&mut self, input: LogicalInput) {
        if let Some(index) = input.button_index() {
            self.set_button(index, false);
        }
    }

    /// Sets a button by raw index. Returns false (and changes nothing) when out of range.
    pub fn set_button(&mut self, index: usize, pressed: bool) -> bool {
        match self.buttons.get_mut(index) {
            Some(record) => {
                record.set(pressed);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Writes both axes of a stick, clamped to `[-1, 1]`.
    pub fn set_stick(&mut self, stick: Stick, x: f64, y: f64) {
        let (xi, yi) = stick.axis_indices();
        self.axes[xi] = x.clamp(-1.0, 1.0);
        self.axes[yi] = y.clamp(-1.0, 1.0);
        self.touch();
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        self.touch();
    }

    /// Changes the identity. Nothing but `id` and `timestamp` is affected.
    pub fn set_profile(&mut self, profile: ControllerProfile) {
        self.profile = profile;
        self.touch();
    }

    /// Clears every button record and centres both sticks.
    pub fn clear_inputs(&mut self) {
        for record in self.buttons.iter_mut() {
            record.set(false);
        }
        self.axes = [0.0; 4];
        self.touch();
    }

    pub fn axes(&self) -> [f64; 4] {
        self.axes
    }

    pub fn buttons(&self) -> &[ButtonRecord] {
        &self.buttons
    }

    pub fn button(&self, index: usize) -> Option<&ButtonRecord> {
        self.buttons.get(index)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn profile(&self) -> ControllerProfile {
        self.profile
    }

    pub fn id(&self) -> &'static str {
        self.profile.identity()
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Shallow copy in the shape of a standard gamepad record
    pub fn snapshot(&self) -> GamepadSnapshot {
        GamepadSnapshot {
            id: self.id().to_string(),
            index: 0,
            connected: self.connected,
            mapping: "standard".to_string(),
            timestamp: self.timestamp,
            axes: self.axes,
            buttons: self.buttons.to_vec(),
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(ControllerProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_digital_keep_triple_in_sync() {
        let mut state = ControllerState::default();
        state.press_digital(LogicalInput::A);
        let a = state.button(0).copied().unwrap_or_default();
        assert!(a.pressed && a.touched);
        assert_eq!(a.value, 1.0);

        state.release_digital(LogicalInput::A);
        let a = state.button(0).copied().unwrap_or_default();
        assert!(!a.pressed && !a.touched);
        assert_eq!(a.value, 0.0);
    }

    #[test]
    fn test_analog_inputs_do_not_touch_buttons() {
        let mut state = ControllerState::default();
        state.press_digital(LogicalInput::AnalogLeftUp);
        assert!(state.buttons().iter().all(|b| !b.pressed));
    }

    #[test]
    fn test_out_of_range_button_is_rejected() {
        let mut state = ControllerState::default();
        assert!(!state.set_button(BUTTON_COUNT, true));
        assert!(state.set_button(BUTTON_COUNT - 1, true));
        assert_eq!(state.buttons().len(), BUTTON_COUNT);
    }

    #[test]
    fn test_timestamp_never_decreases() {
        let mut state = ControllerState::default();
        let mut last = state.timestamp();
        for i in 0..50 {
            state.set_button(i % BUTTON_COUNT, i % 2 == 0);
            assert!(state.timestamp() >= last);
            last = state.timestamp();
        }
    }

    #[test]
    fn test_stick_values_are_clamped() {
        let mut state = ControllerState::default();
        state.set_stick(Stick::Right, 3.0, -7.5);
        assert_eq!(state.axes(), [0.0, 0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_profile_change_only_updates_identity() {
        let mut state = ControllerState::default();
        state.press_digital(LogicalInput::Start);
        state.set_stick(Stick::Left, 0.5, 0.0);
        let before = state.snapshot();

        state.set_profile(ControllerProfile::Ps5);
        let after = state.snapshot();
        assert_eq!(after.id, ControllerProfile::Ps5.identity());
        assert_eq!(after.axes, before.axes);
        assert_eq!(after.buttons, before.buttons);
        assert_eq!(after.connected, before.connected);
        assert!(after.timestamp >= before.timestamp);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut state = ControllerState::default();
        let snapshot = state.snapshot();
        state.press_digital(LogicalInput::B);
        assert!(!snapshot.buttons[1].pressed);
        assert_eq!(snapshot.index, 0);
        assert_eq!(snapshot.mapping, "standard");
        assert_eq!(snapshot.buttons.len(), BUTTON_COUNT);
    }

    #[test]
    fn test_profile_names_round_trip() {
        for profile in ControllerProfile::ALL {
            assert_eq!(profile.name().parse::<ControllerProfile>().ok(), Some(profile));
        }
        assert!("n64".parse::<ControllerProfile>().is_err());
    }
}

//! Logical controller inputs and the static tables built around them.
//!
//! A [`LogicalInput`] names a controller signal independent of any physical key.
//! Digital inputs own a slot in the standard button layout, analog directions feed
//! one of the two sticks and always have exactly one opposite on the same stick.

use crate::mapping::MappingError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Number of button records exposed by the virtual controller (16 mapped + 1 reserved).
pub const BUTTON_COUNT: usize = 17;

/// Physical key identifier as delivered by the host (legacy key code).
pub type KeyId = u32;

/// Analog stick selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stick {
    Left,
    Right,
}

impl Stick {
    /// Axis slots `(x, y)` inside the 4-element axis vector
    pub const fn axis_indices(self) -> (usize, usize) {
        match self {
            Stick::Left => (0, 1),
            Stick::Right => (2, 3),
        }
    }
}

impl Display for Stick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stick::Left => write!(f, "left"),
            Stick::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Stick {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Stick::Left),
            "right" => Ok(Stick::Right),
            other => Err(MappingError::UnknownStick(other.to_string())),
        }
    }
}

/// Direction of a single analog input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// An analog direction on one stick, e.g. left stick / up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalogDirection {
    pub stick: Stick,
    pub direction: Direction,
}

impl AnalogDirection {
    pub const fn new(stick: Stick, direction: Direction) -> Self {
        Self { stick, direction }
    }

    /// The direction on the same axis of the same stick.
    pub const fn opposite(self) -> Self {
        let direction = match self.direction {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        };
        Self::new(self.stick, direction)
    }

    /// Dense slot in `0..8`, used by the flag array of the analog resolver.
    pub const fn slot(self) -> usize {
        let base = match self.stick {
            Stick::Left => 0,
            Stick::Right => 4,
        };
        let offset = match self.direction {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        };
        base + offset
    }
}

/// Every controller signal a key can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalInput {
    // Analog directions
    AnalogLeftUp,
    AnalogLeftDown,
    AnalogLeftLeft,
    AnalogLeftRight,
    AnalogRightUp,
    AnalogRightDown,
    AnalogRightLeft,
    AnalogRightRight,

    // Digital buttons
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    Select,
    Start,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

/// Tag table, in the order reported by `available_buttons`.
const TAGS: [(LogicalInput, &str); 24] = [
    (LogicalInput::AnalogLeftRight, "ANALOG_LEFT_RIGHT"),
    (LogicalInput::AnalogLeftLeft, "ANALOG_LEFT_LEFT"),
    (LogicalInput::AnalogLeftUp, "ANALOG_LEFT_UP"),
    (LogicalInput::AnalogLeftDown, "ANALOG_LEFT_DOWN"),
    (LogicalInput::AnalogRightRight, "ANALOG_RIGHT_RIGHT"),
    (LogicalInput::AnalogRightLeft, "ANALOG_RIGHT_LEFT"),
    (LogicalInput::AnalogRightUp, "ANALOG_RIGHT_UP"),
    (LogicalInput::AnalogRightDown, "ANALOG_RIGHT_DOWN"),
    (LogicalInput::DPadRight, "STICK_RIGHT"),
    (LogicalInput::DPadLeft, "STICK_LEFT"),
    (LogicalInput::DPadUp, "STICK_UP"),
    (LogicalInput::DPadDown, "STICK_DOWN"),
    (LogicalInput::A, "A"),
    (LogicalInput::B, "B"),
    (LogicalInput::X, "X"),
    (LogicalInput::Y, "Y"),
    (LogicalInput::Start, "START"),
    (LogicalInput::Select, "SELECT"),
    (LogicalInput::LeftTrigger, "LT"),
    (LogicalInput::LeftBumper, "LB"),
    (LogicalInput::RightTrigger, "RT"),
    (LogicalInput::RightStick, "R3"),
    (LogicalInput::LeftStick, "L3"),
    (LogicalInput::RightBumper, "RB"),
];

impl LogicalInput {
    /// All inputs in display order
    pub fn all() -> impl Iterator<Item = LogicalInput> {
        TAGS.iter().map(|(input, _)| *input)
    }

    /// Wire tag, e.g. `"ANALOG_LEFT_UP"` or `"RT"`
    pub fn tag(self) -> &'static str {
        TAGS.iter()
            .find(|(input, _)| *input == self)
            .map(|(_, tag)| *tag)
            .unwrap_or("UNKNOWN")
    }

    /// Index into the standard button layout, `None` for analog directions.
    pub const fn button_index(self) -> Option<usize> {
        match self {
            LogicalInput::A => Some(0),
            LogicalInput::B => Some(1),
            LogicalInput::X => Some(2),
            LogicalInput::Y => Some(3),
            LogicalInput::LeftBumper => Some(4),
            LogicalInput::RightBumper => Some(5),
            LogicalInput::LeftTrigger => Some(6),
            LogicalInput::RightTrigger => Some(7),
            LogicalInput::Select => Some(8),
            LogicalInput::Start => Some(9),
            LogicalInput::LeftStick => Some(10),
            LogicalInput::RightStick => Some(11),
            LogicalInput::DPadUp => Some(12),
            LogicalInput::DPadDown => Some(13),
            LogicalInput::DPadLeft => Some(14),
            LogicalInput::DPadRight => Some(15),
            _ => None,
        }
    }

    /// The analog direction this input drives, `None` for digital buttons.
    pub const fn analog(self) -> Option<AnalogDirection> {
        use Direction::*;
        use Stick::{Left as L, Right as R};
        match self {
            LogicalInput::AnalogLeftUp => Some(AnalogDirection::new(L, Up)),
            LogicalInput::AnalogLeftDown => Some(AnalogDirection::new(L, Down)),
            LogicalInput::AnalogLeftLeft => Some(AnalogDirection::new(L, Left)),
            LogicalInput::AnalogLeftRight => Some(AnalogDirection::new(L, Right)),
            LogicalInput::AnalogRightUp => Some(AnalogDirection::new(R, Up)),
            LogicalInput::AnalogRightDown => Some(AnalogDirection::new(R, Down)),
            LogicalInput::AnalogRightLeft => Some(AnalogDirection::new(R, Left)),
            LogicalInput::AnalogRightRight => Some(AnalogDirection::new(R, Right)),
            _ => None,
        }
    }

    pub const fn is_analog(self) -> bool {
        self.analog().is_some()
    }

    /// Opposite analog input on the same stick axis; digital inputs have none.
    pub fn opposite(self) -> Option<LogicalInput> {
        self.analog()
            .map(|dir| LogicalInput::from_analog(dir.opposite()))
    }

    pub const fn from_analog(dir: AnalogDirection) -> LogicalInput {
        match (dir.stick, dir.direction) {
            (Stick::Left, Direction::Up) => LogicalInput::AnalogLeftUp,
            (Stick::Left, Direction::Down) => LogicalInput::AnalogLeftDown,
            (Stick::Left, Direction::Left) => LogicalInput::AnalogLeftLeft,
            (Stick::Left, Direction::Right) => LogicalInput::AnalogLeftRight,
            (Stick::Right, Direction::Up) => LogicalInput::AnalogRightUp,
            (Stick::Right, Direction::Down) => LogicalInput::AnalogRightDown,
            (Stick::Right, Direction::Left) => LogicalInput::AnalogRightLeft,
            (Stick::Right, Direction::Right) => LogicalInput::AnalogRightRight,
        }
    }
}

impl Display for LogicalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for LogicalInput {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TAGS.iter()
            .find(|(_, tag)| *tag == s)
            .map(|(input, _)| *input)
            .ok_or_else(|| MappingError::UnknownInput(s.to_string()))
    }
}

impl Serialize for LogicalInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for LogicalInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

//! Virtual controller subsystem
//!
//! Holds the data side of the engine:
//!
//! 1. [`input`] - Logical inputs, opposite pairs and the button layout
//! 2. [`state`] - The controller record handed out to pollers
//! 3. [`analog`] - Direction flags and the stick axis resolver
//! 4. [`device`] - Everything above bundled into the one virtual controller slot
//!
//! # Data flow
//!
//! ```text
//! LogicalInput ──► press/release ──► ControllerState ──► GamepadSnapshot
//!      │                                  ▲
//!      └────► AnalogResolver ── recompute ┘
//! ```

pub mod analog;
pub mod device;
pub mod input;
pub mod state;

pub use analog::{AnalogResolver, Sensitivity};
pub use device::VirtualController;
pub use input::{AnalogDirection, Direction, KeyId, LogicalInput, Stick, BUTTON_COUNT};
pub use state::{ButtonRecord, ControllerProfile, ControllerState, GamepadSnapshot};

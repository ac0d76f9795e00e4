//! Error definitions for the mapping module

use thiserror::Error;

/// Validation failures of mapping and controller arguments.
///
/// None of these are fatal, the engine turns them into a failed command result and
/// leaves its state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// Tag does not name a logical input
    #[error("Unknown controller input: {0}")]
    UnknownInput(String),

    /// Key identifier could not be parsed
    #[error("Invalid key code: {0}")]
    InvalidKeyCode(String),

    #[error("Invalid controller type: {0}. Use: xbox360, xboxone, ps4, ps5")]
    UnknownProfile(String),

    #[error("Unknown stick: {0}. Use: left, right")]
    UnknownStick(String),

    #[error("Button index {0} out of range")]
    ButtonOutOfRange(usize),

    #[error("Axis values must be finite numbers")]
    NonFiniteAxis,
}

//! Command surface of the engine as data.
//!
//! [`Command`] names every operation [`VirtualPad`](super::VirtualPad) offers so a
//! host can drive the engine through a single `execute` entry point. Each command
//! yields a [`Reply`]; mutating commands answer with a [`CommandResult`].

use crate::controller::{ControllerProfile, GamepadSnapshot, KeyId, LogicalInput};
use crate::engine::Status;
use crate::mapping::{KeyMapTable, MappingError, SuppressionScope};
use crate::persistence::ConfigError;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect,
    Disconnect,
    Enable,
    Disable,
    Status,
    SetKeyMapping { key: KeyId, button: String },
    RemoveKeyMapping { key: KeyId },
    KeyMapping { key: KeyId },
    KeyMappings,
    SetKeyMappings { mappings: HashMap<String, String> },
    ResetKeyMappings,
    SetControllerProfile { profile: String },
    ControllerProfile,
    PressButton { index: usize },
    ReleaseButton { index: usize },
    SetAnalogStick { stick: String, x: f64, y: f64 },
    SetSensitivity { value: f64 },
    Sensitivity,
    ExportConfig,
    ImportConfig { json: String },
    SetBlockingPolicy { on: bool },
    IsBlocking,
    SetSuppressionScope { scope: SuppressionScope },
    MappedKeys,
    IsKeyMapped { key: KeyId },
    AvailableButtons,
    ControllerProfiles,
    GetGamepads,
    ResetInputs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Done(CommandResult),
    Status(Box<Status>),
    Mapping(Option<LogicalInput>),
    Mappings(KeyMapTable),
    Profile(ControllerProfile),
    Sensitivity(f64),
    Exported(String),
    Flag(bool),
    Keys(Vec<KeyId>),
    Buttons(Vec<LogicalInput>),
    Profiles(Vec<ControllerProfile>),
    Gamepads(Vec<GamepadSnapshot>),
}

impl Reply {
    /// False only for a failed mutating command
    pub fn is_success(&self) -> bool {
        match self {
            Reply::Done(result) => result.success,
            _ => true,
        }
    }
}

/// Outcome of a mutating command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, CommandError>> for CommandResult {
    fn from(result: Result<String, CommandError>) -> Self {
        match result {
            Ok(message) => CommandResult::ok(message),
            Err(e) => CommandResult::failed(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(MappingError),

    #[error("Invalid mappings object: {0}")]
    InvalidMappings(MappingError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Key mapping not found")]
    MappingNotFound(KeyId),

    #[error("Invalid sensitivity: {0}")]
    InvalidSensitivity(f64),

    #[error(transparent)]
    Import(#[from] ConfigError),

    #[error("Failed to export configuration: {0}")]
    Export(ConfigError),
}

use crate::controller::{ControllerProfile, LogicalInput};
use crate::mapping::KeyMapTable;
use serde::{Deserialize, Serialize};

/// Read-only view of the engine, sent on `apiReady` and `getStatus`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub enabled: bool,
    pub connected: bool,
    pub controller_type: ControllerProfile,
    pub controller_id: String,
    pub sensitivity: f64,
    pub axes: [f64; 4],
    /// Every logical input currently held, digital or analog
    pub pressed_buttons: Vec<LogicalInput>,
    pub key_mappings: KeyMapTable,
    pub block_keyboard_inputs: bool,
}

//! Commands a host process may send over the bridge

use super::BridgeError;
use crate::controller::KeyId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMappingPayload {
    pub key_code: KeyId,
    /// Logical input tag, validated by the engine
    pub button: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerTypePayload {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum BridgeCommand {
    Connect,
    Disconnect,
    SetKeyMapping(KeyMappingPayload),
    SetControllerType(ControllerTypePayload),
    GetStatus,
}

impl BridgeCommand {
    pub fn decode(json: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_unit_commands() {
        assert_eq!(
            BridgeCommand::decode(r#"{"command":"connect"}"#).expect("decode"),
            BridgeCommand::Connect
        );
        assert_eq!(
            BridgeCommand::decode(r#"{"command":"getStatus"}"#).expect("decode"),
            BridgeCommand::GetStatus
        );
    }

    #[test]
    fn test_decode_set_key_mapping() {
        let command =
            BridgeCommand::decode(r#"{"command":"setKeyMapping","data":{"keyCode":32,"button":"A"}}"#)
                .expect("decode");
        assert_eq!(
            command,
            BridgeCommand::SetKeyMapping(KeyMappingPayload {
                key_code: 32,
                button: "A".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_set_controller_type() {
        let command =
            BridgeCommand::decode(r#"{"command":"setControllerType","data":{"type":"ps4"}}"#)
                .expect("decode");
        assert_eq!(
            command,
            BridgeCommand::SetControllerType(ControllerTypePayload {
                kind: "ps4".to_string()
            })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_command() {
        assert!(matches!(
            BridgeCommand::decode(r#"{"command":"selfDestruct"}"#),
            Err(BridgeError::Decode(_))
        ));
        assert!(BridgeCommand::decode("connect").is_err());
    }
}

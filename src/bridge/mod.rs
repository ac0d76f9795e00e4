//! # Bridge Module
//!
//! Mirrors engine activity to a host process and accepts a small command set back.
//! Replaces a broker connection with in-process channels: outbound notifications
//! are wrapped in timestamped [`Envelope`]s, inbound commands arrive as JSON.
//!
//! ## Wire format
//! ```text
//! outbound: { "event": "keyDown", "payload": { "keyCode": 87, "button": "ANALOG_LEFT_UP", "routed": true }, "emittedAt": "..." }
//! inbound:  { "command": "setKeyMapping", "data": { "keyCode": 32, "button": "A" } }
//! ```

pub mod command;

use crate::controller::{ControllerProfile, KeyId, LogicalInput};
use crate::engine::Status;
use crate::mapping::KeyMapTable;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub use command::{BridgeCommand, ControllerTypePayload, KeyMappingPayload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventPayload {
    pub key_code: KeyId,
    pub button: LogicalInput,
    /// Whether the controller state changed
    pub routed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRemovedPayload {
    pub key_code: KeyId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingsPayload {
    pub mappings: KeyMapTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePayload {
    #[serde(rename = "type")]
    pub profile: ControllerProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingPayload {
    pub blocking: bool,
}

/// Everything the engine tells the host process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum Notification {
    KeyDown(KeyEventPayload),
    KeyUp(KeyEventPayload),
    Connected(Ack),
    Disconnected(Ack),
    KeyMappingChanged(KeyMappingPayload),
    KeyMappingRemoved(KeyRemovedPayload),
    KeyMappingsChanged(MappingsPayload),
    ControllerTypeChanged(ProfilePayload),
    BlockingChanged(BlockingPayload),
    ApiReady(Status),
    Status(Status),
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::KeyDown(_) => "keyDown",
            Notification::KeyUp(_) => "keyUp",
            Notification::Connected(_) => "connected",
            Notification::Disconnected(_) => "disconnected",
            Notification::KeyMappingChanged(_) => "keyMappingChanged",
            Notification::KeyMappingRemoved(_) => "keyMappingRemoved",
            Notification::KeyMappingsChanged(_) => "keyMappingsChanged",
            Notification::ControllerTypeChanged(_) => "controllerTypeChanged",
            Notification::BlockingChanged(_) => "blockingChanged",
            Notification::ApiReady(_) => "apiReady",
            Notification::Status(_) => "status",
        }
    }
}

/// Notification stamped with the local time it left the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(flatten)]
    pub notification: Notification,
    pub emitted_at: DateTime<Local>,
}

impl Envelope {
    pub fn now(notification: Notification) -> Self {
        Self {
            notification,
            emitted_at: Local::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outbound half of the bridge. Must never block the engine.
pub trait NotificationSink: Send {
    fn notify(&self, notification: Notification);
}

/// Sink that hands envelopes to a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    tx: mpsc::Sender<Envelope>,
}

impl ChannelBridge {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelBridge {
    fn notify(&self, notification: Notification) {
        let name = notification.name();
        match self.tx.try_send(Envelope::now(notification)) {
            Ok(()) => debug!("Bridge notification sent: {}", name),
            Err(e) => warn!("Dropping bridge notification {}: {}", name, e),
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Malformed bridge message: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_key_event_wire_shape() {
        let notification = Notification::KeyDown(KeyEventPayload {
            key_code: 87,
            button: LogicalInput::AnalogLeftUp,
            routed: true,
        });
        let value = serde_json::to_value(&notification).expect("serialize");
        assert_eq!(
            value,
            json!({
                "event": "keyDown",
                "payload": { "keyCode": 87, "button": "ANALOG_LEFT_UP", "routed": true }
            })
        );
    }

    #[test]
    fn test_profile_change_uses_type_field() {
        let notification = Notification::ControllerTypeChanged(ProfilePayload {
            profile: ControllerProfile::Ps5,
        });
        let value = serde_json::to_value(&notification).expect("serialize");
        assert_eq!(value["event"], "controllerTypeChanged");
        assert_eq!(value["payload"]["type"], "ps5");
    }

    #[test]
    fn test_name_matches_serialized_tag() {
        let notification = Notification::BlockingChanged(BlockingPayload { blocking: false });
        let value = serde_json::to_value(&notification).expect("serialize");
        assert_eq!(value["event"], notification.name());
    }

    #[test]
    fn test_envelope_is_flat() {
        let envelope = Envelope::now(Notification::Connected(Ack { success: true }));
        let json = envelope.to_json().expect("serialize");
        let value: Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["event"], "connected");
        assert_eq!(value["payload"]["success"], true);
        assert!(value["emittedAt"].is_string());
    }

    #[tokio::test]
    async fn test_channel_bridge_delivers_in_order() {
        let (bridge, mut rx) = ChannelBridge::new(8);
        bridge.notify(Notification::Connected(Ack { success: true }));
        bridge.notify(Notification::Disconnected(Ack { success: true }));

        let first = rx.recv().await.expect("first");
        let second = rx.recv().await.expect("second");
        assert_eq!(first.notification.name(), "connected");
        assert_eq!(second.notification.name(), "disconnected");
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (bridge, mut rx) = ChannelBridge::new(1);
        bridge.notify(Notification::Connected(Ack { success: true }));
        bridge.notify(Notification::Disconnected(Ack { success: true }));

        let only = rx.try_recv().expect("one envelope");
        assert_eq!(only.notification.name(), "connected");
        assert!(rx.try_recv().is_err());
    }
}

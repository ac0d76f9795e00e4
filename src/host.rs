//! Seams towards the host application.
//!
//! The engine never talks to a window system directly. It asks the host to attach
//! or detach its key listeners, hands it gamepad connection events and, while the
//! override is not installed, forwards enumeration to the host's own source.

use crate::controller::GamepadSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, info};

/// Hardware-style connection events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamepadEventKind {
    #[serde(rename = "gamepadconnected")]
    Connected,
    #[serde(rename = "gamepaddisconnected")]
    Disconnected,
}

/// Event dispatched to the host page, carrying the controller record like hardware does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamepadEvent {
    #[serde(rename = "type")]
    pub kind: GamepadEventKind,
    pub gamepad: GamepadSnapshot,
}

/// The page the virtual controller lives in
pub trait HostPage: Send {
    /// Starts delivering key events (capture phase) to the engine.
    fn attach_key_listeners(&mut self);

    fn detach_key_listeners(&mut self);

    fn dispatch_gamepad_event(&mut self, event: GamepadEvent);
}

/// The host's own controller enumeration
pub trait GamepadSource: Send + Sync + Debug {
    fn enumerate(&self) -> Vec<GamepadSnapshot>;
}

/// Enumeration source of a host without controllers
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHardware;

impl GamepadSource for NoHardware {
    fn enumerate(&self) -> Vec<GamepadSnapshot> {
        Vec::new()
    }
}

/// Host page that only logs what it is asked to do
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHost;

impl HostPage for LoggingHost {
    fn attach_key_listeners(&mut self) {
        debug!("Host key listeners attached");
    }

    fn detach_key_listeners(&mut self) {
        debug!("Host key listeners detached");
    }

    fn dispatch_gamepad_event(&mut self, event: GamepadEvent) {
        info!("Host received {:?} for '{}'", event.kind, event.gamepad.id);
    }
}

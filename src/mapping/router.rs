//! Key event routing
//!
//! Turns physical key-down/key-up signals into controller mutations and decides
//! whether the host should still see the key.
//!
//! # Per-key state machine
//!
//! ```text
//!           key-down (mapped, routing enabled)
//!   Idle ───────────────────────────────────────► Active(input)
//!    ▲                                               │
//!    └──────────────────── key-up ───────────────────┘
//! ```
//!
//! Transitions are keyed by the physical key. The controller slot (button record or
//! direction flag) is shared, so releasing one of two keys that drive the same input
//! releases the input.

use crate::controller::input::{KeyId, LogicalInput};
use crate::controller::VirtualController;
use crate::mapping::KeyMapTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// When the blocking policy hides mapped keys from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuppressionScope {
    /// Mapped keys are hidden whenever blocking is on, even while disconnected
    #[default]
    Always,
    /// Mapped keys are hidden only while input is being routed
    WhileActive,
}

/// What the host should do with the key event after routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    PassThrough,
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyPhase {
    Down,
    Up,
}

/// Engine flags the router needs for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingGate {
    pub enabled: bool,
    pub connected: bool,
    pub blocking: bool,
    pub scope: SuppressionScope,
}

impl RoutingGate {
    /// Routing requires both flags; `enabled` alone has no observable effect.
    pub fn routing(&self) -> bool {
        self.enabled && self.connected
    }

    fn suppresses(&self) -> bool {
        match self.scope {
            SuppressionScope::Always => self.blocking,
            SuppressionScope::WhileActive => self.blocking && self.routing(),
        }
    }
}

/// Result of routing one key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub disposition: KeyDisposition,
    /// Logical input the key resolved to; `None` for unmapped keys
    pub input: Option<LogicalInput>,
    /// Whether the controller was mutated
    pub routed: bool,
    /// Whether observers should hear about this event
    pub notify: bool,
}

impl RouteOutcome {
    fn ignored() -> Self {
        Self {
            disposition: KeyDisposition::PassThrough,
            input: None,
            routed: false,
            notify: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputRouter {
    // Keys currently held, with the input they drove at key-down
    active: HashMap<KeyId, LogicalInput>,
    listeners_attached: bool,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners_attached
    }

    /// Marks the host key listeners as attached. Returns false if they already were.
    pub fn attach(&mut self) -> bool {
        if self.listeners_attached {
            return false;
        }
        info!("Key listeners attached");
        self.listeners_attached = true;
        true
    }

    /// Marks the host key listeners as detached. Returns false if they already were.
    pub fn detach(&mut self) -> bool {
        if !self.listeners_attached {
            return false;
        }
        info!("Key listeners detached");
        self.listeners_attached = false;
        true
    }

    pub fn is_active(&self, key: KeyId) -> bool {
        self.active.contains_key(&key)
    }

    pub fn active_keys(&self) -> usize {
        self.active.len()
    }

    /// Forgets every held key without touching the controller.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn key_down(
        &mut self,
        key: KeyId,
        keymap: &KeyMapTable,
        gate: RoutingGate,
        pad: &mut VirtualController,
    ) -> RouteOutcome {
        if !self.listeners_attached {
            return RouteOutcome::ignored();
        }
        let Some(input) = keymap.lookup(key) else {
            return RouteOutcome::ignored();
        };
        let disposition = disposition(gate);

        if !gate.routing() {
            debug!("Key {} ({}) down while routing is disabled", key, input);
            return RouteOutcome {
                disposition,
                input: Some(input),
                routed: false,
                notify: true,
            };
        }

        if self.active.contains_key(&key) {
            // Auto-repeat: reported, not re-applied
            return RouteOutcome {
                disposition,
                input: Some(input),
                routed: false,
                notify: true,
            };
        }

        self.active.insert(key, input);
        pad.press_input(input);
        debug!("Key {} down -> {}", key, input);

        RouteOutcome {
            disposition,
            input: Some(input),
            routed: true,
            notify: true,
        }
    }

    pub fn key_up(
        &mut self,
        key: KeyId,
        keymap: &KeyMapTable,
        gate: RoutingGate,
        pad: &mut VirtualController,
    ) -> RouteOutcome {
        if !self.listeners_attached {
            return RouteOutcome::ignored();
        }

        // The input pressed at key-down wins over a mapping changed in between
        let held = self.active.remove(&key);
        let Some(input) = held.or_else(|| keymap.lookup(key)) else {
            return RouteOutcome::ignored();
        };
        let disposition = disposition(gate);

        if !gate.routing() {
            debug!("Key {} ({}) up while routing is disabled", key, input);
            return RouteOutcome {
                disposition,
                input: Some(input),
                routed: false,
                notify: true,
            };
        }

        pad.release_input(input);
        debug!("Key {} up -> {}", key, input);

        RouteOutcome {
            disposition,
            input: Some(input),
            routed: true,
            notify: true,
        }
    }
}

fn disposition(gate: RoutingGate) -> KeyDisposition {
    if gate.suppresses() {
        KeyDisposition::Suppress
    } else {
        KeyDisposition::PassThrough
    }
}

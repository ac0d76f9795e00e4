//! Startup sequence for the engine using a statum state machine
//!
//! ```text
//! Loading ──load()──► Configured(Configuration) ──launch()──► VirtualPad
//! ```
//!
//! Loading never fails: a missing or unreadable saved configuration falls back to
//! the defaults, so the engine always comes up.

use crate::bridge::NotificationSink;
use crate::engine::VirtualPad;
use crate::host::{GamepadSource, HostPage};
use crate::persistence::{ConfigStore, Configuration};
use statum::{machine, state};
use std::sync::Arc;
use tracing::{info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum LaunchState {
    Loading,                   // Collaborators wired, nothing read yet
    Configured(Configuration), // Saved settings merged over defaults
}

#[machine]
pub struct Launcher<S: LaunchState> {
    host: Box<dyn HostPage>,
    store: Box<dyn ConfigStore>,
    source: Arc<dyn GamepadSource>,
    bridge: Option<Box<dyn NotificationSink>>,
}

impl Launcher<Loading> {
    pub fn create(
        host: Box<dyn HostPage>,
        store: Box<dyn ConfigStore>,
        source: Arc<dyn GamepadSource>,
        bridge: Option<Box<dyn NotificationSink>>,
    ) -> Self {
        info!("Preparing virtual pad launch");
        Self::new(host, store, source, bridge)
    }

    /// Reads the saved configuration and transitions to Configured
    pub fn load(self) -> Launcher<Configured> {
        let config = match self.store.load() {
            Ok(Some(config)) => {
                info!("Restored saved configuration");
                config
            }
            Ok(None) => {
                info!("No saved configuration, using defaults");
                Configuration::default()
            }
            Err(e) => {
                warn!("Failed to load configuration, using defaults: {}", e);
                Configuration::default()
            }
        };
        self.transition_with(config)
    }
}

impl Launcher<Configured> {
    pub fn config(&self) -> Option<&Configuration> {
        self.get_state_data()
    }

    /// Builds the engine and restores listeners and connection from the configuration
    pub fn launch(self) -> VirtualPad {
        let config = self.get_state_data().cloned().unwrap_or_default();
        let connected = config.connected;
        let pad = VirtualPad::new(config, self.host, self.store, self.source, self.bridge);
        pad.start(connected)
    }
}

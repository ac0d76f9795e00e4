//! # Engine Module
//!
//! [`VirtualPad`] ties the virtual controller, key table, router and enumeration
//! override together and owns the connection lifecycle. Collaborators (host page,
//! persistence, bridge) are trait objects handed in at construction; the engine
//! calls them fire-and-forget and never waits on them.
//!
//! ## Lifecycle
//!
//! ```text
//!                 connect()                         enable()
//!   Disconnected ───────────► Connected ◄──────────────────────► Connected+Enabled
//!        ▲                        │                 disable()        (routing)
//!        └────── disconnect() ────┘
//! ```
//!
//! Startup goes through [`launcher::Launcher`], which loads the saved configuration
//! and restores listeners and the connection before announcing `apiReady`.

pub mod command;
pub mod launcher;
pub mod status;

use crate::bridge::{
    Ack, BlockingPayload, BridgeCommand, KeyEventPayload, KeyMappingPayload, KeyRemovedPayload,
    MappingsPayload, Notification, NotificationSink, ProfilePayload,
};
use crate::controller::{
    ControllerProfile, GamepadSnapshot, KeyId, LogicalInput, Sensitivity, Stick,
    VirtualController,
};
use crate::enumeration::EnumerationOverride;
use crate::host::{GamepadEvent, GamepadEventKind, GamepadSource, HostPage};
use crate::mapping::{
    InputRouter, KeyDisposition, KeyMapTable, KeyPhase, MappingError, RoutingGate,
    SuppressionScope,
};
use crate::persistence::{ConfigStore, Configuration};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use command::{Command, CommandError, CommandResult, Reply};
pub use launcher::{LaunchState, Launcher};
pub use status::Status;

pub struct VirtualPad {
    config: Configuration,
    controller: VirtualController,
    router: InputRouter,
    enumeration: EnumerationOverride,
    host: Box<dyn HostPage>,
    store: Box<dyn ConfigStore>,
    bridge: Option<Box<dyn NotificationSink>>,
}

impl VirtualPad {
    /// Builds a disconnected engine around `config` without touching the host yet.
    ///
    /// A saved `connected` flag is not trusted here; [`Launcher`] restores the
    /// connection through [`VirtualPad::connect`].
    pub fn new(
        mut config: Configuration,
        host: Box<dyn HostPage>,
        store: Box<dyn ConfigStore>,
        source: Arc<dyn GamepadSource>,
        bridge: Option<Box<dyn NotificationSink>>,
    ) -> Self {
        config.connected = false;
        let controller = VirtualController::new(config.controller_type, config.sensitivity);
        Self {
            config,
            controller,
            router: InputRouter::new(),
            enumeration: EnumerationOverride::new(source),
            host,
            store,
            bridge,
        }
    }

    /// Restores listeners and connection from the configuration, then announces readiness.
    pub(crate) fn start(mut self, connected: bool) -> Self {
        if self.config.block_keyboard_inputs || connected {
            self.attach_listeners();
        }
        if connected {
            self.connect();
        }
        let status = self.status();
        self.notify(Notification::ApiReady(status));
        info!("Virtual pad ready ({})", self.config.controller_type);
        self
    }

    // ---- lifecycle ----

    pub fn connect(&mut self) -> CommandResult {
        self.config.connected = true;
        if self.enumeration.is_installed() {
            debug!("Connect requested while already connected");
            return CommandResult::ok("Fake gamepad already connected");
        }

        self.attach_listeners();
        self.enumeration.install();
        self.controller.set_connected(true);
        self.host.dispatch_gamepad_event(GamepadEvent {
            kind: GamepadEventKind::Connected,
            gamepad: self.controller.snapshot(),
        });
        self.notify(Notification::Connected(Ack { success: true }));
        self.persist();

        info!("Fake gamepad connected");
        CommandResult::ok("Fake gamepad connected")
    }

    pub fn disconnect(&mut self) -> CommandResult {
        self.config.connected = false;
        if !self.enumeration.is_installed() {
            debug!("Disconnect requested while not connected");
            self.persist();
            return CommandResult::ok("Fake gamepad already disconnected");
        }

        self.controller.set_connected(false);
        self.host.dispatch_gamepad_event(GamepadEvent {
            kind: GamepadEventKind::Disconnected,
            gamepad: self.controller.snapshot(),
        });
        self.enumeration.uninstall();
        if !self.config.block_keyboard_inputs {
            self.detach_listeners();
        }
        self.notify(Notification::Disconnected(Ack { success: true }));
        self.persist();

        info!("Fake gamepad disconnected");
        CommandResult::ok("Fake gamepad disconnected")
    }

    pub fn enable(&mut self) -> CommandResult {
        self.config.enabled = true;
        self.persist();
        info!("Input processing enabled");
        CommandResult::ok("Input processing enabled")
    }

    pub fn disable(&mut self) -> CommandResult {
        self.config.enabled = false;
        self.persist();
        info!("Input processing disabled");
        CommandResult::ok("Input processing disabled")
    }

    pub fn set_blocking_policy(&mut self, on: bool) -> CommandResult {
        self.config.block_keyboard_inputs = on;
        if on {
            self.attach_listeners();
        } else if !self.config.connected && !self.config.enabled {
            self.detach_listeners();
        }
        self.notify(Notification::BlockingChanged(BlockingPayload { blocking: on }));
        self.persist();

        let message = if on {
            "Keyboard input blocking enabled"
        } else {
            "Keyboard input blocking disabled"
        };
        info!("{}", message);
        CommandResult::ok(message)
    }

    pub fn is_blocking(&self) -> bool {
        self.config.block_keyboard_inputs
    }

    pub fn set_suppression_scope(&mut self, scope: SuppressionScope) -> CommandResult {
        self.config.suppression_scope = scope;
        self.persist();
        info!("Suppression scope set to {:?}", scope);
        CommandResult::ok(format!("Suppression scope set to {:?}", scope))
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_connected(&self) -> bool {
        self.config.connected
    }

    // ---- key events ----

    /// Routes one physical key event and tells the host whether to keep it.
    pub fn handle_key(&mut self, phase: KeyPhase, key: KeyId) -> KeyDisposition {
        let gate = self.gate();
        let outcome = match phase {
            KeyPhase::Down => self.router.key_down(
                key,
                &self.config.key_mappings,
                gate,
                &mut self.controller,
            ),
            KeyPhase::Up => {
                self.router
                    .key_up(key, &self.config.key_mappings, gate, &mut self.controller)
            }
        };

        if let (true, Some(input)) = (outcome.notify, outcome.input) {
            let payload = KeyEventPayload {
                key_code: key,
                button: input,
                routed: outcome.routed,
            };
            self.notify(match phase {
                KeyPhase::Down => Notification::KeyDown(payload),
                KeyPhase::Up => Notification::KeyUp(payload),
            });
        }
        outcome.disposition
    }

    // ---- key mappings ----

    pub fn set_key_mapping(&mut self, key: KeyId, button: &str) -> CommandResult {
        let result = self
            .config
            .key_mappings
            .set_tag(key, button)
            .map_err(CommandError::InvalidParameters)
            .map(|input| {
                self.notify(Notification::KeyMappingChanged(KeyMappingPayload {
                    key_code: key,
                    button: input.tag().to_string(),
                }));
                self.persist();
                format!("Key {} mapped to {}", key, input)
            });
        self.finish("set_key_mapping", result)
    }

    pub fn remove_key_mapping(&mut self, key: KeyId) -> CommandResult {
        let result = if self.config.key_mappings.remove(key) {
            self.notify(Notification::KeyMappingRemoved(KeyRemovedPayload {
                key_code: key,
            }));
            self.persist();
            Ok(format!("Key mapping removed for {}", key))
        } else {
            Err(CommandError::MappingNotFound(key))
        };
        self.finish("remove_key_mapping", result)
    }

    pub fn key_mapping(&self, key: KeyId) -> Option<LogicalInput> {
        self.config.key_mappings.lookup(key)
    }

    pub fn key_mappings(&self) -> &KeyMapTable {
        &self.config.key_mappings
    }

    /// Replaces the whole table. Nothing changes if any entry is invalid.
    pub fn set_key_mappings(&mut self, mappings: &HashMap<String, String>) -> CommandResult {
        let result = KeyMapTable::from_tags(mappings.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(CommandError::InvalidMappings)
            .map(|table| {
                self.config.key_mappings.replace_all(table);
                self.notify_mappings();
                self.persist();
                "Key mappings updated".to_string()
            });
        self.finish("set_key_mappings", result)
    }

    pub fn reset_key_mappings(&mut self) -> CommandResult {
        self.config.key_mappings.reset_to_defaults();
        self.notify_mappings();
        self.persist();
        info!("Key mappings reset to defaults");
        CommandResult::ok("Key mappings reset to defaults")
    }

    pub fn mapped_keys(&self) -> Vec<KeyId> {
        self.config.key_mappings.keys()
    }

    pub fn is_key_mapped(&self, key: KeyId) -> bool {
        self.config.key_mappings.contains(key)
    }

    pub fn available_buttons(&self) -> Vec<LogicalInput> {
        LogicalInput::all().collect()
    }

    // ---- controller ----

    pub fn set_controller_profile(&mut self, name: &str) -> CommandResult {
        let result = name
            .parse::<ControllerProfile>()
            .map_err(CommandError::from)
            .map(|profile| {
                self.config.controller_type = profile;
                self.controller.set_profile(profile);
                self.notify(Notification::ControllerTypeChanged(ProfilePayload { profile }));
                self.persist();
                format!("Controller type set to {}", profile)
            });
        self.finish("set_controller_profile", result)
    }

    pub fn controller_profile(&self) -> ControllerProfile {
        self.config.controller_type
    }

    pub fn controller_profiles(&self) -> Vec<ControllerProfile> {
        ControllerProfile::ALL.to_vec()
    }

    pub fn press_button(&mut self, index: usize) -> CommandResult {
        let result = if self.controller.press_button(index) {
            Ok(format!("Button {} pressed", index))
        } else {
            Err(MappingError::ButtonOutOfRange(index).into())
        };
        self.finish("press_button", result)
    }

    pub fn release_button(&mut self, index: usize) -> CommandResult {
        let result = if self.controller.release_button(index) {
            Ok(format!("Button {} released", index))
        } else {
            Err(MappingError::ButtonOutOfRange(index).into())
        };
        self.finish("release_button", result)
    }

    /// Positions a stick directly. Values are scaled by the sensitivity and clamped.
    pub fn set_analog_stick(&mut self, stick: &str, x: f64, y: f64) -> CommandResult {
        let result = if !x.is_finite() || !y.is_finite() {
            Err(MappingError::NonFiniteAxis.into())
        } else {
            stick
                .parse::<Stick>()
                .map_err(CommandError::from)
                .map(|parsed| {
                    self.controller.set_stick(parsed, x, y);
                    format!("{} stick set to ({}, {})", parsed, x, y)
                })
        };
        self.finish("set_analog_stick", result)
    }

    pub fn set_sensitivity(&mut self, value: f64) -> CommandResult {
        if !value.is_finite() {
            return self.finish("set_sensitivity", Err(CommandError::InvalidSensitivity(value)));
        }
        let sensitivity = Sensitivity::new(value);
        self.config.sensitivity = sensitivity;
        self.controller.set_sensitivity(sensitivity);
        self.persist();
        info!("Sensitivity set to {}", sensitivity.get());
        CommandResult::ok(format!("Sensitivity set to {}", sensitivity.get()))
    }

    pub fn sensitivity(&self) -> f64 {
        self.controller.sensitivity().get()
    }

    /// Releases every held input and forgets which keys are down.
    pub fn reset_inputs(&mut self) -> CommandResult {
        self.controller.reset();
        self.router.clear();
        info!("All inputs reset");
        CommandResult::ok("All inputs reset")
    }

    pub fn controller(&self) -> &VirtualController {
        &self.controller
    }

    /// What a page enumerating controllers would see right now
    pub fn get_gamepads(&self) -> Vec<GamepadSnapshot> {
        self.enumeration.enumerate(self.controller.state())
    }

    pub fn enumeration(&self) -> &EnumerationOverride {
        &self.enumeration
    }

    // ---- configuration ----

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn export_config(&self) -> Result<String, CommandError> {
        self.config.to_json().map_err(CommandError::Export)
    }

    /// Merges a JSON document over the current configuration and applies the result.
    ///
    /// Malformed documents leave everything untouched.
    pub fn import_config(&mut self, json: &str) -> CommandResult {
        let imported = match self.config.merged_with(json) {
            Ok(imported) => imported,
            Err(e) => return self.finish("import_config", Err(e.into())),
        };
        self.apply_config(imported);
        info!("Configuration imported successfully");
        CommandResult::ok("Configuration imported successfully")
    }

    fn apply_config(&mut self, imported: Configuration) {
        let was_connected = self.enumeration.is_installed();
        let profile_changed = imported.controller_type != self.config.controller_type;
        let mappings_changed = imported.key_mappings != self.config.key_mappings;
        let blocking_changed =
            imported.block_keyboard_inputs != self.config.block_keyboard_inputs;

        self.config.enabled = imported.enabled;
        self.config.suppression_scope = imported.suppression_scope;
        self.config.key_mappings = imported.key_mappings;
        self.config.controller_type = imported.controller_type;
        self.controller.set_profile(imported.controller_type);
        self.config.sensitivity = imported.sensitivity;
        self.controller.set_sensitivity(imported.sensitivity);

        if profile_changed {
            self.notify(Notification::ControllerTypeChanged(ProfilePayload {
                profile: imported.controller_type,
            }));
        }
        if mappings_changed {
            self.notify_mappings();
        }

        match (was_connected, imported.connected) {
            (false, true) => {
                self.connect();
            }
            (true, false) => {
                self.config.block_keyboard_inputs = imported.block_keyboard_inputs;
                self.disconnect();
            }
            _ => self.config.connected = imported.connected,
        }
        if blocking_changed {
            self.set_blocking_policy(imported.block_keyboard_inputs);
        }
        self.persist();
    }

    pub fn status(&self) -> Status {
        let state = self.controller.state();
        Status {
            enabled: self.config.enabled,
            connected: self.config.connected,
            controller_type: self.config.controller_type,
            controller_id: state.id().to_string(),
            sensitivity: self.sensitivity(),
            axes: state.axes(),
            pressed_buttons: self.controller.pressed_inputs(),
            key_mappings: self.config.key_mappings.clone(),
            block_keyboard_inputs: self.config.block_keyboard_inputs,
        }
    }

    // ---- dispatch ----

    pub fn execute(&mut self, command: Command) -> Reply {
        debug!("Executing {:?}", command);
        match command {
            Command::Connect => Reply::Done(self.connect()),
            Command::Disconnect => Reply::Done(self.disconnect()),
            Command::Enable => Reply::Done(self.enable()),
            Command::Disable => Reply::Done(self.disable()),
            Command::Status => Reply::Status(Box::new(self.status())),
            Command::SetKeyMapping { key, button } => {
                Reply::Done(self.set_key_mapping(key, &button))
            }
            Command::RemoveKeyMapping { key } => Reply::Done(self.remove_key_mapping(key)),
            Command::KeyMapping { key } => Reply::Mapping(self.key_mapping(key)),
            Command::KeyMappings => Reply::Mappings(self.key_mappings().clone()),
            Command::SetKeyMappings { mappings } => {
                Reply::Done(self.set_key_mappings(&mappings))
            }
            Command::ResetKeyMappings => Reply::Done(self.reset_key_mappings()),
            Command::SetControllerProfile { profile } => {
                Reply::Done(self.set_controller_profile(&profile))
            }
            Command::ControllerProfile => Reply::Profile(self.controller_profile()),
            Command::PressButton { index } => Reply::Done(self.press_button(index)),
            Command::ReleaseButton { index } => Reply::Done(self.release_button(index)),
            Command::SetAnalogStick { stick, x, y } => {
                Reply::Done(self.set_analog_stick(&stick, x, y))
            }
            Command::SetSensitivity { value } => Reply::Done(self.set_sensitivity(value)),
            Command::Sensitivity => Reply::Sensitivity(self.sensitivity()),
            Command::ExportConfig => match self.export_config() {
                Ok(json) => Reply::Exported(json),
                Err(e) => Reply::Done(self.finish("export_config", Err(e))),
            },
            Command::ImportConfig { json } => Reply::Done(self.import_config(&json)),
            Command::SetBlockingPolicy { on } => Reply::Done(self.set_blocking_policy(on)),
            Command::IsBlocking => Reply::Flag(self.is_blocking()),
            Command::SetSuppressionScope { scope } => {
                Reply::Done(self.set_suppression_scope(scope))
            }
            Command::MappedKeys => Reply::Keys(self.mapped_keys()),
            Command::IsKeyMapped { key } => Reply::Flag(self.is_key_mapped(key)),
            Command::AvailableButtons => Reply::Buttons(self.available_buttons()),
            Command::ControllerProfiles => Reply::Profiles(self.controller_profiles()),
            Command::GetGamepads => Reply::Gamepads(self.get_gamepads()),
            Command::ResetInputs => Reply::Done(self.reset_inputs()),
        }
    }

    /// Applies a command received over the bridge. `getStatus` answers with a
    /// `status` notification.
    pub fn handle_bridge_command(&mut self, command: BridgeCommand) -> CommandResult {
        match command {
            BridgeCommand::Connect => self.connect(),
            BridgeCommand::Disconnect => self.disconnect(),
            BridgeCommand::SetKeyMapping(payload) => {
                self.set_key_mapping(payload.key_code, &payload.button)
            }
            BridgeCommand::SetControllerType(payload) => {
                self.set_controller_profile(&payload.kind)
            }
            BridgeCommand::GetStatus => {
                let status = self.status();
                self.notify(Notification::Status(status));
                CommandResult::ok("Status sent")
            }
        }
    }

    // ---- internals ----

    fn gate(&self) -> RoutingGate {
        RoutingGate {
            enabled: self.config.enabled,
            connected: self.config.connected,
            blocking: self.config.block_keyboard_inputs,
            scope: self.config.suppression_scope,
        }
    }

    fn attach_listeners(&mut self) {
        if self.router.attach() {
            self.host.attach_key_listeners();
        }
    }

    fn detach_listeners(&mut self) {
        if self.router.detach() {
            self.host.detach_key_listeners();
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(bridge) = &self.bridge {
            bridge.notify(notification);
        }
    }

    fn notify_mappings(&self) {
        self.notify(Notification::KeyMappingsChanged(MappingsPayload {
            mappings: self.config.key_mappings.clone(),
        }));
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.config) {
            warn!("Failed to save configuration: {}", e);
        }
    }

    fn finish(&self, operation: &str, result: Result<String, CommandError>) -> CommandResult {
        match &result {
            Ok(message) => info!("{}", message),
            Err(e) => warn!("{} rejected: {}", operation, e),
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoHardware;
    use crate::persistence::MemoryStore;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum HostCall {
        Attach,
        Detach,
        Event(GamepadEventKind),
    }

    #[derive(Clone, Default)]
    struct RecordingHost(Arc<Mutex<Vec<HostCall>>>);

    impl HostPage for RecordingHost {
        fn attach_key_listeners(&mut self) {
            self.0.lock().expect("lock").push(HostCall::Attach);
        }

        fn detach_key_listeners(&mut self) {
            self.0.lock().expect("lock").push(HostCall::Detach);
        }

        fn dispatch_gamepad_event(&mut self, event: GamepadEvent) {
            self.0.lock().expect("lock").push(HostCall::Event(event.kind));
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<Notification>>>);

    impl RecordingSink {
        fn names(&self) -> Vec<&'static str> {
            self.0.lock().expect("lock").iter().map(|n| n.name()).collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, notification: Notification) {
            self.0.lock().expect("lock").push(notification);
        }
    }

    struct Fixture {
        pad: VirtualPad,
        host: RecordingHost,
        sink: RecordingSink,
        store: MemoryStore,
    }

    fn fixture(config: Configuration) -> Fixture {
        let host = RecordingHost::default();
        let sink = RecordingSink::default();
        let store = MemoryStore::new();
        let pad = VirtualPad::new(
            config,
            Box::new(host.clone()),
            Box::new(store.clone()),
            Arc::new(NoHardware),
            Some(Box::new(sink.clone())),
        );
        Fixture {
            pad,
            host,
            sink,
            store,
        }
    }

    fn active() -> Fixture {
        let mut f = fixture(Configuration::default());
        f.pad.connect();
        f.pad.enable();
        f
    }

    #[test]
    fn test_connect_installs_override_and_dispatches_event() {
        let mut f = fixture(Configuration::default());
        let result = f.pad.connect();
        assert!(result.success);
        assert_eq!(result.message, "Fake gamepad connected");
        assert!(f.pad.is_connected());
        assert_eq!(f.pad.get_gamepads().len(), 1);
        assert!(f.pad.get_gamepads()[0].connected);
        assert_eq!(
            *f.host.0.lock().expect("lock"),
            vec![HostCall::Attach, HostCall::Event(GamepadEventKind::Connected)]
        );
        assert_eq!(f.sink.names(), vec!["connected"]);
        assert_eq!(f.store.saved().map(|c| c.connected), Some(true));
    }

    #[test]
    fn test_new_never_reports_a_connection_it_does_not_have() {
        let mut f = fixture(Configuration {
            connected: true,
            enabled: true,
            ..Configuration::default()
        });
        assert_eq!(f.pad.is_connected(), f.pad.enumeration().is_installed());
        assert!(!f.pad.status().connected);

        // Routing stays off until an explicit connect
        f.pad.set_blocking_policy(true);
        f.pad.handle_key(KeyPhase::Down, 32);
        assert!(!f.pad.controller().state().buttons()[0].pressed);

        assert_eq!(f.pad.connect().message, "Fake gamepad connected");
        assert_eq!(f.pad.is_connected(), f.pad.enumeration().is_installed());
        assert_eq!(f.pad.disconnect().message, "Fake gamepad disconnected");
    }

    #[test]
    fn test_auto_repeat_is_reported_but_not_reapplied() {
        let mut f = active();
        for _ in 0..3 {
            f.pad.handle_key(KeyPhase::Down, 32);
        }
        let downs: Vec<bool> = f
            .sink
            .0
            .lock()
            .expect("lock")
            .iter()
            .filter_map(|n| match n {
                Notification::KeyDown(payload) => Some(payload.routed),
                _ => None,
            })
            .collect();
        assert_eq!(downs, vec![true, false, false]);
        assert!(f.pad.controller().state().buttons()[0].pressed);
    }

    #[test]
    fn test_second_connect_is_silent() {
        let mut f = fixture(Configuration::default());
        f.pad.connect();
        f.pad.connect();
        assert_eq!(f.sink.names(), vec!["connected"]);
    }

    #[test]
    fn test_disconnect_keeps_listeners_while_blocking() {
        let mut f = fixture(Configuration::default());
        f.pad.connect();
        f.pad.disconnect();
        let calls = f.host.0.lock().expect("lock").clone();
        assert!(!calls.contains(&HostCall::Detach));
        assert_eq!(
            calls.last(),
            Some(&HostCall::Event(GamepadEventKind::Disconnected))
        );
        assert!(f.pad.get_gamepads().is_empty());
    }

    #[test]
    fn test_disconnect_detaches_without_blocking() {
        let mut f = fixture(Configuration {
            block_keyboard_inputs: false,
            ..Configuration::default()
        });
        f.pad.connect();
        f.pad.disconnect();
        assert_eq!(
            f.host.0.lock().expect("lock").last(),
            Some(&HostCall::Detach)
        );
    }

    #[test]
    fn test_mapped_key_routes_and_suppresses() {
        let mut f = active();
        assert_eq!(f.pad.handle_key(KeyPhase::Down, 32), KeyDisposition::Suppress);
        let button = f.pad.controller().state().buttons()[0];
        assert!(button.pressed && button.touched);
        assert_eq!(button.value, 1.0);

        f.pad.handle_key(KeyPhase::Up, 32);
        let button = f.pad.controller().state().buttons()[0];
        assert!(!button.pressed && !button.touched);
        assert_eq!(button.value, 0.0);
    }

    #[test]
    fn test_key_events_notify_with_routed_flag() {
        let mut f = fixture(Configuration::default());
        f.pad.set_blocking_policy(true);
        f.pad.handle_key(KeyPhase::Down, 87);

        let last = f.sink.0.lock().expect("lock").last().cloned();
        assert_eq!(
            last,
            Some(Notification::KeyDown(KeyEventPayload {
                key_code: 87,
                button: LogicalInput::AnalogLeftUp,
                routed: false,
            }))
        );
        assert_eq!(f.pad.controller().state().axes(), [0.0; 4]);
    }

    #[test]
    fn test_unmapped_key_passes_silently() {
        let mut f = active();
        let before = f.sink.names().len();
        assert_eq!(f.pad.handle_key(KeyPhase::Down, 999), KeyDisposition::PassThrough);
        assert_eq!(f.sink.names().len(), before);
    }

    #[test]
    fn test_single_direction_scales_with_sensitivity() {
        let mut f = active();
        for value in [0.1, 0.6, 1.0, 1.7, 2.0] {
            f.pad.set_sensitivity(value);
            f.pad.handle_key(KeyPhase::Down, 68);
            assert_eq!(f.pad.controller().state().axes()[0], value.min(1.0));
            f.pad.handle_key(KeyPhase::Up, 68);
            assert_eq!(f.pad.controller().state().axes()[0], 0.0);
        }
    }

    #[test]
    fn test_sensitivity_change_recomputes_held_stick() {
        let mut f = active();
        f.pad.set_sensitivity(0.5);
        f.pad.handle_key(KeyPhase::Down, 83);
        assert_eq!(f.pad.controller().state().axes()[1], 0.5);
        f.pad.set_sensitivity(0.25);
        assert_eq!(f.pad.controller().state().axes()[1], 0.25);
    }

    #[test]
    fn test_invalid_sensitivity_is_rejected() {
        let mut f = fixture(Configuration::default());
        assert!(!f.pad.set_sensitivity(f64::NAN).success);
        assert_eq!(f.pad.sensitivity(), 0.6);
        f.pad.set_sensitivity(5.0);
        assert_eq!(f.pad.sensitivity(), 2.0);
    }

    #[test]
    fn test_set_key_mapping_validates_tag() {
        let mut f = fixture(Configuration::default());
        let ok = f.pad.set_key_mapping(32, "Y");
        assert!(ok.success);
        assert_eq!(ok.message, "Key 32 mapped to Y");
        assert_eq!(f.pad.key_mapping(32), Some(LogicalInput::Y));

        let bad = f.pad.set_key_mapping(32, "TURBO");
        assert!(!bad.success);
        assert!(bad.message.starts_with("Invalid parameters"));
        assert_eq!(f.pad.key_mapping(32), Some(LogicalInput::Y));
    }

    #[test]
    fn test_remove_key_mapping_reports_missing() {
        let mut f = fixture(Configuration::default());
        assert_eq!(f.pad.remove_key_mapping(87).message, "Key mapping removed for 87");
        let missing = f.pad.remove_key_mapping(87);
        assert!(!missing.success);
        assert_eq!(missing.message, "Key mapping not found");
    }

    #[test]
    fn test_set_key_mappings_is_atomic() {
        let mut f = fixture(Configuration::default());
        let mut mappings = HashMap::new();
        mappings.insert("32".to_string(), "A".to_string());
        mappings.insert("33".to_string(), "NOPE".to_string());
        assert!(!f.pad.set_key_mappings(&mappings).success);
        assert_eq!(f.pad.key_mappings(), &KeyMapTable::default_table());

        mappings.remove("33");
        assert!(f.pad.set_key_mappings(&mappings).success);
        assert_eq!(f.pad.mapped_keys(), vec![32]);

        f.pad.reset_key_mappings();
        assert_eq!(f.pad.key_mappings(), &KeyMapTable::default_table());
    }

    #[test]
    fn test_profile_switch_updates_identity() {
        let mut f = fixture(Configuration::default());
        assert!(f.pad.set_controller_profile("ps5").success);
        assert_eq!(f.pad.status().controller_id, ControllerProfile::Ps5.identity());

        let bad = f.pad.set_controller_profile("n64");
        assert!(!bad.success);
        assert_eq!(f.pad.controller_profile(), ControllerProfile::Ps5);
    }

    #[test]
    fn test_button_index_bounds() {
        let mut f = fixture(Configuration::default());
        assert!(f.pad.press_button(16).success);
        assert!(f.pad.controller().state().buttons()[16].pressed);
        assert!(f.pad.release_button(16).success);
        assert!(!f.pad.press_button(17).success);
    }

    #[test]
    fn test_analog_stick_validation() {
        let mut f = fixture(Configuration::default());
        f.pad.set_sensitivity(1.0);
        assert!(f.pad.set_analog_stick("right", 0.5, -0.5).success);
        assert_eq!(f.pad.controller().state().axes(), [0.0, 0.0, 0.5, -0.5]);
        assert!(!f.pad.set_analog_stick("middle", 0.5, 0.5).success);
        assert!(!f.pad.set_analog_stick("left", f64::INFINITY, 0.0).success);
    }

    #[test]
    fn test_blocking_off_detaches_only_when_idle() {
        let mut f = fixture(Configuration::default());
        f.pad.set_blocking_policy(true);
        f.pad.enable();
        f.pad.set_blocking_policy(false);
        assert!(!f.host.0.lock().expect("lock").contains(&HostCall::Detach));

        f.pad.disable();
        f.pad.set_blocking_policy(false);
        assert_eq!(f.host.0.lock().expect("lock").last(), Some(&HostCall::Detach));
    }

    #[test]
    fn test_import_rejects_malformed_without_change() {
        let mut f = fixture(Configuration::default());
        let before = f.pad.configuration().clone();
        let result = f.pad.import_config("{ broken");
        assert!(!result.success);
        assert!(result.message.starts_with("Invalid configuration format"));
        assert_eq!(f.pad.configuration(), &before);
    }

    #[test]
    fn test_import_connects_when_requested() {
        let mut f = fixture(Configuration::default());
        assert!(f.pad.import_config(r#"{ "connected": true }"#).success);
        assert!(f.pad.enumeration().is_installed());
        assert!(f.sink.names().contains(&"connected"));
    }

    #[test]
    fn test_reset_inputs_clears_everything() {
        let mut f = active();
        f.pad.handle_key(KeyPhase::Down, 68);
        f.pad.handle_key(KeyPhase::Down, 32);
        f.pad.reset_inputs();
        assert!(f.pad.status().pressed_buttons.is_empty());
        assert_eq!(f.pad.controller().state().axes(), [0.0; 4]);

        // Key-down after a reset presses again
        f.pad.handle_key(KeyPhase::Down, 32);
        assert!(f.pad.controller().state().buttons()[0].pressed);
    }

    #[test]
    fn test_execute_dispatches_queries() {
        let mut f = fixture(Configuration::default());
        assert_eq!(f.pad.execute(Command::IsKeyMapped { key: 87 }), Reply::Flag(true));
        assert_eq!(f.pad.execute(Command::Sensitivity), Reply::Sensitivity(0.6));
        assert_eq!(
            f.pad.execute(Command::ControllerProfiles),
            Reply::Profiles(ControllerProfile::ALL.to_vec())
        );
        let Reply::Buttons(buttons) = f.pad.execute(Command::AvailableButtons) else {
            panic!("expected buttons");
        };
        assert_eq!(buttons.len(), 24);
        assert!(!f.pad.execute(Command::PressButton { index: 40 }).is_success());
    }

    #[test]
    fn test_bridge_get_status_notifies() {
        let mut f = fixture(Configuration::default());
        assert!(f.pad.handle_bridge_command(BridgeCommand::GetStatus).success);
        assert_eq!(f.sink.names(), vec!["status"]);
    }

    #[test]
    fn test_persistence_failure_is_not_fatal() {
        struct BrokenStore;
        impl ConfigStore for BrokenStore {
            fn load(&self) -> Result<Option<Configuration>, crate::persistence::PersistenceError> {
                Ok(None)
            }
            fn save(&self, _: &Configuration) -> Result<(), crate::persistence::PersistenceError> {
                Err(crate::persistence::PersistenceError::WorkerUnavailable(
                    "offline".to_string(),
                ))
            }
        }

        let mut pad = VirtualPad::new(
            Configuration::default(),
            Box::new(RecordingHost::default()),
            Box::new(BrokenStore),
            Arc::new(NoHardware),
            None,
        );
        assert!(pad.connect().success);
        assert!(pad.is_connected());
    }
}

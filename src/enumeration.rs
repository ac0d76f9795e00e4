//! Controller enumeration override
//!
//! While installed, enumeration answers with exactly one synthetic record. While not
//! installed, calls go to the host's original source, captured once at construction.
//! Installing twice is a no-op, so the original can never be lost behind a wrapper.

use crate::controller::{ControllerState, GamepadSnapshot};
use crate::host::GamepadSource;
use std::sync::Arc;
use tracing::{debug, info};

/// Which source currently answers enumeration calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumerationStrategy {
    Passthrough,
    Synthetic,
}

#[derive(Debug)]
pub struct EnumerationOverride {
    original: Arc<dyn GamepadSource>,
    strategy: EnumerationStrategy,
}

impl EnumerationOverride {
    pub fn new(original: Arc<dyn GamepadSource>) -> Self {
        Self {
            original,
            strategy: EnumerationStrategy::Passthrough,
        }
    }

    /// Switches to the synthetic strategy. Returns false if already installed.
    pub fn install(&mut self) -> bool {
        if self.is_installed() {
            debug!("Enumeration override already installed");
            return false;
        }
        self.strategy = EnumerationStrategy::Synthetic;
        info!("Enumeration override installed");
        true
    }

    /// Switches back to the original source. Returns false if not installed.
    pub fn uninstall(&mut self) -> bool {
        if !self.is_installed() {
            return false;
        }
        self.strategy = EnumerationStrategy::Passthrough;
        info!("Enumeration override removed");
        true
    }

    pub fn is_installed(&self) -> bool {
        self.strategy == EnumerationStrategy::Synthetic
    }

    /// The pristine host source, identical to the one passed at construction
    pub fn original(&self) -> &Arc<dyn GamepadSource> {
        &self.original
    }

    /// The source answering right now, `None` while the synthetic strategy is active
    pub fn active_source(&self) -> Option<&Arc<dyn GamepadSource>> {
        match self.strategy {
            EnumerationStrategy::Passthrough => Some(&self.original),
            EnumerationStrategy::Synthetic => None,
        }
    }

    pub fn enumerate(&self, state: &ControllerState) -> Vec<GamepadSnapshot> {
        match self.strategy {
            EnumerationStrategy::Synthetic => vec![state.snapshot()],
            EnumerationStrategy::Passthrough => self.original.enumerate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerProfile;

    #[derive(Debug)]
    struct FixedSource(Vec<GamepadSnapshot>);

    impl GamepadSource for FixedSource {
        fn enumerate(&self) -> Vec<GamepadSnapshot> {
            self.0.clone()
        }
    }

    fn hardware_pad() -> GamepadSnapshot {
        let mut snapshot = ControllerState::new(ControllerProfile::Ps4).snapshot();
        snapshot.id = "Real Pad".to_string();
        snapshot
    }

    #[test]
    fn test_passthrough_by_default() {
        let source: Arc<dyn GamepadSource> = Arc::new(FixedSource(vec![hardware_pad()]));
        let over = EnumerationOverride::new(source);
        let state = ControllerState::default();
        let pads = over.enumerate(&state);
        assert_eq!(pads.len(), 1);
        assert_eq!(pads[0].id, "Real Pad");
    }

    #[test]
    fn test_synthetic_replaces_hardware() {
        let source: Arc<dyn GamepadSource> =
            Arc::new(FixedSource(vec![hardware_pad(), hardware_pad()]));
        let mut over = EnumerationOverride::new(source);
        assert!(over.install());
        let state = ControllerState::default();
        let pads = over.enumerate(&state);
        assert_eq!(pads, vec![state.snapshot()]);
    }

    #[test]
    fn test_repeated_install_keeps_original() {
        let source: Arc<dyn GamepadSource> = Arc::new(FixedSource(Vec::new()));
        let mut over = EnumerationOverride::new(source.clone());
        for _ in 0..5 {
            assert!(over.install());
            assert!(!over.install());
            assert!(over.active_source().is_none());
            assert!(over.uninstall());
            assert!(!over.uninstall());
            let active = over.active_source().expect("passthrough source");
            assert!(Arc::ptr_eq(active, &source));
        }
    }
}

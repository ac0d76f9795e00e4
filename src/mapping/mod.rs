//! Keyboard to controller mapping.
//!
//! [`key_map`] holds the editable key table, [`router`] applies key events to the
//! virtual controller using that table.

pub mod error;
pub mod key_map;
pub mod router;

// Re-exports for simpler access
pub use error::MappingError;
pub use key_map::KeyMapTable;
pub use router::{
    InputRouter, KeyDisposition, KeyPhase, RouteOutcome, RoutingGate, SuppressionScope,
};

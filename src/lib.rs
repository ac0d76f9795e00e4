//! Virtual gamepad engine.
//!
//! Presents a synthetic standard-layout controller to a host page and drives it from
//! keyboard events. Physical keys map to logical inputs, analog directions resolve
//! into stick axes, and the controller's connection lifecycle is mirrored to the
//! host's enumeration and to an optional messaging bridge.

pub mod bridge;
pub mod controller;
pub mod engine;
pub mod enumeration;
pub mod host;
pub mod mapping;
pub mod persistence;

pub use engine::{Command, CommandResult, Launcher, Reply, Status, VirtualPad};

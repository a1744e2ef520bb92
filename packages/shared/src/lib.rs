//! Shared utilities for Convoy.
//!
//! Wire types exchanged between the relay hub and its clients, plus the
//! logger and time helpers both binaries use.

pub mod logger;
pub mod time;
pub mod wire;

pub use wire::{
    ClientFrame, ControlFrame, ErrorCode, EventType, RelayedEvent, Role, SenderInfo, ServerFrame,
};

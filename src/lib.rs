//! GameJutsu Arbiter — a deterministic dispute arbiter for state-channel
//! board games, with a pluggable checkers rules engine.
//!
//! The arbiter itself never touches a clock, a ledger, or a transport; those
//! are injected collaborators (`collaborators` module) so the state machine
//! in `arbiter` stays a pure, synchronous transformation over `Vec<u8>`
//! state.

pub mod arbiter;
pub mod collaborators;
pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod rules;
pub mod signer;
pub mod types;

pub use error::{ArbiterError, Result};

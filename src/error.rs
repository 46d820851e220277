//! The arbiter's error taxonomy.
//!
//! Flat and closed by design (see `spec.md` §7): every operation fails with
//! exactly one of these variants, and propagation is always an atomic abort
//! with no partial state change, no payouts, and no events.

use thiserror::Error;

/// Result type alias for arbiter operations.
pub type Result<T> = std::result::Result<T, ArbiterError>;

/// The nine ways an arbiter operation can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArbiterError {
    /// Caller or recovered signer is not registered in the target game.
    #[error("address is not a member of game {game_id}")]
    NotAMember { game_id: u64 },

    /// Game is not in the required pre-state for the attempted operation.
    #[error("game {game_id} is in the wrong lifecycle state: expected {expected}, found {found}")]
    WrongLifecycleState {
        game_id: u64,
        expected: &'static str,
        found: &'static str,
    },

    /// Value supplied differs from the required stake or bond.
    #[error("stake mismatch: expected {expected}, supplied {supplied}")]
    StakeMismatch { expected: u128, supplied: u128 },

    /// Decode failure on an opaque payload (truncation, bad length prefix,
    /// or an out-of-range enum tag).
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// Signature does not recover to the claimed mover.
    #[error("signature does not recover to the claimed signer")]
    BadSignature,

    /// The `signed_moves[2]` chaining contract (§4.5) failed.
    #[error("move chain broken: {reason}")]
    ChainBroken { reason: String },

    /// The rules module rejected the move, or its transition result didn't
    /// match the claimed new state.
    #[error("illegal move: {reason}")]
    IllegalMove { reason: String },

    /// `finish_game` was invoked on a non-terminal position.
    #[error("game {game_id} is not in a final position")]
    NotFinal { game_id: u64 },

    /// A timeout operation was attempted against an inconsistent timeout
    /// state (already active, not active, or outside its validity window).
    #[error("timeout conflict for game {game_id}: {reason}")]
    TimeoutConflict { game_id: u64, reason: String },
}

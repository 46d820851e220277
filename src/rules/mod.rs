//! The rules interface (`spec.md` §4.3).
//!
//! An `Arbiter` never interprets game state itself; it only carries opaque
//! `Vec<u8>` and delegates every legality question to whichever `Rules`
//! implementation the game was proposed with. This mirrors the teacher's
//! pluggable game-engine trait, collapsed to four pure, synchronous
//! operations since nothing here needs async dispatch.

pub mod checkers;

use crate::error::Result;

/// Four pure operations a board game plugs in to be arbitrable.
///
/// `transition` is undefined (implementations may panic or return nonsense)
/// if `is_valid_move` would have returned `false` for the same arguments —
/// callers must always check first, per `spec.md` §4.3.
pub trait Rules {
    fn is_valid_move(&self, state_bytes: &[u8], player_id: u8, move_bytes: &[u8]) -> Result<bool>;

    fn transition(&self, state_bytes: &[u8], player_id: u8, move_bytes: &[u8]) -> Result<Vec<u8>>;

    fn is_final(&self, state_bytes: &[u8]) -> Result<bool>;

    fn is_win(&self, state_bytes: &[u8], player_id: u8) -> Result<bool>;

    fn default_initial_state(&self) -> Vec<u8>;
}

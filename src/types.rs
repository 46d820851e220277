//! Core data model (`spec.md` §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// 20-byte opaque identifier of a principal (player or session key).
///
/// Re-exported from `ethers` rather than hand-rolled: it's already the
/// correct width, already `Hash`/`Eq`/`Display`/`Serialize`, and matches the
/// signer module's recovery output type with no conversion glue.
pub type Address = ethers_core::types::Address;

/// Monotonically assigned per-game sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-game move counter. Strictly increases by 1 per accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nonce(pub u64);

impl Nonce {
    pub fn next(self) -> Self {
        Nonce(self.0 + 1)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `GameState` = (game_id, nonce, state_bytes). `state_bytes` is opaque to
/// the arbiter; only the rules module interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub nonce: Nonce,
    pub state_bytes: Vec<u8>,
}

/// `GameMove` = the assertion "from old_state, player plays move, yielding
/// new_state" at the given nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMove {
    pub game_id: GameId,
    pub nonce: Nonce,
    pub player: Address,
    pub old_state_bytes: Vec<u8>,
    pub new_state_bytes: Vec<u8>,
    pub move_bytes: Vec<u8>,
}

/// `SignedGameMove` = (GameMove, ordered signatures). Index 0 is, by
/// convention, the mover's signature; a co-signed move additionally carries
/// the counterparty's signature at index 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedGameMove {
    pub game_move: GameMove,
    pub signatures: Vec<ethers_core::types::Signature>,
}

impl SignedGameMove {
    pub fn mover_signature(&self) -> Option<&ethers_core::types::Signature> {
        self.signatures.first()
    }
}

/// Domain events the arbiter emits. Mirrors `spec.md` §6's event list
/// exactly; field names match the Solidity event signatures so the wire
/// shape stays obvious to anyone cross-referencing the original contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    GameProposed {
        game_id: GameId,
        stake: u128,
        proposer: Address,
    },
    GameStarted {
        game_id: GameId,
        stake: u128,
        players: [Address; 2],
    },
    SessionAddressRegistered {
        game_id: GameId,
        player: Address,
        session_addr: Address,
    },
    PlayerResigned {
        game_id: GameId,
        player: Address,
    },
    PlayerDisqualified {
        game_id: GameId,
        player: Address,
    },
    TimeoutStarted {
        game_id: GameId,
        player: Address,
        nonce: Nonce,
        expires_at: u64,
    },
    GameFinished {
        game_id: GameId,
        winner: Option<Address>,
        loser: Option<Address>,
        is_draw: bool,
    },
}

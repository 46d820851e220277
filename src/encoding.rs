//! Canonical encoding (`spec.md` §4.1).
//!
//! All cross-component payloads share one fixed, deterministic ABI scheme:
//! 32-byte word alignment, static tuples inline, dynamic `bytes`
//! length-prefixed and tail-allocated. Two implementations of this contract
//! must produce byte-identical output, because the bytes are fed straight
//! into the typed-data hash (`src/signer.rs`) — so this module doesn't
//! invent its own wire format, it defers entirely to `ethers::abi`, which
//! already implements Solidity's `abi.encode`/`abi.decode` head/tail scheme.
//!
//! `decode` fails with `ArbiterError::MalformedPayload` on truncation, bad
//! length prefixes, or values that don't fit the narrower type they're
//! decoded into (the same cleanness check `abi.decode` performs in Solidity
//! for sub-word types).

use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::U256;

use crate::error::{ArbiterError, Result};
use crate::types::{GameId, GameMove, GameState, Nonce};

fn malformed(reason: impl Into<String>) -> ArbiterError {
    ArbiterError::MalformedPayload {
        reason: reason.into(),
    }
}

/// Decode a `U256` word into a `u64`, rejecting values that don't fit —
/// this is the "out-of-range enum tag" style check the contract promises.
pub(crate) fn u256_to_u64(value: U256, field: &str) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(malformed(format!("{field} does not fit in 64 bits")));
    }
    Ok(value.as_u64())
}

/// Decode a `U256` word into a `u8`.
pub(crate) fn u256_to_u8(value: U256, field: &str) -> Result<u8> {
    if value > U256::from(u8::MAX) {
        return Err(malformed(format!("{field} does not fit in 8 bits")));
    }
    Ok(value.as_u32() as u8)
}

impl GameState {
    /// `encode(decode(x)) == x` for all valid inputs (`spec.md` §8 property 1).
    pub fn encode(&self) -> Vec<u8> {
        encode(&[
            Token::Uint(U256::from(self.game_id.0)),
            Token::Uint(U256::from(self.nonce.0)),
            Token::Bytes(self.state_bytes.clone()),
        ])
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let tokens = decode(
            &[ParamType::Uint(256), ParamType::Uint(256), ParamType::Bytes],
            data,
        )
        .map_err(|e| malformed(e.to_string()))?;
        let mut tokens = tokens.into_iter();
        let game_id = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u64(v, "game_id")?,
            _ => return Err(malformed("expected game_id word")),
        };
        let nonce = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u64(v, "nonce")?,
            _ => return Err(malformed("expected nonce word")),
        };
        let state_bytes = match tokens.next() {
            Some(Token::Bytes(b)) => b,
            _ => return Err(malformed("expected state_bytes")),
        };
        Ok(GameState {
            game_id: GameId(game_id),
            nonce: Nonce(nonce),
            state_bytes,
        })
    }
}

impl GameMove {
    pub fn encode(&self) -> Vec<u8> {
        encode(&[
            Token::Uint(U256::from(self.game_id.0)),
            Token::Uint(U256::from(self.nonce.0)),
            Token::Address(self.player),
            Token::Bytes(self.old_state_bytes.clone()),
            Token::Bytes(self.new_state_bytes.clone()),
            Token::Bytes(self.move_bytes.clone()),
        ])
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let tokens = decode(
            &[
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Bytes,
                ParamType::Bytes,
                ParamType::Bytes,
            ],
            data,
        )
        .map_err(|e| malformed(e.to_string()))?;
        let mut tokens = tokens.into_iter();
        let game_id = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u64(v, "game_id")?,
            _ => return Err(malformed("expected game_id word")),
        };
        let nonce = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u64(v, "nonce")?,
            _ => return Err(malformed("expected nonce word")),
        };
        let player = match tokens.next() {
            Some(Token::Address(a)) => a,
            _ => return Err(malformed("expected player address")),
        };
        let old_state_bytes = match tokens.next() {
            Some(Token::Bytes(b)) => b,
            _ => return Err(malformed("expected old_state_bytes")),
        };
        let new_state_bytes = match tokens.next() {
            Some(Token::Bytes(b)) => b,
            _ => return Err(malformed("expected new_state_bytes")),
        };
        let move_bytes = match tokens.next() {
            Some(Token::Bytes(b)) => b,
            _ => return Err(malformed("expected move_bytes")),
        };
        Ok(GameMove {
            game_id: GameId(game_id),
            nonce: Nonce(nonce),
            player,
            old_state_bytes,
            new_state_bytes,
            move_bytes,
        })
    }
}

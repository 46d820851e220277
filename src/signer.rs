//! Typed-data signer (`spec.md` §4.2).
//!
//! The domain separator is computed once at construction from the literal
//! values in `spec.md` §6; all implementations intending wire compatibility
//! must use those exact literals, so `DomainParams::game_jutsu()` is the one
//! and only source of truth for them in this crate.

use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, RecoveryMessage, Signature, H256, U256};
use ethers_core::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::error::{ArbiterError, Result};
use crate::types::GameMove;

/// `keccak256("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)")`
fn domain_type_hash() -> [u8; 32] {
    keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)")
}

/// `keccak256("GameMove(uint256 gameId,uint256 nonce,address player,bytes oldState,bytes newState,bytes move)")`
fn game_move_type_hash() -> [u8; 32] {
    keccak256(
        b"GameMove(uint256 gameId,uint256 nonce,address player,bytes oldState,bytes newState,bytes move)",
    )
}

/// EIP-712 domain separator fields, literal per `spec.md` §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainParams {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub salt: H256,
}

impl DomainParams {
    /// The exact literals `spec.md` §6 specifies.
    pub fn game_jutsu() -> Self {
        Self {
            name: "GameJutsu".to_string(),
            version: "0.1".to_string(),
            chain_id: 137,
            verifying_contract: "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
                .parse()
                .expect("literal address is well-formed"),
            salt: "0x920dfa98b3727bbfe860dd7341801f2e2a55cd7f637dea958edfc5df56c35e4d"
                .parse()
                .expect("literal salt is well-formed"),
        }
    }
}

/// Computes domain separators and recovers move signers. Constructed once
/// per arbiter instance; `domain_separator()` never changes afterwards
/// (`spec.md` §5).
#[derive(Debug, Clone)]
pub struct TypedDataSigner {
    domain_separator: [u8; 32],
}

impl TypedDataSigner {
    pub fn new(domain: &DomainParams) -> Self {
        let encoded = encode(&[
            Token::FixedBytes(domain_type_hash().to_vec()),
            Token::FixedBytes(keccak256(domain.name.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(domain.version.as_bytes()).to_vec()),
            Token::Uint(U256::from(domain.chain_id)),
            Token::Address(domain.verifying_contract),
            Token::FixedBytes(domain.salt.as_bytes().to_vec()),
        ]);
        Self {
            domain_separator: keccak256(encoded),
        }
    }

    pub fn domain_separator(&self) -> [u8; 32] {
        self.domain_separator
    }

    /// `hash(GAME_MOVE_TYPEHASH, gameId, nonce, player, hash(oldState), hash(newState), hash(move))`
    fn struct_hash(&self, game_move: &GameMove) -> [u8; 32] {
        let encoded = encode(&[
            Token::FixedBytes(game_move_type_hash().to_vec()),
            Token::Uint(U256::from(game_move.game_id.0)),
            Token::Uint(U256::from(game_move.nonce.0)),
            Token::Address(game_move.player),
            Token::FixedBytes(keccak256(&game_move.old_state_bytes).to_vec()),
            Token::FixedBytes(keccak256(&game_move.new_state_bytes).to_vec()),
            Token::FixedBytes(keccak256(&game_move.move_bytes).to_vec()),
        ]);
        keccak256(encoded)
    }

    /// `hash(0x1901 || domain_separator || struct_hash)`.
    pub fn digest(&self, game_move: &GameMove) -> H256 {
        let struct_hash = self.struct_hash(game_move);
        let mut preimage = Vec::with_capacity(2 + 32 + 32);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(&self.domain_separator);
        preimage.extend_from_slice(&struct_hash);
        H256::from(keccak256(preimage))
    }

    /// Pure, idempotent signature recovery. `BadSignature` on invalid
    /// encoding or a non-recoverable point; secp256k1 with the standard
    /// low-s, `v ∈ {27,28}` normalisation is `Signature`'s own contract.
    pub fn recover(&self, game_move: &GameMove, signature: &Signature) -> Result<Address> {
        let digest = self.digest(game_move);
        signature
            .recover(RecoveryMessage::Hash(digest))
            .map_err(|_| ArbiterError::BadSignature)
    }
}

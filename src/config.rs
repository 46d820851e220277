//! Arbiter configuration.
//!
//! A single serde-derived struct, loaded once at construction time (see
//! `spec.md` §5: `domain_separator` is immutable after construction, and
//! this is where that immutability begins). Compare with the teacher's
//! `config::Config` tree (`network`/`database`/`monitoring`/…) — this one is
//! deliberately small because none of those concerns exist in this crate.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ArbiterError, Result};
use crate::signer::DomainParams;

/// `TIMEOUT_DURATION` from `spec.md` §6.
pub const DEFAULT_TIMEOUT_DURATION_SECS: u64 = 300;

/// `DEFAULT_TIMEOUT_STAKE` from `spec.md` §6 (0.1 ether, in wei).
pub const DEFAULT_TIMEOUT_STAKE_WEI: u128 = 100_000_000_000_000_000;

/// `NUM_PLAYERS` from `spec.md` §6.
pub const NUM_PLAYERS: usize = 2;

/// Tunable arbiter parameters. `Default` reproduces the literal §6 values,
/// including the domain separator fields, exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// How long a stalled opponent has before `finalize_timeout` succeeds.
    pub timeout_duration_secs: u64,
    /// Bond an `init_timeout` caller must post.
    pub default_timeout_stake_wei: u128,
    /// EIP-712 domain separator fields.
    pub domain: DomainParams,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            timeout_duration_secs: DEFAULT_TIMEOUT_DURATION_SECS,
            default_timeout_stake_wei: DEFAULT_TIMEOUT_STAKE_WEI,
            domain: DomainParams::game_jutsu(),
        }
    }
}

impl ArbiterConfig {
    /// Load configuration from a TOML file, falling back to field-level
    /// defaults for anything the file omits.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ArbiterError::MalformedPayload {
                reason: format!("failed to read config file: {e}"),
            }
        })?;
        toml::from_str(&contents).map_err(|e| ArbiterError::MalformedPayload {
            reason: format!("failed to parse config file: {e}"),
        })
    }
}

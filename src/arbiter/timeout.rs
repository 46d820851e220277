//! The timeout sub-machine (`spec.md` §4.6): a stake-backed forced-move
//! timer so a stalling player cannot hold a game hostage indefinitely.

use super::{hash_state, validate_transition, verify_and_chain, verify_mover_signed, Arbiter};
use crate::collaborators::{Clock, EventSink, Ledger};
use crate::error::{ArbiterError, Result};
use crate::types::{Address, Event, GameId, GameMove, SignedGameMove};

/// Persistent per-`game_id` timeout record. `spec.md` §3 models `start_time
/// == 0` as "no active timeout"; this crate instead represents "no active
/// timeout" as the game's absence from `Arbiter::timeouts`, which is
/// equivalent and avoids a sentinel value for a real `u64` clock reading.
///
/// `initiator` is not named in `spec.md`'s data model, but `resolve_timeout`
/// promises the init bond is "returned to the initiator", so some record of
/// who posted it is required; see `DESIGN.md`.
#[derive(Debug, Clone)]
pub struct Timeout {
    pub start_time: u64,
    pub stake: u128,
    pub pending_move: GameMove,
    pub initiator: Address,
}

impl<C: Clock, L: Ledger, E: EventSink> Arbiter<C, L, E> {
    pub fn timeout(&self, game_id: GameId) -> Option<&Timeout> {
        self.timeouts.get(&game_id)
    }

    fn no_active_timeout(game_id: GameId) -> ArbiterError {
        ArbiterError::TimeoutConflict {
            game_id: game_id.0,
            reason: "no active timeout for this game".to_string(),
        }
    }

    /// `init_timeout` (`spec.md` §4.6): posts the fixed bond, verifies the
    /// chained pair exactly as `finish_game` does, and records the position
    /// the stalled opponent is expected to continue from.
    pub fn init_timeout(
        &mut self,
        signed_moves: [SignedGameMove; 2],
        initiator: Address,
    ) -> Result<()> {
        let game_id = GameId(signed_moves[0].game_move.game_id.0);

        let result = (|| {
            let (pending_move, stalling_idx) = {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;
                if self.timeouts.contains_key(&game_id) {
                    return Err(ArbiterError::TimeoutConflict {
                        game_id: game_id.0,
                        reason: "a timeout is already active for this game".to_string(),
                    });
                }
                game.member_index(initiator)
                    .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
                let idx1 = verify_and_chain(game, game_id, &signed_moves, &self.signer)?;
                (signed_moves[1].game_move.clone(), 1 - idx1)
            };

            let stake = self.config.default_timeout_stake_wei;
            self.ledger.escrow(initiator, stake)?;

            let start_time = self.clock.now();
            let expires_at = start_time + self.config.timeout_duration_secs;
            let expected_nonce = pending_move.nonce.next();

            self.timeouts.insert(
                game_id,
                Timeout {
                    start_time,
                    stake,
                    pending_move,
                    initiator,
                },
            );

            let stalling_player = {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.players[stalling_idx as usize]
            };

            self.events.emit(Event::TimeoutStarted {
                game_id,
                player: stalling_player,
                nonce: expected_nonce,
                expires_at,
            });
            Ok(())
        })();

        match &result {
            Ok(()) => tracing::info!(%game_id, %initiator, "init_timeout: ok"),
            Err(e) => tracing::warn!(%game_id, %initiator, error = %e, "init_timeout: failed"),
        }
        result
    }

    /// `resolve_timeout` (`spec.md` §4.6): the stalling player's move
    /// continuing exactly where `pending_move` left off clears the timeout
    /// and returns the bond to whoever posted it.
    pub fn resolve_timeout(&mut self, signed_move: SignedGameMove) -> Result<()> {
        let game_id = GameId(signed_move.game_move.game_id.0);

        let result = (|| {
            let (initiator, bond) = {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;

                let timeout = self
                    .timeouts
                    .get(&game_id)
                    .ok_or_else(|| Self::no_active_timeout(game_id))?;

                let now = self.clock.now();
                if now > timeout.start_time + self.config.timeout_duration_secs {
                    return Err(ArbiterError::TimeoutConflict {
                        game_id: game_id.0,
                        reason: "timeout window has already expired".to_string(),
                    });
                }

                let pending_mover_idx = game
                    .member_index(timeout.pending_move.player)
                    .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
                let expected_idx = 1 - pending_mover_idx;

                let (_, idx) = verify_mover_signed(game, game_id, &signed_move, &self.signer)?;
                if idx != expected_idx {
                    return Err(ArbiterError::TimeoutConflict {
                        game_id: game_id.0,
                        reason: "move is not signed by the expected next mover".to_string(),
                    });
                }

                let gm = &signed_move.game_move;
                if gm.nonce.0 != timeout.pending_move.nonce.0 + 1
                    || hash_state(&gm.old_state_bytes)
                        != hash_state(&timeout.pending_move.new_state_bytes)
                {
                    return Err(ArbiterError::TimeoutConflict {
                        game_id: game_id.0,
                        reason: "move does not continue from the pending position".to_string(),
                    });
                }
                validate_transition(game, game_id, gm, idx)?;

                (timeout.initiator, timeout.stake)
            };

            self.timeouts.remove(&game_id);
            self.ledger.payout(game_id, initiator, bond)?;
            Ok(())
        })();

        match &result {
            Ok(()) => tracing::info!(%game_id, "resolve_timeout: ok"),
            Err(e) => tracing::warn!(%game_id, error = %e, "resolve_timeout: failed"),
        }
        result
    }

    /// `finalize_timeout` (`spec.md` §4.6): past the deadline, disqualifies
    /// the stalling player and awards the opponent the escrow plus the bond.
    pub fn finalize_timeout(&mut self, game_id: GameId) -> Result<()> {
        let result = (|| {
            let (winner, loser, payout_amount) = {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;

                let timeout = self
                    .timeouts
                    .get(&game_id)
                    .ok_or_else(|| Self::no_active_timeout(game_id))?;

                let now = self.clock.now();
                if now <= timeout.start_time + self.config.timeout_duration_secs {
                    return Err(ArbiterError::TimeoutConflict {
                        game_id: game_id.0,
                        reason: "timeout has not yet expired".to_string(),
                    });
                }

                let pending_mover_idx = game
                    .member_index(timeout.pending_move.player)
                    .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
                let stalling_idx = 1 - pending_mover_idx;

                let winner = game.players[pending_mover_idx as usize];
                let loser = game.players[stalling_idx as usize];
                (winner, loser, game.stake + timeout.stake)
            };

            {
                let game = self.games.get_mut(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.finished = true;
            }
            self.timeouts.remove(&game_id);

            self.ledger.payout(game_id, winner, payout_amount)?;
            self.events.emit(Event::PlayerDisqualified {
                game_id,
                player: loser,
            });
            self.events.emit(Event::GameFinished {
                game_id,
                winner: Some(winner),
                loser: Some(loser),
                is_draw: false,
            });
            Ok(())
        })();

        match &result {
            Ok(()) => tracing::info!(%game_id, "finalize_timeout: ok"),
            Err(e) => tracing::warn!(%game_id, error = %e, "finalize_timeout: failed"),
        }
        result
    }
}

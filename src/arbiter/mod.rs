//! The arbiter state machine (`spec.md` §4.5).

pub mod timeout;

use std::collections::HashMap;

use ethers_core::types::Signature;
use ethers_core::utils::keccak256;

use crate::collaborators::{Clock, EventSink, Ledger};
use crate::config::ArbiterConfig;
use crate::error::{ArbiterError, Result};
use crate::rules::Rules;
use crate::signer::TypedDataSigner;
use crate::types::{Address, Event, GameId, GameMove, Nonce, SignedGameMove};

pub use timeout::Timeout;

/// A single arbitrated game (`spec.md` §3).
pub struct Game {
    pub rules: Box<dyn Rules>,
    /// Total wei held in escrow. Starts as the proposer's deposit and grows
    /// to the full pot once the acceptor matches it in `accept_game`.
    pub stake: u128,
    pub players: [Address; 2],
    /// Session keys aliased to a player's membership slot (`spec.md` §9's
    /// "two sets" re-architecture: `players` is the primary set, this map
    /// the session set).
    pub sessions: HashMap<Address, u8>,
    pub started: bool,
    pub finished: bool,
}

impl Game {
    /// Resolves `addr` to its membership slot (0 or 1), preferring the
    /// primary address over any aliased session key.
    pub fn member_index(&self, addr: Address) -> Option<u8> {
        if addr == self.players[0] {
            return Some(0);
        }
        if self.started && addr == self.players[1] {
            return Some(1);
        }
        self.sessions.get(&addr).copied()
    }

    fn require_started(&self, game_id: GameId) -> Result<()> {
        if self.finished {
            return Err(ArbiterError::WrongLifecycleState {
                game_id: game_id.0,
                expected: "Started",
                found: "Finished",
            });
        }
        if !self.started {
            return Err(ArbiterError::WrongLifecycleState {
                game_id: game_id.0,
                expected: "Started",
                found: "Proposed",
            });
        }
        Ok(())
    }
}

fn hash_state(bytes: &[u8]) -> [u8; 32] {
    keccak256(bytes)
}

/// Verifies move[0] carries both players' signatures (`spec.md` §4.5's
/// "co-signed" requirement).
fn verify_cosigned(game: &Game, signed: &SignedGameMove, signer: &TypedDataSigner) -> Result<()> {
    if signed.signatures.len() < 2 {
        return Err(ArbiterError::ChainBroken {
            reason: "co-signed move requires two signatures".to_string(),
        });
    }
    let recovered: Result<Vec<Address>> = signed.signatures[..2]
        .iter()
        .map(|sig| signer.recover(&signed.game_move, sig))
        .collect();
    let recovered = recovered?;
    for &player in &game.players {
        if !recovered.contains(&player) {
            return Err(ArbiterError::ChainBroken {
                reason: "co-signed move is missing a player's signature".to_string(),
            });
        }
    }
    Ok(())
}

/// Verifies a move is signed by the player it claims to be from, and
/// resolves that signer to a membership slot.
fn verify_mover_signed(
    game: &Game,
    game_id: GameId,
    signed: &SignedGameMove,
    signer: &TypedDataSigner,
) -> Result<(Address, u8)> {
    let sig: &Signature = signed
        .mover_signature()
        .ok_or(ArbiterError::BadSignature)?;
    let recovered = signer.recover(&signed.game_move, sig)?;
    if recovered != signed.game_move.player {
        return Err(ArbiterError::BadSignature);
    }
    let idx = game
        .member_index(recovered)
        .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
    Ok((recovered, idx))
}

/// `is_valid_game_move` (`spec.md` §4.5): the game must be live, the mover a
/// member, the rules module must accept the move, and its transition result
/// must match the claimed `new_state` byte-for-byte.
fn validate_transition(game: &Game, game_id: GameId, gm: &GameMove, player_idx: u8) -> Result<()> {
    game.require_started(game_id)?;
    if gm.new_state_bytes == gm.old_state_bytes {
        return Err(ArbiterError::IllegalMove {
            reason: "new_state must differ from old_state".to_string(),
        });
    }
    if !game.rules.is_valid_move(&gm.old_state_bytes, player_idx, &gm.move_bytes)? {
        return Err(ArbiterError::IllegalMove {
            reason: "rules module rejected the move".to_string(),
        });
    }
    let transitioned = game
        .rules
        .transition(&gm.old_state_bytes, player_idx, &gm.move_bytes)?;
    if hash_state(&transitioned) != hash_state(&gm.new_state_bytes) {
        return Err(ArbiterError::ChainBroken {
            reason: "claimed new_state does not match rules.transition's result".to_string(),
        });
    }
    Ok(())
}

/// The `signed_moves[2]` chaining contract (`spec.md` §4.5): same game,
/// nonces adjacent, and move[1] continues exactly where move[0] left off.
fn verify_chain(moves: &[GameMove; 2]) -> Result<()> {
    if moves[0].game_id != moves[1].game_id {
        return Err(ArbiterError::ChainBroken {
            reason: "both moves must be for the same game".to_string(),
        });
    }
    if moves[1].nonce.0 != moves[0].nonce.0 + 1 {
        return Err(ArbiterError::ChainBroken {
            reason: "nonce[1] must equal nonce[0] + 1".to_string(),
        });
    }
    if hash_state(&moves[0].new_state_bytes) != hash_state(&moves[1].old_state_bytes) {
        return Err(ArbiterError::ChainBroken {
            reason: "move[1].old_state must equal move[0].new_state".to_string(),
        });
    }
    Ok(())
}

/// Verifies a full `signed_moves[2]` chain (shared by `finish_game` and
/// `init_timeout`) and returns the validated mover index of move[1].
fn verify_and_chain(
    game: &Game,
    game_id: GameId,
    signed: &[SignedGameMove; 2],
    signer: &TypedDataSigner,
) -> Result<u8> {
    let moves = [signed[0].game_move.clone(), signed[1].game_move.clone()];
    let idx0 = game
        .member_index(moves[0].player)
        .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
    validate_transition(game, game_id, &moves[0], idx0)?;
    verify_cosigned(game, &signed[0], signer)?;

    let (_, idx1) = verify_mover_signed(game, game_id, &signed[1], signer)?;
    validate_transition(game, game_id, &moves[1], idx1)?;

    verify_chain(&moves)?;
    Ok(idx1)
}

/// Splits `stake` into an equal (or near-equal) draw payout with no dust:
/// `⌊stake/2⌋` to player 0, the remainder to player 1.
fn draw_split(stake: u128) -> (u128, u128) {
    let half = stake / 2;
    (half, stake - half)
}

/// The dispute arbiter. Generic over its three injected collaborators so the
/// core state machine stays testable without a real clock, ledger, or event
/// transport (`spec.md` §1, §9).
pub struct Arbiter<C: Clock, L: Ledger, E: EventSink> {
    games: HashMap<GameId, Game>,
    timeouts: HashMap<GameId, Timeout>,
    next_game_id: u64,
    signer: TypedDataSigner,
    config: ArbiterConfig,
    clock: C,
    ledger: L,
    events: E,
}

impl<C: Clock, L: Ledger, E: EventSink> Arbiter<C, L, E> {
    pub fn new(config: ArbiterConfig, clock: C, ledger: L, events: E) -> Self {
        let signer = TypedDataSigner::new(&config.domain);
        Self {
            games: HashMap::new(),
            timeouts: HashMap::new(),
            next_game_id: 0,
            signer,
            config,
            clock,
            ledger,
            events,
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn game(&self, game_id: GameId) -> Option<&Game> {
        self.games.get(&game_id)
    }

    /// Direct access to the injected clock, e.g. for advancing a
    /// `FakeClock` in tests driving the timeout sub-machine deterministically.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    fn no_such_game(game_id: GameId) -> ArbiterError {
        ArbiterError::WrongLifecycleState {
            game_id: game_id.0,
            expected: "Proposed, Started, or Finished",
            found: "None",
        }
    }

    /// `propose_game` (`spec.md` §4.5): `None -> Proposed`.
    pub fn propose_game(
        &mut self,
        rules: Box<dyn Rules>,
        proposer: Address,
        stake: u128,
        session_keys: Vec<Address>,
    ) -> Result<GameId> {
        if let Err(e) = self.ledger.escrow(proposer, stake) {
            tracing::warn!(%proposer, stake, error = %e, "propose_game: escrow failed");
            return Err(e);
        }

        let game_id = GameId(self.next_game_id);
        self.next_game_id += 1;

        let mut sessions = HashMap::new();
        for key in session_keys {
            sessions.insert(key, 0u8);
        }

        self.games.insert(
            game_id,
            Game {
                rules,
                stake,
                players: [proposer, Address::zero()],
                sessions,
                started: false,
                finished: false,
            },
        );

        self.events.emit(Event::GameProposed {
            game_id,
            stake,
            proposer,
        });
        tracing::info!(%game_id, stake, %proposer, "propose_game: ok");
        Ok(game_id)
    }

    /// `accept_game` (`spec.md` §4.5): `Proposed -> Started`.
    pub fn accept_game(
        &mut self,
        game_id: GameId,
        acceptor: Address,
        value: u128,
        session_keys: Vec<Address>,
    ) -> Result<()> {
        let result = (|| {
            {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                if game.started || game.finished {
                    return Err(ArbiterError::WrongLifecycleState {
                        game_id: game_id.0,
                        expected: "Proposed",
                        found: if game.finished { "Finished" } else { "Started" },
                    });
                }
                if acceptor == game.players[0] {
                    return Err(ArbiterError::NotAMember { game_id: game_id.0 });
                }
                if value < game.stake {
                    return Err(ArbiterError::StakeMismatch {
                        expected: game.stake,
                        supplied: value,
                    });
                }
            }

            self.ledger.escrow(acceptor, value)?;

            let (stake, players) = {
                let game = self.games.get_mut(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.stake += value;
                game.players[1] = acceptor;
                for key in session_keys {
                    game.sessions.insert(key, 1u8);
                }
                game.started = true;
                (game.stake, game.players)
            };

            self.events.emit(Event::GameStarted {
                game_id,
                stake,
                players,
            });
            Ok(())
        })();

        match &result {
            Ok(()) => tracing::info!(%game_id, %acceptor, value, "accept_game: ok"),
            Err(e) => tracing::warn!(%game_id, %acceptor, error = %e, "accept_game: failed"),
        }
        result
    }

    /// `register_session_address` (`spec.md` §4.5): `Started` only.
    pub fn register_session_address(
        &mut self,
        game_id: GameId,
        caller: Address,
        session_addr: Address,
    ) -> Result<()> {
        let result = (|| {
            let player = {
                let game = self.games.get_mut(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;
                let idx = game
                    .member_index(caller)
                    .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
                game.sessions.insert(session_addr, idx);
                game.players[idx as usize]
            };
            self.events.emit(Event::SessionAddressRegistered {
                game_id,
                player,
                session_addr,
            });
            Ok(())
        })();

        match &result {
            Ok(()) => tracing::info!(%game_id, %caller, %session_addr, "register_session_address: ok"),
            Err(e) => tracing::warn!(%game_id, %caller, error = %e, "register_session_address: failed"),
        }
        result
    }

    /// `resign` (`spec.md` §4.5): `Started -> Finished`, opponent takes the
    /// full pot.
    pub fn resign(&mut self, game_id: GameId, caller: Address) -> Result<()> {
        let result = (|| {
            let (winner, loser, stake) = {
                let game = self.games.get_mut(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;
                let idx = game
                    .member_index(caller)
                    .ok_or(ArbiterError::NotAMember { game_id: game_id.0 })?;
                let winner_idx = 1 - idx;
                let winner = game.players[winner_idx as usize];
                let loser = game.players[idx as usize];
                let stake = game.stake;
                game.finished = true;
                (winner, loser, stake)
            };

            self.ledger.payout(game_id, winner, stake)?;
            self.events.emit(Event::PlayerResigned {
                game_id,
                player: caller,
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
            Ok(()) => tracing::info!(%game_id, %caller, "resign: ok"),
            Err(e) => tracing::warn!(%game_id, %caller, error = %e, "resign: failed"),
        }
        result
    }

    /// `dispute_move` (`spec.md` §4.5): a single mover-signed move that the
    /// rules module rejects disqualifies its signer.
    pub fn dispute_move(&mut self, signed_move: SignedGameMove) -> Result<()> {
        let game_id = GameId(signed_move.game_move.game_id.0);

        let result = (|| {
            let (recovered, winner, loser, stake) = {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;

                let (recovered, idx) =
                    verify_mover_signed(game, game_id, &signed_move, &self.signer)?;
                let gm = &signed_move.game_move;
                let valid = game
                    .rules
                    .is_valid_move(&gm.old_state_bytes, idx, &gm.move_bytes)?;
                if valid {
                    return Err(ArbiterError::IllegalMove {
                        reason: "disputed move is in fact valid".to_string(),
                    });
                }

                let winner_idx = 1 - idx;
                let winner = game.players[winner_idx as usize];
                let loser = game.players[idx as usize];
                (recovered, winner, loser, game.stake)
            };

            {
                let game = self.games.get_mut(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.finished = true;
            }

            self.ledger.payout(game_id, winner, stake)?;
            self.events.emit(Event::PlayerDisqualified {
                game_id,
                player: recovered,
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
            Ok(()) => tracing::info!(%game_id, "dispute_move: disqualified a player"),
            Err(e) => tracing::warn!(%game_id, error = %e, "dispute_move: failed"),
        }
        result
    }

    /// `finish_game` (`spec.md` §4.5): a fully chained, final pair of moves
    /// ends the game, with a win or equal-split draw payout.
    pub fn finish_game(&mut self, signed_moves: [SignedGameMove; 2]) -> Result<()> {
        let game_id = GameId(signed_moves[0].game_move.game_id.0);

        let result = (|| {
            let (players, stake, win0, win1) = {
                let game = self.games.get(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.require_started(game_id)?;

                verify_and_chain(game, game_id, &signed_moves, &self.signer)?;
                let final_state = &signed_moves[1].game_move.new_state_bytes;
                if !game.rules.is_final(final_state)? {
                    return Err(ArbiterError::NotFinal { game_id: game_id.0 });
                }

                let win0 = game.rules.is_win(final_state, 0)?;
                let win1 = game.rules.is_win(final_state, 1)?;
                if win0 && win1 {
                    return Err(ArbiterError::IllegalMove {
                        reason: "rules module claims both players won".to_string(),
                    });
                }
                (game.players, game.stake, win0, win1)
            };

            {
                let game = self.games.get_mut(&game_id).ok_or(Self::no_such_game(game_id))?;
                game.finished = true;
            }

            let (winner, loser, is_draw) = if win0 {
                self.ledger.payout(game_id, players[0], stake)?;
                (Some(players[0]), Some(players[1]), false)
            } else if win1 {
                self.ledger.payout(game_id, players[1], stake)?;
                (Some(players[1]), Some(players[0]), false)
            } else {
                let (share0, share1) = draw_split(stake);
                self.ledger.payout(game_id, players[0], share0)?;
                self.ledger.payout(game_id, players[1], share1)?;
                (None, None, true)
            };

            self.events.emit(Event::GameFinished {
                game_id,
                winner,
                loser,
                is_draw,
            });
            Ok(())
        })();

        match &result {
            Ok(()) => tracing::info!(%game_id, "finish_game: ok"),
            Err(e) => tracing::warn!(%game_id, error = %e, "finish_game: failed"),
        }
        result
    }
}

//! End-to-end coverage of `spec.md` §8's scenarios S1-S6, driven entirely
//! through the public `Arbiter` API with the in-memory test doubles.

use ethers_signers::{LocalWallet, Signer};

use gamejutsu_arbiter::arbiter::Arbiter;
use gamejutsu_arbiter::collaborators::{FakeClock, InMemoryLedger, RecordingEventSink};
use gamejutsu_arbiter::config::ArbiterConfig;
use gamejutsu_arbiter::error::ArbiterError;
use gamejutsu_arbiter::rules::checkers::engine::CheckersRules;
use gamejutsu_arbiter::rules::checkers::tables::geometry;
use gamejutsu_arbiter::rules::checkers::{Move, State, RED_MAN, WHITE_KING, WHITE_MAN};
use gamejutsu_arbiter::signer::TypedDataSigner;
use gamejutsu_arbiter::types::{GameId, GameMove, Nonce, SignedGameMove};

const STAKE: u128 = 10_000_000_000_000_000_000;

struct Table {
    arbiter: Arbiter<FakeClock, InMemoryLedger, RecordingEventSink>,
    proposer: LocalWallet,
    acceptor: LocalWallet,
    signer: TypedDataSigner,
    game_id: GameId,
}

fn new_table() -> Table {
    let config = ArbiterConfig::default();
    let signer = TypedDataSigner::new(&config.domain);
    let clock = FakeClock::new(1_000);
    let mut ledger = InMemoryLedger::new();

    let proposer = LocalWallet::new(&mut rand::thread_rng());
    let acceptor = LocalWallet::new(&mut rand::thread_rng());
    // Fund beyond the game stake so either player can also post a timeout
    // bond within the same test without running the ledger dry.
    let funding = STAKE + ArbiterConfig::default().default_timeout_stake_wei * 2;
    ledger.fund(proposer.address(), funding);
    ledger.fund(acceptor.address(), funding);

    let events = RecordingEventSink::new();
    let mut arbiter = Arbiter::new(config, clock, ledger, events);

    let game_id = arbiter
        .propose_game(Box::new(CheckersRules), proposer.address(), STAKE, vec![])
        .unwrap();
    arbiter
        .accept_game(game_id, acceptor.address(), STAKE, vec![])
        .unwrap();

    Table {
        arbiter,
        proposer,
        acceptor,
        signer,
        game_id,
    }
}

fn sign(wallet: &LocalWallet, signer: &TypedDataSigner, gm: &GameMove) -> ethers_core::types::Signature {
    wallet.sign_hash(signer.digest(gm))
}

fn co_signed_move(t: &Table, mover: &LocalWallet, gm: GameMove) -> SignedGameMove {
    let mover_sig = sign(mover, &t.signer, &gm);
    let other = if mover.address() == t.proposer.address() {
        &t.acceptor
    } else {
        &t.proposer
    };
    let other_sig = sign(other, &t.signer, &gm);
    SignedGameMove {
        game_move: gm,
        signatures: vec![mover_sig, other_sig],
    }
}

fn mover_signed_move(t: &Table, mover: &LocalWallet, gm: GameMove) -> SignedGameMove {
    let sig = sign(mover, &t.signer, &gm);
    SignedGameMove {
        game_move: gm,
        signatures: vec![sig],
    }
}

/// S1 — default initial state is well-formed and matches the documented
/// layout.
#[test]
fn s1_default_initial_state() {
    let state = State::default_initial();
    assert!(state.cells[0..12].iter().all(|&c| c == 0x01));
    assert!(state.cells[20..32].iter().all(|&c| c == 0x02));
    assert!(!state.red_moves);
    assert_eq!(state.winner, 0);
}

/// S2 — a single co-signed white opening move (9 -> 14) is accepted and
/// finishing the game on it (it is not terminal) is rejected.
#[test]
fn s2_simple_white_opening_is_not_final() {
    let t = new_table();
    let old_state = State::default_initial();
    let mv = Move {
        from: 9,
        to: 14,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state = transition_via_rules(&old_state, 0, mv);
    assert_eq!(new_state.cells[13], 0x01);

    let gm0 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.proposer.address(),
        old_state_bytes: old_state.encode(),
        new_state_bytes: new_state.encode(),
        move_bytes: mv.encode(),
    };
    let signed0 = co_signed_move(&t, &t.proposer, gm0);

    // A second mover-signed move from the same (non-final) position,
    // chained, so finish_game correctly refuses a non-terminal pair.
    let mv2 = Move {
        from: 22,
        to: 17,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state2 = transition_via_rules(&new_state, 1, mv2);
    let gm1 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(1),
        player: t.acceptor.address(),
        old_state_bytes: new_state.encode(),
        new_state_bytes: new_state2.encode(),
        move_bytes: mv2.encode(),
    };
    let signed1 = mover_signed_move(&t, &t.acceptor, gm1);

    let mut t = t;
    let err = t
        .arbiter
        .finish_game([signed0, signed1])
        .expect_err("an ordinary mid-game position must not be treated as final");
    assert!(matches!(err, gamejutsu_arbiter::error::ArbiterError::NotFinal { .. }));
}

/// S3 — a legal capturing jump (red, in this case) must survive
/// `dispute_move`: disputing it is itself the illegal act.
#[test]
fn s3_dispute_of_a_valid_capture_is_rejected() {
    let t = new_table();
    let g = geometry();

    let mut chosen = None;
    'search: for from_sq in 1u8..=32 {
        let idx = (from_sq - 1) as usize;
        for slot in 0..2 {
            let landing = g.rjump[2 * idx + slot];
            let captured = g.rjump_captured[2 * idx + slot];
            if landing != 0 && captured != 0 && landing != from_sq && captured != from_sq && landing != captured {
                chosen = Some((from_sq, landing, captured));
                break 'search;
            }
        }
    }
    let (from_sq, landing, captured) = chosen.expect("geometry must offer a red capturing jump");

    let mut cells = [0u8; 32];
    cells[from_sq as usize - 1] = RED_MAN;
    cells[captured as usize - 1] = WHITE_MAN;
    let state = State {
        cells,
        red_moves: true,
        winner: 0,
    };
    let mv = Move {
        from: from_sq,
        to: landing,
        is_jump: true,
        pass_to_opponent: true,
    };
    let new_state = transition_via_rules(&state, 1, mv);
    assert_eq!(new_state.cells[captured as usize - 1], 0, "captured piece must be removed");

    let gm = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.acceptor.address(),
        old_state_bytes: state.encode(),
        new_state_bytes: new_state.encode(),
        move_bytes: mv.encode(),
    };
    let signed = mover_signed_move(&t, &t.acceptor, gm);

    let mut t = t;
    let err = t
        .arbiter
        .dispute_move(signed)
        .expect_err("a legal capture must not be disputable");
    assert!(matches!(err, ArbiterError::IllegalMove { .. }));
}

/// S4 — a legal non-jump move onto the back rank promotes to king, and is
/// likewise not disputable.
#[test]
fn s4_dispute_of_a_valid_promotion_is_rejected() {
    let t = new_table();
    let g = geometry();

    let mut chosen = None;
    'search: for from_sq in 1u8..=32 {
        let idx = (from_sq - 1) as usize;
        for slot in 0..2 {
            let landing = g.moves[2 * idx + slot];
            if landing != 0 && (29..=32).contains(&landing) {
                chosen = Some((from_sq, landing));
                break 'search;
            }
        }
    }
    let (from_sq, landing) = chosen.expect("geometry must offer a promoting non-jump move");

    let mut cells = [0u8; 32];
    cells[from_sq as usize - 1] = WHITE_MAN;
    let state = State {
        cells,
        red_moves: false,
        winner: 0,
    };
    let mv = Move {
        from: from_sq,
        to: landing,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state = transition_via_rules(&state, 0, mv);
    assert_eq!(new_state.cells[landing as usize - 1], WHITE_KING);

    let gm = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.proposer.address(),
        old_state_bytes: state.encode(),
        new_state_bytes: new_state.encode(),
        move_bytes: mv.encode(),
    };
    let signed = mover_signed_move(&t, &t.proposer, gm);

    let mut t = t;
    let err = t
        .arbiter
        .dispute_move(signed)
        .expect_err("a legal promotion move must not be disputable");
    assert!(matches!(err, ArbiterError::IllegalMove { .. }));
}

/// A man's capturing jump that lands on the back rank promotes to king
/// before the further-jump lookahead runs; if that lookahead were computed
/// against the pre-promotion piece, this honest continuation (the mover
/// truthfully keeping the turn for the further jump) would be wrongly
/// rejected by `dispute_move`, letting the opponent seize the stake.
#[test]
fn promotion_into_further_jump_is_not_falsely_disputable() {
    let t = new_table();
    let g = geometry();

    let mut chosen = None;
    'search: for from_sq in 1u8..=32 {
        let idx = (from_sq - 1) as usize;
        for slot in 0..2 {
            let landing = g.jumps[2 * idx + slot];
            let captured = g.jumps_captured[2 * idx + slot];
            if landing == 0 || captured == 0 || !(29..=32).contains(&landing) {
                continue;
            }
            let lidx = (landing - 1) as usize;
            for further_slot in 0..2 {
                let further_landing = g.rjump[2 * lidx + further_slot];
                let further_captured = g.rjump_captured[2 * lidx + further_slot];
                if further_landing != 0
                    && further_captured != 0
                    && further_captured != captured
                    && further_landing != from_sq
                    && further_landing != captured
                {
                    chosen = Some((from_sq, landing, captured, further_captured));
                    break 'search;
                }
            }
        }
    }
    let (from_sq, landing, captured, further_captured) =
        chosen.expect("board geometry must offer a promoting jump with a further capture");

    let mut cells = [0u8; 32];
    cells[from_sq as usize - 1] = WHITE_MAN;
    cells[captured as usize - 1] = RED_MAN;
    cells[further_captured as usize - 1] = RED_MAN;
    let state = State {
        cells,
        red_moves: false,
        winner: 0,
    };
    // The further jump remains available, so the honest mover keeps the
    // turn: pass_to_opponent = false.
    let mv = Move {
        from: from_sq,
        to: landing,
        is_jump: true,
        pass_to_opponent: false,
    };
    let new_state = transition_via_rules(&state, 0, mv);

    let gm = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.proposer.address(),
        old_state_bytes: state.encode(),
        new_state_bytes: new_state.encode(),
        move_bytes: mv.encode(),
    };
    let signed = mover_signed_move(&t, &t.proposer, gm);

    let mut t = t;
    let err = t
        .arbiter
        .dispute_move(signed)
        .expect_err("a legal capture-into-promotion with a further jump must not be disputable");
    assert!(matches!(err, ArbiterError::IllegalMove { .. }));
}

/// S5 — disputing a move the rules module rejects disqualifies its signer
/// and hands the opponent the full stake.
#[test]
fn s5_dispute_catches_illegal_backward_move() {
    let mut t = new_table();
    let old_state = State::default_initial();
    // White "moving backward" is illegal for a man.
    let mv = Move {
        from: 9,
        to: 5,
        is_jump: false,
        pass_to_opponent: true,
    };
    let gm = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.proposer.address(),
        old_state_bytes: old_state.encode(),
        new_state_bytes: old_state.encode(),
        move_bytes: mv.encode(),
    };
    let signed = mover_signed_move(&t, &t.proposer, gm);

    t.arbiter.dispute_move(signed).unwrap();

    let game = t.arbiter.game(t.game_id).unwrap();
    assert!(game.finished);
    assert_eq!(
        t.arbiter.config().default_timeout_stake_wei,
        ArbiterConfig::default().default_timeout_stake_wei
    );
}

/// S6 — a stalled opponent past `timeout_duration_secs` is disqualified via
/// `finalize_timeout`, and the winner collects the escrow plus the bond.
#[test]
fn s6_timeout_finalise_disqualifies_the_stalling_player() {
    let t = new_table();
    let old_state = State::default_initial();
    let mv0 = Move {
        from: 9,
        to: 14,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state0 = transition_via_rules(&old_state, 0, mv0);
    let gm0 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.proposer.address(),
        old_state_bytes: old_state.encode(),
        new_state_bytes: new_state0.encode(),
        move_bytes: mv0.encode(),
    };
    let signed0 = co_signed_move(&t, &t.proposer, gm0);

    let mv1 = Move {
        from: 22,
        to: 17,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state1 = transition_via_rules(&new_state0, 1, mv1);
    let gm1 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(1),
        player: t.acceptor.address(),
        old_state_bytes: new_state0.encode(),
        new_state_bytes: new_state1.encode(),
        move_bytes: mv1.encode(),
    };
    let signed1 = mover_signed_move(&t, &t.acceptor, gm1);

    let mut t = t;
    t.arbiter
        .init_timeout([signed0, signed1], t.proposer.address())
        .unwrap();
    assert!(t.arbiter.timeout(t.game_id).is_some());

    // Advance the fake clock past the configured timeout window.
    let duration = t.arbiter.config().timeout_duration_secs;
    t.arbiter.clock_mut().advance(duration + 1);

    t.arbiter.finalize_timeout(t.game_id).unwrap();

    let game = t.arbiter.game(t.game_id).unwrap();
    assert!(game.finished);
    assert!(t.arbiter.timeout(t.game_id).is_none());
}

/// `resolve_timeout` clears an active timeout and returns the bond to its
/// initiator when the stalled player answers in time.
#[test]
fn resolve_timeout_clears_before_expiry_and_returns_the_bond() {
    let t = new_table();
    let old_state = State::default_initial();
    let mv0 = Move {
        from: 9,
        to: 14,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state0 = transition_via_rules(&old_state, 0, mv0);
    let gm0 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(0),
        player: t.proposer.address(),
        old_state_bytes: old_state.encode(),
        new_state_bytes: new_state0.encode(),
        move_bytes: mv0.encode(),
    };
    let signed0 = co_signed_move(&t, &t.proposer, gm0);

    let mv1 = Move {
        from: 22,
        to: 17,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state1 = transition_via_rules(&new_state0, 1, mv1);
    let gm1 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(1),
        player: t.acceptor.address(),
        old_state_bytes: new_state0.encode(),
        new_state_bytes: new_state1.encode(),
        move_bytes: mv1.encode(),
    };
    let signed1 = mover_signed_move(&t, &t.acceptor, gm1);

    let mut t = t;
    t.arbiter
        .init_timeout([signed0, signed1], t.acceptor.address())
        .unwrap();

    // The stalled player (white, index 0) finally answers with a legal
    // continuation from new_state1.
    let mv2 = Move {
        from: 10,
        to: 15,
        is_jump: false,
        pass_to_opponent: true,
    };
    let new_state2 = transition_via_rules(&new_state1, 0, mv2);
    let gm2 = GameMove {
        game_id: t.game_id,
        nonce: Nonce(2),
        player: t.proposer.address(),
        old_state_bytes: new_state1.encode(),
        new_state_bytes: new_state2.encode(),
        move_bytes: mv2.encode(),
    };
    let signed2 = mover_signed_move(&t, &t.proposer, gm2);

    t.arbiter.resolve_timeout(signed2).unwrap();
    assert!(t.arbiter.timeout(t.game_id).is_none());
    assert!(!t.arbiter.game(t.game_id).unwrap().finished);
}

fn transition_via_rules(state: &State, player_id: u8, mv: Move) -> State {
    use gamejutsu_arbiter::rules::Rules;
    let rules = CheckersRules;
    State::decode(&rules.transition(&state.encode(), player_id, &mv.encode()).unwrap()).unwrap()
}

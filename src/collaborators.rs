//! Injected collaborators (`spec.md` §1, §9).
//!
//! Block-timestamp source, fund custody, and event emission transport are
//! all external to the arbiter core. Modelling them as narrow traits keeps
//! `Arbiter` a pure, deterministic state machine over `Vec<u8>` state that
//! can be driven in tests without a fake blockchain.

use std::collections::HashMap;

use crate::error::{ArbiterError, Result};
use crate::types::{Address, Event, GameId};

/// Block-timestamp source. Read once per operation (`spec.md` §5).
pub trait Clock {
    fn now(&self) -> u64;
}

/// Fund custody / value transfer. The arbiter only ever escrows from a
/// caller and pays out to a member; it never moves funds between arbitrary
/// addresses.
pub trait Ledger {
    fn escrow(&mut self, from: Address, amount: u128) -> Result<()>;
    fn payout(&mut self, game_id: GameId, to: Address, amount: u128) -> Result<()>;
}

/// Event emission transport.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// A monotonic in-memory clock, for deterministic tests: time only moves
/// forward when the test advances it explicitly.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: u64,
}

impl FakeClock {
    pub fn new(now: u64) -> Self {
        Self { now }
    }

    pub fn advance(&mut self, secs: u64) {
        self.now += secs;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        self.now
    }
}

/// An in-memory ledger backed by a balance map, for tests and for embedding
/// this crate somewhere that doesn't have its own custody layer.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, u128>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&mut self, addr: Address, amount: u128) {
        *self.balances.entry(addr).or_insert(0) += amount;
    }

    pub fn balance_of(&self, addr: Address) -> u128 {
        *self.balances.get(&addr).unwrap_or(&0)
    }
}

impl Ledger for InMemoryLedger {
    fn escrow(&mut self, from: Address, amount: u128) -> Result<()> {
        let balance = self.balances.entry(from).or_insert(0);
        if *balance < amount {
            return Err(ArbiterError::StakeMismatch {
                expected: amount,
                supplied: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn payout(&mut self, _game_id: GameId, to: Address, amount: u128) -> Result<()> {
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

/// An in-memory event sink that just records everything it's handed, for
/// test assertions.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    pub events: Vec<Event>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

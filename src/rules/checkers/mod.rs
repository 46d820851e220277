//! Checkers `State`/`Move` data model and encoding (`spec.md` §3, §4.4, §6).

pub mod engine;
pub mod tables;

use std::fmt;

use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::U256;

use crate::encoding::u256_to_u8;
use crate::error::{ArbiterError, Result};

pub const EMPTY: u8 = 0x00;
pub const WHITE_MAN: u8 = 0x01;
pub const RED_MAN: u8 = 0x02;
pub const WHITE_KING: u8 = 0xA1;
pub const RED_KING: u8 = 0xA2;
pub const KING_FLAG: u8 = 0xA0;

/// `piece & 0x0F`: 0 empty, 1 white, 2 red.
pub fn colour(piece: u8) -> u8 {
    piece & 0x0F
}

/// `piece & 0xF0 == 0xA0`.
pub fn is_king(piece: u8) -> bool {
    piece & 0xF0 == KING_FLAG
}

/// A checkers position: 32 packed cells, whose turn it is, and the winner
/// (`0` = none, `1` = white, `2` = red).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub cells: [u8; 32],
    pub red_moves: bool,
    pub winner: u8,
}

impl State {
    /// `spec.md` §4.4: white on 1..12, red on 21..32, white to move first.
    pub fn default_initial() -> Self {
        let mut cells = [EMPTY; 32];
        for cell in cells.iter_mut().take(12) {
            *cell = WHITE_MAN;
        }
        for cell in cells.iter_mut().skip(20) {
            *cell = RED_MAN;
        }
        State {
            cells,
            red_moves: false,
            winner: 0,
        }
    }

    pub fn is_final(&self) -> bool {
        self.winner != 0
    }

    /// `spec.md` §4.3: `is_win(s, p) == (s.winner == p+1)`.
    pub fn is_win(&self, player_id: u8) -> bool {
        self.winner == player_id + 1
    }

    /// §6: 32 cells (one word each) + `red_moves` + `winner`, 34 words total.
    pub fn encode(&self) -> Vec<u8> {
        let mut tokens: Vec<Token> = self
            .cells
            .iter()
            .map(|&c| Token::Uint(U256::from(c)))
            .collect();
        tokens.push(Token::Bool(self.red_moves));
        tokens.push(Token::Uint(U256::from(self.winner)));
        encode(&tokens)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut param_types = vec![ParamType::Uint(256); 32];
        param_types.push(ParamType::Bool);
        param_types.push(ParamType::Uint(256));
        let tokens = decode(&param_types, data).map_err(|e| ArbiterError::MalformedPayload {
            reason: e.to_string(),
        })?;
        let mut tokens = tokens.into_iter();
        let mut cells = [0u8; 32];
        for cell in cells.iter_mut() {
            match tokens.next() {
                Some(Token::Uint(v)) => *cell = u256_to_u8(v, "cell")?,
                _ => {
                    return Err(ArbiterError::MalformedPayload {
                        reason: "expected cell word".to_string(),
                    })
                }
            }
        }
        let red_moves = match tokens.next() {
            Some(Token::Bool(b)) => b,
            _ => {
                return Err(ArbiterError::MalformedPayload {
                    reason: "expected red_moves word".to_string(),
                })
            }
        };
        let winner = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u8(v, "winner")?,
            _ => {
                return Err(ArbiterError::MalformedPayload {
                    reason: "expected winner word".to_string(),
                })
            }
        };
        Ok(State {
            cells,
            red_moves,
            winner,
        })
    }
}

/// Hex-dumps the 32 packed cells, for test-failure output: `0x01 0x00 …`
/// rather than a 32-element `Debug` array spanning several terminal lines.
impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", hex::encode(self.cells))?;
        write!(
            f,
            " {} winner={}",
            if self.red_moves { "red to move" } else { "white to move" },
            self.winner
        )
    }
}

/// A single checkers ply: `(from, to, is_jump, pass_to_opponent)`, 1-based
/// square indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub is_jump: bool,
    pub pass_to_opponent: bool,
}

impl Move {
    pub fn encode(&self) -> Vec<u8> {
        encode(&[
            Token::Uint(U256::from(self.from)),
            Token::Uint(U256::from(self.to)),
            Token::Bool(self.is_jump),
            Token::Bool(self.pass_to_opponent),
        ])
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let tokens = decode(
            &[
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Bool,
                ParamType::Bool,
            ],
            data,
        )
        .map_err(|e| ArbiterError::MalformedPayload {
            reason: e.to_string(),
        })?;
        let mut tokens = tokens.into_iter();
        let from = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u8(v, "from")?,
            _ => {
                return Err(ArbiterError::MalformedPayload {
                    reason: "expected from word".to_string(),
                })
            }
        };
        let to = match tokens.next() {
            Some(Token::Uint(v)) => u256_to_u8(v, "to")?,
            _ => {
                return Err(ArbiterError::MalformedPayload {
                    reason: "expected to word".to_string(),
                })
            }
        };
        let is_jump = match tokens.next() {
            Some(Token::Bool(b)) => b,
            _ => {
                return Err(ArbiterError::MalformedPayload {
                    reason: "expected is_jump word".to_string(),
                })
            }
        };
        let pass_to_opponent = match tokens.next() {
            Some(Token::Bool(b)) => b,
            _ => {
                return Err(ArbiterError::MalformedPayload {
                    reason: "expected pass_to_opponent word".to_string(),
                })
            }
        };
        Ok(Move {
            from,
            to,
            is_jump,
            pass_to_opponent,
        })
    }
}

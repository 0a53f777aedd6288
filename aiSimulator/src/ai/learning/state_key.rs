//! Value-table key: the mover's four piece positions plus the roll.

use std::fmt;
use std::str::FromStr;

use crate::config::constants::{DIE_MAX, DIE_MIN, PIECES_PER_PLAYER};
use crate::core::path::is_valid_position;
use crate::core::state::Position;

/// Pieces keep their index order so that an action is always a concrete piece.
/// Two boards that only differ by a permutation of piece indices are distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub positions: [Position; PIECES_PER_PLAYER],
    pub roll: u8,
}

impl StateKey {
    pub fn new(positions: [Position; PIECES_PER_PLAYER], roll: u8) -> Self {
        Self { positions, roll }
    }
}

/// Text form used in model files: `"p0,p1,p2,p3|roll"`.
impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.positions;
        write!(f, "{},{},{},{}|{}", a, b, c, d, self.roll)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateKeyError(pub String);

impl fmt::Display for ParseStateKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid state key '{}'", self.0)
    }
}

impl std::error::Error for ParseStateKeyError {}

impl FromStr for StateKey {
    type Err = ParseStateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseStateKeyError(s.to_string());

        let (pieces, roll) = s.split_once('|').ok_or_else(err)?;
        let roll: u8 = parse_canonical(roll).ok_or_else(err)?;
        if !(DIE_MIN..=DIE_MAX).contains(&roll) {
            return Err(err());
        }

        let mut positions = [0; PIECES_PER_PLAYER];
        let mut parts = pieces.split(',');
        for slot in positions.iter_mut() {
            let value: Position = parts.next().and_then(parse_canonical).ok_or_else(err)?;
            if !is_valid_position(value) {
                return Err(err());
            }
            *slot = value;
        }
        if parts.next().is_some() {
            return Err(err());
        }

        Ok(StateKey { positions, roll })
    }
}

/// Only the exact text `Display` would write back: no padding, signs or leading zeros.
fn parse_canonical<T: FromStr + ToString>(raw: &str) -> Option<T> {
    raw.parse::<T>().ok().filter(|value| value.to_string() == raw)
}

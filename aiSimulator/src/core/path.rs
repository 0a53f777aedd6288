//! Mapping between player-relative positions and the shared track.

use crate::config::constants::{
    BASE_POSITION, FINISHED_POSITION, HOME_STRETCH_START, LAST_TRACK_POSITION,
    PLAYER_TRACK_OFFSET, SAFE_SQUARES, TRACK_LENGTH, TRACK_START,
};
use crate::core::state::Position;

/// Where a piece currently is, derived from its relative position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Base,
    Track,
    HomeStretch,
    Finished,
}

pub fn zone(position: Position) -> Option<Zone> {
    match position {
        BASE_POSITION => Some(Zone::Base),
        TRACK_START..=LAST_TRACK_POSITION => Some(Zone::Track),
        HOME_STRETCH_START..=56 => Some(Zone::HomeStretch),
        FINISHED_POSITION => Some(Zone::Finished),
        _ => None,
    }
}

pub fn is_valid_position(position: Position) -> bool {
    (BASE_POSITION..=FINISHED_POSITION).contains(&position)
}

pub fn is_on_track(position: Position) -> bool {
    (TRACK_START..=LAST_TRACK_POSITION).contains(&position)
}

/// Absolute index on the 52-cell track, or `None` when the piece is not on it.
pub fn absolute_index(player: usize, position: Position) -> Option<i8> {
    if !is_on_track(position) {
        return None;
    }
    let offset = (player as i8) * PLAYER_TRACK_OFFSET;
    Some((offset + position).rem_euclid(TRACK_LENGTH))
}

pub fn is_safe_square(absolute: i8) -> bool {
    SAFE_SQUARES.contains(&absolute)
}

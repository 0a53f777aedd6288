use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::constants::{
    BASE_POSITION, FINISHED_POSITION, NO_ROLL, NUM_PLAYERS, PIECES_PER_PLAYER,
};
use crate::core::engine::EngineError;
use crate::core::path::is_valid_position;

/// Player-relative piece position: -1 base, 0..=50 track, 51..=56 home stretch, 57 finished.
pub type Position = i8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Green,
    Yellow,
    Blue,
}

impl PlayerColor {
    pub const ALL: [PlayerColor; NUM_PLAYERS] =
        [PlayerColor::Red, PlayerColor::Green, PlayerColor::Yellow, PlayerColor::Blue];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn tag(self) -> &'static str {
        match self {
            PlayerColor::Red => "R",
            PlayerColor::Green => "G",
            PlayerColor::Yellow => "Y",
            PlayerColor::Blue => "B",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerColor::Red => "Red",
            PlayerColor::Green => "Green",
            PlayerColor::Yellow => "Yellow",
            PlayerColor::Blue => "Blue",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    color: PlayerColor,
    pieces: [Position; PIECES_PER_PLAYER],
    score: f64,
}

impl Player {
    fn new(color: PlayerColor) -> Self {
        Self {
            color,
            pieces: [BASE_POSITION; PIECES_PER_PLAYER],
            score: 0.0,
        }
    }

    pub fn color(&self) -> PlayerColor {
        self.color
    }

    pub fn pieces(&self) -> [Position; PIECES_PER_PLAYER] {
        self.pieces
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn finished_count(&self) -> usize {
        self.pieces.iter().filter(|&&p| p == FINISHED_POSITION).count()
    }

    pub fn has_finished(&self) -> bool {
        self.finished_count() == PIECES_PER_PLAYER
    }
}

/// Board and turn state of a single game.
///
/// Positions are only changed by [`crate::core::engine::Game`]; everything here
/// is read-only from outside the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    players: [Player; NUM_PLAYERS],
    turn: usize,
    last_roll: u8,
    waiting_for_move: bool,
    game_over: bool,
    winner: Option<PlayerColor>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: PlayerColor::ALL.map(Player::new),
            turn: 0,
            last_roll: NO_ROLL,
            waiting_for_move: false,
            game_over: false,
            winner: None,
        }
    }

    /// Builds a mid-game board. Every position must lie in [-1, 57]; a player
    /// with all four pieces finished is recorded as the winner.
    pub fn from_positions(
        positions: [[Position; PIECES_PER_PLAYER]; NUM_PLAYERS],
        turn: usize,
    ) -> Result<Self, EngineError> {
        if turn >= NUM_PLAYERS {
            return Err(EngineError::PlayerOutOfRange(turn));
        }
        let mut state = Self::new();
        for (player, pieces) in positions.iter().enumerate() {
            for (piece, &position) in pieces.iter().enumerate() {
                if !is_valid_position(position) {
                    return Err(EngineError::PositionOutOfRange { player, piece, position });
                }
            }
            state.players[player].pieces = *pieces;
        }
        state.turn = turn;
        if let Some(winner) = state.players.iter().find(|p| p.has_finished()) {
            state.winner = Some(winner.color);
            state.game_over = true;
        }
        Ok(state)
    }

    pub fn players(&self) -> &[Player; NUM_PLAYERS] {
        &self.players
    }

    pub fn player(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn current_color(&self) -> PlayerColor {
        self.players[self.turn].color
    }

    pub fn current_pieces(&self) -> [Position; PIECES_PER_PLAYER] {
        self.players[self.turn].pieces
    }

    pub fn position(&self, player: usize, piece: usize) -> Option<Position> {
        self.players.get(player)?.pieces.get(piece).copied()
    }

    pub fn last_roll(&self) -> u8 {
        self.last_roll
    }

    pub fn waiting_for_move(&self) -> bool {
        self.waiting_for_move
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<PlayerColor> {
        self.winner
    }

    pub(crate) fn set_position(&mut self, player: usize, piece: usize, position: Position) {
        debug_assert!(is_valid_position(position));
        self.players[player].pieces[piece] = position;
    }

    pub(crate) fn add_score(&mut self, player: usize, reward: f64) {
        self.players[player].score += reward;
    }

    pub(crate) fn set_last_roll(&mut self, roll: u8) {
        self.last_roll = roll;
    }

    pub(crate) fn set_waiting_for_move(&mut self, waiting: bool) {
        self.waiting_for_move = waiting;
    }

    pub(crate) fn set_turn(&mut self, turn: usize) {
        self.turn = turn;
    }

    pub(crate) fn declare_winner(&mut self, player: usize) {
        self.game_over = true;
        self.winner = Some(self.players[player].color);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

//! Move generation and resolution.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::ai::learning::agent::LearningAgent;
use crate::ai::learning::state_key::StateKey;
use crate::config::constants::{
    BASE_MOVE_REWARD, BASE_POSITION, BONUS_ROLL, CAPTURE_REWARD, DIE_MAX, DIE_MIN,
    FINISHED_POSITION, FINISH_REWARD, NUM_PLAYERS, PIECES_PER_PLAYER, PROGRESS_REWARD_FACTOR,
    TRACK_START,
};
use crate::core::path::{absolute_index, is_on_track, is_safe_square};
use crate::core::state::{GameState, PlayerColor, Position};
use crate::utils::logging::{self, OperationCategory};

/// Caller broke a precondition of the engine. The offending call changes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    PieceOutOfRange(usize),
    PlayerOutOfRange(usize),
    InvalidRoll(u8),
    IllegalMove { piece: usize, roll: u8 },
    PositionOutOfRange { player: usize, piece: usize, position: Position },
    NotAwaitingSelection,
    AwaitingSelection,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::PieceOutOfRange(p) => write!(f, "Piece index {} is outside 0..{}", p, PIECES_PER_PLAYER),
            EngineError::PlayerOutOfRange(p) => write!(f, "Player index {} is outside 0..{}", p, NUM_PLAYERS),
            EngineError::InvalidRoll(r) => write!(f, "Roll {} is outside {}..={}", r, DIE_MIN, DIE_MAX),
            EngineError::IllegalMove { piece, roll } => {
                write!(f, "Piece {} cannot move with a roll of {}", piece, roll)
            }
            EngineError::PositionOutOfRange { player, piece, position } => write!(
                f,
                "Position {} of player {} piece {} is outside [{}, {}]",
                position, player, piece, BASE_POSITION, FINISHED_POSITION
            ),
            EngineError::NotAwaitingSelection => write!(f, "No roll is waiting for a piece selection"),
            EngineError::AwaitingSelection => write!(f, "A roll is still waiting for a piece selection"),
        }
    }
}

impl std::error::Error for EngineError {}

/// An opposing piece sent back to base by a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub player: PlayerColor,
    pub piece: usize,
    pub from: Position,
}

/// Descriptive record of a resolved move, used for logging and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveEvent {
    pub player: PlayerColor,
    pub piece: usize,
    pub roll: u8,
    pub from: Position,
    pub to: Position,
    pub captures: Vec<Capture>,
    pub reached_home: bool,
    pub won: bool,
}

impl fmt::Display for MoveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Moved P{} to {}", self.piece + 1, self.to)?;
        for _ in &self.captures {
            write!(f, " [KILL]")?;
        }
        if self.reached_home {
            write!(f, " [HOME]")?;
        }
        if self.won {
            write!(f, " [WINNER]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub reward: f64,
    pub event: MoveEvent,
}

/// Game in progress: the board plus the shared learner its moves report to.
///
/// The agent survives [`Game::reset`]; the board does not.
#[derive(Debug, Clone)]
pub struct Game {
    state: GameState,
    agent: Arc<LearningAgent>,
}

impl Game {
    pub fn new(agent: Arc<LearningAgent>) -> Self {
        Self::from_state(GameState::new(), agent)
    }

    pub fn from_state(state: GameState, agent: Arc<LearningAgent>) -> Self {
        Self { state, agent }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn agent(&self) -> &Arc<LearningAgent> {
        &self.agent
    }

    pub fn turn(&self) -> usize {
        self.state.turn()
    }

    pub fn position(&self, player: usize, piece: usize) -> Option<Position> {
        self.state.position(player, piece)
    }

    pub fn game_over(&self) -> bool {
        self.state.game_over()
    }

    pub fn winner(&self) -> Option<PlayerColor> {
        self.state.winner()
    }

    /// Fresh board, same agent.
    pub fn reset(&mut self) {
        self.state = GameState::new();
        info!("Board reset, value table kept ({} states)", self.agent.state_count());
    }

    /// Pieces of the current player that may move with `roll`, in piece order.
    /// A roll outside the die range has no valid moves.
    pub fn valid_moves(&self, roll: u8) -> Vec<usize> {
        if self.state.game_over() || !(DIE_MIN..=DIE_MAX).contains(&roll) {
            return Vec::new();
        }
        self.state
            .current_pieces()
            .iter()
            .enumerate()
            .filter(|&(_, &pos)| can_move(pos, roll))
            .map(|(i, _)| i)
            .collect()
    }

    /// Moves `piece` of the current player by `roll` and resolves captures and
    /// the win. Does not advance the turn; see [`Game::advance_turn`].
    pub fn move_piece(
        &mut self,
        piece: usize,
        roll: u8,
        learning_enabled: bool,
    ) -> Result<MoveOutcome, EngineError> {
        if piece >= PIECES_PER_PLAYER {
            return Err(EngineError::PieceOutOfRange(piece));
        }
        if !(DIE_MIN..=DIE_MAX).contains(&roll) {
            return Err(EngineError::InvalidRoll(roll));
        }
        if !self.valid_moves(roll).contains(&piece) {
            return Err(EngineError::IllegalMove { piece, roll });
        }

        let _timing = logging::start_timing("move_piece", OperationCategory::Simulation);

        let mover = self.state.turn();
        let before = self.state.current_pieces();
        let state_key = StateKey::new(before, roll);

        let from = before[piece];
        let to = if from == BASE_POSITION { TRACK_START } else { from + roll as Position };
        self.state.set_position(mover, piece, to);

        let mut reward = BASE_MOVE_REWARD + to as f64 * PROGRESS_REWARD_FACTOR;

        let captures = self.resolve_captures(mover, to);
        reward += CAPTURE_REWARD * captures.len() as f64;

        let reached_home = to == FINISHED_POSITION;
        let mut won = false;
        if reached_home {
            reward += FINISH_REWARD;
            if self.state.players()[mover].has_finished() {
                self.state.declare_winner(mover);
                won = true;
            }
        }

        self.state.add_score(mover, reward);

        if learning_enabled {
            self.agent.learn(state_key, piece, reward)?;
        }

        let event = MoveEvent {
            player: self.state.current_color(),
            piece,
            roll,
            from,
            to,
            captures,
            reached_home,
            won,
        };
        debug!(player = %event.player, reward, "{}", event);
        if won {
            info!(winner = %event.player, "Game over");
        }

        Ok(MoveOutcome { reward, event })
    }

    /// Sends every opposing track piece sharing the landing cell back to base,
    /// unless the landing cell is safe.
    fn resolve_captures(&mut self, mover: usize, landed: Position) -> Vec<Capture> {
        let Some(target) = absolute_index(mover, landed) else {
            return Vec::new();
        };
        if is_safe_square(target) {
            return Vec::new();
        }

        let mut captures = Vec::new();
        for (opponent, player) in self.state.players().clone().iter().enumerate() {
            if opponent == mover {
                continue;
            }
            for (piece, &pos) in player.pieces().iter().enumerate() {
                if is_on_track(pos) && absolute_index(opponent, pos) == Some(target) {
                    captures.push(Capture { player: player.color(), piece, from: pos });
                    self.state.set_position(opponent, piece, BASE_POSITION);
                }
            }
        }
        captures
    }

    /// Applies the turn rule after a roll has been resolved, moved or not:
    /// a six keeps the turn, anything else passes it on. No-op once the game is over.
    pub fn advance_turn(&mut self, roll: u8) {
        if self.state.game_over() {
            return;
        }
        if roll != BONUS_ROLL {
            self.state.set_turn((self.state.turn() + 1) % NUM_PLAYERS);
        }
    }

    /// Human flow, step one: record a roll for the current player.
    ///
    /// Returns the valid moves. When there are none the turn is resolved
    /// immediately; otherwise the game waits for [`Game::select_piece`].
    pub fn roll_for_selection(&mut self, roll: u8) -> Result<Vec<usize>, EngineError> {
        if !(DIE_MIN..=DIE_MAX).contains(&roll) {
            return Err(EngineError::InvalidRoll(roll));
        }
        if self.state.waiting_for_move() {
            return Err(EngineError::AwaitingSelection);
        }
        self.state.set_last_roll(roll);
        let valid = self.valid_moves(roll);
        if valid.is_empty() {
            self.advance_turn(roll);
        } else {
            self.state.set_waiting_for_move(true);
        }
        Ok(valid)
    }

    /// Human flow, step two: move the chosen piece with the pending roll.
    /// Human moves never train the table.
    pub fn select_piece(&mut self, piece: usize) -> Result<MoveOutcome, EngineError> {
        if !self.state.waiting_for_move() {
            return Err(EngineError::NotAwaitingSelection);
        }
        let roll = self.state.last_roll();
        let outcome = self.move_piece(piece, roll, false)?;
        self.state.set_waiting_for_move(false);
        self.advance_turn(roll);
        Ok(outcome)
    }

    pub(crate) fn record_roll(&mut self, roll: u8) {
        self.state.set_last_roll(roll);
    }
}

fn can_move(position: Position, roll: u8) -> bool {
    if position == BASE_POSITION {
        roll == BONUS_ROLL
    } else {
        position as i16 + roll as i16 <= FINISHED_POSITION as i16
    }
}

//! Turn orchestration for autonomous seats and the background game loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::constants::{DIE_MAX, DIE_MIN, HUMAN_POLL_DELAY_MS, NUM_PLAYERS};
use crate::core::engine::{EngineError, Game, MoveOutcome};
use crate::core::state::PlayerColor;
use crate::utils::logging::{self, OperationCategory};

/// Longest single sleep of the background loop, so a stop request is seen promptly.
const STOP_POLL_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum GameMode {
    /// Every seat is human; the loop only waits.
    #[value(name = "human")]
    HumanVsHuman,
    /// Every seat is autonomous and moves update the table.
    Training,
    /// Red is human, the rest play from the table without updating it.
    Play,
}

impl GameMode {
    pub fn is_ai_turn(self, turn: usize) -> bool {
        match self {
            GameMode::HumanVsHuman => false,
            GameMode::Training => true,
            GameMode::Play => turn != PlayerColor::Red.index(),
        }
    }

    pub fn learning_enabled(self) -> bool {
        matches!(self, GameMode::Training)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::HumanVsHuman => write!(f, "Human vs Human"),
            GameMode::Training => write!(f, "AI vs AI (Training)"),
            GameMode::Play => write!(f, "Human(Red) vs AI (Play)"),
        }
    }
}

pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(DIE_MIN..=DIE_MAX)
}

pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub player: PlayerColor,
    pub roll: u8,
    pub valid_moves: Vec<usize>,
    pub outcome: Option<MoveOutcome>,
}

impl fmt::Display for TurnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Some(outcome) => write!(
                f,
                "[{}] Rolled {}: {} (Rwd:{:.0})",
                self.player.tag(),
                self.roll,
                outcome.event,
                outcome.reward
            ),
            None => write!(f, "[{}] Rolled {}: no valid moves", self.player.tag(), self.roll),
        }
    }
}

/// One full autonomous turn: roll, pick from the table, move, pass the turn.
pub fn play_ai_turn<R: Rng + ?Sized>(
    game: &mut Game,
    rng: &mut R,
    training: bool,
) -> Result<TurnReport, EngineError> {
    let roll = roll_die(rng);
    play_ai_turn_with_roll(game, roll, rng, training)
}

pub fn play_ai_turn_with_roll<R: Rng + ?Sized>(
    game: &mut Game,
    roll: u8,
    rng: &mut R,
    training: bool,
) -> Result<TurnReport, EngineError> {
    if !(DIE_MIN..=DIE_MAX).contains(&roll) {
        return Err(EngineError::InvalidRoll(roll));
    }
    let player = game.state().current_color();
    game.record_roll(roll);
    let valid_moves = game.valid_moves(roll);

    let action = game.agent().choose_action(
        game.state().current_pieces(),
        roll,
        &valid_moves,
        training,
        rng,
    );

    let outcome = match action {
        Some(piece) => Some(game.move_piece(piece, roll, training)?),
        None => None,
    };
    game.advance_turn(roll);

    Ok(TurnReport { player, roll, valid_moves, outcome })
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub winner: Option<PlayerColor>,
    pub turns: usize,
    pub scores: [f64; NUM_PLAYERS],
}

/// Plays autonomous turns until somebody wins or `max_turns` is reached.
pub fn play_game<R: Rng + ?Sized>(
    game: &mut Game,
    rng: &mut R,
    training: bool,
    max_turns: usize,
) -> Result<GameSummary, EngineError> {
    let _timing = logging::start_timing("play_game", OperationCategory::Simulation);

    let mut turns = 0;
    while !game.game_over() && turns < max_turns {
        let report = play_ai_turn(game, rng, training)?;
        debug!("{}", report);
        turns += 1;
    }

    Ok(GameSummary {
        winner: game.winner(),
        turns,
        scores: game.state().players().clone().map(|p| p.score()),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Cancelled,
    GameOver(PlayerColor),
    TurnLimit,
    Failed(EngineError),
    Panicked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverExit {
    pub reason: StopReason,
    pub turns_played: usize,
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub mode: GameMode,
    pub turn_delay: Duration,
    pub max_turns: usize,
    pub seed: Option<u64>,
}

/// Handle to a game loop running on its own thread.
///
/// The loop locks the game for one whole turn at a time and checks the stop
/// flag only between turns, so a move is never interrupted. Human seats use
/// the same `Arc<Mutex<Game>>` from the caller's side.
pub struct AutonomousDriver {
    running: Arc<AtomicBool>,
    turns_played: Arc<AtomicUsize>,
    handle: JoinHandle<DriverExit>,
}

impl AutonomousDriver {
    pub fn spawn(game: Arc<Mutex<Game>>, options: DriverOptions) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let turns_played = Arc::new(AtomicUsize::new(0));

        let loop_running = Arc::clone(&running);
        let loop_turns = Arc::clone(&turns_played);
        let handle = std::thread::spawn(move || run_loop(game, options, loop_running, loop_turns));

        Self { running, turns_played, handle }
    }

    pub fn turns_played(&self) -> usize {
        self.turns_played.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Requests cancellation and waits for the in-flight turn to complete.
    pub fn stop(self) -> DriverExit {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Waits for the loop to end on its own.
    pub fn join(self) -> DriverExit {
        let turns_played = Arc::clone(&self.turns_played);
        self.handle.join().unwrap_or_else(|_| {
            error!("Autonomous driver thread panicked");
            DriverExit {
                reason: StopReason::Panicked,
                turns_played: turns_played.load(Ordering::SeqCst),
            }
        })
    }
}

fn run_loop(
    game: Arc<Mutex<Game>>,
    options: DriverOptions,
    running: Arc<AtomicBool>,
    turns_played: Arc<AtomicUsize>,
) -> DriverExit {
    let mut rng = seeded_rng(options.seed);
    let training = options.mode.learning_enabled();
    info!(mode = %options.mode, delay_ms = options.turn_delay.as_millis() as u64, "Autonomous driver started");

    let exit = |reason: StopReason| DriverExit {
        reason,
        turns_played: turns_played.load(Ordering::SeqCst),
    };

    loop {
        if !running.load(Ordering::SeqCst) {
            info!("Autonomous driver cancelled");
            return exit(StopReason::Cancelled);
        }
        if turns_played.load(Ordering::SeqCst) >= options.max_turns {
            info!(max_turns = options.max_turns, "Turn limit reached");
            return exit(StopReason::TurnLimit);
        }

        // Whole turn under the lock
        let delay = {
            let mut game = game.lock();
            if let Some(winner) = game.winner() {
                info!(%winner, "Autonomous driver finished");
                return exit(StopReason::GameOver(winner));
            }

            if options.mode.is_ai_turn(game.turn()) && !game.state().waiting_for_move() {
                match play_ai_turn(&mut *game, &mut rng, training) {
                    Ok(report) => {
                        info!("{}", report);
                        turns_played.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        error!(error = %e, "Autonomous turn failed");
                        return exit(StopReason::Failed(e));
                    }
                }
                options.turn_delay
            } else {
                Duration::from_millis(HUMAN_POLL_DELAY_MS)
            }
        };

        sleep_unless_stopped(delay, &running);
    }
}

fn sleep_unless_stopped(delay: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(STOP_POLL_SLICE));
    }
}

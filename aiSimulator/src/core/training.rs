//! Many autonomous training games against one shared value table.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::ai::learning::agent::LearningAgent;
use crate::ai::learning::serialization::ModelError;
use crate::config::constants::NUM_PLAYERS;
use crate::core::driver::{play_game, seeded_rng};
use crate::core::engine::{EngineError, Game};
use crate::core::state::PlayerColor;
use crate::utils::logging::{self, OperationCategory};

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub games: usize,
    pub parallel: bool,
    pub seed: Option<u64>,
    pub max_turns: usize,
    /// Save the table every this many completed games (0 disables).
    pub checkpoint_interval: usize,
    pub checkpoint_path: Option<PathBuf>,
    pub progress_interval: usize,
    pub show_progress: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub index: usize,
    pub winner: Option<PlayerColor>,
    pub turns: usize,
    pub scores: [f64; NUM_PLAYERS],
    pub states_after: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub records: Vec<GameRecord>,
    pub wins: [usize; NUM_PLAYERS],
    pub unfinished: usize,
    pub total_turns: usize,
    pub states: usize,
    pub elapsed: Duration,
}

impl TrainingSummary {
    fn from_records(records: Vec<GameRecord>, states: usize, elapsed: Duration) -> Self {
        let mut wins = [0; NUM_PLAYERS];
        let mut unfinished = 0;
        for record in &records {
            match record.winner {
                Some(color) => wins[color.index()] += 1,
                None => unfinished += 1,
            }
        }
        let total_turns = records.iter().map(|r| r.turns).sum();
        Self { records, wins, unfinished, total_turns, states, elapsed }
    }

    pub fn games(&self) -> usize {
        self.records.len()
    }

    pub fn average_turns(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.total_turns as f64 / self.records.len() as f64
        }
    }
}

impl fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Games: {} ({} hit the turn limit)", self.games(), self.unfinished)?;
        writeln!(f, "Average turns per game: {:.1}", self.average_turns())?;
        for color in PlayerColor::ALL {
            writeln!(f, "  {:<6} wins: {}", color.to_string(), self.wins[color.index()])?;
        }
        writeln!(f, "States in table: {}", self.states)?;
        write!(f, "Elapsed: {:.2}s", self.elapsed.as_secs_f64())
    }
}

#[derive(Debug)]
pub enum TrainingError {
    Engine(EngineError),
    Checkpoint(ModelError),
}

impl From<EngineError> for TrainingError {
    fn from(err: EngineError) -> Self {
        TrainingError::Engine(err)
    }
}

impl From<ModelError> for TrainingError {
    fn from(err: ModelError) -> Self {
        TrainingError::Checkpoint(err)
    }
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::Engine(e) => write!(f, "Engine error during training: {}", e),
            TrainingError::Checkpoint(e) => write!(f, "Checkpoint failed: {}", e),
        }
    }
}

impl std::error::Error for TrainingError {}

/// Runs `options.games` complete games with every seat learning into `agent`.
///
/// In parallel mode games run on the rayon pool; the agent's lock is the
/// only synchronisation between them. Each game gets its own RNG derived from
/// the seed, so sequential seeded runs are reproducible.
pub fn run_training(
    agent: &Arc<LearningAgent>,
    options: &TrainingOptions,
) -> Result<TrainingSummary, TrainingError> {
    let _timing = logging::start_timing("run_training", OperationCategory::Simulation);
    let start = Instant::now();

    info!(
        games = options.games,
        parallel = options.parallel,
        states = agent.state_count(),
        "Starting training run"
    );

    let progress = if options.show_progress {
        let bar = ProgressBar::new(options.games as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} games ({per_sec}, eta {eta})",
        ) {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };
    let completed = AtomicUsize::new(0);

    let run_one = |index: usize| -> Result<GameRecord, TrainingError> {
        let mut rng = seeded_rng(options.seed.map(|s| s.wrapping_add(index as u64)));
        let mut game = Game::new(Arc::clone(agent));
        let summary = play_game(&mut game, &mut rng, true, options.max_turns)?;
        if summary.winner.is_none() {
            warn!(game = index, turns = summary.turns, "Game stopped at the turn limit");
        }

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        progress.inc(1);
        if options.progress_interval > 0 && done % options.progress_interval == 0 {
            info!(done, total = options.games, states = agent.state_count(), "Training progress");
        }
        if let Some(path) = &options.checkpoint_path {
            if options.checkpoint_interval > 0 && done % options.checkpoint_interval == 0 {
                agent.save(path)?;
            }
        }

        Ok(GameRecord {
            index,
            winner: summary.winner,
            turns: summary.turns,
            scores: summary.scores,
            states_after: agent.state_count(),
        })
    };

    let records: Vec<GameRecord> = if options.parallel {
        (0..options.games).into_par_iter().map(run_one).collect::<Result<_, _>>()?
    } else {
        (0..options.games).map(run_one).collect::<Result<_, _>>()?
    };
    progress.finish_and_clear();

    let summary = TrainingSummary::from_records(records, agent.state_count(), start.elapsed());
    info!(
        games = summary.games(),
        states = summary.states,
        avg_turns = summary.average_turns(),
        "Training run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(games: usize, parallel: bool) -> TrainingOptions {
        TrainingOptions {
            games,
            parallel,
            seed: Some(2024),
            max_turns: 20_000,
            checkpoint_interval: 0,
            checkpoint_path: None,
            progress_interval: 0,
            show_progress: false,
        }
    }

    #[test]
    fn sequential_training_plays_every_game() {
        let agent = Arc::new(LearningAgent::new());
        let summary = run_training(&agent, &options(5, false)).unwrap();
        assert_eq!(summary.games(), 5);
        assert_eq!(summary.wins.iter().sum::<usize>() + summary.unfinished, 5);
        assert!(summary.states > 0);
        assert_eq!(summary.states, agent.state_count());
        let indices: Vec<usize> = summary.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn parallel_training_shares_one_table() {
        let agent = Arc::new(LearningAgent::new());
        let summary = run_training(&agent, &options(8, true)).unwrap();
        assert_eq!(summary.games(), 8);
        assert_eq!(summary.states, agent.state_count());
        assert!(summary.total_turns > 0);
    }

    #[test]
    fn zero_games_is_an_empty_run() {
        let agent = Arc::new(LearningAgent::new());
        let summary = run_training(&agent, &options(0, false)).unwrap();
        assert_eq!(summary.games(), 0);
        assert_eq!(summary.average_turns(), 0.0);
        assert_eq!(agent.state_count(), 0);
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use rand::Rng;
use tracing::info;

use ludo_sim::ai::learning::LearningAgent;
use ludo_sim::cli::cli::{Args, Command};
use ludo_sim::config::simulation_config::SimulationConfig;
use ludo_sim::core::driver::{roll_die, seeded_rng, AutonomousDriver, DriverOptions, GameMode};
use ludo_sim::core::engine::Game;
use ludo_sim::core::training::{run_training, TrainingOptions};
use ludo_sim::utils::csv_export::GameResultExporter;
use ludo_sim::utils::logging;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.enable_timing(), args.debug_logging());

    let config = match args.config() {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    // One table for every seat and every game in this process
    let agent = Arc::new(LearningAgent::with_config(config.learning.clone()));

    match args.command() {
        Command::Train { games, parallel, seed, model, load, checkpoint_interval, csv_dir } => {
            if let Some(path) = load {
                agent
                    .load(path)
                    .with_context(|| format!("Failed to load model {}", path.display()))?;
            }

            let options = TrainingOptions {
                games: *games,
                parallel: *parallel,
                seed: *seed,
                max_turns: config.driver.max_turns,
                checkpoint_interval: checkpoint_interval.unwrap_or(config.driver.checkpoint_interval),
                checkpoint_path: Some(model.clone()),
                progress_interval: config.driver.progress_interval,
                show_progress: true,
            };
            let summary = run_training(&agent, &options)?;

            if let Some(dir) = csv_dir {
                let exporter = GameResultExporter::new(dir)?;
                exporter.export_games(&summary.records)?;
            }

            agent
                .save(model)
                .with_context(|| format!("Failed to save model {}", model.display()))?;
            println!("{}", summary);
        }

        Command::Watch { mode, delay_ms, seed, load, max_turns, save } => {
            if let Some(path) = load {
                agent
                    .load(path)
                    .with_context(|| format!("Failed to load model {}", path.display()))?;
            }
            let delay = Duration::from_millis(delay_ms.unwrap_or(config.driver.turn_delay_ms));

            let game = Arc::new(Mutex::new(Game::new(Arc::clone(&agent))));
            let driver = AutonomousDriver::spawn(
                Arc::clone(&game),
                DriverOptions {
                    mode: *mode,
                    turn_delay: delay,
                    max_turns: max_turns.unwrap_or(config.driver.max_turns),
                    seed: *seed,
                },
            );

            // Stand-in for human seats: rolls and takes the first valid piece
            let mut rng = seeded_rng(seed.map(|s| s.wrapping_add(1)));
            while !driver.is_finished() {
                play_scripted_human_turn(&game, *mode, &mut rng)?;
                std::thread::sleep(delay.max(Duration::from_millis(10)));
            }

            let exit = driver.join();
            let game = game.lock();
            info!(reason = ?exit.reason, turns = exit.turns_played, "Game finished");
            for player in game.state().players() {
                println!(
                    "{:<6} pieces {:?} score {:.1}",
                    player.color().to_string(),
                    player.pieces(),
                    player.score()
                );
            }
            match game.winner() {
                Some(winner) => println!("WINNER: {}", winner),
                None => println!("No winner ({:?})", exit.reason),
            }

            if let Some(path) = save {
                agent
                    .save(path)
                    .with_context(|| format!("Failed to save model {}", path.display()))?;
            }
        }

        Command::Inspect { model, top } => {
            agent
                .load(model)
                .with_context(|| format!("Failed to load model {}", model.display()))?;

            let table = agent.snapshot();
            println!("States: {}", table.len());
            println!("Recorded actions: {}", agent.entry_count());

            let mut values: Vec<_> = table
                .iter()
                .flat_map(|(key, actions)| {
                    actions
                        .iter()
                        .enumerate()
                        .filter_map(move |(action, value)| value.map(|v| (*key, action, v)))
                })
                .collect();
            values.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
            for (key, action, value) in values.iter().take(*top) {
                println!("  {:<22} piece {} -> {:.3}", key.to_string(), action, value);
            }
        }
    }

    logging::print_timing_report();
    Ok(())
}

fn play_scripted_human_turn<R: Rng>(game: &Mutex<Game>, mode: GameMode, rng: &mut R) -> Result<()> {
    let mut game = game.lock();
    if game.game_over() || mode.is_ai_turn(game.turn()) {
        return Ok(());
    }
    let player = game.state().current_color();
    let roll = roll_die(rng);
    let valid = game.roll_for_selection(roll)?;
    match valid.first() {
        Some(&piece) => {
            let outcome = game.select_piece(piece)?;
            info!("[{}] (human) {} (Rwd:{:.0})", player.tag(), outcome.event, outcome.reward);
        }
        None => info!("[{}] (human) Rolled {}: no valid moves", player.tag(), roll),
    }
    Ok(())
}

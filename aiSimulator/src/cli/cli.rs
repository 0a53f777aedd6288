use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::driver::GameMode;

#[derive(Parser)]
#[command(author, version, about = "Ludo simulator with a shared value-table learner", long_about = None)]
pub struct Args {
    #[arg(long, global = true, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, global = true, help = "Enable debug-level logging", default_value_t = false)]
    debug: bool,

    #[arg(long, global = true, help = "JSON file overriding learning and driver settings")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Play many AI-vs-AI games, updating the shared table
    Train {
        #[arg(short = 'n', long, default_value_t = 1000)]
        games: usize,

        #[arg(short, long, default_value_t = false)]
        parallel: bool,

        #[arg(long, help = "Random seed for reproducible runs")]
        seed: Option<u64>,

        #[arg(short, long, default_value = "model.json", help = "Where the trained table is saved")]
        model: PathBuf,

        #[arg(short, long, help = "Model to continue training from")]
        load: Option<PathBuf>,

        #[arg(short = 'i', long, help = "Save the model every N games")]
        checkpoint_interval: Option<usize>,

        #[arg(long, help = "Directory for a per-game results CSV")]
        csv_dir: Option<PathBuf>,
    },

    /// Run one game on the background driver and log every turn
    Watch {
        #[arg(long, value_enum, default_value_t = GameMode::Training)]
        mode: GameMode,

        #[arg(long, help = "Delay between turns in milliseconds")]
        delay_ms: Option<u64>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(short, long)]
        load: Option<PathBuf>,

        #[arg(long, help = "Stop after this many turns")]
        max_turns: Option<usize>,

        #[arg(long, help = "Save the table here when the game ends")]
        save: Option<PathBuf>,
    },

    /// Load a model and print table statistics
    Inspect {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(long, default_value_t = 10, help = "How many of the highest values to list")]
        top: usize,
    },
}

impl Args {
    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn debug_logging(&self) -> bool {
        self.debug
    }

    pub fn config(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_train_flags() {
        let args = Args::try_parse_from([
            "ludo-sim", "--debug", "train", "-n", "50", "--parallel", "--seed", "7", "--model", "out/m.json",
        ])
        .unwrap();
        assert!(args.debug_logging());
        match args.command() {
            Command::Train { games, parallel, seed, model, load, .. } => {
                assert_eq!(*games, 50);
                assert!(*parallel);
                assert_eq!(*seed, Some(7));
                assert_eq!(model, &PathBuf::from("out/m.json"));
                assert!(load.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn parses_watch_mode() {
        let args = Args::try_parse_from(["ludo-sim", "watch", "--mode", "play", "--delay-ms", "0"]).unwrap();
        match args.command() {
            Command::Watch { mode, delay_ms, .. } => {
                assert_eq!(*mode, GameMode::Play);
                assert_eq!(*delay_ms, Some(0));
            }
            _ => panic!("expected watch"),
        }
    }
}

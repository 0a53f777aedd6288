// Main module declarations for the Ludo simulator

// Board, rules and game drivers
pub mod core {
    pub mod path;
    pub mod state;
    pub mod engine;
    pub mod driver;
    pub mod training;
}

// Shared learner
pub mod ai;

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod simulation_config;
}

// Utility functions
pub mod utils {
    pub mod logging;
    pub mod csv_export;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used types
pub use crate::ai::learning::{LearningAgent, StateKey};
pub use crate::core::engine::{EngineError, Game, MoveOutcome};
pub use crate::core::state::{GameState, PlayerColor, Position};

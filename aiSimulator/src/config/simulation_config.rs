use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::constants::{
    DEFAULT_LEARNING_RATE, DEFAULT_MAX_TURNS, DEFAULT_TURN_DELAY_MS, INFERENCE_EXPLORATION_RATE,
    TRAINING_EXPLORATION_RATE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub learning_rate: f64,              // Step size of the incremental average
    pub training_exploration_rate: f64,  // Epsilon while the table is being trained
    pub inference_exploration_rate: f64, // Epsilon while only playing
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            training_exploration_rate: TRAINING_EXPLORATION_RATE,
            inference_exploration_rate: INFERENCE_EXPLORATION_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub turn_delay_ms: u64,
    pub max_turns: usize,
    pub checkpoint_interval: usize, // Games between model checkpoints, 0 disables
    pub progress_interval: usize,   // Games between progress log lines
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: DEFAULT_TURN_DELAY_MS,
            max_turns: DEFAULT_MAX_TURNS,
            checkpoint_interval: 0,
            progress_interval: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub learning: LearningConfig,
    pub driver: DriverConfig,
}

impl SimulationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"driver": {"max_turns": 42}}"#).unwrap();
        assert_eq!(config.driver.max_turns, 42);
        assert_eq!(config.driver.turn_delay_ms, DEFAULT_TURN_DELAY_MS);
        assert_eq!(config.learning, LearningConfig::default());
    }

    #[test]
    fn default_learning_rates_match_constants() {
        let learning = LearningConfig::default();
        assert_eq!(learning.learning_rate, 0.5);
        assert_eq!(learning.training_exploration_rate, 0.2);
        assert_eq!(learning.inference_exploration_rate, 0.05);
    }
}

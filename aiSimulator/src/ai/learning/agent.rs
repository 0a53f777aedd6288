//! Shared value-table learner used by every seat at the table.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::ai::learning::serialization::{self, ModelError};
use crate::ai::learning::state_key::StateKey;
use crate::config::constants::{DEFAULT_ACTION_VALUE, PIECES_PER_PLAYER};
use crate::config::simulation_config::LearningConfig;
use crate::core::engine::EngineError;
use crate::core::state::Position;
use crate::utils::logging::{self, FileIOType, OperationCategory, WeightsUpdateType};

/// Recorded estimate per piece index; `None` means the action was never updated.
pub type ActionValues = [Option<f64>; PIECES_PER_PLAYER];

pub type ValueTable = HashMap<StateKey, ActionValues>;

lazy_static! {
    /// Serializes model file access when several agents write the same path.
    static ref FILE_MUTEX: Mutex<()> = Mutex::new(());
}

/// Value table plus the epsilon-greedy policy over it.
///
/// The table is the one resource shared between games and seats. Every
/// operation takes the single table lock for its whole read-modify-write or
/// read-then-select, so an `Arc<LearningAgent>` can be handed to any number of
/// concurrent games. The lock is never held across file I/O.
#[derive(Debug)]
pub struct LearningAgent {
    table: Mutex<ValueTable>,
    config: LearningConfig,
}

impl LearningAgent {
    pub fn new() -> Self {
        Self::with_config(LearningConfig::default())
    }

    pub fn with_config(config: LearningConfig) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn exploration_rate(&self, training: bool) -> f64 {
        if training {
            self.config.training_exploration_rate
        } else {
            self.config.inference_exploration_rate
        }
    }

    /// Picks a piece from `valid_moves` for the mover.
    ///
    /// Explores uniformly with probability epsilon. Otherwise an unseen state
    /// is also a uniform pick, and a known state takes the highest value among
    /// `valid_moves`, unknown actions counting as 0.0 and ties going to the
    /// earliest entry of `valid_moves`.
    pub fn choose_action<R: Rng + ?Sized>(
        &self,
        positions: [Position; PIECES_PER_PLAYER],
        roll: u8,
        valid_moves: &[usize],
        training: bool,
        rng: &mut R,
    ) -> Option<usize> {
        if valid_moves.is_empty() {
            return None;
        }
        let _timing = logging::start_timing(
            "choose_action",
            OperationCategory::WeightsUpdate { subcategory: WeightsUpdateType::ActionSelection },
        );

        if rng.gen::<f64>() < self.exploration_rate(training) {
            return valid_moves.choose(rng).copied();
        }

        let key = StateKey::new(positions, roll);
        let table = self.table.lock();
        let Some(values) = table.get(&key) else {
            return valid_moves.choose(rng).copied();
        };

        let mut best_action = valid_moves[0];
        let mut best_value = f64::NEG_INFINITY;
        for &action in valid_moves {
            let value = values
                .get(action)
                .copied()
                .flatten()
                .unwrap_or(DEFAULT_ACTION_VALUE);
            if value > best_value {
                best_value = value;
                best_action = action;
            }
        }
        Some(best_action)
    }

    /// One-step incremental average: `new = old + alpha * (reward - old)`.
    ///
    /// There is no discounted next-state term; the next roll is unknown when
    /// the update happens. An action outside the piece range is rejected and
    /// nothing is recorded.
    pub fn learn(&self, key: StateKey, action: usize, reward: f64) -> Result<(), EngineError> {
        if action >= PIECES_PER_PLAYER {
            return Err(EngineError::PieceOutOfRange(action));
        }
        let _timing = logging::start_timing(
            "learn",
            OperationCategory::WeightsUpdate { subcategory: WeightsUpdateType::ActionUpdate },
        );

        let mut table = self.table.lock();
        let values = table.entry(key).or_insert([None; PIECES_PER_PLAYER]);
        let old_value = values[action].unwrap_or(DEFAULT_ACTION_VALUE);
        let new_value = old_value + self.config.learning_rate * (reward - old_value);
        values[action] = Some(new_value);
        Ok(())
    }

    pub fn value(&self, key: &StateKey, action: usize) -> Option<f64> {
        self.table.lock().get(key)?.get(action).copied().flatten()
    }

    pub fn contains_state(&self, key: &StateKey) -> bool {
        self.table.lock().contains_key(key)
    }

    pub fn state_count(&self) -> usize {
        self.table.lock().len()
    }

    pub fn entry_count(&self) -> usize {
        self.table
            .lock()
            .values()
            .map(|values| values.iter().filter(|v| v.is_some()).count())
            .sum()
    }

    /// Copy of the whole table.
    pub fn snapshot(&self) -> ValueTable {
        self.table.lock().clone()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let _timing = logging::start_timing(
            "save_model",
            OperationCategory::FileIO { subcategory: FileIOType::CheckpointSave },
        );
        let _lock = FILE_MUTEX.lock();

        // Snapshot first so the table lock is not held during the write
        let serializable = serialization::to_serializable(&self.table.lock());
        let states = serializable.len();

        let result = write_model(path, &serializable);
        match &result {
            Ok(()) => info!(path = %path.display(), states, "Model saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "Model save failed"),
        }
        result
    }

    /// Replaces the table with the contents of `path`.
    ///
    /// The file is fully parsed and validated before the swap; on any error
    /// the current table is left exactly as it was.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let _timing = logging::start_timing(
            "load_model",
            OperationCategory::FileIO { subcategory: FileIOType::CheckpointLoad },
        );

        let loaded = {
            let _lock = FILE_MUTEX.lock();
            std::fs::read_to_string(path)
                .map_err(ModelError::from)
                .and_then(|json| serialization::parse_model(&json))
        };

        match loaded {
            Ok(new_table) => {
                let states = new_table.len();
                *self.table.lock() = new_table;
                info!(path = %path.display(), states, "Model loaded");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Model load failed, keeping current table");
                Err(e)
            }
        }
    }

    pub fn clear(&self) {
        self.table.lock().clear();
        debug!("Value table cleared");
    }
}

impl Default for LearningAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn write_model(path: &Path, serializable: &serialization::SerializableTable) -> Result<(), ModelError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(serializable)?;

    // Write beside the target and rename so a crash never leaves a half file
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

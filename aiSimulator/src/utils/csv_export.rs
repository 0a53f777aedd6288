use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::core::training::GameRecord;
use crate::utils::logging::{self, FileIOType, OperationCategory};

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err)
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "IO error: {}", e),
            ExportError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

#[derive(Debug, Serialize)]
struct GameRow<'a> {
    game: usize,
    winner: &'a str,
    turns: usize,
    red_score: f64,
    green_score: f64,
    yellow_score: f64,
    blue_score: f64,
    table_states: usize,
    exported_at: &'a str,
}

/// Writes per-game training results under `<output_dir>/<timestamp>/`.
pub struct GameResultExporter {
    output_dir: PathBuf,
    timestamp: String,
}

impl GameResultExporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let output_dir = output_dir.as_ref().join(&timestamp);
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir, timestamp })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn export_games(&self, records: &[GameRecord]) -> Result<PathBuf, ExportError> {
        let _timing = logging::start_timing(
            "export_games",
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave },
        );
        let path = self.output_dir.join("games.csv");
        let mut writer = csv::Writer::from_path(&path)?;

        for record in records {
            let winner = record.winner.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string());
            let [red, green, yellow, blue] = record.scores;
            writer.serialize(GameRow {
                game: record.index,
                winner: &winner,
                turns: record.turns,
                red_score: red,
                green_score: green,
                yellow_score: yellow,
                blue_score: blue,
                table_states: record.states_after,
                exported_at: &self.timestamp,
            })?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = records.len(), "Exported game results");
        Ok(path)
    }
}

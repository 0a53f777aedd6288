// AI module structure for the Ludo simulator

// Learning module - value table, state keys and model files
pub mod learning;

pub use learning::LearningAgent;

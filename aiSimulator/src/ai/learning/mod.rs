//! AI Learning Module
//!
//! One value table shared by every seat, its state encoding and its file format.

pub mod agent;
pub mod serialization;
pub mod state_key;

pub use self::agent::{LearningAgent, ValueTable};
pub use self::serialization::ModelError;
pub use self::state_key::StateKey;

// Board Geometry
pub const NUM_PLAYERS: usize = 4;
pub const PIECES_PER_PLAYER: usize = 4;
pub const TRACK_LENGTH: i8 = 52;                 // Cells on the shared cyclic track
pub const PLAYER_TRACK_OFFSET: i8 = 13;          // Entry point spacing between colours

// Relative Positions
pub const BASE_POSITION: i8 = -1;
pub const TRACK_START: i8 = 0;
pub const LAST_TRACK_POSITION: i8 = 50;
pub const HOME_STRETCH_START: i8 = 51;
pub const FINISHED_POSITION: i8 = 57;

// Safe squares (absolute track indices)
pub const SAFE_SQUARES: [i8; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

// Dice
pub const DIE_MIN: u8 = 1;
pub const DIE_MAX: u8 = 6;
pub const BONUS_ROLL: u8 = 6;                    // Releases a piece and keeps the turn
pub const NO_ROLL: u8 = 0;

// Rewards
pub const BASE_MOVE_REWARD: f64 = 1.0;
pub const PROGRESS_REWARD_FACTOR: f64 = 0.1;    // Per relative cell of the landing position
pub const CAPTURE_REWARD: f64 = 50.0;           // Per opposing piece sent back to base
pub const FINISH_REWARD: f64 = 100.0;

// Learning
pub const DEFAULT_LEARNING_RATE: f64 = 0.5;
pub const TRAINING_EXPLORATION_RATE: f64 = 0.2;
pub const INFERENCE_EXPLORATION_RATE: f64 = 0.05;
pub const DEFAULT_ACTION_VALUE: f64 = 0.0;

// Driver
pub const DEFAULT_TURN_DELAY_MS: u64 = 100;
pub const HUMAN_POLL_DELAY_MS: u64 = 500;        // Autonomous loop idle time on a human seat
pub const DEFAULT_MAX_TURNS: usize = 10_000;     // Safety cap for unattended games

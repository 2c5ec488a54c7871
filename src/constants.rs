//! Configuration constants for the Sortonym game system
//!
//! This module contains all the configuration limits and constraints
//! used throughout the game system to ensure data integrity and
//! provide consistent boundaries for different game components.

/// Lobby configuration constants
pub mod lobby {
    /// Number of characters in a lobby code
    pub const CODE_LENGTH: usize = 6;
    /// Characters a lobby code is drawn from
    pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    /// Maximum number of code draws before giving up on finding a free one
    pub const CODE_ATTEMPTS: usize = 32;
    /// Maximum number of players allowed in a single lobby
    pub const MAX_PLAYER_COUNT: usize = 100;
    /// Minimum number of distinct teams required to start a game
    pub const MIN_TEAM_COUNT: usize = 2;
    /// Number of rounds every team-assigned player must complete
    pub const ROUND_TARGET: usize = 5;
    /// Maximum length of a player display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Maximum length of a team label in characters
    pub const MAX_TEAM_LABEL_LENGTH: usize = 50;
}

/// Scoring configuration constants
pub mod scoring {
    /// Points awarded per correctly sorted word
    pub const POINTS_PER_CORRECT: f64 = 1.0;
    /// Bonus points per remaining second, before the completeness scale
    pub const TIME_BONUS_RATE: f64 = 0.1;
}

/// Round configuration constants
pub mod round {
    /// Maximum number of words a caller may exclude from a single draw
    pub const MAX_EXCLUDE_WORDS: usize = 500;
}

//! Round scoring engine
//!
//! This module computes the score for a submitted round: which candidate
//! words were sorted into the right slot, the time bonus for finishing
//! early, and the difficulty multiplier applied on top. Scoring is a pure
//! function of the submission, the ground truth, and the level
//! configuration; persisting the outcome is the caller's concern.

use std::collections::{HashMap, HashSet};

use enum_map::{Enum, EnumMap, enum_map};
use serde::{Deserialize, Serialize};

use super::{
    constants,
    round::{CandidateWord, WordKind},
    words::WordSet,
};

/// Difficulty tiers a round can be played at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    /// Common words, three pairs, generous time limit
    Easy,
    /// The default tier: four pairs at a standard time limit
    #[default]
    Medium,
    /// Rare words, five pairs, tight time limit
    Hard,
}

impl Difficulty {
    /// Returns the level configuration for this difficulty
    pub fn config(self) -> LevelConfig {
        level_table()[self]
    }
}

/// Per-difficulty round parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Round time limit in seconds
    pub time_limit: u32,
    /// Number of synonym/antonym pairs dealt into the round
    pub pair_count: usize,
    /// Multiplier applied to the combined base score and time bonus
    pub multiplier: f64,
}

/// Returns the full difficulty-to-configuration table
pub fn level_table() -> EnumMap<Difficulty, LevelConfig> {
    enum_map! {
        Difficulty::Easy => LevelConfig {
            time_limit: 90,
            pair_count: 3,
            multiplier: 1.0,
        },
        Difficulty::Medium => LevelConfig {
            time_limit: 60,
            pair_count: 4,
            multiplier: 1.5,
        },
        Difficulty::Hard => LevelConfig {
            time_limit: 45,
            pair_count: 5,
            multiplier: 2.0,
        },
    }
}

/// The answers a player submitted for one round
///
/// Each entry is the opaque id of a candidate word, placed into either the
/// synonym slot or the antonym slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    /// Candidate ids the player sorted as synonyms
    pub synonyms: Vec<u32>,
    /// Candidate ids the player sorted as antonyms
    pub antonyms: Vec<u32>,
    /// Elapsed seconds between the deal and the submission
    pub time_taken: f64,
}

/// The outcome of scoring one submission
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Final score: `(base_score + time_bonus) * multiplier`
    pub total: f64,
    /// Points from correctly sorted words alone
    pub base_score: f64,
    /// Bonus for remaining time, scaled by answer completeness
    pub time_bonus: f64,
    /// Number of correctly sorted words
    pub correct_count: u32,
}

/// The highest score a full, instant submission could not exceed on words
/// alone
///
/// Reported alongside submit outcomes so clients can show "score out of
/// max"; the time bonus is deliberately excluded, matching how the original
/// game reported percentages against the word count.
pub fn max_score(config: LevelConfig) -> f64 {
    total_expected(config) as f64 * config.multiplier
}

/// Number of candidate words a complete answer is expected to sort
fn total_expected(config: LevelConfig) -> usize {
    (config.pair_count * 2).max(1)
}

/// Counts the submitted ids that were sorted into the right slot
///
/// An id counts iff the candidate it decodes to carries the slot's kind
/// *and* its word (lowercased) belongs to the matching ground-truth set.
/// Unknown ids and duplicates of already-counted ids are ignored.
fn count_correct(
    submitted: &[u32],
    slot: WordKind,
    by_id: &HashMap<u32, &CandidateWord>,
    truth: &HashSet<String>,
) -> u32 {
    let mut seen = HashSet::new();

    submitted
        .iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| by_id.get(id))
        .filter(|candidate| candidate.kind == slot && truth.contains(&candidate.word.to_lowercase()))
        .count() as u32
}

/// Scores a submission against a round's candidates and ground truth
///
/// # Arguments
///
/// * `submission` - the player's sorted candidate ids and elapsed time
/// * `candidates` - the candidate words dealt into the round, keyed by id
/// * `truth` - the ground-truth synonym and antonym sets for the anchor
/// * `config` - the level configuration the round was dealt at
///
/// # Returns
///
/// The computed [`ScoreResult`]. The formula:
///
/// ```text
/// base      = correct * 1.0
/// remaining = max(0, time_limit - time_taken)
/// bonus     = remaining * 0.1 * (correct / max(pair_count * 2, 1))
/// total     = (base + bonus) * multiplier
/// ```
///
/// A fully wrong answer earns zero bonus no matter how much time remains.
pub fn score(
    submission: &Submission,
    candidates: &[CandidateWord],
    truth: &WordSet,
    config: LevelConfig,
) -> ScoreResult {
    let by_id: HashMap<u32, &CandidateWord> =
        candidates.iter().map(|word| (word.id, word)).collect();

    let correct_count = count_correct(
        &submission.synonyms,
        WordKind::Synonym,
        &by_id,
        &truth.synonym_set(),
    ) + count_correct(
        &submission.antonyms,
        WordKind::Antonym,
        &by_id,
        &truth.antonym_set(),
    );

    let base_score = f64::from(correct_count) * constants::scoring::POINTS_PER_CORRECT;
    let remaining = (f64::from(config.time_limit) - submission.time_taken).max(0.0);
    let completeness = f64::from(correct_count) / total_expected(config) as f64;
    let time_bonus = remaining * constants::scoring::TIME_BONUS_RATE * completeness;

    ScoreResult {
        total: (base_score + time_bonus) * config.multiplier,
        base_score,
        time_bonus,
        correct_count,
    }
}

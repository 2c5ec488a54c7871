//! Round lifecycle: dealing candidates and redeeming submissions
//!
//! A round is dealt from a word set by shuffling the anchor's synonyms and
//! antonyms into an id-tagged candidate list, parked in a pending registry,
//! and redeemed exactly once when its owner submits answers. The candidate
//! id is the opaque token players sort into slots; the ground truth never
//! leaves the server side of the record.

use std::{fmt::Display, str::FromStr};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;
use web_time::SystemTime;

use super::{identity::PlayerId, scoring::Difficulty, words::WordSet};

/// A unique identifier for a dealt round
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct RoundId(Uuid);

impl RoundId {
    /// Creates a new random round ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoundId {
    /// Creates a new random round ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoundId {
    /// Formats the round ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RoundId {
    type Err = uuid::Error;

    /// Parses a round ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Which slot a candidate word truly belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordKind {
    /// The candidate is a synonym of the anchor
    Synonym,
    /// The candidate is an antonym of the anchor
    Antonym,
}

/// One word dealt into a round, addressed by its opaque id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateWord {
    /// The opaque answer token players submit
    pub id: u32,
    /// The candidate word itself
    pub word: String,
    /// The slot this candidate truly belongs to
    pub kind: WordKind,
}

/// A dealt round awaiting submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Unique identifier for this round
    pub id: RoundId,
    /// The player the round was dealt to; only they may redeem it
    pub player: PlayerId,
    /// The anchor word shown to the player
    pub anchor_word: String,
    /// The shuffled candidates, ids assigned after shuffling
    pub words: Vec<CandidateWord>,
    /// Ground truth for scoring; never sent to clients
    pub truth: WordSet,
    /// The difficulty the round was dealt at
    pub level: Difficulty,
    /// Round time limit in seconds
    pub time_limit: u32,
    /// When the round was dealt
    pub dealt_at: SystemTime,
}

impl Round {
    /// Deals a round for a player from a word set
    ///
    /// Takes the level's pair count of synonyms and antonyms from the set,
    /// shuffles them together, and assigns candidate ids in shuffled order.
    /// The set must be playable for the level (the word source guarantees
    /// this).
    ///
    /// # Arguments
    ///
    /// * `player` - the player the round belongs to
    /// * `level` - the difficulty tier to deal at
    /// * `truth` - the word set providing candidates and ground truth
    pub fn deal(player: PlayerId, level: Difficulty, truth: WordSet) -> Self {
        let pair_count = level.config().pair_count;

        let mut pool: Vec<(String, WordKind)> = truth
            .synonyms
            .iter()
            .take(pair_count)
            .map(|word| (word.clone(), WordKind::Synonym))
            .chain(
                truth
                    .antonyms
                    .iter()
                    .take(pair_count)
                    .map(|word| (word.clone(), WordKind::Antonym)),
            )
            .collect();
        fastrand::shuffle(&mut pool);

        let words = pool
            .into_iter()
            .enumerate()
            .map(|(id, (word, kind))| CandidateWord {
                id: id as u32,
                word,
                kind,
            })
            .collect();

        Self {
            id: RoundId::new(),
            player,
            anchor_word: truth.anchor.clone(),
            words,
            truth,
            level,
            time_limit: level.config().time_limit,
            dealt_at: SystemTime::now(),
        }
    }
}

/// Errors that can occur when redeeming a round
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The round is unknown, already completed, or belongs to someone else
    #[error("invalid or completed round")]
    InvalidRound,
}

/// Registry of dealt rounds awaiting submission
///
/// Each round is redeemable exactly once, and only by the player it was
/// dealt to. Redemption removes the round, so a double submission of the
/// same round id fails.
#[derive(Debug, Default)]
pub struct PendingRounds {
    rounds: DashMap<RoundId, Round>,
}

impl PendingRounds {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a dealt round until its owner submits
    pub fn insert(&self, round: Round) {
        self.rounds.insert(round.id, round);
    }

    /// Number of rounds currently awaiting submission
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether no rounds are awaiting submission
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Redeems a round for its owner, removing it from the registry
    ///
    /// An ownership mismatch leaves the round parked so the real owner can
    /// still redeem it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRound` if the round is unknown, already
    /// redeemed, or owned by a different player.
    pub fn redeem(&self, id: &RoundId, player: &PlayerId) -> Result<Round, Error> {
        self.rounds
            .remove_if(id, |_, round| round.player == *player)
            .map(|(_, round)| round)
            .ok_or(Error::InvalidRound)
    }
}

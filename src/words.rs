//! Word source collaborator and fallback word list
//!
//! This module defines the trait for the external word source (frequency
//! sampling, synonym/antonym lookup) the game core consumes, along with a
//! built-in fallback list used whenever the real source fails. The fallback
//! data keeps the comma-separated shape of the original seed files.

use std::collections::HashSet;

use enum_map::EnumMap;
use once_cell_serde::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scoring::Difficulty;

/// The ground truth for one anchor word
///
/// Correctness of a submission is judged against these sets, compared
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSet {
    /// The anchor word whose synonyms and antonyms define the round
    pub anchor: String,
    /// True synonyms of the anchor
    pub synonyms: Vec<String>,
    /// True antonyms of the anchor
    pub antonyms: Vec<String>,
}

impl WordSet {
    /// Whether this set can fill a round needing `pair_count` pairs per side
    pub fn is_playable(&self, pair_count: usize) -> bool {
        self.synonyms.len() >= pair_count && self.antonyms.len() >= pair_count
    }

    /// The synonym set, lowercased for case-insensitive membership tests
    pub fn synonym_set(&self) -> HashSet<String> {
        self.synonyms.iter().map(|w| w.to_lowercase()).collect()
    }

    /// The antonym set, lowercased for case-insensitive membership tests
    pub fn antonym_set(&self) -> HashSet<String> {
        self.antonyms.iter().map(|w| w.to_lowercase()).collect()
    }
}

/// Errors a word source can produce
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The source itself failed or timed out
    #[error("word source unavailable")]
    Unavailable,
    /// No word satisfies the difficulty and exclusion constraints
    #[error("no words available for the requested difficulty")]
    NoWordsAvailable,
}

/// Trait for drawing an anchor word with its ground-truth sets
///
/// Implementations might sample a frequency list and query a thesaurus
/// API, read seeded rows from a database, or serve the static fallback
/// list below. A failing implementation is recovered from by falling back,
/// never surfaced to players directly.
pub trait WordSource {
    /// Draws a playable word set for a difficulty tier
    ///
    /// # Arguments
    ///
    /// * `difficulty` - the tier whose pair count the set must satisfy
    /// * `exclude` - anchor words the caller has already seen, compared
    ///   case-insensitively
    ///
    /// # Errors
    ///
    /// * `Error::Unavailable` - the source failed or timed out
    /// * `Error::NoWordsAvailable` - nothing satisfies the constraints
    fn draw(&self, difficulty: Difficulty, exclude: &[String]) -> Result<WordSet, Error>;
}

/// Seed data: anchor, comma-separated synonyms, comma-separated antonyms
const FALLBACK_DATA: &[(Difficulty, &str, &str, &str)] = &[
    (
        Difficulty::Easy,
        "happy",
        "glad,joyful,cheerful,merry",
        "sad,unhappy,gloomy,miserable",
    ),
    (
        Difficulty::Easy,
        "big",
        "large,huge,giant,vast",
        "small,tiny,little,slight",
    ),
    (
        Difficulty::Easy,
        "fast",
        "quick,rapid,speedy,swift",
        "slow,sluggish,unhurried,leisurely",
    ),
    (
        Difficulty::Easy,
        "cold",
        "chilly,freezing,icy,frosty",
        "hot,warm,boiling,heated",
    ),
    (
        Difficulty::Easy,
        "clean",
        "spotless,tidy,neat,pure",
        "dirty,filthy,grimy,soiled",
    ),
    (
        Difficulty::Medium,
        "brave",
        "courageous,fearless,valiant,bold,daring",
        "cowardly,timid,fearful,craven",
    ),
    (
        Difficulty::Medium,
        "ancient",
        "old,archaic,antique,aged,venerable",
        "modern,new,recent,current",
    ),
    (
        Difficulty::Medium,
        "abundant",
        "plentiful,ample,copious,bountiful",
        "scarce,sparse,meager,rare",
    ),
    (
        Difficulty::Medium,
        "expand",
        "enlarge,grow,extend,widen,swell",
        "shrink,contract,reduce,compress",
    ),
    (
        Difficulty::Medium,
        "genuine",
        "authentic,real,true,actual",
        "fake,false,counterfeit,bogus",
    ),
    (
        Difficulty::Hard,
        "ephemeral",
        "fleeting,transient,momentary,brief,passing",
        "permanent,enduring,lasting,eternal,perpetual",
    ),
    (
        Difficulty::Hard,
        "benevolent",
        "kind,charitable,generous,compassionate,altruistic",
        "malevolent,cruel,spiteful,malicious,callous",
    ),
    (
        Difficulty::Hard,
        "obscure",
        "unclear,cryptic,vague,hidden,arcane",
        "clear,obvious,evident,plain,apparent",
    ),
    (
        Difficulty::Hard,
        "audacious",
        "bold,daring,fearless,reckless,intrepid",
        "timid,cautious,cowardly,meek,wary",
    ),
    (
        Difficulty::Hard,
        "meticulous",
        "careful,precise,thorough,exacting,scrupulous",
        "careless,sloppy,negligent,slapdash,lax",
    ),
];

/// Parses the seed data into per-difficulty word sets, once
fn fallback_table() -> &'static EnumMap<Difficulty, Vec<WordSet>> {
    static TABLE: OnceCell<EnumMap<Difficulty, Vec<WordSet>>> = OnceCell::new();

    TABLE.get_or_init(|| {
        let mut table: EnumMap<Difficulty, Vec<WordSet>> = EnumMap::default();
        for &(difficulty, anchor, synonyms, antonyms) in FALLBACK_DATA {
            let split = |csv: &str| csv.split(',').map(str::to_owned).collect();
            table[difficulty].push(WordSet {
                anchor: anchor.to_owned(),
                synonyms: split(synonyms),
                antonyms: split(antonyms),
            });
        }
        table
    })
}

/// The built-in word source backed by the static seed list
///
/// Serves as both a standalone source for environments without a live
/// thesaurus backend and as the recovery path when a live source fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackWords;

impl WordSource for FallbackWords {
    fn draw(&self, difficulty: Difficulty, exclude: &[String]) -> Result<WordSet, Error> {
        let excluded: HashSet<String> = exclude.iter().map(|w| w.to_lowercase()).collect();
        let pair_count = difficulty.config().pair_count;

        let pool: Vec<&WordSet> = fallback_table()[difficulty]
            .iter()
            .filter(|set| set.is_playable(pair_count))
            .filter(|set| !excluded.contains(&set.anchor.to_lowercase()))
            .collect();

        if pool.is_empty() {
            return Err(Error::NoWordsAvailable);
        }

        Ok(pool[fastrand::usize(..pool.len())].clone())
    }
}

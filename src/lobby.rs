//! Lobby aggregate and state machine
//!
//! This module contains the central lobby record and the transition rules
//! that govern it: creation, joining, team assignment, difficulty
//! configuration, and game start. Every method here mutates one plain
//! record and is meant to run inside the store's serialized
//! read-modify-write scope; the store provides atomicity, this module
//! provides the rules.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay, skip_serializing_none};
use thiserror::Error;
use web_time::SystemTime;

use super::{
    constants,
    identity::{Identity, PlayerId},
    scoring::{Difficulty, ScoreResult},
};

/// A short, human-shareable lobby identifier
///
/// Six characters drawn from `A-Z0-9`. Codes are entered by hand, so
/// parsing uppercases its input; the canonical form is always uppercase.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct LobbyCode(String);

impl LobbyCode {
    /// Draws a fresh random code
    ///
    /// The code space is finite, so the caller must still verify uniqueness
    /// against the store before committing.
    pub fn generate() -> Self {
        let alphabet = constants::lobby::CODE_ALPHABET;
        Self(
            (0..constants::lobby::CODE_LENGTH)
                .map(|_| alphabet[fastrand::usize(..alphabet.len())] as char)
                .collect(),
        )
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LobbyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors that can occur when parsing a lobby code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCodeError {
    /// The code does not have exactly the expected number of characters
    #[error("lobby code must be exactly 6 characters")]
    WrongLength,
    /// The code contains a character outside `A-Z0-9`
    #[error("lobby code may only contain letters and digits")]
    InvalidCharacter,
}

impl FromStr for LobbyCode {
    type Err = ParseCodeError;

    /// Parses a lobby code, uppercasing it on the way in
    ///
    /// # Errors
    ///
    /// Returns a `ParseCodeError` if the input has the wrong length or
    /// characters outside the code alphabet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.chars().count() != constants::lobby::CODE_LENGTH {
            return Err(ParseCodeError::WrongLength);
        }
        if !code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(ParseCodeError::InvalidCharacter);
        }
        Ok(Self(code))
    }
}

/// The lifecycle phase of a lobby
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Players are gathering and picking teams
    #[default]
    Waiting,
    /// The game is underway; the transition from `Waiting` is one-way
    Started,
    /// Reserved for an external collaborator; no core operation sets it
    Finished,
}

/// Lobby configuration
///
/// Core fields are typed; anything genuinely optional rides in the
/// free-form `extra` map and is validated only at the point of use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySettings {
    /// Difficulty tier rounds are dealt at
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Display name for the session, chosen by the host
    #[serde(default)]
    pub team_name: Option<String>,
    /// Target team size, informational for clients
    #[serde(default)]
    pub team_size: Option<u32>,
    /// Free-form escape hatch for optional configuration
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One player inside a lobby
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// The player's stable identifier
    pub id: PlayerId,
    /// The display name shown to other players; updated on rejoin
    pub name: String,
    /// The team label the player picked, if any
    pub team: Option<String>,
    /// Whether this player created the lobby
    pub is_host: bool,
}

/// One completed round inside a lobby's result log
///
/// Append-only: once recorded, a result is never mutated or removed except
/// by the bulk clear when a game starts. Legacy producers keyed results by
/// email rather than player id, so both keys are optional and completion
/// counting tolerates either.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// The submitter's player id (current producers)
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    /// The submitter's email (legacy producers)
    #[serde(default)]
    pub player_email: Option<String>,
    /// The submitter's display name at submission time
    pub player_name: String,
    /// The submitter's team at submission time
    #[serde(default)]
    pub team: Option<String>,
    /// Final round score
    pub score: f64,
    /// Number of correctly sorted words
    pub correct_count: u32,
    /// Elapsed seconds for the round
    pub time_taken: f64,
    /// When the result was recorded
    pub timestamp: SystemTime,
}

impl RoundResult {
    /// The key this result counts toward for completion detection
    pub fn completion_key(&self) -> Option<&str> {
        self.player_id
            .as_ref()
            .map(PlayerId::as_str)
            .or(self.player_email.as_deref())
    }
}

/// Errors that can occur during lobby state transitions
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The actor is not a member of the lobby
    #[error("player is not a member of this lobby")]
    NotMember,
    /// The display name already belongs to a different player
    #[error("display name already in use in this lobby")]
    NameConflict,
    /// The lobby has reached its maximum player count
    #[error("maximum number of players reached")]
    MaximumPlayers,
    /// The actor attempted a host-only action
    #[error("only the host may do that")]
    Forbidden,
    /// Starting requires at least two distinct teams
    #[error("at least two teams must have players")]
    InsufficientTeams,
    /// Starting requires every player to have picked a team
    #[error("every player must pick a team before starting")]
    UnassignedPlayers,
    /// The game has already been started
    #[error("the game has already started")]
    AlreadyStarted,
}

/// The central lobby aggregate
///
/// Keyed by `code` in the store. All mutation goes through the methods
/// below; `players` stays unique by id and `results` stays append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    /// Unique, immutable, human-shareable lookup key
    pub code: LobbyCode,
    /// Identity of the creating player; authorizes privileged actions
    pub host_id: PlayerId,
    /// Display name of the creating player
    pub host_name: String,
    /// Current lifecycle phase
    pub status: Status,
    /// Session configuration
    pub settings: LobbySettings,
    /// Players in join order; order is display-only
    pub players: Vec<Player>,
    /// Append-only result log, cleared when a game starts
    pub results: Vec<RoundResult>,
    /// When the lobby was created, informational only
    pub created_at: SystemTime,
}

impl Lobby {
    /// Creates a lobby with the host seeded as its first player
    pub fn new(code: LobbyCode, host: &Identity, settings: LobbySettings) -> Self {
        Self {
            code,
            host_id: host.id.clone(),
            host_name: host.name.clone(),
            status: Status::Waiting,
            settings,
            players: vec![Player {
                id: host.id.clone(),
                name: host.name.clone(),
                team: None,
                is_host: true,
            }],
            results: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Looks up a player by id
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == *id)
    }

    /// Adds a player, or refreshes their name if they already joined
    ///
    /// Joining is idempotent on id: rejoining never duplicates an entry,
    /// it only updates the stored display name. A name that already
    /// belongs to a *different* id (compared case-insensitively) is a
    /// conflict.
    ///
    /// # Errors
    ///
    /// * `Error::NameConflict` - the name belongs to another player
    /// * `Error::MaximumPlayers` - the lobby is full
    pub fn join(&mut self, identity: &Identity) -> Result<(), Error> {
        let wanted = identity.name.to_lowercase();
        if self
            .players
            .iter()
            .any(|p| p.id != identity.id && p.name.to_lowercase() == wanted)
        {
            return Err(Error::NameConflict);
        }

        if let Some(player) = self.player_mut(&identity.id) {
            if player.name != identity.name {
                player.name = identity.name.clone();
            }
            return Ok(());
        }

        if self.players.len() >= constants::lobby::MAX_PLAYER_COUNT {
            return Err(Error::MaximumPlayers);
        }

        self.players.push(Player {
            id: identity.id.clone(),
            name: identity.name.clone(),
            team: None,
            is_host: false,
        });
        Ok(())
    }

    /// Assigns a player to a team, or clears their assignment
    ///
    /// A `None` or blank team label is the leave-team action. No other
    /// player's assignment is touched.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotMember` if the player never joined this lobby;
    /// they are never implicitly added.
    pub fn set_team(&mut self, id: &PlayerId, team: Option<String>) -> Result<(), Error> {
        let team = team
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        let player = self.player_mut(id).ok_or(Error::NotMember)?;
        player.team = team;
        Ok(())
    }

    /// Sets the lobby difficulty; host only
    ///
    /// # Errors
    ///
    /// Returns `Error::Forbidden` unless the actor is the host.
    pub fn set_difficulty(&mut self, actor: &PlayerId, difficulty: Difficulty) -> Result<(), Error> {
        if *actor != self.host_id {
            return Err(Error::Forbidden);
        }
        self.settings.difficulty = difficulty;
        Ok(())
    }

    /// Starts the game; host only, one-way
    ///
    /// Preconditions: at least two distinct team labels among players, and
    /// nobody left unassigned. On success the status becomes `Started` and
    /// the result log is cleared, which is the synchronization reset point
    /// the completion detector counts from. A second start is rejected
    /// rather than treated as a no-op.
    ///
    /// # Errors
    ///
    /// * `Error::Forbidden` - the actor is not the host
    /// * `Error::AlreadyStarted` - the lobby already left `Waiting`
    /// * `Error::InsufficientTeams` - fewer than two teams have players
    /// * `Error::UnassignedPlayers` - someone has not picked a team
    pub fn start(&mut self, actor: &PlayerId) -> Result<(), Error> {
        if *actor != self.host_id {
            return Err(Error::Forbidden);
        }
        if self.status != Status::Waiting {
            return Err(Error::AlreadyStarted);
        }

        let distinct_teams = self
            .players
            .iter()
            .filter_map(|p| p.team.as_deref())
            .unique()
            .count();
        if distinct_teams < constants::lobby::MIN_TEAM_COUNT {
            return Err(Error::InsufficientTeams);
        }
        if self.players.iter().any(|p| p.team.is_none()) {
            return Err(Error::UnassignedPlayers);
        }

        self.status = Status::Started;
        self.results.clear();
        Ok(())
    }

    /// Appends a round result to the log for a lobby member
    ///
    /// The result captures the member's current display name and team, so
    /// a later team switch does not rewrite history.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotMember` if the submitter never joined this lobby.
    pub fn record_result(
        &mut self,
        submitter: &Identity,
        outcome: &ScoreResult,
        time_taken: f64,
    ) -> Result<(), Error> {
        let player = self.player(&submitter.id).ok_or(Error::NotMember)?;

        let result = RoundResult {
            player_id: Some(player.id.clone()),
            player_email: None,
            player_name: player.name.clone(),
            team: player.team.clone(),
            score: outcome.total,
            correct_count: outcome.correct_count,
            time_taken,
            timestamp: SystemTime::now(),
        };
        self.results.push(result);
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn host() -> Identity {
        Identity {
            id: PlayerId::new("hana@example.com"),
            name: "Hana".to_owned(),
        }
    }

    fn guest(id: &str, name: &str) -> Identity {
        Identity {
            id: PlayerId::new(id),
            name: name.to_owned(),
        }
    }

    fn lobby() -> Lobby {
        Lobby::new(
            LobbyCode::from_str("ABC123").unwrap(),
            &host(),
            LobbySettings::default(),
        )
    }

    fn outcome() -> ScoreResult {
        ScoreResult {
            total: 7.0,
            base_score: 3.0,
            time_bonus: 4.0,
            correct_count: 3,
        }
    }

    #[test]
    fn test_new_lobby_seeds_the_host() {
        let lobby = lobby();

        assert_eq!(lobby.status, Status::Waiting);
        assert_eq!(lobby.players.len(), 1);
        assert_eq!(lobby.players[0].id, host().id);
        assert!(lobby.players[0].is_host);
        assert!(lobby.players[0].team.is_none());
        assert!(lobby.results.is_empty());
    }

    #[test]
    fn test_join_appends_in_join_order() {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();
        lobby.join(&guest("guest_sam", "Sam")).unwrap();

        let names: Vec<&str> = lobby.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Hana", "Robin", "Sam"]);
        assert!(!lobby.players[1].is_host);
    }

    #[test]
    fn test_join_is_idempotent_on_id() {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();

        assert_eq!(lobby.players.len(), 2);
    }

    #[test]
    fn test_rejoin_updates_the_display_name() {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();
        lobby.join(&guest("guest_robin", "Robin the Second")).unwrap();

        assert_eq!(lobby.players.len(), 2);
        assert_eq!(lobby.players[1].name, "Robin the Second");
    }

    #[test]
    fn test_join_rejects_duplicate_names_case_insensitively() {
        let mut lobby = lobby();
        lobby.join(&guest("u1", "Alex")).unwrap();

        assert_eq!(lobby.join(&guest("u2", "Alex")), Err(Error::NameConflict));
        assert_eq!(lobby.join(&guest("u2", "alex")), Err(Error::NameConflict));
        assert_eq!(lobby.players.len(), 2);
    }

    #[test]
    fn test_join_respects_the_player_cap() {
        let mut lobby = lobby();
        for i in 1..constants::lobby::MAX_PLAYER_COUNT {
            lobby
                .join(&guest(&format!("guest_p{i}"), &format!("Player {i}")))
                .unwrap();
        }

        assert_eq!(
            lobby.join(&guest("guest_late", "Latecomer")),
            Err(Error::MaximumPlayers)
        );
    }

    #[test]
    fn test_set_team_touches_only_that_player() {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();
        lobby.join(&guest("guest_sam", "Sam")).unwrap();

        lobby
            .set_team(&PlayerId::new("guest_robin"), Some("A".to_owned()))
            .unwrap();
        lobby
            .set_team(&PlayerId::new("guest_sam"), Some("B".to_owned()))
            .unwrap();

        assert_eq!(lobby.player(&PlayerId::new("guest_robin")).unwrap().team, Some("A".to_owned()));
        assert_eq!(lobby.player(&PlayerId::new("guest_sam")).unwrap().team, Some("B".to_owned()));
        assert_eq!(lobby.player(&host().id).unwrap().team, None);
    }

    #[test]
    fn test_set_team_rejects_non_members() {
        let mut lobby = lobby();
        assert_eq!(
            lobby.set_team(&PlayerId::new("guest_nobody"), Some("A".to_owned())),
            Err(Error::NotMember)
        );
        assert_eq!(lobby.players.len(), 1);
    }

    #[test]
    fn test_blank_team_clears_the_assignment() {
        let mut lobby = lobby();
        lobby.set_team(&host().id, Some("A".to_owned())).unwrap();

        lobby.set_team(&host().id, Some("  ".to_owned())).unwrap();
        assert_eq!(lobby.player(&host().id).unwrap().team, None);

        lobby.set_team(&host().id, Some("A".to_owned())).unwrap();
        lobby.set_team(&host().id, None).unwrap();
        assert_eq!(lobby.player(&host().id).unwrap().team, None);
    }

    #[test]
    fn test_set_difficulty_is_host_only() {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();

        assert_eq!(
            lobby.set_difficulty(&PlayerId::new("guest_robin"), Difficulty::Hard),
            Err(Error::Forbidden)
        );
        lobby.set_difficulty(&host().id, Difficulty::Hard).unwrap();
        assert_eq!(lobby.settings.difficulty, Difficulty::Hard);
    }

    fn ready_lobby() -> Lobby {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();
        lobby.set_team(&host().id, Some("A".to_owned())).unwrap();
        lobby
            .set_team(&PlayerId::new("guest_robin"), Some("B".to_owned()))
            .unwrap();
        lobby
    }

    #[test]
    fn test_start_is_host_only() {
        let mut lobby = ready_lobby();
        assert_eq!(
            lobby.start(&PlayerId::new("guest_robin")),
            Err(Error::Forbidden)
        );
    }

    #[test]
    fn test_start_requires_two_distinct_teams() {
        let mut lobby = lobby();
        lobby.join(&guest("guest_robin", "Robin")).unwrap();
        lobby.set_team(&host().id, Some("A".to_owned())).unwrap();
        lobby
            .set_team(&PlayerId::new("guest_robin"), Some("A".to_owned()))
            .unwrap();

        assert_eq!(lobby.start(&host().id), Err(Error::InsufficientTeams));
        assert_eq!(lobby.status, Status::Waiting);
    }

    #[test]
    fn test_start_rejects_unassigned_players_even_with_enough_teams() {
        let mut lobby = ready_lobby();
        lobby.join(&guest("guest_sam", "Sam")).unwrap();

        assert_eq!(lobby.start(&host().id), Err(Error::UnassignedPlayers));
    }

    #[test]
    fn test_start_clears_results_and_is_one_way() {
        let mut lobby = ready_lobby();
        lobby
            .record_result(&guest("guest_robin", "Robin"), &outcome(), 10.0)
            .unwrap();

        lobby.start(&host().id).unwrap();
        assert_eq!(lobby.status, Status::Started);
        assert!(lobby.results.is_empty());

        assert_eq!(lobby.start(&host().id), Err(Error::AlreadyStarted));
    }

    #[test]
    fn test_more_than_two_teams_can_start() {
        let mut lobby = ready_lobby();
        lobby.join(&guest("guest_sam", "Sam")).unwrap();
        lobby
            .set_team(&PlayerId::new("guest_sam"), Some("C".to_owned()))
            .unwrap();

        assert!(lobby.start(&host().id).is_ok());
    }

    #[test]
    fn test_record_result_captures_name_and_team() {
        let mut lobby = ready_lobby();
        lobby
            .record_result(&guest("guest_robin", "Robin"), &outcome(), 12.5)
            .unwrap();

        let result = &lobby.results[0];
        assert_eq!(result.player_id, Some(PlayerId::new("guest_robin")));
        assert_eq!(result.player_name, "Robin");
        assert_eq!(result.team, Some("B".to_owned()));
        assert!((result.score - 7.0).abs() < 1e-9);
        assert_eq!(result.correct_count, 3);
        assert!((result.time_taken - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_result_rejects_non_members() {
        let mut lobby = lobby();
        assert_eq!(
            lobby.record_result(&guest("guest_nobody", "Nobody"), &outcome(), 10.0),
            Err(Error::NotMember)
        );
        assert!(lobby.results.is_empty());
    }

    #[test]
    fn test_completion_key_prefers_id_over_email() {
        let mut result = RoundResult {
            player_id: Some(PlayerId::new("guest_robin")),
            player_email: Some("robin@example.com".to_owned()),
            player_name: "Robin".to_owned(),
            team: None,
            score: 0.0,
            correct_count: 0,
            time_taken: 0.0,
            timestamp: SystemTime::now(),
        };
        assert_eq!(result.completion_key(), Some("guest_robin"));

        result.player_id = None;
        assert_eq!(result.completion_key(), Some("robin@example.com"));

        result.player_email = None;
        assert_eq!(result.completion_key(), None);
    }

    #[test]
    fn test_generated_codes_use_the_alphabet() {
        for _ in 0..100 {
            let code = LobbyCode::generate();
            assert_eq!(code.as_str().len(), constants::lobby::CODE_LENGTH);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| constants::lobby::CODE_ALPHABET.contains(&b))
            );
        }
    }

    #[test]
    fn test_code_parsing_uppercases() {
        let code = LobbyCode::from_str("ab12cd").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_code_parsing_rejects_bad_input() {
        assert_eq!(LobbyCode::from_str("ABC"), Err(ParseCodeError::WrongLength));
        assert_eq!(
            LobbyCode::from_str("ABC12!"),
            Err(ParseCodeError::InvalidCharacter)
        );
    }

    #[test]
    fn test_code_serializes_as_a_string() {
        let code = LobbyCode::from_str("AB12CD").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"AB12CD\"");

        let back: LobbyCode = serde_json::from_str("\"ab12cd\"").unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&Status::Waiting).unwrap(), "\"WAITING\"");
        assert_eq!(serde_json::to_string(&Status::Started).unwrap(), "\"STARTED\"");
    }

    #[test]
    fn test_settings_keep_unknown_keys() {
        let json = r#"{"difficulty":"EASY","teamName":"Wordsmiths","color":"teal"}"#;
        let settings: LobbySettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.difficulty, Difficulty::Easy);
        assert_eq!(settings.team_name.as_deref(), Some("Wordsmiths"));
        assert_eq!(
            settings.extra.get("color"),
            Some(&serde_json::Value::String("teal".to_owned()))
        );
    }
}

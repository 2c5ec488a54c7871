//! Lobby status view: aggregation and completion detection
//!
//! This module derives the client-facing lobby view from the raw record on
//! every read. Nothing here is cached or stored; recomputing the view each
//! time means there is no second source of truth that could drift from
//! `players` and `results`. The cost is linear in players plus results,
//! which is fine at lobby scale.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_with::skip_serializing_none;

use super::{
    identity::PlayerId,
    lobby::{Lobby, LobbyCode, Player, RoundResult, Status},
    scoring::Difficulty,
};

/// The derived, client-facing state of a lobby
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    /// The lobby's shareable code
    pub code: LobbyCode,
    /// The host's player id
    pub host: PlayerId,
    /// The host's display name
    pub host_name: String,
    /// Current lifecycle phase
    pub status: Status,
    /// All players in join order
    pub players: Vec<Player>,
    /// Players bucketed by team label
    pub teams: BTreeMap<String, Vec<Player>>,
    /// Players that have not picked a team yet
    pub unassigned: Vec<Player>,
    /// The difficulty rounds are dealt at
    pub difficulty: Difficulty,
    /// The session display name, if the host set one
    pub team_name: Option<String>,
    /// Target team size, if the host set one
    pub team_size: Option<u32>,
    /// The full result log
    pub results: Vec<RoundResult>,
    /// Whether every team-assigned player has completed the round target
    pub all_finished: bool,
}

impl LobbyView {
    /// Derives the view for a lobby
    ///
    /// # Arguments
    ///
    /// * `lobby` - the raw lobby record
    /// * `round_target` - how many rounds each active player must complete
    pub fn of(lobby: &Lobby, round_target: usize) -> Self {
        let mut teams: BTreeMap<String, Vec<Player>> = BTreeMap::new();
        let mut unassigned = Vec::new();
        for player in &lobby.players {
            match &player.team {
                Some(team) => teams.entry(team.clone()).or_default().push(player.clone()),
                None => unassigned.push(player.clone()),
            }
        }

        let completed = completion_counts(&lobby.results);
        let active: Vec<&Player> = lobby.players.iter().filter(|p| p.team.is_some()).collect();
        let all_finished = !active.is_empty()
            && active.iter().all(|p| {
                completed.get(p.id.as_str()).copied().unwrap_or(0) >= round_target
            });

        Self {
            code: lobby.code.clone(),
            host: lobby.host_id.clone(),
            host_name: lobby.host_name.clone(),
            status: lobby.status,
            players: lobby.players.clone(),
            teams,
            unassigned,
            difficulty: lobby.settings.difficulty,
            team_name: lobby.settings.team_name.clone(),
            team_size: lobby.settings.team_size,
            results: lobby.results.clone(),
            all_finished,
        }
    }
}

/// Counts completed rounds per player
///
/// Results are keyed by player id when present, falling back to the legacy
/// email key, so logs written by older producers still count.
fn completion_counts(results: &[RoundResult]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for result in results {
        if let Some(key) = result.completion_key() {
            *counts.entry(key).or_default() += 1;
        }
    }
    counts
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        constants,
        identity::Identity,
        lobby::LobbySettings,
        scoring::ScoreResult,
    };
    use std::str::FromStr;
    use web_time::SystemTime;

    fn identity(id: &str, name: &str) -> Identity {
        Identity {
            id: PlayerId::new(id),
            name: name.to_owned(),
        }
    }

    fn outcome() -> ScoreResult {
        ScoreResult {
            total: 5.0,
            base_score: 4.0,
            time_bonus: 1.0,
            correct_count: 4,
        }
    }

    fn lobby() -> Lobby {
        let mut lobby = Lobby::new(
            LobbyCode::from_str("AB12CD").unwrap(),
            &identity("hana@example.com", "Hana"),
            LobbySettings {
                team_name: Some("Wordsmiths".to_owned()),
                team_size: Some(10),
                ..LobbySettings::default()
            },
        );
        lobby.join(&identity("guest_robin", "Robin")).unwrap();
        lobby.join(&identity("guest_sam", "Sam")).unwrap();
        lobby
            .set_team(&PlayerId::new("hana@example.com"), Some("A".to_owned()))
            .unwrap();
        lobby
            .set_team(&PlayerId::new("guest_robin"), Some("B".to_owned()))
            .unwrap();
        lobby
    }

    fn record(lobby: &mut Lobby, id: &str, name: &str, times: usize) {
        for _ in 0..times {
            lobby
                .record_result(&identity(id, name), &outcome(), 10.0)
                .unwrap();
        }
    }

    #[test]
    fn test_buckets_by_team_with_unassigned_apart() {
        let view = LobbyView::of(&lobby(), constants::lobby::ROUND_TARGET);

        assert_eq!(view.teams.len(), 2);
        assert_eq!(view.teams["A"][0].name, "Hana");
        assert_eq!(view.teams["B"][0].name, "Robin");
        assert_eq!(view.unassigned.len(), 1);
        assert_eq!(view.unassigned[0].name, "Sam");
        assert_eq!(view.players.len(), 3);
    }

    #[test]
    fn test_not_finished_while_anyone_is_short() {
        let mut lobby = lobby();
        record(&mut lobby, "hana@example.com", "Hana", 5);
        record(&mut lobby, "guest_robin", "Robin", 4);

        let view = LobbyView::of(&lobby, 5);
        assert!(!view.all_finished);
    }

    #[test]
    fn test_finished_when_every_active_player_reaches_the_target() {
        let mut lobby = lobby();
        record(&mut lobby, "hana@example.com", "Hana", 5);
        record(&mut lobby, "guest_robin", "Robin", 5);

        // Sam has no team and no results; only active players count.
        let view = LobbyView::of(&lobby, 5);
        assert!(view.all_finished);
    }

    #[test]
    fn test_never_finished_with_no_active_players() {
        let mut empty = Lobby::new(
            LobbyCode::from_str("AB12CD").unwrap(),
            &identity("hana@example.com", "Hana"),
            LobbySettings::default(),
        );
        record(&mut empty, "hana@example.com", "Hana", 5);

        let view = LobbyView::of(&empty, 5);
        assert!(!view.all_finished);
    }

    #[test]
    fn test_legacy_email_keyed_results_count() {
        let mut lobby = lobby();
        record(&mut lobby, "hana@example.com", "Hana", 5);
        for _ in 0..5 {
            lobby.results.push(RoundResult {
                player_id: None,
                player_email: Some("guest_robin".to_owned()),
                player_name: "Robin".to_owned(),
                team: Some("B".to_owned()),
                score: 5.0,
                correct_count: 4,
                time_taken: 10.0,
                timestamp: SystemTime::now(),
            });
        }

        let view = LobbyView::of(&lobby, 5);
        assert!(view.all_finished);
    }

    #[test]
    fn test_round_target_is_respected() {
        let mut lobby = lobby();
        record(&mut lobby, "hana@example.com", "Hana", 2);
        record(&mut lobby, "guest_robin", "Robin", 2);

        assert!(LobbyView::of(&lobby, 2).all_finished);
        assert!(!LobbyView::of(&lobby, 3).all_finished);
    }

    #[test]
    fn test_view_serializes_in_camel_case() {
        let view = LobbyView::of(&lobby(), 5);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["code"], "AB12CD");
        assert_eq!(json["hostName"], "Hana");
        assert_eq!(json["status"], "WAITING");
        assert_eq!(json["allFinished"], false);
        assert_eq!(json["teamName"], "Wordsmiths");
        assert_eq!(json["teamSize"], 10);
        assert_eq!(json["teams"]["A"][0]["isHost"], true);
        assert!(json["unassigned"].is_array());
    }
}

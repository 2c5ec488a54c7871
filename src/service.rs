//! Exposed game operations
//!
//! This module wires the lobby state machine, scoring engine, and
//! collaborator seams (store, word source, session service) into the
//! request/response operations a transport layer exposes. Requests are
//! validated at this boundary; everything below works on typed records.

use std::collections::HashMap;

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    constants,
    identity::{self, Identity},
    lobby::{Lobby, LobbyCode, LobbySettings},
    round::{CandidateWord, PendingRounds, Round, RoundId},
    scoring::{self, Difficulty, Submission},
    session::SessionService,
    store::{self, LobbyStore},
    view::LobbyView,
    words::{FallbackWords, WordSource},
};

/// Request to create a lobby
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    /// Display name for the session
    #[garde(length(min = 1, max = constants::lobby::MAX_TEAM_LABEL_LENGTH))]
    pub team_name: String,
    /// Target team size, informational for clients
    #[garde(range(min = 1))]
    #[serde(default)]
    pub team_size: Option<u32>,
    /// Initial difficulty; defaults to medium
    #[garde(skip)]
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Guest display name for unauthenticated hosts
    #[garde(skip)]
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to join a lobby
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyRequest {
    /// The code of the lobby to join
    pub code: LobbyCode,
    /// Guest display name for unauthenticated players
    #[serde(default)]
    pub name: Option<String>,
}

/// An action applied to a lobby by one of its members
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LobbyAction {
    /// Assign the actor to a team
    JoinTeam {
        /// The team label to join
        #[garde(length(min = 1, max = constants::lobby::MAX_TEAM_LABEL_LENGTH))]
        team: String,
    },
    /// Clear the actor's team assignment
    LeaveTeam,
    /// Change the lobby difficulty; host only
    SetDifficulty {
        /// The difficulty to switch to
        #[garde(skip)]
        difficulty: Difficulty,
    },
    /// Start the game; host only
    StartGame,
}

/// Request to apply an action to a lobby
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLobbyRequest {
    /// The code of the lobby to act on
    #[garde(skip)]
    pub code: LobbyCode,
    /// The action to apply
    #[garde(dive)]
    #[serde(flatten)]
    pub action: LobbyAction,
    /// Guest display name for unauthenticated actors
    #[garde(skip)]
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to deal a new round
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartRoundRequest {
    /// The difficulty tier to deal at
    #[garde(skip)]
    pub level: Difficulty,
    /// Anchor words the caller has already seen
    #[garde(length(max = constants::round::MAX_EXCLUDE_WORDS))]
    #[serde(default)]
    pub exclude_words: Vec<String>,
    /// Guest display name for unauthenticated players
    #[garde(skip)]
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to score a dealt round
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRoundRequest {
    /// The round being redeemed
    #[garde(skip)]
    pub round_id: RoundId,
    /// Candidate ids sorted as synonyms
    #[garde(skip)]
    #[serde(default)]
    pub synonyms: Vec<u32>,
    /// Candidate ids sorted as antonyms
    #[garde(skip)]
    #[serde(default)]
    pub antonyms: Vec<u32>,
    /// Elapsed seconds for the round
    #[garde(range(min = 0.0))]
    pub time_taken: f64,
    /// The difficulty the client believes it played; informational, the
    /// dealt round's level is authoritative
    #[garde(skip)]
    #[serde(default)]
    pub level: Option<Difficulty>,
    /// Lobby to append the result to, for team play
    #[garde(skip)]
    #[serde(default)]
    pub lobby_code: Option<LobbyCode>,
    /// Guest display name for unauthenticated players
    #[garde(skip)]
    #[serde(default)]
    pub name: Option<String>,
}

/// Response to a successful lobby creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLobby {
    /// The freshly allocated lobby code
    pub code: LobbyCode,
    /// The initial lobby view
    pub lobby: LobbyView,
}

/// The client-facing description of a dealt round
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    /// The round's identifier, echoed back on submission
    pub round_id: RoundId,
    /// The anchor word to sort against
    pub anchor_word: String,
    /// The shuffled candidates to sort
    pub words: Vec<CandidateWord>,
    /// Round time limit in seconds
    pub time_limit: u32,
    /// The difficulty the round was dealt at
    pub level: Difficulty,
}

impl From<&Round> for RoundInfo {
    fn from(round: &Round) -> Self {
        Self {
            round_id: round.id,
            anchor_word: round.anchor_word.clone(),
            words: round.words.clone(),
            time_limit: round.time_limit,
            level: round.level,
        }
    }
}

/// Response to a scored submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// Final round score
    pub score: f64,
    /// Points from correctly sorted words alone
    pub base_score: f64,
    /// Bonus for remaining time, scaled by completeness
    pub time_bonus: f64,
    /// Number of correctly sorted words
    pub correct_count: u32,
    /// The words-only maximum for this level, for "score out of max"
    pub max_score: f64,
}

/// The game service: exposed operations over pluggable collaborators
///
/// Generic over the lobby store, word source, and session backend so
/// transports and tests can wire in whatever implementations they need.
pub struct LobbyService<S, W, A> {
    store: S,
    words: W,
    sessions: A,
    rounds: PendingRounds,
}

impl<S, W, A> LobbyService<S, W, A>
where
    S: LobbyStore,
    W: WordSource,
    A: SessionService,
{
    /// Creates a service over the given collaborators
    pub fn new(store: S, words: W, sessions: A) -> Self {
        Self {
            store,
            words,
            sessions,
            rounds: PendingRounds::new(),
        }
    }

    /// Resolves the caller's identity from credentials and body name
    fn identify(
        &self,
        token: Option<&str>,
        guest_name: Option<&str>,
    ) -> Result<Identity, crate::Error> {
        let session = token.and_then(|t| self.sessions.authenticate(t));
        if let Some(session) = session {
            return Ok(identity::resolve(Some(&session), None, true)?);
        }

        let cleaned = match guest_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => Some(identity::clean_display_name(name)?),
            None => None,
        };
        Ok(identity::resolve(None, cleaned.as_deref(), token.is_some())?)
    }

    /// Creates a lobby with the caller as its host
    ///
    /// Draws codes until the store accepts one; the code space is finite,
    /// so a bounded number of collisions is tolerated before giving up.
    ///
    /// # Errors
    ///
    /// Validation, identity, and `CodeSpaceExhausted` storage errors.
    pub fn create_lobby(
        &self,
        token: Option<&str>,
        request: &CreateLobbyRequest,
    ) -> Result<CreatedLobby, crate::Error> {
        request.validate()?;
        let host = self.identify(token, request.name.as_deref())?;

        let settings = LobbySettings {
            difficulty: request.difficulty.unwrap_or_default(),
            team_name: Some(request.team_name.clone()),
            team_size: request.team_size,
            extra: HashMap::new(),
        };

        for _ in 0..constants::lobby::CODE_ATTEMPTS {
            let code = LobbyCode::generate();
            match self
                .store
                .create(Lobby::new(code.clone(), &host, settings.clone()))
            {
                Ok(()) => {
                    debug!(%code, host = %host.id, "lobby created");
                    return Ok(CreatedLobby {
                        lobby: self.lobby_status(&code)?,
                        code,
                    });
                }
                Err(store::Error::CodeTaken) => {}
                Err(error) => return Err(error.into()),
            }
        }
        Err(store::Error::CodeSpaceExhausted.into())
    }

    /// Joins the caller into a lobby and returns the updated view
    ///
    /// # Errors
    ///
    /// `NotFound`, `NameConflict`, name hygiene, and identity errors.
    pub fn join_lobby(
        &self,
        token: Option<&str>,
        request: &JoinLobbyRequest,
    ) -> Result<LobbyView, crate::Error> {
        let who = self.identify(token, request.name.as_deref())?;
        self.store
            .update(&request.code, |lobby| Ok(lobby.join(&who)?))?;
        self.lobby_status(&request.code)
    }

    /// Applies a member action to a lobby and returns the updated view
    ///
    /// # Errors
    ///
    /// `NotFound` plus whatever the action itself rejects: `NotMember`,
    /// `Forbidden`, `InsufficientTeams`, `UnassignedPlayers`,
    /// `AlreadyStarted`.
    pub fn update_lobby(
        &self,
        token: Option<&str>,
        request: &UpdateLobbyRequest,
    ) -> Result<LobbyView, crate::Error> {
        request.validate()?;
        let who = self.identify(token, request.name.as_deref())?;

        let action = request.action.clone();
        self.store.update(&request.code, |lobby| {
            match action {
                LobbyAction::JoinTeam { team } => lobby.set_team(&who.id, Some(team)),
                LobbyAction::LeaveTeam => lobby.set_team(&who.id, None),
                LobbyAction::SetDifficulty { difficulty } => {
                    lobby.set_difficulty(&who.id, difficulty)
                }
                LobbyAction::StartGame => lobby.start(&who.id),
            }?;
            Ok(())
        })?;

        debug!(code = %request.code, actor = %who.id, "lobby updated");
        self.lobby_status(&request.code)
    }

    /// Returns the derived view of a lobby
    ///
    /// A snapshot read; it never blocks writers and may trail a concurrent
    /// mutation by one poll.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no lobby exists under the code.
    pub fn lobby_status(&self, code: &LobbyCode) -> Result<LobbyView, crate::Error> {
        let lobby = self.store.get(code).ok_or(store::Error::NotFound)?;
        Ok(LobbyView::of(&lobby, constants::lobby::ROUND_TARGET))
    }

    /// Deals a new round for the caller
    ///
    /// A failing word source is recovered by drawing from the built-in
    /// fallback list; only an exhausted fallback surfaces to the caller.
    ///
    /// # Errors
    ///
    /// `NoWordsAvailable` when nothing satisfies the exclusions, plus
    /// validation and identity errors.
    pub fn start_round(
        &self,
        token: Option<&str>,
        request: &StartRoundRequest,
    ) -> Result<RoundInfo, crate::Error> {
        request.validate()?;
        let who = self.identify(token, request.name.as_deref())?;

        let truth = match self.words.draw(request.level, &request.exclude_words) {
            Ok(set) => set,
            Err(error) => {
                warn!(%error, level = ?request.level, "word source failed, using fallback list");
                FallbackWords.draw(request.level, &request.exclude_words)?
            }
        };

        let round = Round::deal(who.id, request.level, truth);
        let info = RoundInfo::from(&round);
        self.rounds.insert(round);
        Ok(info)
    }

    /// Scores a dealt round and, for team play, records the result
    ///
    /// The round is redeemed first, so a double submission of the same
    /// round id fails. When a lobby code is given, the result append runs
    /// inside the lobby's serialized update, in the same transaction scope
    /// as every other lobby mutation.
    ///
    /// # Errors
    ///
    /// `InvalidRound` for unknown, redeemed, or foreign rounds; `NotFound`
    /// and `NotMember` for the lobby append; validation and identity
    /// errors.
    pub fn submit_round(
        &self,
        token: Option<&str>,
        request: &SubmitRoundRequest,
    ) -> Result<SubmitOutcome, crate::Error> {
        request.validate()?;
        let who = self.identify(token, request.name.as_deref())?;

        let round = self.rounds.redeem(&request.round_id, &who.id)?;
        let config = round.level.config();

        let submission = Submission {
            synonyms: request.synonyms.clone(),
            antonyms: request.antonyms.clone(),
            time_taken: request.time_taken,
        };
        let outcome = scoring::score(&submission, &round.words, &round.truth, config);

        if let Some(code) = &request.lobby_code {
            self.store.update(code, |lobby| {
                Ok(lobby.record_result(&who, &outcome, request.time_taken)?)
            })?;
        }

        Ok(SubmitOutcome {
            score: outcome.total,
            base_score: outcome.base_score,
            time_bonus: outcome.time_bonus,
            correct_count: outcome.correct_count,
            max_score: scoring::max_score(config),
        })
    }
}

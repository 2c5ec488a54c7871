//! Player identity resolution
//!
//! This module derives a stable player identifier from whatever a request
//! carries: an authenticated session, a guest display name, or nothing at
//! all. It also owns display-name hygiene (trimming, length limits, and
//! content filtering) so that every name entering the system passes through
//! one gate.

use std::fmt::Display;

use itertools::Either;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{constants, session::SessionInfo};

/// Prefix applied to every guest-derived player identifier
pub const GUEST_PREFIX: &str = "guest_";

/// Identifier shared by all anonymous callers that supply no name
///
/// Multiple nameless guests collide on this one identifier. That is a
/// deliberate carry-over of the original behavior rather than an oversight;
/// resolution logs a warning whenever it happens so the collision stays
/// visible in traces.
pub const SHARED_ANONYMOUS_ID: &str = "guest_anonymous";

/// Display name paired with [`SHARED_ANONYMOUS_ID`]
pub const SHARED_ANONYMOUS_NAME: &str = "Guest";

/// A stable identifier for a player
///
/// Authenticated players are identified by their email address; guests by
/// a `guest_`-prefixed normalization of their display name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player ID from an already-resolved identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A resolved player identity: who they are and what to call them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The stable player identifier
    pub id: PlayerId,
    /// The display name to show other players
    pub name: String,
}

impl Identity {
    /// The identity shared by all anonymous callers with no name
    pub fn shared_anonymous() -> Self {
        Self {
            id: PlayerId::new(SHARED_ANONYMOUS_ID),
            name: SHARED_ANONYMOUS_NAME.to_owned(),
        }
    }
}

/// Errors that can occur during identity resolution and name hygiene
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Credentials were presented but could not be validated
    #[error("invalid or expired credentials")]
    Unauthorized,
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Inappropriate,
}

/// Cleans a display name, rejecting ones that fail hygiene checks
///
/// Trims surrounding whitespace and validates length and content. This is
/// the single gate every player-supplied name passes through before it is
/// stored or turned into a guest identifier.
///
/// # Errors
///
/// * `Error::TooLong` - name exceeds the maximum length
/// * `Error::Empty` - name is empty after trimming whitespace
/// * `Error::Inappropriate` - name fails the content filter
pub fn clean_display_name(name: &str) -> Result<String, Error> {
    if name.chars().count() > constants::lobby::MAX_NAME_LENGTH {
        return Err(Error::TooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Inappropriate);
    }
    Ok(name.to_owned())
}

/// Normalizes a display name into the guest identifier suffix
///
/// Lowercases every character and replaces every non-alphanumeric character
/// with an underscore, so `"Alex Smith!"` becomes `"alex_smith_"`.
fn normalize(name: &str) -> String {
    name.chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                Either::Left(c.to_lowercase())
            } else {
                Either::Right(std::iter::once('_'))
            }
        })
        .collect()
}

/// Resolves a player identity from request inputs
///
/// Resolution order:
///
/// 1. A valid session wins: the identity is the session's email and display
///    name.
/// 2. Otherwise a non-blank display name produces a guest identity with
///    `id = "guest_" + normalize(name)`.
/// 3. With neither, a caller that presented no credentials at all resolves
///    to the shared anonymous identity (see [`SHARED_ANONYMOUS_ID`]).
///
/// A caller that *did* present credentials which failed validation, and has
/// no guest name to fall back on, is rejected as `Unauthorized` rather than
/// silently folded into the anonymous bucket.
///
/// # Arguments
///
/// * `session` - the authenticated session, if credentials validated
/// * `guest_name` - a cleaned display name from the request body, if any
/// * `credentials_presented` - whether the request carried a bearer token
///
/// # Errors
///
/// Returns `Error::Unauthorized` when invalid credentials were presented
/// and no guest name is available.
pub fn resolve(
    session: Option<&SessionInfo>,
    guest_name: Option<&str>,
    credentials_presented: bool,
) -> Result<Identity, Error> {
    if let Some(session) = session {
        return Ok(Identity {
            id: PlayerId::new(session.email.clone()),
            name: session.display_name.clone(),
        });
    }

    if let Some(name) = guest_name {
        return Ok(Identity {
            id: PlayerId::new(format!("{GUEST_PREFIX}{}", normalize(name))),
            name: name.to_owned(),
        });
    }

    if credentials_presented {
        return Err(Error::Unauthorized);
    }

    tracing::warn!("nameless anonymous caller resolved to the shared guest identity");
    Ok(Identity::shared_anonymous())
}

//! Authentication session collaborator
//!
//! This module defines the trait for the external identity/session service
//! the game core consumes. The abstraction allows different credential
//! backends (database-backed sessions, JWTs, test stubs) while maintaining
//! a consistent interface.

use serde::{Deserialize, Serialize};

/// The payload an authenticated session resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The account email address, used as the stable player identifier
    pub email: String,
    /// The display name registered with the account
    pub display_name: String,
    /// The phone number registered with the account, if any
    pub phone: Option<String>,
}

/// Trait for validating bearer credentials
///
/// Implementations might look sessions up in a database, verify signed
/// tokens, or serve canned fixtures in tests. The core only ever asks one
/// question: does this token belong to someone, and if so, to whom.
pub trait SessionService {
    /// Validates a bearer token and returns the session it belongs to
    ///
    /// # Arguments
    ///
    /// * `token` - the raw bearer token from the request
    ///
    /// # Returns
    ///
    /// The session payload for a valid token, otherwise `None`
    fn authenticate(&self, token: &str) -> Option<SessionInfo>;
}

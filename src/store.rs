//! Lobby storage collaborator
//!
//! This module defines the trait for durable keyed lobby storage and an
//! in-memory implementation of it. The contract that matters is the
//! serialized read-modify-write per lobby: every mutating operation runs
//! against an exclusively held record and commits the whole updated record
//! before releasing it, so concurrent writers on the same lobby never lose
//! each other's updates. Status reads are plain snapshots and may be
//! slightly stale.

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use super::lobby::{Lobby, LobbyCode};

/// Errors that can occur at the storage layer
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No lobby exists under the given code
    #[error("lobby not found")]
    NotFound,
    /// A lobby already exists under the given code
    #[error("lobby code already in use")]
    CodeTaken,
    /// Repeated draws failed to find a free code
    #[error("could not allocate an unused lobby code")]
    CodeSpaceExhausted,
}

/// Trait for keyed lobby storage with per-lobby write serialization
///
/// Implementations might wrap a database row with `SELECT ... FOR UPDATE`,
/// a compare-and-swap retry loop, or the in-memory map below. Lobbies are
/// independent; no ordering across codes is required.
pub trait LobbyStore {
    /// Stores a new lobby under its code
    ///
    /// # Errors
    ///
    /// Returns `Error::CodeTaken` if the code is already in use; this is
    /// the uniqueness check code generation relies on.
    fn create(&self, lobby: Lobby) -> Result<(), Error>;

    /// Returns a snapshot of a lobby
    ///
    /// Snapshots are taken without blocking writers and may be slightly
    /// stale, which the derived view tolerates.
    fn get(&self, code: &LobbyCode) -> Option<Lobby>;

    /// Runs a mutation against an exclusively held lobby record
    ///
    /// The closure sees the current record and its changes are committed
    /// atomically when it returns `Ok`. When it returns an error the
    /// record is left exactly as it was; a failed transition never
    /// half-applies.
    ///
    /// # Errors
    ///
    /// Returns `store::Error::NotFound` (wrapped) if the code is unknown,
    /// otherwise whatever the closure returns.
    fn update<R, F>(&self, code: &LobbyCode, mutate: F) -> Result<R, crate::Error>
    where
        F: FnOnce(&mut Lobby) -> Result<R, crate::Error>;
}

/// In-memory lobby storage
///
/// Entry-exclusive access on the underlying concurrent map serializes
/// writers per code. Suitable for a single process; a multi-process
/// deployment swaps in a database-backed implementation of the same trait.
#[derive(Debug, Default)]
pub struct MemoryLobbyStore {
    lobbies: DashMap<LobbyCode, Lobby>,
}

impl MemoryLobbyStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lobbies currently stored
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    /// Whether the store holds no lobbies
    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}

impl LobbyStore for MemoryLobbyStore {
    fn create(&self, lobby: Lobby) -> Result<(), Error> {
        match self.lobbies.entry(lobby.code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::CodeTaken),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                tracing::debug!(code = %lobby.code, "lobby created");
                vacant.insert(lobby);
                Ok(())
            }
        }
    }

    fn get(&self, code: &LobbyCode) -> Option<Lobby> {
        self.lobbies.get(code).map(|entry| entry.clone())
    }

    fn update<R, F>(&self, code: &LobbyCode, mutate: F) -> Result<R, crate::Error>
    where
        F: FnOnce(&mut Lobby) -> Result<R, crate::Error>,
    {
        let mut entry = self.lobbies.get_mut(code).ok_or(Error::NotFound)?;

        // Mutate a working copy; commit only on success.
        let mut working = entry.clone();
        let out = mutate(&mut working)?;
        *entry = working;
        Ok(out)
    }
}

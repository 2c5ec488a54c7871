//! # Sortonym Game Library
//!
//! This library provides the core logic for the Sortonym word-sorting game:
//! multiplayer lobbies with team formation and a serialized per-lobby state
//! machine, round dealing and scoring against synonym/antonym ground truth,
//! and completion detection for team play. Storage, word lookup, and
//! authentication are pluggable collaborators behind traits.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

use serde::Serialize;

pub mod constants;

pub mod identity;
pub mod lobby;
pub mod round;
pub mod scoring;
pub mod service;
pub mod session;
pub mod store;
pub mod view;
pub mod words;

/// Any error an exposed operation can surface
///
/// Each variant wraps one module's error type so callers can match on the
/// failure kind while transports serialize the human-readable message.
/// Nothing here is retried internally; storage contention is the storage
/// collaborator's concern and code-collision retry is the one bounded loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error, derive_more::From)]
pub enum Error {
    /// Storage layer failures: unknown lobby, taken or exhausted codes
    #[error(transparent)]
    Store(store::Error),
    /// Lobby state machine rejections
    #[error(transparent)]
    Lobby(lobby::Error),
    /// Identity resolution and name hygiene failures
    #[error(transparent)]
    Identity(identity::Error),
    /// Word source failures that survived the fallback
    #[error(transparent)]
    Words(words::Error),
    /// Round redemption failures
    #[error(transparent)]
    Round(round::Error),
    /// Request validation failures
    #[error("invalid request: {0}")]
    #[from(ignore)]
    Validation(String),
}

impl From<garde::Report> for Error {
    /// Flattens a validation report into a single structured message
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

//! Shared error types for the services crate.

use thiserror::Error;

use gauntlet_core::model::ChallengeId;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by mirror adapters.
///
/// These never escape the engine: mirror writes are fire-and-forget and
/// failures are logged, not surfaced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MirrorError {
    #[error("mirror upsert failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `ProgressEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("no active session")]
    NoSession,
    #[error("session has not reached the final station")]
    SessionActive,
    #[error("session already ended")]
    SessionEnded,
    #[error("challenge {0} is not part of the challenge order")]
    UnknownChallenge(ChallengeId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

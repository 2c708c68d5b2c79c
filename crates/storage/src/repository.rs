use async_trait::async_trait;
use gauntlet_core::model::{ChallengeId, ParticipantName, Session, SessionError};
use gauntlet_core::registry::ChallengeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors turning a persisted record back into a live session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("challenge {0} is not part of the challenge order")]
    UnknownChallenge(ChallengeId),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Persisted shape for a participant's progress.
///
/// This is the exact durable JSON contract used for resume:
/// `{ "name", "challenge", "score", "completedChallenges" }`. Sentinel
/// stations are never written, so `challenge` always names a real entry of
/// the challenge order. Anything that fails to parse as this shape is
/// treated as a corrupt record, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    name: ParticipantName,
    challenge: ChallengeId,
    score: f64,
    #[serde(rename = "completedChallenges")]
    completed_challenges: Vec<ChallengeId>,
}

impl ProgressRecord {
    /// Snapshot a session for persistence.
    ///
    /// Returns `None` when the session sits at a sentinel station; those are
    /// never persisted.
    #[must_use]
    pub fn from_session(session: &Session) -> Option<Self> {
        session.current_challenge().map(|challenge| Self {
            name: session.name().clone(),
            challenge: challenge.clone(),
            score: session.score(),
            completed_challenges: session.completed().to_vec(),
        })
    }

    /// Convert the record back into a live `Session`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownChallenge` if the current challenge or
    /// any completed entry is not in the registry, and wraps the session
    /// invariant failures (for example a negative score) otherwise.
    pub fn into_session(self, registry: &ChallengeRegistry) -> Result<Session, ProgressError> {
        if !registry.contains(&self.challenge) {
            return Err(ProgressError::UnknownChallenge(self.challenge));
        }
        if let Some(unknown) = self
            .completed_challenges
            .iter()
            .find(|id| !registry.contains(id))
        {
            return Err(ProgressError::UnknownChallenge(unknown.clone()));
        }

        Ok(Session::from_persisted(
            self.name,
            self.challenge,
            self.score,
            self.completed_challenges,
        )?)
    }

    #[must_use]
    pub fn name(&self) -> &ParticipantName {
        &self.name
    }

    #[must_use]
    pub fn challenge(&self) -> &ChallengeId {
        &self.challenge
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn completed_challenges(&self) -> &[ChallengeId] {
        &self.completed_challenges
    }
}

/// Key-value contract every local persistence backend implements.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written; writes must
    /// not fail silently.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Removing a missing key is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Well-known key for the last-active participant pointer.
pub const LAST_ACTIVE_KEY: &str = "lastParticipant";

/// Key under which a participant's progress record is stored.
#[must_use]
pub fn progress_key(name: &ParticipantName) -> String {
    format!("progress:{name}")
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Outcome of loading a participant's stored progress.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLookup {
    Found(ProgressRecord),
    /// A value exists but does not parse as a `ProgressRecord`. The caller
    /// decides whether to clear it; loading never deletes.
    Corrupt,
    Missing,
}

/// Typed progress storage over a `KvStore` backend.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KvStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKvStore::new()))
    }

    /// Load the stored progress for `name`.
    ///
    /// An unparseable value, or a record stored under a key that does not
    /// match its embedded name, is reported as `ProgressLookup::Corrupt`
    /// rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself fails.
    pub async fn load(&self, name: &ParticipantName) -> Result<ProgressLookup, StorageError> {
        let Some(raw) = self.kv.get(&progress_key(name)).await? else {
            return Ok(ProgressLookup::Missing);
        };

        match serde_json::from_str::<ProgressRecord>(&raw) {
            Ok(record) if record.name() == name => Ok(ProgressLookup::Found(record)),
            Ok(record) => {
                warn!(
                    requested = %name,
                    stored = %record.name(),
                    "stored progress is keyed under a different name"
                );
                Ok(ProgressLookup::Corrupt)
            }
            Err(err) => {
                warn!(%name, %err, "stored progress does not parse");
                Ok(ProgressLookup::Corrupt)
            }
        }
    }

    /// Write a progress record, replacing any previous one for the same
    /// name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the backend write fails.
    pub async fn save(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let raw = serde_json::to_string(record)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(&progress_key(record.name()), &raw).await
    }

    /// Delete the stored progress for `name`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn clear(&self, name: &ParticipantName) -> Result<(), StorageError> {
        self.kv.delete(&progress_key(name)).await
    }

    /// The participant most recently mid-sequence, if any.
    ///
    /// An unusable stored pointer (for example a blank string) is logged and
    /// reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn last_active(&self) -> Result<Option<ParticipantName>, StorageError> {
        let Some(raw) = self.kv.get(LAST_ACTIVE_KEY).await? else {
            return Ok(None);
        };
        match ParticipantName::new(raw) {
            Ok(name) => Ok(Some(name)),
            Err(err) => {
                warn!(%err, "stored last-active pointer is unusable");
                Ok(None)
            }
        }
    }

    /// Point the last-active marker at `name`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn set_last_active(&self, name: &ParticipantName) -> Result<(), StorageError> {
        self.kv.set(LAST_ACTIVE_KEY, name.as_str()).await
    }

    /// Clear the last-active marker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn clear_last_active(&self) -> Result<(), StorageError> {
        self.kv.delete(LAST_ACTIVE_KEY).await
    }
}

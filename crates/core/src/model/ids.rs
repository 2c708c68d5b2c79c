use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identifier for one mini-challenge in the fixed sequence.
///
/// Tokens are opaque (`typing`, `trivia`, `mcq1`, ...); ordering between
/// challenges comes from the `ChallengeRegistry`, never from the id itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId(String);

impl ChallengeId {
    /// Creates a new `ChallengeId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying token
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated participant name (trimmed, non-empty).
///
/// The name doubles as the local persistence key, so validity is a storage
/// invariant rather than a UI concern; a persisted record carrying an empty
/// name fails to deserialize.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantName(String);

impl ParticipantName {
    /// Create a validated participant name.
    ///
    /// # Errors
    ///
    /// Returns `NameError::Empty` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, NameError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantName> for String {
    fn from(name: ParticipantName) -> Self {
        name.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameError {
    #[error("participant name cannot be empty")]
    Empty,
}

impl fmt::Debug for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChallengeId({})", self.0)
    }
}

impl fmt::Debug for ParticipantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantName({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ParticipantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

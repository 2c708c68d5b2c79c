use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use gauntlet_core::model::{ChallengeId, ParticipantName, Session};

use crate::error::MirrorError;

/// The fields an upsert fully replaces on the remote record.
///
/// The score is rounded to an integer for the leaderboard; the rest mirrors
/// the session verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorFields {
    pub score: i64,
    pub last_challenge: ChallengeId,
    pub completed_challenges: Vec<ChallengeId>,
}

impl MirrorFields {
    /// Snapshot a session for mirroring.
    ///
    /// Returns `None` at sentinel stations; those are never mirrored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_session(session: &Session) -> Option<Self> {
        session.current_challenge().map(|challenge| Self {
            score: session.score().round() as i64,
            last_challenge: challenge.clone(),
            completed_challenges: session.completed().to_vec(),
        })
    }
}

/// Best-effort remote progress sink.
///
/// Callers treat every implementation as advisory: an upsert that fails is
/// logged and forgotten, never retried, and a disabled sink is
/// indistinguishable from an unreachable one.
#[async_trait]
pub trait ProgressMirror: Send + Sync {
    /// Replace the remote record for `name` with `fields`.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError` when the remote store rejects or cannot be
    /// reached. The engine logs and drops these.
    async fn upsert(
        &self,
        name: &ParticipantName,
        fields: &MirrorFields,
    ) -> Result<(), MirrorError>;
}

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl MirrorConfig {
    /// Read the mirror endpoint from the environment.
    ///
    /// An absent or blank `GAUNTLET_MIRROR_URL` disables mirroring;
    /// `GAUNTLET_MIRROR_API_KEY` optionally adds bearer auth.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("GAUNTLET_MIRROR_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var("GAUNTLET_MIRROR_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        Some(Self { base_url, api_key })
    }
}

/// HTTP implementation of the progress mirror.
#[derive(Clone)]
pub struct HttpMirror {
    client: Client,
    config: Option<MirrorConfig>,
}

impl HttpMirror {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(MirrorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<MirrorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl ProgressMirror for HttpMirror {
    async fn upsert(
        &self,
        name: &ParticipantName,
        fields: &MirrorFields,
    ) -> Result<(), MirrorError> {
        // Disabled mirrors resolve silently; the engine does not distinguish
        // disabled from unreachable.
        let Some(config) = self.config.as_ref() else {
            return Ok(());
        };

        let url = format!("{}/progress", config.base_url.trim_end_matches('/'));
        let payload = UpsertRequest {
            name: name.as_str(),
            score: fields.score,
            last_challenge: &fields.last_challenge,
            completed_challenges: &fields.completed_challenges,
        };

        let mut request = self.client.post(url).json(&payload);
        if let Some(api_key) = config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MirrorError::HttpStatus(response.status()));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    name: &'a str,
    score: i64,
    #[serde(rename = "lastChallenge")]
    last_challenge: &'a ChallengeId,
    #[serde(rename = "completedChallenges")]
    completed_challenges: &'a [ChallengeId],
}

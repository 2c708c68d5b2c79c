use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use gauntlet_core::model::{ChallengeId, CompletionEvent, ParticipantName, Session, Station};
use gauntlet_core::registry::ChallengeRegistry;
use storage::repository::{ProgressLookup, ProgressRecord, ProgressStore};

use crate::error::EngineError;
use crate::mirror::{MirrorFields, ProgressMirror};

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Owns the session and orchestrates both persistence adapters.
///
/// Single-writer by construction: every mutating operation takes `&mut self`
/// and awaits the local write before returning, so no stale state can ever
/// overwrite a newer record. The remote mirror is written fire-and-forget on
/// a spawned task and never blocks or fails an operation.
pub struct ProgressEngine {
    registry: Arc<ChallengeRegistry>,
    store: ProgressStore,
    mirror: Arc<dyn ProgressMirror>,
    session: Option<Session>,
}

impl ProgressEngine {
    #[must_use]
    pub fn new(
        registry: Arc<ChallengeRegistry>,
        store: ProgressStore,
        mirror: Arc<dyn ProgressMirror>,
    ) -> Self {
        Self {
            registry,
            store,
            mirror,
            session: None,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ChallengeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The station to render: `Welcome` until a session exists, then the
    /// session's position.
    #[must_use]
    pub fn station(&self) -> &Station {
        self.session
            .as_ref()
            .map_or(&Station::Welcome, Session::station)
    }

    /// Start a session for `name`, resuming stored progress when it exists.
    ///
    /// A stored record that fails to parse or no longer fits the challenge
    /// order is cleared and replaced by a fresh session, exactly as if it
    /// had never existed. Fresh sessions are announced to the mirror but
    /// not written locally until the first real mutation.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if local persistence fails.
    pub async fn start_or_resume(
        &mut self,
        name: ParticipantName,
    ) -> Result<&Session, EngineError> {
        let (session, fresh) = match self.store.load(&name).await? {
            ProgressLookup::Found(record) => match record.into_session(&self.registry) {
                Ok(session) => (session, false),
                Err(err) => {
                    warn!(%name, %err, "stored progress does not fit the challenge order, starting over");
                    self.store.clear(&name).await?;
                    (self.fresh_session(name), true)
                }
            },
            ProgressLookup::Corrupt => {
                self.store.clear(&name).await?;
                (self.fresh_session(name), true)
            }
            ProgressLookup::Missing => (self.fresh_session(name), true),
        };

        if fresh {
            self.spawn_mirror(&session);
        } else {
            info!(name = %session.name(), station = %session.station(), "resumed session");
        }

        if session.current_challenge().is_some() {
            self.store.set_last_active(session.name()).await?;
        }

        let session = self.session.insert(session);
        Ok(&*session)
    }

    /// Rehydrate the session named by the last-active pointer, if any.
    ///
    /// Unlike `start_or_resume` this never fabricates a session: a pointer
    /// with no usable record behind it is cleared and `None` is returned,
    /// leaving the caller at the welcome station.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if local persistence fails.
    pub async fn resume_last_active(&mut self) -> Result<Option<&Session>, EngineError> {
        let Some(name) = self.store.last_active().await? else {
            return Ok(None);
        };

        match self.store.load(&name).await? {
            ProgressLookup::Found(record) => match record.into_session(&self.registry) {
                Ok(session) => {
                    info!(name = %session.name(), station = %session.station(), "resumed last active session");
                    let session = self.session.insert(session);
                    Ok(Some(&*session))
                }
                Err(err) => {
                    warn!(%name, %err, "last active progress does not fit the challenge order");
                    self.store.clear(&name).await?;
                    self.store.clear_last_active().await?;
                    Ok(None)
                }
            },
            ProgressLookup::Corrupt => {
                self.store.clear(&name).await?;
                self.store.clear_last_active().await?;
                Ok(None)
            }
            ProgressLookup::Missing => {
                debug!(%name, "last active pointer had no record behind it");
                self.store.clear_last_active().await?;
                Ok(None)
            }
        }
    }

    /// Record that the current challenge reported completion.
    ///
    /// Completions for anything other than the current challenge are stale
    /// callbacks from unmounted widgets and are ignored. Completing does
    /// not advance; navigation is a separate command.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoSession` without a session and
    /// `EngineError::Storage` if the write-through fails.
    pub async fn record_completion(&mut self, challenge: &ChallengeId) -> Result<(), EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoSession)?;

        if session.current_challenge() != Some(challenge) {
            debug!(%challenge, "ignoring completion for a challenge that is no longer current");
            return Ok(());
        }

        if session.mark_completed(challenge.clone()) {
            self.persist().await?;
        }
        Ok(())
    }

    /// Replace the score with the absolute total the active challenge
    /// reported.
    ///
    /// Non-finite values are ignored with a warning; updates after the
    /// final station are stale and dropped like late completions.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoSession` without a session and
    /// `EngineError::Storage` if the write-through fails.
    pub async fn update_score(&mut self, score: f64) -> Result<(), EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoSession)?;

        if session.is_done() {
            debug!("ignoring score update after the final station");
            return Ok(());
        }

        let changed = match session.set_score(score) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(%err, score, "ignoring unusable score update");
                false
            }
        };

        if changed {
            self.persist().await?;
        }
        Ok(())
    }

    /// Apply a normalized challenge callback: score update, completion, or
    /// both.
    ///
    /// The whole event is gated on the challenge still being current, so a
    /// stale widget can neither complete nor re-score anything.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoSession` without a session and
    /// `EngineError::Storage` if the write-through fails.
    pub async fn apply_event(&mut self, event: CompletionEvent) -> Result<(), EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoSession)?;

        if session.current_challenge() != Some(&event.challenge) {
            debug!(challenge = %event.challenge, "ignoring event for a challenge that is no longer current");
            return Ok(());
        }

        let mut changed = false;
        if let Some(score) = event.score {
            match session.set_score(score) {
                Ok(score_changed) => changed |= score_changed,
                Err(err) => warn!(%err, score, "ignoring unusable score in event"),
            }
        }
        if event.success {
            changed |= session.mark_completed(event.challenge);
        }

        if changed {
            self.persist().await?;
        }
        Ok(())
    }

    /// Move to the next challenge in the order, or to `Done` after the last
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoSession` without a session,
    /// `EngineError::SessionEnded` once the session is done, and
    /// `EngineError::Storage` if the write-through fails.
    pub async fn advance(&mut self) -> Result<&Station, EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoSession)?;
        let current = session
            .current_challenge()
            .ok_or(EngineError::SessionEnded)?;

        let next = self
            .registry
            .next_after(current)
            .cloned()
            .map_or(Station::Done, Station::Challenge);
        session.set_station(next);

        self.persist().await?;
        Ok(self.station())
    }

    /// Navigate via the rail rule.
    ///
    /// A not-yet-completed target is entered directly, earlier or later
    /// than the current position. A completed target cannot be replayed:
    /// the session moves to the first incomplete challenge strictly after
    /// it, or to `Done` when no gap remains.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoSession` without a session,
    /// `EngineError::SessionEnded` once the session is done, and
    /// `EngineError::UnknownChallenge` for ids outside the order (the rail
    /// never offers those; debug builds assert).
    pub async fn jump_to(&mut self, target: &ChallengeId) -> Result<&Station, EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoSession)?;
        if session.is_done() {
            return Err(EngineError::SessionEnded);
        }
        if self.registry.index_of(target).is_none() {
            debug_assert!(false, "jump target {target} is not part of the challenge order");
            return Err(EngineError::UnknownChallenge(target.clone()));
        }

        let next = if session.is_completed(target) {
            self.registry
                .next_incomplete_after(target, session.completed())
                .cloned()
                .map_or(Station::Done, Station::Challenge)
        } else {
            Station::Challenge(target.clone())
        };
        session.set_station(next);

        self.persist().await?;
        Ok(self.station())
    }

    /// Close out a finished session.
    ///
    /// Deleting the record is the one destructive operation the engine
    /// exposes, so it insists the session actually reached `Done`; a
    /// returning visit under the same name then starts fresh.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoSession` without a session,
    /// `EngineError::SessionActive` before the final station, and
    /// `EngineError::Storage` if the deletes fail.
    pub async fn finish(&mut self) -> Result<(), EngineError> {
        let session = self.session.as_ref().ok_or(EngineError::NoSession)?;
        if !session.is_done() {
            return Err(EngineError::SessionActive);
        }

        self.store.clear(session.name()).await?;
        self.store.clear_last_active().await?;
        info!(name = %session.name(), "finished session");

        self.session = None;
        Ok(())
    }

    fn fresh_session(&self, name: ParticipantName) -> Session {
        info!(%name, "starting fresh session");
        Session::new(name, self.registry.first().clone())
    }

    /// Write-through after a mutation: durable record first, then the
    /// last-active pointer, then the fire-and-forget mirror.
    ///
    /// At a sentinel station only the pointer is cleared; the record keeps
    /// the last real challenge so the session stays resumable until
    /// `finish` deletes it.
    async fn persist(&self) -> Result<(), EngineError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };

        match ProgressRecord::from_session(session) {
            Some(record) => {
                self.store.save(&record).await?;
                self.store.set_last_active(session.name()).await?;
                self.spawn_mirror(session);
            }
            None => {
                self.store.clear_last_active().await?;
            }
        }
        Ok(())
    }

    fn spawn_mirror(&self, session: &Session) {
        let Some(fields) = MirrorFields::from_session(session) else {
            return;
        };
        let name = session.name().clone();
        let mirror = Arc::clone(&self.mirror);
        tokio::spawn(async move {
            if let Err(err) = mirror.upsert(&name, &fields).await {
                warn!(%name, %err, "progress mirror upsert failed");
            }
        });
    }
}

impl fmt::Debug for ProgressEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEngine")
            .field("order_len", &self.registry.len())
            .field("station", self.station())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

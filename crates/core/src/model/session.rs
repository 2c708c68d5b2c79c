use thiserror::Error;

use crate::model::ids::{ChallengeId, ParticipantName};
use crate::model::station::Station;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("score must be a finite, non-negative number")]
    InvalidScore,
}

/// Live progress state for one participant.
///
/// Owned and mutated exclusively by the engine; the completion set is
/// append-only and the station only ever holds a real challenge or `Done`,
/// never `Welcome`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    name: ParticipantName,
    station: Station,
    completed: Vec<ChallengeId>,
    score: f64,
}

impl Session {
    /// Create a fresh session positioned at the first challenge of the order.
    #[must_use]
    pub fn new(name: ParticipantName, first: ChallengeId) -> Self {
        Self {
            name,
            station: Station::Challenge(first),
            completed: Vec::new(),
            score: 0.0,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// The completed list is deduplicated silently; persisted records are
    /// written from a set, so duplicates only appear through tampering.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidScore` if the score is not a finite,
    /// non-negative number.
    pub fn from_persisted(
        name: ParticipantName,
        challenge: ChallengeId,
        score: f64,
        completed: Vec<ChallengeId>,
    ) -> Result<Self, SessionError> {
        if !score.is_finite() || score < 0.0 {
            return Err(SessionError::InvalidScore);
        }

        let mut deduped: Vec<ChallengeId> = Vec::with_capacity(completed.len());
        for id in completed {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }

        Ok(Self {
            name,
            station: Station::Challenge(challenge),
            completed: deduped,
            score,
        })
    }

    #[must_use]
    pub fn name(&self) -> &ParticipantName {
        &self.name
    }

    #[must_use]
    pub fn station(&self) -> &Station {
        &self.station
    }

    /// The challenge currently presented, or `None` once the session is done.
    #[must_use]
    pub fn current_challenge(&self) -> Option<&ChallengeId> {
        self.station.challenge()
    }

    /// Completed challenges in the order they were first completed.
    #[must_use]
    pub fn completed(&self) -> &[ChallengeId] {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, challenge: &ChallengeId) -> bool {
        self.completed.contains(challenge)
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.station.is_done()
    }

    /// Add a challenge to the completed set.
    ///
    /// Idempotent; returns whether the set changed. Nothing ever removes a
    /// member once added.
    pub fn mark_completed(&mut self, challenge: ChallengeId) -> bool {
        if self.completed.contains(&challenge) {
            return false;
        }
        self.completed.push(challenge);
        true
    }

    /// Replace the score with an absolute value reported by a challenge.
    ///
    /// Negative values clamp to zero. Returns whether the stored value
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidScore` if the value is not finite.
    pub fn set_score(&mut self, score: f64) -> Result<bool, SessionError> {
        if !score.is_finite() {
            return Err(SessionError::InvalidScore);
        }
        let score = score.max(0.0);
        if (self.score - score).abs() < f64::EPSILON {
            return Ok(false);
        }
        self.score = score;
        Ok(true)
    }

    /// Move the session to a new station.
    ///
    /// `Welcome` is not a valid session station; reaching it means dropping
    /// the session entirely, which is the engine's job.
    pub fn set_station(&mut self, station: Station) {
        debug_assert!(
            !station.is_welcome(),
            "a live session cannot move to the welcome station"
        );
        self.station = station;
    }
}

/// Normalized form of a challenge widget callback.
///
/// Widgets report completion and score in several shapes; the view collapses
/// them into this one event before handing them to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub challenge: ChallengeId,
    pub success: bool,
    pub score: Option<f64>,
}

impl CompletionEvent {
    /// A challenge reported success without touching the score.
    #[must_use]
    pub fn completed(challenge: ChallengeId) -> Self {
        Self {
            challenge,
            success: true,
            score: None,
        }
    }

    /// A challenge reported success together with a new score total.
    #[must_use]
    pub fn completed_with_score(challenge: ChallengeId, score: f64) -> Self {
        Self {
            challenge,
            success: true,
            score: Some(score),
        }
    }

    /// A score-affecting attempt that did not complete the challenge.
    #[must_use]
    pub fn attempt(challenge: ChallengeId, score: f64) -> Self {
        Self {
            challenge,
            success: false,
            score: Some(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> ParticipantName {
        ParticipantName::new("Alex").unwrap()
    }

    #[test]
    fn new_session_starts_at_first_challenge_with_zero_score() {
        let session = Session::new(name(), ChallengeId::new("typing"));
        assert_eq!(
            session.current_challenge(),
            Some(&ChallengeId::new("typing"))
        );
        assert!(session.completed().is_empty());
        assert!(session.score().abs() < f64::EPSILON);
        assert!(!session.is_done());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut session = Session::new(name(), ChallengeId::new("typing"));
        assert!(session.mark_completed(ChallengeId::new("typing")));
        assert!(!session.mark_completed(ChallengeId::new("typing")));
        assert_eq!(session.completed(), &[ChallengeId::new("typing")]);
    }

    #[test]
    fn completed_set_keeps_first_completion_order() {
        let mut session = Session::new(name(), ChallengeId::new("typing"));
        session.mark_completed(ChallengeId::new("trivia"));
        session.mark_completed(ChallengeId::new("typing"));
        session.mark_completed(ChallengeId::new("trivia"));
        assert_eq!(
            session.completed(),
            &[ChallengeId::new("trivia"), ChallengeId::new("typing")]
        );
    }

    #[test]
    fn set_score_clamps_negative_values() {
        let mut session = Session::new(name(), ChallengeId::new("typing"));
        assert!(session.set_score(12.5).unwrap());
        assert!((session.score() - 12.5).abs() < f64::EPSILON);

        assert!(session.set_score(-4.0).unwrap());
        assert!(session.score().abs() < f64::EPSILON);
    }

    #[test]
    fn set_score_reports_unchanged_values() {
        let mut session = Session::new(name(), ChallengeId::new("typing"));
        assert!(session.set_score(10.0).unwrap());
        assert!(!session.set_score(10.0).unwrap());
    }

    #[test]
    fn set_score_rejects_non_finite_values() {
        let mut session = Session::new(name(), ChallengeId::new("typing"));
        let err = session.set_score(f64::NAN).unwrap_err();
        assert_eq!(err, SessionError::InvalidScore);
        let err = session.set_score(f64::INFINITY).unwrap_err();
        assert_eq!(err, SessionError::InvalidScore);
    }

    #[test]
    fn from_persisted_rejects_invalid_scores() {
        let err = Session::from_persisted(name(), ChallengeId::new("typing"), -1.0, Vec::new())
            .unwrap_err();
        assert_eq!(err, SessionError::InvalidScore);

        let err =
            Session::from_persisted(name(), ChallengeId::new("typing"), f64::NAN, Vec::new())
                .unwrap_err();
        assert_eq!(err, SessionError::InvalidScore);
    }

    #[test]
    fn from_persisted_deduplicates_completed() {
        let session = Session::from_persisted(
            name(),
            ChallengeId::new("mcq1"),
            3.0,
            vec![
                ChallengeId::new("typing"),
                ChallengeId::new("trivia"),
                ChallengeId::new("typing"),
            ],
        )
        .unwrap();
        assert_eq!(
            session.completed(),
            &[ChallengeId::new("typing"), ChallengeId::new("trivia")]
        );
    }

    #[test]
    fn done_station_hides_current_challenge() {
        let mut session = Session::new(name(), ChallengeId::new("typing"));
        session.set_station(Station::Done);
        assert!(session.is_done());
        assert_eq!(session.current_challenge(), None);
    }
}

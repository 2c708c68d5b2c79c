use thiserror::Error;

use crate::model::ChallengeId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("challenge order cannot be empty")]
    Empty,

    #[error("challenge order contains {0} more than once")]
    Duplicate(ChallengeId),
}

//
// ─── REGISTRY ──────────────────────────────────────────────────────────────────
//

/// The canonical, immutable challenge order.
///
/// Fixed at construction and never mutated; every challenge id referenced by
/// a session must be a member. Position queries are linear scans computed on
/// demand so navigation cannot drift from the order itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRegistry {
    order: Vec<ChallengeId>,
}

impl ChallengeRegistry {
    /// Create a registry from an explicit order.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Empty` for an empty order and
    /// `RegistryError::Duplicate` if any id appears twice.
    pub fn new(order: Vec<ChallengeId>) -> Result<Self, RegistryError> {
        if order.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (index, id) in order.iter().enumerate() {
            if order[..index].contains(id) {
                return Err(RegistryError::Duplicate(id.clone()));
            }
        }
        Ok(Self { order })
    }

    /// The shipped gauntlet order.
    #[must_use]
    pub fn standard() -> Self {
        let order = [
            "typing",
            "trivia",
            "mcq1",
            "wordscramble",
            "memorymatch",
            "mathsprint",
            "dragdrop",
            "sequencer",
            "mcq2",
            "spotdiff",
            "anagrams",
            "speedclick",
            "riddles",
            "homestretch",
        ]
        .into_iter()
        .map(ChallengeId::new)
        .collect();
        Self { order }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The full order, first challenge to last.
    #[must_use]
    pub fn order(&self) -> &[ChallengeId] {
        &self.order
    }

    /// Position of a challenge in the order, or `None` for unknown ids.
    #[must_use]
    pub fn index_of(&self, id: &ChallengeId) -> Option<usize> {
        self.order.iter().position(|candidate| candidate == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ChallengeId) -> bool {
        self.order.contains(id)
    }

    /// The first challenge of the order. Total: a registry is never empty.
    #[must_use]
    pub fn first(&self) -> &ChallengeId {
        &self.order[0]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChallengeId> {
        self.order.get(index)
    }

    /// The challenge immediately after `id`, or `None` past the last one.
    ///
    /// Unknown ids also yield `None`; callers guard before navigating.
    #[must_use]
    pub fn next_after(&self, id: &ChallengeId) -> Option<&ChallengeId> {
        let index = self.index_of(id)?;
        self.order.get(index + 1)
    }

    /// First challenge strictly after `id` that is not in `completed`.
    ///
    /// `None` when everything after `id` is completed or `id` is last; the
    /// caller maps that to the terminal station.
    #[must_use]
    pub fn next_incomplete_after(
        &self,
        id: &ChallengeId,
        completed: &[ChallengeId],
    ) -> Option<&ChallengeId> {
        let index = self.index_of(id)?;
        self.order[index + 1..]
            .iter()
            .find(|candidate| !completed.contains(candidate))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

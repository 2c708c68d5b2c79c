use std::fmt;

use crate::model::ids::ChallengeId;

/// Position of a session within the challenge sequence.
///
/// `Welcome` and `Done` are sentinels outside the orderable sequence: the
/// engine reports `Welcome` while no session exists, and `Done` is the
/// terminal state after the last challenge. A live `Session` never holds
/// `Welcome`, and neither sentinel is ever written to a persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Station {
    Welcome,
    Challenge(ChallengeId),
    Done,
}

impl Station {
    /// The challenge at this station, if it is not a sentinel.
    #[must_use]
    pub fn challenge(&self) -> Option<&ChallengeId> {
        match self {
            Self::Challenge(id) => Some(id),
            Self::Welcome | Self::Done => None,
        }
    }

    #[must_use]
    pub fn is_welcome(&self) -> bool {
        matches!(self, Self::Welcome)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome => write!(f, "welcome"),
            Self::Challenge(id) => write!(f, "{id}"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_accessor_skips_sentinels() {
        let station = Station::Challenge(ChallengeId::new("typing"));
        assert_eq!(station.challenge(), Some(&ChallengeId::new("typing")));
        assert_eq!(Station::Welcome.challenge(), None);
        assert_eq!(Station::Done.challenge(), None);
    }

    #[test]
    fn display_names_the_station() {
        assert_eq!(Station::Welcome.to_string(), "welcome");
        assert_eq!(Station::Done.to_string(), "done");
        assert_eq!(
            Station::Challenge(ChallengeId::new("trivia")).to_string(),
            "trivia"
        );
    }
}

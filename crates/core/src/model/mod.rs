mod ids;
mod session;
mod station;

pub use ids::{ChallengeId, NameError, ParticipantName};
pub use session::{CompletionEvent, Session, SessionError};
pub use station::Station;

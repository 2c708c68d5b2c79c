#![forbid(unsafe_code)]

pub mod model;
pub mod registry;

pub use model::{
    ChallengeId, CompletionEvent, NameError, ParticipantName, Session, SessionError, Station,
};
pub use registry::{ChallengeRegistry, RegistryError};

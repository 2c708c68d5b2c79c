use std::sync::Arc;

use gauntlet_core::registry::ChallengeRegistry;
use storage::repository::ProgressStore;

use crate::engine::ProgressEngine;
use crate::error::AppServicesError;
use crate::mirror::HttpMirror;

/// Assembles the progress engine over its storage and mirror adapters.
///
/// Deliberately not `Clone`: the engine is the single writer for session
/// state, and handing out copies would break that.
#[derive(Debug)]
pub struct AppServices {
    engine: ProgressEngine,
}

impl AppServices {
    /// Build the engine backed by `SQLite` storage, with the mirror
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str) -> Result<Self, AppServicesError> {
        let store = ProgressStore::sqlite(db_url).await?;
        Ok(Self::assemble(store, HttpMirror::from_env()))
    }

    /// Build the engine over in-memory storage with the mirror disabled.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::assemble(ProgressStore::in_memory(), HttpMirror::new(None))
    }

    fn assemble(store: ProgressStore, mirror: HttpMirror) -> Self {
        let registry = Arc::new(ChallengeRegistry::standard());
        Self {
            engine: ProgressEngine::new(registry, store, Arc::new(mirror)),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &ProgressEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ProgressEngine {
        &mut self.engine
    }
}

// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::{IdentityStore, InMemoryRepository, QuizRepository},
    service::QuizService,
    session::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn QuizRepository>,
    pub identity: Arc<dyn IdentityStore>,
    pub sessions: SessionRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn QuizRepository>,
        identity: Arc<dyn IdentityStore>,
        config: Config,
    ) -> Self {
        Self {
            repo,
            identity,
            sessions: SessionRegistry::new(),
            config,
        }
    }

    /// State backed by a fresh in-memory store, used by tests and `DATABASE_URL=memory`.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(InMemoryRepository::new());
        Self::new(store.clone(), store, config)
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<dyn QuizRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for QuizService {
    fn from_ref(state: &AppState) -> Self {
        QuizService::new(state.repo.clone(), state.identity.clone())
    }
}

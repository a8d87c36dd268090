// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::Repository,
    services::AttemptTransaction,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub submissions: AttemptTransaction,
    pub config: Config,
}

impl AppState {
    /// Wires the submission engine to `repo` using the retry settings in `config`.
    pub fn new(repo: Arc<dyn Repository>, config: Config) -> Self {
        let submissions = AttemptTransaction::new(repo.clone(), config.retry_policy());
        Self {
            repo,
            submissions,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Repository> {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for AttemptTransaction {
    fn from_ref(state: &AppState) -> Self {
        state.submissions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

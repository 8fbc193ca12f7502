// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, sandbox::Sandbox, store::Store};

/// Composition root handed to every handler. The store and the sandbox are
/// trait objects so tests can swap in in-memory and scripted versions.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sandbox: Arc<dyn Sandbox>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

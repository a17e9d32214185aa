use std::sync::Arc;

use features::dispatch::Dispatcher;

/// Shared state available to the dispatch middleware via Axum's state extractor.
#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

pub mod audit;
pub mod compose;
pub mod config;
pub mod domain;
pub mod error;
pub mod features;
pub mod mail;
pub mod rate_limit;
pub mod template;

//! Application state for Axum handlers.

use gridmatch_matcher::di::MatcherServiceInterface;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<dyn MatcherServiceInterface>,
}

impl AppState {
    /// Creates a new application state wrapping the matcher service.
    pub fn new(matcher: Arc<dyn MatcherServiceInterface>) -> Self {
        Self { matcher }
    }
}

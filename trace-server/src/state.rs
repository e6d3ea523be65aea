//! Shared handler state.

use std::sync::Arc;

use trace_graph::GraphStore;
use trace_orchestrator::DecisionOrchestrator;

use crate::error::ApiResult;

/// State shared by every request handler.
#[derive(Clone, Debug)]
pub struct AppState {
    orchestrator: Arc<DecisionOrchestrator>,
}

impl AppState {
    /// Wraps an orchestrator for use by handlers.
    #[must_use]
    pub fn new(orchestrator: DecisionOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// The decision orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &DecisionOrchestrator {
        &self.orchestrator
    }

    /// Graph store for the requested database, or the default one.
    ///
    /// # Errors
    ///
    /// Returns an error when the named database cannot be opened.
    pub async fn store(&self, database: Option<&str>) -> ApiResult<Arc<dyn GraphStore>> {
        Ok(self.orchestrator.store_for(database).await?)
    }
}

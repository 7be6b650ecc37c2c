use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::orchestrator::Orchestrator;
use crate::registry::TaskRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: TaskRegistry,
    pub orchestrator: Orchestrator,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: TaskRegistry,
        orchestrator: Orchestrator,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            orchestrator,
            metrics,
        }
    }
}

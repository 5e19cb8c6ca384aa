use std::sync::Arc;

use crate::config::Config;
use crate::downloader::EngineContext;
use crate::notify::NotificationGateway;
use crate::observability::Metrics;
use crate::store::TaskStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: TaskStore,
    pub gateway: NotificationGateway,
    pub engine: EngineContext,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: TaskStore,
        gateway: NotificationGateway,
        engine: EngineContext,
    ) -> Self {
        let metrics = Arc::clone(&engine.metrics);
        Self {
            config: Arc::new(config),
            store,
            gateway,
            engine,
            metrics,
        }
    }
}

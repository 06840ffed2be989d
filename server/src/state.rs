use std::sync::Arc;
use std::time::Instant;

use knnrec_core::Resources;

use crate::config::AppConfig;
use crate::prometheus_exporter::ServiceMetrics;

pub(crate) struct AppState {
    pub(crate) started_at: Instant,
    pub(crate) config: Arc<AppConfig>,
    pub(crate) resources: Resources,
    pub(crate) metrics: Arc<ServiceMetrics>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            started_at: self.started_at,
            config: Arc::clone(&self.config),
            resources: self.resources.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl AppState {
    pub(crate) fn new(config: AppConfig, resources: Resources) -> Result<Self, prometheus::Error> {
        Ok(Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            resources,
            metrics: Arc::new(ServiceMetrics::new()?),
        })
    }
}

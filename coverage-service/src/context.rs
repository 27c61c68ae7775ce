use std::sync::Arc;

use coverage_db::Store;

use crate::config::ServiceConfig;
use crate::launcher::QueueTaskSink;
use crate::metrics::{create_shared_metrics, SharedMetrics};

struct InnerServiceContext {
    config: ServiceConfig,
    store: Store,
    task_sink: QueueTaskSink,
    metrics: SharedMetrics,
}

#[derive(Clone)]
pub struct ServiceContext {
    inner: Arc<InnerServiceContext>,
}

impl ServiceContext {
    pub fn new(config: ServiceConfig, store: Store, task_sink: QueueTaskSink) -> Self {
        Self {
            inner: Arc::new(InnerServiceContext {
                config,
                store,
                task_sink,
                metrics: create_shared_metrics(),
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn task_sink(&self) -> &QueueTaskSink {
        &self.inner.task_sink
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.inner.metrics
    }
}

//! Application state for the HTTP server

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::pipeline::Pipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Pipeline,
    started: Instant,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                started: Instant::now(),
            }),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn config(&self) -> &RagConfig {
        self.inner.pipeline.config()
    }

    /// Seconds since the server state was created
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started.elapsed().as_secs()
    }
}

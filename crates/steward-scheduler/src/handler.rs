use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::Job;

/// One named job handler, looked up by `job.handler_ref` (spec.md §4.12) and
/// invoked with the job's opaque `action` JSON payload. `handler_ref` is
/// independent of `job.name`, which is only a human-readable label.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), String>;
}

/// Maps `handlerRef` to its handler. Registered once at startup for the
/// five default jobs plus whatever a deployment adds.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler_ref: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler_ref.into(), handler);
    }

    pub fn get(&self, handler_ref: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(handler_ref).cloned()
    }
}

//! In-process tool registry

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use super::{ToolError, ToolHandler, ToolRegistry};

/// Adapts a closure into a [`ToolHandler`]
pub struct FnTool<F>(pub F);

impl<F> ToolHandler for FnTool<F>
where
    F: Fn(JsonValue) -> Result<JsonValue, ToolError> + Send + Sync,
{
    fn invoke(&self, args: JsonValue) -> Result<JsonValue, ToolError> {
        (self.0)(args)
    }
}

/// Registry backed by a map; registration may happen while scripts run
#[derive(Default)]
pub struct InMemoryToolRegistry {
    tools: RwLock<BTreeMap<String, Arc<dyn ToolHandler>>>,
}

impl InMemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.tools.write().insert(name.into(), handler);
    }

    pub fn register_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(JsonValue) -> Result<JsonValue, ToolError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnTool(f)));
    }

    /// Builder-style registration
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(JsonValue) -> Result<JsonValue, ToolError> + Send + Sync + 'static,
    {
        self.register_fn(name, f);
        self
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.tools.write().remove(name).is_some()
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.read().get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }
}

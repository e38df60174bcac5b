//! Process-wide wiring
//!
//! Builds every component once from a [`Config`] and hands them out
//! explicitly; nothing here is global. Dropping the application drops the
//! last dispatcher handle, which lets the main-thread loop return.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;

use crate::bridge::builtin::register_builtin_tools;
use crate::bridge::{CallBridge, InMemoryToolRegistry, ToolError};
use crate::config::Config;
use crate::engine::{DispatcherHandle, ExecutionEngine};
use crate::protocol::ProtocolHandler;
use crate::scripts::ScriptStore;
use crate::services::{ScriptService, SessionService};

/// The reprise application instance with all services
pub struct Application {
    pub config: Config,
    pub registry: Arc<InMemoryToolRegistry>,
    pub engine: Arc<ExecutionEngine>,
    pub session_service: SessionService,
    pub script_service: ScriptService,
}

impl Application {
    /// Create a new Application instance (pure instantiation, no I/O)
    ///
    /// Without a dispatcher, main-thread requests run inline on the
    /// calling thread.
    pub fn new(config: Config, dispatcher: Option<DispatcherHandle>) -> Self {
        let scripts = Arc::new(ScriptStore::new(config.scripts_dir.clone()));

        let registry = Arc::new(InMemoryToolRegistry::new());
        register_builtin_tools(&registry, Arc::clone(&scripts));

        let bridge = Arc::new(CallBridge::new(registry.clone()));
        let mut engine = ExecutionEngine::new(bridge);
        if let Some(dispatcher) = dispatcher {
            engine = engine.with_dispatcher(dispatcher);
        }
        let engine = Arc::new(engine);

        info!(
            scripts_dir = %config.scripts_dir.display(),
            main_thread_dispatcher = engine.dispatcher().is_some(),
            "Application ready"
        );

        Self {
            session_service: SessionService::new(Arc::clone(&engine)),
            script_service: ScriptService::new(scripts),
            config,
            registry,
            engine,
        }
    }

    /// Make a tool callable from scripts as `tools.call(name, args)`
    pub fn register_tool<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(JsonValue) -> Result<JsonValue, ToolError> + Send + Sync + 'static,
    {
        self.registry.register_fn(name, f);
    }

    pub fn protocol_handler(&self) -> ProtocolHandler {
        ProtocolHandler::new(
            self.session_service.clone(),
            self.script_service.clone(),
            self.config.protocol_defaults(),
        )
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

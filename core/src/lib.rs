pub mod application;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod engine;
pub mod executor;
pub mod parser;
pub mod protocol;
pub mod scripts;
pub mod services;
pub mod session;
pub mod types;

// Re-export main types
pub use types::*;

// Re-export the embedding API for convenience
pub use application::Application;
pub use bridge::{CallBridge, InMemoryToolRegistry, ToolError, ToolHandler, ToolRegistry};
pub use engine::{ExecutionEngine, MainThreadDispatcher};

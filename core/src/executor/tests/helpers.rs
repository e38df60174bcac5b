//! Test helpers for executor tests
//!
//! Common utilities for parsing scripts and running them in a VM

use std::sync::Arc;

use serde_json::json;

use crate::bridge::{CallBridge, InMemoryToolRegistry, ToolError};
use crate::executor::{OutputBuffer, Thrown, Val, VM};
use crate::parser::ScriptDef;
use crate::session::Namespace;
use crate::types::ToolCallRecord;

/// Everything a single run produced
#[derive(Debug)]
pub struct RunResult {
    pub output: OutputBuffer,
    pub result: Result<Option<Val>, Thrown>,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl RunResult {
    pub fn stdout(&self) -> &str {
        &self.output.stdout
    }

    /// Returned value, panicking on an uncaught throw
    pub fn value(&self) -> Val {
        match &self.result {
            Ok(value) => value.clone().unwrap_or(Val::Null),
            Err(thrown) => panic!("Unexpected throw: {:?}", thrown),
        }
    }

    /// Thrown error code, panicking if the run succeeded
    pub fn error_code(&self) -> String {
        match &self.result {
            Ok(value) => panic!("Expected a throw, got {:?}", value),
            Err(thrown) => thrown.code_and_message().0,
        }
    }

    pub fn thrown(&self) -> &Thrown {
        match &self.result {
            Ok(value) => panic!("Expected a throw, got {:?}", value),
            Err(thrown) => thrown,
        }
    }
}

/// Parse and validate source, then round-trip the AST through JSON
pub fn compile(source: &str) -> ScriptDef {
    let script = crate::parser::parse_script(source).expect("Parse failed");
    let errors = crate::parser::semantic_validator::validate_script(&script, source);
    let validation_errors: Vec<_> = errors.iter().filter(|e| e.is_error()).collect();
    assert!(
        validation_errors.is_empty(),
        "Script validation failed: {:?}",
        validation_errors
    );
    let json = serde_json::to_string(&script).expect("Script serialization failed");
    serde_json::from_str(&json).expect("Script deserialization failed")
}

/// Registry with a handful of tools used across executor tests
pub fn test_bridge() -> Arc<CallBridge> {
    let registry = InMemoryToolRegistry::new()
        .with_fn("echo", |args| Ok(args))
        .with_fn("math.add", |args| {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({ "sum": a + b }))
        })
        .with_fn("always.fails", |_| Err(ToolError::failed("backend unavailable")));
    Arc::new(CallBridge::new(Arc::new(registry)))
}

/// Run source against an existing namespace
pub fn run_in(namespace: &mut Namespace, source: &str) -> RunResult {
    let script = compile(source);
    namespace.inject_builtins(Some(test_bridge()));
    let mut vm = VM::new(namespace);
    let result = vm.run(&script);
    let (output, tool_calls) = vm.into_parts();
    RunResult {
        output,
        result,
        tool_calls,
    }
}

/// Run source against a fresh namespace
pub fn run(source: &str) -> RunResult {
    let mut namespace = Namespace::new();
    run_in(&mut namespace, source)
}

//! Execution engine
//!
//! Runs one [`ExecutionRequest`] to completion and always returns an
//! [`ExecutionOutcome`]. Compilation errors, uncaught throws and even
//! interpreter panics are reported in the outcome; none of them escape to
//! the caller.
//!
//! Persistent requests hold their session's lock for the whole execution.
//! The lock is taken before the namespace is resolved, so a concurrent
//! clear can never leave two executions holding the same namespace.

pub mod dispatcher;

#[cfg(test)]
mod tests;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info_span, warn};
use uuid::Uuid;

use crate::bridge::{panic_message, CallBridge};
use crate::executor::errors;
use crate::executor::{OutputBuffer, Thrown, Val, VM};
use crate::parser::semantic_validator::validate_script;
use crate::parser::{parse_script, ScriptDef};
use crate::session::{NamespaceStore, SessionLockTable, SharedNamespace};
use crate::types::{
    ClearSessionAck, ExecutionFault, ExecutionOutcome, ExecutionRequest, FaultKind, SessionInfo,
    ToolCallRecord,
};

pub use dispatcher::{DispatcherError, DispatcherHandle, DispatcherState, DispatcherStatus, MainThreadDispatcher};

/// What one run of a compiled unit produced
#[derive(Debug)]
struct RunReport {
    output: OutputBuffer,
    tool_calls: Vec<ToolCallRecord>,
    result: Result<Option<Val>, ExecutionFault>,
}

impl RunReport {
    fn internal(code: &str, message: impl Into<String>) -> Self {
        Self {
            output: OutputBuffer::default(),
            tool_calls: Vec::new(),
            result: Err(ExecutionFault::new(FaultKind::Internal, code, message)),
        }
    }
}

pub struct ExecutionEngine {
    namespaces: Arc<NamespaceStore>,
    locks: Arc<SessionLockTable>,
    bridge: Arc<CallBridge>,
    dispatcher: Option<DispatcherHandle>,
}

impl ExecutionEngine {
    pub fn new(bridge: Arc<CallBridge>) -> Self {
        Self {
            namespaces: Arc::new(NamespaceStore::new()),
            locks: Arc::new(SessionLockTable::new()),
            bridge,
            dispatcher: None,
        }
    }

    /// Route main-thread requests through `dispatcher`
    pub fn with_dispatcher(mut self, dispatcher: DispatcherHandle) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn namespaces(&self) -> &NamespaceStore {
        &self.namespaces
    }

    pub fn dispatcher(&self) -> Option<&DispatcherHandle> {
        self.dispatcher.as_ref()
    }

    /// Run one request. Blocks the calling thread; call it from a blocking
    /// context, never from inside an async task.
    pub fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let execution_id = Uuid::new_v4();
        let span = info_span!(
            "execute",
            %execution_id,
            session_id = request.session_id.as_deref().unwrap_or("-"),
            persistent = request.persistent,
            main_thread = request.main_thread,
        );
        let _enter = span.enter();
        let started = Instant::now();

        let report = match (&request.session_id, request.persistent) {
            (Some(session_id), true) => self.locks.run_exclusive(session_id, || {
                let namespace = self.namespaces.get_or_create(session_id, true);
                self.run_request(&request, namespace)
            }),
            (Some(session_id), false) => {
                self.run_request(&request, self.namespaces.get_or_create(session_id, false))
            }
            (None, _) => self.run_request(&request, NamespaceStore::ephemeral()),
        };

        let outcome = into_outcome(request, report, started);
        debug!(
            success = outcome.success,
            duration_ms = outcome.duration_ms,
            "Execution finished"
        );
        outcome
    }

    /// Remove a session's namespace, and its lock once nobody is waiting on it.
    ///
    /// Waits for an in-flight execution on the session to finish first.
    /// Clearing an unknown id is acknowledged with `cleared: false`.
    pub fn clear_session(&self, session_id: &str) -> ClearSessionAck {
        let freed = self
            .locks
            .run_exclusive_then_retire(session_id, || self.namespaces.clear(session_id));

        ClearSessionAck {
            session_id: session_id.to_string(),
            cleared: freed.is_some(),
            bindings_freed: freed.unwrap_or(0),
        }
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.namespaces.sessions()
    }

    fn run_request(&self, request: &ExecutionRequest, namespace: SharedNamespace) -> RunReport {
        let (script, warnings) = match compile(&request.code) {
            Ok(compiled) => compiled,
            Err(fault) => {
                return RunReport {
                    output: OutputBuffer::default(),
                    tool_calls: Vec::new(),
                    result: Err(fault),
                }
            }
        };

        let bridge = Arc::clone(&self.bridge);
        let job = move || run_unit(&namespace, bridge, &script);

        let mut report = if request.main_thread {
            match &self.dispatcher {
                Some(dispatcher) => dispatcher.submit(job).unwrap_or_else(|err| {
                    error!(error = %err, "Main-thread dispatch failed");
                    let code = match err {
                        DispatcherError::Unavailable => errors::DISPATCHER_UNAVAILABLE,
                        DispatcherError::JobPanicked(_) => errors::INTERNAL_ERROR,
                    };
                    RunReport::internal(code, err.to_string())
                }),
                None => {
                    warn!("No main-thread dispatcher configured, running inline");
                    job()
                }
            }
        } else {
            job()
        };

        if !warnings.is_empty() {
            report.output.stderr = format!("{}{}", warnings, report.output.stderr);
        }
        report
    }
}

/// Stack for the compiler thread; pest descends through every precedence
/// level for each nesting level of the source
const COMPILE_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Parse and validate on a thread with a known stack size, whatever thread
/// the request arrived on
fn compile(code: &str) -> Result<(ScriptDef, String), ExecutionFault> {
    thread::scope(|scope| {
        let compiler = thread::Builder::new()
            .name("reprise-compile".to_string())
            .stack_size(COMPILE_STACK_SIZE)
            .spawn_scoped(scope, || compile_unit(code));
        match compiler {
            Ok(handle) => handle.join().unwrap_or_else(|payload| {
                let detail = panic_message(payload.as_ref());
                error!(panic = %detail, "Compiler panicked");
                Err(ExecutionFault::new(
                    FaultKind::Internal,
                    errors::INTERNAL_ERROR,
                    format!("compiler panicked: {}", detail),
                ))
            }),
            Err(err) => Err(ExecutionFault::new(
                FaultKind::Internal,
                errors::INTERNAL_ERROR,
                format!("failed to start compiler thread: {}", err),
            )),
        }
    })
}

/// Parse and validate; warnings come back rendered for stderr
fn compile_unit(code: &str) -> Result<(ScriptDef, String), ExecutionFault> {
    let script = parse_script(code).map_err(|err| {
        let message = match (err.span(), &err) {
            (Some(span), crate::parser::ParseError::BuildError(..)) => format!(
                "{} at line {}, col {}",
                err.message(),
                span.start_line + 1,
                span.start_col + 1
            ),
            _ => err.message().to_string(),
        };
        ExecutionFault::new(FaultKind::Compilation, errors::SYNTAX_ERROR, message)
    })?;

    let mut warnings = String::new();
    for issue in validate_script(&script, code) {
        if issue.is_error() {
            return Err(ExecutionFault::new(
                FaultKind::Compilation,
                issue.code(),
                format!(
                    "{} at line {}, col {}",
                    issue.message,
                    issue.span.start_line + 1,
                    issue.span.start_col + 1
                ),
            ));
        }
        warnings.push_str(&format!(
            "warning: {} at line {}, col {} [{}]\n",
            issue.message,
            issue.span.start_line + 1,
            issue.span.start_col + 1,
            issue.rule_id
        ));
    }
    Ok((script, warnings))
}

/// Execute a compiled unit against a namespace with output captured
fn run_unit(namespace: &SharedNamespace, bridge: Arc<CallBridge>, script: &ScriptDef) -> RunReport {
    let mut namespace = namespace.lock();
    namespace.inject_builtins(Some(bridge));

    let mut vm = VM::new(&mut namespace);
    let result = catch_unwind(AssertUnwindSafe(|| vm.run(script)));
    let (output, tool_calls) = vm.into_parts();

    let result = match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(thrown)) => Err(runtime_fault(thrown)),
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            error!(panic = %detail, "Interpreter panicked");
            Err(ExecutionFault::new(
                FaultKind::Internal,
                errors::INTERNAL_ERROR,
                format!("interpreter panicked: {}", detail),
            ))
        }
    };

    RunReport {
        output,
        tool_calls,
        result,
    }
}

fn runtime_fault(thrown: Thrown) -> ExecutionFault {
    let (code, message) = thrown.code_and_message();
    ExecutionFault::new(FaultKind::Runtime, code, message).with_trace(thrown.trace)
}

fn into_outcome(request: ExecutionRequest, report: RunReport, started: Instant) -> ExecutionOutcome {
    let RunReport {
        output,
        tool_calls,
        result,
    } = report;
    let mut stderr = output.stderr;

    let (success, error, result) = match result {
        Ok(value) => (true, None, value.and_then(|v| v.to_json().ok())),
        Err(fault) => {
            stderr.push_str(&format!("{}\n", fault));
            (false, Some(fault), None)
        }
    };

    ExecutionOutcome {
        stdout: output.stdout,
        stderr,
        success,
        error,
        result,
        tool_calls,
        session_id: request.session_id,
        persistent: request.persistent,
        main_thread: request.main_thread,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

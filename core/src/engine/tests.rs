use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use super::*;
use crate::bridge::InMemoryToolRegistry;

/// Engine over a registry with a few timing-oriented tools
fn engine_with(registry: InMemoryToolRegistry) -> ExecutionEngine {
    let registry = registry
        .with_fn("echo", |args| Ok(args))
        .with_fn("sleep", |args| {
            let ms = args["ms"].as_u64().unwrap_or(1);
            thread::sleep(Duration::from_millis(ms));
            Ok(json!(null))
        });
    ExecutionEngine::new(Arc::new(CallBridge::new(Arc::new(registry))))
}

fn engine() -> ExecutionEngine {
    engine_with(InMemoryToolRegistry::new())
}

fn fault(outcome: &ExecutionOutcome) -> &ExecutionFault {
    outcome
        .error
        .as_ref()
        .unwrap_or_else(|| panic!("Expected a fault, got {:?}", outcome))
}

/* ===================== Sessions ===================== */

#[test]
fn test_session_scenario_bind_read_clear() {
    let engine = engine();

    let first = engine.execute(ExecutionRequest::persistent("x = 1 + 1; print(x)", "s1"));
    assert!(first.success);
    assert_eq!(first.stdout, "2\n");

    let second = engine.execute(ExecutionRequest::persistent("print(x * 10)", "s1"));
    assert!(second.success);
    assert_eq!(second.stdout, "20\n");

    let ack = engine.clear_session("s1");
    assert_eq!(
        ack,
        ClearSessionAck {
            session_id: "s1".to_string(),
            cleared: true,
            bindings_freed: 1,
        }
    );

    let third = engine.execute(ExecutionRequest::persistent("print(x)", "s1"));
    assert!(!third.success);
    assert_eq!(fault(&third).kind, FaultKind::Runtime);
    assert_eq!(fault(&third).code, "NAME_NOT_FOUND");
}

#[test]
fn test_non_persistent_never_leaks() {
    let engine = engine();
    let bind = ExecutionRequest {
        persistent: false,
        ..ExecutionRequest::persistent("y = 5", "s2")
    };
    assert!(engine.execute(bind).success);

    let read = ExecutionRequest {
        persistent: false,
        ..ExecutionRequest::persistent("print(y)", "s2")
    };
    let outcome = engine.execute(read);
    assert_eq!(fault(&outcome).code, "NAME_NOT_FOUND");
    assert!(engine.sessions().is_empty());
}

#[test]
fn test_non_persistent_does_not_see_session_bindings() {
    let engine = engine();
    engine.execute(ExecutionRequest::persistent("z = 1", "s3"));

    let peek = ExecutionRequest {
        persistent: false,
        ..ExecutionRequest::persistent("print(z)", "s3")
    };
    assert_eq!(fault(&engine.execute(peek)).code, "NAME_NOT_FOUND");

    let still_there = engine.execute(ExecutionRequest::persistent("print(z)", "s3"));
    assert_eq!(still_there.stdout, "1\n");
}

#[test]
fn test_clear_unknown_session_is_not_an_error() {
    let ack = engine().clear_session("ghost");
    assert!(!ack.cleared);
    assert_eq!(ack.bindings_freed, 0);
}

#[test]
fn test_sessions_listing() {
    let engine = engine();
    engine.execute(ExecutionRequest::persistent("a = 1\nb = 2", "two"));
    engine.execute(ExecutionRequest::persistent("", "one"));

    let sessions = engine.sessions();
    let summary: Vec<(&str, usize)> = sessions
        .iter()
        .map(|s| (s.session_id.as_str(), s.bindings))
        .collect();
    assert_eq!(summary, vec![("one", 0), ("two", 2)]);
}

#[test]
fn test_clear_waits_for_in_flight_execution() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);
    let release_rx = Mutex::new(release_rx);
    let engine = Arc::new(engine_with(InMemoryToolRegistry::new().with_fn(
        "gate",
        move |_| {
            entered_tx.lock().unwrap().send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
            Ok(json!(null))
        },
    )));

    let running = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            engine.execute(ExecutionRequest::persistent(
                "a = 1\ntools.call('gate')\nb = 2",
                "busy",
            ))
        })
    };
    entered_rx.recv().unwrap();

    let clearing = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.clear_session("busy"))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!clearing.is_finished(), "clear must wait for the running execution");

    release_tx.send(()).unwrap();
    assert!(running.join().unwrap().success);
    let ack = clearing.join().unwrap();
    assert!(ack.cleared);
    assert_eq!(ack.bindings_freed, 2);

    let after = engine.execute(ExecutionRequest::persistent("print(a)", "busy"));
    assert_eq!(fault(&after).code, "NAME_NOT_FOUND");
    assert_eq!(engine.sessions().len(), 1);
}

/* ===================== Concurrency ===================== */

#[test]
fn test_same_session_executions_never_interleave() {
    const N: usize = 16;
    let engine = Arc::new(engine());
    assert!(engine.execute(ExecutionRequest::persistent("let counter = 0", "count")).success);

    // Read, yield inside a tool call, then write back
    let source = "let seen = counter\ntools.call('sleep', { ms: 2 })\ncounter = seen + 1";
    let handles: Vec<_> = (0..N)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.execute(ExecutionRequest::persistent(source, "count")))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().success);
    }

    let outcome = engine.execute(ExecutionRequest::persistent("return counter", "count"));
    assert_eq!(outcome.result, Some(json!(N)));
}

#[test]
fn test_different_sessions_progress_independently() {
    let barrier = Arc::new(Barrier::new(2));
    let gate = Arc::clone(&barrier);
    // Each execution passes only once the other is also inside its session
    let engine = Arc::new(engine_with(InMemoryToolRegistry::new().with_fn(
        "rendezvous",
        move |_| {
            gate.wait();
            Ok(json!(true))
        },
    )));

    let handles: Vec<_> = ["left", "right"]
        .into_iter()
        .map(|session| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.execute(ExecutionRequest::persistent(
                    "return tools.call('rendezvous')",
                    session,
                ))
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().result, Some(json!(true)));
    }
}

/* ===================== Faults ===================== */

#[test]
fn test_unknown_tool_is_runtime_fault_naming_operation() {
    let outcome = engine().execute(ExecutionRequest::ephemeral(
        "print('calling')\ntools.call('weather.lookup', { city: 'Oslo' })",
    ));

    let fault = fault(&outcome);
    assert_eq!(fault.kind, FaultKind::Runtime);
    assert_eq!(fault.code, "UNKNOWN_OPERATION");
    assert!(fault.message.contains("weather.lookup"));
    assert_eq!(outcome.stdout, "calling\n");
    assert!(outcome
        .stderr
        .ends_with("UNKNOWN_OPERATION: unknown operation 'weather.lookup'\n"));
    assert_eq!(outcome.tool_calls.len(), 1);
    assert!(!outcome.tool_calls[0].success);
}

#[test]
fn test_runtime_fault_carries_trace() {
    let outcome = engine().execute(ExecutionRequest::ephemeral(
        "let n = 0\nif (true) {\n  n = 1 / n\n}",
    ));
    let fault = fault(&outcome);
    assert_eq!(fault.code, "DIVISION_BY_ZERO");
    assert_eq!(fault.trace[0].line, 3);
    assert_eq!(fault.trace.last().map(|f| f.statement.as_str()), Some("if"));
}

#[test]
fn test_syntax_error_is_compilation_fault() {
    let outcome = engine().execute(ExecutionRequest::ephemeral("let = 1"));
    let fault = fault(&outcome);
    assert_eq!(fault.kind, FaultKind::Compilation);
    assert_eq!(fault.code, "SYNTAX_ERROR");
    assert!(fault.message.contains("line 1"));
    assert_eq!(outcome.stdout, "");
}

#[test]
fn test_deep_nesting_is_compilation_fault() {
    let engine = engine();
    let depth = 10_000;
    let source = format!("x = {}1{}", "[".repeat(depth), "]".repeat(depth));
    let outcome = engine.execute(ExecutionRequest::persistent(source, "deep"));
    let fault = fault(&outcome);
    assert_eq!(fault.kind, FaultKind::Compilation);
    assert_eq!(fault.code, "SYNTAX_ERROR");
    assert!(fault.message.contains("nests deeper"));

    // The session survives and nesting under the limit still runs
    let depth = 40;
    let source = format!("x = {}1{}\nprint(x.length)", "[".repeat(depth), "]".repeat(depth));
    let outcome = engine.execute(ExecutionRequest::persistent(source, "deep"));
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.stdout, "1\n");
}

#[test]
fn test_validation_error_is_compilation_fault() {
    let engine = engine();
    let outcome = engine.execute(ExecutionRequest::ephemeral("print(1)\nbreak"));
    assert_eq!(fault(&outcome).code, "LOOP_CONTROL");
    // Nothing ran
    assert_eq!(outcome.stdout, "");

    let outcome = engine.execute(ExecutionRequest::ephemeral("tools = 1"));
    assert_eq!(fault(&outcome).code, "RESERVED_NAME");
}

#[test]
fn test_warnings_go_to_stderr_without_failing() {
    let outcome = engine().execute(ExecutionRequest::ephemeral("return 1\nprint(2)"));
    assert!(outcome.success);
    assert_eq!(outcome.result, Some(json!(1)));
    assert!(outcome
        .stderr
        .starts_with("warning: unreachable code after 'return' at line 2, col 1"));
}

#[test]
fn test_empty_code_is_successful_noop() {
    let outcome = engine().execute(ExecutionRequest::persistent("", "quiet"));
    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "");
}

#[test]
fn test_outcome_echoes_request_and_call_log() {
    let outcome = engine().execute(ExecutionRequest::persistent(
        "return tools.call('echo', { ok: true })",
        "log",
    ));
    assert_eq!(outcome.session_id.as_deref(), Some("log"));
    assert!(outcome.persistent);
    assert!(!outcome.main_thread);
    assert_eq!(outcome.result, Some(json!({ "ok": true })));
    assert_eq!(outcome.tool_calls[0].tool, "echo");
}

#[test]
fn test_fault_releases_session_lock() {
    let engine = engine();
    assert!(!engine.execute(ExecutionRequest::persistent("throw 'x'", "s")).success);
    assert!(engine.execute(ExecutionRequest::persistent("v = 1", "s")).success);
}

/* ===================== Main-Thread Dispatch ===================== */

#[test]
fn test_main_thread_runs_on_dispatcher_thread() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let engine = engine_with(InMemoryToolRegistry::new().with_fn("thread.name", move |_| {
        let name = thread::current().name().unwrap_or("").to_string();
        record.lock().unwrap().push(name.clone());
        Ok(json!(name))
    }))
    .with_dispatcher(MainThreadDispatcher::spawn().unwrap());

    let outcome = engine.execute(
        ExecutionRequest::persistent("return tools.call('thread.name')", "gpu").on_main_thread(),
    );
    assert!(outcome.main_thread);
    assert_eq!(outcome.result, Some(json!("reprise-main")));

    // Bindings still persist through the dispatcher
    engine.execute(ExecutionRequest::persistent("handle = 42", "gpu").on_main_thread());
    let read = engine.execute(ExecutionRequest::persistent("print(handle)", "gpu"));
    assert_eq!(read.stdout, "42\n");
}

#[test]
fn test_main_thread_jobs_never_overlap() {
    let windows: Arc<Mutex<Vec<(Instant, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&windows);
    let engine = Arc::new(
        engine_with(InMemoryToolRegistry::new().with_fn("window", move |_| {
            let start = Instant::now();
            thread::sleep(Duration::from_millis(20));
            record.lock().unwrap().push((start, Instant::now()));
            Ok(json!(null))
        }))
        .with_dispatcher(MainThreadDispatcher::spawn().unwrap()),
    );

    // Different sessions: only the dispatcher serializes them
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.execute(
                    ExecutionRequest::persistent("tools.call('window')", format!("s{}", i))
                        .on_main_thread(),
                )
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().success);
    }

    let mut windows = windows.lock().unwrap().clone();
    windows.sort();
    assert_eq!(windows.len(), 4);
    for pair in windows.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "main-thread jobs overlapped");
    }
}

#[test]
fn test_main_thread_without_dispatcher_runs_inline() {
    let outcome = engine().execute(ExecutionRequest::ephemeral("print('inline')").on_main_thread());
    assert!(outcome.success);
    assert_eq!(outcome.stdout, "inline\n");
}

#[test]
fn test_stopped_dispatcher_is_internal_fault() {
    let (dispatcher, handle) = MainThreadDispatcher::new();
    drop(dispatcher);
    let engine = engine().with_dispatcher(handle);

    let outcome = engine.execute(ExecutionRequest::ephemeral("print(1)").on_main_thread());
    let fault = fault(&outcome);
    assert_eq!(fault.kind, FaultKind::Internal);
    assert_eq!(fault.code, "DISPATCHER_UNAVAILABLE");
}

#[test]
fn test_dispatcher_is_fifo() {
    let (dispatcher, handle) = MainThreadDispatcher::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    // Queue every job before the loop starts so arrival order is fixed
    let mut waiters = Vec::new();
    for i in 0..5 {
        let submitter = handle.clone();
        let order = Arc::clone(&order);
        waiters.push(thread::spawn(move || {
            submitter.submit(move || order.lock().unwrap().push(i))
        }));
        while handle.status().queued < i + 1 {
            thread::sleep(Duration::from_millis(1));
        }
    }
    assert_eq!(handle.status().state, DispatcherState::Idle);

    let runner = thread::spawn(move || dispatcher.run());
    for waiter in waiters {
        assert!(waiter.join().unwrap().is_ok());
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(handle.status().queued, 0);

    drop(handle);
    runner.join().unwrap();
}

#[test]
fn test_dispatcher_survives_panicking_job() {
    let handle = MainThreadDispatcher::spawn().unwrap();
    let err = handle.submit(|| panic!("native resource exploded")).unwrap_err();
    assert_eq!(
        err,
        DispatcherError::JobPanicked("native resource exploded".to_string())
    );
    assert_eq!(handle.submit(|| 5).unwrap(), 5);
}

#[test]
fn test_submit_from_dispatcher_thread_runs_inline() {
    let handle = MainThreadDispatcher::spawn().unwrap();
    let inner = handle.clone();
    let nested = handle
        .submit(move || {
            assert!(inner.is_dispatcher_thread());
            inner.submit(|| "nested").unwrap()
        })
        .unwrap();
    assert_eq!(nested, "nested");
    assert!(!handle.is_dispatcher_thread());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submit_async() {
    let handle = MainThreadDispatcher::spawn().unwrap();
    let name = handle
        .submit_async(|| thread::current().name().map(str::to_string))
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("reprise-main"));
}

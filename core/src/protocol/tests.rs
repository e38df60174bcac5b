use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

use super::*;
use crate::bridge::{CallBridge, InMemoryToolRegistry};
use crate::engine::ExecutionEngine;
use crate::scripts::ScriptStore;
use crate::services::{ScriptService, SessionService};

fn handler() -> (TempDir, ProtocolHandler) {
    let dir = TempDir::new().unwrap();
    let registry = InMemoryToolRegistry::new().with_fn("echo", |args| Ok(args));
    let engine = ExecutionEngine::new(Arc::new(CallBridge::new(Arc::new(registry))));
    let handler = ProtocolHandler::new(
        SessionService::new(Arc::new(engine)),
        ScriptService::new(Arc::new(ScriptStore::new(dir.path()))),
        ProtocolDefaults::default(),
    );
    (dir, handler)
}

fn error_code(response: &Response) -> &str {
    assert!(!response.ok, "expected failure, got {:?}", response);
    &response.error.as_ref().unwrap().code
}

fn result(response: Response) -> JsonValue {
    assert!(response.ok, "expected success, got {:?}", response);
    response.result.unwrap()
}

/* ===================== Validation ===================== */

#[test]
fn test_parse_applies_defaults() {
    let request = Request::parse(
        json!({ "id": 7, "operation": "execute", "code": "print(1)" }),
        &ProtocolDefaults::default(),
    )
    .unwrap();

    assert_eq!(request.id, Some(json!(7)));
    assert_eq!(
        request.operation,
        Operation::Execute {
            code: "print(1)".to_string(),
            params: ExecutionParams {
                session_id: Some("default".to_string()),
                persistent: true,
                main_thread: false,
            },
        }
    );
}

#[test]
fn test_parse_explicit_params_and_null_session() {
    let request = Request::parse(
        json!({
            "operation": "run_script",
            "filename": "job",
            "session_id": null,
            "persistent": false,
            "run_on_main_thread": true,
        }),
        &ProtocolDefaults::default(),
    )
    .unwrap();

    let Operation::RunScript { filename, params } = request.operation else {
        panic!("expected run_script");
    };
    assert_eq!(filename, "job");
    assert_eq!(params.session_id, None);
    assert!(!params.persistent);
    assert!(params.main_thread);
}

#[test]
fn test_parse_rejections() {
    let defaults = ProtocolDefaults::default();
    let cases = [
        (json!([1, 2]), "request must be a JSON object"),
        (json!({ "code": "x" }), "missing required field 'operation'"),
        (json!({ "operation": "explode" }), "unknown operation 'explode'"),
        (
            json!({ "operation": "execute", "code": "x", "timeout": 5, "bogus": 1 }),
            "unexpected parameter(s) for 'execute': bogus, timeout",
        ),
        (
            json!({ "operation": "execute" }),
            "missing required parameter 'code' for 'execute'",
        ),
        (
            json!({ "operation": "execute", "code": "x", "persistent": "yes" }),
            "parameter 'persistent' must be a boolean",
        ),
        (
            json!({ "operation": "clear_session", "session_id": null }),
            "parameter 'session_id' must be a string",
        ),
    ];

    for (value, expected) in cases {
        let (_, err) = Request::parse(value, &defaults).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn test_rejection_keeps_request_id() {
    let (id, _) = Request::parse(
        json!({ "id": "abc", "operation": "nope" }),
        &ProtocolDefaults::default(),
    )
    .unwrap_err();
    assert_eq!(id, Some(json!("abc")));
}

/* ===================== Dispatch ===================== */

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_uses_default_session() {
    let (_dir, handler) = handler();

    handler
        .handle_value(json!({ "operation": "execute", "code": "n = 3" }))
        .await;
    let outcome = result(
        handler
            .handle_value(json!({ "id": 1, "operation": "execute", "code": "print(n * 2)" }))
            .await,
    );
    assert_eq!(outcome["stdout"], "6\n");
    assert_eq!(outcome["session_id"], "default");
    assert_eq!(outcome["success"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_execution_is_still_ok_response() {
    let (_dir, handler) = handler();
    let response = handler
        .handle_value(json!({ "operation": "execute", "code": "tools.call('nope')" }))
        .await;

    let outcome = result(response);
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["error"]["kind"], "runtime");
    assert_eq!(outcome["error"]["code"], "UNKNOWN_OPERATION");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_operations() {
    let (_dir, handler) = handler();
    handler
        .handle_value(json!({ "operation": "execute", "code": "a = 1", "session_id": "s" }))
        .await;

    let sessions = result(handler.handle_value(json!({ "operation": "list_sessions" })).await);
    assert_eq!(sessions[0]["session_id"], "s");
    assert_eq!(sessions[0]["bindings"], 1);

    let ack = result(
        handler
            .handle_value(json!({ "operation": "clear_session", "session_id": "s" }))
            .await,
    );
    assert_eq!(ack, json!({ "session_id": "s", "cleared": true, "bindings_freed": 1 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_script_operations_and_run_script() {
    let (_dir, handler) = handler();

    let saved = result(
        handler
            .handle_value(json!({
                "operation": "save_script",
                "filename": "hello",
                "code": "print('hello from disk')",
            }))
            .await,
    );
    assert_eq!(saved["filename"], "hello");

    let listed = result(handler.handle_value(json!({ "operation": "list_scripts" })).await);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let outcome = result(
        handler
            .handle_value(json!({ "operation": "run_script", "filename": "hello" }))
            .await,
    );
    assert_eq!(outcome["stdout"], "hello from disk\n");

    let deleted = result(
        handler
            .handle_value(json!({ "operation": "delete_script", "filename": "hello" }))
            .await,
    );
    assert_eq!(deleted["deleted"], true);

    let missing = handler
        .handle_value(json!({ "operation": "load_script", "filename": "hello" }))
        .await;
    assert_eq!(error_code(&missing), "script_not_found");

    let bad = handler
        .handle_value(json!({ "operation": "load_script", "filename": "../etc" }))
        .await;
    assert_eq!(error_code(&bad), "invalid_filename");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_describe_lists_catalog() {
    let (_dir, handler) = handler();
    let described = result(handler.handle_value(json!({ "operation": "describe" })).await);

    let names: Vec<&str> = described["operations"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|op| op["name"].as_str())
        .collect();
    assert_eq!(names.len(), OPERATIONS.len());
    assert!(names.contains(&"execute"));
    assert_eq!(described["operations"][0]["params"][0]["type"], "string");
    assert_eq!(described["defaults"]["session_id"], "default");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_json_line() {
    let (_dir, handler) = handler();
    let response = handler.handle_line("{not json").await;
    assert_eq!(error_code(&response), "invalid_request");
    assert_eq!(response.id, JsonValue::Null);
}

/* ===================== Transport ===================== */

#[tokio::test(flavor = "multi_thread")]
async fn test_serve_answers_every_line() {
    let (_dir, handler) = handler();
    let input = concat!(
        r#"{"id": 1, "operation": "execute", "code": "print('one')", "session_id": null}"#,
        "\n\n",
        r#"{"id": 2, "operation": "describe"}"#,
        "\n",
        "garbage\n",
    );

    let mut output = Vec::new();
    serve(Arc::new(handler), input.as_bytes(), &mut output)
        .await
        .unwrap();

    let text = String::from_utf8(output).unwrap();
    let mut responses: Vec<Response> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);

    responses.sort_by_key(|r| r.id.as_i64().unwrap_or(0));
    assert_eq!(error_code(&responses[0]), "invalid_request");
    assert_eq!(responses[1].id, json!(1));
    assert_eq!(
        responses[1].result.as_ref().unwrap()["stdout"],
        "one\n"
    );
    assert!(responses[2].ok);
}

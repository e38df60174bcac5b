//! Tests for the `tools` bridge object

use super::helpers::{compile, run};
use crate::executor::errors;
use crate::executor::{Val, VM};
use crate::session::Namespace;

#[test]
fn test_tools_call_returns_result() {
    let result = run(r#"let r = tools.call("math.add", { a: 2, b: 3 })
return r.sum"#);
    assert_eq!(result.value(), Val::Num(5.0));
}

#[test]
fn test_tools_call_defaults_args_to_empty_object() {
    let result = run(r#"return tools.call("echo")"#);
    assert_eq!(result.value(), Val::Obj(Default::default()));
}

#[test]
fn test_tools_call_unknown_operation() {
    let result = run(r#"tools.call("no.such.tool", {})"#);
    assert_eq!(result.error_code(), errors::UNKNOWN_OPERATION);
    assert!(result.thrown().code_and_message().1.contains("no.such.tool"));
}

#[test]
fn test_tool_failure_is_catchable() {
    let source = r#"
try {
    tools.call("always.fails", {})
} catch (e) {
    print(e.code)
    print(e.message)
}
"#;
    let result = run(source);
    assert_eq!(
        result.stdout(),
        "TOOL_INVOCATION_FAILED\ntool 'always.fails' failed: backend unavailable\n"
    );
}

#[test]
fn test_tool_calls_are_logged_in_order() {
    let source = r#"
tools.call("echo", { n: 1 })
try { tools.call("always.fails") } catch (e) { }
tools.call("echo", [1, 2])
"#;
    let result = run(source);
    let summary: Vec<(&str, bool)> = result
        .tool_calls
        .iter()
        .map(|c| (c.tool.as_str(), c.success))
        .collect();
    assert_eq!(
        summary,
        vec![("echo", true), ("always.fails", false), ("echo", true)]
    );
    assert!(result.tool_calls[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("backend unavailable")));
}

#[test]
fn test_tools_list_is_sorted() {
    let result = run("print(tools.list())");
    assert_eq!(
        result.stdout(),
        "[\"always.fails\", \"echo\", \"math.add\"]\n"
    );
}

#[test]
fn test_tools_call_rejects_scalar_args() {
    let result = run(r#"tools.call("echo", 5)"#);
    assert_eq!(result.error_code(), errors::WRONG_ARG_TYPE);
}

#[test]
fn test_tools_call_without_bridge() {
    let script = compile(r#"tools.call("echo")"#);
    let mut namespace = Namespace::new();
    namespace.inject_builtins(None);
    let mut vm = VM::new(&mut namespace);
    let thrown = vm.run(&script).expect_err("Should throw");
    assert_eq!(thrown.code_and_message().0, errors::BRIDGE_UNAVAILABLE);
}

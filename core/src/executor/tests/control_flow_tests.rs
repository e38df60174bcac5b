//! If / loops / try-catch / return

use super::helpers::run;
use crate::executor::Val;

/* ===================== If ===================== */

#[test]
fn test_if_else_chain() {
    let source = r#"
let n = 15
if (n < 10) { print("small") } else if (n < 20) { print("medium") } else { print("large") }
"#;
    assert_eq!(run(source).stdout(), "medium\n");
}

#[test]
fn test_truthiness() {
    let source = r#"
for (let v of [0, 1, "", "x", null, [], {}, false]) {
    print(v ? "T" : "F")
}
"#;
    assert_eq!(run(source).stdout(), "F\nT\nF\nT\nF\nT\nT\nF\n");
}

/* ===================== Loops ===================== */

#[test]
fn test_while_with_break_and_continue() {
    let source = r#"
let i = 0
let seen = []
while (true) {
    i += 1
    if (i % 2 == 0) { continue }
    if (i > 7) { break }
    seen = append(seen, i)
}
return seen
"#;
    assert_eq!(
        run(source).value(),
        Val::List(vec![
            Val::Num(1.0),
            Val::Num(3.0),
            Val::Num(5.0),
            Val::Num(7.0)
        ])
    );
}

#[test]
fn test_for_of_list_and_string() {
    assert_eq!(run("for (let x of [1, 2]) print(x)").stdout(), "1\n2\n");
    assert_eq!(run("for (let c of 'ab') print(c)").stdout(), "a\nb\n");
}

#[test]
fn test_for_in_object_keys_sorted() {
    let source = "for (let k in { b: 1, a: 2 }) { print(k) }";
    assert_eq!(run(source).stdout(), "a\nb\n");
}

#[test]
fn test_for_in_list_indices() {
    assert_eq!(run("for (let i in ['x', 'y']) print(i)").stdout(), "0\n1\n");
}

#[test]
fn test_loop_binding_is_scoped() {
    let result = run("for (let item of [1]) { }\nreturn item");
    assert_eq!(result.error_code(), "NAME_NOT_FOUND");
}

#[test]
fn test_return_inside_loop_ends_unit() {
    let source = r#"
for (let x of range(10)) {
    if (x == 3) { return x * 100 }
}
print("not reached")
"#;
    let result = run(source);
    assert_eq!(result.value(), Val::Num(300.0));
    assert_eq!(result.stdout(), "");
}

/* ===================== Try / Catch ===================== */

#[test]
fn test_catch_runtime_error() {
    let source = r#"
try {
    let x = 1 / 0
} catch (e) {
    print(e.code, "-", e.message)
}
"#;
    assert_eq!(run(source).stdout(), "DIVISION_BY_ZERO - Division by zero\n");
}

#[test]
fn test_catch_thrown_value() {
    let source = r#"
try { throw { reason: "nope" } } catch (e) { return e.reason }
"#;
    assert_eq!(run(source).value(), Val::Str("nope".to_string()));
}

#[test]
fn test_rethrow_from_catch() {
    let source = r#"
try { throw error("first") } catch (e) { throw error("second: " + e.message, "WRAPPED") }
"#;
    let result = run(source);
    assert_eq!(result.error_code(), "WRAPPED");
    assert_eq!(result.thrown().code_and_message().1, "second: first");
}

#[test]
fn test_output_before_throw_is_kept() {
    let result = run("print('before')\nthrow error('boom')\n");
    assert_eq!(result.stdout(), "before\n");
    assert_eq!(result.error_code(), "USER_ERROR");
}

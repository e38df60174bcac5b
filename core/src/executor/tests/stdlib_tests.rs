//! Tests for standard library functions

use super::helpers::run;
use crate::executor::errors;
use crate::executor::Val;

fn num(source: &str) -> f64 {
    match run(source).value() {
        Val::Num(n) => n,
        other => panic!("Expected number, got {:?}", other),
    }
}

fn string(source: &str) -> String {
    match run(source).value() {
        Val::Str(s) => s,
        other => panic!("Expected string, got {:?}", other),
    }
}

/* ===================== Math ===================== */

#[test]
fn test_math_rounding() {
    assert_eq!(num("return Math.floor(3.7)"), 3.0);
    assert_eq!(num("return Math.floor(-3.2)"), -4.0);
    assert_eq!(num("return Math.ceil(3.2)"), 4.0);
    assert_eq!(num("return Math.round(2.5)"), 3.0);
    assert_eq!(num("return Math.abs(-7)"), 7.0);
}

#[test]
fn test_math_min_max() {
    assert_eq!(num("return Math.max(1, 9, 4)"), 9.0);
    assert_eq!(num("return Math.min([5, 2, 8])"), 2.0);
    assert_eq!(run("return Math.max()").error_code(), errors::WRONG_ARG_COUNT);
}

#[test]
fn test_math_sqrt() {
    assert_eq!(num("return Math.sqrt(16)"), 4.0);
    assert_eq!(run("return Math.sqrt(-1)").error_code(), errors::TYPE_ERROR);
}

#[test]
fn test_math_wrong_arg_type() {
    let result = run(r#"return Math.floor("3")"#);
    assert_eq!(result.error_code(), errors::WRONG_ARG_TYPE);
}

/* ===================== Collections ===================== */

#[test]
fn test_len() {
    assert_eq!(num("return len([1, 2, 3])"), 3.0);
    assert_eq!(num("return len('abc')"), 3.0);
    assert_eq!(num("return len({ a: 1 })"), 1.0);
    assert_eq!(run("return len(1)").error_code(), errors::WRONG_ARG_TYPE);
    assert_eq!(run("return len()").error_code(), errors::WRONG_ARG_COUNT);
}

#[test]
fn test_keys_and_values() {
    let result = run("let o = { b: 2, a: 1 }\nprint(keys(o), values(o))");
    assert_eq!(result.stdout(), "[\"a\", \"b\"] [1, 2]\n");
}

#[test]
fn test_range() {
    assert_eq!(run("print(range(3))").stdout(), "[0, 1, 2]\n");
    assert_eq!(run("print(range(2, 4))").stdout(), "[2, 3]\n");
    assert_eq!(run("print(range(0))").stdout(), "[]\n");
}

#[test]
fn test_huge_range_is_catchable() {
    assert_eq!(run("return range(1e12)").error_code(), errors::WRONG_ARG_TYPE);
    let result = run("try { range(-5, 1e12) } catch (e) { print(e.code) }");
    assert_eq!(result.stdout(), "WRONG_ARG_TYPE\n");
}

#[test]
fn test_append_returns_new_list() {
    let result = run("let a = [1]\nlet b = append(a, 2)\nprint(a, b)");
    assert_eq!(result.stdout(), "[1] [1, 2]\n");
}

/* ===================== Conversion ===================== */

#[test]
fn test_str_num_type() {
    assert_eq!(string("return str(2)"), "2");
    assert_eq!(string("return str([1, 'a'])"), "[1, \"a\"]");
    assert_eq!(num("return num(' 2.5 ')"), 2.5);
    assert_eq!(run("return num('abc')").error_code(), errors::WRONG_ARG_TYPE);
    assert_eq!(string("return type({})"), "object");
    assert_eq!(string("return type(print)"), "function");
}

#[test]
fn test_error_builtin() {
    let result = run("let e = error('bad input', 'VALIDATION')\nreturn [e.code, e.message, type(e)]");
    assert_eq!(
        result.value(),
        Val::List(vec![
            Val::Str("VALIDATION".to_string()),
            Val::Str("bad input".to_string()),
            Val::Str("error".to_string()),
        ])
    );
}

/* ===================== JSON ===================== */

#[test]
fn test_json_stringify() {
    assert_eq!(
        string(r#"return JSON.stringify({ b: [1, 2.5], a: null })"#),
        r#"{"a":null,"b":[1,2.5]}"#
    );
    assert_eq!(
        run("return JSON.stringify(print)").error_code(),
        errors::WRONG_ARG_TYPE
    );
}

#[test]
fn test_json_parse() {
    let result = run(r#"let v = JSON.parse('{"n": 3, "tags": ["x"]}')
return v.n + len(v.tags)"#);
    assert_eq!(result.value(), Val::Num(4.0));
    assert_eq!(run("return JSON.parse('{')").error_code(), errors::INVALID_JSON);
}

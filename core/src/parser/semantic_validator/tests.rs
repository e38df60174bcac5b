//! Tests for the semantic validation system

use super::*;
use crate::parser::parse_script;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse source and validate, returning errors
fn validate(source: &str) -> Vec<ValidationError> {
    let script = parse_script(source).expect("Parse should succeed");
    validate_script(&script, source)
}

/// Get errors for a specific rule
fn for_rule<'a>(errors: &'a [ValidationError], rule_id: &str) -> Vec<&'a ValidationError> {
    errors.iter().filter(|e| e.rule_id == rule_id).collect()
}

// ============================================================================
// Loop Control Tests
// ============================================================================

#[test]
fn test_break_outside_loop() {
    let errors = validate("let x = 1\nbreak");
    let loop_errors = for_rule(&errors, "loop-control");
    assert_eq!(loop_errors.len(), 1);
    assert!(loop_errors[0].is_error());
    assert_eq!(loop_errors[0].code(), "LOOP_CONTROL");
    assert_eq!(loop_errors[0].span.start_line, 1);
}

#[test]
fn test_continue_in_if_outside_loop() {
    let errors = validate("if (true) { continue }");
    assert_eq!(for_rule(&errors, "loop-control").len(), 1);
}

#[test]
fn test_break_inside_loops_ok() {
    let source = r#"
while (true) { break }
for (let x of [1, 2]) {
    if (x == 1) { continue }
    try { break } catch (e) { }
}
"#;
    let errors = validate(source);
    assert!(for_rule(&errors, "loop-control").is_empty());
}

// ============================================================================
// Reserved Name Tests
// ============================================================================

#[test]
fn test_reserved_name_declaration() {
    let errors = validate("let tools = 1");
    let reserved = for_rule(&errors, "reserved-name");
    assert_eq!(reserved.len(), 1);
    assert!(reserved[0].message.contains("'tools'"));
    assert_eq!(reserved[0].code(), "RESERVED_NAME");
}

#[test]
fn test_reserved_name_assignment_and_bindings() {
    let source = r#"
print = 3
for (let len of []) { }
try { } catch (Math) { }
"#;
    let errors = validate(source);
    assert_eq!(for_rule(&errors, "reserved-name").len(), 3);
}

#[test]
fn test_reserved_name_reads_ok() {
    let errors = validate("let n = len([1, 2])\nprint(n)");
    assert!(for_rule(&errors, "reserved-name").is_empty());
}

// ============================================================================
// Unreachable Code Tests
// ============================================================================

#[test]
fn test_unreachable_after_return_is_warning() {
    let errors = validate("return 1\nprint(2)\nprint(3)");
    let unreachable = for_rule(&errors, "unreachable-code");
    assert_eq!(unreachable.len(), 1, "only the first unreachable statement");
    assert!(!unreachable[0].is_error());
    assert!(unreachable[0].message.contains("return"));
}

#[test]
fn test_reachable_after_conditional_return() {
    let errors = validate("if (a) { return 1 }\nprint(2)");
    assert!(for_rule(&errors, "unreachable-code").is_empty());
}

#[test]
fn test_unreachable_after_if_else_both_throw() {
    let errors = validate("if (a) { throw 1 } else { throw 2 }\nprint(3)");
    assert_eq!(for_rule(&errors, "unreachable-code").len(), 1);
}

// ============================================================================
// Validator
// ============================================================================

#[test]
fn test_validator_lists_rules() {
    let validator = Validator::new();
    let ids: Vec<&str> = validator.rules().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["loop-control", "reserved-name", "unreachable-code"]);
}

#[test]
fn test_display_format() {
    let errors = validate("break");
    assert_eq!(
        errors[0].to_string(),
        "error at line 1, col 1: 'break' outside of a loop [loop-control]"
    );
}

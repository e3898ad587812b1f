//! Parser integration tests.
//!
//! Verifies that the parser builds the expected AST shapes from source and
//! reports structural errors with the right severity.

use rispl_ast::expr::{BinaryOp, Expr, ListItem, QuoteForm, UnaryOp};
use rispl_diagnostics::CodeProperties;
use rispl_parser::{parse_one, parse_program};

/// Helper: parse source and return the top-level expressions, asserting no
/// errors were reported.
fn parse_ok(source: &str) -> Vec<Expr> {
    let out = parse_program(source);
    assert!(
        !out.diagnostics.has_errors(),
        "unexpected errors for {:?}: {:?}",
        source,
        out.diagnostics.diagnostics()
    );
    out.exprs
}

/// Helper: parse source and return the single top-level expression.
fn parse_expr(source: &str) -> Expr {
    let mut exprs = parse_ok(source);
    assert_eq!(exprs.len(), 1, "source: {}", source);
    exprs.pop().expect("one expression")
}

/// Helper: assert that parsing reports at least one error.
fn parse_fails(source: &str) {
    let out = parse_program(source);
    assert!(out.diagnostics.has_errors(), "expected errors for {:?}", source);
}

// ============================================================================
// Atoms
// ============================================================================

#[test]
fn test_parse_integer_literal() {
    match parse_expr("42") {
        Expr::Literal { value, .. } => assert_eq!(value, rispl_ast::Literal::Int(42)),
        other => panic!("expected literal, got {:?}", other),
    }
}

#[test]
fn test_parse_string_literal() {
    match parse_expr("\"hi\"") {
        Expr::Literal { value, .. } => assert_eq!(value, rispl_ast::Literal::Str("hi".into())),
        other => panic!("expected literal, got {:?}", other),
    }
}

#[test]
fn test_parse_identifier() {
    match parse_expr("foo") {
        Expr::Identifier(id) => assert_eq!(id.name, "foo"),
        other => panic!("expected identifier, got {:?}", other),
    }
}

#[test]
fn test_parse_nil_true_false_are_identifiers() {
    for source in ["nil", "true", "false"] {
        assert!(matches!(parse_expr(source), Expr::Identifier(_)), "source: {}", source);
    }
}

#[test]
fn test_parse_bare_keyword_is_error() {
    parse_fails("defun");
}

// ============================================================================
// Operator forms
// ============================================================================

#[test]
fn test_parse_binary_forms() {
    for (source, op) in [
        ("(+ 1 2)", BinaryOp::Add),
        ("(- 1 2)", BinaryOp::Subtract),
        ("(* 1 2)", BinaryOp::Multiply),
        ("(/ 1 2)", BinaryOp::Divide),
        ("(= 1 2)", BinaryOp::Equal),
        ("(!= 1 2)", BinaryOp::NotEqual),
        ("(> 1 2)", BinaryOp::GreaterThan),
        ("(< 1 2)", BinaryOp::LessThan),
        ("(and 1 2)", BinaryOp::And),
        ("(or 1 2)", BinaryOp::Or),
    ] {
        match parse_expr(source) {
            Expr::Binary { op: parsed, .. } => assert_eq!(parsed, op, "source: {}", source),
            other => panic!("expected binary for {}, got {:?}", source, other),
        }
    }
}

#[test]
fn test_parse_not() {
    match parse_expr("(not x)") {
        Expr::Unary { op, .. } => assert_eq!(op, UnaryOp::Not),
        other => panic!("expected unary, got {:?}", other),
    }
}

#[test]
fn test_parse_nested_arithmetic() {
    match parse_expr("(/ (* (+ 1 2) 3) 4)") {
        Expr::Binary { op: BinaryOp::Divide, left, .. } => {
            assert!(matches!(*left, Expr::Binary { op: BinaryOp::Multiply, .. }));
        }
        other => panic!("expected division, got {:?}", other),
    }
}

// ============================================================================
// Definition forms
// ============================================================================

#[test]
fn test_parse_defun() {
    match parse_expr("(defun add2 (x y) (+ x y))") {
        Expr::Defun { name, params, body, .. } => {
            assert_eq!(name.name, "add2");
            assert_eq!(params.len(), 2);
            assert_eq!(params[0].name, "x");
            assert_eq!(body.len(), 1);
        }
        other => panic!("expected defun, got {:?}", other),
    }
}

#[test]
fn test_parse_lambda() {
    match parse_expr("(lambda (x) x)") {
        Expr::Lambda { params, body, .. } => {
            assert_eq!(params.len(), 1);
            assert_eq!(body.len(), 1);
        }
        other => panic!("expected lambda, got {:?}", other),
    }
}

#[test]
fn test_parse_defun_rejects_keyword_params() {
    parse_fails("(defun f (set) set)");
}

#[test]
fn test_parse_let_star() {
    match parse_expr("(let* ((x 1) (y (+ x 1))) y)") {
        Expr::LetStar { bindings, body, .. } => {
            assert_eq!(bindings.len(), 2);
            assert_eq!(bindings[0].name.name, "x");
            assert_eq!(bindings[1].name.name, "y");
            assert_eq!(body.len(), 1);
        }
        other => panic!("expected let*, got {:?}", other),
    }
}

#[test]
fn test_parse_let_star_empty_bindings() {
    match parse_expr("(let* () 5)") {
        Expr::LetStar { bindings, .. } => assert!(bindings.is_empty()),
        other => panic!("expected let*, got {:?}", other),
    }
}

#[test]
fn test_parse_let_star_malformed_binding() {
    parse_fails("(let* ((5 1)) x)");
    parse_fails("(let* ((x)) x)");
}

// ============================================================================
// Control forms
// ============================================================================

#[test]
fn test_parse_if_with_alternative() {
    match parse_expr("(if (> 3 2) \"yes\" \"no\")") {
        Expr::If { alternative, .. } => assert!(alternative.is_some()),
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_parse_if_without_alternative() {
    match parse_expr("(if x 1)") {
        Expr::If { alternative, .. } => assert!(alternative.is_none()),
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_parse_if_wrong_arity() {
    parse_fails("(if x)");
    parse_fails("(if a b c d)");
}

#[test]
fn test_parse_loop_and_break() {
    match parse_expr("(loop (break 1))") {
        Expr::Loop { body, .. } => {
            assert_eq!(body.len(), 1);
            assert!(matches!(body[0], Expr::Break { value: Some(_), .. }));
        }
        other => panic!("expected loop, got {:?}", other),
    }
}

#[test]
fn test_parse_break_without_value() {
    match parse_expr("(loop (break))") {
        Expr::Loop { body, .. } => {
            assert!(matches!(body[0], Expr::Break { value: None, .. }));
        }
        other => panic!("expected loop, got {:?}", other),
    }
}

#[test]
fn test_parse_block() {
    match parse_expr("(block 1 2 3)") {
        Expr::Block { body, .. } => assert_eq!(body.len(), 3),
        other => panic!("expected block, got {:?}", other),
    }
}

// ============================================================================
// Data forms
// ============================================================================

#[test]
fn test_parse_eq_cons_list_elt() {
    assert!(matches!(parse_expr("(eq a b)"), Expr::Eq { .. }));
    assert!(matches!(parse_expr("(cons 1 2)"), Expr::Cons { .. }));
    match parse_expr("(list 1 2 3)") {
        Expr::ListCall { elements, .. } => assert_eq!(elements.len(), 3),
        other => panic!("expected list call, got {:?}", other),
    }
    match parse_expr("(elt l 0)") {
        Expr::Elt { indexes, .. } => assert_eq!(indexes.len(), 1),
        other => panic!("expected elt, got {:?}", other),
    }
}

#[test]
fn test_parse_quote_list() {
    match parse_expr("'(1 2 3)") {
        Expr::Quote { form: QuoteForm::List(items, _), .. } => assert_eq!(items.len(), 3),
        other => panic!("expected quote, got {:?}", other),
    }
}

#[test]
fn test_parse_quote_nested_list() {
    match parse_expr("'(a (b c))") {
        Expr::Quote { form: QuoteForm::List(items, _), .. } => {
            assert_eq!(items.len(), 2);
            assert!(matches!(&items[1], ListItem::List(inner, _) if inner.len() == 2));
        }
        other => panic!("expected quote, got {:?}", other),
    }
}

#[test]
fn test_parse_quote_identifier() {
    match parse_expr("'foo") {
        Expr::Quote { form: QuoteForm::Id(id), .. } => assert_eq!(id.name, "foo"),
        other => panic!("expected quote, got {:?}", other),
    }
}

#[test]
fn test_parse_quote_literal() {
    assert!(matches!(
        parse_expr("'42"),
        Expr::Quote { form: QuoteForm::Literal(rispl_ast::Literal::Int(42), _), .. }
    ));
}

#[test]
fn test_parse_quote_rejects_dotted_list() {
    parse_fails("'(a . b)");
}

// ============================================================================
// Calls and dotted expressions
// ============================================================================

#[test]
fn test_parse_function_call() {
    match parse_expr("(f 1 2)") {
        Expr::Call { function, args, .. } => {
            assert!(function.is_identifier());
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_call_of_expression() {
    match parse_expr("((lambda (x) x) 5)") {
        Expr::Call { function, .. } => assert!(matches!(*function, Expr::Lambda { .. })),
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_dotted_member_access() {
    match parse_expr("obj.field") {
        Expr::Dot { segments, .. } => {
            assert_eq!(segments.len(), 1);
            assert!(segments[0].is_identifier());
        }
        other => panic!("expected dot, got {:?}", other),
    }
}

#[test]
fn test_parse_dotted_chain() {
    match parse_expr("a.b.c") {
        Expr::Dot { segments, .. } => assert_eq!(segments.len(), 2),
        other => panic!("expected dot, got {:?}", other),
    }
}

#[test]
fn test_parse_keyword_member_name() {
    // Keywords are valid member names after a dot.
    match parse_expr("obj.list") {
        Expr::Dot { segments, .. } => assert_eq!(segments.len(), 1),
        other => panic!("expected dot, got {:?}", other),
    }
}

#[test]
fn test_parse_member_invocation() {
    match parse_expr("(obj.meth 1 2)") {
        Expr::Call { function, args, .. } => {
            assert!(matches!(*function, Expr::Dot { .. }));
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_dotted_invoke_segment() {
    match parse_expr("a.(b 3).c") {
        Expr::Dot { segments, .. } => {
            assert_eq!(segments.len(), 2);
            assert!(matches!(&segments[0], Expr::Call { .. }));
            assert!(segments[1].is_identifier());
        }
        other => panic!("expected dot, got {:?}", other),
    }
}

#[test]
fn test_parse_new() {
    match parse_expr("(new point 1 2)") {
        Expr::New { args, .. } => assert_eq!(args.len(), 2),
        other => panic!("expected new, got {:?}", other),
    }
}

#[test]
fn test_parse_set_forms() {
    assert!(matches!(parse_expr("(set x 5)"), Expr::Set { .. }));
    match parse_expr("(set (elt l 1) 100)") {
        Expr::Set { target, .. } => assert!(matches!(*target, Expr::Elt { .. })),
        other => panic!("expected set, got {:?}", other),
    }
    match parse_expr("(set o.f 5)") {
        Expr::Set { target, .. } => assert!(matches!(*target, Expr::Dot { .. })),
        other => panic!("expected set, got {:?}", other),
    }
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_parse_import_simple() {
    match parse_expr("(import sys)") {
        Expr::Import { namespaces, members, renames, .. } => {
            assert_eq!(namespaces.len(), 1);
            assert!(members.is_empty());
            assert!(renames.is_empty());
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_dotted() {
    match parse_expr("(import sys.math)") {
        Expr::Import { namespaces, .. } => {
            assert_eq!(namespaces.len(), 2);
            assert_eq!(namespaces[0].name, "sys");
            assert_eq!(namespaces[1].name, "math");
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_members_and_renames() {
    match parse_expr("(import sys (a b) (x y))") {
        Expr::Import { members, renames, .. } => {
            assert_eq!(members.len(), 2);
            assert_eq!(renames.len(), 2);
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_rename_mismatch() {
    parse_fails("(import sys (a b) (x))");
}

// ============================================================================
// Multiple forms and recovery
// ============================================================================

#[test]
fn test_parse_multiple_top_level_forms() {
    let exprs = parse_ok("(set x 1) (set y 2) (+ x y)");
    assert_eq!(exprs.len(), 3);
}

#[test]
fn test_parse_recovers_after_bad_form() {
    let out = parse_program("(if x) (+ 1 2)");
    assert!(out.diagnostics.has_errors());
    // The second form still parses.
    assert_eq!(out.exprs.len(), 1);
    assert!(matches!(out.exprs[0], Expr::Binary { .. }));
}

#[test]
fn test_parse_unsupported_keyword_form() {
    parse_fails("(defclass c () ())");
    parse_fails("(return 1)");
}

// ============================================================================
// Incomplete input
// ============================================================================

#[test]
fn test_parse_incomplete_form_is_marked() {
    let out = parse_program("(defun foo (x)");
    assert_eq!(out.diagnostics.properties(), CodeProperties::IncompleteInput);
}

#[test]
fn test_parse_incomplete_list_is_marked() {
    let out = parse_program("'(1 2");
    assert_eq!(out.diagnostics.properties(), CodeProperties::IncompleteInput);
}

#[test]
fn test_parse_empty_input_is_marked_empty() {
    let out = parse_program("");
    assert_eq!(out.diagnostics.properties(), CodeProperties::Empty);
    assert!(out.exprs.is_empty());
}

#[test]
fn test_parse_malformed_is_not_incomplete() {
    let out = parse_program("(if x)");
    assert_eq!(out.diagnostics.properties(), CodeProperties::Complete);
    assert!(out.diagnostics.has_errors());
}

#[test]
fn test_parse_one_expression() {
    let out = parse_one("(+ 2 3)");
    assert_eq!(out.exprs.len(), 1);
    assert!(!out.diagnostics.has_errors());
}

// ============================================================================
// Comments
// ============================================================================

#[test]
fn test_parse_with_comments() {
    let exprs = parse_ok("; header\n(+ 1 2) ; trailing\n");
    assert_eq!(exprs.len(), 1);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn precedence_mul_over_add() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    let expr = parse("1 + 2 * 3").unwrap();
    match expr {
        Expr::Binary { op: BinOp::Add, right, .. } => {
            assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
        }
        other => panic!("unexpected tree {other:?}"),
    }
}

#[test]
fn parentheses_override_precedence() {
    let expr = parse("(1 + 2) * 3").unwrap();
    match expr {
        Expr::Binary { op: BinOp::Mul, left, .. } => {
            assert!(matches!(*left, Expr::Binary { op: BinOp::Add, .. }));
        }
        other => panic!("unexpected tree {other:?}"),
    }
}

#[test]
fn comparison_binds_looser_than_sum() {
    let expr = parse("a + 1 > b - 2").unwrap();
    assert!(matches!(expr, Expr::Binary { op: BinOp::Gt, .. }));
}

#[test]
fn boolean_chain_nests_left() {
    let expr = parse("a and b or c").unwrap();
    match expr {
        Expr::Binary { op: BinOp::Or, left, .. } => {
            assert!(matches!(*left, Expr::Binary { op: BinOp::And, .. }));
        }
        other => panic!("unexpected tree {other:?}"),
    }
}

#[test]
fn not_is_recursive() {
    let expr = parse("not not a").unwrap();
    match expr {
        Expr::Not(inner) => assert!(matches!(*inner, Expr::Not(_))),
        other => panic!("unexpected tree {other:?}"),
    }
}

#[test]
fn unary_minus_parses() {
    // Per the grammar, -x ** 2 parses as (-x) ** 2.
    let expr = parse("-x ** 2").unwrap();
    assert!(matches!(expr, Expr::Binary { op: BinOp::Pow, .. }));
}

#[yare::parameterized(
    empty = { "" },
    call = { "f(x)" },
    dangling_op = { "1 +" },
    unclosed_paren = { "(1 + 2" },
    double_cmp = { "1 < 2 < 3" },
    lone_operator = { "*" },
)]
fn malformed_expressions_fail(src: &str) {
    assert!(parse(src).is_err());
}

#[yare::parameterized(
    literal_int = { "42" },
    literal_str = { "'hi'" },
    ident = { "total" },
    nested = { "((a))" },
    full = { "not (a + 1) * 2 >= b or c != null" },
)]
fn wellformed_expressions_parse(src: &str) {
    assert!(parse(src).is_ok());
}

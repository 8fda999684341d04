// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tokenizes_arithmetic() {
    let tokens = tokenize("1 + 2.5 * x").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Int(1),
            Token::Plus,
            Token::Float(2.5),
            Token::Star,
            Token::Ident("x".to_string()),
        ]
    );
}

#[test]
fn distinguishes_slash_pairs() {
    assert_eq!(tokenize("a / b").unwrap()[1], Token::Slash);
    assert_eq!(tokenize("a // b").unwrap()[1], Token::SlashSlash);
    assert_eq!(tokenize("a ** b").unwrap()[1], Token::StarStar);
    assert_eq!(tokenize("a * b").unwrap()[1], Token::Star);
}

#[yare::parameterized(
    eq = { "==", Token::Eq },
    ne = { "!=", Token::Ne },
    lt = { "<", Token::Lt },
    le = { "<=", Token::Le },
    gt = { ">", Token::Gt },
    ge = { ">=", Token::Ge },
)]
fn comparison_operators(src: &str, expected: Token) {
    assert_eq!(tokenize(src).unwrap(), vec![expected]);
}

#[test]
fn keywords_and_literals() {
    assert_eq!(
        tokenize("not a and true or False").unwrap(),
        vec![
            Token::Not,
            Token::Ident("a".to_string()),
            Token::And,
            Token::True,
            Token::Or,
            Token::False,
        ]
    );
    assert_eq!(tokenize("null").unwrap(), vec![Token::Null]);
    assert_eq!(tokenize("None").unwrap(), vec![Token::Null]);
}

#[test]
fn string_literals_with_escapes() {
    assert_eq!(
        tokenize(r#"'it\'s' "a\nb""#).unwrap(),
        vec![Token::Str("it's".to_string()), Token::Str("a\nb".to_string())]
    );
}

#[test]
fn non_ascii_string_content_survives() {
    assert_eq!(tokenize("'héllo'").unwrap(), vec![Token::Str("héllo".to_string())]);
}

#[test]
fn single_equals_is_rejected() {
    assert!(matches!(
        tokenize("a = b"),
        Err(LexError::UnexpectedChar { ch: '=', .. })
    ));
}

#[test]
fn unterminated_string_is_rejected() {
    assert_eq!(tokenize("'abc"), Err(LexError::UnterminatedString(0)));
}

#[test]
fn unsafe_characters_are_rejected() {
    // No subscripting, attribute access, or calls in the grammar.
    assert!(tokenize("a[0]").is_err());
    assert!(tokenize("a,b").is_err());
    assert!(tokenize("f(x)").unwrap().contains(&Token::LParen)); // lexes, parser rejects
}

#[test]
fn bare_dot_is_rejected() {
    assert!(matches!(
        tokenize("a . b"),
        Err(LexError::UnexpectedChar { ch: '.', .. })
    ));
}

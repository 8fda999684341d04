// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenizer for the safe expression grammar.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    StarStar,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),
    #[error("malformed number '{0}'")]
    BadNumber(String),
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_ahead(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }
}

/// Tokenize `src`, or fail on anything outside the grammar.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut cur = Cursor { chars: src.chars().collect(), pos: 0 };
    let mut tokens = Vec::new();

    while let Some(c) = cur.peek() {
        match c {
            c if c.is_whitespace() => {
                cur.bump();
            }
            '(' => {
                cur.bump();
                tokens.push(Token::LParen);
            }
            ')' => {
                cur.bump();
                tokens.push(Token::RParen);
            }
            '+' => {
                cur.bump();
                tokens.push(Token::Plus);
            }
            '-' => {
                cur.bump();
                tokens.push(Token::Minus);
            }
            '%' => {
                cur.bump();
                tokens.push(Token::Percent);
            }
            '*' => {
                cur.bump();
                if cur.peek() == Some('*') {
                    cur.bump();
                    tokens.push(Token::StarStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                cur.bump();
                if cur.peek() == Some('/') {
                    cur.bump();
                    tokens.push(Token::SlashSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '=' => {
                if cur.peek_ahead() == Some('=') {
                    cur.bump();
                    cur.bump();
                    tokens.push(Token::Eq);
                } else {
                    return Err(LexError::UnexpectedChar { ch: '=', pos: cur.pos });
                }
            }
            '!' => {
                if cur.peek_ahead() == Some('=') {
                    cur.bump();
                    cur.bump();
                    tokens.push(Token::Ne);
                } else {
                    return Err(LexError::UnexpectedChar { ch: '!', pos: cur.pos });
                }
            }
            '<' => {
                cur.bump();
                if cur.peek() == Some('=') {
                    cur.bump();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                cur.bump();
                if cur.peek() == Some('=') {
                    cur.bump();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = cur.pos;
                cur.bump();
                let mut buf = String::new();
                loop {
                    match cur.bump() {
                        None => return Err(LexError::UnterminatedString(start)),
                        Some(ch) if ch == quote => break,
                        Some('\\') => match cur.bump() {
                            Some('n') => buf.push('\n'),
                            Some('t') => buf.push('\t'),
                            Some(esc) => buf.push(esc),
                            None => return Err(LexError::UnterminatedString(start)),
                        },
                        Some(ch) => buf.push(ch),
                    }
                }
                tokens.push(Token::Str(buf));
            }
            '0'..='9' | '.' => {
                let start = cur.pos;
                let mut saw_dot = false;
                let mut text = String::new();
                while let Some(ch) = cur.peek() {
                    match ch {
                        '0'..='9' => {
                            text.push(ch);
                            cur.bump();
                        }
                        '.' if !saw_dot => {
                            saw_dot = true;
                            text.push(ch);
                            cur.bump();
                        }
                        _ => break,
                    }
                }
                if text == "." {
                    return Err(LexError::UnexpectedChar { ch: '.', pos: start });
                }
                if saw_dot {
                    let f: f64 = text.parse().map_err(|_| LexError::BadNumber(text.clone()))?;
                    tokens.push(Token::Float(f));
                } else {
                    let n: i64 = text.parse().map_err(|_| LexError::BadNumber(text.clone()))?;
                    tokens.push(Token::Int(n));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(ch) = cur.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        word.push(ch);
                        cur.bump();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    "null" | "None" => Token::Null,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(LexError::UnexpectedChar { ch: other, pos: cur.pos }),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;

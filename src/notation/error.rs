//! Error type for the notation parser.

use thiserror::Error;

use super::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The lookahead token does not fit the production being parsed.
    Syntax,
    /// The parser itself failed (a bug, or a misbehaving token source).
    Internal,
}

/// The first error met during a parse. Parsing stops there.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// The production that was being parsed, e.g. `"end of staff"`.
    pub context: String,
    pub expected: Vec<TokenKind>,
    pub found: Option<Token>,
    pub message: String,
}

impl ParseError {
    pub fn syntax(context: impl Into<String>, expected: &[TokenKind], found: &Token) -> Self {
        let context = context.into();
        let expected_names = expected
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(" | ");
        let message = format!(
            "syntax error in {context}: expected {expected_names}, got {} ({found})",
            found.kind
        );
        Self {
            kind: ParseErrorKind::Syntax,
            context,
            expected: expected.to_vec(),
            found: Some(found.clone()),
            message,
        }
    }

    pub fn internal(context: impl Into<String>) -> Self {
        let context = context.into();
        let message = format!("unexpected error during parsing: {context}");
        Self {
            kind: ParseErrorKind::Internal,
            context,
            expected: Vec::new(),
            found: None,
            message,
        }
    }

    /// Kind of the offending token, if any.
    pub fn found_kind(&self) -> Option<TokenKind> {
        self.found.as_ref().map(|t| t.kind)
    }
}

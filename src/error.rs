//! Crate-level error type covering every stage of a run

use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::SourceLocation;
use crate::parser::lexer::LexError;
use crate::parser::parse::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// Short name of the error kind, as shown in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Lex(_) => "LexError",
            Error::Parse(_) => "ParseError",
            Error::Runtime(e) => e.kind(),
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Error::Lex(e) => Some(e.location),
            Error::Parse(e) => Some(e.location),
            Error::Runtime(e) => e.location(),
        }
    }

    /// Whether the program was rejected before it started running
    pub fn is_compile_error(&self) -> bool {
        matches!(self, Error::Lex(_) | Error::Parse(_))
    }
}

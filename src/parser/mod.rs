//! C source code parser
//!
//! This module transforms C source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), split across `declarations`,
//!   `statements` and `expressions`
//! - [`ast`]: AST node definitions
//!
//! # Supported C Subset
//!
//! - Types: `int`, `char`, `void`, pointers, fixed-size arrays
//! - Statements: declarations, assignments, `if`, `while`, `for`, `return`,
//!   `break`, `continue`
//! - Expressions: arithmetic, comparison, logical, address-of, dereference,
//!   indexing, calls, array literals, declarations in expression position
//! - No preprocessor (`#include` and other directives are skipped)
//! - No structs, typedefs, unions, enums, floats or function pointers

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};

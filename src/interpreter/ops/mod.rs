//! Operator semantics, all implemented as methods on the interpreter
//!
//! - [`binary`]: arithmetic, comparison and pointer arithmetic
//! - [`unary`]: negation, logical not, increments
//! - [`access`]: places, dereference and indexing
//! - [`assign`]: assignment, array literals and declarations

pub mod access;
pub mod assign;
pub mod binary;
pub mod unary;

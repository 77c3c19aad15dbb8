//! Execution engine for parsed programs
//!
//! This module provides the core execution logic:
//! - [`engine`]: The interpreter, its continuation stack and call handling
//! - [`errors`]: Runtime error types
//! - [`builtins`]: The `print(ptr, len)` intrinsic
//! - [`ops`]: Operator semantics
//!
//! # Execution Model
//!
//! Statements and expressions are expanded into tasks on an explicit stack,
//! so interpreted recursion never consumes host stack. Memory is an arena of
//! bounds-checked buffers (see [`crate::memory`]).

pub mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
pub mod ops;
mod statements;

//! # Introduction
//!
//! `subc` parses and executes a small subset of C. Programs run on an
//! explicit continuation stack, so interpreted recursion never consumes host
//! stack, and all memory lives in bounds-checked byte buffers addressed by
//! (buffer id, offset) pairs rather than host addresses.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter → output sink
//! ```
//!
//! 1. [`parser`] tokenises the source and builds an AST.
//! 2. [`interpreter`] executes `main` with `argc`/`argv` and writes the
//!    output of the `print(ptr, len)` intrinsic to any [`std::io::Write`].
//! 3. [`memory`] is the buffer arena, tagged [`memory::value::Value`]s and
//!    the call stack of activation records.
//!
//! ## Supported C subset
//!
//! Types: `int`, `char`, `void`, pointers, fixed-size arrays, `const`.
//! Control flow: `if/else`, `while`, `for`, `break`, `continue`, `return`.
//! Built-ins: `print(ptr, len)`.
//!
//! ```
//! let source = r#"int main() { print("hi\n", 3); return 7; }"#;
//! let mut out = Vec::new();
//! let code = subc::run_source(source, &["prog"], &mut out, subc::EngineConfig::default());
//! assert_eq!(code.unwrap(), 7);
//! assert_eq!(out, b"hi\n");
//! ```

pub mod config;
pub mod error;
pub mod interpreter;
pub mod memory;
pub mod parser;

pub use config::EngineConfig;
pub use error::Error;
pub use interpreter::engine::Interpreter;
pub use parser::ast::Program;

use parser::parse::Parser;
use std::io::Write;
use tracing::debug;

/// Lex and parse a translation unit
pub fn compile(source: &str) -> Result<Program, Error> {
    let mut parser = Parser::new(source)?;
    let program = parser.parse_program()?;
    debug!(functions = program.nodes.len(), "parsed program");
    Ok(program)
}

/// Compile `source` and run its `main` with `args` (`argv[0]` first),
/// writing program output to `sink`. Returns `main`'s exit value.
pub fn run_source<S, W>(
    source: &str,
    args: &[S],
    sink: W,
    config: EngineConfig,
) -> Result<i32, Error>
where
    S: AsRef<[u8]>,
    W: Write,
{
    let program = compile(source)?;
    let mut interpreter = Interpreter::new(&program, sink, config);
    Ok(interpreter.run(args)?)
}

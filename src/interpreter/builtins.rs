//! Built-in function implementations
//!
//! The only intrinsic is `print(ptr, len)`: it writes exactly `len` bytes
//! starting at `ptr` to the output sink, unmodified. Any byte value is
//! allowed, including NUL. It evaluates to 0.
//!
//! A user-defined `print` takes precedence over the intrinsic.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::SourceLocation;
use std::io::Write;
use tracing::trace;

impl<'p, W: Write> Interpreter<'p, W> {
    pub(crate) fn builtin_print(
        &mut self,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let [target, len] = args else {
            return Err(RuntimeError::internal(
                "print called with the wrong number of arguments",
                location,
            ));
        };

        let ptr = target.as_pointer().ok_or_else(|| RuntimeError::TypeMismatch {
            expected: "pointer as the first argument of print".to_string(),
            got: target.type_name(),
            location,
        })?;
        let len = len.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
            expected: "int as the second argument of print".to_string(),
            got: len.type_name(),
            location,
        })?;

        let width = usize::try_from(len).map_err(|_| RuntimeError::BoundsError {
            message: format!("print length {} is negative", len),
            location,
        })?;

        let bytes = self
            .memory
            .read(ptr.buffer, ptr.offset, width)
            .map_err(|e| RuntimeError::from_memory(e, location))?;

        trace!(len = width, "print");
        self.sink
            .write_all(bytes)
            .map_err(|e| RuntimeError::Output {
                message: e.to_string(),
                location,
            })?;

        Ok(Value::Int(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::RuntimeError;
    use crate::parser::parse::Parser;
    use std::io::{self, Write};

    fn run(source: &str) -> (Result<i32, RuntimeError>, Vec<u8>) {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interpreter = Interpreter::new(&program, Vec::new(), EngineConfig::default());
        let result = interpreter.run(&["prog"]);
        (result, interpreter.into_sink())
    }

    #[test]
    fn test_print_writes_exact_bytes() {
        let (result, output) = run(r#"int main() { print("Hello\n", 6); return 0; }"#);
        assert_eq!(result, Ok(0));
        assert_eq!(output, b"Hello\n");
    }

    #[test]
    fn test_print_includes_nul_bytes() {
        let (_, output) = run(r#"int main() { print("ab", 3); return 0; }"#);
        assert_eq!(output, b"ab\0");
    }

    #[test]
    fn test_print_returns_zero() {
        let (result, _) = run(r#"int main() { return print("x", 1) + 7; }"#);
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn test_print_from_offset_and_zero_length() {
        let source = r#"
            int main() {
                char word[5] = "abcd";
                print(word + 2, 2);
                print(word, 0);
                return 0;
            }
        "#;
        let (_, output) = run(source);
        assert_eq!(output, b"cd");
    }

    #[test]
    fn test_print_out_of_bounds() {
        let (result, output) = run(r#"int main() { print("abc", 5); return 0; }"#);
        assert!(matches!(result, Err(RuntimeError::BoundsError { .. })));
        assert!(output.is_empty());
    }

    #[test]
    fn test_print_negative_length() {
        let (result, _) = run(r#"int main() { print("abc", -1); return 0; }"#);
        assert!(matches!(result, Err(RuntimeError::BoundsError { .. })));
    }

    #[test]
    fn test_print_rejects_non_pointer() {
        let (result, _) = run("int main() { print(5, 1); return 0; }");
        assert!(matches!(result, Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_print_wrong_arity() {
        let (result, _) = run(r#"int main() { print("abc"); return 0; }"#);
        assert!(matches!(
            result,
            Err(RuntimeError::ArityMismatch { expected: 2, got: 1, .. })
        ));
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let program = Parser::new(r#"int main() { print("x", 1); return 0; }"#)
            .unwrap()
            .parse_program()
            .unwrap();
        let mut interpreter = Interpreter::new(&program, BrokenSink, EngineConfig::default());
        assert!(matches!(
            interpreter.run(&["prog"]),
            Err(RuntimeError::Output { .. })
        ));
    }
}

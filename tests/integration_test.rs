// End-to-end tests running the fixture programs

use subc::interpreter::errors::RuntimeError;
use subc::{EngineConfig, Error};

const HELLO: &str = include_str!("fixtures/hello.c");
const ARGV: &str = include_str!("fixtures/argv.c");
const NUMBERS: &str = include_str!("fixtures/numbers.c");

fn run_with_args(source: &str, args: &[&str]) -> (Result<i32, Error>, String) {
    let mut output = Vec::new();
    let result = subc::run_source(source, args, &mut output, EngineConfig::default());
    let output = String::from_utf8(output).expect("Output was not UTF-8");
    (result, output)
}

fn run(source: &str) -> (Result<i32, Error>, String) {
    run_with_args(source, &["prog"])
}

/// The numbers fixture followed by a caller-supplied `main`
fn with_numbers(main: &str) -> String {
    format!("{}\n{}", NUMBERS, main)
}

#[test]
fn test_hello_program() {
    let (result, output) = run(HELLO);
    assert_eq!(result.expect("Execution failed"), 0);
    assert_eq!(output, "Hello\n8\nHello from C lang compiled with Typescript\n");
}

#[test]
fn test_print_int_positive() {
    let (_, output) = run(&with_numbers("int main() { print_int(14883); return 0; }"));
    assert_eq!(output, "14883");
}

#[test]
fn test_print_int_negative_then_newline() {
    let source = with_numbers(r#"int main() { print_int(-1488); print("\n", 1); return 0; }"#);
    let (_, output) = run(&source);
    assert_eq!(output, "-1488\n");
}

#[test]
fn test_print_int_zero() {
    let (_, output) = run(&with_numbers("int main() { print_int(0); return 0; }"));
    assert_eq!(output, "0");
}

#[test]
fn test_print_int_extremes() {
    let source = with_numbers(
        r#"int main() { print_int(2147483647); print(" ", 1); print_int(-2147483647 - 1); return 0; }"#,
    );
    let (_, output) = run(&source);
    assert_eq!(output, "2147483647 -2147483648");
}

#[test]
fn test_decimal_round_trip() {
    // The most negative int has no literal form, so it is written as an expression
    let values = [
        ("0", 0),
        ("1", 1),
        ("-1", -1),
        ("42", 42),
        ("-1488", -1488),
        ("14883", 14883),
        ("100000", 100000),
        ("2147483647", i32::MAX),
        ("-2147483647 - 1", i32::MIN),
    ];

    for (expr, expected) in values {
        let main = format!(
            r#"
            int main() {{
                char buf[16];
                int len = format_int({expr}, buf);
                buf[len] = '\0';
                return parse_int_from_str(buf);
            }}
            "#
        );
        let (result, _) = run(&with_numbers(&main));
        assert_eq!(result.expect("Execution failed"), expected, "round trip of {}", expr);
    }
}

#[test]
fn test_parse_int_compat_sentinel_is_ambiguous() {
    let source = with_numbers(r#"int main() { return parse_int_from_str("-1488"); }"#);
    assert_eq!(run(&source).0.expect("Execution failed"), -1488);

    // The empty string yields the same value; only the checked form tells them apart
    let source = with_numbers(r#"int main() { return parse_int_from_str(""); }"#);
    assert_eq!(run(&source).0.expect("Execution failed"), -1488);
}

#[test]
fn test_parse_int_checked_distinguishes_empty_input() {
    let source = with_numbers(
        r#"
        int main() {
            int ok = -1;
            int value = parse_int_checked("-1488", &ok);
            if (ok != 1 || value != -1488) return 1;
            value = parse_int_checked("", &ok);
            if (ok != 0) return 2;
            return 0;
        }
        "#,
    );
    assert_eq!(run(&source).0.expect("Execution failed"), 0);
}

#[test]
fn test_argv_mutation_with_long_arguments() {
    let (result, output) = run_with_args(ARGV, &["prog", "abc", "hello"]);
    assert_eq!(result.expect("Execution failed"), 0);
    assert_eq!(output, "DMBg\nDMB\nDMBlo\n");
}

#[test]
fn test_argv_mutation_with_short_argument() {
    let (result, output) = run_with_args(ARGV, &["prog", "ab"]);

    // argv[0] is fine; "ab" loses its terminator and strlen runs off the end
    assert_eq!(output, "DMBg\n");
    match result {
        Err(Error::Runtime(RuntimeError::BoundsError { .. })) => {}
        other => panic!("expected a bounds error, got {:?}", other),
    }
}

#[test]
fn test_output_before_runtime_error_is_kept() {
    let source = r#"
        int main() {
            print("partial", 7);
            int zero = 0;
            return 1 / zero;
        }
    "#;
    let (result, output) = run(source);
    assert_eq!(output, "partial");
    let err = result.expect_err("Division by zero should fail");
    assert_eq!(err.kind(), "DivideByZero");
    assert_eq!(err.location().map(|l| l.line), Some(5));
}

#[test]
fn test_compile_errors_produce_no_output() {
    let (result, output) = run(r#"int main() { print("x", 1); return 0 }"#);
    let err = result.expect_err("Missing semicolon should fail");
    assert!(err.is_compile_error());
    assert_eq!(err.kind(), "ParseError");
    assert!(output.is_empty());

    let (result, _) = run("int main() { return 1 @ 2; }");
    assert_eq!(result.expect_err("Stray character should fail").kind(), "LexError");
}

#[test]
fn test_oversized_programs_are_compile_errors() {
    let (result, _) = run("int main() { int a[2147483647][2147483647][2147483647]; return 0; }");
    let err = result.expect_err("Oversized array should fail");
    assert!(err.is_compile_error());
    assert_eq!(err.kind(), "ParseError");

    let nested = format!("int main() {{ return {}1{}; }}", "(".repeat(200_000), ")".repeat(200_000));
    let (result, output) = run(&nested);
    assert_eq!(result.expect_err("Deep nesting should fail").kind(), "ParseError");
    assert!(output.is_empty());
}

#[test]
fn test_runs_are_idempotent() {
    let first = run_with_args(ARGV, &["prog", "hello", "world"]);
    let second = run_with_args(ARGV, &["prog", "hello", "world"]);
    assert_eq!(first.1, second.1);
    assert_eq!(first.0.ok(), second.0.ok());

    let program = subc::compile(HELLO).expect("Compilation failed");
    let mut a = Vec::new();
    let mut b = Vec::new();
    subc::Interpreter::new(&program, &mut a, EngineConfig::default())
        .run(&["prog"])
        .expect("Execution failed");
    subc::Interpreter::new(&program, &mut b, EngineConfig::default())
        .run(&["prog"])
        .expect("Execution failed");
    assert_eq!(a, b);
}

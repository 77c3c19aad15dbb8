// Constants for the interpreter

/// Default ceiling on nested calls before a stack overflow is reported
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Name of the program entry point
pub const ENTRY_POINT: &str = "main";

/// Name of the output intrinsic, `print(ptr, len)`
pub const PRINT_INTRINSIC: &str = "print";

/// Number of arguments `print` takes
pub const PRINT_ARITY: usize = 2;

/// Most parameters `main` may declare (`argc`, `argv`)
pub const MAIN_MAX_PARAMS: usize = 2;

// subc: run a C-subset program with bounds-checked memory

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use subc::{EngineConfig, Interpreter};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status for programs rejected by the lexer or parser
const EXIT_COMPILE_ERROR: i32 = 65;
/// Exit status for programs that fail while running
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(Parser, Debug)]
#[command(
    name = "subc",
    version,
    about = "Interpreter for a small C subset with bounds-checked memory"
)]
struct Args {
    /// C source file; its path becomes argv[0]
    file: PathBuf,

    /// Arguments passed to the program as argv[1..]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Abort after executing this many statements
    #[arg(long = "max-steps", value_name = "N")]
    max_steps: Option<u64>,

    /// Maximum number of nested calls
    #[arg(long = "max-depth", value_name = "N")]
    max_depth: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<i32> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read '{}'", args.file.display()))?;

    let mut config = EngineConfig::default().with_max_steps(args.max_steps);
    if let Some(depth) = args.max_depth {
        config = config.with_max_call_depth(depth);
    }

    let mut argv = vec![args.file.display().to_string()];
    argv.extend(args.args.iter().cloned());

    let program = match subc::compile(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error[{}]: {}", err.kind(), err);
            return Ok(EXIT_COMPILE_ERROR);
        }
    };

    let stdout = io::stdout();
    let mut interpreter = Interpreter::new(&program, stdout.lock(), config);
    let result = interpreter.run(&argv);
    debug!(steps = interpreter.steps(), "run complete");

    interpreter
        .into_sink()
        .flush()
        .context("cannot flush program output")?;

    match result {
        Ok(code) => Ok(code),
        Err(err) => {
            let err = subc::Error::from(err);
            eprintln!("error[{}]: {}", err.kind(), err);
            Ok(EXIT_RUNTIME_ERROR)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        // The OS keeps only the low byte of the status
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

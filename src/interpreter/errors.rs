//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! during program execution (as opposed to lex or parse errors).
//!
//! All runtime errors are fatal: they halt execution. Output already written
//! to the sink stays written.

use crate::memory::MemoryError;
use crate::parser::ast::SourceLocation;
use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Dereference or index outside a buffer
    #[error("Bounds error at {location}: {message}")]
    BoundsError {
        message: String,
        location: SourceLocation,
    },

    /// Division or modulo by zero
    #[error("{operation} by zero at {location}")]
    DivideByZero {
        operation: &'static str,
        location: SourceLocation,
    },

    /// Unknown variable or function
    #[error("Undefined {kind} '{name}' at {location}")]
    UndefinedSymbol {
        kind: &'static str,
        name: String,
        location: SourceLocation,
    },

    /// Function argument count mismatch
    #[error(
        "Function '{function}' expects {expected} argument{}, got {got} at {location}",
        plural(.expected)
    )]
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
        location: SourceLocation,
    },

    /// Operand of the wrong type
    #[error("Type error at {location}: expected {expected}, got {got}")]
    TypeMismatch {
        expected: String,
        got: String,
        location: SourceLocation,
    },

    /// Access through a pointer whose buffer has been retired
    #[error("Dangling pointer at {location}: {message}")]
    DanglingPointer {
        message: String,
        location: SourceLocation,
    },

    /// Attempted to modify a const variable
    #[error("Attempted to modify const variable '{var}' at {location}")]
    ConstModification {
        var: String,
        location: SourceLocation,
    },

    /// Call depth ceiling reached
    #[error("Stack overflow: call depth limit of {limit} reached at {location}")]
    StackOverflow {
        limit: usize,
        location: SourceLocation,
    },

    /// Statement ceiling reached
    #[error("Step limit of {limit} statements exceeded at {location}")]
    StepLimitExceeded {
        limit: u64,
        location: SourceLocation,
    },

    /// Main function not found
    #[error("No main() function found")]
    MissingMain,

    /// The output sink failed
    #[error("Output error at {location}: {message}")]
    Output {
        message: String,
        location: SourceLocation,
    },

    /// An engine invariant was violated
    #[error("Internal error at {location}: {message}")]
    Internal {
        message: String,
        location: SourceLocation,
    },
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

impl RuntimeError {
    /// Attach a source location to a memory-layer failure
    pub fn from_memory(err: MemoryError, location: SourceLocation) -> Self {
        match err {
            MemoryError::OutOfBounds { .. } | MemoryError::OffsetOverflow { .. } => RuntimeError::BoundsError {
                message: err.to_string(),
                location,
            },
            MemoryError::Dangling { .. } => RuntimeError::DanglingPointer {
                message: err.to_string(),
                location,
            },
            MemoryError::Incompatible { expected, found } => RuntimeError::TypeMismatch {
                expected,
                got: found,
                location,
            },
            MemoryError::UnrelatedPointers => RuntimeError::TypeMismatch {
                expected: "pointers into the same buffer".to_string(),
                got: "pointers into different buffers".to_string(),
                location,
            },
            MemoryError::Exhausted | MemoryError::AllocationFailed { .. } => RuntimeError::Internal {
                message: err.to_string(),
                location,
            },
        }
    }

    pub(crate) fn internal(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::Internal {
            message: message.into(),
            location,
        }
    }

    /// Short name of the error kind, as shown in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::BoundsError { .. } => "BoundsError",
            RuntimeError::DivideByZero { .. } => "DivideByZero",
            RuntimeError::UndefinedSymbol { .. } => "UndefinedSymbol",
            RuntimeError::ArityMismatch { .. } => "ArityMismatch",
            RuntimeError::TypeMismatch { .. } => "TypeMismatch",
            RuntimeError::DanglingPointer { .. } => "DanglingPointer",
            RuntimeError::ConstModification { .. } => "ConstModification",
            RuntimeError::StackOverflow { .. } => "StackOverflow",
            RuntimeError::StepLimitExceeded { .. } => "StepLimitExceeded",
            RuntimeError::MissingMain => "MissingMain",
            RuntimeError::Output { .. } => "OutputError",
            RuntimeError::Internal { .. } => "InternalError",
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            RuntimeError::BoundsError { location, .. }
            | RuntimeError::DivideByZero { location, .. }
            | RuntimeError::UndefinedSymbol { location, .. }
            | RuntimeError::ArityMismatch { location, .. }
            | RuntimeError::TypeMismatch { location, .. }
            | RuntimeError::DanglingPointer { location, .. }
            | RuntimeError::ConstModification { location, .. }
            | RuntimeError::StackOverflow { location, .. }
            | RuntimeError::StepLimitExceeded { location, .. }
            | RuntimeError::Output { location, .. }
            | RuntimeError::Internal { location, .. } => Some(*location),
            RuntimeError::MissingMain => None,
        }
    }
}

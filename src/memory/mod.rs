//! Memory model for the interpreter
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation (Int, Char, Pointer)
//! - [`buffer`]: The arena of fixed-length byte buffers
//! - [`stack`]: Call stack with activation records and block scopes
//!
//! # Type Sizes
//!
//! Sizes are fixed and platform-independent:
//! - `int`: 4 bytes
//! - `char`: 1 byte
//! - `pointer`: 8 bytes (regardless of pointee type)
//! - `T[n]`: `n * sizeof(T)`, no padding
//!
//! # Pointer Arithmetic
//!
//! Pointer arithmetic is scaled by pointee size and never leaves its buffer:
//! ```text
//! ptr + n  →  (ptr.buffer, ptr.offset + n * sizeof(*ptr))
//! ```
//!
//! Offsets must stay within the `i32` range a stored pointer can hold.
//!
//! [`pointer_add`] and [`pointer_diff`] handle this scaling.

pub mod buffer;
pub mod stack;
pub mod value;

use thiserror::Error;
use value::{BufferId, Pointer};

/// Failures raised by the memory layer. The interpreter attaches source
/// locations when converting them into runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("access of {width} byte(s) at offset {offset} is outside buffer {buffer} of length {len}")]
    OutOfBounds {
        buffer: BufferId,
        offset: i64,
        width: usize,
        len: usize,
    },

    #[error("buffer {buffer} is no longer live")]
    Dangling { buffer: BufferId },

    #[error("expected {expected}, found {found}")]
    Incompatible { expected: String, found: String },

    #[error("pointers into different buffers cannot be subtracted")]
    UnrelatedPointers,

    #[error("pointer offset {offset} is outside the addressable range")]
    OffsetOverflow { offset: i128 },

    #[error("cannot allocate a buffer of {len} bytes")]
    AllocationFailed { len: usize },

    #[error("buffer ids exhausted")]
    Exhausted,
}

/// Perform pointer arithmetic: ptr + delta (scaled by pointee size)
pub fn pointer_add(ptr: &Pointer, delta: i32) -> Result<Pointer, MemoryError> {
    let offset = ptr.offset as i128 + delta as i128 * ptr.pointee.stride() as i128;
    if i32::try_from(offset).is_err() {
        return Err(MemoryError::OffsetOverflow { offset });
    }

    let mut moved = ptr.clone();
    moved.offset = offset as i64;
    Ok(moved)
}

/// Calculate the difference between two pointers (in elements, not bytes)
pub fn pointer_diff(a: &Pointer, b: &Pointer) -> Result<i32, MemoryError> {
    if a.buffer != b.buffer {
        return Err(MemoryError::UnrelatedPointers);
    }
    let stride = a.pointee.stride().max(1) as i128;
    let elements = (a.offset as i128 - b.offset as i128) / stride;
    i32::try_from(elements).map_err(|_| MemoryError::OffsetOverflow { offset: elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Type;

    #[test]
    fn test_pointer_add_scales_by_pointee() {
        let p = Pointer::new(BufferId(3), 0, Type::Int);
        assert_eq!(pointer_add(&p, 2).unwrap().offset, 8);
        assert_eq!(pointer_add(&p, -1).unwrap().offset, -4);

        let c = Pointer::new(BufferId(3), 5, Type::Char);
        assert_eq!(pointer_add(&c, 3).unwrap().offset, 8);

        let v = Pointer::new(BufferId(3), 0, Type::Void);
        assert_eq!(pointer_add(&v, 3).unwrap().offset, 3);

        let pp = Pointer::new(BufferId(3), 0, Type::Char.with_pointer());
        assert_eq!(pointer_add(&pp, 1).unwrap().offset, 8);
    }

    #[test]
    fn test_pointer_add_rejects_unrepresentable_offsets() {
        let c = Pointer::new(BufferId(3), 2, Type::Char);
        let far = pointer_add(&c, i32::MAX - 2).unwrap();
        assert_eq!(far.offset, i32::MAX as i64);
        assert!(matches!(
            pointer_add(&far, 1),
            Err(MemoryError::OffsetOverflow { .. })
        ));

        // Scaling alone can leave the range
        let p = Pointer::new(BufferId(3), 0, Type::Int);
        assert!(pointer_add(&p, i32::MAX).is_err());
        assert!(pointer_add(&p, i32::MIN).is_err());
    }

    #[test]
    fn test_pointer_diff() {
        let a = Pointer::new(BufferId(1), 12, Type::Int);
        let b = Pointer::new(BufferId(1), 4, Type::Int);
        assert_eq!(pointer_diff(&a, &b), Ok(2));
        assert_eq!(pointer_diff(&b, &a), Ok(-2));

        let other = Pointer::new(BufferId(2), 4, Type::Int);
        assert_eq!(pointer_diff(&a, &other), Err(MemoryError::UnrelatedPointers));

        let low = Pointer::new(BufferId(1), i32::MIN as i64, Type::Char);
        let high = Pointer::new(BufferId(1), i32::MAX as i64, Type::Char);
        assert!(matches!(
            pointer_diff(&high, &low),
            Err(MemoryError::OffsetOverflow { .. })
        ));
    }
}

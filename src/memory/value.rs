//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime
//! values. Values are tagged: a pointer is a handle into the buffer arena, never
//! a host address.
//!
//! # Value Types
//!
//! - [`Value::Int`]: 32-bit signed integer
//! - [`Value::Char`]: 8-bit signed character
//! - [`Value::Pointer`]: (buffer id, byte offset, pointee type)
//!
//! # Stored Representation
//!
//! Values are kept in buffers as little-endian bytes: `int` takes 4 bytes,
//! `char` 1 and a pointer 8 (buffer id as `u32`, then offset as `i32`).

use super::MemoryError;
use crate::parser::ast::{Type, POINTER_SIZE};
use std::fmt;

/// Identifier of a buffer in the arena. Id 0 is the null buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BufferId(pub u32);

impl BufferId {
    pub const NULL: BufferId = BufferId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A pointer into a buffer.
///
/// The offset is in bytes and may leave the buffer transiently; only an
/// access outside `[0, len)` is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    pub buffer: BufferId,
    pub offset: i64,
    pub pointee: Type,
}

impl Pointer {
    pub fn new(buffer: BufferId, offset: i64, pointee: Type) -> Self {
        Self {
            buffer,
            offset,
            pointee,
        }
    }

    pub fn null(pointee: Type) -> Self {
        Self::new(BufferId::NULL, 0, pointee)
    }

    pub fn is_null(&self) -> bool {
        self.buffer.is_null() && self.offset == 0
    }

    /// The same location viewed as a different pointee type
    pub fn retyped(&self, pointee: Type) -> Self {
        Self::new(self.buffer, self.offset, pointee)
    }

    /// Ordering key used for pointer comparisons
    pub fn key(&self) -> (BufferId, i64) {
        (self.buffer, self.offset)
    }
}

/// Runtime values in the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Char(i8),
    Pointer(Pointer),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    /// Integer view of the value; chars are promoted
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Char(c) => Some(*c as i32),
            Value::Pointer(_) => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match self {
            Value::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Value::Pointer(_))
    }

    /// Truth value used by conditions and logical operators
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Char(c) => *c != 0,
            Value::Pointer(p) => !p.is_null(),
        }
    }

    /// Short type description for diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Int(_) => "int".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::Pointer(p) => format!("{}*", p.pointee),
        }
    }

    /// Convert the value for storage in a slot of type `target`.
    ///
    /// Integers truncate into `char`, chars widen into `int`, pointers may be
    /// retyped freely, and the integer constant 0 becomes a null pointer.
    pub fn convert_to(&self, target: &Type) -> Result<Value, MemoryError> {
        match (target, self) {
            (Type::Int, v) if !v.is_pointer() => Ok(Value::Int(v.as_int().unwrap_or_default())),
            (Type::Char, v) if !v.is_pointer() => {
                Ok(Value::Char(v.as_int().unwrap_or_default() as i8))
            }
            (Type::Pointer(pointee), Value::Pointer(p)) => {
                Ok(Value::Pointer(p.retyped((**pointee).clone())))
            }
            (Type::Pointer(pointee), v) if v.as_int() == Some(0) => {
                Ok(Value::Pointer(Pointer::null((**pointee).clone())))
            }
            _ => Err(MemoryError::Incompatible {
                expected: target.to_string(),
                found: self.type_name(),
            }),
        }
    }

    /// Encode as a slot of type `ty`; the value must already be converted.
    pub fn encode(&self, ty: &Type) -> Result<Vec<u8>, MemoryError> {
        match self.convert_to(ty)? {
            Value::Int(n) => Ok(n.to_le_bytes().to_vec()),
            Value::Char(c) => Ok(vec![c as u8]),
            Value::Pointer(p) => {
                let mut bytes = Vec::with_capacity(POINTER_SIZE);
                bytes.extend_from_slice(&p.buffer.0.to_le_bytes());
                let offset = i32::try_from(p.offset).map_err(|_| MemoryError::OffsetOverflow {
                    offset: p.offset as i128,
                })?;
                bytes.extend_from_slice(&offset.to_le_bytes());
                Ok(bytes)
            }
        }
    }

    /// Decode a slot of type `ty` from exactly `ty.size()` bytes
    pub fn decode(ty: &Type, bytes: &[u8]) -> Result<Value, MemoryError> {
        let word = |range: std::ops::Range<usize>| -> [u8; 4] {
            let mut out = [0u8; 4];
            out.copy_from_slice(&bytes[range]);
            out
        };

        if bytes.len() != ty.size() {
            return Err(MemoryError::Incompatible {
                expected: ty.to_string(),
                found: format!("{} bytes", bytes.len()),
            });
        }

        match ty {
            Type::Int => Ok(Value::Int(i32::from_le_bytes(word(0..4)))),
            Type::Char => Ok(Value::Char(bytes[0] as i8)),
            Type::Pointer(pointee) => Ok(Value::Pointer(Pointer::new(
                BufferId(u32::from_le_bytes(word(0..4))),
                i32::from_le_bytes(word(4..8)) as i64,
                (**pointee).clone(),
            ))),
            Type::Void | Type::Array(..) => Err(MemoryError::Incompatible {
                expected: "a scalar type".to_string(),
                found: ty.to_string(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Char(c) => write!(f, "'{}'", (*c as u8).escape_ascii()),
            Value::Pointer(p) if p.is_null() => write!(f, "NULL"),
            Value::Pointer(p) => write!(f, "{}+{}", p.buffer, p.offset),
        }
    }
}

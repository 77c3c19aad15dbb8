//! Buffer arena
//!
//! Every piece of addressable storage lives in a fixed-length, zero-filled
//! [`Buffer`] owned by the arena. Pointers refer to buffers by [`BufferId`];
//! ids are handed out monotonically and never reused, so a pointer that
//! outlives its buffer is detected as dangling instead of silently aliasing
//! a newer allocation.

use super::value::{BufferId, Pointer, Value};
use super::MemoryError;
use crate::parser::ast::Type;
use rustc_hash::FxHashMap;

/// What a buffer was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// String or array literal storage, retired with its activation
    Literal,
    /// A local variable or parameter, retired with its scope
    Local,
    /// An `argv` string or the `argv` table itself
    Argument,
}

/// A fixed-length byte region
#[derive(Debug, Clone)]
pub struct Buffer {
    bytes: Vec<u8>,
    owner: Owner,
}

impl Buffer {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The buffer arena
#[derive(Debug, Clone)]
pub struct Memory {
    buffers: FxHashMap<BufferId, Buffer>,
    next_id: u32,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        let mut buffers = FxHashMap::default();
        // Null pointers land here: any access is out of bounds
        buffers.insert(
            BufferId::NULL,
            Buffer {
                bytes: Vec::new(),
                owner: Owner::Literal,
            },
        );
        Memory {
            buffers,
            next_id: 1,
        }
    }

    /// Allocate a zero-filled buffer of `len` bytes
    pub fn allocate(&mut self, len: usize, owner: Owner) -> Result<BufferId, MemoryError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| MemoryError::AllocationFailed { len })?;
        bytes.resize(len, 0);
        self.allocate_with(bytes, owner)
    }

    /// Allocate a buffer holding exactly `bytes`
    pub fn allocate_with(&mut self, bytes: Vec<u8>, owner: Owner) -> Result<BufferId, MemoryError> {
        let id = BufferId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(MemoryError::Exhausted)?;
        self.buffers.insert(id, Buffer { bytes, owner });
        Ok(id)
    }

    /// Retire a buffer. Later accesses through any pointer into it fail.
    pub fn release(&mut self, id: BufferId) {
        if !id.is_null() {
            self.buffers.remove(&id);
        }
    }

    pub fn get(&self, id: BufferId) -> Result<&Buffer, MemoryError> {
        self.buffers.get(&id).ok_or(MemoryError::Dangling { buffer: id })
    }

    /// Number of live buffers, excluding the null buffer
    pub fn live_buffers(&self) -> usize {
        self.buffers.len() - 1
    }

    /// Validate `[offset, offset + width)` against the buffer and return it
    /// as a host range
    fn range(
        &self,
        id: BufferId,
        offset: i64,
        width: usize,
    ) -> Result<std::ops::Range<usize>, MemoryError> {
        let len = self.get(id)?.len();
        let out_of_bounds = MemoryError::OutOfBounds {
            buffer: id,
            offset,
            width,
            len,
        };

        let start = usize::try_from(offset).map_err(|_| out_of_bounds.clone())?;
        match start.checked_add(width) {
            Some(end) if end <= len => Ok(start..end),
            _ => Err(out_of_bounds),
        }
    }

    /// Bounds-checked read of `width` bytes
    pub fn read(&self, id: BufferId, offset: i64, width: usize) -> Result<&[u8], MemoryError> {
        let range = self.range(id, offset, width)?;
        Ok(&self.get(id)?.bytes[range])
    }

    /// Bounds-checked write
    pub fn write(&mut self, id: BufferId, offset: i64, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = self.range(id, offset, bytes.len())?;
        let buffer = self
            .buffers
            .get_mut(&id)
            .ok_or(MemoryError::Dangling { buffer: id })?;
        buffer.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Load the value a pointer refers to, interpreted per its pointee type.
    ///
    /// A pointer to an array yields a pointer to the array's first element.
    pub fn load(&self, ptr: &Pointer) -> Result<Value, MemoryError> {
        match &ptr.pointee {
            Type::Array(elem, _) => {
                // Touch the whole array so out-of-range rows are still caught
                self.range(ptr.buffer, ptr.offset, ptr.pointee.size())?;
                Ok(Value::Pointer(ptr.retyped((**elem).clone())))
            }
            Type::Void => Err(MemoryError::Incompatible {
                expected: "a typed pointer".to_string(),
                found: "void*".to_string(),
            }),
            ty => {
                let bytes = self.read(ptr.buffer, ptr.offset, ty.size())?;
                Value::decode(ty, bytes)
            }
        }
    }

    /// Store a value through a pointer, converting it to the pointee type
    pub fn store(&mut self, ptr: &Pointer, value: &Value) -> Result<Value, MemoryError> {
        let stored = value.convert_to(&ptr.pointee)?;
        let bytes = stored.encode(&ptr.pointee)?;
        self.write(ptr.buffer, ptr.offset, &bytes)?;
        Ok(stored)
    }
}

//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`CallStack`]: The call stack containing activation records
//! - [`ActivationRecord`]: A single call's scopes, literals and resume point
//! - [`Binding`]: A name bound to the buffer holding a local variable
//!
//! # Lifetimes
//!
//! Each block scope owns the buffers of the variables declared in it and
//! retires them when it is popped. Literal buffers created while a call runs
//! belong to its activation record and are retired when the call returns.
//! An activation keeps one buffer per literal in the source, so a literal
//! evaluated in a loop does not allocate again.

use super::buffer::Memory;
use super::value::{BufferId, Pointer};
use crate::parser::ast::{SourceLocation, Type};
use rustc_hash::FxHashMap;

/// A variable binding: the variable's storage and its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub buffer: BufferId,
    pub var_type: Type,
    pub is_const: bool,
}

impl Binding {
    /// Pointer to the variable's own storage
    pub fn place(&self) -> Pointer {
        Pointer::new(self.buffer, 0, self.var_type.clone())
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    names: FxHashMap<String, Binding>,
    buffers: Vec<BufferId>,
}

/// Activation record for a function call
#[derive(Debug, Clone)]
pub struct ActivationRecord {
    pub function: String,
    pub return_type: Type,
    /// Where the call was made; `None` for `main`
    pub call_site: Option<SourceLocation>,
    /// Continuation-stack height to restore when the call returns
    pub task_base: usize,
    /// Operand-stack height to restore when the call returns
    pub value_base: usize,
    scopes: Vec<Scope>,
    /// Literal buffers by the location of the literal that created them
    literals: FxHashMap<SourceLocation, BufferId>,
    /// Literal buffers replaced in `literals` but possibly still referenced
    retired_literals: Vec<BufferId>,
}

impl ActivationRecord {
    /// Create a record with one open scope for the parameters
    pub fn new(
        function: impl Into<String>,
        return_type: Type,
        call_site: Option<SourceLocation>,
        task_base: usize,
        value_base: usize,
    ) -> Self {
        ActivationRecord {
            function: function.into(),
            return_type,
            call_site,
            task_base,
            value_base,
            scopes: vec![Scope::default()],
            literals: FxHashMap::default(),
            retired_literals: Vec::new(),
        }
    }

    /// Enter a new scope
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Exit the current scope, retiring the buffers declared in it
    pub fn pop_scope(&mut self, memory: &mut Memory) {
        if let Some(scope) = self.scopes.pop() {
            for id in scope.buffers {
                memory.release(id);
            }
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare a variable in the innermost scope, shadowing any outer one
    pub fn declare(&mut self, name: impl Into<String>, binding: Binding) {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::default());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.buffers.push(binding.buffer);
            scope.names.insert(name.into(), binding);
        }
    }

    /// Find the innermost binding for `name`
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.names.get(name))
    }

    /// The buffer this call already holds for the literal at `site`
    pub fn literal(&self, site: SourceLocation) -> Option<BufferId> {
        self.literals.get(&site).copied()
    }

    /// Take ownership of a literal buffer for the rest of the call
    pub fn adopt_literal(&mut self, site: SourceLocation, id: BufferId) {
        if let Some(previous) = self.literals.insert(site, id) {
            self.retired_literals.push(previous);
        }
    }

    /// Retire every buffer owned by this activation
    pub fn release(mut self, memory: &mut Memory) {
        while !self.scopes.is_empty() {
            self.pop_scope(memory);
        }
        for id in self.literals.into_values().chain(self.retired_literals) {
            memory.release(id);
        }
    }
}

/// The call stack
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<ActivationRecord>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: ActivationRecord) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ActivationRecord> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current(&self) -> Option<&ActivationRecord> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ActivationRecord> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from outermost to innermost
    pub fn frames(&self) -> &[ActivationRecord] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::buffer::Owner;

    fn local(memory: &mut Memory, ty: Type) -> Binding {
        let buffer = memory.allocate(ty.size(), Owner::Local).unwrap();
        Binding {
            buffer,
            var_type: ty,
            is_const: false,
        }
    }

    #[test]
    fn test_shadowing_and_scope_exit() {
        let mut memory = Memory::new();
        let mut frame = ActivationRecord::new("main", Type::Int, None, 0, 0);

        let outer = local(&mut memory, Type::Int);
        frame.declare("x", outer.clone());

        frame.push_scope();
        let inner = local(&mut memory, Type::Char);
        frame.declare("x", inner.clone());
        assert_eq!(frame.lookup("x"), Some(&inner));

        frame.pop_scope(&mut memory);
        assert_eq!(frame.lookup("x"), Some(&outer));
        assert!(memory.get(inner.buffer).is_err());
        assert!(memory.get(outer.buffer).is_ok());
    }

    #[test]
    fn test_release_retires_locals_and_literals() {
        let mut memory = Memory::new();
        let mut frame = ActivationRecord::new("f", Type::Void, None, 0, 0);

        let var = local(&mut memory, Type::Int);
        frame.declare("x", var);
        frame.push_scope();
        let nested = local(&mut memory, Type::Int);
        frame.declare("y", nested);
        let site = SourceLocation::new(2, 9);
        let literal = memory.allocate_with(b"hi\0".to_vec(), Owner::Literal).unwrap();
        frame.adopt_literal(site, literal);
        assert_eq!(frame.literal(site), Some(literal));
        assert_eq!(frame.literal(SourceLocation::new(2, 10)), None);

        // A replaced buffer is still released with the call
        let wider = memory.allocate_with(b"wide\0".to_vec(), Owner::Literal).unwrap();
        frame.adopt_literal(site, wider);
        assert_eq!(frame.literal(site), Some(wider));

        assert_eq!(memory.live_buffers(), 4);
        frame.release(&mut memory);
        assert_eq!(memory.live_buffers(), 0);
    }

    #[test]
    fn test_call_stack_order() {
        let mut stack = CallStack::new();
        stack.push(ActivationRecord::new("main", Type::Int, None, 0, 0));
        stack.push(ActivationRecord::new(
            "f",
            Type::Int,
            Some(SourceLocation::new(3, 5)),
            4,
            1,
        ));

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().map(|f| f.function.as_str()), Some("f"));
        let popped = stack.pop().unwrap();
        assert_eq!(popped.task_base, 4);
        assert_eq!(stack.frames()[0].function, "main");
    }
}

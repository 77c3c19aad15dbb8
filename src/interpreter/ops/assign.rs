use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::buffer::Owner;
use crate::memory::stack::Binding;
use crate::memory::value::{BufferId, Pointer, Value};
use crate::parser::ast::*;
use std::io::Write;

impl<'p, W: Write> Interpreter<'p, W> {
    /// `lhs = rhs`: the place and the value are on the stack
    pub(crate) fn assign(&mut self, location: SourceLocation) -> Result<(), RuntimeError> {
        let value = self.pop_value()?;
        let place = self.pop_place(location)?;
        let stored = self.store_scalar(&place, &value, location)?;
        self.values.push(stored);
        Ok(())
    }

    /// `lhs op= rhs`: the left side is evaluated once
    pub(crate) fn compound_assign(&mut self, op: BinOp, location: SourceLocation) -> Result<(), RuntimeError> {
        let rhs = self.pop_value()?;
        let place = self.pop_place(location)?;
        let current = self
            .memory
            .load(&place)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        let result = Self::binary_op(op, &current, &rhs, location)?;
        let stored = self.store_scalar(&place, &result, location)?;
        self.values.push(stored);
        Ok(())
    }

    fn store_scalar(&mut self, place: &Pointer, value: &Value, location: SourceLocation) -> Result<Value, RuntimeError> {
        if place.pointee.is_array() {
            return Err(RuntimeError::TypeMismatch {
                expected: "assignable scalar".to_string(),
                got: format!("array {}", place.pointee),
                location,
            });
        }
        self.memory
            .store(place, value)
            .map_err(|e| RuntimeError::from_memory(e, location))
    }

    /// Materialise a standalone array literal into the running call's buffer
    /// for it and push a pointer to its first element. The element type
    /// follows the first element.
    pub(crate) fn build_array(&mut self, count: usize, location: SourceLocation) -> Result<(), RuntimeError> {
        let elements = self.pop_values(count)?;
        let elem_type = match elements.first() {
            Some(Value::Char(_)) => Type::Char,
            Some(Value::Pointer(p)) => p.pointee.clone().with_pointer(),
            _ => Type::Int,
        };

        let id = self.literal_buffer(&elem_type, &elements, location)?;
        self.values.push(Value::Pointer(Pointer::new(id, 0, elem_type)));
        Ok(())
    }

    /// Fill the literal buffer for the literal at `location` with `elements`
    /// as consecutive `elem_type` slots
    fn literal_buffer(
        &mut self,
        elem_type: &Type,
        elements: &[Value],
        location: SourceLocation,
    ) -> Result<BufferId, RuntimeError> {
        let mem_err = |e| RuntimeError::from_memory(e, location);

        let len = elements
            .len()
            .checked_mul(elem_type.size())
            .ok_or_else(|| RuntimeError::BoundsError {
                message: format!("array literal of {} elements is too large", elements.len()),
                location,
            })?;
        let id = self.literal_storage(location, len)?;

        for (i, value) in elements.iter().enumerate() {
            let slot = Pointer::new(id, (i * elem_type.size()) as i64, elem_type.clone());
            self.memory.store(&slot, value).map_err(mem_err)?;
        }
        Ok(id)
    }

    /// Create the variable for a declaration. Initializer values, if any,
    /// are on the stack: one per leaf for array literals, none for a string
    /// copied into a `char` array, otherwise one.
    pub(crate) fn declare(&mut self, decl: &'p AstNode, as_expr: bool) -> Result<(), RuntimeError> {
        let AstNode::VarDecl {
            name,
            var_type,
            is_const,
            init,
            location,
        } = decl
        else {
            return Err(RuntimeError::internal("expected a declaration", decl.location()));
        };
        let location = *location;
        let mem_err = |e| RuntimeError::from_memory(e, location);

        if *var_type == Type::Void {
            return Err(RuntimeError::TypeMismatch {
                expected: "object type".to_string(),
                got: format!("void variable '{}'", name),
                location,
            });
        }

        let buffer = self
            .memory
            .allocate(var_type.size(), Owner::Local)
            .map_err(mem_err)?;
        let binding = Binding {
            buffer,
            var_type: var_type.clone(),
            // Only scalars are read-only; `const char *s` still points at mutable bytes
            is_const: *is_const && !var_type.is_pointer(),
        };
        let place = binding.place();

        // Bind before initializing so a failed initializer still retires the buffer
        self.frame_mut()?.declare(name.as_str(), binding);

        match (var_type, init.as_deref()) {
            (_, None) => {}

            (Type::Array(elem, len), Some(AstNode::StringLiteral(bytes, _))) => {
                if **elem != Type::Char || bytes.len() > *len {
                    return Err(RuntimeError::TypeMismatch {
                        expected: var_type.to_string(),
                        got: format!("string literal of length {}", bytes.len()),
                        location,
                    });
                }
                // The NUL is only written when it fits; the rest is already zero
                self.memory.write(buffer, 0, bytes).map_err(mem_err)?;
            }

            (Type::Array(..), Some(literal @ AstNode::ArrayLiteral { .. })) => {
                let leaves = Self::literal_leaves(literal).len();
                let values = self.pop_values(leaves)?;

                let mut slots = Vec::with_capacity(leaves);
                layout_slots(literal, var_type, 0, &mut slots, location)?;

                let scalar = scalar_type(var_type);
                for (slot, value) in slots.into_iter().zip(&values) {
                    let target = Pointer::new(buffer, (slot * scalar.size()) as i64, scalar.clone());
                    self.memory.store(&target, value).map_err(mem_err)?;
                }
            }

            (Type::Array(..), Some(other)) => {
                return Err(RuntimeError::TypeMismatch {
                    expected: format!("initializer list for {}", var_type),
                    got: node_kind(other).to_string(),
                    location,
                })
            }

            // `int *arr = {1, 2, 3};` binds the pointer to a fresh buffer
            (Type::Pointer(pointee), Some(literal @ AstNode::ArrayLiteral { .. })) => {
                if **pointee == Type::Void || pointee.is_array() {
                    return Err(RuntimeError::TypeMismatch {
                        expected: "pointer to a scalar type".to_string(),
                        got: var_type.to_string(),
                        location,
                    });
                }
                let leaves = Self::literal_leaves(literal).len();
                let values = self.pop_values(leaves)?;
                let id = self.literal_buffer(pointee, &values, literal.location())?;
                let start = Value::Pointer(Pointer::new(id, 0, (**pointee).clone()));
                self.memory.store(&place, &start).map_err(mem_err)?;
            }

            (_, Some(_)) => {
                let value = self.pop_value()?;
                self.memory.store(&place, &value).map_err(mem_err)?;
            }
        }

        if as_expr {
            let value = self.memory.load(&place).map_err(mem_err)?;
            self.values.push(value);
        }
        Ok(())
    }
}

/// Innermost element type of a (possibly nested) array
fn scalar_type(ty: &Type) -> &Type {
    match ty {
        Type::Array(elem, _) => scalar_type(elem),
        other => other,
    }
}

/// Number of scalar slots an object of type `ty` occupies
fn scalar_count(ty: &Type) -> usize {
    match ty {
        Type::Array(elem, n) => n * scalar_count(elem),
        _ => 1,
    }
}

/// Assign each leaf of `literal` a scalar slot index within an object of
/// type `ty` starting at slot `base`. A nested brace list starts at the
/// next whole sub-array; bare scalars fill slots one after another.
fn layout_slots(
    literal: &AstNode,
    ty: &Type,
    base: usize,
    slots: &mut Vec<usize>,
    location: SourceLocation,
) -> Result<(), RuntimeError> {
    let too_many = || RuntimeError::TypeMismatch {
        expected: format!("at most {} initializers for {}", scalar_count(ty), ty),
        got: "more".to_string(),
        location,
    };

    let (AstNode::ArrayLiteral { elements, .. }, Type::Array(elem, _)) = (literal, ty) else {
        return Err(RuntimeError::TypeMismatch {
            expected: ty.to_string(),
            got: "initializer list".to_string(),
            location,
        });
    };

    let total = scalar_count(ty);
    let width = scalar_count(elem);
    let mut cursor: usize = 0;

    for element in elements {
        match element {
            AstNode::ArrayLiteral { .. } => {
                cursor = cursor.div_ceil(width) * width;
                if cursor + width > total {
                    return Err(too_many());
                }
                layout_slots(element, elem, base + cursor, slots, location)?;
                cursor += width;
            }
            _ => {
                if cursor >= total {
                    return Err(too_many());
                }
                slots.push(base + cursor);
                cursor += 1;
            }
        }
    }
    Ok(())
}

fn node_kind(node: &AstNode) -> &'static str {
    match node {
        AstNode::StringLiteral(..) => "string literal",
        AstNode::IntLiteral(..) | AstNode::CharLiteral(..) => "scalar literal",
        _ => "expression",
    }
}

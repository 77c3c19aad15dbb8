//! Expression evaluation
//!
//! Every expression leaves exactly one value on the operand stack. Operands
//! are scheduled so they run strictly left to right; `&&` and `||` only
//! schedule their right operand when it can change the result.
//!
//! Lvalues are evaluated by [`Interpreter::eval_place`], which pushes a
//! pointer to the storage instead of its contents. Reading a variable, a
//! dereference or an index is "compute the place, then load".

use crate::interpreter::constants::{PRINT_ARITY, PRINT_INTRINSIC};
use crate::interpreter::engine::{Access, Callee, Interpreter, Task};
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::{Pointer, Value};
use crate::parser::ast::*;
use std::io::Write;

impl<'p, W: Write> Interpreter<'p, W> {
    pub(crate) fn eval_expression(&mut self, node: &'p AstNode) -> Result<(), RuntimeError> {
        match node {
            AstNode::IntLiteral(n, _) => self.values.push(Value::Int(*n)),
            AstNode::CharLiteral(c, _) => self.values.push(Value::Char(*c)),

            AstNode::StringLiteral(bytes, location) => {
                let value = self.string_literal(bytes, *location)?;
                self.values.push(value);
            }

            AstNode::ArrayLiteral { elements, location } => {
                self.tasks.push(Task::BuildArray {
                    count: elements.len(),
                    location: *location,
                });
                for element in elements.iter().rev() {
                    self.tasks.push(Task::Eval(element));
                }
            }

            AstNode::Variable(name, location) => {
                let place = self.lookup(name, *location)?.place();
                let value = self
                    .memory
                    .load(&place)
                    .map_err(|e| RuntimeError::from_memory(e, *location))?;
                self.values.push(value);
            }

            AstNode::BinaryOp {
                op: op @ (BinOp::And | BinOp::Or),
                left,
                right,
                ..
            } => {
                self.tasks.push(Task::LogicalRhs { op: *op, right });
                self.tasks.push(Task::Eval(left));
            }

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                self.tasks.push(Task::Binary {
                    op: *op,
                    location: *location,
                });
                self.tasks.push(Task::Eval(right));
                self.tasks.push(Task::Eval(left));
            }

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } if op.is_increment() => {
                self.tasks.push(Task::IncDec {
                    op: *op,
                    location: *location,
                });
                self.tasks.push(Task::Place(operand, Access::Write));
            }

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => {
                self.tasks.push(Task::Unary {
                    op: *op,
                    location: *location,
                });
                self.tasks.push(Task::Eval(operand));
            }

            AstNode::Deref { location, .. } | AstNode::ArrayAccess { location, .. } => {
                self.tasks.push(Task::Load {
                    location: *location,
                });
                self.tasks.push(Task::Place(node, Access::Read));
            }

            // The address of an lvalue is its place
            AstNode::AddressOf { operand, .. } => {
                self.tasks.push(Task::Place(operand, Access::Read));
            }

            AstNode::Assignment { lhs, rhs, location } => {
                self.tasks.push(Task::Assign {
                    location: *location,
                });
                self.tasks.push(Task::Eval(rhs));
                self.tasks.push(Task::Place(lhs, Access::Write));
            }

            AstNode::CompoundAssignment {
                lhs,
                op,
                rhs,
                location,
            } => {
                self.tasks.push(Task::CompoundAssign {
                    op: *op,
                    location: *location,
                });
                self.tasks.push(Task::Eval(rhs));
                self.tasks.push(Task::Place(lhs, Access::Write));
            }

            AstNode::FunctionCall {
                name,
                args,
                location,
            } => {
                let callee = self.resolve_callee(name, args.len(), *location)?;
                self.tasks.push(Task::Call {
                    callee,
                    argc: args.len(),
                    location: *location,
                });
                for arg in args.iter().rev() {
                    self.tasks.push(Task::Eval(arg));
                }
            }

            // `(int x = 0)` declares `x` and yields the stored value
            AstNode::VarDecl { .. } => self.schedule_declaration(node, true)?,

            other => {
                return Err(RuntimeError::internal(
                    "statement used as an expression",
                    other.location(),
                ))
            }
        }
        Ok(())
    }

    /// Evaluate an lvalue, pushing a pointer to its storage
    pub(crate) fn eval_place(&mut self, node: &'p AstNode, access: Access) -> Result<(), RuntimeError> {
        match node {
            AstNode::Variable(name, location) => {
                let binding = self.lookup(name, *location)?;
                if access == Access::Write && binding.is_const {
                    return Err(RuntimeError::ConstModification {
                        var: name.clone(),
                        location: *location,
                    });
                }
                let place = binding.place();
                self.values.push(Value::Pointer(place));
            }

            // The place of `*p` is the value of `p`
            AstNode::Deref { operand, location } => {
                self.tasks.push(Task::CheckPointer {
                    location: *location,
                });
                self.tasks.push(Task::Eval(operand));
            }

            // `a[i]` is `*(a + i)`
            AstNode::ArrayAccess {
                array,
                index,
                location,
            } => {
                self.tasks.push(Task::Index {
                    location: *location,
                });
                self.tasks.push(Task::Eval(index));
                self.tasks.push(Task::Eval(array));
            }

            other => {
                return Err(RuntimeError::TypeMismatch {
                    expected: "an assignable expression".to_string(),
                    got: "a value".to_string(),
                    location: other.location(),
                })
            }
        }
        Ok(())
    }

    /// Left operand of `&&` / `||` is on the stack
    pub(crate) fn logical_rhs(&mut self, op: BinOp, right: &'p AstNode) -> Result<(), RuntimeError> {
        let left = self.pop_value()?.is_truthy();

        match (op, left) {
            (BinOp::Or, true) => self.values.push(Value::Int(1)),
            (BinOp::And, false) => self.values.push(Value::Int(0)),
            _ => {
                self.tasks.push(Task::ToBool);
                self.tasks.push(Task::Eval(right));
            }
        }
        Ok(())
    }

    /// Fill the running call's buffer for this string literal with its bytes
    /// and a NUL, undoing any writes made through an earlier evaluation
    fn string_literal(&mut self, bytes: &[u8], location: SourceLocation) -> Result<Value, RuntimeError> {
        let mut contents = bytes.to_vec();
        contents.push(0);
        let id = self.literal_storage(location, contents.len())?;
        self.memory
            .write(id, 0, &contents)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        Ok(Value::Pointer(Pointer::new(id, 0, Type::Char)))
    }

    /// Find the target of a call and check its arity before any argument is
    /// evaluated. User functions shadow intrinsics.
    fn resolve_callee(
        &self,
        name: &str,
        argc: usize,
        location: SourceLocation,
    ) -> Result<Callee<'p>, RuntimeError> {
        let (callee, expected) = if let Some(function) = self.functions.get(name) {
            (Callee::User(*function), function.params.len())
        } else if name == PRINT_INTRINSIC {
            (Callee::Print, PRINT_ARITY)
        } else {
            return Err(RuntimeError::UndefinedSymbol {
                kind: "function",
                name: name.to_string(),
                location,
            });
        };

        if argc != expected {
            return Err(RuntimeError::ArityMismatch {
                function: name.to_string(),
                expected,
                got: argc,
                location,
            });
        }
        Ok(callee)
    }

    /// Arguments are on the stack, in order
    pub(crate) fn call(
        &mut self,
        callee: Callee<'p>,
        argc: usize,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let args = self.pop_values(argc)?;

        match callee {
            Callee::User(function) => self.enter_function(function, args, Some(location)),
            Callee::Print => {
                let result = self.builtin_print(&args, location)?;
                self.values.push(result);
                Ok(())
            }
        }
    }
}

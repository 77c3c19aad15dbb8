use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::pointer_add;
use crate::memory::value::Value;
use crate::parser::ast::{SourceLocation, UnOp};
use std::io::Write;

impl<'p, W: Write> Interpreter<'p, W> {
    /// `-x` and `!x`
    pub(crate) fn unary_op(op: UnOp, operand: &Value, location: SourceLocation) -> Result<Value, RuntimeError> {
        match op {
            UnOp::Not => Ok(Value::Int(!operand.is_truthy() as i32)),
            UnOp::Neg => match operand.as_int() {
                Some(n) => Ok(Value::Int(n.wrapping_neg())),
                None => Err(RuntimeError::TypeMismatch {
                    expected: "int operand for '-'".to_string(),
                    got: operand.type_name(),
                    location,
                }),
            },
            _ => Err(RuntimeError::internal(
                format!("{:?} needs an lvalue", op),
                location,
            )),
        }
    }

    /// `++` / `--` in both forms. The operand's place is on the stack.
    ///
    /// Prefix forms yield the stored result, postfix forms the value read.
    pub(crate) fn inc_dec(&mut self, op: UnOp, location: SourceLocation) -> Result<(), RuntimeError> {
        let place = self.pop_place(location)?;
        let old = self
            .memory
            .load(&place)
            .map_err(|e| RuntimeError::from_memory(e, location))?;

        let delta = match op {
            UnOp::PreInc | UnOp::PostInc => 1,
            _ => -1,
        };

        let updated = match &old {
            Value::Pointer(p) if !place.pointee.is_array() => Value::Pointer(
                pointer_add(p, delta).map_err(|e| RuntimeError::from_memory(e, location))?,
            ),
            Value::Int(_) | Value::Char(_) => {
                Value::Int(old.as_int().unwrap_or_default().wrapping_add(delta))
            }
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    expected: "scalar operand".to_string(),
                    got: place.pointee.to_string(),
                    location,
                })
            }
        };

        let stored = self
            .memory
            .store(&place, &updated)
            .map_err(|e| RuntimeError::from_memory(e, location))?;

        let result = match op {
            UnOp::PostInc | UnOp::PostDec => old,
            _ => stored,
        };
        self.values.push(result);
        Ok(())
    }
}

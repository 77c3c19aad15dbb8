use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::memory::{pointer_add, pointer_diff};
use crate::parser::ast::{BinOp, SourceLocation};
use std::cmp::Ordering;
use std::io::Write;

impl<'p, W: Write> Interpreter<'p, W> {
    /// Apply a non-short-circuit binary operator.
    ///
    /// Integer arithmetic wraps on overflow. Chars are promoted to int.
    /// Pointers support `p + n`, `n + p`, `p - n`, `p - q` and comparisons;
    /// a pointer compares equal to the constant 0 only when null.
    pub(crate) fn binary_op(
        op: BinOp,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match (left, right) {
            (Value::Pointer(p), Value::Pointer(q)) => match op {
                BinOp::Sub => pointer_diff(p, q)
                    .map(Value::Int)
                    .map_err(|e| RuntimeError::from_memory(e, location)),
                _ => match compare(op, p.key().cmp(&q.key())) {
                    Some(result) => Ok(result),
                    None => Err(Self::operand_error(op, left, right, location)),
                },
            },

            (Value::Pointer(p), other) | (other, Value::Pointer(p)) => {
                let Some(n) = other.as_int() else {
                    return Err(Self::operand_error(op, left, right, location));
                };
                let pointer_on_left = left.is_pointer();

                match op {
                    BinOp::Add => pointer_add(p, n)
                        .map(Value::Pointer)
                        .map_err(|e| RuntimeError::from_memory(e, location)),
                    BinOp::Sub if pointer_on_left => pointer_add(p, n.wrapping_neg())
                        .map(Value::Pointer)
                        .map_err(|e| RuntimeError::from_memory(e, location)),
                    BinOp::Eq | BinOp::Ne if n == 0 => {
                        let equal = p.is_null();
                        Ok(Value::Int((equal == (op == BinOp::Eq)) as i32))
                    }
                    _ => Err(Self::operand_error(op, left, right, location)),
                }
            }

            _ => {
                let (a, b) = match (left.as_int(), right.as_int()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(Self::operand_error(op, left, right, location)),
                };
                Self::int_op(op, a, b, location)
            }
        }
    }

    fn int_op(op: BinOp, a: i32, b: i32, location: SourceLocation) -> Result<Value, RuntimeError> {
        let result = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div | BinOp::Mod if b == 0 => {
                return Err(RuntimeError::DivideByZero {
                    operation: if op == BinOp::Div { "Division" } else { "Modulo" },
                    location,
                })
            }
            BinOp::Div => a.wrapping_div(b),
            BinOp::Mod => a.wrapping_rem(b),
            _ => {
                return compare(op, a.cmp(&b)).ok_or_else(|| {
                    RuntimeError::internal(format!("'{}' is not an arithmetic operator", op), location)
                })
            }
        };
        Ok(Value::Int(result))
    }

    fn operand_error(op: BinOp, left: &Value, right: &Value, location: SourceLocation) -> RuntimeError {
        RuntimeError::TypeMismatch {
            expected: format!("operands valid for '{}'", op),
            got: format!("{} and {}", left.type_name(), right.type_name()),
            location,
        }
    }
}

/// Evaluate a comparison operator against an ordering, or `None` if `op`
/// is not a comparison
fn compare(op: BinOp, ordering: Ordering) -> Option<Value> {
    let holds = match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Ne => ordering != Ordering::Equal,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Le => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Ge => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Value::Int(holds as i32))
}

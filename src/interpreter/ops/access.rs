use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::pointer_add;
use crate::memory::value::{Pointer, Value};
use crate::parser::ast::SourceLocation;
use std::io::Write;

impl<'p, W: Write> Interpreter<'p, W> {
    /// Pop a place computed by `eval_place`
    pub(crate) fn pop_place(&mut self, location: SourceLocation) -> Result<Pointer, RuntimeError> {
        match self.pop_value()? {
            Value::Pointer(p) => Ok(p),
            other => Err(RuntimeError::internal(
                format!("expected a place, found {}", other.type_name()),
                location,
            )),
        }
    }

    /// Replace the place on top of the stack with the value stored there
    pub(crate) fn load_place(&mut self, location: SourceLocation) -> Result<(), RuntimeError> {
        let place = self.pop_place(location)?;
        let value = self
            .memory
            .load(&place)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        self.values.push(value);
        Ok(())
    }

    /// The operand of `*` must be a pointer; it becomes the place
    pub(crate) fn check_pointer(&mut self, location: SourceLocation) -> Result<(), RuntimeError> {
        let value = self.pop_value()?;
        if !value.is_pointer() {
            return Err(RuntimeError::TypeMismatch {
                expected: "pointer operand for '*'".to_string(),
                got: value.type_name(),
                location,
            });
        }
        self.values.push(value);
        Ok(())
    }

    /// Compute the place of `base[index]`, accepting `index[base]` as well
    pub(crate) fn index(&mut self, location: SourceLocation) -> Result<(), RuntimeError> {
        let index = self.pop_value()?;
        let base = self.pop_value()?;

        let (ptr, n) = match (&base, &index) {
            (Value::Pointer(p), i) | (i, Value::Pointer(p)) if !i.is_pointer() => {
                (p, i.as_int().unwrap_or_default())
            }
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    expected: "pointer and int operands for '[]'".to_string(),
                    got: format!("{} and {}", base.type_name(), index.type_name()),
                    location,
                })
            }
        };

        let place = pointer_add(ptr, n).map_err(|e| RuntimeError::from_memory(e, location))?;
        self.values.push(Value::Pointer(place));
        Ok(())
    }
}

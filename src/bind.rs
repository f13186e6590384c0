//! The pattern binder: destructures a formal-parameter tree against an
//! operand tree, installing bindings in a target frame.

use tracing::trace;

use crate::error::{VauError, VauResult};
use crate::eval::Machine;
use crate::symbol::sym;
use crate::value::{EnvId, Value};

impl Machine {
    /// Match `pattern` against `operands`, binding in `target`'s own frame.
    ///
    /// A bare symbol pattern binds the entire remaining operand tree, so a
    /// dotted "rest" tail and a whole-operand-list formal are the same
    /// rule. `#ignore` consumes its position without binding. Pair
    /// patterns destructure pairs in lockstep; running out of operands
    /// (or hitting an atom where a pair is required) is a binding
    /// mismatch.
    pub fn bind(&mut self, pattern: Value, operands: Value, target: EnvId) -> VauResult<()> {
        let mut pattern = pattern;
        let mut operands = operands;
        loop {
            match pattern {
                Value::Nil => {
                    if operands.is_nil() {
                        return Ok(());
                    }
                    return Err(self.bind_mismatch(pattern, operands));
                }
                Value::Symbol(sym::IGNORE) => return Ok(()),
                Value::Symbol(name) => {
                    trace!(name = self.symbols.name(name), "bind");
                    self.envs.define(target, name, operands);
                    return Ok(());
                }
                Value::Pair(pattern_cell) => match operands {
                    Value::Pair(operand_cell) => {
                        let first_pattern = self.heap.head(pattern_cell);
                        let first_operand = self.heap.head(operand_cell);
                        self.bind(first_pattern, first_operand, target)?;
                        pattern = self.heap.tail(pattern_cell);
                        operands = self.heap.tail(operand_cell);
                    }
                    _ => return Err(self.bind_mismatch(pattern, operands)),
                },
                other => {
                    // Literals (ints, bools, strings, ...) are not valid
                    // formals.
                    return Err(VauError::TypeMismatch {
                        expected: "symbol, #ignore, nil, or pair in formal pattern".into(),
                        actual: other.kind_name().into(),
                    });
                }
            }
        }
    }

    fn bind_mismatch(&self, pattern: Value, operands: Value) -> VauError {
        VauError::ArityMismatch {
            expected: self.show(pattern),
            actual: self.show(operands),
        }
    }
}

//! Host primitive bodies. Dispatch is by `PrimOp` tag; arity was already
//! checked by the evaluator against the registered contract.

use crate::combiner::{Operative, PrimOp};
use crate::error::{VauError, VauResult};
use crate::eval::Machine;
use crate::symbol::sym;
use crate::value::{EnvId, Value};

impl Machine {
    pub(crate) fn call_primitive(
        &mut self,
        op: PrimOp,
        args: Value,
        dyn_env: EnvId,
        depth: usize,
    ) -> VauResult<Value> {
        match op {
            PrimOp::Vau => self.prim_vau(args, dyn_env),
            PrimOp::Define => self.prim_define(args, dyn_env, depth),
            PrimOp::Set => self.prim_set(args, dyn_env, depth),
            PrimOp::Wrap => self.prim_wrap(args),
            PrimOp::Unwrap => self.prim_unwrap(args),
            // Tail-transparent `eval` is intercepted by the evaluator;
            // reaching it here means a non-tail host-side call, which is
            // still well-defined.
            PrimOp::Eval => {
                let expr = self.heap.head_val(args)?;
                let env_arg = self.heap.head_val(self.heap.tail_val(args)?)?;
                let target = self.env_arg(env_arg)?;
                self.eval_at(expr, target, depth + 1)
            }
            PrimOp::MakeEnvironment => self.prim_make_environment(args),
            PrimOp::Cons => self.prim_cons(args),
            PrimOp::Head => self.heap.head_val(self.heap.head_val(args)?),
            PrimOp::Tail => self.heap.tail_val(self.heap.head_val(args)?),
            PrimOp::SetHead => self.prim_set_head(args),
            PrimOp::SetTail => self.prim_set_tail(args),
            PrimOp::Equal => self.prim_equal(args),
            PrimOp::Less => self.prim_less(args),
            PrimOp::Add => self.prim_add(args),
            PrimOp::Sub => self.prim_sub(args),
            PrimOp::Mul => self.prim_mul(args),
            PrimOp::Quotient => self.prim_division(args, DivisionOp::Quotient),
            PrimOp::Remainder => self.prim_division(args, DivisionOp::Remainder),
            PrimOp::Modulo => self.prim_division(args, DivisionOp::Modulo),
            PrimOp::IsNull => self.prim_predicate(args, |v| v.is_nil()),
            PrimOp::IsPair => self.prim_predicate(args, Value::is_pair),
            PrimOp::IsSymbol => self.prim_predicate(args, Value::is_symbol),
            PrimOp::IsInteger => self.prim_predicate(args, |v| matches!(v, Value::Int(_))),
            PrimOp::IsBoolean => self.prim_predicate(args, |v| matches!(v, Value::Bool(_))),
            PrimOp::IsString => self.prim_predicate(args, |v| matches!(v, Value::Str(_))),
            PrimOp::IsOperative => {
                self.prim_predicate(args, |v| matches!(v, Value::Operative(_)))
            }
            PrimOp::IsApplicative => {
                self.prim_predicate(args, |v| matches!(v, Value::Applicative(_)))
            }
            PrimOp::IsCombiner => self.prim_predicate(args, Value::is_combiner),
            PrimOp::IsEnvironment => self.prim_predicate(args, |v| matches!(v, Value::Env(_))),
            PrimOp::Write => self.prim_write(args),
            PrimOp::Newline => {
                println!();
                Ok(Value::Nil)
            }
        }
    }

    /// ($vau formals env-param . body) — construct an operative closing
    /// over the environment in which `$vau` is evaluated.
    fn prim_vau(&mut self, args: Value, dyn_env: EnvId) -> VauResult<Value> {
        let formals = self.heap.head_val(args)?;
        let rest = self.heap.tail_val(args)?;
        let env_param_val = self.heap.head_val(rest)?;
        let body = self.heap.tail_val(rest)?;

        self.check_formals(formals)?;

        let env_param = match env_param_val {
            Value::Symbol(sym::IGNORE) => None,
            Value::Symbol(name) => {
                if self.formals_contain(formals, name) {
                    return Err(VauError::TypeMismatch {
                        expected: "environment parameter distinct from the formals".into(),
                        actual: self.symbols.name(name).to_string(),
                    });
                }
                Some(name)
            }
            other => {
                return Err(VauError::TypeMismatch {
                    expected: "symbol or #ignore as environment parameter".into(),
                    actual: other.kind_name().into(),
                })
            }
        };

        if !self.heap.is_proper_list(body) {
            return Err(VauError::TypeMismatch {
                expected: "proper list as operative body".into(),
                actual: self.show(body),
            });
        }

        let id = self.operatives.alloc(Operative {
            static_env: dyn_env,
            formals,
            env_param,
            body,
        });
        Ok(Value::Operative(id))
    }

    /// ($define! pattern expr) — evaluate `expr` in the caller's
    /// environment and bind the pattern against it in that same frame.
    /// A bare symbol is the degenerate pattern.
    fn prim_define(&mut self, args: Value, dyn_env: EnvId, depth: usize) -> VauResult<Value> {
        let pattern = self.heap.head_val(args)?;
        let expr = self.heap.head_val(self.heap.tail_val(args)?)?;
        let value = self.eval_at(expr, dyn_env, depth + 1)?;
        self.bind(pattern, value, dyn_env)?;
        Ok(Value::Nil)
    }

    /// ($set! name expr) — evaluate `expr`, then mutate the frame that
    /// owns `name`, wherever in the chain it lives.
    fn prim_set(&mut self, args: Value, dyn_env: EnvId, depth: usize) -> VauResult<Value> {
        let name_val = self.heap.head_val(args)?;
        let expr = self.heap.head_val(self.heap.tail_val(args)?)?;
        let name = match name_val {
            Value::Symbol(name) if name != sym::IGNORE => name,
            Value::Symbol(_) => {
                return Err(VauError::TypeMismatch {
                    expected: "symbol".into(),
                    actual: "#ignore".into(),
                })
            }
            other => {
                return Err(VauError::TypeMismatch {
                    expected: "symbol".into(),
                    actual: other.kind_name().into(),
                })
            }
        };
        let value = self.eval_at(expr, dyn_env, depth + 1)?;
        if !self.envs.assign(dyn_env, name, value) {
            return Err(VauError::UnboundSymbol(self.symbols.name(name).to_string()));
        }
        Ok(Value::Nil)
    }

    /// (wrap combiner) — build an applicative around any combiner.
    fn prim_wrap(&mut self, args: Value) -> VauResult<Value> {
        let inner = self.heap.head_val(args)?;
        if !inner.is_combiner() {
            return Err(VauError::TypeMismatch {
                expected: "combiner".into(),
                actual: inner.kind_name().into(),
            });
        }
        let id = self.applicatives.alloc(inner);
        Ok(Value::Applicative(id))
    }

    /// (unwrap applicative) — extract the underlying combiner.
    fn prim_unwrap(&mut self, args: Value) -> VauResult<Value> {
        match self.heap.head_val(args)? {
            Value::Applicative(id) => Ok(self.applicatives.inner(id)),
            other => Err(VauError::TypeMismatch {
                expected: "applicative".into(),
                actual: other.kind_name().into(),
            }),
        }
    }

    /// (make-environment [parent]) — fresh empty frame.
    fn prim_make_environment(&mut self, args: Value) -> VauResult<Value> {
        let parent = match args {
            Value::Nil => None,
            _ => Some(self.env_arg(self.heap.head_val(args)?)?),
        };
        Ok(Value::Env(self.envs.create(parent)))
    }

    /// (cons a b) — allocate a new mutable pair.
    fn prim_cons(&mut self, args: Value) -> VauResult<Value> {
        let head = self.heap.head_val(args)?;
        let tail = self.heap.head_val(self.heap.tail_val(args)?)?;
        let id = self.heap.alloc(head, tail);
        Ok(Value::Pair(id))
    }

    /// (set-head! pair v) / (set-tail! pair v) — mutate a pair in place.
    fn prim_set_head(&mut self, args: Value) -> VauResult<Value> {
        let target = self.heap.head_val(args)?;
        let value = self.heap.head_val(self.heap.tail_val(args)?)?;
        match target {
            Value::Pair(id) => {
                self.heap.set_head(id, value);
                Ok(Value::Nil)
            }
            other => Err(VauError::TypeMismatch {
                expected: "pair".into(),
                actual: other.kind_name().into(),
            }),
        }
    }

    fn prim_set_tail(&mut self, args: Value) -> VauResult<Value> {
        let target = self.heap.head_val(args)?;
        let value = self.heap.head_val(self.heap.tail_val(args)?)?;
        match target {
            Value::Pair(id) => {
                self.heap.set_tail(id, value);
                Ok(Value::Nil)
            }
            other => Err(VauError::TypeMismatch {
                expected: "pair".into(),
                actual: other.kind_name().into(),
            }),
        }
    }

    /// (= a b) — structural equality.
    fn prim_equal(&mut self, args: Value) -> VauResult<Value> {
        let a = self.heap.head_val(args)?;
        let b = self.heap.head_val(self.heap.tail_val(args)?)?;
        Ok(Value::Bool(self.structural_eq(a, b)))
    }

    /// (< a b) — defined only between integers.
    fn prim_less(&mut self, args: Value) -> VauResult<Value> {
        let a = self.int_arg(self.heap.head_val(args)?)?;
        let b = self.int_arg(self.heap.head_val(self.heap.tail_val(args)?)?)?;
        Ok(Value::Bool(a < b))
    }

    /// (+ a ...) — sum, empty sum is 0.
    fn prim_add(&mut self, args: Value) -> VauResult<Value> {
        let mut total: i64 = 0;
        for item in self.int_args(args)? {
            total = total.checked_add(item).ok_or(VauError::IntegerOverflow)?;
        }
        Ok(Value::Int(total))
    }

    /// (- a) negates; (- a b ...) subtracts left to right.
    fn prim_sub(&mut self, args: Value) -> VauResult<Value> {
        let items = self.int_args(args)?;
        if items.len() == 1 {
            let negated = 0i64
                .checked_sub(items[0])
                .ok_or(VauError::IntegerOverflow)?;
            return Ok(Value::Int(negated));
        }
        let mut total = items[0];
        for &item in &items[1..] {
            total = total.checked_sub(item).ok_or(VauError::IntegerOverflow)?;
        }
        Ok(Value::Int(total))
    }

    /// (* a ...) — product, empty product is 1.
    fn prim_mul(&mut self, args: Value) -> VauResult<Value> {
        let mut total: i64 = 1;
        for item in self.int_args(args)? {
            total = total.checked_mul(item).ok_or(VauError::IntegerOverflow)?;
        }
        Ok(Value::Int(total))
    }

    /// Integer division family: truncating quotient, remainder with the
    /// sign of the dividend, modulo with the sign of the divisor.
    fn prim_division(&mut self, args: Value, op: DivisionOp) -> VauResult<Value> {
        let a = self.int_arg(self.heap.head_val(args)?)?;
        let b = self.int_arg(self.heap.head_val(self.heap.tail_val(args)?)?)?;
        if b == 0 {
            return Err(VauError::DivisionByZero);
        }
        let result = match op {
            DivisionOp::Quotient => a.checked_div(b).ok_or(VauError::IntegerOverflow)?,
            DivisionOp::Remainder => a.checked_rem(b).ok_or(VauError::IntegerOverflow)?,
            DivisionOp::Modulo => {
                let rem = a.checked_rem(b).ok_or(VauError::IntegerOverflow)?;
                if rem != 0 && (rem < 0) != (b < 0) {
                    rem + b
                } else {
                    rem
                }
            }
        };
        Ok(Value::Int(result))
    }

    fn prim_predicate(&mut self, args: Value, test: impl Fn(Value) -> bool) -> VauResult<Value> {
        let value = self.heap.head_val(args)?;
        Ok(Value::Bool(test(value)))
    }

    /// (write v) — print a value to stdout, no trailing newline.
    fn prim_write(&mut self, args: Value) -> VauResult<Value> {
        let value = self.heap.head_val(args)?;
        print!("{}", self.show(value));
        Ok(Value::Nil)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn env_arg(&self, value: Value) -> VauResult<EnvId> {
        value.as_env().ok_or_else(|| VauError::TypeMismatch {
            expected: "environment".into(),
            actual: value.kind_name().into(),
        })
    }

    fn int_arg(&self, value: Value) -> VauResult<i64> {
        value.as_int().ok_or_else(|| VauError::TypeMismatch {
            expected: "integer".into(),
            actual: value.kind_name().into(),
        })
    }

    fn int_args(&self, args: Value) -> VauResult<Vec<i64>> {
        let items = self.heap.list_to_vec(args).unwrap_or_default();
        items.into_iter().map(|v| self.int_arg(v)).collect()
    }

    /// Formals trees may contain only symbols, `#ignore`, nil, and pairs.
    fn check_formals(&self, formals: Value) -> VauResult<()> {
        match formals {
            Value::Nil | Value::Symbol(_) => Ok(()),
            Value::Pair(id) => {
                self.check_formals(self.heap.head(id))?;
                self.check_formals(self.heap.tail(id))
            }
            other => Err(VauError::TypeMismatch {
                expected: "symbol, #ignore, nil, or pair in formal pattern".into(),
                actual: other.kind_name().into(),
            }),
        }
    }

    fn formals_contain(&self, formals: Value, name: crate::value::SymbolId) -> bool {
        match formals {
            Value::Symbol(id) => id == name,
            Value::Pair(id) => {
                self.formals_contain(self.heap.head(id), name)
                    || self.formals_contain(self.heap.tail(id), name)
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy)]
enum DivisionOp {
    Quotient,
    Remainder,
    Modulo,
}

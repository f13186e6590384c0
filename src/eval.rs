use tracing::trace;

use crate::combiner::{
    ApplicativeTable, Operative, OperativeTable, PrimKind, PrimOp, PrimitiveTable,
};
use crate::env::EnvTable;
use crate::error::{VauError, VauResult};
use crate::ground::{self, PrimSpec};
use crate::heap::Heap;
use crate::printer;
use crate::reader;
use crate::strings::StringTable;
use crate::symbol::{sym, SymbolTable};
use crate::value::{EnvId, OperativeId, PrimId, Value};

/// Default limit on non-tail recursion depth. Tail calls iterate and never
/// count against this; only real expression nesting does.
const DEFAULT_MAX_DEPTH: usize = 2048;

/// The evaluation machine. All interpreter state lives here: the cons
/// heap, the intern tables, the environment arena, and the combiner
/// tables.
pub struct Machine {
    pub heap: Heap,
    pub symbols: SymbolTable,
    pub strings: StringTable,
    pub envs: EnvTable,
    pub operatives: OperativeTable,
    pub applicatives: ApplicativeTable,
    pub primitives: PrimitiveTable,

    /// The root environment, seeded with the registered primitives.
    pub root: EnvId,

    /// Non-tail recursion limit.
    max_depth: usize,
    /// Steps taken by the current top-level evaluation.
    steps: u64,
    /// Optional host-imposed step budget (the only interruption
    /// mechanism the core offers).
    step_budget: Option<u64>,
}

/// What one dispatch step produced: a finished value, or a tail-position
/// re-entry into the trampoline with a new (expr, env) pair.
enum Flow {
    Done(Value),
    Tail(Value, EnvId),
}

impl Machine {
    /// Fresh machine with the default primitive set bound in a new root
    /// environment.
    pub fn new() -> Self {
        let mut machine = Machine {
            heap: Heap::new(),
            symbols: SymbolTable::new(),
            strings: StringTable::new(),
            envs: EnvTable::new(),
            operatives: OperativeTable::new(),
            applicatives: ApplicativeTable::new(),
            primitives: PrimitiveTable::new(),
            root: EnvId(0),
            max_depth: DEFAULT_MAX_DEPTH,
            steps: 0,
            step_budget: None,
        };
        machine.root = machine.create_root_environment(ground::primitive_specs());
        machine
    }

    /// Fresh machine with the prelude already evaluated against the root
    /// environment.
    pub fn bootstrap() -> VauResult<Self> {
        let mut machine = Machine::new();
        machine.load_str(ground::PRELUDE)?;
        Ok(machine)
    }

    /// Seed a new environment with the given primitive registry.
    /// Applicative-like primitives are wrapped once here, so they receive
    /// evaluated operands forever after.
    pub fn create_root_environment(&mut self, specs: &[PrimSpec]) -> EnvId {
        let env = self.envs.create(None);
        // #ignore evaluates to itself, so it can be passed around in
        // constructed formals trees.
        self.envs
            .define(env, sym::IGNORE, Value::Symbol(sym::IGNORE));
        for spec in specs {
            let name = self.symbols.intern(spec.name);
            let id = self.primitives.alloc(crate::combiner::Primitive {
                name,
                op: spec.op,
                min_args: spec.min_args,
                max_args: spec.max_args,
            });
            let mut value = Value::Primitive(id);
            if spec.kind == PrimKind::Applicative {
                value = Value::Applicative(self.applicatives.alloc(value));
            }
            self.envs.define(env, name, value);
        }
        env
    }

    /// Impose a step budget on subsequent evaluations; None removes it.
    pub fn set_step_budget(&mut self, budget: Option<u64>) {
        self.step_budget = budget;
    }

    /// Adjust the non-tail recursion limit.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Print a value using this machine's tables.
    pub fn show(&self, val: Value) -> String {
        printer::print_val(val, &self.heap, &self.symbols, &self.strings, &self.primitives)
    }

    /// Read every form in `src` without evaluating.
    pub fn read_str(&mut self, src: &str) -> VauResult<Vec<Value>> {
        let mut reader =
            reader::Reader::new(src, &mut self.heap, &mut self.symbols, &mut self.strings);
        reader.read_all()
    }

    /// Read and evaluate every form in `src` against the root environment,
    /// returning the last value. Used for the prelude and for file loading.
    pub fn load_str(&mut self, src: &str) -> VauResult<Value> {
        let mut pos = 0;
        let mut last = Value::Nil;
        loop {
            let next = reader::read_one_at(
                src,
                pos,
                &mut self.heap,
                &mut self.symbols,
                &mut self.strings,
            )?;
            match next {
                Some((expr, new_pos)) => {
                    pos = new_pos;
                    let root = self.root;
                    last = self.eval(expr, root)?;
                }
                None => return Ok(last),
            }
        }
    }

    // ========================================================================
    // Core evaluation
    // ========================================================================

    /// Evaluate an expression in an environment. The sole entry point.
    pub fn eval(&mut self, expr: Value, env: EnvId) -> VauResult<Value> {
        self.steps = 0;
        self.eval_at(expr, env, 0)
    }

    /// The trampoline. Tail positions feed a new (expr, env) pair back
    /// into the loop; everything else recurses with depth + 1 and is
    /// bounded by `max_depth`.
    pub(crate) fn eval_at(&mut self, expr: Value, env: EnvId, depth: usize) -> VauResult<Value> {
        if depth >= self.max_depth {
            return Err(VauError::StackExhausted);
        }
        let mut expr = expr;
        let mut env = env;
        loop {
            self.charge_step()?;
            trace!(expr = %self.show(expr), env = env.0, "eval");
            match expr {
                Value::Symbol(name) => {
                    return self.envs.lookup(env, name).ok_or_else(|| {
                        VauError::UnboundSymbol(self.symbols.name(name).to_string())
                    });
                }
                Value::Pair(cell) => {
                    let operator = self.heap.head(cell);
                    let operands = self.heap.tail(cell);
                    let combiner = self.eval_at(operator, env, depth + 1)?;
                    match self.combine(combiner, operands, env, depth)? {
                        Flow::Done(value) => return Ok(value),
                        Flow::Tail(next_expr, next_env) => {
                            expr = next_expr;
                            env = next_env;
                        }
                    }
                }
                // Everything else is self-evaluating.
                _ => return Ok(expr),
            }
        }
    }

    /// Dispatch a combiner over an operand tree in the caller's dynamic
    /// environment.
    fn combine(
        &mut self,
        combiner: Value,
        operands: Value,
        dyn_env: EnvId,
        depth: usize,
    ) -> VauResult<Flow> {
        match combiner {
            Value::Applicative(id) => {
                // Applicative invocation degrades to operative invocation
                // over pre-evaluated arguments.
                let inner = self.applicatives.inner(id);
                let evaluated = self.eval_operands(operands, dyn_env, depth)?;
                self.combine(inner, evaluated, dyn_env, depth)
            }
            Value::Operative(id) => self.invoke_operative(id, operands, dyn_env, depth),
            Value::Primitive(id) => self.invoke_primitive(id, operands, dyn_env, depth),
            Value::Bool(which) => {
                // Booleans are two-operand combiners selecting their first
                // or second operand, evaluated in the caller's environment
                // in tail position.
                let branches = self.heap.list_to_vec(operands).filter(|b| b.len() == 2);
                let Some(branches) = branches else {
                    return Err(VauError::ArityMismatch {
                        expected: "(consequent alternative)".into(),
                        actual: self.show(operands),
                    });
                };
                let chosen = if which { branches[0] } else { branches[1] };
                Ok(Flow::Tail(chosen, dyn_env))
            }
            other => Err(VauError::NotCombinable(self.show(other))),
        }
    }

    /// Evaluate every element of a proper operand list, left to right.
    fn eval_operands(&mut self, operands: Value, env: EnvId, depth: usize) -> VauResult<Value> {
        let items = self.heap.list_to_vec(operands).ok_or_else(|| {
            VauError::TypeMismatch {
                expected: "proper operand list".into(),
                actual: self.show(operands),
            }
        })?;
        let mut evaluated = Vec::with_capacity(items.len());
        for item in items {
            evaluated.push(self.eval_at(item, env, depth + 1)?);
        }
        Ok(self.heap.list(&evaluated))
    }

    /// Invoke an operative: fresh frame over its static environment, bind
    /// the formals against the raw operands, bind the dynamic-environment
    /// parameter, then run the body with the final expression in tail
    /// position.
    fn invoke_operative(
        &mut self,
        id: OperativeId,
        operands: Value,
        dyn_env: EnvId,
        depth: usize,
    ) -> VauResult<Flow> {
        let Operative {
            static_env,
            formals,
            env_param,
            body,
        } = self.operatives.get(id);

        let call_env = self.envs.create(Some(static_env));
        self.bind(formals, operands, call_env)?;
        if let Some(name) = env_param {
            self.envs.define(call_env, name, Value::Env(dyn_env));
        }

        let mut cursor = body;
        loop {
            match cursor {
                Value::Nil => return Ok(Flow::Done(Value::Nil)),
                Value::Pair(cell) => {
                    let expr = self.heap.head(cell);
                    let rest = self.heap.tail(cell);
                    if rest.is_nil() {
                        return Ok(Flow::Tail(expr, call_env));
                    }
                    self.eval_at(expr, call_env, depth + 1)?;
                    cursor = rest;
                }
                other => {
                    return Err(VauError::TypeMismatch {
                        expected: "proper list as operative body".into(),
                        actual: other.kind_name().into(),
                    })
                }
            }
        }
    }

    /// Invoke a host primitive. Whether the operands arrived evaluated was
    /// decided at registration time (applicative-like primitives are
    /// wrapped once there). `eval` is tail-transparent: it re-enters the
    /// trampoline instead of recursing, which is what lets user-written
    /// control operatives iterate.
    fn invoke_primitive(
        &mut self,
        id: PrimId,
        operands: Value,
        dyn_env: EnvId,
        depth: usize,
    ) -> VauResult<Flow> {
        let primitive = self.primitives.get(id);
        let count = self.heap.list_len(operands).ok_or_else(|| {
            VauError::TypeMismatch {
                expected: "proper operand list".into(),
                actual: self.show(operands),
            }
        })?;

        let arity_ok = count >= primitive.min_args
            && primitive.max_args.map_or(true, |max| count <= max);
        if !arity_ok {
            return Err(VauError::ArityMismatch {
                expected: format!(
                    "{} operand(s) for {}",
                    describe_arity(primitive.min_args, primitive.max_args),
                    self.symbols.name(primitive.name)
                ),
                actual: self.show(operands),
            });
        }

        if primitive.op == PrimOp::Eval {
            let expr = self.heap.head_val(operands)?;
            let env_arg = self.heap.head_val(self.heap.tail_val(operands)?)?;
            let Some(target) = env_arg.as_env() else {
                return Err(VauError::TypeMismatch {
                    expected: "environment".into(),
                    actual: env_arg.kind_name().into(),
                });
            };
            return Ok(Flow::Tail(expr, target));
        }

        self.call_primitive(primitive.op, operands, dyn_env, depth)
            .map(Flow::Done)
    }

    // ========================================================================
    // Structural equality
    // ========================================================================

    /// Structural equality: pairs recurse on heads and iterate on tails,
    /// strings compare by contents, atoms by kind and value, and
    /// environments and combiners by identity only.
    pub fn structural_eq(&self, a: Value, b: Value) -> bool {
        let mut a = a;
        let mut b = b;
        loop {
            match (a, b) {
                (Value::Pair(x), Value::Pair(y)) => {
                    if x == y {
                        return true;
                    }
                    if !self.structural_eq(self.heap.head(x), self.heap.head(y)) {
                        return false;
                    }
                    a = self.heap.tail(x);
                    b = self.heap.tail(y);
                }
                (Value::Str(x), Value::Str(y)) => return self.strings.get(x) == self.strings.get(y),
                _ => return a == b,
            }
        }
    }

    fn charge_step(&mut self) -> VauResult<()> {
        self.steps += 1;
        match self.step_budget {
            Some(max) if self.steps > max => Err(VauError::StepBudgetExhausted),
            _ => Ok(()),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

fn describe_arity(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("{}", min),
        Some(max) => format!("{} to {}", min, max),
        None => format!("at least {}", min),
    }
}

use thiserror::Error;

/// Failures the evaluator can surface. Every failure aborts the current
/// top-level evaluation and propagates verbatim; the core performs no
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VauError {
    /// Lookup walked the whole environment chain without a match.
    #[error("unbound symbol '{0}'")]
    UnboundSymbol(String),

    /// A formal-parameter pattern did not match the operand tree.
    #[error("cannot bind operands: pattern {expected} does not match {actual}")]
    ArityMismatch { expected: String, actual: String },

    /// Operator position evaluated to something that is not a combiner.
    #[error("not a combiner: {0}")]
    NotCombinable(String),

    /// Wrong value kind for unwrap, arithmetic, comparison, or a pattern.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Non-tail recursion exceeded the depth limit. Tail calls never
    /// trip this; only real expression nesting does.
    #[error("stack exhausted: non-tail recursion too deep")]
    StackExhausted,

    /// The host-imposed step budget ran out — likely an infinite loop.
    #[error("evaluation step budget exhausted")]
    StepBudgetExhausted,

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    /// Reader error.
    #[error("read error: {0}")]
    ReadError(String),
}

pub type VauResult<T> = Result<T, VauError>;

//! The default primitive registry and the embedded prelude.
//!
//! The bootstrap contract: the host registers a minimal set of combiners
//! in a fresh root environment, then the prelude — ordinary source in the
//! language itself — builds the rest of the library on top of them.

use crate::combiner::{PrimKind, PrimOp};

/// The library layer, evaluated form-by-form against the root environment
/// by `Machine::bootstrap`.
pub const PRELUDE: &str = include_str!("prelude.vau");

/// Registration record for one host primitive: surface name, whether its
/// operands arrive raw or evaluated, dispatch tag, and arity contract
/// (`max_args: None` means variadic).
pub struct PrimSpec {
    pub name: &'static str,
    pub kind: PrimKind,
    pub op: PrimOp,
    pub min_args: usize,
    pub max_args: Option<usize>,
}

const fn operative(
    name: &'static str,
    op: PrimOp,
    min_args: usize,
    max_args: Option<usize>,
) -> PrimSpec {
    PrimSpec {
        name,
        kind: PrimKind::Operative,
        op,
        min_args,
        max_args,
    }
}

const fn applicative(
    name: &'static str,
    op: PrimOp,
    min_args: usize,
    max_args: Option<usize>,
) -> PrimSpec {
    PrimSpec {
        name,
        kind: PrimKind::Applicative,
        op,
        min_args,
        max_args,
    }
}

/// The default primitive set: the core constructors, list surgery,
/// arithmetic over exact integers, type predicates, and minimal output.
pub fn primitive_specs() -> &'static [PrimSpec] {
    static SPECS: [PrimSpec; 32] = [
        // Core special-form constructors: these receive raw operands.
        operative("$vau", PrimOp::Vau, 2, None),
        operative("$define!", PrimOp::Define, 2, Some(2)),
        operative("$set!", PrimOp::Set, 2, Some(2)),
        // Combiner plumbing.
        applicative("wrap", PrimOp::Wrap, 1, Some(1)),
        applicative("unwrap", PrimOp::Unwrap, 1, Some(1)),
        applicative("eval", PrimOp::Eval, 2, Some(2)),
        applicative("make-environment", PrimOp::MakeEnvironment, 0, Some(1)),
        // Pairs.
        applicative("cons", PrimOp::Cons, 2, Some(2)),
        applicative("head", PrimOp::Head, 1, Some(1)),
        applicative("tail", PrimOp::Tail, 1, Some(1)),
        applicative("set-head!", PrimOp::SetHead, 2, Some(2)),
        applicative("set-tail!", PrimOp::SetTail, 2, Some(2)),
        // Comparison and arithmetic.
        applicative("=", PrimOp::Equal, 2, Some(2)),
        applicative("<", PrimOp::Less, 2, Some(2)),
        applicative("+", PrimOp::Add, 0, None),
        applicative("-", PrimOp::Sub, 1, None),
        applicative("*", PrimOp::Mul, 0, None),
        applicative("quotient", PrimOp::Quotient, 2, Some(2)),
        applicative("remainder", PrimOp::Remainder, 2, Some(2)),
        applicative("modulo", PrimOp::Modulo, 2, Some(2)),
        // Type predicates.
        applicative("null?", PrimOp::IsNull, 1, Some(1)),
        applicative("pair?", PrimOp::IsPair, 1, Some(1)),
        applicative("symbol?", PrimOp::IsSymbol, 1, Some(1)),
        applicative("integer?", PrimOp::IsInteger, 1, Some(1)),
        applicative("boolean?", PrimOp::IsBoolean, 1, Some(1)),
        applicative("string?", PrimOp::IsString, 1, Some(1)),
        applicative("operative?", PrimOp::IsOperative, 1, Some(1)),
        applicative("applicative?", PrimOp::IsApplicative, 1, Some(1)),
        applicative("combiner?", PrimOp::IsCombiner, 1, Some(1)),
        applicative("environment?", PrimOp::IsEnvironment, 1, Some(1)),
        // Output.
        applicative("write", PrimOp::Write, 1, Some(1)),
        applicative("newline", PrimOp::Newline, 0, Some(0)),
    ];
    &SPECS
}

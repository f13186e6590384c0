//! End-to-end tests: whole source snippets driven through the reader and
//! the machine, with the prelude loaded.

use pretty_assertions::assert_eq;
use vau::error::VauError;
use vau::eval::Machine;

/// Evaluate every form in `src` against a bootstrapped machine and print
/// the last value.
fn run(src: &str) -> String {
    let mut machine = Machine::bootstrap().expect("prelude loads");
    let value = machine.load_str(src).expect("evaluation succeeds");
    machine.show(value)
}

fn run_err(src: &str) -> VauError {
    let mut machine = Machine::bootstrap().expect("prelude loads");
    machine.load_str(src).expect_err("evaluation fails")
}

#[test]
fn operatives_receive_operands_unevaluated() {
    // Invoking the operative must not run its operands: the counter
    // stays untouched.
    let result = run(
        "($define! counter 0)
         ($define! tick! ($lambda () ($set! counter (+ counter 1))))
         ($define! $lazy ($vau (a b) #ignore 42))
         ($lazy (tick!) (tick!))
         counter",
    );
    assert_eq!(result, "0");
}

#[test]
fn applicatives_evaluate_operands_once_left_to_right() {
    let result = run(
        "($define! order ())
         ($define! note! ($lambda (x) ($set! order (cons x order)) x))
         ($define! pair-up (wrap ($vau (a b) #ignore (list a b))))
         (pair-up (note! 1) (note! 2))
         order",
    );
    // Each operand ran exactly once, 1 before 2.
    assert_eq!(result, "(2 1)");
}

#[test]
fn closures_share_their_defining_frame() {
    let result = run(
        "($define! make-counter
           ($lambda ()
             ($define! n 0)
             (list ($lambda () ($set! n (+ n 1)) n)
                   ($lambda () n))))
         ($define! fns (make-counter))
         ((head fns))
         ((head fns))
         ((second fns))",
    );
    // The reader closure observes the bumps made by the writer closure.
    assert_eq!(result, "2");
}

#[test]
fn inner_definitions_do_not_leak_outward() {
    let result = run(
        "($define! x 1)
         ($define! inner (($lambda () ($define! x 99) x)))
         (list inner x)",
    );
    assert_eq!(result, "(99 1)");
}

#[test]
fn parameters_shadow_without_destroying() {
    let result = run(
        "($define! x 1)
         (($lambda (x) x) 77)
         x",
    );
    assert_eq!(result, "1");
}

#[test]
fn deep_tail_recursion_does_not_exhaust_the_stack() {
    assert_eq!(run("(length (iota 100000))"), "100000");
}

#[test]
fn foldl_iterates_over_long_lists() {
    assert_eq!(run("(foldl + 0 (iota 100000))"), "5000050000");
}

#[test]
fn formals_destructure_nested_trees() {
    let result = run("(($lambda (a (b . c)) (list a b c)) 1 (list 2 3 4))");
    assert_eq!(result, "(1 2 (3 4))");
}

#[test]
fn dotted_formals_take_the_rest() {
    let result = run("(($lambda (a . b) (list a b)) 1 2 3)");
    assert_eq!(result, "(1 (2 3))");
}

#[test]
fn nullary_formals_reject_operands() {
    assert!(matches!(
        run_err("(($lambda () 1) 2)"),
        VauError::ArityMismatch { .. }
    ));
}

#[test]
fn equality_is_structural_on_lists() {
    assert_eq!(run("(= (cons 1 (cons 2 ())) (cons 1 (cons 2 ())))"), "#t");
    assert_eq!(run("(= (list 1 2) (list 1 3))"), "#f");
}

#[test]
fn operatives_compare_by_identity() {
    // Same text, distinct constructions.
    assert_eq!(run("(= ($vau (x) #ignore x) ($vau (x) #ignore x))"), "#f");
    assert_eq!(
        run("($define! op ($vau (x) #ignore x)) (= op op)"),
        "#t"
    );
}

#[test]
fn booleans_are_branch_selecting_combiners() {
    assert_eq!(run("(#t 1 2)"), "1");
    assert_eq!(run("(#f 1 2)"), "2");
    // The unchosen branch is never evaluated.
    assert_eq!(run("(#t 7 (this-would-be-unbound))"), "7");
}

#[test]
fn if_evaluates_only_the_taken_branch() {
    assert_eq!(run("($if #f (this-would-be-unbound) 7)"), "7");
    assert_eq!(run("($if (< 1 2) 'yes 'no)"), "yes");
}

#[test]
fn cond_takes_the_first_true_clause() {
    assert_eq!(run("($cond (#f 1) ((= 1 1) 2) (#t 3))"), "2");
    assert_eq!(run("($cond (#f 1))"), "()");
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(run("($and? #f (this-would-be-unbound))"), "#f");
    assert_eq!(run("($or? #t (this-would-be-unbound))"), "#t");
    assert_eq!(run("($and? #t #t 3)"), "3");
    assert_eq!(run("($or? #f #f 3)"), "3");
    assert_eq!(run("($and?)"), "#t");
    assert_eq!(run("($or?)"), "#f");
}

#[test]
fn environments_are_first_class() {
    let result = run(
        "($define! current-env ($vau () env env))
         (list (environment? (current-env))
               (eval '(+ 1 2) (current-env)))",
    );
    assert_eq!(result, "(#t 3)");
}

#[test]
fn operatives_see_the_callers_bindings() {
    let result = run(
        "($define! $peek ($vau (name) env (eval name env)))
         ($let ((hidden 42)) ($peek hidden))",
    );
    assert_eq!(result, "42");
}

#[test]
fn defn_defines_applicatives() {
    assert_eq!(run("(defn double (n) (* n 2)) (double 21)"), "42");
}

#[test]
fn apply_reuses_an_existing_argument_list() {
    assert_eq!(run("(apply + (list 1 2 3))"), "6");
}

#[test]
fn list_star_builds_dotted_and_spliced_lists() {
    assert_eq!(run("(list* 1 2 (list 3 4))"), "(1 2 3 4)");
    assert_eq!(run("(list* 1 2)"), "(1 . 2)");
}

#[test]
fn sequence_returns_the_last_value() {
    assert_eq!(run("($sequence 1 2 3)"), "3");
    assert_eq!(run("($sequence)"), "()");
}

#[test]
fn list_library_basics() {
    assert_eq!(run("(map ($lambda (x) (* x x)) (list 1 2 3))"), "(1 4 9)");
    assert_eq!(run("(filter odd? (list 1 2 3 4 5))"), "(1 3 5)");
    assert_eq!(run("(append (list 1 2) (list 3 4))"), "(1 2 3 4)");
    assert_eq!(run("(reverse (list 1 2 3))"), "(3 2 1)");
    assert_eq!(run("(foldr cons () (list 1 2 3))"), "(1 2 3)");
    assert_eq!(run("(assoc 2 (list (list 1 10) (list 2 20)))"), "(2 20)");
    assert_eq!(run("(assoc 9 (list (list 1 10)))"), "()");
}

#[test]
fn numeric_predicates_use_the_standard_orientation() {
    assert_eq!(run("(positive? 5)"), "#t");
    assert_eq!(run("(positive? -5)"), "#f");
    assert_eq!(run("(negative? -5)"), "#t");
    assert_eq!(run("(even? 4)"), "#t");
    assert_eq!(run("(even? -3)"), "#f");
    assert_eq!(run("(odd? 7)"), "#t");
    assert_eq!(run("(zero? 0)"), "#t");
    assert_eq!(run("(abs -7)"), "7");
    assert_eq!(run("(max 2 9)"), "9");
    assert_eq!(run("(min 2 9)"), "2");
}

#[test]
fn pair_mutation_is_visible_through_sharing() {
    let result = run(
        "($define! xs (list 1 2 3))
         ($define! ys xs)
         (set-head! xs 99)
         (head ys)",
    );
    assert_eq!(result, "99");
}

#[test]
fn failures_surface_verbatim() {
    assert_eq!(
        run_err("(+ 1 ghost)"),
        VauError::UnboundSymbol("ghost".into())
    );
    assert!(matches!(run_err("(1 2)"), VauError::NotCombinable(_)));
    assert!(matches!(
        run_err("(unwrap 5)"),
        VauError::TypeMismatch { .. }
    ));
}

//! Property-based invariant tests for the recompute engine.
//!
//! 1. Classification is total and only yields assignments with both sides
//! 2. Evaluation never panics, whatever the text
//! 3. The entry list never drops below one entry
//! 4. Scope keys are exactly the names some entry assigns
//! 5. A converged recompute is a fixed point: repeating it changes nothing
//! 6. Editing an entry to its own text never runs a pass once settled

use matcalc::{Engine, Evaluator, Interpreter, Scope, classify};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Edit(usize, String),
    Insert(usize),
    Delete(usize),
    Unset(String),
    AddMatrix(usize),
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-d] ?= ?[a-d0-9+*/^ ]{0,6}",
        "[a-d0-9+*/^()\\[\\], ]{0,8}",
        Just(String::new()),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), arb_text()).prop_map(|(index, text)| Op::Edit(index, text)),
        2 => any::<usize>().prop_map(Op::Insert),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => "[a-d]".prop_map(Op::Unset),
        1 => any::<usize>().prop_map(Op::AddMatrix),
    ]
}

fn apply(engine: &mut Engine, op: &Op) {
    let len = engine.entries().len();
    match op {
        Op::Edit(index, text) => {
            engine.edit_entry(index % len, text);
        }
        Op::Insert(index) => {
            engine.insert_entry_after(index % len);
        }
        Op::Delete(index) => {
            engine.delete_entry(index % len);
        }
        Op::Unset(name) => {
            engine.delete_variable(name);
        }
        Op::AddMatrix(index) => {
            engine.add_matrix_variable(index % len);
        }
    }
}

fn engine_after(ops: &[Op]) -> Engine {
    let mut engine = Engine::new();
    for op in ops {
        apply(&mut engine, op);
    }
    engine
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Classification is total
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn classification_is_total(text in any::<String>()) {
        let classification = classify(&text);
        if classification.is_assignment {
            prop_assert!(!classification.lhs.is_empty());
            prop_assert!(classification.rhs_text.as_deref().is_some_and(|rhs| !rhs.is_empty()));
        } else {
            prop_assert!(classification.rhs_text.is_none());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Evaluation never panics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn evaluation_never_panics(text in "\\PC{0,40}") {
        let evaluator = Evaluator::new(Interpreter);
        let _ = evaluator.evaluate(&text, &Scope::new());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3–4. Structural invariants after arbitrary operation sequences
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn list_is_never_empty(ops in proptest::collection::vec(arb_op(), 0..24)) {
        let engine = engine_after(&ops);
        prop_assert!(!engine.entries().is_empty());
    }

    #[test]
    fn scope_keys_match_assigned_names(ops in proptest::collection::vec(arb_op(), 0..24)) {
        let engine = engine_after(&ops);
        let scope_names: BTreeSet<&str> = engine.scope().names().collect();
        let assigned: BTreeSet<&str> = engine
            .entries()
            .iter()
            .filter_map(|entry| entry.assigned_name())
            .collect();
        prop_assert_eq!(scope_names, assigned);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5–6. Fixed point
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn converged_recompute_is_a_fixed_point(ops in proptest::collection::vec(arb_op(), 0..24)) {
        let mut engine = engine_after(&ops);
        let first = engine.recompute();
        let entries = engine.entries().to_vec();
        let scope = engine.scope().clone();

        let second = engine.recompute();
        if first.converged {
            prop_assert_eq!(second.scope_changes, 0);
            prop_assert_eq!(engine.entries(), entries.as_slice());
            prop_assert_eq!(engine.scope(), &scope);
        }
    }

    #[test]
    fn identical_edit_is_stable(
        ops in proptest::collection::vec(arb_op(), 0..24),
        index in any::<usize>(),
    ) {
        let mut engine = engine_after(&ops);
        if engine.recompute().converged {
            let index = index % engine.entries().len();
            let text = engine.entry(index).raw_text().to_owned();
            let report = engine.edit_entry(index, &text);
            prop_assert_eq!(report.passes, 0);
        }
    }
}

//! Helpers for driving the host context in tests.

use super::Justification;
use super::SatContext;
use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;

/// Runs Boolean unit propagation over the clause store until fixpoint. Returns `true` when a
/// clause is fully falsified (a conflict), `false` otherwise. Propagated literals carry the
/// propagating clause as their justification.
pub(crate) fn unit_propagate_to_fixpoint(context: &mut SatContext) -> bool {
    loop {
        let mut changed = false;
        for index in 0..context.clause_store.num_clauses() {
            let reference = ClauseReference::new(index as u32);
            let literals: Vec<Literal> = context
                .clause_store
                .get_clause(reference)
                .get_literal_slice()
                .to_vec();

            if literals
                .iter()
                .any(|literal| context.is_literal_assigned_true(*literal))
            {
                continue;
            }
            let unassigned: Vec<Literal> = literals
                .iter()
                .copied()
                .filter(|literal| context.is_literal_unassigned(*literal))
                .collect();
            match unassigned.as_slice() {
                [] => return true,
                [unit] => {
                    let conflict = context
                        .enqueue_propagated_literal(*unit, Justification::Clause(reference));
                    assert!(conflict.is_none());
                    changed = true;
                }
                _ => {}
            }
        }
        if !changed {
            return false;
        }
    }
}

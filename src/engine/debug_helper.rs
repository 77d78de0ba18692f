use num::BigInt;
use num::Zero;

use super::SatContext;
use crate::basic_types::Literal;
use crate::propagators::PbInequality;

/// Validation routines used behind the assert ladder; none of these are called on release hot
/// paths. Each returns `true` so it can sit directly inside an assertion macro, and panics with
/// a description when the checked property does not hold.
pub(crate) struct DebugHelper;

impl DebugHelper {
    /// The cached `watch_sum` and `max_watch` must agree with the watched prefix, and the prefix
    /// must keep the constraint live.
    pub(crate) fn check_watched_prefix(constraint: &PbInequality) -> bool {
        let mut sum = BigInt::zero();
        let mut max = BigInt::zero();
        for (_, coefficient) in &constraint.args[..constraint.watch_size] {
            sum += coefficient;
            if *coefficient > max {
                max = coefficient.clone();
            }
        }
        assert_eq!(
            sum, constraint.watch_sum,
            "The cached watch sum must equal the weight of the watched prefix."
        );
        assert!(
            sum >= constraint.k,
            "The watched prefix must keep the constraint live."
        );
        assert_eq!(
            max, constraint.max_watch,
            "The cached maximum must equal the maximal watched coefficient."
        );
        true
    }

    /// A propagation `premises => consequent` is justified exactly when dropping the consequent
    /// and every premise-falsified argument leaves too little weight to reach `k`.
    pub(crate) fn check_propagation(
        context: &SatContext,
        constraint: &PbInequality,
        premises: &[Literal],
        consequent: Literal,
    ) -> bool {
        for premise in premises {
            assert!(
                context.is_literal_assigned_true(*premise),
                "Every premise of a propagation must hold."
            );
        }
        assert!(
            context.is_literal_unassigned(consequent),
            "A propagated literal must not be assigned yet."
        );

        let mut excluded: Vec<Literal> = premises.iter().map(|premise| !*premise).collect();
        excluded.push(consequent);
        let mut remaining = BigInt::zero();
        for (literal, coefficient) in &constraint.args {
            if !excluded.contains(literal) {
                remaining += coefficient;
            }
        }
        assert!(
            remaining < constraint.k,
            "Without the propagated literal the constraint must be unreachable."
        );
        true
    }

    /// With an assigned governing literal, the truth of the literal must coincide with the
    /// satisfiability of the constraint under the current assignment.
    pub(crate) fn check_assigned_constraint(
        context: &SatContext,
        constraint: &PbInequality,
    ) -> bool {
        let governing = constraint.literal();
        if context.is_literal_unassigned(governing) {
            return true;
        }
        let mut sum = BigInt::zero();
        let mut max_possible = BigInt::zero();
        for (literal, coefficient) in &constraint.args {
            if context.is_literal_assigned_true(*literal) {
                sum += coefficient;
            }
            if !context.is_literal_assigned_false(*literal) {
                max_possible += coefficient;
            }
        }
        assert!(sum <= max_possible);
        assert_eq!(
            sum >= constraint.k,
            context.is_literal_assigned_true(governing),
            "A true governing literal must coincide with a satisfied constraint."
        );
        assert_eq!(
            max_possible < constraint.k,
            context.is_literal_assigned_false(governing),
            "A false governing literal must coincide with an unsatisfiable constraint."
        );
        true
    }
}

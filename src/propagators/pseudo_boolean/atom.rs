use num::BigInt;

use crate::basic_types::Literal;
use crate::engine::AssignmentsPropositional;

/// The pseudo-Boolean atom kinds recognized by [`PbTheory`][super::PbTheory]: cardinality bounds
/// with unit weights, and weighted linear bounds. Coefficients may be negative on entry; the
/// canonicalizer rewrites everything to a `>=` form with positive coefficients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PbAtom {
    /// `l1 + ... + ln >= k`.
    AtLeast { literals: Vec<Literal>, k: BigInt },
    /// `l1 + ... + ln <= k`.
    AtMost { literals: Vec<Literal>, k: BigInt },
    /// `c1*l1 + ... + cn*ln >= k`.
    GreaterEqual {
        terms: Vec<(Literal, BigInt)>,
        k: BigInt,
    },
    /// `c1*l1 + ... + cn*ln <= k`.
    LessEqual {
        terms: Vec<(Literal, BigInt)>,
        k: BigInt,
    },
}

impl PbAtom {
    /// Rewrites the atom as a `>=` constraint over (possibly signed) terms: `<=` forms are turned
    /// into `>=` by negating every coefficient and the threshold.
    pub(crate) fn into_geq_terms(self) -> (Vec<(Literal, BigInt)>, BigInt) {
        match self {
            PbAtom::AtLeast { literals, k } => (
                literals.into_iter().map(|l| (l, BigInt::from(1))).collect(),
                k,
            ),
            PbAtom::AtMost { literals, k } => (
                literals
                    .into_iter()
                    .map(|l| (l, BigInt::from(-1)))
                    .collect(),
                -k,
            ),
            PbAtom::GreaterEqual { terms, k } => (terms, k),
            PbAtom::LessEqual { terms, k } => {
                (terms.into_iter().map(|(l, c)| (l, -c)).collect(), -k)
            }
        }
    }

    /// Evaluates the atom under a (total) assignment of its literals: the weighted sum of the
    /// true literals is compared against the threshold with the atom's own comparator. Returns
    /// `None` if any literal is unassigned.
    pub fn evaluate(&self, assignments: &AssignmentsPropositional) -> Option<bool> {
        let (terms, k, is_at_least): (Vec<(Literal, BigInt)>, &BigInt, bool) = match self {
            PbAtom::AtLeast { literals, k } => (
                literals.iter().map(|l| (*l, BigInt::from(1))).collect(),
                k,
                true,
            ),
            PbAtom::AtMost { literals, k } => (
                literals.iter().map(|l| (*l, BigInt::from(1))).collect(),
                k,
                false,
            ),
            PbAtom::GreaterEqual { terms, k } => (terms.clone(), k, true),
            PbAtom::LessEqual { terms, k } => (terms.clone(), k, false),
        };

        let mut sum = BigInt::from(0);
        for (literal, coefficient) in &terms {
            if assignments.is_literal_unassigned(*literal) {
                return None;
            }
            if assignments.is_literal_assigned_true(*literal) {
                sum += coefficient;
            }
        }

        Some(if is_at_least { sum >= *k } else { sum <= *k })
    }
}

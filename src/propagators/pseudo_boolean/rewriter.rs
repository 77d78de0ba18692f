//! Rewriting of raw (literal, signed coefficient) term lists with a threshold into the canonical
//! `>=` form: duplicates collapsed per variable, signs normalized, sentinel literals folded into
//! the threshold, and coefficients saturated and divided by their gcd.

use num::BigInt;
use num::Integer;
use num::One;
use num::Signed;
use num::Zero;

use crate::basic_types::Literal;

pub(crate) type PbTerms = Vec<(Literal, BigInt)>;

/// The outcome of [`normalise`]: the constraint is a tautology, unsatisfiable, or open.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum NormaliseOutcome {
    TriviallyTrue,
    TriviallyFalse,
    Normalised,
}

/// Collapses duplicate terms: terms over the same literal are summed, and a pair `c*l + d*~l` is
/// folded through `~l = 1 - l` into `(c - d)*l` with `k` reduced by `d`. Terms end up sorted by
/// literal code with at most one term per variable; coefficients may still be signed or zero.
pub(crate) fn unique(terms: &mut PbTerms, k: &mut BigInt) {
    terms.sort_by_key(|(literal, _)| literal.to_u32());

    let mut combined: PbTerms = Vec::with_capacity(terms.len());
    for (literal, coefficient) in terms.drain(..) {
        match combined.last_mut() {
            Some((last, last_coefficient)) if *last == literal => {
                *last_coefficient += coefficient;
            }
            Some((last, last_coefficient))
                if last.get_propositional_variable() == literal.get_propositional_variable() =>
            {
                // The previous term is `d*~l`, the current one `c*l` (negative codes sort first).
                let d = std::mem::replace(last_coefficient, coefficient);
                *last = literal;
                *last_coefficient -= &d;
                *k -= d;
            }
            _ => combined.push((literal, coefficient)),
        }
    }
    *terms = combined;
}

/// Normalizes signs and constants: sentinel literals are folded into `k`, each negative term
/// `-c*l` is rewritten as `c*~l` with `k` increased by `c`, and zero terms are dropped. Reports
/// whether the constraint became trivially true (`k <= 0`) or trivially false (sum of
/// coefficients below `k`).
pub(crate) fn normalise(terms: &mut PbTerms, k: &mut BigInt) -> NormaliseOutcome {
    let mut rewritten: PbTerms = Vec::with_capacity(terms.len());
    for (literal, coefficient) in terms.drain(..) {
        if literal == Literal::TRUE {
            *k -= coefficient;
        } else if literal == Literal::FALSE || coefficient.is_zero() {
            // A false literal or a cancelled term contributes nothing.
        } else if coefficient.is_negative() {
            *k -= &coefficient;
            rewritten.push((!literal, -coefficient));
        } else {
            rewritten.push((literal, coefficient));
        }
    }
    *terms = rewritten;

    if !k.is_positive() {
        return NormaliseOutcome::TriviallyTrue;
    }
    let sum: BigInt = terms.iter().map(|(_, coefficient)| coefficient).sum();
    if sum < *k {
        return NormaliseOutcome::TriviallyFalse;
    }
    NormaliseOutcome::Normalised
}

/// Saturates and rounds: coefficients above `k` are clamped to `k` (a single such literal already
/// decides satisfaction), after which all coefficients are divided by their gcd with `k` rounded
/// up. Only meaningful on an open constraint.
pub(crate) fn prune(terms: &mut PbTerms, k: &mut BigInt) {
    if terms.is_empty() || !k.is_positive() {
        return;
    }

    for (_, coefficient) in terms.iter_mut() {
        if *coefficient > *k {
            *coefficient = k.clone();
        }
    }

    let mut divisor = terms[0].1.clone();
    for (_, coefficient) in terms.iter().skip(1) {
        if divisor.is_one() {
            break;
        }
        divisor = divisor.gcd(coefficient);
    }
    if !divisor.is_one() {
        for (_, coefficient) in terms.iter_mut() {
            *coefficient /= &divisor;
        }
        *k = k.div_ceil(&divisor);
    }
}

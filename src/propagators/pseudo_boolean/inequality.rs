use std::collections::HashSet;

use num::BigInt;
use num::One;
use num::Signed;
use num::Zero;

use super::rewriter;
use super::rewriter::NormaliseOutcome;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::calabash_asserts::calabash_assert_eq_simple;
use crate::calabash_asserts::calabash_assert_simple;

/// Compilation lifecycle of a constraint: untouched, queued for the next restart, or already
/// turned into clauses. The flag is rewound to [`CompilationStatus::Uncompiled`] when the scope
/// holding the compiled clauses is popped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CompilationStatus {
    #[default]
    Uncompiled,
    Scheduled,
    Compiled,
}

/// A canonical pseudo-Boolean constraint `c1*l1 + ... + cn*ln >= k`, active while its governing
/// literal is assigned true. The prefix `args[0..watch_size]` is the watched prefix; its weight
/// sum and maximal coefficient are cached so that a single falsification is handled without
/// scanning the full argument list.
#[derive(Clone, Debug)]
pub struct PbInequality {
    pub(crate) literal: Literal,
    pub(crate) args: Vec<(Literal, BigInt)>,
    pub(crate) k: BigInt,
    pub(crate) watch_sum: BigInt,
    pub(crate) max_watch: BigInt,
    pub(crate) watch_size: usize,
    pub(crate) num_propagations: u64,
    pub(crate) compilation_threshold: Option<u64>,
    pub(crate) compiled: CompilationStatus,
}

impl PbInequality {
    /// Expects canonical arguments (positive coefficients, distinct variables, no sentinels).
    pub(crate) fn new(
        literal: Literal,
        args: Vec<(Literal, BigInt)>,
        k: BigInt,
        compilation_threshold: Option<u64>,
    ) -> PbInequality {
        let max_watch = args
            .iter()
            .map(|(_, coefficient)| coefficient.clone())
            .max()
            .unwrap_or_else(BigInt::zero);
        let constraint = PbInequality {
            literal,
            args,
            k,
            watch_sum: BigInt::zero(),
            max_watch,
            watch_size: 0,
            num_propagations: 0,
            compilation_threshold,
            compiled: CompilationStatus::Uncompiled,
        };
        calabash_assert_simple!(constraint.well_formed());
        // Saturation holds on entry but is not preserved by `negate`, so it is checked here
        // rather than in `well_formed`.
        calabash_assert_simple!(constraint
            .args
            .iter()
            .all(|(_, coefficient)| *coefficient <= constraint.k));
        constraint
    }

    pub fn size(&self) -> usize {
        self.args.len()
    }

    pub fn literal(&self) -> Literal {
        self.literal
    }

    pub fn arg_literal(&self, index: usize) -> Literal {
        self.args[index].0
    }

    pub fn coefficient(&self, index: usize) -> &BigInt {
        &self.args[index].1
    }

    pub fn k(&self) -> &BigInt {
        &self.k
    }

    pub fn watch_size(&self) -> usize {
        self.watch_size
    }

    pub fn num_propagations(&self) -> u64 {
        self.num_propagations
    }

    pub fn compilation_status(&self) -> CompilationStatus {
        self.compiled
    }

    /// The position of the argument over `variable` within `args[range]`, if any.
    pub(crate) fn find_variable(
        &self,
        variable: PropositionalVariable,
        range: std::ops::Range<usize>,
    ) -> Option<usize> {
        self.args[range]
            .iter()
            .position(|(literal, _)| literal.get_propositional_variable() == variable)
    }

    /// Replaces the constraint by its logical negation in place:
    /// `sum c_i*l_i >= k  <=>  !(sum c_i*~l_i >= sum c_i - k + 1)`, so both the governing literal
    /// and every argument literal flip and the threshold is reflected. The operation is
    /// involutive.
    pub fn negate(&mut self) {
        self.literal = !self.literal;
        let mut sum = BigInt::zero();
        for (literal, coefficient) in self.args.iter_mut() {
            *literal = !*literal;
            sum += &*coefficient;
        }
        self.k = sum - &self.k + BigInt::one();

        let outcome = rewriter::normalise(&mut self.args, &mut self.k);
        calabash_assert_eq_simple!(NormaliseOutcome::Normalised, outcome);
        calabash_assert_simple!(self.well_formed());
    }

    /// Checks the structural invariants: a positive threshold, positive coefficients, pairwise
    /// distinct variables, no sentinel literals, and a coefficient sum reaching `k`.
    pub fn well_formed(&self) -> bool {
        assert!(self.k.is_positive());
        let mut variables: HashSet<PropositionalVariable> = HashSet::new();
        let mut sum = BigInt::zero();
        for (literal, coefficient) in &self.args {
            assert!(coefficient.is_positive());
            assert!(*literal != Literal::TRUE);
            assert!(*literal != Literal::FALSE);
            assert!(variables.insert(literal.get_propositional_variable()));
            sum += coefficient;
        }
        assert!(sum >= self.k);
        true
    }
}

impl std::fmt::Display for PbInequality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.literal)?;
        for (index, (literal, coefficient)) in self.args.iter().enumerate() {
            if !coefficient.is_one() {
                write!(f, "{coefficient}*")?;
            }
            write!(f, "{literal}")?;
            if index + 1 == self.watch_size {
                write!(f, " .w")?;
            }
            if index + 1 < self.args.len() {
                write!(f, " + ")?;
            }
        }
        write!(f, " >= {}", self.k)
    }
}

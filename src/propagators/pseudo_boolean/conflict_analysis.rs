//! Generalized-resolution (cutting planes) conflict analysis. Starting from a falsified
//! constraint, the implication graph is walked in reverse trail order; every marked antecedent is
//! resolved with the justification that forced it, scaling both sides by lcm factors so the
//! resolved literal cancels. The result is either an asserting pseudo-Boolean lemma together with
//! the ordinary side literals to conjoin, or a plain clause when the lemma collapses.

use log::debug;
use num::BigInt;
use num::Integer;
use num::One;
use num::Signed;
use num::Zero;

use super::rewriter;
use super::rewriter::NormaliseOutcome;
use super::rewriter::PbTerms;
use super::PbConstraintHandle;
use super::PbConstraintStore;
use super::PbInequality;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::StorageKey;
use crate::calabash_asserts::calabash_assert_moderate;
use crate::calabash_asserts::calabash_assert_simple;
use crate::engine::Justification;
use crate::engine::SatContext;

/// What the analyzer produced for a conflict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ResolutionOutcome {
    /// No useful lemma: the conflict is below the constraint's level, the lemma evaluated to
    /// true, or the reverse-trail scan ran dry (out-of-order propagations from other engines).
    Abort,
    /// The lemma collapsed to false; the conflict is explained by the side literals alone and
    /// this clause (their negations) should be added.
    ConflictClause(Vec<Literal>),
    /// An open pseudo-Boolean lemma to re-internalize; its governing literal is then propagated
    /// with `premises` as justification.
    Lemma {
        terms: PbTerms,
        k: BigInt,
        premises: Vec<Literal>,
    },
}

/// Scratch state of the analyzer. Buffers are reset at the start of every resolution; the
/// analyzer is not reentrant.
#[derive(Debug, Default)]
pub(crate) struct CuttingPlanesAnalyser {
    lemma_args: PbTerms,
    lemma_k: BigInt,
    /// Side literals (currently true) conjoined into the final justification or, negated, into
    /// the fallback clause.
    ineq_literals: Vec<Literal>,
    /// Variables currently marked, for O(1) reset.
    marked: Vec<PropositionalVariable>,
    /// Per-variable position of the variable's term in `lemma_args`, while marked.
    conseq_index: Vec<Option<usize>>,
    /// Number of marked variables assigned at the conflict level.
    num_marks: usize,
    conflict_level: usize,
}

impl CuttingPlanesAnalyser {
    pub(crate) fn resolve_conflict(
        &mut self,
        context: &SatContext,
        store: &PbConstraintStore,
        conflicting: PbConstraintHandle,
        learn_complements: bool,
    ) -> ResolutionOutcome {
        let constraint = store
            .get(conflicting)
            .expect("the conflicting constraint is alive");

        let mut conflict_level = 0;
        for (literal, _) in &constraint.args {
            if context.is_literal_assigned_false(*literal) {
                conflict_level =
                    conflict_level.max(context.get_literal_assignment_level(*literal));
            }
        }
        if conflict_level < context.get_literal_assignment_level(constraint.literal())
            || conflict_level == 0
        {
            return ResolutionOutcome::Abort;
        }

        self.unset_marks();
        self.num_marks = 0;
        self.lemma_args.clear();
        self.lemma_k = BigInt::zero();
        self.ineq_literals.clear();
        self.conflict_level = conflict_level;
        self.process_ineq(context, constraint, None, BigInt::one(), learn_complements);

        let trail = context.assigned_literals();
        calabash_assert_simple!(!trail.is_empty());
        let mut index = trail.len() - 1;

        while self.num_marks > 0 {
            let num_terms = self.lemma_args.len();
            match rewriter::normalise(&mut self.lemma_args, &mut self.lemma_k) {
                NormaliseOutcome::TriviallyFalse => break,
                NormaliseOutcome::TriviallyTrue => {
                    debug!("lemma already evaluated");
                    return ResolutionOutcome::Abort;
                }
                NormaliseOutcome::Normalised => {}
            }
            // The lemma never holds zero, negative, or sentinel terms mid-resolution, so the
            // normalisation above cannot have moved any term.
            calabash_assert_moderate!(num_terms == self.lemma_args.len());

            // Find the most recently assigned marked variable on the trail.
            let conseq = loop {
                let candidate = trail[index];
                if self.is_marked(candidate.get_propositional_variable()) {
                    index = index.saturating_sub(1);
                    break candidate;
                }
                if index == 0 {
                    // Propagations from other engines are not totally ordered with ours; the
                    // marked variable can be missing from the scanned region. Not a soundness
                    // issue, but no lemma is learned.
                    debug!(
                        "conflict resolution abandoned: {} marks left unresolved",
                        self.num_marks
                    );
                    return ResolutionOutcome::Abort;
                }
                index -= 1;
            };
            let variable = conseq.get_propositional_variable();

            let conseq_index = self.conseq_index[variable.index()]
                .expect("a marked variable has a lemma position");
            let conseq_coeff = self.lemma_args[conseq_index].1.clone();
            calabash_assert_moderate!(!conseq == self.lemma_args[conseq_index].0);
            self.remove_from_lemma(context, conseq_index);

            match context.get_justification(variable) {
                Justification::Decision | Justification::Axiom => {
                    if context.get_literal_assignment_level(conseq) > 0 {
                        self.ineq_literals.push(conseq);
                    }
                }
                Justification::Clause(reference) => {
                    let clause = context.get_clause(*reference);
                    for antecedent in clause.get_literal_slice() {
                        if *antecedent != conseq {
                            self.process_antecedent(
                                context,
                                *antecedent,
                                conseq_coeff.clone(),
                                learn_complements,
                            );
                        }
                    }
                }
                Justification::BinaryClause { implicant } => {
                    self.process_antecedent(context, !*implicant, conseq_coeff, learn_complements);
                }
                Justification::External => {
                    self.ineq_literals.push(conseq);
                }
                Justification::PseudoBoolean {
                    constraint: reason_handle,
                    ..
                } => {
                    let reason = store
                        .get(*reason_handle)
                        .expect("a justifying constraint outlives its propagation");
                    self.process_ineq(
                        context,
                        reason,
                        Some(conseq),
                        conseq_coeff,
                        learn_complements,
                    );
                }
            }
        }

        self.hoist_maximal_values();
        let outcome = rewriter::normalise(&mut self.lemma_args, &mut self.lemma_k);
        rewriter::prune(&mut self.lemma_args, &mut self.lemma_k);

        match outcome {
            NormaliseOutcome::TriviallyTrue => {
                // Reachable only if the last resolution step trivialized the lemma after the
                // final mark was consumed; there is nothing useful to learn.
                debug!("resolved lemma is a tautology");
                ResolutionOutcome::Abort
            }
            NormaliseOutcome::TriviallyFalse => ResolutionOutcome::ConflictClause(
                self.ineq_literals.iter().map(|literal| !*literal).collect(),
            ),
            NormaliseOutcome::Normalised => ResolutionOutcome::Lemma {
                terms: std::mem::take(&mut self.lemma_args),
                k: std::mem::take(&mut self.lemma_k),
                premises: std::mem::take(&mut self.ineq_literals),
            },
        }
    }

    /// Resolves the lemma with `constraint`, cancelling `conseq`: both sides are scaled by their
    /// lcm factors, the constraint's threshold is added, and every argument is processed as an
    /// antecedent. Seeding the lemma is the `conseq == None` case with multiplier one.
    fn process_ineq(
        &mut self,
        context: &SatContext,
        constraint: &PbInequality,
        conseq: Option<Literal>,
        coeff1: BigInt,
        learn_complements: bool,
    ) {
        let coeff2 = match conseq {
            None => BigInt::one(),
            Some(conseq) => {
                let position = constraint
                    .args
                    .iter()
                    .position(|(literal, _)| *literal == conseq)
                    .expect("the resolved literal occurs in its justifying constraint");
                constraint.args[position].1.clone()
            }
        };
        calabash_assert_simple!(coeff2.is_positive());

        let lcm = coeff1.lcm(&coeff2);
        let lemma_factor = &lcm / &coeff1;
        if !lemma_factor.is_one() {
            for (_, coefficient) in self.lemma_args.iter_mut() {
                *coefficient *= &lemma_factor;
            }
            self.lemma_k *= &lemma_factor;
        }
        let constraint_factor = &lcm / &coeff2;
        self.lemma_k += &constraint_factor * &constraint.k;

        for (literal, coefficient) in &constraint.args {
            self.process_antecedent(
                context,
                *literal,
                &constraint_factor * coefficient,
                learn_complements,
            );
        }

        calabash_assert_moderate!(context.is_literal_assigned_true(constraint.literal()));
        if context.get_literal_assignment_level(constraint.literal()) > 0 {
            self.ineq_literals.push(constraint.literal());
        }
    }

    /// Folds one antecedent literal into the lemma. A literal that is not false contributes
    /// satisfaction rather than obligation, so only the threshold drops (and, with complement
    /// learning, an existing complementary term is cancelled). A false literal above the root is
    /// added or accumulated, marking its variable.
    fn process_antecedent(
        &mut self,
        context: &SatContext,
        literal: Literal,
        coefficient: BigInt,
        learn_complements: bool,
    ) {
        let variable = literal.get_propositional_variable();

        if !context.is_literal_assigned_false(literal) {
            self.lemma_k -= &coefficient;
            if learn_complements && self.is_marked(variable) {
                calabash_assert_moderate!(context.is_literal_assigned_true(literal));
                let position = self.conseq_index[variable.index()].unwrap();
                self.lemma_args[position].1 -= &coefficient;
                if !self.lemma_args[position].1.is_positive() {
                    self.remove_from_lemma(context, position);
                }
            }
            return;
        }

        let level = context.get_literal_assignment_level(literal);
        if level == 0 {
            return;
        }
        if self.is_marked(variable) {
            let position = self.conseq_index[variable.index()].unwrap();
            self.lemma_args[position].1 += &coefficient;
            calabash_assert_moderate!(self.lemma_args[position].1.is_positive());
        } else {
            if level == self.conflict_level {
                self.num_marks += 1;
            }
            self.set_mark(variable, self.lemma_args.len());
            self.lemma_args.push((literal, coefficient));
        }
    }

    /// Any term whose coefficient reaches the threshold decides satisfaction on its own; its
    /// negation moves to the side literals and the term leaves the lemma.
    fn hoist_maximal_values(&mut self) {
        let mut index = 0;
        while index < self.lemma_args.len() {
            if self.lemma_args[index].1 >= self.lemma_k {
                let literal = self.lemma_args[index].0;
                self.ineq_literals.push(!literal);
                let _ = self.lemma_args.swap_remove(index);
            } else {
                index += 1;
            }
        }
    }

    fn remove_from_lemma(&mut self, context: &SatContext, index: usize) {
        let literal = self.lemma_args[index].0;
        let last = self.lemma_args.len() - 1;
        if index != last {
            self.lemma_args.swap(index, last);
            let moved = self.lemma_args[index].0.get_propositional_variable();
            self.conseq_index[moved.index()] = Some(index);
        }
        let _ = self.lemma_args.pop();
        self.unset_mark(literal.get_propositional_variable());
        // Only conflict-level variables are counted in `num_marks`.
        if context.get_literal_assignment_level(literal) == self.conflict_level {
            self.num_marks -= 1;
        }
    }

    fn set_mark(&mut self, variable: PropositionalVariable, position: usize) {
        if variable.index() >= self.conseq_index.len() {
            self.conseq_index.resize(variable.index() + 1, None);
        }
        calabash_assert_moderate!(self.conseq_index[variable.index()].is_none());
        self.marked.push(variable);
        self.conseq_index[variable.index()] = Some(position);
    }

    fn is_marked(&self, variable: PropositionalVariable) -> bool {
        variable.index() < self.conseq_index.len() && self.conseq_index[variable.index()].is_some()
    }

    fn unset_mark(&mut self, variable: PropositionalVariable) {
        if variable.index() < self.conseq_index.len() {
            self.conseq_index[variable.index()] = None;
        }
    }

    fn unset_marks(&mut self) {
        for variable in std::mem::take(&mut self.marked) {
            self.conseq_index[variable.index()] = None;
        }
    }
}

//! The pseudo-Boolean theory: atom internalization, the watched-literal propagation engine, the
//! scope machinery, and the hooks into conflict analysis and sorting-network compilation.

use log::debug;
use log::trace;
use num::BigInt;
use num::One;
use num::ToPrimitive;
use num::Zero;

use super::atom::PbAtom;
use super::conflict_analysis::CuttingPlanesAnalyser;
use super::conflict_analysis::ResolutionOutcome;
use super::inequality::CompilationStatus;
use super::options::PbOptions;
use super::rewriter;
use super::rewriter::NormaliseOutcome;
use super::statistics::PbStatistics;
use super::store::PbConstraintHandle;
use super::store::PbConstraintStore;
use super::PbInequality;
use crate::basic_types::ClauseReference;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::calabash_asserts::calabash_assert_advanced;
use crate::calabash_asserts::calabash_assert_extreme;
use crate::calabash_asserts::calabash_assert_moderate;
use crate::calabash_asserts::calabash_assert_simple;
use crate::encoders::SortingNetwork;
use crate::engine::debug_helper::DebugHelper;
use crate::engine::ConflictInfo;
use crate::engine::Justification;
use crate::engine::SatContext;

/// Result of feeding an assignment into the theory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropagationStatus {
    NoConflictDetected,
    /// The watch engine found a falsified constraint; the emitted clause explains the conflict.
    ConflictDetected { conflict_clause: ClauseReference },
    /// A propagation collided with an existing opposite assignment; the host's clause-level
    /// analysis takes over from the recorded justification.
    ConflictingPropagation { literal: Literal },
}

/// The theory performs all its work incrementally during [`PbTheory::assign`], so the final
/// check never has residual work.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FinalCheckStatus {
    Done,
    Incomplete,
}

/// The pseudo-Boolean theory plugin. Constraints are owned by the store; the watch lists and the
/// enabled-constraint trail hold handles into it.
#[derive(Debug, Default)]
pub struct PbTheory {
    store: PbConstraintStore,
    /// Indexed by literal code: the constraints watching that literal in their prefix.
    watch_lists: Vec<Vec<PbConstraintHandle>>,
    /// Constraints whose watched prefix is installed, in enabling order.
    enabled_trail: Vec<PbConstraintHandle>,
    enabled_limits: Vec<usize>,
    pending_compilation: Vec<PbConstraintHandle>,
    /// (scope depth, handle) pairs rewinding `compiled` flags on backtracking.
    compiled_value_trail: Vec<(usize, PbConstraintHandle)>,
    analyser: CuttingPlanesAnalyser,
    options: PbOptions,
    statistics: PbStatistics,
}

impl PbTheory {
    pub fn with_options(options: PbOptions) -> PbTheory {
        PbTheory {
            options,
            ..Default::default()
        }
    }

    pub fn statistics(&self) -> &PbStatistics {
        &self.statistics
    }

    pub fn num_constraints(&self) -> usize {
        self.store.num_constraints()
    }

    /// Internalizes a pseudo-Boolean atom and returns its governing literal. The atom is
    /// canonicalized to a `>=` form; trivial atoms become unit clauses, cardinality atoms with
    /// threshold 1 are emitted directly as clauses, and everything else becomes a watched
    /// constraint.
    pub fn internalize_atom(
        &mut self,
        context: &mut SatContext,
        atom: PbAtom,
    ) -> Result<Literal, ConstraintOperationError> {
        self.statistics.num_predicates += 1;

        let atom_literal = Literal::new(context.create_new_propositional_variable(), true);

        let (mut terms, mut k) = atom.into_geq_terms();
        rewriter::unique(&mut terms, &mut k);
        let outcome = rewriter::normalise(&mut terms, &mut k);
        rewriter::prune(&mut terms, &mut k);

        match outcome {
            NormaliseOutcome::TriviallyTrue => {
                let _ = context
                    .add_unit_clause(atom_literal)
                    .map_err(|_| ConstraintOperationError::InfeasibleAtom)?;
                return Ok(atom_literal);
            }
            NormaliseOutcome::TriviallyFalse => {
                let _ = context
                    .add_unit_clause(!atom_literal)
                    .map_err(|_| ConstraintOperationError::InfeasibleAtom)?;
                return Ok(atom_literal);
            }
            NormaliseOutcome::Normalised => {}
        }

        if k.is_one() {
            // A threshold of one is a plain disjunction; emit the clausal equivalence and skip
            // the watched machinery entirely.
            let mut clause = vec![!atom_literal];
            for (literal, coefficient) in &terms {
                calabash_assert_moderate!(coefficient.is_one());
                clause.push(*literal);
                let _ = context.add_clause(vec![atom_literal, !*literal]);
            }
            let _ = context.add_clause(clause);
            return Ok(atom_literal);
        }

        let mut enable_compilation = self.options.enable_compilation;
        for (_, coefficient) in &terms {
            enable_compilation = enable_compilation && *coefficient < BigInt::from(8);
        }
        let compilation_threshold = if enable_compilation {
            let mut log = 1u64;
            let mut n = 1u64;
            while n <= terms.len() as u64 {
                log += 1;
                n *= 2;
            }
            let threshold = terms.len() as u64 * log;
            debug!("setting compilation threshold to {threshold}");
            Some(threshold)
        } else {
            None
        };

        let constraint = PbInequality::new(atom_literal, terms, k, compilation_threshold);
        trace!("internalized {constraint}");
        let _ = self.store.insert(constraint);

        Ok(atom_literal)
    }

    /// Notification that `variable` has been assigned. Constraints watching the falsified
    /// literal update their prefixes, and a constraint governed by the variable is enabled
    /// (negating it in place when the literal was assigned false).
    pub fn assign(
        &mut self,
        context: &mut SatContext,
        variable: PropositionalVariable,
        value: bool,
    ) -> PropagationStatus {
        let mut status = PropagationStatus::NoConflictDetected;
        let falsified_literal = Literal::new(variable, !value);
        trace!("assign: {}", Literal::new(variable, value));

        let mut watcher_index = 0;
        loop {
            let num_watchers = self
                .watch_lists
                .get(falsified_literal.to_u32() as usize)
                .map_or(0, Vec::len);
            if watcher_index >= num_watchers {
                break;
            }
            let handle = self.watch_lists[falsified_literal][watcher_index];
            let removed =
                self.assign_watch(context, handle, falsified_literal, watcher_index, &mut status);
            if !removed {
                watcher_index += 1;
            }
        }

        if let Some(handle) = self.store.handle_for_variable(variable) {
            self.assign_ineq(context, handle, value, &mut status);
        }

        status
    }

    /// Enables a constraint whose governing literal was just assigned. With a false assignment
    /// the constraint is first replaced by its negation, after which the governing literal of
    /// the rewritten constraint holds.
    fn assign_ineq(
        &mut self,
        context: &mut SatContext,
        handle: PbConstraintHandle,
        is_true: bool,
        status: &mut PropagationStatus,
    ) {
        let mut propagations: Vec<Literal> = Vec::new();
        let mut premises: Vec<Literal> = Vec::new();
        let mut conflict: Option<Vec<Literal>> = None;
        let mut enabled = false;

        {
            let constraint = self
                .store
                .get_mut(handle)
                .expect("a governed constraint is alive");
            if constraint.literal().is_positive() != is_true {
                constraint.negate();
            }
            calabash_assert_moderate!(constraint.well_formed());

            let mut max_possible = BigInt::zero();
            let mut min_unassigned: Option<BigInt> = None;
            for (literal, coefficient) in &constraint.args {
                if !context.assignments.is_literal_assigned_false(*literal) {
                    max_possible += coefficient;
                }
                if context.assignments.is_literal_unassigned(*literal)
                    && min_unassigned
                        .as_ref()
                        .map_or(true, |minimum| coefficient < minimum)
                {
                    min_unassigned = Some(coefficient.clone());
                }
            }
            trace!("enable: {constraint}");

            if max_possible < constraint.k {
                let mut clause = collect_falsified_literals(context, constraint);
                clause.push(!constraint.literal());
                conflict = Some(clause);
            } else {
                constraint.watch_sum = BigInt::zero();
                constraint.watch_size = 0;
                constraint.max_watch = BigInt::zero();
                let mut index = 0;
                while constraint.watch_sum < &constraint.k + &constraint.max_watch
                    && index < constraint.args.len()
                {
                    if !context
                        .assignments
                        .is_literal_assigned_false(constraint.args[index].0)
                    {
                        add_watch(constraint, &mut self.watch_lists, handle, index);
                    }
                    index += 1;
                }
                calabash_assert_simple!(constraint.watch_sum >= constraint.k);
                calabash_assert_advanced!(DebugHelper::check_watched_prefix(constraint));
                enabled = true;

                let minimum = min_unassigned.unwrap_or_else(BigInt::zero);
                if &max_possible - &minimum < constraint.k {
                    premises = collect_propagation_premises(context, constraint);
                    for (literal, _) in &constraint.args {
                        if context.assignments.is_literal_unassigned(*literal) {
                            propagations.push(*literal);
                        }
                    }
                }
            }
        }

        if let Some(clause) = conflict {
            let reference = self.emit_conflict(context, handle, clause);
            record_conflict(
                status,
                PropagationStatus::ConflictDetected {
                    conflict_clause: reference,
                },
            );
            return;
        }
        if enabled {
            self.enabled_trail.push(handle);
        }
        for literal in propagations {
            self.add_assign(context, handle, premises.clone(), literal, status);
        }
    }

    /// A literal watched by `handle` has been falsified. The prefix is extended until a single
    /// further falsification cannot be missed, after which the falsified entry either exposes a
    /// conflict, or leaves the prefix (possibly entering the unit zone where every weighty
    /// unassigned literal is forced).
    fn assign_watch(
        &mut self,
        context: &mut SatContext,
        handle: PbConstraintHandle,
        falsified_literal: Literal,
        watcher_index: usize,
        status: &mut PropagationStatus,
    ) -> bool {
        let mut propagations: Vec<Literal> = Vec::new();
        let mut premises: Vec<Literal> = Vec::new();
        let mut conflict: Option<Vec<Literal>> = None;
        let removed;

        {
            let constraint = self
                .store
                .get_mut(handle)
                .expect("watched constraints are alive");
            calabash_assert_moderate!(context.is_literal_assigned_true(constraint.literal()));

            let variable = falsified_literal.get_propositional_variable();
            let arg_index = constraint
                .find_variable(variable, 0..constraint.watch_size)
                .expect("the falsified literal is in the watched prefix");
            calabash_assert_moderate!(constraint.arg_literal(arg_index) == falsified_literal);

            let k = constraint.k.clone();
            let coefficient = constraint.args[arg_index].1.clone();

            let mut add_more =
                &constraint.watch_sum - &coefficient < &k + &constraint.max_watch;
            let mut index = constraint.watch_size;
            while add_more && index < constraint.args.len() {
                if !context
                    .assignments
                    .is_literal_assigned_false(constraint.args[index].0)
                {
                    add_watch(constraint, &mut self.watch_lists, handle, index);
                    add_more = &constraint.watch_sum - &coefficient < &k + &constraint.max_watch;
                }
                index += 1;
            }

            if &constraint.watch_sum - &coefficient < k {
                // Too little weight remains; e.g. for L: 3*x1 + 2*x2 + x4 >= 3 with x1 and x2
                // falsified the clause x1 \/ x2 \/ ~L is created.
                let mut clause = collect_falsified_literals(context, constraint);
                clause.push(!constraint.literal());
                conflict = Some(clause);
                removed = false;
            } else {
                del_watch(
                    &mut self.watch_lists[falsified_literal],
                    watcher_index,
                    constraint,
                    arg_index,
                );
                removed = true;
                calabash_assert_simple!(constraint.watch_sum >= k);
                if constraint.watch_sum < &k + &constraint.max_watch {
                    // The unit zone: any unassigned literal whose weight exceeds the slack is
                    // forced.
                    let deficit = &constraint.watch_sum - &k;
                    for (literal, arg_coefficient) in &constraint.args {
                        if context.assignments.is_literal_unassigned(*literal)
                            && *arg_coefficient > deficit
                        {
                            propagations.push(*literal);
                        }
                    }
                    if !propagations.is_empty() {
                        premises = collect_propagation_premises(context, constraint);
                    }
                }
            }
        }

        if let Some(clause) = conflict {
            let reference = self.emit_conflict(context, handle, clause);
            record_conflict(
                status,
                PropagationStatus::ConflictDetected {
                    conflict_clause: reference,
                },
            );
            return removed;
        }
        for literal in propagations {
            self.add_assign(context, handle, premises.clone(), literal, status);
        }
        removed
    }

    /// Emits a propagation with a pseudo-Boolean justification.
    fn add_assign(
        &mut self,
        context: &mut SatContext,
        handle: PbConstraintHandle,
        premises: Vec<Literal>,
        consequent: Literal,
        status: &mut PropagationStatus,
    ) {
        self.inc_propagations(handle);
        self.statistics.num_propagations += 1;
        if let Some(constraint) = self.store.get(handle) {
            calabash_assert_advanced!(DebugHelper::check_propagation(
                context, constraint, &premises, consequent
            ));
            trace!("{constraint} => {consequent}");
        }

        let conflict = context.enqueue_propagated_literal(
            consequent,
            Justification::PseudoBoolean {
                constraint: handle,
                premises,
            },
        );
        if let Some(ConflictInfo::Propagation { literal, .. }) = conflict {
            record_conflict(status, PropagationStatus::ConflictingPropagation { literal });
        }
    }

    /// Emits the conflict clause for a falsified constraint, running the cutting-planes analyzer
    /// first when the conflict-frequency predicate admits it.
    fn emit_conflict(
        &mut self,
        context: &mut SatContext,
        handle: PbConstraintHandle,
        clause: Vec<Literal>,
    ) -> ClauseReference {
        self.inc_propagations(handle);
        self.statistics.num_conflicts += 1;

        let run_analyser = self.options.conflict_frequency == 0
            || self.store.get(handle).map_or(false, |constraint| {
                constraint.num_propagations() % self.options.conflict_frequency as u64 == 0
            });
        if run_analyser {
            let outcome = self.analyser.resolve_conflict(
                context,
                &self.store,
                handle,
                self.options.learn_complements,
            );
            match outcome {
                ResolutionOutcome::Abort => {}
                ResolutionOutcome::ConflictClause(literals) => {
                    self.inc_propagations(handle);
                    self.statistics.num_conflicts += 1;
                    if literals.is_empty() {
                        debug!("resolution derived the empty clause");
                    } else {
                        let _ = context.add_clause(literals);
                    }
                }
                ResolutionOutcome::Lemma { terms, k, premises } => {
                    match self.internalize_atom(context, PbAtom::GreaterEqual { terms, k }) {
                        Ok(lemma_literal) => {
                            let mut ignored = PropagationStatus::NoConflictDetected;
                            self.add_assign(context, handle, premises, lemma_literal, &mut ignored);
                        }
                        Err(error) => debug!("discarding resolved lemma: {error}"),
                    }
                }
            }
        }

        context.add_clause(clause)
    }

    fn inc_propagations(&mut self, handle: PbConstraintHandle) {
        let Some(constraint) = self.store.get_mut(handle) else {
            return;
        };
        constraint.num_propagations += 1;
        if constraint.compiled == CompilationStatus::Uncompiled
            && constraint
                .compilation_threshold
                .map_or(false, |threshold| constraint.num_propagations > threshold)
        {
            constraint.compiled = CompilationStatus::Scheduled;
            self.pending_compilation.push(handle);
        }
    }

    pub fn push_scope(&mut self) {
        self.store.push_scope();
        self.enabled_limits.push(self.enabled_trail.len());
    }

    /// Uninstalls the watched prefixes enabled in the popped scopes, frees the constraints
    /// created in them, and rewinds `compiled` flags past the pop point.
    pub fn pop_scopes(&mut self, num_scopes: usize) {
        calabash_assert_simple!(num_scopes <= self.enabled_limits.len());
        let new_depth = self.enabled_limits.len() - num_scopes;
        let retained = self.enabled_limits[new_depth];
        while self.enabled_trail.len() > retained {
            let handle = self.enabled_trail.pop().unwrap();
            let constraint = self
                .store
                .get(handle)
                .expect("enabled constraints are alive until their scope is popped");
            for index in 0..constraint.watch_size {
                let literal = constraint.args[index].0;
                let watchers = &mut self.watch_lists[literal];
                let position = watchers
                    .iter()
                    .position(|watcher| *watcher == handle)
                    .expect("a watched literal lists its watching constraint");
                let _ = watchers.swap_remove(position);
            }
        }
        self.enabled_limits.truncate(new_depth);

        self.store.pop_scopes(num_scopes);

        while let Some((depth, handle)) = self.compiled_value_trail.last().copied() {
            if depth <= new_depth {
                break;
            }
            let _ = self.compiled_value_trail.pop();
            if let Some(constraint) = self.store.get_mut(handle) {
                constraint.compiled = CompilationStatus::Uncompiled;
            }
        }
    }

    /// Compiles the constraints scheduled since the last restart. Constraints removed by an
    /// intervening pop, or no longer scheduled, are skipped.
    pub fn restart(&mut self, context: &mut SatContext) {
        let pending = std::mem::take(&mut self.pending_compilation);
        for handle in pending {
            let scheduled = self.store.get(handle).map_or(false, |constraint| {
                constraint.compiled == CompilationStatus::Scheduled
            });
            if scheduled {
                self.compile_constraint(context, handle);
            }
        }
    }

    /// Called when a (re)search starts; deferred compilation work does not carry over.
    pub fn init_search(&mut self) {
        self.pending_compilation.clear();
    }

    /// Turns a scheduled cardinality constraint into clauses through a sorting network. Each
    /// term contributes `coefficient` copies of its literal; terms already fixed at the root are
    /// folded into the bound. If the governing literal is itself fixed true at the root only the
    /// forward wiring is emitted, otherwise the network output and the governing literal are
    /// made equivalent.
    fn compile_constraint(&mut self, context: &mut SatContext, handle: PbConstraintHandle) {
        self.statistics.num_compilations += 1;

        let governing;
        let mut bound;
        let mut input: Vec<Literal> = Vec::new();
        let one_directional;
        {
            let constraint = self
                .store
                .get(handle)
                .expect("scheduled constraints are checked for liveness");
            calabash_assert_simple!(constraint.compilation_threshold.is_some());
            bound = constraint
                .k
                .to_u64()
                .expect("compilation is gated on small coefficients")
                as usize;
            governing = constraint.literal();
            for (literal, coefficient) in &constraint.args {
                let copies = coefficient
                    .to_u64()
                    .expect("compilation is gated on small coefficients")
                    as usize;
                if context.is_literal_root_assignment(*literal) {
                    if context.is_literal_assigned_true(*literal) {
                        if bound < copies {
                            // Fixed literals already satisfy the constraint.
                            return;
                        }
                        bound -= copies;
                    }
                    continue;
                }
                input.extend(std::iter::repeat(*literal).take(copies));
            }
            one_directional = context.is_literal_assigned_true(governing)
                && context.is_literal_root_assignment(governing);
        }

        let mut network = SortingNetwork::new(context);
        let at_least = network.at_least(!one_directional, bound, &input);
        let (num_variables, num_clauses) = network.into_counts();
        self.statistics.num_compiled_vars += num_variables;
        self.statistics.num_compiled_clauses += num_clauses;

        let _ = context.add_clause(vec![!governing, at_least]);
        if !one_directional {
            let _ = context.add_clause(vec![!at_least, governing]);
        }
        debug!(
            "compiled sorting network bound: {bound} literals: {}",
            input.len()
        );

        let depth = self.enabled_limits.len();
        let constraint = self.store.get_mut(handle).unwrap();
        constraint.compiled = CompilationStatus::Compiled;
        self.compiled_value_trail.push((depth, handle));
    }

    /// All propagation happens incrementally, so the final check only validates (in heavily
    /// checked builds) that every assigned constraint agrees with its governing literal.
    pub fn final_check(&mut self, context: &SatContext) -> FinalCheckStatus {
        for handle in self.store.live_handles() {
            let constraint = self.store.get(handle).unwrap();
            calabash_assert_extreme!(DebugHelper::check_assigned_constraint(context, constraint));
        }
        FinalCheckStatus::Done
    }

    /// Equalities between Boolean theory variables carry no propagation here.
    pub fn new_equality(&self, v1: PropositionalVariable, v2: PropositionalVariable) {
        trace!("{v1} = {v2}");
    }

    /// Evaluates a pseudo-Boolean atom under the current (total) assignment for model
    /// construction.
    pub fn mk_value(&self, context: &SatContext, atom: &PbAtom) -> Option<bool> {
        atom.evaluate(&context.assignments)
    }

    /// Drops all constraints, watches, trails, and statistics.
    pub fn reset(&mut self) {
        let options = self.options;
        *self = PbTheory::with_options(options);
    }

    #[cfg(test)]
    pub(crate) fn constraint_for_variable(
        &self,
        variable: PropositionalVariable,
    ) -> Option<&PbInequality> {
        self.store
            .handle_for_variable(variable)
            .and_then(|handle| self.store.get(handle))
    }
}

fn record_conflict(status: &mut PropagationStatus, conflict: PropagationStatus) {
    if matches!(status, PropagationStatus::NoConflictDetected) {
        *status = conflict;
    }
}

fn watch_list_for<'a>(
    watch_lists: &'a mut Vec<Vec<PbConstraintHandle>>,
    literal: Literal,
) -> &'a mut Vec<PbConstraintHandle> {
    let index = literal.to_u32() as usize;
    if watch_lists.len() <= index {
        watch_lists.resize_with(index + 1, Vec::new);
    }
    &mut watch_lists[index]
}

/// Moves argument `index` into the watched prefix and registers the constraint in the literal's
/// watch list.
fn add_watch(
    constraint: &mut PbInequality,
    watch_lists: &mut Vec<Vec<PbConstraintHandle>>,
    handle: PbConstraintHandle,
    index: usize,
) {
    let (literal, coefficient) = constraint.args[index].clone();
    constraint.watch_sum += &coefficient;
    calabash_assert_simple!(index >= constraint.watch_size);
    if index > constraint.watch_size {
        constraint.args.swap(index, constraint.watch_size);
    }
    constraint.watch_size += 1;
    if coefficient > constraint.max_watch {
        constraint.max_watch = coefficient;
    }
    watch_list_for(watch_lists, literal).push(handle);
}

/// Removes the watcher entry and takes argument `arg_index` out of the watched prefix, swapping
/// it to the prefix boundary. When the removed coefficient was the unique maximum, the cached
/// maximum is recomputed by scanning the remaining prefix.
fn del_watch(
    watchers: &mut Vec<PbConstraintHandle>,
    watcher_index: usize,
    constraint: &mut PbInequality,
    arg_index: usize,
) {
    let _ = watchers.swap_remove(watcher_index);

    calabash_assert_simple!(arg_index < constraint.watch_size);
    let coefficient = constraint.args[arg_index].1.clone();
    if arg_index + 1 < constraint.watch_size {
        constraint.args.swap(arg_index, constraint.watch_size - 1);
    }
    constraint.watch_size -= 1;
    constraint.watch_sum -= &coefficient;
    if constraint.max_watch == coefficient {
        let mut max = BigInt::zero();
        for (_, watched_coefficient) in &constraint.args[..constraint.watch_size] {
            if *watched_coefficient > max {
                max = watched_coefficient.clone();
            }
        }
        constraint.max_watch = max;
    }
}

/// The currently falsified argument literals, as they appear in the constraint.
fn collect_falsified_literals(context: &SatContext, constraint: &PbInequality) -> Vec<Literal> {
    constraint
        .args
        .iter()
        .filter(|(literal, _)| context.is_literal_assigned_false(*literal))
        .map(|(literal, _)| *literal)
        .collect()
}

/// The premise literals justifying a propagation: the negations of the falsified arguments
/// together with the governing literal, all currently true.
fn collect_propagation_premises(context: &SatContext, constraint: &PbInequality) -> Vec<Literal> {
    let mut premises: Vec<Literal> = constraint
        .args
        .iter()
        .filter(|(literal, _)| context.is_literal_assigned_false(*literal))
        .map(|(literal, _)| !*literal)
        .collect();
    premises.push(constraint.literal());
    premises
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_utils::unit_propagate_to_fixpoint;

    fn setup(options: PbOptions) -> (SatContext, PbTheory) {
        (SatContext::default(), PbTheory::with_options(options))
    }

    fn analysing_options() -> PbOptions {
        PbOptions {
            conflict_frequency: 0,
            enable_compilation: false,
            ..Default::default()
        }
    }

    fn notify(
        theory: &mut PbTheory,
        context: &mut SatContext,
        assigned_literal: Literal,
    ) -> PropagationStatus {
        theory.assign(
            context,
            assigned_literal.get_propositional_variable(),
            assigned_literal.is_positive(),
        )
    }

    fn assign_at_root(
        theory: &mut PbTheory,
        context: &mut SatContext,
        literal: Literal,
    ) -> PropagationStatus {
        let conflict = context.enqueue_propagated_literal(literal, Justification::Axiom);
        assert!(conflict.is_none());
        notify(theory, context, literal)
    }

    fn decide(
        theory: &mut PbTheory,
        context: &mut SatContext,
        literal: Literal,
    ) -> PropagationStatus {
        context.push_scope();
        theory.push_scope();
        context.enqueue_decision_literal(literal);
        notify(theory, context, literal)
    }

    fn decide_silently(theory: &mut PbTheory, context: &mut SatContext, literal: Literal) {
        context.push_scope();
        theory.push_scope();
        context.enqueue_decision_literal(literal);
    }

    fn backtrack(theory: &mut PbTheory, context: &mut SatContext, num_scopes: usize) {
        context.pop_scopes(num_scopes);
        theory.pop_scopes(num_scopes);
    }

    fn clause_literals(context: &SatContext, reference: ClauseReference) -> Vec<Literal> {
        context.get_clause(reference).get_literal_slice().to_vec()
    }

    fn last_clause(context: &SatContext) -> Vec<Literal> {
        let num_clauses = context.clause_store.num_clauses();
        clause_literals(context, ClauseReference::new(num_clauses as u32 - 1))
    }

    #[test]
    fn trivially_true_and_false_atoms_become_unit_clauses() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();

        let tautology = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 1.into())],
                    k: 0.into(),
                },
            )
            .unwrap();
        assert!(context.is_literal_assigned_true(tautology));

        let contradiction = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 1.into())],
                    k: 5.into(),
                },
            )
            .unwrap();
        assert!(context.is_literal_assigned_false(contradiction));
        assert_eq!(0, theory.num_constraints());
    }

    #[test]
    fn threshold_one_atoms_are_emitted_as_clauses() {
        // x1 + x2 + x3 >= 1 becomes a plain disjunction with binary back-implications; no
        // watched constraint is created, and the clauses alone propagate the last literal.
        let (mut context, mut theory) = setup(PbOptions::default());
        let xs: Vec<Literal> = context.new_literals().take(3).collect();

        let atom_literal = theory
            .internalize_atom(
                &mut context,
                PbAtom::AtLeast {
                    literals: xs.clone(),
                    k: 1.into(),
                },
            )
            .unwrap();

        assert_eq!(0, theory.num_constraints());
        assert_eq!(
            vec![!atom_literal, xs[0], xs[1], xs[2]],
            last_clause(&context)
        );

        let _ = assign_at_root(&mut theory, &mut context, atom_literal);
        let _ = assign_at_root(&mut theory, &mut context, !xs[0]);
        let _ = assign_at_root(&mut theory, &mut context, !xs[1]);
        assert!(!unit_propagate_to_fixpoint(&mut context));
        assert!(context.is_literal_assigned_true(xs[2]));
    }

    #[test]
    fn signed_less_equal_normalises_to_a_disjunction() {
        // 2x + 3y <= 4 flips into 2~x + 3~y >= 1, whose threshold-one form is emitted directly
        // as ~x \/ ~y with the governing equivalence clauses.
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();

        let atom_literal = theory
            .internalize_atom(
                &mut context,
                PbAtom::LessEqual {
                    terms: vec![(x, 2.into()), (y, 3.into())],
                    k: 4.into(),
                },
            )
            .unwrap();

        assert_eq!(0, theory.num_constraints());
        let clauses: Vec<Vec<Literal>> = context
            .clause_store
            .iter()
            .map(|clause| clause.get_literal_slice().to_vec())
            .collect();
        assert!(clauses.contains(&vec![atom_literal, x]));
        assert!(clauses.contains(&vec![atom_literal, y]));
        assert!(clauses.contains(&vec![!atom_literal, !x, !y]));
    }

    #[test]
    fn watch_engine_propagates_forced_literals() {
        // 2x + y + z >= 2 under ~x forces both y and z.
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let z = context.new_literals().next().unwrap();

        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 2.into()), (y, 1.into()), (z, 1.into())],
                    k: 2.into(),
                },
            )
            .unwrap();
        let _ = assign_at_root(&mut theory, &mut context, governing);

        let status = decide(&mut theory, &mut context, !x);

        assert_eq!(PropagationStatus::NoConflictDetected, status);
        assert!(context.is_literal_assigned_true(y));
        assert!(context.is_literal_assigned_true(z));
        let justification = context.get_justification(y.get_propositional_variable());
        match justification {
            Justification::PseudoBoolean { premises, .. } => {
                assert_eq!(&vec![!x, governing], premises);
            }
            other => panic!("unexpected justification {other:?}"),
        }

        let constraint = theory
            .constraint_for_variable(governing.get_propositional_variable())
            .unwrap();
        assert!(DebugHelper::check_watched_prefix(constraint));
        assert_eq!(2, theory.statistics().num_propagations);
    }

    #[test]
    fn enabling_an_unsatisfiable_constraint_reports_the_conflict_clause() {
        // 3x + 2y + z >= 3 with x and y false can reach at most 1.
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let z = context.new_literals().next().unwrap();

        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 3.into()), (y, 2.into()), (z, 1.into())],
                    k: 3.into(),
                },
            )
            .unwrap();

        decide_silently(&mut theory, &mut context, !x);
        decide_silently(&mut theory, &mut context, !y);
        let status = decide(&mut theory, &mut context, governing);

        let PropagationStatus::ConflictDetected { conflict_clause } = status else {
            panic!("expected a conflict, got {status:?}");
        };
        let clause = clause_literals(&context, conflict_clause);
        assert_eq!(vec![x, y, !governing], clause);
        // The clause is falsified by the current assignment, and the weight outside it cannot
        // reach the threshold.
        for literal in &clause {
            assert!(context.is_literal_assigned_false(*literal));
        }
        let constraint = theory
            .constraint_for_variable(governing.get_propositional_variable())
            .unwrap();
        let remaining: BigInt = constraint
            .args
            .iter()
            .filter(|(literal, _)| !clause.contains(literal))
            .map(|(_, coefficient)| coefficient.clone())
            .sum();
        assert!(remaining < *constraint.k());
        assert_eq!(1, theory.statistics().num_conflicts);
    }

    #[test]
    fn falsifying_a_watched_literal_detects_the_conflict() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let z = context.new_literals().next().unwrap();

        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 3.into()), (y, 2.into()), (z, 1.into())],
                    k: 3.into(),
                },
            )
            .unwrap();
        let _ = assign_at_root(&mut theory, &mut context, governing);

        let status = decide(&mut theory, &mut context, !x);
        assert_eq!(PropagationStatus::NoConflictDetected, status);
        // y and z were forced; back up and refalsify so the conflict surfaces through the
        // falsification of a watched literal rather than at enable time.
        assert!(context.is_literal_assigned_true(y));
        backtrack(&mut theory, &mut context, 1);

        decide_silently(&mut theory, &mut context, !x);
        decide_silently(&mut theory, &mut context, !y);
        let status = notify(&mut theory, &mut context, !y);
        let PropagationStatus::ConflictDetected { conflict_clause } = status else {
            panic!("expected a conflict, got {status:?}");
        };
        let clause = clause_literals(&context, conflict_clause);
        assert!(clause.contains(&x));
        assert!(clause.contains(&y));
        assert!(clause.contains(&!governing));
        assert_eq!(3, clause.len());
    }

    #[test]
    fn a_false_governing_literal_negates_the_constraint_in_place() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let z = context.new_literals().next().unwrap();

        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 2.into()), (y, 1.into()), (z, 1.into())],
                    k: 2.into(),
                },
            )
            .unwrap();

        let status = decide(&mut theory, &mut context, !governing);
        assert_eq!(PropagationStatus::NoConflictDetected, status);
        let constraint = theory
            .constraint_for_variable(governing.get_propositional_variable())
            .unwrap();
        // 2x + y + z >= 2 negated is 2~x + ~y + ~z >= 3.
        assert_eq!(!governing, constraint.literal());
        assert_eq!(BigInt::from(3), *constraint.k());

        // Asserting x now contradicts the negated form: 1 + 1 < 3.
        let status = decide(&mut theory, &mut context, x);
        let PropagationStatus::ConflictDetected { conflict_clause } = status else {
            panic!("expected a conflict, got {status:?}");
        };
        assert_eq!(
            vec![!x, governing],
            clause_literals(&context, conflict_clause)
        );

        // Backtracking past the negation point and asserting the literal restores the original
        // polarity.
        backtrack(&mut theory, &mut context, 2);
        let _ = decide(&mut theory, &mut context, governing);
        let constraint = theory
            .constraint_for_variable(governing.get_propositional_variable())
            .unwrap();
        assert_eq!(governing, constraint.literal());
        assert_eq!(BigInt::from(2), *constraint.k());
    }

    #[test]
    fn resolution_learns_an_asserting_pseudo_boolean_lemma() {
        // c1: x + y + z >= 2 and c2: u + v + ~z >= 2. With ~x and ~y pending unnotified, the
        // decision ~u forces v and ~z through c2; feeding the falsifications of z and x into c1
        // then produces a conflict whose resolution cuts on z, yielding x + y + u >= 2 and,
        // after eliminating the decision u, the learned constraint x + y >= 2 under premise ~u.
        let (mut context, mut theory) = setup(analysing_options());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let z = context.new_literals().next().unwrap();
        let u = context.new_literals().next().unwrap();
        let v = context.new_literals().next().unwrap();

        let l1 = theory
            .internalize_atom(
                &mut context,
                PbAtom::AtLeast {
                    literals: vec![x, y, z],
                    k: 2.into(),
                },
            )
            .unwrap();
        let l2 = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(u, 1.into()), (v, 1.into()), (!z, 1.into())],
                    k: 2.into(),
                },
            )
            .unwrap();
        let _ = assign_at_root(&mut theory, &mut context, l1);
        let _ = assign_at_root(&mut theory, &mut context, l2);

        decide_silently(&mut theory, &mut context, !x);
        decide_silently(&mut theory, &mut context, !y);
        let status = decide(&mut theory, &mut context, !u);
        assert_eq!(PropagationStatus::NoConflictDetected, status);
        assert!(context.is_literal_assigned_true(v));
        assert!(context.is_literal_assigned_false(z));

        let variables_before = context.assignments.num_propositional_variables();
        let status = notify(&mut theory, &mut context, !z);
        let status = match status {
            PropagationStatus::NoConflictDetected => notify(&mut theory, &mut context, !x),
            conflict => conflict,
        };

        let PropagationStatus::ConflictDetected { conflict_clause } = status else {
            panic!("expected a conflict, got {status:?}");
        };
        assert_eq!(
            vec![x, y, z, !l1],
            clause_literals(&context, conflict_clause)
        );

        // The resolved lemma was internalized as a fresh atom x + y >= 2 and propagated with
        // the eliminated decision as premise.
        assert_eq!(
            variables_before + 1,
            context.assignments.num_propositional_variables()
        );
        let lemma_literal = Literal::new(
            crate::basic_types::PropositionalVariable::new(variables_before),
            true,
        );
        assert!(context.is_literal_assigned_true(lemma_literal));
        match context.get_justification(lemma_literal.get_propositional_variable()) {
            Justification::PseudoBoolean { premises, .. } => {
                assert_eq!(&vec![!u], premises);
            }
            other => panic!("unexpected justification {other:?}"),
        }
        let lemma = theory
            .constraint_for_variable(lemma_literal.get_propositional_variable())
            .unwrap();
        assert_eq!(vec![(x, BigInt::from(1)), (y, BigInt::from(1))], lemma.args);
        assert_eq!(BigInt::from(2), *lemma.k());
    }

    #[test]
    fn scheduled_constraints_compile_into_a_sorting_network_at_restart() {
        // x1 + ... + x5 >= 3 has compilation threshold 20; repeated descents drive the
        // propagation counter over it, after which the restart compiles the constraint and the
        // emitted clauses alone decide the governing literal.
        let (mut context, mut theory) = setup(PbOptions::default());
        let xs: Vec<Literal> = context.new_literals().take(5).collect();

        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::AtLeast {
                    literals: xs.clone(),
                    k: 3.into(),
                },
            )
            .unwrap();
        {
            let constraint = theory
                .constraint_for_variable(governing.get_propositional_variable())
                .unwrap();
            assert_eq!(Some(20), constraint.compilation_threshold);
        }

        for _ in 0..8 {
            let _ = decide(&mut theory, &mut context, governing);
            let _ = decide(&mut theory, &mut context, !xs[0]);
            let _ = decide(&mut theory, &mut context, !xs[1]);
            backtrack(&mut theory, &mut context, 3);
        }
        {
            let constraint = theory
                .constraint_for_variable(governing.get_propositional_variable())
                .unwrap();
            assert!(constraint.num_propagations() > 20);
            assert_eq!(CompilationStatus::Scheduled, constraint.compilation_status());
        }

        theory.restart(&mut context);

        let constraint = theory
            .constraint_for_variable(governing.get_propositional_variable())
            .unwrap();
        assert_eq!(CompilationStatus::Compiled, constraint.compilation_status());
        assert_eq!(1, theory.statistics().num_compilations);
        assert!(theory.statistics().num_compiled_clauses > 0);
        assert!(theory.statistics().num_compiled_vars > 0);

        // With three inputs false only two can be true, so clausal propagation alone must
        // falsify the governing literal through the compiled equivalence.
        let _ = assign_at_root(&mut theory, &mut context, !xs[0]);
        let _ = assign_at_root(&mut theory, &mut context, !xs[1]);
        let _ = assign_at_root(&mut theory, &mut context, !xs[2]);
        assert!(!unit_propagate_to_fixpoint(&mut context));
        assert!(context.is_literal_assigned_false(governing));
    }

    #[test]
    fn backtracking_past_a_compilation_rewinds_the_compiled_flag() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let xs: Vec<Literal> = context.new_literals().take(5).collect();
        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::AtLeast {
                    literals: xs.clone(),
                    k: 3.into(),
                },
            )
            .unwrap();

        for _ in 0..8 {
            let _ = decide(&mut theory, &mut context, governing);
            let _ = decide(&mut theory, &mut context, !xs[0]);
            let _ = decide(&mut theory, &mut context, !xs[1]);
            backtrack(&mut theory, &mut context, 3);
        }

        // Compile inside a scope: the clauses and the flag are both undone by the pop.
        context.push_scope();
        theory.push_scope();
        let clauses_before = context.clause_store.num_clauses();
        theory.restart(&mut context);
        assert!(context.clause_store.num_clauses() > clauses_before);
        backtrack(&mut theory, &mut context, 1);

        assert_eq!(clauses_before, context.clause_store.num_clauses());
        let constraint = theory
            .constraint_for_variable(governing.get_propositional_variable())
            .unwrap();
        assert_eq!(
            CompilationStatus::Uncompiled,
            constraint.compilation_status()
        );
    }

    #[test]
    fn popping_a_scope_tears_down_watches_and_scoped_constraints() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();

        context.push_scope();
        theory.push_scope();
        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 2.into()), (y, 1.into())],
                    k: 3.into(),
                },
            )
            .unwrap();
        context.enqueue_decision_literal(governing);
        let _ = notify(&mut theory, &mut context, governing);
        assert!(context.is_literal_assigned_true(x));
        assert!(context.is_literal_assigned_true(y));
        assert_eq!(1, theory.num_constraints());

        backtrack(&mut theory, &mut context, 1);

        assert_eq!(0, theory.num_constraints());
        assert!(theory.watch_lists.iter().all(Vec::is_empty));
        assert!(context.is_literal_unassigned(x));
    }

    #[test]
    fn final_check_is_done_and_model_values_follow_the_comparator() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let atom = PbAtom::GreaterEqual {
            terms: vec![(x, 2.into()), (y, 1.into())],
            k: 2.into(),
        };

        let governing = theory.internalize_atom(&mut context, atom.clone()).unwrap();
        let _ = assign_at_root(&mut theory, &mut context, governing);
        let _ = assign_at_root(&mut theory, &mut context, x);
        let _ = assign_at_root(&mut theory, &mut context, !y);

        assert_eq!(FinalCheckStatus::Done, theory.final_check(&context));
        assert_eq!(Some(true), theory.mk_value(&context, &atom));
    }

    #[test]
    fn init_search_discards_deferred_compilation_work() {
        let (mut context, mut theory) = setup(PbOptions::default());
        let xs: Vec<Literal> = context.new_literals().take(5).collect();
        let governing = theory
            .internalize_atom(
                &mut context,
                PbAtom::AtLeast {
                    literals: xs.clone(),
                    k: 3.into(),
                },
            )
            .unwrap();

        for _ in 0..8 {
            let _ = decide(&mut theory, &mut context, governing);
            let _ = decide(&mut theory, &mut context, !xs[0]);
            let _ = decide(&mut theory, &mut context, !xs[1]);
            backtrack(&mut theory, &mut context, 3);
        }

        theory.init_search();
        theory.restart(&mut context);
        theory.new_equality(
            governing.get_propositional_variable(),
            xs[0].get_propositional_variable(),
        );

        assert_eq!(0, theory.statistics().num_compilations);
    }

    #[test]
    fn reset_drops_all_state_but_keeps_the_options() {
        let (mut context, mut theory) = setup(analysing_options());
        let x = context.new_literals().next().unwrap();
        let y = context.new_literals().next().unwrap();
        let _ = theory
            .internalize_atom(
                &mut context,
                PbAtom::GreaterEqual {
                    terms: vec![(x, 2.into()), (y, 1.into())],
                    k: 2.into(),
                },
            )
            .unwrap();
        assert_eq!(1, theory.num_constraints());

        theory.reset();

        assert_eq!(0, theory.num_constraints());
        assert_eq!(0, theory.statistics().num_predicates);
        assert_eq!(0, theory.options.conflict_frequency);
    }
}

use super::AssignmentsPropositional;
use super::ClauseStore;
use super::ConflictInfo;
use super::Justification;
use crate::basic_types::ClauseReference;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::calabash_asserts::calabash_assert_simple;

/// The host SAT context the theory runs against: Boolean variable allocation, literal assignment
/// queries, the trail with assignment levels, clause creation, justification lookup, and scope
/// push/pop. The search loop itself is outside this crate; tests and embedding solvers drive the
/// context directly.
#[derive(Debug)]
pub struct SatContext {
    pub(crate) assignments: AssignmentsPropositional,
    pub(crate) clause_store: ClauseStore,
}

impl Default for SatContext {
    fn default() -> Self {
        let mut assignments = AssignmentsPropositional::default();
        // Variable 0 backs the TRUE/FALSE sentinel literals and is fixed at the root.
        let sentinel = assignments.grow();
        let _ = assignments
            .enqueue_propagated_literal(Literal::new(sentinel, true), Justification::Axiom);
        SatContext {
            assignments,
            clause_store: ClauseStore::default(),
        }
    }
}

impl SatContext {
    pub fn create_new_propositional_variable(&mut self) -> PropositionalVariable {
        self.assignments.grow()
    }

    /// An endless supply of fresh positive literals; `take` as many as needed.
    pub fn new_literals(&mut self) -> impl Iterator<Item = Literal> + '_ {
        std::iter::from_fn(move || {
            Some(Literal::new(self.create_new_propositional_variable(), true))
        })
    }

    pub fn add_clause(&mut self, literals: Vec<Literal>) -> ClauseReference {
        calabash_assert_simple!(!literals.is_empty());
        self.clause_store.add_clause(literals)
    }

    /// Records a unit clause and assigns its literal with an axiom justification at the current
    /// level. Fails if the literal is already assigned false.
    pub fn add_unit_clause(
        &mut self,
        literal: Literal,
    ) -> Result<ClauseReference, ConstraintOperationError> {
        if self.assignments.is_literal_assigned_false(literal) {
            return Err(ConstraintOperationError::InfeasibleClause);
        }
        let reference = self.clause_store.add_clause(vec![literal]);
        let conflict = self
            .assignments
            .enqueue_propagated_literal(literal, Justification::Axiom);
        calabash_assert_simple!(conflict.is_none());
        Ok(reference)
    }

    pub fn get_clause(&self, reference: ClauseReference) -> &crate::basic_types::Clause {
        self.clause_store.get_clause(reference)
    }

    pub fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        self.assignments.is_literal_assigned_true(literal)
    }

    pub fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.assignments.is_literal_assigned_false(literal)
    }

    pub fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.assignments.is_literal_unassigned(literal)
    }

    pub fn get_literal_assignment_level(&self, literal: Literal) -> usize {
        self.assignments.get_literal_assignment_level(literal)
    }

    pub fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        self.assignments.is_literal_root_assignment(literal)
    }

    pub fn get_justification(&self, variable: PropositionalVariable) -> &Justification {
        self.assignments.get_variable_justification(variable)
    }

    /// The literals currently on the trail, oldest first.
    pub fn assigned_literals(&self) -> &[Literal] {
        self.assignments.assigned_literals()
    }

    pub fn get_decision_level(&self) -> usize {
        self.assignments.get_decision_level()
    }

    pub fn is_at_the_root_level(&self) -> bool {
        self.assignments.is_at_the_root_level()
    }

    pub fn enqueue_decision_literal(&mut self, literal: Literal) {
        self.assignments.enqueue_decision_literal(literal)
    }

    pub fn enqueue_propagated_literal(
        &mut self,
        literal: Literal,
        justification: Justification,
    ) -> Option<ConflictInfo> {
        self.assignments
            .enqueue_propagated_literal(literal, justification)
    }

    pub fn push_scope(&mut self) {
        self.assignments.increase_decision_level();
        self.clause_store.push_scope();
    }

    pub fn pop_scopes(&mut self, num_scopes: usize) {
        calabash_assert_simple!(num_scopes <= self.get_decision_level());
        let new_decision_level = self.get_decision_level() - num_scopes;
        self.assignments.synchronise(new_decision_level);
        self.clause_store.pop_scopes(num_scopes);
    }
}

use super::ConflictInfo;
use super::Justification;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::Trail;
use crate::calabash_asserts::calabash_assert_moderate;
use crate::calabash_asserts::calabash_assert_simple;

/// Per-variable assignment information together with the literal trail. Variable 0 is reserved
/// for the [`Literal::TRUE`] / [`Literal::FALSE`] sentinels and is assigned at the root.
#[derive(Clone, Debug, Default)]
pub struct AssignmentsPropositional {
    assignment_info: KeyedVec<PropositionalVariable, PropositionalAssignmentInfo>,
    trail: Trail<Literal>,
}

impl AssignmentsPropositional {
    pub fn increase_decision_level(&mut self) {
        self.trail.increase_decision_level()
    }

    pub fn get_decision_level(&self) -> usize {
        self.trail.get_decision_level()
    }

    pub fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub fn get_trail_entry(&self, index: usize) -> Literal {
        self.trail[index]
    }

    /// The literals currently on the trail, oldest first.
    pub fn assigned_literals(&self) -> &[Literal] {
        &self.trail
    }

    pub fn grow(&mut self) -> PropositionalVariable {
        let variable = PropositionalVariable::new(self.assignment_info.len() as u32);
        self.assignment_info
            .push(PropositionalAssignmentInfo::Unassigned);
        variable
    }

    pub fn num_propositional_variables(&self) -> u32 {
        self.assignment_info.len() as u32
    }

    pub fn is_variable_assigned_true(&self, variable: PropositionalVariable) -> bool {
        match &self.assignment_info[variable] {
            PropositionalAssignmentInfo::Assigned { truth_value, .. } => *truth_value,
            PropositionalAssignmentInfo::Unassigned => false,
        }
    }

    pub fn is_variable_assigned_false(&self, variable: PropositionalVariable) -> bool {
        match &self.assignment_info[variable] {
            PropositionalAssignmentInfo::Assigned { truth_value, .. } => !*truth_value,
            PropositionalAssignmentInfo::Unassigned => false,
        }
    }

    pub fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.is_variable_assigned_true(literal.get_propositional_variable())
        } else {
            self.is_variable_assigned_false(literal.get_propositional_variable())
        }
    }

    pub fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && !self.is_literal_assigned_true(literal)
    }

    pub fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.is_variable_assigned(literal.get_propositional_variable())
    }

    pub fn is_literal_unassigned(&self, literal: Literal) -> bool {
        !self.is_literal_assigned(literal)
    }

    pub fn is_variable_assigned(&self, variable: PropositionalVariable) -> bool {
        !matches!(
            self.assignment_info[variable],
            PropositionalAssignmentInfo::Unassigned
        )
    }

    pub fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal)
            && self.get_variable_assignment_level(literal.get_propositional_variable()) == 0
    }

    pub fn is_variable_decision(&self, variable: PropositionalVariable) -> bool {
        match &self.assignment_info[variable] {
            PropositionalAssignmentInfo::Unassigned => false,
            PropositionalAssignmentInfo::Assigned { justification, .. } => {
                matches!(justification, Justification::Decision)
            }
        }
    }

    pub fn get_variable_assignment_level(&self, variable: PropositionalVariable) -> usize {
        match &self.assignment_info[variable] {
            PropositionalAssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have assignment levels");
            }
            PropositionalAssignmentInfo::Assigned { decision_level, .. } => *decision_level,
        }
    }

    pub fn get_literal_assignment_level(&self, literal: Literal) -> usize {
        self.get_variable_assignment_level(literal.get_propositional_variable())
    }

    pub fn get_variable_justification(&self, variable: PropositionalVariable) -> &Justification {
        match &self.assignment_info[variable] {
            PropositionalAssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have justifications");
            }
            PropositionalAssignmentInfo::Assigned { justification, .. } => justification,
        }
    }

    fn make_assignment(
        &mut self,
        true_literal: Literal,
        justification: Justification,
    ) -> Option<ConflictInfo> {
        if self.is_literal_assigned_false(true_literal) {
            return Some(ConflictInfo::Propagation {
                literal: true_literal,
                justification,
            });
        } else if self.is_literal_assigned_true(true_literal) {
            // Another propagator may already have fixed the literal; the earlier justification
            // is kept.
            return None;
        }

        self.assignment_info[true_literal.get_propositional_variable()] =
            PropositionalAssignmentInfo::Assigned {
                truth_value: true_literal.is_positive(),
                decision_level: self.get_decision_level(),
                justification,
            };

        self.trail.push(true_literal);

        None
    }

    pub fn enqueue_decision_literal(&mut self, decision_literal: Literal) {
        calabash_assert_simple!(!self.is_literal_assigned(decision_literal));

        let _ = self.make_assignment(decision_literal, Justification::Decision);
    }

    pub fn enqueue_propagated_literal(
        &mut self,
        propagated_literal: Literal,
        justification: Justification,
    ) -> Option<ConflictInfo> {
        calabash_assert_moderate!(!matches!(justification, Justification::Decision));
        self.make_assignment(propagated_literal, justification)
    }

    /// Backtracks to `new_decision_level`, unassigning every variable assigned beyond it.
    pub fn synchronise(&mut self, new_decision_level: usize) {
        calabash_assert_simple!(new_decision_level < self.get_decision_level());
        let mut unassigned = Vec::new();
        for entry in self.trail.synchronise(new_decision_level) {
            unassigned.push(entry.get_propositional_variable());
        }
        for variable in unassigned {
            self.assignment_info[variable] = PropositionalAssignmentInfo::Unassigned;
        }
    }

    pub fn is_at_the_root_level(&self) -> bool {
        self.get_decision_level() == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
enum PropositionalAssignmentInfo {
    Assigned {
        truth_value: bool,
        decision_level: usize,
        justification: Justification,
    },
    #[default]
    Unassigned,
}

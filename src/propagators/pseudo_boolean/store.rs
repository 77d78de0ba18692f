use super::PbInequality;
use crate::basic_types::HashMap;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::StorageKey;
use crate::calabash_asserts::calabash_assert_simple;

/// A stable index into the constraint arena. Watch lists and justifications hold handles rather
/// than owning references; the slot behind a handle is freed when the scope that created the
/// constraint is popped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PbConstraintHandle {
    id: u32,
}

impl StorageKey for PbConstraintHandle {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        PbConstraintHandle { id: index as u32 }
    }
}

/// Owns the active constraints, keyed by the theory variable of their governing literal. Only
/// the store frees constraint memory; a creation trail with per-scope marks drives scoped
/// removal.
#[derive(Debug, Default)]
pub(crate) struct PbConstraintStore {
    slots: Vec<Option<PbInequality>>,
    free_slots: Vec<usize>,
    by_variable: HashMap<PropositionalVariable, PbConstraintHandle>,
    creation_trail: Vec<PbConstraintHandle>,
    creation_limits: Vec<usize>,
}

impl PbConstraintStore {
    pub(crate) fn insert(&mut self, constraint: PbInequality) -> PbConstraintHandle {
        let variable = constraint.literal().get_propositional_variable();
        calabash_assert_simple!(
            !self.by_variable.contains_key(&variable),
            "A variable governs at most one constraint."
        );

        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(constraint);
                slot
            }
            None => {
                self.slots.push(Some(constraint));
                self.slots.len() - 1
            }
        };
        let handle = PbConstraintHandle::create_from_index(slot);
        let _ = self.by_variable.insert(variable, handle);
        self.creation_trail.push(handle);
        handle
    }

    pub(crate) fn get(&self, handle: PbConstraintHandle) -> Option<&PbInequality> {
        self.slots[handle.index()].as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: PbConstraintHandle) -> Option<&mut PbInequality> {
        self.slots[handle.index()].as_mut()
    }

    pub(crate) fn handle_for_variable(
        &self,
        variable: PropositionalVariable,
    ) -> Option<PbConstraintHandle> {
        self.by_variable.get(&variable).copied()
    }

    pub(crate) fn live_handles(&self) -> impl Iterator<Item = PbConstraintHandle> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|_| PbConstraintHandle::create_from_index(index))
        })
    }

    pub(crate) fn num_constraints(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }

    pub(crate) fn push_scope(&mut self) {
        self.creation_limits.push(self.creation_trail.len());
    }

    pub(crate) fn pop_scopes(&mut self, num_scopes: usize) {
        calabash_assert_simple!(num_scopes <= self.creation_limits.len());
        let new_limit_len = self.creation_limits.len() - num_scopes;
        let retained = self.creation_limits[new_limit_len];
        while self.creation_trail.len() > retained {
            let handle = self.creation_trail.pop().unwrap();
            let constraint = self.slots[handle.index()]
                .take()
                .expect("A constraint on the creation trail is alive until popped");
            let _ = self
                .by_variable
                .remove(&constraint.literal().get_propositional_variable());
            self.free_slots.push(handle.index());
        }
        self.creation_limits.truncate(new_limit_len);
    }

    /// Drops every constraint and trail entry.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.by_variable.clear();
        self.creation_trail.clear();
        self.creation_limits.clear();
    }
}

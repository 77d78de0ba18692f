use crate::basic_types::Clause;
use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::basic_types::StorageKey;
use crate::calabash_asserts::calabash_assert_simple;

/// Owns the clauses emitted by the theory. References are stable indices; clauses created inside
/// a scope are dropped again when that scope is popped, which is what ties the lifetime of
/// compiled sorting-network clauses to the decision level at which they were produced.
#[derive(Debug, Default)]
pub struct ClauseStore {
    clauses: Vec<Clause>,
    scope_limits: Vec<usize>,
}

impl ClauseStore {
    pub fn add_clause(&mut self, literals: Vec<Literal>) -> ClauseReference {
        let reference = ClauseReference::new(self.clauses.len() as u32);
        self.clauses.push(Clause::new(literals));
        reference
    }

    pub fn get_clause(&self, reference: ClauseReference) -> &Clause {
        &self.clauses[reference.index()]
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'_ Clause> {
        self.clauses.iter()
    }

    pub fn push_scope(&mut self) {
        self.scope_limits.push(self.clauses.len());
    }

    pub fn pop_scopes(&mut self, num_scopes: usize) {
        calabash_assert_simple!(num_scopes <= self.scope_limits.len());
        let new_limit_len = self.scope_limits.len() - num_scopes;
        let new_num_clauses = self.scope_limits[new_limit_len];
        self.scope_limits.truncate(new_limit_len);
        self.clauses.truncate(new_num_clauses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::PropositionalVariable;

    #[test]
    fn clauses_created_in_a_scope_are_dropped_with_it() {
        let mut store = ClauseStore::default();
        let x = Literal::new(PropositionalVariable::new(1), true);
        let y = Literal::new(PropositionalVariable::new(2), true);

        let _ = store.add_clause(vec![x, y]);
        store.push_scope();
        let _ = store.add_clause(vec![!x, y]);
        let _ = store.add_clause(vec![x, !y]);
        store.pop_scopes(1);

        assert_eq!(1, store.num_clauses());
    }
}

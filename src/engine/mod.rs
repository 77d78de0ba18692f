mod assignments_propositional;
mod clause_store;
pub(crate) mod debug_helper;
mod justification;
mod sat_context;
#[cfg(test)]
pub(crate) mod test_utils;

pub use assignments_propositional::AssignmentsPropositional;
pub use clause_store::ClauseStore;
pub use justification::ConflictInfo;
pub use justification::Justification;
pub use sat_context::SatContext;

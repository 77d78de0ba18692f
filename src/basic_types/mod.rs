mod clause;
mod constraint_operation_error;
mod hash_structures;
mod keyed_vec;
mod literal;
mod propositional_variable;
mod trail;

pub use clause::Clause;
pub use clause::ClauseReference;
pub use constraint_operation_error::ConstraintOperationError;
pub(crate) use hash_structures::HashMap;
pub use keyed_vec::KeyedVec;
pub use keyed_vec::StorageKey;
pub use literal::Literal;
pub use propositional_variable::PropositionalVariable;
pub(crate) use trail::Trail;

use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintOperationError {
    #[error("Adding the clause failed because it is infeasible under the current assignment")]
    InfeasibleClause,
    #[error("Adding the atom failed because it is infeasible under the current assignment")]
    InfeasibleAtom,
}

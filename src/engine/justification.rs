use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::propagators::PbConstraintHandle;

/// The reason recorded with an assignment. The conflict analyzer dispatches on this tag to
/// decide how the assigned literal is resolved away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Justification {
    /// A free decision of the search (or the root sentinel assignment); carries no antecedents.
    Decision,
    /// An axiom of the problem, e.g. a unit clause; holds unconditionally at its level.
    Axiom,
    /// Propagated by the clause behind the reference; the other literals of the clause are the
    /// antecedents.
    Clause(ClauseReference),
    /// Propagated by a binary clause; `implicant` is the (true) literal that triggered the
    /// propagation, i.e. the clause is `(consequent \/ ~implicant)`.
    BinaryClause { implicant: Literal },
    /// Propagated by another theory; opaque to the pseudo-Boolean engine.
    External,
    /// Propagated by a pseudo-Boolean constraint. `premises` are the true literals which,
    /// together with the constraint's governing literal, force the consequent.
    PseudoBoolean {
        constraint: PbConstraintHandle,
        premises: Vec<Literal>,
    },
}

/// Returned when enqueueing a propagated literal that is already assigned false.
#[derive(Clone, Debug)]
pub enum ConflictInfo {
    Propagation {
        literal: Literal,
        justification: Justification,
    },
}

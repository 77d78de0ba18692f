use crate::statistics::statistic_logger;

/// Counters surfaced by the pseudo-Boolean theory.
#[derive(Copy, Clone, Debug, Default)]
pub struct PbStatistics {
    /// Conflicts raised by the watch engine.
    pub num_conflicts: u64,
    /// Propagations emitted with a pseudo-Boolean justification.
    pub num_propagations: u64,
    /// Atoms internalized as pseudo-Boolean predicates.
    pub num_predicates: u64,
    /// Constraints compiled into sorting networks.
    pub num_compilations: u64,
    /// Clauses emitted by the sorting-network compiler.
    pub num_compiled_clauses: u64,
    /// Fresh Boolean variables introduced by the sorting-network compiler.
    pub num_compiled_vars: u64,
}

impl PbStatistics {
    pub fn log_statistics(&self) {
        statistic_logger::log_statistic("pbConflicts", self.num_conflicts);
        statistic_logger::log_statistic("pbPropagations", self.num_propagations);
        statistic_logger::log_statistic("pbPredicates", self.num_predicates);
        statistic_logger::log_statistic("pbCompilations", self.num_compilations);
        statistic_logger::log_statistic("pbCompiledClauses", self.num_compiled_clauses);
        statistic_logger::log_statistic("pbCompiledVars", self.num_compiled_vars);
    }
}

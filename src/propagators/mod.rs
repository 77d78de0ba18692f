mod pseudo_boolean;

pub use pseudo_boolean::CompilationStatus;
pub use pseudo_boolean::FinalCheckStatus;
pub use pseudo_boolean::PbAtom;
pub use pseudo_boolean::PbConstraintHandle;
pub use pseudo_boolean::PbInequality;
pub use pseudo_boolean::PbOptions;
pub use pseudo_boolean::PbStatistics;
pub use pseudo_boolean::PbTheory;
pub use pseudo_boolean::PropagationStatus;

/// Configuration of the pseudo-Boolean theory.
#[derive(Copy, Clone, Debug)]
pub struct PbOptions {
    /// During resolution, cancel complementary antecedents against existing lemma coefficients
    /// and drop the term when the coefficient becomes non-positive.
    pub learn_complements: bool,
    /// If 0, the cutting-planes analyzer runs on every conflict; otherwise once every
    /// `conflict_frequency` propagations of the conflicting constraint.
    pub conflict_frequency: u32,
    /// Gates the sorting-network compiler.
    pub enable_compilation: bool,
}

impl Default for PbOptions {
    fn default() -> Self {
        PbOptions {
            learn_complements: true,
            conflict_frequency: 1000,
            enable_compilation: true,
        }
    }
}

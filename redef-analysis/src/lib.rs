//! The work-list fixpoint driver that runs a reaching-definitions analysis
//! over a [`redef_ir::Graph`].
mod driver;
mod options;

pub use driver::ReachingDefinitionsAnalysis;
pub use options::AnalysisOptions;

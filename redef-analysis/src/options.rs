//! Tunables governing precision and soundness trade-offs of the analysis.

/// Configuration for one run of [`crate::ReachingDefinitionsAnalysis`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// The maximum number of distinct writers a reaching-definitions map may
    /// track for any single byte range before it is collapsed to the
    /// `UNKNOWN_MEMORY` sentinel. Bounds the lattice's height, which is what
    /// guarantees the fixpoint iteration terminates. Must be at least 1.
    pub max_set_size: usize,
    /// Whether an opaque `CALL` node (one whose callee could not be
    /// expanded into the caller's graph) is treated as strong-writing
    /// `UNKNOWN_MEMORY` at `[0, UNKNOWN)`, clobbering every other tracked
    /// definition. Disabling this treats an opaque call as a no-op write,
    /// which is unsound but occasionally useful for debugging precision
    /// loss.
    pub opaque_call_kills_all: bool,
    /// Whether a node-declared strong overwrite whose range has an unknown
    /// offset or length is honored as a genuine kill of the whole target, or
    /// downgraded to a weak add (the default) so it cannot erase definitions
    /// the analysis is unsure it actually clobbers.
    pub strong_update_unknown_size: bool,
    /// Whether a query against any target also includes whatever writers
    /// reach `UNKNOWN_MEMORY`'s own unknown bucket — i.e. whether "we don't
    /// know what was written" is treated as "could have written anything".
    /// Disabling this is unsound but can be useful to isolate precision
    /// loss caused specifically by opaque calls and unresolved aliases.
    pub unknown_memory_reads_everything: bool,
}

impl AnalysisOptions {
    pub fn validate(&self) -> Result<(), redef_utils::RdError> {
        if self.max_set_size == 0 {
            return Err(redef_utils::RdError::invalid_max_set_size());
        }
        Ok(())
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            max_set_size: 8,
            opaque_call_kills_all: true,
            strong_update_unknown_size: false,
            unknown_memory_reads_everything: true,
        }
    }
}

//! Errors generated by the reaching-definitions engine.

/// Convenience wrapper to represent success or a meaningful engine error.
pub type RdResult<T> = std::result::Result<T, RdError>;

/// Errors produced at the boundary of the engine: construction-time
/// precondition failures and internal invariant violations. The analysis
/// itself never produces an error at runtime on a well-formed graph.
#[derive(Clone, Debug)]
pub struct RdError {
    kind: Box<ErrorKind>,
}

#[derive(Clone, Debug)]
enum ErrorKind {
    /// The graph supplied to the driver is malformed: missing root, a
    /// required predecessor edge absent, or similar.
    MalformedInput(String),
    /// `maxSetSize == 0`, which would make the lattice have no valid
    /// bottom-to-top path.
    InvalidMaxSetSize,
    /// An internal invariant the `DefinitionsMap` is supposed to uphold
    /// (disjoint, non-empty intervals) was violated. Indicates a bug in
    /// this crate rather than bad input.
    InvariantViolation(String),
}

impl std::fmt::Display for RdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.kind {
            ErrorKind::MalformedInput(msg) => {
                write!(f, "malformed input graph: {msg}")
            }
            ErrorKind::InvalidMaxSetSize => {
                write!(f, "`maxSetSize` must be at least 1")
            }
            ErrorKind::InvariantViolation(msg) => {
                write!(f, "internal invariant violation: {msg}")
            }
        }
    }
}

impl std::error::Error for RdError {}

impl RdError {
    pub fn malformed_input<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::MalformedInput(msg.to_string())),
        }
    }

    pub fn invalid_max_set_size() -> Self {
        Self {
            kind: Box::new(ErrorKind::InvalidMaxSetSize),
        }
    }

    pub fn invariant_violation<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::InvariantViolation(msg.to_string())),
        }
    }
}

//! Stable node identity.
//!
//! Nodes live in an arena (the [`crate::Graph`]'s `DiGraph`) rather than
//! behind `Rc<RefCell<_>>`, so a "reference" to a node is just its index —
//! cheap to copy, order, and hash, and immune to the ownership-cycle
//! problems a pointer-based graph would have (see the redesign note on
//! arenas in `DESIGN.md`).
pub use petgraph::graph::NodeIndex;

/// Identifies a node within a single [`crate::Graph`]. Never valid across
/// two different graphs.
pub type NodeId = NodeIndex<u32>;

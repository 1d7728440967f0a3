//! Program-graph node payloads.
use crate::defsite::DefSite;
use crate::rdmap::DefinitionsMap;
use std::collections::BTreeSet;

/// The operation a node performs, to the extent the analysis cares about it.
/// Everything not listed here (arithmetic, comparisons, pure control tests)
/// is [`NodeType::None`] — it reads and writes only what its `uses`/`defs`
/// sets say, nothing implicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// No special semantics beyond its declared `uses`/`defs`/`overwrites`.
    None,
    /// Allocates a fixed-size object; implicitly strong-defines the whole
    /// object at `[0, UNKNOWN)` in addition to any declared `defs`.
    Alloc,
    /// Allocates a variable-size object; same implicit self-definition as
    /// [`NodeType::Alloc`].
    DynAlloc,
    Store,
    Load,
    /// Join point for multiple incoming data values (e.g. at a CFG merge).
    /// No special transfer code: the generic predecessor-union rule already
    /// produces the right result.
    Phi,
    Return,
    /// An opaque call: when `opaque_call` is set, the call is treated as
    /// strong-writing `UNKNOWN_MEMORY` at `[0, UNKNOWN)`, in addition to any
    /// declared `defs`/`overwrites`.
    Call,
    /// The point immediately after a call returns, where the callee's
    /// effects have been merged into the caller's flow. No special transfer
    /// code beyond predecessor-union.
    CallReturn,
    /// Splits control into concurrent/interleaved continuations.
    Fork,
    /// Rejoins continuations split at a [`NodeType::Fork`]. No special
    /// transfer code: ordinary multi-predecessor union already models the
    /// coarse, over-approximate concurrency semantics.
    Join,
    Noop,
}

/// A single node in the program graph.
///
/// `defs` are weak (may-)definitions at this node: they are unioned into
/// whatever already reaches it. `overwrites` are strong (must-)definitions:
/// they replace whatever previously reached the written range. `uses` are
/// the def-sites this node reads from, against which `reaching_in` is
/// queried to answer "what may have last written here".
#[derive(Clone, Debug, Default)]
pub struct Node {
    pub node_type: Option<NodeType>,
    pub defs: BTreeSet<DefSite>,
    overwrites: BTreeSet<DefSite>,
    pub uses: BTreeSet<DefSite>,
    /// Whether an opaque [`NodeType::Call`] should be treated as clobbering
    /// all of memory. Ignored for every other node type.
    pub opaque_call: bool,
    /// The reaching-definitions map just before this node executes,
    /// populated by [`crate::Graph`]'s fixpoint driver's block-local
    /// transfer function.
    pub reaching_in: DefinitionsMap,
}

impl Node {
    pub fn new(node_type: NodeType) -> Self {
        Node {
            node_type: Some(node_type),
            defs: BTreeSet::new(),
            overwrites: BTreeSet::new(),
            uses: BTreeSet::new(),
            opaque_call: false,
            reaching_in: DefinitionsMap::new(),
        }
    }

    /// The strong (must-)definitions declared at this node.
    ///
    /// Returns `overwrites`, not `defs` — the original analysis this is
    /// modeled on had a long-standing accessor bug where the overwrite-kill
    /// accessor returned the weak-def set instead; that bug is not carried
    /// forward here (see `DESIGN.md`, Open Questions).
    pub fn overwrites(&self) -> &BTreeSet<DefSite> {
        &self.overwrites
    }

    pub fn add_overwrite(&mut self, site: DefSite) {
        self.overwrites.insert(site);
    }

    pub fn add_def(&mut self, site: DefSite) {
        self.defs.insert(site);
    }

    pub fn add_use(&mut self, site: DefSite) {
        self.uses.insert(site);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    #[test]
    fn overwrites_accessor_returns_overwrite_set_not_def_set() {
        let mut node = Node::new(NodeType::Store);
        let target = NodeIndex::new(0);
        let def_site = DefSite::new(target, 0u64, 4u64);
        let overwrite_site = DefSite::new(target, 8u64, 4u64);
        node.add_def(def_site);
        node.add_overwrite(overwrite_site);
        assert!(node.overwrites().contains(&overwrite_site));
        assert!(!node.overwrites().contains(&def_site));
    }
}

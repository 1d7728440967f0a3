//! The program graph: an arena of [`Node`]s connected by control-flow edges,
//! owned by value rather than behind `Rc<RefCell<_>>`.
use crate::block::{Block, BlockId};
use crate::defsite::DefSite;
use crate::id::NodeId;
use crate::node::{Node, NodeType};
use itertools::Itertools;
use petgraph::graph::DiGraph;
use petgraph::Direction;
use redef_utils::{RdError, RdResult};

type Cfg = DiGraph<Node, ()>;

fn is_forced_boundary(node_type: NodeType) -> bool {
    matches!(
        node_type,
        NodeType::Fork
            | NodeType::Join
            | NodeType::Phi
            | NodeType::Call
            | NodeType::CallReturn
            | NodeType::Return
    )
}

/// Owns every node of one program and the edges between them.
///
/// `unknown_memory` is created once, in [`Graph::new`], before any caller
/// can add a node of their own — it is effectively a graph-scoped singleton
/// sentinel rather than a process-wide global, which keeps it compatible
/// with a `Graph` that can be constructed, dropped, and rebuilt freely
/// within one process (see `DESIGN.md`).
pub struct Graph {
    cfg: Cfg,
    root: Option<NodeId>,
    unknown_memory: NodeId,
    blocks: Vec<Block>,
}

impl Graph {
    pub fn new() -> Self {
        let mut cfg = Cfg::new();
        let unknown_memory = cfg.add_node(Node::new(NodeType::None));
        Graph {
            cfg,
            root: None,
            unknown_memory,
            blocks: Vec::new(),
        }
    }

    /// The graph-wide sentinel target/writer standing for "some memory
    /// object this analysis could not name". Reads against it (when
    /// `unknownMemoryReadsEverything` is set) conservatively match every
    /// query; writes to it model opaque calls and other unresolvable
    /// effects.
    pub fn unknown_memory(&self) -> NodeId {
        self.unknown_memory
    }

    pub fn create(&mut self, node_type: NodeType) -> NodeId {
        self.cfg.add_node(Node::new(node_type))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.cfg[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.cfg[id]
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.cfg.update_edge(from, to, ());
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.cfg.neighbors_directed(id, Direction::Incoming)
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.cfg.neighbors_directed(id, Direction::Outgoing)
    }

    pub fn node_count(&self) -> usize {
        self.cfg.node_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cfg.node_indices()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    /// Records the reaching-definitions map computed at the end of block
    /// `id`. Called by the fixpoint driver once it settles on `OUT(block)`.
    pub fn set_block_out(&mut self, id: BlockId, definitions: crate::rdmap::DefinitionsMap) {
        self.blocks[id].definitions = definitions;
    }

    /// Convenience for building a node's `defs`/`overwrites`/`uses` inline.
    pub fn add_use(&mut self, id: NodeId, site: DefSite) {
        self.node_mut(id).add_use(site);
    }

    pub fn add_def(&mut self, id: NodeId, site: DefSite) {
        self.node_mut(id).add_def(site);
    }

    pub fn add_overwrite(&mut self, id: NodeId, site: DefSite) {
        self.node_mut(id).add_overwrite(site);
    }

    fn is_leader(&self, id: NodeId) -> bool {
        if Some(id) == self.root {
            return true;
        }
        let preds: Vec<NodeId> = self.predecessors(id).collect();
        if preds.len() >= 2 {
            return true;
        }
        if let [sole] = preds[..] {
            if self.successors(sole).count() >= 2 {
                return true;
            }
            if let Some(pred_type) = self.cfg[sole].node_type {
                if is_forced_boundary(pred_type) {
                    return true;
                }
            }
        } else if preds.is_empty() {
            // Unreachable-from-root node with no predecessors: still a
            // leader, so it gets its own (dead) block rather than being
            // silently dropped.
            return true;
        }
        if let Some(node_type) = self.cfg[id].node_type {
            if is_forced_boundary(node_type) {
                return true;
            }
        }
        false
    }

    /// Partitions the graph into maximal straight-line [`Block`]s, using
    /// leader detection: a node starts a new block if it is the root, has
    /// two or more predecessors, is the target of a branch (its sole
    /// predecessor has two or more successors), is itself one of the
    /// forced-boundary node types (`FORK`/`JOIN`/`PHI`/`CALL`/
    /// `CALL_RETURN`/`RETURN`), or directly follows one of those types.
    ///
    /// Requires `root` to have been set via [`Graph::set_root`].
    pub fn build_bblocks(&mut self) -> RdResult<()> {
        if self.root.is_none() {
            return Err(RdError::invariant_violation("graph has no root node"));
        }

        // UNKNOWN_MEMORY is a sentinel with no CFG edges (see
        // `Graph::unknown_memory`'s docs) — it never takes part in the CFG's
        // block partition, only in writer sets.
        let leaders: Vec<NodeId> = self
            .cfg
            .node_indices()
            .filter(|&id| id != self.unknown_memory && self.is_leader(id))
            .sorted()
            .collect();

        let mut blocks = Vec::with_capacity(leaders.len());
        for (block_id, &leader) in leaders.iter().enumerate() {
            let mut block = Block::new(block_id);
            let mut cursor = leader;
            block.nodes.push(cursor);
            loop {
                let succs: Vec<NodeId> = self.successors(cursor).collect();
                let [only] = succs[..] else { break };
                if self.is_leader(only) {
                    break;
                }
                cursor = only;
                block.nodes.push(cursor);
            }
            blocks.push(block);
        }

        if blocks.is_empty() {
            return Err(RdError::invariant_violation(
                "block partition produced no blocks for a non-empty graph",
            ));
        }
        self.blocks = blocks;
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_memory_is_created_before_any_user_node() {
        let mut graph = Graph::new();
        let um = graph.unknown_memory();
        let a = graph.create(NodeType::None);
        assert_ne!(um, a);
    }

    #[test]
    fn straight_line_chain_is_one_block() {
        let mut graph = Graph::new();
        let a = graph.create(NodeType::None);
        let b = graph.create(NodeType::None);
        let c = graph.create(NodeType::None);
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        graph.set_root(a);
        graph.build_bblocks().unwrap();
        assert_eq!(graph.blocks().len(), 1);
        assert_eq!(graph.blocks()[0].nodes, vec![a, b, c]);
    }

    #[test]
    fn branch_target_starts_a_new_block() {
        let mut graph = Graph::new();
        let a = graph.create(NodeType::None);
        let b = graph.create(NodeType::None);
        let c = graph.create(NodeType::None);
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.set_root(a);
        graph.build_bblocks().unwrap();
        assert_eq!(graph.blocks().len(), 3);
    }

    #[test]
    fn join_point_with_two_predecessors_starts_a_new_block() {
        let mut graph = Graph::new();
        let a = graph.create(NodeType::None);
        let b = graph.create(NodeType::None);
        let c = graph.create(NodeType::None);
        let d = graph.create(NodeType::None);
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(b, d);
        graph.add_edge(c, d);
        graph.set_root(a);
        graph.build_bblocks().unwrap();
        let containing_d = graph
            .blocks()
            .iter()
            .find(|blk| blk.nodes.contains(&d))
            .unwrap();
        assert_eq!(containing_d.leader(), Some(d));
    }

    #[test]
    fn call_node_forces_a_boundary_after_itself() {
        let mut graph = Graph::new();
        let a = graph.create(NodeType::None);
        let call = graph.create(NodeType::Call);
        let after = graph.create(NodeType::None);
        graph.add_edge(a, call);
        graph.add_edge(call, after);
        graph.set_root(a);
        graph.build_bblocks().unwrap();
        let call_block = graph
            .blocks()
            .iter()
            .find(|blk| blk.nodes.contains(&call))
            .unwrap();
        assert_eq!(call_block.terminator(), Some(call));
    }

    #[test]
    fn build_bblocks_without_root_is_an_error() {
        let mut graph = Graph::new();
        graph.create(NodeType::None);
        assert!(graph.build_bblocks().is_err());
    }

    #[test]
    fn unknown_memory_never_appears_in_any_block() {
        let mut graph = Graph::new();
        let um = graph.unknown_memory();
        let a = graph.create(NodeType::None);
        graph.set_root(a);
        graph.build_bblocks().unwrap();
        assert!(graph.blocks().iter().all(|blk| !blk.nodes.contains(&um)));
    }
}

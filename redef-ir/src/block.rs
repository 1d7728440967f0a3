//! Basic blocks: maximal straight-line node runs the fixpoint driver treats
//! as a single transfer-function unit.
use crate::id::NodeId;
use crate::rdmap::DefinitionsMap;

/// Identifies a [`Block`] within a single [`crate::Graph`]'s block
/// partition. Like [`NodeId`], an index into an arena, not a pointer.
pub type BlockId = usize;

/// A maximal run of nodes with no internal join or branch: every node but
/// the first has exactly one predecessor (the node before it), and every
/// node but the last has exactly one successor (the node after it).
///
/// `definitions` is the reaching-definitions map at the *end* of the block
/// (i.e. `OUT(block)`), computed by folding each node's transfer function
/// over `IN(block)` in order.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub id: BlockId,
    pub nodes: Vec<NodeId>,
    pub definitions: DefinitionsMap,
}

impl Block {
    pub fn new(id: BlockId) -> Self {
        Block {
            id,
            nodes: Vec::new(),
            definitions: DefinitionsMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leader(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn terminator(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

//! Graph, node, and reaching-definitions map types shared between building a
//! program graph and running the fixpoint analysis over it.
mod block;
mod defsite;
mod graph;
mod id;
mod node;
mod offset;
mod rdmap;

pub use block::{Block, BlockId};
pub use defsite::DefSite;
pub use graph::Graph;
pub use id::NodeId;
pub use node::{Node, NodeType};
pub use offset::Offset;
pub use rdmap::DefinitionsMap;

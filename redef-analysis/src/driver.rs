//! The work-list fixpoint driver: iterates blocks to a fixpoint of
//! reaching-definitions maps, then stamps every node with the map that
//! reaches its input.
use crate::options::AnalysisOptions;
use redef_ir::{BlockId, DefSite, DefinitionsMap, Graph, NodeId, NodeType, Offset};
use redef_utils::{RdError, RdResult};
use std::collections::{HashMap, VecDeque};

/// Runs the reaching-definitions analysis over `graph` to a fixpoint.
///
/// On success, every node's `reaching_in` holds the definitions reaching
/// its input, and every block's `definitions` holds `OUT(block)`. Building
/// the block partition is done here (via [`Graph::build_bblocks`]) so
/// callers only need a graph with its nodes, edges and root set.
pub struct ReachingDefinitionsAnalysis;

impl ReachingDefinitionsAnalysis {
    pub fn run(graph: &mut Graph, options: AnalysisOptions) -> RdResult<()> {
        options.validate()?;
        if graph.root().is_none() {
            return Err(RdError::invariant_violation(
                "cannot run the analysis on a graph with no root node",
            ));
        }
        graph.build_bblocks()?;

        let unknown_memory = graph.unknown_memory();
        let num_blocks = graph.blocks().len();
        log::debug!(
            "running reaching-definitions analysis over {} nodes partitioned into {} blocks",
            graph.node_count(),
            num_blocks
        );

        // Every node of every block maps to that block, not just leaders: a
        // CFG predecessor of a block's leader is the *terminator* of the
        // preceding block, which only coincides with that block's leader
        // when the predecessor block is a single-node block.
        let block_of_node: HashMap<NodeId, BlockId> = graph
            .blocks()
            .iter()
            .enumerate()
            .flat_map(|(id, block)| block.nodes.iter().map(move |&n| (n, id)))
            .collect();

        let preds: Vec<Vec<BlockId>> = graph
            .blocks()
            .iter()
            .map(|block| {
                let Some(leader) = block.leader() else {
                    return Vec::new();
                };
                graph
                    .predecessors(leader)
                    .filter_map(|p| block_of_node.get(&p).copied())
                    .collect()
            })
            .collect();

        let mut succs: Vec<Vec<BlockId>> = vec![Vec::new(); num_blocks];
        for (b, p_list) in preds.iter().enumerate() {
            for &p in p_list {
                succs[p].push(b);
            }
        }

        let mut out_maps: Vec<DefinitionsMap> = vec![DefinitionsMap::new(); num_blocks];
        let mut worklist: VecDeque<BlockId> = (0..num_blocks).collect();
        let mut queued = vec![true; num_blocks];

        let mut iterations: u64 = 0;
        while let Some(b) = worklist.pop_front() {
            queued[b] = false;
            iterations += 1;
            log::trace!("visiting block {b} ({} predecessor block(s))", preds[b].len());

            let mut in_map = DefinitionsMap::new();
            for &p in &preds[b] {
                in_map.merge(&out_maps[p], options.max_set_size, unknown_memory);
            }

            let mut cur = in_map;
            let node_ids = graph.blocks()[b].nodes.clone();
            for node_id in node_ids {
                graph.node_mut(node_id).reaching_in = cur.clone();
                transfer_node(graph, node_id, &mut cur, &options, unknown_memory);
            }

            if cur != out_maps[b] {
                log::trace!("block {b} changed, requeuing {} successor(s)", succs[b].len());
                out_maps[b] = cur;
                for &s in &succs[b] {
                    if !queued[s] {
                        queued[s] = true;
                        worklist.push_back(s);
                    }
                }
            }
        }
        log::debug!("reached fixpoint after {iterations} block visit(s)");

        for (b, out_map) in out_maps.into_iter().enumerate() {
            graph.set_block_out(b, out_map);
        }
        Ok(())
    }
}

/// Applies one node's effect on the reaching-definitions map flowing
/// through its block: any implicit effect the node's type carries first
/// (the object a fresh `ALLOC` stands for has no prior writers to clobber),
/// then strong overwrites, then weak defs.
fn transfer_node(
    graph: &Graph,
    node_id: NodeId,
    map: &mut DefinitionsMap,
    options: &AnalysisOptions,
    unknown_memory: NodeId,
) {
    let node = graph.node(node_id);

    match node.node_type {
        Some(NodeType::Alloc) | Some(NodeType::DynAlloc) => {
            // A weak define, not a strong one: the front-end may also
            // declare a precise `overwrites` site at the same node (e.g. a
            // zero-initializing ALLOC), and that should still be free to
            // take effect below without this implicit baseline getting in
            // its way once a query's range is fully covered.
            map.add(
                DefSite::whole_object(node_id),
                node_id,
                options.max_set_size,
                unknown_memory,
            );
        }
        Some(NodeType::Call) if node.opaque_call && options.opaque_call_kills_all => {
            map.update(
                DefSite::new(unknown_memory, 0u64, Offset::Unknown),
                node_id,
                options.max_set_size,
                unknown_memory,
            );
        }
        _ => {}
    }

    for &site in node.overwrites() {
        if site.has_unknown_range() && !options.strong_update_unknown_size {
            map.add(site, node_id, options.max_set_size, unknown_memory);
        } else {
            map.update(site, node_id, options.max_set_size, unknown_memory);
        }
    }

    for &site in &node.defs {
        map.add(site, node_id, options.max_set_size, unknown_memory);
    }
}

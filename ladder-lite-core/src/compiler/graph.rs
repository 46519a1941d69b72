//! Wire index and network discovery.
//!
//! Blocks live in the input vector; the graph stores their indices as
//! petgraph node weights, so adjacency stays flat integer handles.

use super::classify::is_start;
use super::model::{Block, Wire};
use super::verifier::Diagnostics;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Predecessor/successor lists are almost always 0–2 entries.
pub type NeighborList = SmallVec<[usize; 2]>;

/// Directed wire index over the block list.
pub struct LadderGraph {
    graph: DiGraph<usize, ()>,
    /// Block index → petgraph handle. Every block gets a node up front.
    handles: Vec<NodeIndex>,
    /// Block index → appears in at least one kept wire.
    connected: Vec<bool>,
}

impl LadderGraph {
    /// Index the kept wires. Wires referencing unknown ids and wires that
    /// do not flow left to right are dropped with a diagnostic.
    pub fn build(blocks: &[Block], wires: &[Wire], diags: &mut Diagnostics) -> Self {
        let mut graph = DiGraph::with_capacity(blocks.len(), wires.len());
        let handles: Vec<NodeIndex> = (0..blocks.len()).map(|ix| graph.add_node(ix)).collect();

        // First occurrence wins; duplicate ids are reported separately.
        let mut by_id: HashMap<&str, usize> = HashMap::new();
        for (ix, block) in blocks.iter().enumerate() {
            by_id.entry(block.id.as_str()).or_insert(ix);
        }

        let mut index = LadderGraph {
            graph,
            handles,
            connected: vec![false; blocks.len()],
        };

        for wire in wires {
            let (from, to) = match (by_id.get(wire.from.id.as_str()), by_id.get(wire.to.id.as_str()))
            {
                (Some(&from), Some(&to)) => (from, to),
                _ => {
                    let missing = if by_id.contains_key(wire.from.id.as_str()) {
                        &wire.to.id
                    } else {
                        &wire.from.id
                    };
                    diags.error(
                        format!("wire references unknown block id '{missing}'"),
                        vec![missing.clone()],
                    );
                    continue;
                }
            };
            if blocks[from].x >= blocks[to].x {
                warn!(
                    from = %wire.from.id,
                    to = %wire.to.id,
                    "dropping wire that does not flow left to right"
                );
                diags.warning(
                    format!(
                        "wire from '{}' to '{}' does not flow left to right; ignored",
                        wire.from.id, wire.to.id
                    ),
                    vec![wire.from.id.clone(), wire.to.id.clone()],
                );
                continue;
            }
            index.insert_edge(from, to);
        }

        index
    }

    /// Add one directed edge between block indices and mark both ends
    /// connected. Kept separate from `build` so synthesizer tests can
    /// assemble pathological graphs directly.
    pub(crate) fn insert_edge(&mut self, from: usize, to: usize) {
        self.graph
            .add_edge(self.handles[from], self.handles[to], ());
        self.connected[from] = true;
        self.connected[to] = true;
    }

    pub fn is_connected(&self, ix: usize) -> bool {
        self.connected[ix]
    }

    pub fn connected_count(&self) -> usize {
        self.connected.iter().filter(|c| **c).count()
    }

    /// Incoming neighbors of a block, ascending block index. The
    /// synthesizer re-sorts by grid position where branch order matters.
    pub fn preds_of(&self, ix: usize) -> NeighborList {
        self.neighbors(ix, Direction::Incoming)
    }

    /// Outgoing neighbors of a block, ascending block index.
    pub fn succs_of(&self, ix: usize) -> NeighborList {
        self.neighbors(ix, Direction::Outgoing)
    }

    fn neighbors(&self, ix: usize, dir: Direction) -> NeighborList {
        let mut list: NeighborList = self
            .graph
            .neighbors_directed(self.handles[ix], dir)
            .map(|n| self.graph[n])
            .collect();
        list.sort_unstable();
        list.dedup();
        list
    }

    /// Undirected neighborhood, used only for component discovery.
    fn undirected_neighbors(&self, ix: usize) -> NeighborList {
        let mut list: NeighborList = self
            .graph
            .neighbors_undirected(self.handles[ix])
            .map(|n| self.graph[n])
            .collect();
        list.sort_unstable();
        list.dedup();
        list
    }
}

/// Synthesize wires between spatially adjacent blocks: every ordered pair
/// `(a, b)` with `b.x == a.x + 1 && b.y == a.y`. Compatibility path for
/// inputs that carry no connections at all.
pub fn auto_wire(blocks: &[Block]) -> Vec<Wire> {
    let mut by_cell: HashMap<(u32, u32), usize> = HashMap::new();
    for (ix, block) in blocks.iter().enumerate() {
        by_cell.entry((block.x, block.y)).or_insert(ix);
    }

    let mut wires = Vec::new();
    for block in blocks {
        if let Some(&next) = by_cell.get(&(block.x + 1, block.y)) {
            wires.push(Wire::between(&block.id, &blocks[next].id));
        }
    }
    debug!(count = wires.len(), "auto-wired adjacent blocks");
    wires
}

/// One weakly-connected component that owns at least one start block.
pub struct Network {
    /// Member block indices, ascending.
    pub nodes: Vec<usize>,
    /// Start blocks (contact at x = 0 with no predecessor), sorted `(y, x)`.
    pub starts: Vec<usize>,
}

/// Partition the connected blocks into networks via BFS over the
/// undirected view. Components without a start block have no power-rail
/// entry and are skipped; survivors are ordered by their topmost start.
pub fn networks(blocks: &[Block], index: &LadderGraph) -> Vec<Network> {
    let mut visited = vec![false; blocks.len()];
    let mut found = Vec::new();

    for seed in 0..blocks.len() {
        if visited[seed] || !index.is_connected(seed) {
            continue;
        }
        let mut nodes = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        visited[seed] = true;
        queue.push_back(seed);
        while let Some(ix) = queue.pop_front() {
            nodes.push(ix);
            for next in index.undirected_neighbors(ix) {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        nodes.sort_unstable();

        let mut starts: Vec<usize> = nodes
            .iter()
            .copied()
            .filter(|&ix| is_start(blocks, index, ix))
            .collect();
        starts.sort_by_key(|&ix| (blocks[ix].y, blocks[ix].x));

        if starts.is_empty() {
            debug!(size = nodes.len(), "skipping network without a start block");
            continue;
        }
        found.push(Network { nodes, starts });
    }

    found.sort_by_key(|net| {
        let top = net.starts[0];
        (blocks[top].y, blocks[top].x)
    });
    found
}

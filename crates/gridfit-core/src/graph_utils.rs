//! Connectivity analysis over the bus/branch graph.
//!
//! The power flow needs every bus electrically tied to the slack bus; an
//! island with no angle reference makes the Jacobian singular. These helpers
//! work on bus *indices* so the builder can run them before the
//! [`crate::Network`] exists.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;

fn bus_graph(bus_count: usize, edges: &[(usize, usize)]) -> UnGraph<(), ()> {
    let mut graph = UnGraph::with_capacity(bus_count, edges.len());
    for _ in 0..bus_count {
        graph.add_node(());
    }
    for &(from, to) in edges {
        graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
    }
    graph
}

/// Bus indices with no path to `root`, in ascending order.
pub fn unreachable_from(bus_count: usize, edges: &[(usize, usize)], root: usize) -> Vec<usize> {
    if root >= bus_count {
        return (0..bus_count).collect();
    }
    let graph = bus_graph(bus_count, edges);
    let mut reached = vec![false; bus_count];
    let mut bfs = Bfs::new(&graph, NodeIndex::new(root));
    while let Some(node) = bfs.next(&graph) {
        reached[node.index()] = true;
    }
    reached
        .iter()
        .enumerate()
        .filter(|(_, &seen)| !seen)
        .map(|(idx, _)| idx)
        .collect()
}

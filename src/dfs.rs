use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{depth_first_search, DfsEvent};

// DFS traversal of a directed graph
// Returns a vector of node ids in the order they were discovered (pre-order)
// every parent node is visited before its children, siblings in insertion order
pub(crate) fn dfs_preorder(graph: &DiGraphMap<usize, usize>, start: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(graph.node_count());
    depth_first_search(graph, Some(start), |event| {
        if let DfsEvent::Discover(node, _) = event {
            order.push(node);
        }
    });
    order
}

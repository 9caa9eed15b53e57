// SPDX-License-Identifier: Apache-2.0

use crate::aig::gate::{AigNode, AigRef};
use std::collections::{HashSet, VecDeque};

/// Extracts the combined transitive fan-in cone for a set of nodes.
///
/// Returns:
/// * the set of all gates within the cones, in the order they were first
///   reached.
/// * the set of primary inputs feeding the cones.
pub fn extract_cone(start_nodes: &[AigRef], gates: &[AigNode]) -> (Vec<AigRef>, HashSet<AigRef>) {
    let mut cone_gates = Vec::new();
    let mut cone_inputs = HashSet::new();
    let mut visited = HashSet::new();
    let mut worklist: Vec<AigRef> = start_nodes.to_vec();

    while let Some(current_ref) = worklist.pop() {
        if !visited.insert(current_ref) {
            continue;
        }
        match &gates[current_ref.id] {
            AigNode::Input { .. } => {
                cone_inputs.insert(current_ref);
            }
            AigNode::Literal(_) => {
                cone_gates.push(current_ref);
            }
            AigNode::And2 { a, b } => {
                cone_gates.push(current_ref);
                worklist.push(a.node);
                worklist.push(b.node);
            }
        }
    }

    (cone_gates, cone_inputs)
}

/// Returns (topological order, None) if acyclic, or (partial order,
/// Some(not_visited_nodes)) if a cycle is detected.
pub fn topo_order_and_cycle_check(nodes: &[AigNode]) -> (Vec<AigRef>, Option<Vec<usize>>) {
    let gate_count = nodes.len();
    let mut indegree = vec![0usize; gate_count];
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); gate_count];
    for (i, node) in nodes.iter().enumerate() {
        if let AigNode::And2 { a, b } = node {
            indegree[i] = 2;
            parents[a.node.id].push(i);
            parents[b.node.id].push(i);
        }
    }
    let mut queue: VecDeque<usize> = (0..gate_count).filter(|i| indegree[*i] == 0).collect();
    let mut topo: Vec<AigRef> = Vec::with_capacity(gate_count);
    while let Some(node_id) = queue.pop_front() {
        topo.push(AigRef { id: node_id });
        for &parent in &parents[node_id] {
            indegree[parent] -= 1;
            if indegree[parent] == 0 {
                queue.push_back(parent);
            }
        }
    }
    if topo.len() != gate_count {
        let emitted: HashSet<usize> = topo.iter().map(|r| r.id).collect();
        let not_visited: Vec<usize> = (0..gate_count).filter(|id| !emitted.contains(id)).collect();
        (topo, Some(not_visited))
    } else {
        (topo, None)
    }
}

/// Returns a topological order (children before parents) of all nodes in the
/// graph.
pub fn topo_sort_refs(nodes: &[AigNode]) -> Vec<AigRef> {
    let (order, cycle) = topo_order_and_cycle_check(nodes);
    if let Some(not_visited) = cycle {
        panic!(
            "Cycle detected in AIG graph: topological sort visited {} of {} nodes; not visited: {:?}",
            nodes.len() - not_visited.len(),
            nodes.len(),
            not_visited
        );
    }
    order
}

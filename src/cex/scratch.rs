// SPDX-License-Identifier: Apache-2.0

//! Per-node transient state for cone traversals: a last-visited traversal id
//! and two mark bits per node, stored as flat arrays indexed by `AigRef::id`.
//!
//! A node counts as visited in the current pass iff its recorded traversal id
//! equals the current one, so starting a new pass is O(1).

use bitvec::vec::BitVec;

use crate::aig::gate::AigRef;
use crate::cex::error::{CexError, CexResult};
use crate::cex::graph::{CexGraph, NodeKind};

#[derive(Debug, Default)]
pub struct TravScratch {
    trav_id: u32,
    trav_ids: Vec<u32>,
    mark0: BitVec,
    mark1: BitVec,
}

impl TravScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the arrays so every node id below `node_count` is addressable.
    pub fn ensure_nodes(&mut self, node_count: usize) {
        if self.trav_ids.len() < node_count {
            self.trav_ids.resize(node_count, 0);
            self.mark0.resize(node_count, false);
            self.mark1.resize(node_count, false);
        }
    }

    pub fn increment_trav_id(&mut self) {
        if self.trav_id == u32::MAX {
            self.trav_ids.iter_mut().for_each(|id| *id = 0);
            self.trav_id = 0;
        }
        self.trav_id += 1;
    }

    pub fn is_trav_id_current(&self, node: AigRef) -> bool {
        self.trav_ids[node.id] == self.trav_id
    }

    pub fn set_trav_id_current(&mut self, node: AigRef) {
        self.trav_ids[node.id] = self.trav_id;
    }

    pub fn mark0(&self, node: AigRef) -> bool {
        self.mark0[node.id]
    }

    pub fn mark1(&self, node: AigRef) -> bool {
        self.mark1[node.id]
    }

    pub fn set_mark0(&mut self, node: AigRef, value: bool) {
        self.mark0.set(node.id, value);
    }

    pub fn set_mark1(&mut self, node: AigRef, value: bool) {
        self.mark1.set(node.id, value);
    }

    /// Post-order (fan-ins first) walk of the cone rooted at `root` over nodes
    /// not yet visited in the current pass; every returned node is marked
    /// visited. Nodes already visited are neither returned nor descended into.
    ///
    /// Fails if the cone reaches a node that is neither an input nor an AND.
    pub fn cone_postorder<G: CexGraph + ?Sized>(
        &mut self,
        graph: &G,
        root: AigRef,
    ) -> CexResult<Vec<AigRef>> {
        let mut worklist: Vec<AigRef> = vec![root];
        let mut postorder: Vec<AigRef> = Vec::new();
        while let Some(current) = worklist.pop() {
            if current.id >= self.trav_ids.len() {
                return Err(CexError::precondition(format!(
                    "node %{} is outside the graph ({} nodes)",
                    current.id,
                    self.trav_ids.len()
                )));
            }
            if self.is_trav_id_current(current) {
                continue;
            }
            match graph.node_kind(current) {
                NodeKind::Input => {}
                NodeKind::And => {
                    let fanins = graph.fanins(current).ok_or_else(|| {
                        CexError::precondition(format!("AND node %{} has no fan-ins", current.id))
                    })?;
                    if let Some(dep) = fanins
                        .iter()
                        .map(|f| f.node)
                        .find(|n| n.id >= self.trav_ids.len() || !self.is_trav_id_current(*n))
                    {
                        worklist.push(current); // Revisit after dependencies
                        worklist.push(dep);
                        continue;
                    }
                }
                NodeKind::Constant => {
                    return Err(CexError::precondition(format!(
                        "cone traversal reached node %{} which is neither an input nor an AND",
                        current.id
                    )));
                }
            }
            self.set_trav_id_current(current);
            postorder.push(current);
        }
        Ok(postorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::gate_builder::{GateBuilder, GateBuilderOptions};
    use crate::cex::graph::GateFnGraph;

    #[test]
    fn test_trav_ids_reset_per_pass() {
        let mut scratch = TravScratch::new();
        scratch.ensure_nodes(3);
        scratch.increment_trav_id();
        let n = AigRef { id: 1 };
        assert!(!scratch.is_trav_id_current(n));
        scratch.set_trav_id_current(n);
        assert!(scratch.is_trav_id_current(n));
        scratch.increment_trav_id();
        assert!(!scratch.is_trav_id_current(n));
    }

    #[test]
    fn test_ensure_nodes_only_grows() {
        let mut scratch = TravScratch::new();
        scratch.ensure_nodes(4);
        let n = AigRef { id: 3 };
        scratch.set_mark0(n, true);
        scratch.set_mark1(n, false);
        scratch.ensure_nodes(2);
        assert!(scratch.mark0(n));
        scratch.ensure_nodes(6);
        assert!(scratch.mark0(n));
        assert!(!scratch.mark1(n));
        assert!(!scratch.mark0(AigRef { id: 5 }));
    }

    #[test]
    fn test_cone_postorder_visits_shared_node_once() {
        let mut gb = GateBuilder::new("shared".to_string(), GateBuilderOptions::opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let ab = gb.add_and_binary(a, b);
        let l = gb.add_and_binary(ab, a);
        let r = gb.add_and_binary(ab.negate(), b);
        let top = gb.add_and_binary(l, r.negate());
        gb.add_output("o".to_string(), top.into());
        let gate_fn = gb.build();
        let graph = GateFnGraph::new(&gate_fn);

        let mut scratch = TravScratch::new();
        scratch.ensure_nodes(graph.node_count());
        scratch.increment_trav_id();
        let order = scratch.cone_postorder(&graph, top.node).unwrap();
        assert_eq!(order.len(), 6);
        assert_eq!(*order.last().unwrap(), top.node);
        let pos = |x: AigRef| order.iter().position(|n| *n == x).unwrap();
        assert!(pos(ab.node) < pos(l.node));
        assert!(pos(ab.node) < pos(r.node));
        assert!(pos(a.node) < pos(ab.node));
    }

    #[test]
    fn test_cone_postorder_rejects_constant() {
        let mut gb = GateBuilder::new("const".to_string(), GateBuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let t = gb.get_true();
        let o = gb.add_and_binary(a, t);
        gb.add_output("o".to_string(), o.into());
        let gate_fn = gb.build();
        let graph = GateFnGraph::new(&gate_fn);

        let mut scratch = TravScratch::new();
        scratch.ensure_nodes(graph.node_count());
        scratch.increment_trav_id();
        assert!(matches!(
            scratch.cone_postorder(&graph, o.node),
            Err(CexError::PreconditionViolation { .. })
        ));
    }
}

//! Structural deduplication of compiled nodes (suffix sharing).
//!
//! Before a pending node is frozen, its structure (labels, targets,
//! outputs, finality) is hashed and compared against already-compiled
//! nodes; a structural match reuses the existing handle instead of adding
//! a new node. Since children are always frozen before their parents,
//! equal subtrees collapse bottom-up into single compiled instances.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::node::{Target, UnCompiledNode};
use crate::store::{CompiledAddress, NodeStore};

/// Dedup table: structural hash to candidate compiled addresses.
pub struct NodeHash {
    buckets: FxHashMap<u64, Vec<CompiledAddress>>,
}

impl NodeHash {
    pub fn new() -> Self {
        NodeHash {
            buckets: FxHashMap::default(),
        }
    }

    /// Return the handle of a compiled node structurally identical to
    /// `node`, freezing `node` into the store if none exists yet. All arc
    /// targets of `node` must already be compiled.
    pub fn add<V: Clone + Eq + Hash>(
        &mut self,
        store: &mut NodeStore<V>,
        node: &UnCompiledNode<V>,
    ) -> CompiledAddress {
        let hash = pending_hash(store.no_output(), node);
        if let Some(candidates) = self.buckets.get(&hash) {
            for &addr in candidates {
                if nodes_equal(store, node, addr) {
                    return addr;
                }
            }
        }
        let addr = store.add_pending(node);
        self.buckets.entry(hash).or_default().push(addr);
        addr
    }
}

/// Rolling 31-prime hash over the live arcs. Identity outputs are skipped
/// so nodes hash the same regardless of how the identity was produced.
fn pending_hash<V: Eq + Hash>(no_output: &V, node: &UnCompiledNode<V>) -> u64 {
    const PRIME: u64 = 31;
    let mut h = 0u64;
    for arc in &node.arcs[..node.num_arcs] {
        h = h.wrapping_mul(PRIME).wrapping_add(arc.label as u64);
        h = h.wrapping_mul(PRIME).wrapping_add(arc.target.compiled() as u64);
        if arc.output != *no_output {
            h = h.wrapping_mul(PRIME).wrapping_add(value_hash(&arc.output));
        }
        if arc.next_final_output != *no_output {
            h = h.wrapping_mul(PRIME).wrapping_add(value_hash(&arc.next_final_output));
        }
        if arc.is_final {
            h = h.wrapping_add(17);
        }
    }
    h
}

fn value_hash<V: Hash>(value: &V) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

fn nodes_equal<V: Clone + Eq>(
    store: &NodeStore<V>,
    node: &UnCompiledNode<V>,
    addr: CompiledAddress,
) -> bool {
    let mut compiled = store.arcs(addr);
    for pending in &node.arcs[..node.num_arcs] {
        let arc = match compiled.next() {
            Some(arc) => arc,
            None => return false,
        };
        if arc.label != pending.label
            || arc.is_final != pending.is_final
            || arc.output != pending.output
            || arc.next_final_output != pending.next_final_output
        {
            return false;
        }
        match pending.target {
            Target::Compiled(t) if t == arc.target => {}
            _ => return false,
        }
    }
    compiled.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{IntOutputs, Outputs};

    fn leaf_node(labels_and_outputs: &[(u32, u64)], end: CompiledAddress) -> UnCompiledNode<u64> {
        let no = IntOutputs.no_output();
        let mut node = UnCompiledNode::new(1, &no);
        for &(label, output) in labels_and_outputs {
            node.add_arc(label, Target::Compiled(end), &no);
            node.set_last_output(label, output);
            node.replace_last(label, Target::Compiled(end), 0, true);
        }
        node
    }

    #[test]
    fn test_identical_nodes_share_a_handle() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        let mut hash = NodeHash::new();
        let end = store.end_node(true);

        let a = hash.add(&mut store, &leaf_node(&[(5, 0)], end));
        let b = hash.add(&mut store, &leaf_node(&[(5, 0)], end));
        assert_eq!(a, b);
        assert_eq!(store.num_nodes(), 2); // end node + one shared node
    }

    #[test]
    fn test_different_outputs_do_not_share() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        let mut hash = NodeHash::new();
        let end = store.end_node(true);

        let a = hash.add(&mut store, &leaf_node(&[(5, 1)], end));
        let b = hash.add(&mut store, &leaf_node(&[(5, 2)], end));
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_labels_do_not_share() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        let mut hash = NodeHash::new();
        let end = store.end_node(true);

        let a = hash.add(&mut store, &leaf_node(&[(5, 0), (6, 0)], end));
        let b = hash.add(&mut store, &leaf_node(&[(5, 0)], end));
        let c = hash.add(&mut store, &leaf_node(&[(5, 0), (6, 0)], end));
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}

//! In-memory arena for compiled nodes.
//!
//! Compiled nodes are immutable once added. Each node is a contiguous run
//! in one flat arc array, addressed by a `u32` node index; the store is
//! monotonic (nodes are never deallocated). The byte-packed on-disk format
//! lives outside this crate; this store is the build-time and query-time
//! representation.
//!
//! Two arc layouts per node:
//!
//! - binary search: one slot per arc, sorted by label;
//! - direct addressing ("array arcs"): one slot per label in
//!   `[first, last]`, absent labels filled with filler arcs, O(1) lookup.
//!   Chosen for dense nodes near the root, bounded to at most one filler
//!   per real arc at build time; `pack` can demote nodes later under a
//!   stricter overhead ratio.

use crate::node::{PendingArc, UnCompiledNode};

/// Handle of a compiled node: its index in the store.
pub type CompiledAddress = u32;

/// Filler marker for absent labels in direct-addressed nodes. Never a valid
/// node address.
pub const NO_TARGET: CompiledAddress = u32::MAX;

/// A compiled transition. Finality of the target via this arc is carried on
/// the arc itself (`is_final` + `next_final_output`), not on the target
/// node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArc<V> {
    pub label: u32,
    pub target: CompiledAddress,
    pub is_final: bool,
    pub output: V,
    pub next_final_output: V,
}

impl<V> CompiledArc<V> {
    #[inline]
    pub fn is_filler(&self) -> bool {
        self.target == NO_TARGET
    }
}

#[derive(Debug)]
struct NodeMeta {
    start: usize,
    len: u32,
    direct: bool,
}

/// Append-only compiled-node arena.
#[derive(Debug)]
pub struct NodeStore<V> {
    no_output: V,
    allow_array_arcs: bool,
    /// Arc-array growth quantum, from the builder's `bytes_page_bits`.
    page_arcs: usize,
    nodes: Vec<NodeMeta>,
    arcs: Vec<CompiledArc<V>>,
    /// Shared handles for zero-arc nodes; materialized on first use so an
    /// FST without dead ends does not pay for them.
    final_end: Option<CompiledAddress>,
    non_final_end: Option<CompiledAddress>,
    real_arc_count: u64,
}

impl<V: Clone> NodeStore<V> {
    pub fn new(no_output: V, allow_array_arcs: bool, bytes_page_bits: u32) -> Self {
        NodeStore {
            no_output,
            allow_array_arcs,
            page_arcs: 1usize << bytes_page_bits,
            nodes: Vec::new(),
            arcs: Vec::new(),
            final_end: None,
            non_final_end: None,
            real_arc_count: 0,
        }
    }

    #[inline]
    pub fn no_output(&self) -> &V {
        &self.no_output
    }

    /// Number of compiled nodes, end nodes included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of compiled arcs, fillers excluded.
    pub fn num_arcs(&self) -> u64 {
        self.real_arc_count
    }

    /// Shared handle for a zero-arc node.
    pub fn end_node(&mut self, is_final: bool) -> CompiledAddress {
        let cached = if is_final {
            self.final_end
        } else {
            self.non_final_end
        };
        if let Some(addr) = cached {
            return addr;
        }
        let addr = self.nodes.len() as CompiledAddress;
        self.nodes.push(NodeMeta {
            start: self.arcs.len(),
            len: 0,
            direct: false,
        });
        if is_final {
            self.final_end = Some(addr);
        } else {
            self.non_final_end = Some(addr);
        }
        addr
    }

    /// Freeze a pending node into the store. Every arc target must already
    /// be compiled. Arcs are written in label order; the layout is chosen
    /// here and is invisible to structural equality.
    pub fn add_pending(&mut self, node: &UnCompiledNode<V>) -> CompiledAddress {
        if node.num_arcs == 0 {
            return self.end_node(node.is_final);
        }
        let pending = &node.arcs[..node.num_arcs];
        let lo = pending[0].label;
        let hi = pending[node.num_arcs - 1].label;
        let range = (hi - lo + 1) as usize;
        let direct = self.allow_array_arcs
            && ((node.depth <= 3 && node.num_arcs >= 5) || node.num_arcs >= 10)
            && range <= 2 * node.num_arcs;

        let start = self.arcs.len();
        self.reserve_arcs(if direct { range } else { node.num_arcs });
        if direct {
            let mut next = lo;
            for arc in pending {
                while next < arc.label {
                    let filler = self.filler_arc(next);
                    self.arcs.push(filler);
                    next += 1;
                }
                let compiled = self.compile_arc(arc);
                self.arcs.push(compiled);
                next = arc.label + 1;
            }
        } else {
            for arc in pending {
                let compiled = self.compile_arc(arc);
                self.arcs.push(compiled);
            }
        }
        self.real_arc_count += node.num_arcs as u64;

        let addr = self.nodes.len() as CompiledAddress;
        self.nodes.push(NodeMeta {
            start,
            len: (self.arcs.len() - start) as u32,
            direct,
        });
        addr
    }

    /// All arc slots of a node, fillers included. Labels are strictly
    /// ascending across the slice in both layouts.
    #[inline]
    pub fn raw_arcs(&self, addr: CompiledAddress) -> &[CompiledArc<V>] {
        let meta = &self.nodes[addr as usize];
        &self.arcs[meta.start..meta.start + meta.len as usize]
    }

    /// Real arcs of a node, in label order.
    pub fn arcs(&self, addr: CompiledAddress) -> impl Iterator<Item = &CompiledArc<V>> {
        self.raw_arcs(addr).iter().filter(|a| !a.is_filler())
    }

    /// Look up the arc with the given label, O(1) for direct-addressed
    /// nodes, binary search otherwise.
    pub fn find_arc(&self, addr: CompiledAddress, label: u32) -> Option<&CompiledArc<V>> {
        let meta = &self.nodes[addr as usize];
        let arcs = &self.arcs[meta.start..meta.start + meta.len as usize];
        if arcs.is_empty() {
            return None;
        }
        if meta.direct {
            let lo = arcs[0].label;
            if label < lo || label > arcs[arcs.len() - 1].label {
                return None;
            }
            let arc = &arcs[(label - lo) as usize];
            if arc.is_filler() {
                None
            } else {
                Some(arc)
            }
        } else {
            arcs.binary_search_by_key(&label, |a| a.label)
                .ok()
                .map(|i| &arcs[i])
        }
    }

    #[cfg(test)]
    pub(crate) fn is_direct(&self, addr: CompiledAddress) -> bool {
        self.nodes[addr as usize].direct
    }

    /// Rewrite the arc array, demoting direct-addressed nodes whose filler
    /// overhead exceeds `acceptable_overhead_ratio` (fillers per real arc)
    /// and trimming spare capacity. Node addresses are stable.
    pub fn pack(&mut self, acceptable_overhead_ratio: f32) {
        let old = std::mem::take(&mut self.arcs);
        let mut new_arcs: Vec<CompiledArc<V>> = Vec::with_capacity(old.len());
        for meta in &mut self.nodes {
            let slice = &old[meta.start..meta.start + meta.len as usize];
            let start = new_arcs.len();
            if meta.direct {
                let real = slice.iter().filter(|a| !a.is_filler()).count();
                let fillers = slice.len() - real;
                if fillers as f32 > acceptable_overhead_ratio * real as f32 {
                    meta.direct = false;
                    new_arcs.extend(slice.iter().filter(|a| !a.is_filler()).cloned());
                } else {
                    new_arcs.extend_from_slice(slice);
                }
            } else {
                new_arcs.extend_from_slice(slice);
            }
            meta.start = start;
            meta.len = (new_arcs.len() - start) as u32;
        }
        new_arcs.shrink_to_fit();
        self.arcs = new_arcs;
    }

    fn compile_arc(&self, arc: &PendingArc<V>) -> CompiledArc<V> {
        CompiledArc {
            label: arc.label,
            target: arc.target.compiled(),
            is_final: arc.is_final,
            output: arc.output.clone(),
            next_final_output: arc.next_final_output.clone(),
        }
    }

    fn filler_arc(&self, label: u32) -> CompiledArc<V> {
        CompiledArc {
            label,
            target: NO_TARGET,
            is_final: false,
            output: self.no_output.clone(),
            next_final_output: self.no_output.clone(),
        }
    }

    fn reserve_arcs(&mut self, additional: usize) {
        let needed = self.arcs.len() + additional;
        if needed > self.arcs.capacity() {
            let target = needed.max(self.arcs.capacity() * 2);
            let target = (target + self.page_arcs - 1) / self.page_arcs * self.page_arcs;
            self.arcs.reserve_exact(target - self.arcs.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Target;
    use crate::outputs::{IntOutputs, Outputs};

    fn pending(depth: usize, labels: &[u32]) -> UnCompiledNode<u64> {
        let no = IntOutputs.no_output();
        let mut node = UnCompiledNode::new(depth, &no);
        for &l in labels {
            node.add_arc(l, Target::Compiled(0), &no);
            node.replace_last(l, Target::Compiled(0), 0, true);
        }
        node
    }

    #[test]
    fn test_end_nodes_are_shared() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        let a = store.end_node(true);
        let b = store.end_node(true);
        let c = store.end_node(false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.num_nodes(), 2);
        assert!(store.raw_arcs(a).is_empty());
    }

    #[test]
    fn test_binary_layout_lookup() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        store.end_node(true);
        let addr = store.add_pending(&pending(5, &[2, 9, 200]));
        assert!(!store.is_direct(addr));
        assert_eq!(store.find_arc(addr, 9).map(|a| a.label), Some(9));
        assert!(store.find_arc(addr, 10).is_none());
        assert_eq!(store.arcs(addr).count(), 3);
    }

    #[test]
    fn test_direct_layout_fills_gaps() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        store.end_node(true);
        // depth 0, 5 arcs over a range of 8: qualifies for direct addressing
        let addr = store.add_pending(&pending(0, &[10, 11, 13, 15, 17]));
        assert!(store.is_direct(addr));
        assert_eq!(store.raw_arcs(addr).len(), 8);
        assert_eq!(store.arcs(addr).count(), 5);
        assert_eq!(store.find_arc(addr, 13).map(|a| a.label), Some(13));
        assert!(store.find_arc(addr, 14).is_none());
        assert!(store.find_arc(addr, 9).is_none());
        assert!(store.find_arc(addr, 18).is_none());
        assert_eq!(store.num_arcs(), 5);
    }

    #[test]
    fn test_array_arcs_disabled() {
        let mut store: NodeStore<u64> = NodeStore::new(0, false, 4);
        let addr = store.add_pending(&pending(0, &[10, 11, 13, 15, 17]));
        assert!(!store.is_direct(addr));
        assert_eq!(store.raw_arcs(addr).len(), 5);
    }

    #[test]
    fn test_pack_demotes_sparse_direct_nodes() {
        let mut store: NodeStore<u64> = NodeStore::new(0, true, 4);
        // 3 fillers over 5 arcs = 0.6 overhead
        let sparse = store.add_pending(&pending(0, &[10, 11, 13, 15, 17]));
        // no fillers
        let dense = store.add_pending(&pending(0, &[20, 21, 22, 23, 24]));
        assert!(store.is_direct(sparse));
        assert!(store.is_direct(dense));

        store.pack(0.25);
        assert!(!store.is_direct(sparse));
        assert!(store.is_direct(dense));
        assert_eq!(store.raw_arcs(sparse).len(), 5);
        assert_eq!(store.find_arc(sparse, 13).map(|a| a.label), Some(13));
        assert!(store.find_arc(sparse, 14).is_none());
        assert_eq!(store.find_arc(dense, 22).map(|a| a.label), Some(22));
    }
}

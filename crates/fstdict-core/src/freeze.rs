//! The tail freezer: compile-or-prune policy over the part of the frontier
//! that diverges from the incoming input.
//!
//! When a new input shares only the first `P` labels with the previous one,
//! every frontier node deeper than `P` has seen its last input and can be
//! frozen. Freezing walks those nodes bottom-up, decides prune vs compile
//! from the suffix-count thresholds, and installs compiled handles (shared
//! through the node hash where the policy allows) on the parent arcs.

use std::hash::Hash;
use std::mem;

use crate::builder::BuilderOpts;
use crate::node::{Target, UnCompiledNode};
use crate::node_hash::NodeHash;
use crate::store::{CompiledAddress, NodeStore};

/// Owns the compiled store and the dedup hash for one build.
pub struct TailFreezer<V> {
    opts: BuilderOpts,
    store: NodeStore<V>,
    dedup: Option<NodeHash>,
}

impl<V: Clone + Eq + Hash> TailFreezer<V> {
    pub(crate) fn new(opts: BuilderOpts, no_output: V) -> Self {
        let store = NodeStore::new(no_output, opts.allow_array_arcs, opts.bytes_page_bits);
        let dedup = if opts.do_share_suffix {
            Some(NodeHash::new())
        } else {
            None
        };
        TailFreezer { opts, store, dedup }
    }

    #[inline]
    pub fn opts(&self) -> &BuilderOpts {
        &self.opts
    }

    #[inline]
    pub fn store(&self) -> &NodeStore<V> {
        &self.store
    }

    pub(crate) fn into_store(self) -> NodeStore<V> {
        self.store
    }

    /// Freeze frontier nodes from the end of the previous input down to
    /// (but not including) the shared prefix. `prefix_len_plus1 == 0`
    /// freezes everything below the root.
    pub fn freeze(
        &mut self,
        frontier: &mut [UnCompiledNode<V>],
        last_input: &[u32],
        prefix_len_plus1: usize,
    ) {
        let down_to = prefix_len_plus1.max(1);
        if last_input.len() < down_to {
            return;
        }
        let no_output = self.store.no_output().clone();
        let min1 = self.opts.min_suffix_count1 as u64;
        let min2 = self.opts.min_suffix_count2 as u64;

        for idx in (down_to..=last_input.len()).rev() {
            let mut do_prune = false;
            let do_compile;

            if frontier[idx].input_count < min1 {
                do_prune = true;
                do_compile = true;
            } else if idx > prefix_len_plus1 {
                // The parent is about to be frozen too; if it fails the
                // cut, this whole suffix goes with it. With
                // min_suffix_count2 == 1 a parent count of 1 means we are
                // already past the distinguished edge, so only the
                // divergent part of the automaton is kept.
                let parent_count = frontier[idx - 1].input_count;
                if parent_count < min2 || (min2 == 1 && parent_count == 1 && idx > 1) {
                    do_prune = true;
                }
                do_compile = true;
            } else {
                // Node at the divergence point: still undecided, unless
                // pruning is disabled and it can be compiled right away.
                do_compile = min2 == 0;
            }

            let mut node = mem::replace(&mut frontier[idx], UnCompiledNode::new(idx, &no_output));

            if node.input_count < min2 || (min2 == 1 && node.input_count == 1 && idx > 1) {
                // The node itself fails the count-2 cut: drop its subtree.
                for arc in &mut node.arcs[..node.num_arcs] {
                    if let Target::Frontier(t) = mem::take(&mut arc.target) {
                        frontier[t].clear(&no_output);
                    }
                }
                node.num_arcs = 0;
            }

            let label = last_input[idx - 1];
            if do_prune {
                tracing::trace!(depth = idx, "pruned suffix node");
                node.clear(&no_output);
                frontier[idx - 1].delete_last(label);
                frontier[idx] = node;
            } else {
                if min2 != 0 {
                    self.compile_pending_targets(&mut node, frontier, last_input.len() - idx);
                }
                let next_final_output = node.final_output.clone();
                // Dead ends are materialized as final so that enumeration
                // always terminates at an entry.
                let is_final = node.is_final || node.num_arcs == 0;
                if do_compile {
                    let addr = self.compile(&node, 1 + last_input.len() - idx);
                    frontier[idx - 1].replace_last(
                        label,
                        Target::Compiled(addr),
                        next_final_output,
                        is_final,
                    );
                    node.clear(&no_output);
                    frontier[idx] = node;
                } else {
                    // Undecided: the node survives on its parent's arc until
                    // a later freeze compiles or drops it; the frontier slot
                    // keeps the fresh replacement.
                    frontier[idx - 1].replace_last(
                        label,
                        Target::Parked(Box::new(node)),
                        next_final_output,
                        is_final,
                    );
                }
            }
        }
    }

    /// Freeze one pending node, routing through the dedup hash when the
    /// sharing policy allows. All arc targets must already be compiled.
    pub fn compile(&mut self, node: &UnCompiledNode<V>, tail_length: usize) -> CompiledAddress {
        if node.num_arcs == 0 {
            return self.store.end_node(node.is_final);
        }
        if let Some(dedup) = self.dedup.as_mut() {
            if (self.opts.do_share_non_singleton_nodes || node.num_arcs <= 1)
                && tail_length <= self.opts.share_max_tail_length
            {
                return dedup.add(&mut self.store, node);
            }
        }
        self.store.add_pending(node)
    }

    /// Compile any arcs of `node` whose targets are still pending, forcing
    /// zero-arc targets to final first.
    pub fn compile_pending_targets(
        &mut self,
        node: &mut UnCompiledNode<V>,
        frontier: &mut [UnCompiledNode<V>],
        tail_length: usize,
    ) {
        let no_output = self.store.no_output().clone();
        for i in 0..node.num_arcs {
            if matches!(node.arcs[i].target, Target::Compiled(_)) {
                continue;
            }
            match mem::take(&mut node.arcs[i].target) {
                Target::Parked(mut pending) => {
                    if pending.num_arcs == 0 {
                        node.arcs[i].is_final = true;
                        pending.is_final = true;
                    }
                    let addr = self.compile(&pending, tail_length.saturating_sub(1));
                    node.arcs[i].target = Target::Compiled(addr);
                }
                Target::Frontier(t) => {
                    let mut child =
                        mem::replace(&mut frontier[t], UnCompiledNode::new(t, &no_output));
                    if child.num_arcs == 0 {
                        node.arcs[i].is_final = true;
                        child.is_final = true;
                    }
                    let addr = self.compile(&child, tail_length.saturating_sub(1));
                    child.clear(&no_output);
                    frontier[t] = child;
                    node.arcs[i].target = Target::Compiled(addr);
                }
                Target::Compiled(_) | Target::None => {
                    debug_assert!(false, "live arc without a pending target");
                }
            }
        }
    }
}

//! Frontier nodes: the uncompiled spine of the FST under construction.
//!
//! The builder keeps one [`UnCompiledNode`] per prefix length of the last
//! input. Slots are reused across inputs: `clear` resets everything except
//! `depth` and keeps the arc buffer's capacity.

use crate::outputs::Outputs;
use crate::store::CompiledAddress;

/// Where a pending arc points.
///
/// `Frontier` holds the index of a frontier slot, never an owning
/// reference, so arcs can outlive slot reuse without aliasing. `Parked`
/// holds a node that has been detached from the frontier but whose fate
/// (compile vs prune) is still undecided; the arc owns it until the parent
/// itself is frozen.
#[derive(Debug, Default)]
pub enum Target<V> {
    /// Cleared or pruned; no target.
    #[default]
    None,
    /// Handle of a node already in the compiled store.
    Compiled(CompiledAddress),
    /// Index of an uncompiled node on the frontier.
    Frontier(usize),
    /// A pending node owned by this arc, detached from the frontier.
    Parked(Box<UnCompiledNode<V>>),
}

impl<V> Target<V> {
    /// Address of the compiled target. Must only be called once the target
    /// has been frozen.
    pub fn compiled(&self) -> CompiledAddress {
        match self {
            Target::Compiled(addr) => *addr,
            _ => unreachable!("target read before being compiled"),
        }
    }
}

/// A pending (seen but not yet frozen) transition.
#[derive(Debug)]
pub struct PendingArc<V> {
    pub label: u32,
    pub target: Target<V>,
    pub is_final: bool,
    /// Value emitted on entering the arc.
    pub output: V,
    /// Value emitted when a key ends at the arc's target via this arc.
    pub next_final_output: V,
}

/// A pending node. `arcs[..num_arcs]` are live, in strictly ascending label
/// order; slots past `num_arcs` are retained allocations from earlier use.
#[derive(Debug)]
pub struct UnCompiledNode<V> {
    pub num_arcs: usize,
    pub arcs: Vec<PendingArc<V>>,
    pub is_final: bool,
    /// Output for the key ending at this node, if `is_final`.
    pub final_output: V,
    /// Number of accepted inputs whose path runs through this node.
    pub input_count: u64,
    /// Distance from the root. Fixed at slot allocation; survives `clear`.
    pub depth: usize,
}

impl<V: Clone> UnCompiledNode<V> {
    pub fn new(depth: usize, no_output: &V) -> Self {
        UnCompiledNode {
            num_arcs: 0,
            arcs: Vec::new(),
            is_final: false,
            final_output: no_output.clone(),
            input_count: 0,
            depth,
        }
    }

    /// Reset for reuse. `depth` is intentionally kept: a frontier slot's
    /// depth never changes, and the arc buffer keeps its capacity.
    pub fn clear(&mut self, no_output: &V) {
        self.num_arcs = 0;
        self.is_final = false;
        self.final_output = no_output.clone();
        self.input_count = 0;
    }

    /// Append an arc. Labels must arrive in strictly ascending order.
    pub fn add_arc(&mut self, label: u32, target: Target<V>, no_output: &V) {
        debug_assert!(
            self.num_arcs == 0 || label > self.arcs[self.num_arcs - 1].label,
            "arc labels must be strictly ascending"
        );
        let arc = PendingArc {
            label,
            target,
            is_final: false,
            output: no_output.clone(),
            next_final_output: no_output.clone(),
        };
        if self.num_arcs == self.arcs.len() {
            self.arcs.push(arc);
        } else {
            self.arcs[self.num_arcs] = arc;
        }
        self.num_arcs += 1;
    }

    pub fn get_last_output(&self, label: u32) -> &V {
        debug_assert!(self.num_arcs > 0);
        debug_assert_eq!(self.arcs[self.num_arcs - 1].label, label);
        &self.arcs[self.num_arcs - 1].output
    }

    pub fn set_last_output(&mut self, label: u32, output: V) {
        debug_assert!(self.num_arcs > 0);
        debug_assert_eq!(self.arcs[self.num_arcs - 1].label, label);
        self.arcs[self.num_arcs - 1].output = output;
    }

    /// Install the frozen (or still pending) target on the last arc,
    /// together with the finality carried over from the target node.
    pub fn replace_last(
        &mut self,
        label: u32,
        target: Target<V>,
        next_final_output: V,
        is_final: bool,
    ) {
        debug_assert!(self.num_arcs > 0);
        let arc = &mut self.arcs[self.num_arcs - 1];
        debug_assert_eq!(arc.label, label);
        arc.target = target;
        arc.next_final_output = next_final_output;
        arc.is_final = is_final;
    }

    /// Drop the last arc (the suffix below it was pruned).
    pub fn delete_last(&mut self, label: u32) {
        debug_assert!(self.num_arcs > 0);
        debug_assert_eq!(self.arcs[self.num_arcs - 1].label, label);
        self.num_arcs -= 1;
        self.arcs[self.num_arcs].target = Target::None;
    }

    /// Left-multiply every live arc's output, and the node's own final
    /// output, by `prefix`.
    pub fn prepend_output<O: Outputs<Value = V>>(&mut self, outputs: &O, prefix: &V) {
        for arc in &mut self.arcs[..self.num_arcs] {
            arc.output = outputs.add(prefix, &arc.output);
        }
        if self.is_final {
            self.final_output = outputs.add(prefix, &self.final_output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::{IntOutputs, Outputs};

    #[test]
    fn test_add_and_replace_arcs() {
        let no = IntOutputs.no_output();
        let mut node: UnCompiledNode<u64> = UnCompiledNode::new(0, &no);
        node.add_arc(3, Target::Frontier(1), &no);
        node.add_arc(7, Target::Frontier(1), &no);
        assert_eq!(node.num_arcs, 2);

        node.set_last_output(7, 42);
        assert_eq!(*node.get_last_output(7), 42);

        node.replace_last(7, Target::Compiled(5), 9, true);
        assert_eq!(node.arcs[1].target.compiled(), 5);
        assert!(node.arcs[1].is_final);
        assert_eq!(node.arcs[1].next_final_output, 9);
    }

    #[test]
    fn test_delete_last_keeps_earlier_arcs() {
        let no = IntOutputs.no_output();
        let mut node: UnCompiledNode<u64> = UnCompiledNode::new(2, &no);
        node.add_arc(1, Target::Compiled(0), &no);
        node.add_arc(2, Target::Frontier(3), &no);
        node.delete_last(2);
        assert_eq!(node.num_arcs, 1);
        assert_eq!(node.arcs[0].label, 1);
    }

    #[test]
    fn test_clear_retains_depth_and_capacity() {
        let no = IntOutputs.no_output();
        let mut node: UnCompiledNode<u64> = UnCompiledNode::new(4, &no);
        node.add_arc(1, Target::Frontier(5), &no);
        node.is_final = true;
        node.input_count = 3;
        node.clear(&no);
        assert_eq!(node.depth, 4);
        assert_eq!(node.num_arcs, 0);
        assert!(!node.is_final);
        assert_eq!(node.input_count, 0);
        assert_eq!(node.arcs.len(), 1); // buffer kept for reuse
    }

    #[test]
    fn test_prepend_output_covers_arcs_and_final() {
        let no = IntOutputs.no_output();
        let mut node: UnCompiledNode<u64> = UnCompiledNode::new(1, &no);
        node.add_arc(1, Target::Compiled(0), &no);
        node.set_last_output(1, 2);
        node.is_final = true;
        node.final_output = 5;
        node.prepend_output(&IntOutputs, &10);
        assert_eq!(node.arcs[0].output, 12);
        assert_eq!(node.final_output, 15);
    }
}

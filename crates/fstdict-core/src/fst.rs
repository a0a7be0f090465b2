//! A finished FST: compiled store, root handle, empty-input output.

use crate::outputs::Outputs;
use crate::store::{CompiledAddress, CompiledArc, NodeStore};

/// Reserved label for final transitions during enumeration. Never a valid
/// input label: it exceeds every [`InputType`] domain.
pub const END_LABEL: u32 = u32::MAX;

/// Width of the input labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// Labels are bytes, 0..=0xFF.
    Byte1,
    /// Labels are 16-bit, 0..=0xFFFF.
    Byte2,
    /// Labels are Unicode code points, 0..=0x10FFFF.
    Byte4,
}

impl InputType {
    #[inline]
    pub fn max_label(self) -> u32 {
        match self {
            InputType::Byte1 => 0xFF,
            InputType::Byte2 => 0xFFFF,
            InputType::Byte4 => 0x10FFFF,
        }
    }
}

/// An immutable, minimal, acyclic transducer produced by
/// [`crate::builder::Builder::finish`]. Paths from the root enumerate the
/// accepted keys; arc outputs compose (via the algebra's `add`) into the
/// per-key values. The empty key, if accepted, is stored out of band since
/// finality lives on incoming arcs and the root has none.
pub struct Fst<O: Outputs> {
    input_type: InputType,
    outputs: O,
    store: NodeStore<O::Value>,
    root: CompiledAddress,
    empty_output: Option<O::Value>,
}

impl<O: Outputs> Fst<O> {
    pub(crate) fn from_parts(
        input_type: InputType,
        outputs: O,
        store: NodeStore<O::Value>,
        root: CompiledAddress,
        empty_output: Option<O::Value>,
    ) -> Self {
        Fst {
            input_type,
            outputs,
            store,
            root,
            empty_output,
        }
    }

    #[inline]
    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    #[inline]
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    #[inline]
    pub fn root(&self) -> CompiledAddress {
        self.root
    }

    /// Output recorded for the empty key, if the empty key was accepted.
    #[inline]
    pub fn empty_output(&self) -> Option<&O::Value> {
        self.empty_output.as_ref()
    }

    /// Number of compiled states.
    pub fn node_count(&self) -> usize {
        self.store.num_nodes()
    }

    /// Number of compiled arcs.
    pub fn arc_count(&self) -> u64 {
        self.store.num_arcs()
    }

    /// Real arcs of a node, in ascending label order.
    pub fn arcs(&self, addr: CompiledAddress) -> impl Iterator<Item = &CompiledArc<O::Value>> {
        self.store.arcs(addr)
    }

    /// All arc slots of a node, fillers included.
    #[inline]
    pub fn raw_arcs(&self, addr: CompiledAddress) -> &[CompiledArc<O::Value>] {
        self.store.raw_arcs(addr)
    }

    /// Arc with the given label out of `addr`, if present.
    #[inline]
    pub fn find_arc(&self, addr: CompiledAddress, label: u32) -> Option<&CompiledArc<O::Value>> {
        self.store.find_arc(addr, label)
    }

    /// Post-finish packing pass: re-lay arcs under the given overhead
    /// ratio and trim spare capacity. Node handles remain valid.
    pub fn pack(&mut self, acceptable_overhead_ratio: f32) {
        let arcs_before = self.store.num_arcs();
        self.store.pack(acceptable_overhead_ratio);
        tracing::debug!(
            nodes = self.store.num_nodes(),
            arcs = arcs_before,
            "packed fst store"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_bounds() {
        assert_eq!(InputType::Byte1.max_label(), 0xFF);
        assert_eq!(InputType::Byte2.max_label(), 0xFFFF);
        assert_eq!(InputType::Byte4.max_label(), 0x10FFFF);
        assert!(END_LABEL > InputType::Byte4.max_label());
    }
}

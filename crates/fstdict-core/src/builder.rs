//! Incremental minimal-FST builder.
//!
//! Consumes a lexicographically sorted stream of `(key, value)` pairs and
//! produces a minimal acyclic transducer. The builder keeps a frontier of
//! uncompiled nodes mirroring the last input; each new input freezes the
//! part of the frontier past the shared prefix (see [`crate::freeze`]) and
//! pushes output values as far toward the root as the algebra allows, so
//! every arc ends up carrying the longest output prefix common to all keys
//! routed through it.
//!
//! Single-threaded, not reentrant. Compiled handles returned by the store
//! stay valid for the builder's lifetime and beyond.

use std::cmp::Ordering;
use std::mem;

use crate::error::BuildError;
use crate::freeze::TailFreezer;
use crate::fst::{Fst, InputType};
use crate::node::{Target, UnCompiledNode};
use crate::outputs::Outputs;

/// Construction options. Defaults build an exactly minimal FST: no
/// pruning, full suffix sharing.
#[derive(Debug, Clone)]
pub struct BuilderOpts {
    /// Prune a node (and everything below it) when fewer inputs than this
    /// pass through it. `0` disables.
    pub min_suffix_count1: u32,
    /// Secondary prune criterion over the parent node's input count. `1`
    /// keeps only the automaton's divergent part, up to the distinguished
    /// edge; this is only sound when outputs are not compressible. `0`
    /// disables.
    pub min_suffix_count2: u32,
    /// Deduplicate structurally identical compiled subtrees.
    pub do_share_suffix: bool,
    /// Allow dedup of nodes with more than one arc; with `false` only
    /// single-arc and dead-end nodes are shared.
    pub do_share_non_singleton_nodes: bool,
    /// Deduplicate only while the frozen tail is at most this long.
    pub share_max_tail_length: usize,
    /// Direct-addressed arc layout for dense nodes near the root.
    pub allow_array_arcs: bool,
    /// Run [`Fst::pack`] after finish.
    pub do_pack_fst: bool,
    /// Filler-per-arc overhead tolerated by the packing pass.
    pub acceptable_overhead_ratio: f32,
    /// log2 of the compiled store's arc-array growth quantum.
    pub bytes_page_bits: u32,
}

impl Default for BuilderOpts {
    fn default() -> Self {
        BuilderOpts {
            min_suffix_count1: 0,
            min_suffix_count2: 0,
            do_share_suffix: true,
            do_share_non_singleton_nodes: true,
            share_max_tail_length: usize::MAX,
            allow_array_arcs: true,
            do_pack_fst: false,
            acceptable_overhead_ratio: 0.25,
            bytes_page_bits: 15,
        }
    }
}

/// Replacement for the default tail-freezing policy. The hook decides which
/// frontier nodes to compile or drop, using the freezer's `compile` and the
/// frontier node operations; the default behavior is available as
/// [`TailFreezer::freeze`].
pub trait FreezeTailHook<V> {
    fn freeze(
        &mut self,
        freezer: &mut TailFreezer<V>,
        frontier: &mut [UnCompiledNode<V>],
        last_input: &[u32],
        prefix_len_plus1: usize,
    ) -> Result<(), BuildError>;
}

/// Builds a minimal FST from pre-sorted inputs.
pub struct Builder<O: Outputs> {
    input_type: InputType,
    outputs: O,
    no_output: O::Value,
    freezer: TailFreezer<O::Value>,
    hook: Option<Box<dyn FreezeTailHook<O::Value>>>,
    /// `frontier[i]` is the uncompiled node reached after the first `i`
    /// labels of the last input; slot 0 is the root.
    frontier: Vec<UnCompiledNode<O::Value>>,
    last_input: Vec<u32>,
    empty_output: Option<O::Value>,
}

impl<O: Outputs> Builder<O> {
    pub fn new(input_type: InputType, outputs: O) -> Self {
        Self::with_opts(input_type, BuilderOpts::default(), outputs)
    }

    pub fn with_opts(input_type: InputType, opts: BuilderOpts, outputs: O) -> Self {
        let no_output = outputs.no_output();
        let freezer = TailFreezer::new(opts, no_output.clone());
        let mut frontier = Vec::with_capacity(16);
        for depth in 0..10 {
            frontier.push(UnCompiledNode::new(depth, &no_output));
        }
        Builder {
            input_type,
            outputs,
            no_output,
            freezer,
            hook: None,
            frontier,
            last_input: Vec::new(),
            empty_output: None,
        }
    }

    /// Install a custom tail-freezing policy.
    pub fn with_freeze_tail_hook(mut self, hook: Box<dyn FreezeTailHook<O::Value>>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Number of inputs accepted so far.
    pub fn key_count(&self) -> u64 {
        self.frontier[0].input_count
    }

    /// Add the next `(input, output)` pair. Inputs must arrive in
    /// non-decreasing lexicographic order over the label domain; the same
    /// input may repeat (consecutively) only if the algebra supports
    /// `merge`. The input is fully consumed, so the caller may reuse its
    /// buffer.
    pub fn add(&mut self, input: &[u32], output: O::Value) -> Result<(), BuildError> {
        for &label in input {
            if label > self.input_type.max_label() {
                return Err(BuildError::LabelOutOfRange {
                    label,
                    input_type: self.input_type,
                });
            }
        }
        let accepted_any = self.frontier[0].input_count > 0;
        match input.cmp(&self.last_input) {
            Ordering::Less => {
                return Err(BuildError::InputOutOfOrder {
                    input: input.to_vec(),
                    last: self.last_input.clone(),
                })
            }
            Ordering::Equal if accepted_any => {
                // Fail before touching the frontier.
                if self.outputs.merge(&self.no_output, &self.no_output).is_none() {
                    return Err(BuildError::DuplicateWithoutMerge);
                }
            }
            _ => {}
        }

        if input.is_empty() {
            // Only representable before any longer input: finality lives on
            // incoming arcs, and the root has none, so the empty key is
            // recorded out of band.
            self.frontier[0].input_count += 1;
            self.frontier[0].is_final = true;
            self.empty_output = Some(match self.empty_output.take() {
                Some(prev) => match self.outputs.merge(&prev, &output) {
                    Some(merged) => merged,
                    None => return Err(BuildError::DuplicateWithoutMerge),
                },
                None => output,
            });
            return Ok(());
        }

        while self.frontier.len() < input.len() + 1 {
            let depth = self.frontier.len();
            self.frontier.push(UnCompiledNode::new(depth, &self.no_output));
        }

        // Walk the shared prefix, counting this input into every node it
        // passes through, the divergence node included.
        let mut pos = 0;
        let stop = self.last_input.len().min(input.len());
        loop {
            self.frontier[pos].input_count += 1;
            if pos >= stop || self.last_input[pos] != input[pos] {
                break;
            }
            pos += 1;
        }
        let prefix_len_plus1 = pos + 1;

        // Freeze the previous input's orphaned suffix.
        self.freeze_tail(prefix_len_plus1)?;

        // Extend the frontier with the new suffix.
        for i in prefix_len_plus1..=input.len() {
            self.frontier[i - 1].add_arc(input[i - 1], Target::Frontier(i), &self.no_output);
            self.frontier[i].input_count += 1;
        }

        let last_node = input.len();
        let is_duplicate =
            self.last_input.len() == input.len() && prefix_len_plus1 == input.len() + 1;
        if !is_duplicate {
            self.frontier[last_node].is_final = true;
            self.frontier[last_node].final_output = self.no_output.clone();
        }

        // Push conflicting outputs toward the root, only as far as needed.
        let mut output = output;
        for i in 1..prefix_len_plus1 {
            let label = input[i - 1];
            let last_output = self.frontier[i - 1].get_last_output(label).clone();
            if last_output != self.no_output {
                let common = self.outputs.common(&output, &last_output);
                let word_suffix = self.outputs.subtract(&last_output, &common);
                self.frontier[i - 1].set_last_output(label, common.clone());
                self.frontier[i].prepend_output(&self.outputs, &word_suffix);
                output = self.outputs.subtract(&output, &common);
            }
        }

        if is_duplicate {
            // Same input repeated: combine both outputs on the final node.
            let merged = match self
                .outputs
                .merge(&self.frontier[last_node].final_output, &output)
            {
                Some(merged) => merged,
                None => return Err(BuildError::DuplicateWithoutMerge),
            };
            self.frontier[last_node].final_output = merged;
        } else {
            // The leftover output is private to this input's divergent arc.
            self.frontier[prefix_len_plus1 - 1]
                .set_last_output(input[prefix_len_plus1 - 1], output);
        }

        self.last_input.clear();
        self.last_input.extend_from_slice(input);
        Ok(())
    }

    /// Freeze the remaining tail and return the finished FST, or `None`
    /// when nothing survived pruning and no empty output was recorded.
    pub fn finish(mut self) -> Result<Option<Fst<O>>, BuildError> {
        self.freeze_tail(0)?;

        let opts = self.freezer.opts().clone();
        let min1 = opts.min_suffix_count1 as u64;
        let min2 = opts.min_suffix_count2 as u64;
        let root_count = self.frontier[0].input_count;
        if root_count < min1 || root_count < min2 || self.frontier[0].num_arcs == 0 {
            if self.empty_output.is_none() || min1 > 0 || min2 > 0 {
                tracing::debug!("nothing survived pruning; no fst produced");
                return Ok(None);
            }
        } else if min2 != 0 {
            let mut root =
                mem::replace(&mut self.frontier[0], UnCompiledNode::new(0, &self.no_output));
            self.freezer
                .compile_pending_targets(&mut root, &mut self.frontier, self.last_input.len());
            self.frontier[0] = root;
        }

        let root = mem::replace(&mut self.frontier[0], UnCompiledNode::new(0, &self.no_output));
        let root_addr = self.freezer.compile(&root, self.last_input.len());
        tracing::debug!(
            keys = root.input_count,
            nodes = self.freezer.store().num_nodes(),
            arcs = self.freezer.store().num_arcs(),
            "fst build finished"
        );

        let mut fst = Fst::from_parts(
            self.input_type,
            self.outputs,
            self.freezer.into_store(),
            root_addr,
            self.empty_output,
        );
        if opts.do_pack_fst {
            fst.pack(opts.acceptable_overhead_ratio);
        }
        Ok(Some(fst))
    }

    fn freeze_tail(&mut self, prefix_len_plus1: usize) -> Result<(), BuildError> {
        if let Some(mut hook) = self.hook.take() {
            let result = hook.freeze(
                &mut self.freezer,
                &mut self.frontier,
                &self.last_input,
                prefix_len_plus1,
            );
            self.hook = Some(hook);
            result
        } else {
            self.freezer
                .freeze(&mut self.frontier, &self.last_input, prefix_len_plus1);
            Ok(())
        }
    }
}

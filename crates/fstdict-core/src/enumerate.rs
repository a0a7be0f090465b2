//! Sorted traversal of a finished FST.
//!
//! [`FstEnum`] walks keys in lexicographic label order and supports exact,
//! ceiling, and floor seeks. It keeps a stack of frames, one per consumed
//! label, each holding the node reached, the next arc slot to explore, and
//! the output accumulated on entering the node.
//!
//! A key ending via an arc (`is_final`) sorts before every extension
//! through that arc's target, and the empty key (when recorded) sorts
//! first; the in-order walk below emits exactly that order. Every seek
//! positions the enumerator, so a following `next()` returns the strict
//! successor of the key the seek landed on (or, on a miss, of the sought
//! target).

use crate::fst::{Fst, InputType};
use crate::outputs::Outputs;
use crate::store::CompiledAddress;

/// One enumerated entry: the key's labels and its accumulated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOutput<V> {
    pub input: Vec<u32>,
    pub output: V,
}

struct Frame<V> {
    node: CompiledAddress,
    /// Next arc slot (filler slots included) to explore out of `node`.
    next_arc: usize,
    /// Output accumulated on entering `node`, final outputs excluded.
    output: V,
}

/// Sorted enumerator over a finished [`Fst`].
pub struct FstEnum<'f, O: Outputs> {
    fst: &'f Fst<O>,
    frames: Vec<Frame<O::Value>>,
    key: Vec<u32>,
    started: bool,
    cur: Option<InputOutput<O::Value>>,
}

impl<'f, O: Outputs> FstEnum<'f, O> {
    pub fn new(fst: &'f Fst<O>) -> Self {
        FstEnum {
            fst,
            frames: Vec::new(),
            key: Vec::new(),
            started: false,
            cur: None,
        }
    }

    /// Entry at the current position.
    pub fn current(&self) -> Option<&InputOutput<O::Value>> {
        self.cur.as_ref()
    }

    /// Lexicographic successor, or `None` when exhausted.
    pub fn next(&mut self) -> Option<InputOutput<O::Value>> {
        if !self.started {
            self.reset();
            if let Some(v) = self.fst.empty_output() {
                let v = v.clone();
                return self.emit(v);
            }
        }
        self.advance()
    }

    /// Entry for exactly `target`, or `None`. Short-circuits on the first
    /// label mismatch; the position is left at the target's ceiling either
    /// way.
    pub fn seek_exact(&mut self, target: &[u32]) -> Option<InputOutput<O::Value>> {
        let fst = self.fst;
        self.reset();
        if target.is_empty() {
            let v = fst.empty_output()?.clone();
            return self.emit(v);
        }
        let mut output = fst.outputs().no_output();
        for (depth, &label) in target.iter().enumerate() {
            let top = self.frames.len() - 1;
            let arcs = fst.raw_arcs(self.frames[top].node);
            let mut i = arcs.partition_point(|a| a.label < label);
            while i < arcs.len() && arcs[i].is_filler() {
                i += 1;
            }
            if i >= arcs.len() || arcs[i].label != label {
                self.frames[top].next_arc = i;
                return None;
            }
            let arc = &arcs[i];
            self.frames[top].next_arc = i + 1;
            output = fst.outputs().add(&output, &arc.output);
            self.key.push(label);
            self.frames.push(Frame {
                node: arc.target,
                next_arc: 0,
                output: output.clone(),
            });
            if depth + 1 == target.len() {
                if arc.is_final {
                    let total = fst.outputs().add(&output, &arc.next_final_output);
                    return self.emit(total);
                }
                return None;
            }
        }
        unreachable!("loop returns on the last label")
    }

    /// Smallest entry with key >= `target`.
    pub fn seek_ceil(&mut self, target: &[u32]) -> Option<InputOutput<O::Value>> {
        let fst = self.fst;
        self.reset();
        if target.is_empty() {
            if let Some(v) = fst.empty_output() {
                let v = v.clone();
                return self.emit(v);
            }
            return self.advance();
        }
        let mut output = fst.outputs().no_output();
        for (depth, &label) in target.iter().enumerate() {
            let top = self.frames.len() - 1;
            let arcs = fst.raw_arcs(self.frames[top].node);
            let mut i = arcs.partition_point(|a| a.label < label);
            while i < arcs.len() && arcs[i].is_filler() {
                i += 1;
            }
            self.frames[top].next_arc = i;
            if i >= arcs.len() || arcs[i].label != label {
                // diverged; the in-order walk from here is the ceiling
                return self.advance();
            }
            let arc = &arcs[i];
            self.frames[top].next_arc = i + 1;
            output = fst.outputs().add(&output, &arc.output);
            self.key.push(label);
            self.frames.push(Frame {
                node: arc.target,
                next_arc: 0,
                output: output.clone(),
            });
            if depth + 1 == target.len() {
                if arc.is_final {
                    let total = fst.outputs().add(&output, &arc.next_final_output);
                    return self.emit(total);
                }
                // target is a proper prefix; its smallest extension wins
                return self.advance();
            }
        }
        unreachable!("loop returns on the last label")
    }

    /// Largest entry with key <= `target`.
    pub fn seek_floor(&mut self, target: &[u32]) -> Option<InputOutput<O::Value>> {
        let fst = self.fst;
        self.reset();
        if target.is_empty() {
            let v = fst.empty_output()?.clone();
            return self.emit(v);
        }
        let mut output = fst.outputs().no_output();
        for (depth, &label) in target.iter().enumerate() {
            let top = self.frames.len() - 1;
            let arcs = fst.raw_arcs(self.frames[top].node);
            let i = arcs.partition_point(|a| a.label < label);
            let exact = i < arcs.len() && arcs[i].label == label && !arcs[i].is_filler();
            if exact {
                let arc = &arcs[i];
                self.frames[top].next_arc = i + 1;
                output = fst.outputs().add(&output, &arc.output);
                self.key.push(label);
                self.frames.push(Frame {
                    node: arc.target,
                    next_arc: 0,
                    output: output.clone(),
                });
                if depth + 1 == target.len() {
                    if arc.is_final {
                        let total = fst.outputs().add(&output, &arc.next_final_output);
                        return self.emit(total);
                    }
                    return self.backtrack_floor();
                }
                continue;
            }
            // largest real arc strictly below the target label
            self.frames[top].next_arc = i;
            let mut j = i;
            while j > 0 && arcs[j - 1].is_filler() {
                j -= 1;
            }
            if j > 0 {
                let idx = j - 1;
                let arc = &arcs[idx];
                self.frames[top].next_arc = idx + 1;
                let reached = fst.outputs().add(&self.frames[top].output, &arc.output);
                self.key.push(arc.label);
                self.frames.push(Frame {
                    node: arc.target,
                    next_arc: 0,
                    output: reached,
                });
                return self.descend_max();
            }
            return self.backtrack_floor();
        }
        unreachable!("loop returns on the last label")
    }

    fn reset(&mut self) {
        self.frames.clear();
        self.key.clear();
        self.cur = None;
        self.started = true;
        self.frames.push(Frame {
            node: self.fst.root(),
            next_arc: 0,
            output: self.fst.outputs().no_output(),
        });
    }

    fn emit(&mut self, output: O::Value) -> Option<InputOutput<O::Value>> {
        let entry = InputOutput {
            input: self.key.clone(),
            output,
        };
        self.cur = Some(entry.clone());
        Some(entry)
    }

    /// Resume the in-order walk from the current position: take the next
    /// unexplored arc of the deepest frame, descending minimally, emitting
    /// at the first final arc; pop exhausted frames.
    fn advance(&mut self) -> Option<InputOutput<O::Value>> {
        let fst = self.fst;
        loop {
            if self.frames.is_empty() {
                self.cur = None;
                return None;
            }
            let depth = self.frames.len() - 1;
            let arcs = fst.raw_arcs(self.frames[depth].node);
            let mut i = self.frames[depth].next_arc;
            while i < arcs.len() && arcs[i].is_filler() {
                i += 1;
            }
            if i >= arcs.len() {
                self.frames.pop();
                self.key.pop();
                continue;
            }
            self.frames[depth].next_arc = i + 1;
            let arc = &arcs[i];
            let reached = fst.outputs().add(&self.frames[depth].output, &arc.output);
            self.key.push(arc.label);
            self.frames.push(Frame {
                node: arc.target,
                next_arc: 0,
                output: reached.clone(),
            });
            if arc.is_final {
                let total = fst.outputs().add(&reached, &arc.next_final_output);
                return self.emit(total);
            }
        }
    }

    /// Repeatedly take the last arc until a dead end; the incoming arc
    /// there is final by construction, and that key is the largest in the
    /// current subtree.
    fn descend_max(&mut self) -> Option<InputOutput<O::Value>> {
        let fst = self.fst;
        loop {
            let depth = self.frames.len() - 1;
            let arcs = fst.raw_arcs(self.frames[depth].node);
            let mut j = arcs.len();
            while j > 0 && arcs[j - 1].is_filler() {
                j -= 1;
            }
            if j == 0 {
                let parent = &self.frames[depth - 1];
                let in_arc = &fst.raw_arcs(parent.node)[parent.next_arc - 1];
                debug_assert!(in_arc.is_final);
                let total = fst
                    .outputs()
                    .add(&self.frames[depth].output, &in_arc.next_final_output);
                return self.emit(total);
            }
            let idx = j - 1;
            let arc = &arcs[idx];
            self.frames[depth].next_arc = idx + 1;
            let reached = fst.outputs().add(&self.frames[depth].output, &arc.output);
            self.key.push(arc.label);
            self.frames.push(Frame {
                node: arc.target,
                next_arc: 0,
                output: reached,
            });
        }
    }

    /// Walk back up a fully matched prefix looking for the largest entry
    /// below the target: first the prefix itself (if its incoming arc is
    /// final), then the largest key under the next-smaller sibling, then
    /// one level up. Falls back to the empty key.
    fn backtrack_floor(&mut self) -> Option<InputOutput<O::Value>> {
        let fst = self.fst;
        while self.frames.len() > 1 {
            let depth = self.frames.len() - 1;
            let parent_idx = depth - 1;
            let taken = self.frames[parent_idx].next_arc - 1;
            let parent_arcs = fst.raw_arcs(self.frames[parent_idx].node);
            let in_arc = &parent_arcs[taken];
            if in_arc.is_final {
                let total = fst
                    .outputs()
                    .add(&self.frames[depth].output, &in_arc.next_final_output);
                return self.emit(total);
            }
            let mut j = taken;
            while j > 0 && parent_arcs[j - 1].is_filler() {
                j -= 1;
            }
            self.frames.pop();
            self.key.pop();
            if j > 0 {
                let idx = j - 1;
                let arc = &parent_arcs[idx];
                self.frames[parent_idx].next_arc = idx + 1;
                let reached = fst
                    .outputs()
                    .add(&self.frames[parent_idx].output, &arc.output);
                self.key.push(arc.label);
                self.frames.push(Frame {
                    node: arc.target,
                    next_arc: 0,
                    output: reached,
                });
                return self.descend_max();
            }
        }
        self.frames[0].next_arc = 0;
        match fst.empty_output() {
            Some(v) => {
                let v = v.clone();
                self.emit(v)
            }
            None => {
                self.cur = None;
                None
            }
        }
    }
}

/// Byte-keyed wrapper over [`FstEnum`] for `InputType::Byte1` FSTs.
pub struct BytesEnum<'f, O: Outputs> {
    inner: FstEnum<'f, O>,
}

impl<'f, O: Outputs> BytesEnum<'f, O> {
    pub fn new(fst: &'f Fst<O>) -> Self {
        debug_assert_eq!(fst.input_type(), InputType::Byte1);
        BytesEnum {
            inner: FstEnum::new(fst),
        }
    }

    pub fn next(&mut self) -> Option<(Vec<u8>, O::Value)> {
        self.inner.next().map(to_bytes)
    }

    pub fn seek_exact(&mut self, target: &[u8]) -> Option<(Vec<u8>, O::Value)> {
        self.inner.seek_exact(&to_labels(target)).map(to_bytes)
    }

    pub fn seek_ceil(&mut self, target: &[u8]) -> Option<(Vec<u8>, O::Value)> {
        self.inner.seek_ceil(&to_labels(target)).map(to_bytes)
    }

    pub fn seek_floor(&mut self, target: &[u8]) -> Option<(Vec<u8>, O::Value)> {
        self.inner.seek_floor(&to_labels(target)).map(to_bytes)
    }
}

fn to_labels(bytes: &[u8]) -> Vec<u32> {
    bytes.iter().map(|&b| b as u32).collect()
}

fn to_bytes<V>(entry: InputOutput<V>) -> (Vec<u8>, V) {
    let key = entry.input.iter().map(|&l| l as u8).collect();
    (key, entry.output)
}

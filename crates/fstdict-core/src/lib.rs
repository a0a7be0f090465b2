//! Incremental construction of minimal finite-state transducers from
//! lexicographically sorted key/value streams, plus sorted enumeration
//! with exact, ceiling, and floor seeks.
//!
//! This is the term-dictionary building block: very large sorted key sets
//! compile on the fly into a compact automaton sharing both prefixes and
//! suffixes, with per-key values distributed over arc outputs.

pub mod builder;
pub mod enumerate;
pub mod error;
pub mod freeze;
pub mod fst;
pub mod node;
pub mod node_hash;
pub mod outputs;
pub mod store;

#[cfg(test)]
mod proptests;

pub use builder::{Builder, BuilderOpts, FreezeTailHook};
pub use enumerate::{BytesEnum, FstEnum, InputOutput};
pub use error::BuildError;
pub use fst::{Fst, InputType, END_LABEL};
pub use outputs::{ByteSequenceOutputs, IntOutputs, NoOutput, NoOutputs, Outputs};

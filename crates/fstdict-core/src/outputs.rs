//! Output algebras.
//!
//! An FST maps each key to a value of some algebra `T`. During construction
//! the builder pushes values toward the root so that every arc carries the
//! longest prefix (in the algebra's sense) common to all keys routed through
//! it; the algebra supplies the prefix operations that make this possible.
//!
//! Required laws, for all `x`, `a`, `b`:
//!
//! - `add(no_output(), x) == add(x, no_output()) == x`
//! - `common(x, no_output()) == no_output()`
//! - `add(common(a, b), subtract(a, common(a, b))) == a`
//!
//! Implementations must be pure: no hidden state, no interior mutability.

use std::fmt::Debug;
use std::hash::Hash;

/// Capability set for an output algebra.
///
/// `merge` combines two outputs mapped to the *same* key and is only
/// required when the caller intends to add duplicate keys; the default
/// returns `None`, meaning duplicates are rejected.
pub trait Outputs {
    type Value: Clone + Eq + Hash + Debug;

    /// The identity element.
    fn no_output(&self) -> Self::Value;

    /// Left-extend `suffix` by `prefix`.
    fn add(&self, prefix: &Self::Value, suffix: &Self::Value) -> Self::Value;

    /// Longest common prefix of `a` and `b` in the algebra.
    fn common(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Remainder of `a` after removing `prefix`, where `prefix` is a prefix
    /// of `a` (in practice always obtained from `common`).
    fn subtract(&self, a: &Self::Value, prefix: &Self::Value) -> Self::Value;

    /// Combine two outputs for the same key. `None` means the algebra does
    /// not support duplicate keys.
    fn merge(&self, _first: &Self::Value, _second: &Self::Value) -> Option<Self::Value> {
        None
    }
}

/// The trivial algebra: every value is the identity. Turns the FST into an
/// FSA over its keys. Duplicate keys collapse, so `merge` is supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutputs;

/// The single value of [`NoOutputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoOutput;

impl Outputs for NoOutputs {
    type Value = NoOutput;

    fn no_output(&self) -> NoOutput {
        NoOutput
    }

    fn add(&self, _prefix: &NoOutput, _suffix: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn common(&self, _a: &NoOutput, _b: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn subtract(&self, _a: &NoOutput, _prefix: &NoOutput) -> NoOutput {
        NoOutput
    }

    fn merge(&self, _first: &NoOutput, _second: &NoOutput) -> Option<NoOutput> {
        Some(NoOutput)
    }
}

/// Sum algebra over `u64`: `add` is addition, `common` is `min`,
/// `subtract` is subtraction. Identity is `0`.
///
/// Per-key totals are sums of arc outputs along the key's path, which is
/// the usual encoding for term ordinals and postings offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntOutputs;

impl Outputs for IntOutputs {
    type Value = u64;

    fn no_output(&self) -> u64 {
        0
    }

    fn add(&self, prefix: &u64, suffix: &u64) -> u64 {
        prefix + suffix
    }

    fn common(&self, a: &u64, b: &u64) -> u64 {
        (*a).min(*b)
    }

    fn subtract(&self, a: &u64, prefix: &u64) -> u64 {
        debug_assert!(prefix <= a);
        a - prefix
    }
}

/// Byte-string algebra: `add` is concatenation, `common` is the longest
/// common byte prefix, `subtract` strips a prefix. Identity is the empty
/// sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteSequenceOutputs;

impl Outputs for ByteSequenceOutputs {
    type Value = Vec<u8>;

    fn no_output(&self) -> Vec<u8> {
        Vec::new()
    }

    fn add(&self, prefix: &Vec<u8>, suffix: &Vec<u8>) -> Vec<u8> {
        if prefix.is_empty() {
            return suffix.clone();
        }
        if suffix.is_empty() {
            return prefix.clone();
        }
        let mut out = Vec::with_capacity(prefix.len() + suffix.len());
        out.extend_from_slice(prefix);
        out.extend_from_slice(suffix);
        out
    }

    fn common(&self, a: &Vec<u8>, b: &Vec<u8>) -> Vec<u8> {
        let len = a
            .iter()
            .zip(b.iter())
            .take_while(|(x, y)| x == y)
            .count();
        a[..len].to_vec()
    }

    fn subtract(&self, a: &Vec<u8>, prefix: &Vec<u8>) -> Vec<u8> {
        debug_assert!(a.starts_with(prefix));
        a[prefix.len()..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_laws<O: Outputs>(outputs: &O, a: O::Value, b: O::Value) {
        let no = outputs.no_output();
        assert_eq!(outputs.add(&no, &a), a);
        assert_eq!(outputs.add(&a, &no), a);
        assert_eq!(outputs.common(&a, &no), no);
        let c = outputs.common(&a, &b);
        assert_eq!(outputs.add(&c, &outputs.subtract(&a, &c)), a);
        assert_eq!(outputs.add(&c, &outputs.subtract(&b, &c)), b);
    }

    #[test]
    fn test_int_laws() {
        check_laws(&IntOutputs, 10, 4);
        check_laws(&IntOutputs, 0, 7);
        assert_eq!(IntOutputs.common(&10, &4), 4);
        assert_eq!(IntOutputs.subtract(&10, &4), 6);
    }

    #[test]
    fn test_byte_sequence_laws() {
        let o = ByteSequenceOutputs;
        check_laws(&o, b"foobar".to_vec(), b"foobaz".to_vec());
        check_laws(&o, b"foo".to_vec(), b"foobar".to_vec());
        check_laws(&o, Vec::new(), b"x".to_vec());
        assert_eq!(o.common(&b"foobar".to_vec(), &b"foobaz".to_vec()), b"fooba");
    }

    #[test]
    fn test_no_outputs_merge() {
        assert_eq!(NoOutputs.merge(&NoOutput, &NoOutput), Some(NoOutput));
        assert_eq!(IntOutputs.merge(&1, &2), None);
    }
}

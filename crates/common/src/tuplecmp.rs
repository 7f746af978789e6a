//! Tuple comparison with partial-length support.
//!
//! Composite index keys are ordered tuples of `Value`s. Comparing two
//! tuples of the same arity is the common case, but a composite-index
//! prefix lookup (binding only the leading columns of a multi-column
//! index) and range-scan bounds both need to compare tuples of
//! *different* lengths without treating a missing trailing component
//! as `NULL`.

use std::cmp::Ordering;
use types::Value;

/// How two tuples of differing length compare once the shorter one's
/// components are exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthMode {
    /// Stop as soon as the shorter tuple runs out: an exact match on
    /// the shared prefix is `Equal` regardless of what the longer
    /// tuple has left over. Used for composite-index prefix lookups.
    IgnoreLength,
    /// A tuple that runs out of components first sorts before a
    /// longer tuple that agrees with it on the shared prefix. Used for
    /// range-scan bounds, where a missing trailing column means
    /// "open-ended" rather than "equal".
    ShorterIsLess,
}

/// Compares two tuples component-wise using `Value`'s total order,
/// applying `mode` once one side's components run out.
///
/// # Examples
/// ```
/// use common::tuplecmp::{compare_tuples, LengthMode};
/// use types::Value;
/// use std::cmp::Ordering;
///
/// let a = [Value::Int(1), Value::Int(2)];
/// let b = [Value::Int(1)];
/// assert_eq!(compare_tuples(&a, &b, LengthMode::IgnoreLength), Ordering::Equal);
/// assert_eq!(compare_tuples(&a, &b, LengthMode::ShorterIsLess), Ordering::Greater);
/// ```
pub fn compare_tuples(a: &[Value], b: &[Value], mode: LengthMode) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    match mode {
        LengthMode::IgnoreLength => Ordering::Equal,
        LengthMode::ShorterIsLess => a.len().cmp(&b.len()),
    }
}

/// Orders an index entry's key against a (possibly shorter) lookup
/// key, comparing only the leading `key.len()` components of `tuple`.
/// `Equal` means `tuple` starts with exactly `key`.
pub fn prefix_cmp(tuple: &[Value], key: &[Value]) -> Ordering {
    let n = key.len().min(tuple.len());
    compare_tuples(&tuple[..n], &key[..n], LengthMode::IgnoreLength)
}

/// True when `tuple` begins with exactly the components of `key`.
///
/// # Examples
/// ```
/// use common::tuplecmp::prefix_matches;
/// use types::Value;
///
/// let tuple = [Value::Int(1), Value::Text("a".into())];
/// assert!(prefix_matches(&tuple, &[Value::Int(1)]));
/// assert!(!prefix_matches(&tuple, &[Value::Int(2)]));
/// ```
pub fn prefix_matches(tuple: &[Value], key: &[Value]) -> bool {
    key.len() <= tuple.len() && prefix_cmp(tuple, key) == Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_prefix_with_ignore_length_is_equal() {
        let a = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let b = [Value::Int(1), Value::Int(2)];
        assert_eq!(compare_tuples(&a, &b, LengthMode::IgnoreLength), Ordering::Equal);
    }

    #[test]
    fn shorter_is_less_breaks_the_tie() {
        let a = [Value::Int(1)];
        let b = [Value::Int(1), Value::Int(0)];
        assert_eq!(compare_tuples(&a, &b, LengthMode::ShorterIsLess), Ordering::Less);
    }

    #[test]
    fn differing_prefix_ignores_length_mode() {
        let a = [Value::Int(1), Value::Int(2)];
        let b = [Value::Int(5)];
        assert_eq!(compare_tuples(&a, &b, LengthMode::IgnoreLength), Ordering::Less);
        assert_eq!(compare_tuples(&a, &b, LengthMode::ShorterIsLess), Ordering::Less);
    }

    #[test]
    fn prefix_matches_rejects_longer_key() {
        let tuple = [Value::Int(1)];
        assert!(!prefix_matches(&tuple, &[Value::Int(1), Value::Int(2)]));
    }
}

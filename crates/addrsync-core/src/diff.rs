// # Sorted-Set Differ
//
// Two-pointer merge over two strictly ascending, deduplicated sequences.
// Produces the symmetric difference in ascending order in O(n + m).
//
// The result carries no add/remove tag: callers classify each entry by
// looking it up in the current and desired maps (see `Change::classify`).

use crate::address::NormalizedAddress;
use crate::aggregate::{CurrentSet, DesiredSet};
use crate::error::{Error, Result};
use std::cmp::Ordering;

/// Symmetric difference of two strictly ascending sequences
///
/// Every element present in exactly one input appears once in the output;
/// elements present in both are dropped. The output is ascending, so
/// `diff_sorted(a, b) == diff_sorted(b, a)`.
///
/// Inputs that are not strictly ascending produce unspecified output.
pub fn diff_sorted<T: Ord + Clone>(current: &[T], desired: &[T]) -> Vec<T> {
    debug_assert!(is_strictly_ascending(current), "current input is not strictly ascending");
    debug_assert!(is_strictly_ascending(desired), "desired input is not strictly ascending");

    let mut out = Vec::with_capacity(current.len().max(desired.len()));
    let (mut i, mut j) = (0, 0);

    while i < current.len() && j < desired.len() {
        match current[i].cmp(&desired[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                out.push(current[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(desired[j].clone());
                j += 1;
            }
        }
    }

    out.extend_from_slice(&current[i..]);
    out.extend_from_slice(&desired[j..]);
    out
}

/// Whether a slice is strictly ascending (sorted and without duplicates)
pub fn is_strictly_ascending<T: Ord>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] < w[1])
}

/// What a diff entry means for the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Desired but not on the device
    Add,
    /// On the device but no longer desired
    Remove,
}

impl Change {
    /// Classify a diff entry against both maps
    ///
    /// An entry present in both or in neither map means the differ was fed
    /// inputs that break its precondition.
    pub fn classify(
        address: &NormalizedAddress,
        current: &CurrentSet,
        desired: &DesiredSet,
    ) -> Result<Self> {
        match (current.contains(address), desired.contains(address)) {
            (false, true) => Ok(Change::Add),
            (true, false) => Ok(Change::Remove),
            (true, true) => Err(Error::contract(format!(
                "diff entry {} is present in both current and desired state",
                address
            ))),
            (false, false) => Err(Error::contract(format!(
                "diff entry {} is present in neither current nor desired state",
                address
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::normalize_sorted;

    fn strs(items: &[NormalizedAddress]) -> Vec<&str> {
        items.iter().map(|a| a.as_str()).collect()
    }

    #[test]
    fn ipv4_mixed_with_cidr() {
        let a = normalize_sorted(&["aa", "ab/32", "ba", "bb", "ca/32"]);
        let b = normalize_sorted(&["ab", "ac", "ba", "bc/32", "cb"]);

        let d = diff_sorted(&a, &b);
        assert_eq!(
            strs(&d),
            vec!["aa/32", "ac/32", "bb/32", "bc/32", "ca/32", "cb/32"]
        );
    }

    #[test]
    fn ipv6_scenario() {
        let a = normalize_sorted(&["a:a", "a:b/128", "b:a", "b:b", "c:a/128"]);
        let b = normalize_sorted(&["a:b", "a:c", "b:a", "b:c/128", "c:b"]);

        let d = diff_sorted(&a, &b);
        assert_eq!(
            strs(&d),
            vec!["a:a/128", "a:c/128", "b:b/128", "b:c/128", "c:a/128", "c:b/128"]
        );
    }

    #[test]
    fn argument_order_does_not_change_result() {
        let a = normalize_sorted(&["1.1.1.1", "2.2.2.2", "4.4.4.4"]);
        let b = normalize_sorted(&["2.2.2.2", "3.3.3.3", "5.5.5.5"]);

        assert_eq!(diff_sorted(&a, &b), diff_sorted(&b, &a));
    }

    #[test]
    fn empty_inputs() {
        let b = normalize_sorted(&["b", "a", "c/24"]);
        let empty: Vec<NormalizedAddress> = Vec::new();

        assert_eq!(diff_sorted(&empty, &b), b);
        assert_eq!(diff_sorted(&b, &empty), b);
        assert!(diff_sorted(&empty, &empty).is_empty());
    }

    #[test]
    fn identical_inputs_give_empty_diff() {
        let a = normalize_sorted(&["1.1.1.1", "::1", "10.0.0.0/8"]);
        assert!(diff_sorted(&a, &a.clone()).is_empty());
    }

    #[test]
    fn every_exclusive_element_appears_exactly_once() {
        let a: Vec<u32> = (0..50).filter(|n| n % 2 == 0).collect();
        let b: Vec<u32> = (0..50).filter(|n| n % 3 == 0).collect();

        let d = diff_sorted(&a, &b);
        for n in 0..50u32 {
            let expected = usize::from((n % 2 == 0) != (n % 3 == 0));
            assert_eq!(d.iter().filter(|x| **x == n).count(), expected, "element {n}");
        }
        assert!(is_strictly_ascending(&d));
    }

    #[test]
    fn strict_ascending_check() {
        assert!(is_strictly_ascending::<u8>(&[]));
        assert!(is_strictly_ascending(&[1, 2, 3]));
        assert!(!is_strictly_ascending(&[1, 1, 2]));
        assert!(!is_strictly_ascending(&[2, 1]));
    }
}

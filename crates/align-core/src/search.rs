//! Sorted-array binary search over an indexable, ascending-by-key sequence.
//!
//! Used by the t-table shard reader to find an index record by source word
//! and an entry record by target word, without requiring the sequence to be
//! materialized as a `Vec` — callers pass an accessor closure so this works
//! equally well over an in-memory slice or an mmap'd byte range.

/// Lower-bound-style binary search: find the rightmost index `i` in
/// `0..len` for which `key_at(i) == target`, maintaining the invariant
/// `key_at(low) <= target < key_at(high)` on the search range.
///
/// Returns `None` if `len == 0` or `target` is not present. On duplicate
/// keys, returns the last (highest-index) occurrence, matching write-time
/// append-last-wins semantics (though shard producers never write
/// duplicates in practice).
pub fn binary_search_last<F: Fn(usize) -> i32>(len: usize, key_at: F, target: i32) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let mut low = 0usize;
    let mut high = len;
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if key_at(mid) <= target {
            low = mid;
        } else {
            high = mid;
        }
    }
    if key_at(low) == target {
        Some(low)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_contract_on_keys_with_duplicates() {
        let keys = [0i32, 2, 3, 3, 4];
        let at = |i: usize| keys[i];
        let len = keys.len();

        assert_eq!(binary_search_last(len, at, 0), Some(0));
        assert_eq!(binary_search_last(len, at, 1), None);
        assert_eq!(binary_search_last(len, at, 3), Some(3));
        assert_eq!(binary_search_last(len, at, 5), None);
    }

    #[test]
    fn search_empty_array() {
        let at = |_: usize| 0i32;
        assert_eq!(binary_search_last(0, at, 0), None);
    }

    #[test]
    fn search_single_element_present() {
        let at = |_: usize| 7i32;
        assert_eq!(binary_search_last(1, at, 7), Some(0));
    }

    #[test]
    fn search_single_element_absent() {
        let at = |_: usize| 7i32;
        assert_eq!(binary_search_last(1, at, 8), None);
    }

    #[test]
    fn search_below_all_and_above_all() {
        let keys = [10i32, 20, 30];
        let at = |i: usize| keys[i];
        assert_eq!(binary_search_last(keys.len(), at, 5), None);
        assert_eq!(binary_search_last(keys.len(), at, 35), None);
    }
}

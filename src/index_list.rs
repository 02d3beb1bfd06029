//! Sorted set of loaded frame indices with O(1) neighbor lookups
//!
//! **Why**: Playback needs "which loaded frame is nearest to the one I want"
//! answered thousands of times per second while loads trickle in out of
//! order. Keeping the indices sorted with a value→position map makes
//! membership and neighbor queries O(1) and closest-frame queries O(log n).
//!
//! **Used by**: Loading strategies (insert on every successful load),
//! SequencePlayer (closest-frame fallback during render).

use std::collections::HashMap;

/// Zero-based position of a frame in the sequence.
pub type FrameIdx = usize;

/// Ascending, duplicate-free list of frame indices plus a reverse map from
/// value to its position in the list.
///
/// Invariant: `positions[list[i]] == i` for every `i` after every mutation.
#[derive(Debug, Default, Clone)]
pub struct IndexList {
    list: Vec<FrameIdx>,
    positions: HashMap<FrameIdx, usize>,
}

impl IndexList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary (possibly unsorted, possibly duplicated)
    /// collection. Normalizes to the sorted unique form.
    pub fn from_indexes<I: IntoIterator<Item = FrameIdx>>(indexes: I) -> Self {
        let mut list: Vec<FrameIdx> = indexes.into_iter().collect();
        list.sort_unstable();
        list.dedup();

        let positions = list.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        Self { list, positions }
    }

    /// Insert a value at its sorted position and return that position.
    ///
    /// Idempotent: inserting a value that is already a member changes
    /// nothing and returns its current position.
    pub fn insert(&mut self, value: FrameIdx) -> usize {
        if let Some(&pos) = self.positions.get(&value) {
            return pos;
        }

        // First position whose element is >= value.
        let pos = self.list.partition_point(|&v| v < value);
        self.list.insert(pos, value);
        self.remap_from(pos);
        pos
    }

    // Everything at or after the insertion point shifted right by one.
    fn remap_from(&mut self, start: usize) {
        for (i, &v) in self.list.iter().enumerate().skip(start) {
            self.positions.insert(v, i);
        }
    }

    pub fn contains(&self, value: FrameIdx) -> bool {
        self.positions.contains_key(&value)
    }

    /// Position of `value` in the ascending list, if present.
    pub fn position(&self, value: FrameIdx) -> Option<usize> {
        self.positions.get(&value).copied()
    }

    /// Member strictly after `value` (which must be present), or `None` if
    /// there is none or it exceeds the inclusive `max` bound.
    pub fn next(&self, value: FrameIdx, max: Option<FrameIdx>) -> Option<FrameIdx> {
        let pos = self.position(value)?;
        let candidate = *self.list.get(pos + 1)?;
        match max {
            Some(m) if candidate > m => None,
            _ => Some(candidate),
        }
    }

    /// Member strictly before `value` (which must be present), or `None` if
    /// there is none or it falls below the inclusive `min` bound.
    pub fn prev(&self, value: FrameIdx, min: Option<FrameIdx>) -> Option<FrameIdx> {
        let pos = self.position(value)?;
        let candidate = *self.list.get(pos.checked_sub(1)?)?;
        match min {
            Some(m) if candidate < m => None,
            _ => Some(candidate),
        }
    }

    /// `value` itself when present, otherwise delegates to `next` (which
    /// requires membership, so an absent value yields `None`).
    pub fn self_or_next(&self, value: FrameIdx, max: Option<FrameIdx>) -> Option<FrameIdx> {
        if self.contains(value) {
            return Some(value);
        }
        self.next(value, max)
    }

    /// `value` itself when present, otherwise delegates to `prev`.
    pub fn self_or_prev(&self, value: FrameIdx, min: Option<FrameIdx>) -> Option<FrameIdx> {
        if self.contains(value) {
            return Some(value);
        }
        self.prev(value, min)
    }

    /// Nearest member to `value` (which need not be present). Exact ties
    /// between the bracketing neighbors resolve to the lower one.
    /// `None` only for an empty list.
    pub fn closest(&self, value: FrameIdx) -> Option<FrameIdx> {
        let pos = self.list.partition_point(|&v| v < value);
        let left = pos.checked_sub(1).map(|i| self.list[i]);
        let right = self.list.get(pos).copied();

        match (left, right) {
            (None, None) => None,
            (None, Some(r)) => Some(r),
            (Some(l), None) => Some(l),
            // left < value <= right always holds here.
            (Some(l), Some(r)) => {
                if value - l <= r - value {
                    Some(l)
                } else {
                    Some(r)
                }
            }
        }
    }

    pub fn head(&self) -> Option<FrameIdx> {
        self.list.first().copied()
    }

    pub fn tail(&self) -> Option<FrameIdx> {
        self.list.last().copied()
    }

    /// The ascending list itself.
    pub fn get(&self) -> &[FrameIdx] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[FrameIdx]) -> IndexList {
        let mut list = IndexList::new();
        for &v in values {
            list.insert(v);
        }
        list
    }

    #[test]
    fn insert_returns_sorted_positions() {
        let mut list = IndexList::new();
        assert_eq!(list.insert(0), 0);
        assert_eq!(list.insert(16), 1);
        assert_eq!(list.insert(8), 1);
        assert_eq!(list.insert(32), 3);
        assert_eq!(list.insert(3), 1);
        assert_eq!(list.get(), &[0, 3, 8, 16, 32]);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut list = filled(&[0, 3, 8, 16, 32]);
        assert_eq!(list.insert(8), 2);
        assert_eq!(list.insert(8), 2);
        assert_eq!(list.get(), &[0, 3, 8, 16, 32]);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn positions_remap_after_left_insert() {
        let mut list = IndexList::new();
        list.insert(5);
        assert_eq!(list.position(5), Some(0));
        list.insert(4);
        assert_eq!(list.position(4), Some(0));
        assert_eq!(list.position(5), Some(1));
        assert_eq!(list.position(99), None);
    }

    #[test]
    fn from_indexes_normalizes() {
        let list = IndexList::from_indexes([5, 1, 3, 1, 5]);
        assert_eq!(list.get(), &[1, 3, 5]);
        assert_eq!(list.position(3), Some(1));
    }

    #[test]
    fn next_and_prev_respect_inclusive_bounds() {
        let list = filled(&[0, 3, 8]);
        assert_eq!(list.next(3, None), Some(8));
        assert_eq!(list.next(3, Some(8)), Some(8));
        assert_eq!(list.next(3, Some(7)), None);
        assert_eq!(list.next(8, None), None);
        assert_eq!(list.next(99, None), None); // absent value

        assert_eq!(list.prev(3, None), Some(0));
        assert_eq!(list.prev(3, Some(0)), Some(0));
        assert_eq!(list.prev(3, Some(1)), None);
        assert_eq!(list.prev(0, None), None);
        assert_eq!(list.prev(99, None), None);
    }

    #[test]
    fn self_or_neighbor_lookups() {
        let list = filled(&[0, 3, 8]);
        assert_eq!(list.self_or_next(3, None), Some(3));
        assert_eq!(list.self_or_prev(8, None), Some(8));
        // Absent values delegate to next/prev, which need membership.
        assert_eq!(list.self_or_next(4, None), None);
        assert_eq!(list.self_or_prev(4, None), None);
        assert_eq!(list.self_or_prev(0, Some(0)), Some(0));
    }

    #[test]
    fn closest_picks_nearest_member() {
        let list = filled(&[0, 3, 8, 16, 17, 32, 34, 38]);
        assert_eq!(list.closest(0), Some(0));
        assert_eq!(list.closest(8), Some(8));
        assert_eq!(list.closest(9), Some(8));
        assert_eq!(list.closest(14), Some(16));
        assert_eq!(list.closest(24), Some(17));
        assert_eq!(list.closest(25), Some(32));
        assert_eq!(list.closest(100), Some(38));
    }

    #[test]
    fn closest_below_minimum_returns_minimum() {
        let list = filled(&[3, 8]);
        assert_eq!(list.closest(0), Some(3));
        assert_eq!(list.closest(2), Some(3));
    }

    #[test]
    fn closest_tie_breaks_toward_lower() {
        let list = filled(&[0, 3, 8, 16, 17, 32, 34, 38]);
        // 36 is equidistant from 34 and 38.
        assert_eq!(list.closest(36), Some(34));

        let list = filled(&[10, 20]);
        assert_eq!(list.closest(15), Some(10));
    }

    #[test]
    fn closest_on_empty_is_none() {
        let list = IndexList::new();
        assert_eq!(list.closest(7), None);
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);
    }

    #[test]
    fn head_tail_and_clear() {
        let mut list = filled(&[4, 1, 9]);
        assert_eq!(list.head(), Some(1));
        assert_eq!(list.tail(), Some(9));
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.position(4), None);
    }
}

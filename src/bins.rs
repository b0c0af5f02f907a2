//! Free-list heads per size class and the two-level bitmap over them.
//!
//! ```text
//!   top:    u32, bit g set  <=>  leaves[g] != 0
//!   leaves: [u8; 32], bit l of leaves[g] set  <=>  heads[g * 8 + l] != NONE
//!   heads:  [NodeIndex; 256]
//! ```
//!
//! The smallest sufficient class is found with at most two bit scans.

use crate::index::NodeIndex;
use crate::size_class::{NUM_LEAF_BINS, NUM_TOP_BINS, TOP_BINS_INDEX_SHIFT, split_class};

const _: () = assert!(NUM_TOP_BINS == u32::BITS as usize);
const _: () = assert!(NUM_LEAF_BINS / NUM_TOP_BINS == u8::BITS as usize);

/// Index of the lowest set bit of `mask` at or above `start`.
#[inline(always)]
fn lowest_set_bit_from(mask: u32, start: u32) -> Option<u32> {
  let bits = u32::MAX.checked_shl(start).map_or(0, |keep| mask & keep);
  (bits != 0).then(|| bits.trailing_zeros())
}

#[inline(always)]
fn highest_set_bit(mask: u32) -> Option<u32> {
  (mask != 0).then(|| 31 - mask.leading_zeros())
}

pub(crate) struct Bins<I> {
  top: u32,
  leaves: [u8; NUM_TOP_BINS],
  heads: [I; NUM_LEAF_BINS],
}

impl<I: NodeIndex> Bins<I> {
  pub fn new() -> Self {
    Self {
      top: 0,
      leaves: [0; NUM_TOP_BINS],
      heads: [I::NONE; NUM_LEAF_BINS],
    }
  }

  /// Head of the free list for `class`, or `NONE`.
  #[inline(always)]
  pub fn head(&self, class: u32) -> I {
    self.heads[class as usize]
  }

  /// Replace the head of `class` and keep both bitmap levels in sync.
  #[inline]
  pub fn set_head(&mut self, class: u32, node: I) {
    self.heads[class as usize] = node;
    if node.is_none() {
      self.mark_empty(class);
    } else {
      self.mark_non_empty(class);
    }
  }

  #[inline(always)]
  fn mark_non_empty(&mut self, class: u32) {
    let (top, leaf) = split_class(class);
    self.leaves[top as usize] |= 1 << leaf;
    self.top |= 1 << top;
  }

  #[inline(always)]
  fn mark_empty(&mut self, class: u32) {
    let (top, leaf) = split_class(class);
    self.leaves[top as usize] &= !(1 << leaf);
    if self.leaves[top as usize] == 0 {
      self.top &= !(1 << top);
    }
  }

  /// Smallest non-empty class `>= min_class`.
  ///
  /// Only the group of `min_class` needs a partial leaf scan. Any higher group
  /// holds classes that all exceed `min_class`, so its lowest bit wins.
  #[inline]
  pub fn first_non_empty_at_or_after(&self, min_class: u32) -> Option<u32> {
    let (min_top, min_leaf) = split_class(min_class);

    if self.top & (1 << min_top) != 0
      && let Some(leaf) = lowest_set_bit_from(self.leaves[min_top as usize] as u32, min_leaf)
    {
      return Some((min_top << TOP_BINS_INDEX_SHIFT) | leaf);
    }

    let top = lowest_set_bit_from(self.top, min_top + 1)?;
    // A set top bit guarantees a set leaf bit.
    debug_assert!(self.leaves[top as usize] != 0);
    let leaf = self.leaves[top as usize].trailing_zeros();
    Some((top << TOP_BINS_INDEX_SHIFT) | leaf)
  }

  /// Largest non-empty class.
  #[inline]
  pub fn highest_non_empty(&self) -> Option<u32> {
    let top = highest_set_bit(self.top)?;
    let leaf = highest_set_bit(self.leaves[top as usize] as u32)?;
    Some((top << TOP_BINS_INDEX_SHIFT) | leaf)
  }

  #[cfg(test)]
  pub fn is_consistent(&self) -> bool {
    (0..NUM_LEAF_BINS as u32).all(|class| {
      let (top, leaf) = split_class(class);
      let leaf_set = self.leaves[top as usize] & (1 << leaf) != 0;
      leaf_set == !self.heads[class as usize].is_none()
    }) && (0..NUM_TOP_BINS).all(|top| (self.top & (1 << top) != 0) == (self.leaves[top] != 0))
  }
}

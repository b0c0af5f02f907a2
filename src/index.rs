//! Node handle width.
//!
//! `u16` handles halve the metadata of every node and bin entry but cap the
//! allocator at 65534 outstanding allocations; `u32` handles lift the cap to
//! roughly four billion. The choice is made at compile time through the type
//! parameter of [`OffsetAllocator`](crate::OffsetAllocator).

use core::{fmt::Debug, hash::Hash};

mod sealed {
  pub trait Sealed {}
  impl Sealed for u16 {}
  impl Sealed for u32 {}
}

/// Integer type used to address node slots.
pub trait NodeIndex: sealed::Sealed + Copy + Eq + Hash + Debug + Send + Sync + 'static {
  /// Reserved value: no link, no node, no allocation.
  const NONE: Self;

  /// Largest `max_allocs` this width supports. The arena holds
  /// `max_allocs + 1` slots, and none of them may collide with `NONE`.
  const MAX_ALLOCS: u32;

  /// Narrow a slot number. Callers keep `value` below `NONE`.
  fn from_u32(value: u32) -> Self;

  fn to_u32(self) -> u32;

  #[inline(always)]
  fn to_usize(self) -> usize {
    self.to_u32() as usize
  }

  #[inline(always)]
  fn is_none(self) -> bool {
    self == Self::NONE
  }
}

impl NodeIndex for u16 {
  const NONE: Self = u16::MAX;
  const MAX_ALLOCS: u32 = u16::MAX as u32 - 1;

  #[inline(always)]
  fn from_u32(value: u32) -> Self {
    debug_assert!(value <= u16::MAX as u32, "node index {value} overflows u16");
    value as u16
  }

  #[inline(always)]
  fn to_u32(self) -> u32 {
    self as u32
  }
}

impl NodeIndex for u32 {
  const NONE: Self = u32::MAX;
  const MAX_ALLOCS: u32 = u32::MAX - 1;

  #[inline(always)]
  fn from_u32(value: u32) -> Self {
    value
  }

  #[inline(always)]
  fn to_u32(self) -> u32 {
    self
  }
}

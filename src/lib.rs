//! Fixed-capacity offset allocator.
//!
//! Hands out non-overlapping sub-ranges `[offset, offset + size)` of a single
//! range of `size` units and coalesces them again on free. It never touches
//! memory: the range usually stands for a GPU heap or a buffer that a resource
//! manager fills by offset.
//!
//! ```text
//!   allocate(n): round n up to a size class
//!                -> bitmap scan for the first non-empty class >= it
//!                -> pop its head node, split off the remainder
//!   free(a):     merge with free left/right neighbors
//!                -> push the merged span to its (rounded down) class
//! ```
//!
//! ```
//! use offalloc::OffsetAllocator;
//!
//! let mut allocator = OffsetAllocator::<u32>::new(128).unwrap();
//! allocator.reset(1024);
//!
//! let a = allocator.allocate(100).unwrap();
//! let b = allocator.allocate(50).unwrap();
//! assert_eq!((a.offset, b.offset), (0, 100));
//!
//! allocator.free(a);
//! assert_eq!(allocator.storage_report().total_free_space, 974);
//! ```
//!
//! Not thread-safe; one allocator per thread or an external lock.

mod bins;
mod error;
pub mod index;
mod node;
mod report;
pub mod size_class;
mod tracing_helpers;

use core::fmt;

use crate::bins::Bins;
use crate::node::{Node, NodeArena};
use crate::size_class::{NUM_LEAF_BINS, class_to_size, quantize_round_down, quantize_round_up};
use crate::tracing_helpers::{debug_log, trace_log, warn_log};

pub use crate::error::AllocError;
pub use crate::index::NodeIndex;
pub use crate::report::{Region, StorageReport, StorageReportFull};

// =============================================================================
// Constants
// =============================================================================

/// Offset of [`Allocation::NONE`].
pub const NO_SPACE: u32 = u32::MAX;

/// Node capacity used by `Default`. Fits both handle widths.
pub const DEFAULT_MAX_ALLOCS: u32 = 65_534;

const _: () = assert!(DEFAULT_MAX_ALLOCS <= <u16 as NodeIndex>::MAX_ALLOCS);
const _: () = assert!(NUM_LEAF_BINS == 256);

// =============================================================================
// Types
// =============================================================================

/// A granted span. Not an owner of anything: present it back to `free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocation<I = u32> {
  pub offset: u32,
  /// Node handle of the span.
  pub metadata: I,
}

impl<I: NodeIndex> Allocation<I> {
  /// Sentinel for "no allocation".
  pub const NONE: Self = Self {
    offset: NO_SPACE,
    metadata: I::NONE,
  };

  #[inline]
  pub fn is_none(&self) -> bool {
    self.metadata.is_none()
  }
}

/// Sub-allocator over `[0, size)`.
///
/// `I` is the node handle width, see [`index`].
pub struct OffsetAllocator<I: NodeIndex = u32> {
  size: u32,
  max_allocs: u32,
  /// Exact sum of the sizes of all free nodes.
  free_storage: u32,
  bins: Bins<I>,
  arena: NodeArena<I>,
}

// =============================================================================
// Construction
// =============================================================================

impl<I: NodeIndex> OffsetAllocator<I> {
  /// Allocator for up to `max_allocs` live allocations. Manages nothing
  /// until [`reset`](Self::reset).
  pub fn new(max_allocs: u32) -> Result<Self, AllocError> {
    if max_allocs > I::MAX_ALLOCS {
      return Err(AllocError::CapacityTooLarge {
        requested: max_allocs,
        max: I::MAX_ALLOCS,
      });
    }
    Ok(Self::uninit(max_allocs))
  }

  fn uninit(max_allocs: u32) -> Self {
    Self {
      size: 0,
      max_allocs,
      free_storage: 0,
      bins: Bins::new(),
      arena: NodeArena::empty(),
    }
  }

  /// Move all state out, leaving `self` empty with zero capacity.
  pub fn take(&mut self) -> Self {
    core::mem::replace(self, Self::uninit(0))
  }

  /// Start over with a single free span `[0, size)`.
  ///
  /// Invalidates every outstanding allocation. Does nothing when `size` equals
  /// the current size.
  pub fn reset(&mut self, size: u32) {
    if self.size == size {
      return;
    }

    debug_log!(old_size = self.size, new_size = size, max_allocs = self.max_allocs, "reset");

    self.size = size;
    self.free_storage = 0;
    self.bins = Bins::new();
    self.arena = NodeArena::with_max_allocs(self.max_allocs);

    // The whole range as one node; allocations split remainders off it.
    self.insert_into_bin(size, 0);
  }
}

impl<I: NodeIndex> Default for OffsetAllocator<I> {
  fn default() -> Self {
    Self::uninit(DEFAULT_MAX_ALLOCS)
  }
}

// =============================================================================
// Allocate / free
// =============================================================================

impl<I: NodeIndex> OffsetAllocator<I> {
  /// Place `size` units, or `None` when out of nodes or out of a large enough
  /// free span. Zero-sized requests get `None`.
  #[must_use]
  pub fn allocate(&mut self, size: u32) -> Option<Allocation<I>> {
    if size == 0 {
      return None;
    }

    // The remainder of a split needs a node of its own.
    if self.arena.is_exhausted() {
      debug_log!(size, max_allocs = self.max_allocs, "allocate: out of nodes");
      return None;
    }

    // Rounding up guarantees every node in the found class fits.
    let min_class = quantize_round_up(size);
    let Some(class) = self.bins.first_non_empty_at_or_after(min_class) else {
      debug_log!(size, free_storage = self.free_storage, "allocate: no span large enough");
      return None;
    };

    let index = self.bins.head(class);
    let node = &mut self.arena[index];
    let total = node.size;
    let offset = node.offset;
    let bin_next = node.bin_next;
    debug_assert!(!node.used && total >= size);
    node.size = size;
    node.used = true;
    node.bin_next = I::NONE;

    self.bins.set_head(class, bin_next);
    if !bin_next.is_none() {
      self.arena[bin_next].bin_prev = I::NONE;
    }
    self.free_storage -= total;
    trace_log!(node = index.to_u32(), class, free_storage = self.free_storage, delta = total, "span taken");

    let remainder = total - size;
    if remainder > 0 {
      let split = self.insert_into_bin(remainder, offset + size);

      // Splice the remainder between the allocation and its old right neighbor.
      let neighbor_next = self.arena[index].neighbor_next;
      if !neighbor_next.is_none() {
        self.arena[neighbor_next].neighbor_prev = split;
      }
      let split_node = &mut self.arena[split];
      split_node.neighbor_prev = index;
      split_node.neighbor_next = neighbor_next;
      self.arena[index].neighbor_next = split;
    }

    Some(Allocation {
      offset,
      metadata: index,
    })
  }

  /// Return an allocation.
  ///
  /// `allocation` must come from this allocator's current generation and must
  /// not have been freed already. Violations panic in debug builds and with
  /// the `checked-free` feature; otherwise they corrupt the allocator. The
  /// sentinel is ignored in release builds.
  #[inline]
  pub fn free(&mut self, allocation: Allocation<I>) {
    self.free_node(allocation.metadata);
  }

  /// [`free`](Self::free) by node handle.
  pub fn free_node(&mut self, node: I) {
    if cfg!(any(debug_assertions, feature = "checked-free"))
      && let Err(err) = self.check_free(node)
    {
      panic!("offset allocator free contract violated: {err}");
    }

    if node.is_none() || self.arena.capacity() == 0 {
      return;
    }
    self.free_span(node);
  }

  /// [`free`](Self::free) with the contract checked up front.
  ///
  /// Catches frees of the sentinel, of foreign handles, and of handles whose
  /// node is already free. A stale handle whose node was reused by a later
  /// allocation is indistinguishable from that allocation.
  pub fn try_free(&mut self, allocation: Allocation<I>) -> Result<(), AllocError> {
    let node = allocation.metadata;
    if let Err(err) = self.check_free(node) {
      warn_log!(node = node.to_u32(), %err, "free rejected");
      return Err(err);
    }
    self.free_span(node);
    Ok(())
  }

  fn check_free(&self, node: I) -> Result<(), AllocError> {
    if self.arena.capacity() == 0 {
      return Err(AllocError::Uninitialized);
    }
    if !self.arena.contains(node) {
      return Err(AllocError::InvalidHandle {
        node: node.to_u32(),
      });
    }
    if !self.arena[node].used {
      return Err(AllocError::NotInUse {
        node: node.to_u32(),
      });
    }
    Ok(())
  }

  /// Coalesce a used node with its free neighbors and queue the result.
  fn free_span(&mut self, index: I) {
    let node = self.arena[index];
    let mut offset = node.offset;
    let mut size = node.size;
    let mut neighbor_prev = node.neighbor_prev;
    let mut neighbor_next = node.neighbor_next;

    if !neighbor_prev.is_none() && !self.arena[neighbor_prev].used {
      let prev = self.arena[neighbor_prev];
      debug_assert_eq!(prev.neighbor_next, index);
      debug_assert_eq!(prev.offset + prev.size, offset);
      offset = prev.offset;
      size += prev.size;
      self.remove_from_bin(neighbor_prev);
      self.arena.release(neighbor_prev);
      neighbor_prev = prev.neighbor_prev;
    }

    if !neighbor_next.is_none() && !self.arena[neighbor_next].used {
      let next = self.arena[neighbor_next];
      debug_assert_eq!(next.neighbor_prev, index);
      debug_assert_eq!(node.offset + node.size, next.offset);
      size += next.size;
      self.remove_from_bin(neighbor_next);
      self.arena.release(neighbor_next);
      neighbor_next = next.neighbor_next;
    }

    self.arena.release(index);

    // Pops `index` straight back off the stack.
    let combined = self.insert_into_bin(size, offset);

    if !neighbor_next.is_none() {
      self.arena[combined].neighbor_next = neighbor_next;
      self.arena[neighbor_next].neighbor_prev = combined;
    }
    if !neighbor_prev.is_none() {
      self.arena[combined].neighbor_prev = neighbor_prev;
      self.arena[neighbor_prev].neighbor_next = combined;
    }
  }
}

// =============================================================================
// Bin lists
// =============================================================================

impl<I: NodeIndex> OffsetAllocator<I> {
  /// Take a node off the stack and push it as the head of its class (rounded
  /// down, so every node in a class is at least the class size).
  fn insert_into_bin(&mut self, size: u32, offset: u32) -> I {
    let class = quantize_round_down(size);
    let head = self.bins.head(class);

    let index = self.arena.acquire();
    debug_assert!(!index.is_none(), "node arena exhausted inserting span {offset}+{size}");

    self.arena[index] = Node::free(offset, size, head);
    if !head.is_none() {
      self.arena[head].bin_prev = index;
    }
    self.bins.set_head(class, index);

    self.free_storage += size;
    trace_log!(node = index.to_u32(), class, free_storage = self.free_storage, delta = size, "span queued");

    index
  }

  /// Unlink a free node from its class. The node identity stays with the
  /// caller.
  fn remove_from_bin(&mut self, index: I) {
    let node = self.arena[index];
    debug_assert!(!node.used);

    if !node.bin_prev.is_none() {
      self.arena[node.bin_prev].bin_next = node.bin_next;
      if !node.bin_next.is_none() {
        self.arena[node.bin_next].bin_prev = node.bin_prev;
      }
    } else {
      // List head: the class is recomputed from the exact size.
      let class = quantize_round_down(node.size);
      debug_assert_eq!(self.bins.head(class), index);
      self.bins.set_head(class, node.bin_next);
      if !node.bin_next.is_none() {
        self.arena[node.bin_next].bin_prev = I::NONE;
      }
    }

    self.free_storage -= node.size;
    trace_log!(node = index.to_u32(), free_storage = self.free_storage, delta = node.size, "span unqueued");
  }
}

// =============================================================================
// Reporting
// =============================================================================

impl<I: NodeIndex> OffsetAllocator<I> {
  /// Exact size granted to `allocation`; 0 for the sentinel, for handles
  /// outside the arena, and before `reset`.
  pub fn allocation_size(&self, allocation: Allocation<I>) -> u32 {
    if !self.arena.contains(allocation.metadata) {
      return 0;
    }
    self.arena[allocation.metadata].size
  }

  /// Total free space and the (rounded down) largest free span.
  ///
  /// Node exhaustion does not show here; see [`free_node_count`](Self::free_node_count).
  pub fn storage_report(&self) -> StorageReport {
    let largest_free_region = self.bins.highest_non_empty().map_or(0, class_to_size);
    debug_assert!(self.free_storage >= largest_free_region);

    StorageReport {
      total_free_space: self.free_storage,
      largest_free_region,
    }
  }

  /// Free node count per size class. Walks every bin list; diagnostics only.
  pub fn storage_report_full(&self) -> StorageReportFull {
    let mut report = StorageReportFull::default();
    for (class, region) in report.free_regions.iter_mut().enumerate() {
      let mut count = 0;
      let mut node = self.bins.head(class as u32);
      while !node.is_none() {
        count += 1;
        node = self.arena[node].bin_next;
      }
      *region = Region {
        size: class_to_size(class as u32),
        count,
      };
    }
    report
  }

  /// Size of the managed range.
  #[inline]
  pub fn size(&self) -> u32 {
    self.size
  }

  #[inline]
  pub fn max_allocs(&self) -> u32 {
    self.max_allocs
  }

  /// Exact free space, regardless of node exhaustion.
  #[inline]
  pub fn free_storage(&self) -> u32 {
    self.free_storage
  }

  /// Node identities left for new spans.
  #[inline]
  pub fn free_node_count(&self) -> usize {
    self.arena.available()
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    self.arena.capacity() != 0
  }
}

impl<I: NodeIndex> fmt::Debug for OffsetAllocator<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OffsetAllocator")
      .field("size", &self.size)
      .field("max_allocs", &self.max_allocs)
      .field("free_storage", &self.free_storage)
      .field("free_nodes", &self.arena.available())
      .finish_non_exhaustive()
  }
}

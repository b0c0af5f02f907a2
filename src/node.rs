//! Node records and the fixed-capacity arena that owns them.
//!
//! Nodes never point at each other; every link is a [`NodeIndex`] into the
//! arena. Unused slots sit on a LIFO stack of indices, so acquiring and
//! releasing a node identity is a single pop or push.

use core::ops::{Index, IndexMut};

use crate::index::NodeIndex;
use crate::tracing_helpers::trace_log;

/// One contiguous span of the managed range, free or in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Node<I> {
  /// Exact span bounds. Never quantized.
  pub offset: u32,
  pub size: u32,
  /// Siblings in the free list of the node's size class (free nodes only).
  pub bin_prev: I,
  pub bin_next: I,
  /// Spatially adjacent spans, kept for free and used nodes alike.
  pub neighbor_prev: I,
  pub neighbor_next: I,
  pub used: bool,
}

impl<I: NodeIndex> Node<I> {
  pub const EMPTY: Self = Self {
    offset: 0,
    size: 0,
    bin_prev: I::NONE,
    bin_next: I::NONE,
    neighbor_prev: I::NONE,
    neighbor_next: I::NONE,
    used: false,
  };

  /// A free node about to become the head of its bin list.
  #[inline]
  pub fn free(offset: u32, size: u32, bin_next: I) -> Self {
    Self {
      offset,
      size,
      bin_next,
      ..Self::EMPTY
    }
  }
}

/// Node table plus the stack of slots not currently describing a span.
pub(crate) struct NodeArena<I> {
  nodes: Box<[Node<I>]>,
  /// Free-index stack. Capacity is fixed at `nodes.len()` and never grows.
  free: Vec<I>,
}

impl<I: NodeIndex> NodeArena<I> {
  /// An arena with no slots, as held by an allocator before `reset`.
  pub fn empty() -> Self {
    Self {
      nodes: Box::default(),
      free: Vec::new(),
    }
  }

  /// Fresh arena of `max_allocs + 1` slots, all free.
  pub fn with_max_allocs(max_allocs: u32) -> Self {
    let slots = max_allocs as usize + 1;
    let nodes = vec![Node::<I>::EMPTY; slots].into_boxed_slice();

    // Inverse order so that slot 0 pops first.
    let mut free = Vec::with_capacity(slots);
    free.extend((0..=max_allocs).rev().map(I::from_u32));

    Self { nodes, free }
  }

  /// Pop a free slot, or `NONE` when every slot is live.
  #[inline]
  pub fn acquire(&mut self) -> I {
    match self.free.pop() {
      Some(index) => {
        trace_log!(node = index.to_u32(), remaining = self.free.len(), "node acquired");
        index
      }
      None => I::NONE,
    }
  }

  /// Push a slot back. Its record is left as is until the next `acquire`.
  #[inline]
  pub fn release(&mut self, index: I) {
    debug_assert!(index.to_usize() < self.nodes.len(), "release of foreign node {index:?}");
    debug_assert!(
      self.free.len() < self.nodes.len(),
      "free-index stack overflow releasing {index:?}"
    );
    self.free.push(index);
    trace_log!(node = index.to_u32(), remaining = self.free.len(), "node released");
  }

  /// Slots ready to be acquired.
  #[inline]
  pub fn available(&self) -> usize {
    self.free.len()
  }

  #[inline]
  pub fn is_exhausted(&self) -> bool {
    self.free.is_empty()
  }

  /// Total number of slots (`max_allocs + 1`, or 0 before `reset`).
  #[inline]
  pub fn capacity(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub fn contains(&self, index: I) -> bool {
    !index.is_none() && index.to_usize() < self.nodes.len()
  }
}

impl<I: NodeIndex> Index<I> for NodeArena<I> {
  type Output = Node<I>;

  #[inline(always)]
  fn index(&self, index: I) -> &Node<I> {
    &self.nodes[index.to_usize()]
  }
}

impl<I: NodeIndex> IndexMut<I> for NodeArena<I> {
  #[inline(always)]
  fn index_mut(&mut self, index: I) -> &mut Node<I> {
    &mut self.nodes[index.to_usize()]
  }
}

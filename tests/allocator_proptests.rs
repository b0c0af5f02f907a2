//! Property-based tests for `OffsetAllocator` through its public API.
//!
//! Every sequence of allocations and frees must keep the managed range exactly
//! tiled by live allocations and free space, hand out exact sizes, and
//! coalesce back to a single span once everything is returned.

use offalloc::size_class::{class_to_size, quantize_round_down};
use offalloc::{Allocation, NodeIndex, OffsetAllocator, StorageReport};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

// ============================================================================
//  Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
  Allocate(u32),
  /// Free the live allocation at this position (modulo the live count).
  Free(usize),
}

fn op(max_size: u32) -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => (1..=max_size).prop_map(Op::Allocate),
    2 => any::<usize>().prop_map(Op::Free),
  ]
}

fn op_sequence(max_size: u32, max_len: usize) -> impl Strategy<Value = Vec<Op>> {
  prop::collection::vec(op(max_size), 0..=max_len)
}

// ============================================================================
//  Model checks
// ============================================================================

/// Live allocations must be disjoint, inside the range, and together with the
/// free space account for every unit of it.
fn check_tiling<I: NodeIndex>(
  allocator: &OffsetAllocator<I>,
  live: &[(Allocation<I>, u32)],
) -> Result<(), TestCaseError> {
  let mut spans: Vec<(u64, u64)> = live
    .iter()
    .map(|(allocation, size)| (allocation.offset as u64, allocation.offset as u64 + *size as u64))
    .collect();
  spans.sort_unstable();
  for pair in spans.windows(2) {
    prop_assert!(pair[0].1 <= pair[1].0, "overlap between {:?} and {:?}", pair[0], pair[1]);
  }
  if let Some(last) = spans.last() {
    prop_assert!(last.1 <= allocator.size() as u64);
  }

  let used: u64 = live.iter().map(|(_, size)| *size as u64).sum();
  prop_assert_eq!(used + allocator.free_storage() as u64, allocator.size() as u64);

  let report = allocator.storage_report();
  prop_assert!(report.largest_free_region <= report.total_free_space);
  Ok(())
}

fn run_sequence<I: NodeIndex>(
  max_allocs: u32,
  region: u32,
  ops: &[Op],
) -> Result<(), TestCaseError> {
  let mut allocator = OffsetAllocator::<I>::new(max_allocs).unwrap();
  allocator.reset(region);
  let mut live: Vec<(Allocation<I>, u32)> = Vec::new();

  for op in ops {
    match *op {
      Op::Allocate(size) => {
        if let Some(allocation) = allocator.allocate(size) {
          prop_assert!(!allocation.is_none());
          prop_assert_eq!(allocator.allocation_size(allocation), size);
          live.push((allocation, size));
        }
      }
      Op::Free(pick) => {
        if !live.is_empty() {
          let (allocation, _) = live.swap_remove(pick % live.len());
          allocator.free(allocation);
        }
      }
    }
    check_tiling(&allocator, &live)?;
  }

  for (allocation, _) in live.drain(..) {
    allocator.free(allocation);
  }
  prop_assert_eq!(
    allocator.storage_report(),
    StorageReport {
      total_free_space: region,
      largest_free_region: class_to_size(quantize_round_down(region)),
    }
  );
  prop_assert_eq!(allocator.storage_report_full().free_node_count(), 1);
  Ok(())
}

// ============================================================================
//  Properties
// ============================================================================

proptest! {
  /// Tiling, exactness, and full coalescing with 32-bit handles.
  #[test]
  fn sequence_keeps_tiling_u32(
    region in 1u32..=1 << 20,
    ops in op_sequence(1 << 14, 200),
  ) {
    run_sequence::<u32>(1024, region, &ops)?;
  }

  /// Same with 16-bit handles and a tight node budget, so exhaustion is hit.
  #[test]
  fn sequence_keeps_tiling_u16(
    max_allocs in 1u32..=16,
    region in 1u32..=1 << 16,
    ops in op_sequence(4096, 200),
  ) {
    run_sequence::<u16>(max_allocs, region, &ops)?;
  }

  /// Allocating `a` then `b` and freeing both, in either order, leaves one
  /// free span covering the whole range.
  #[test]
  fn two_allocations_coalesce(
    a in 1u32..=1 << 18,
    b in 1u32..=1 << 18,
    reverse in any::<bool>(),
  ) {
    let region = 1u32 << 20;
    let mut allocator = OffsetAllocator::<u32>::new(8).unwrap();
    allocator.reset(region);

    let first = allocator.allocate(a).unwrap();
    let second = allocator.allocate(b).unwrap();
    prop_assert_eq!(first.offset, 0);
    prop_assert_eq!(second.offset, a);

    if reverse {
      allocator.free(second);
      allocator.free(first);
    } else {
      allocator.free(first);
      allocator.free(second);
    }

    let report = allocator.storage_report_full();
    prop_assert_eq!(report.free_node_count(), 1);
    prop_assert_eq!(allocator.storage_report().total_free_space, region);
    prop_assert_eq!(allocator.allocate(region).map(|whole| whole.offset), Some(0));
  }

  /// With `k` node slots, the `k + 1`-th outstanding allocation fails even
  /// though space remains.
  #[test]
  fn node_exhaustion_precedes_space_exhaustion(
    k in 1u32..=64,
    sizes in prop::collection::vec(1u32..=64, 65),
  ) {
    let mut allocator = OffsetAllocator::<u16>::new(k).unwrap();
    allocator.reset(1 << 16);

    for &size in &sizes[..k as usize] {
      prop_assert!(allocator.allocate(size).is_some());
    }
    prop_assert!(allocator.free_storage() > 0);
    prop_assert!(allocator.allocate(sizes[k as usize]).is_none());
  }

  /// `allocate` followed by `free` restores the reset state report.
  #[test]
  fn allocate_free_round_trip(region in 1u32.., fraction in 1u32..=100) {
    let size = ((region as u64 * fraction as u64) / 100).max(1) as u32;
    let mut allocator = OffsetAllocator::<u32>::new(4).unwrap();
    allocator.reset(region);

    if let Some(allocation) = allocator.allocate(size) {
      prop_assert_eq!(allocator.allocation_size(allocation), size);
      allocator.free(allocation);
    }
    prop_assert_eq!(
      allocator.storage_report(),
      StorageReport {
        total_free_space: region,
        largest_free_region: class_to_size(quantize_round_down(region)),
      }
    );
  }
}

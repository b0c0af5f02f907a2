//! Property-based tests for the size-class quantizers over the full `u32` range.

use offalloc::size_class::{
  MANTISSA_VALUE, NUM_LEAF_BINS, class_to_size, quantize_round_down, quantize_round_up,
};
use proptest::prelude::*;

proptest! {
  /// Round up never undershoots, round down never overshoots.
  #[test]
  fn quantization_bounds(size in any::<u32>()) {
    prop_assert!(class_to_size(quantize_round_up(size)) >= size);
    prop_assert!(class_to_size(quantize_round_down(size)) <= size);
  }

  /// Both quantizers are monotonic non-decreasing.
  #[test]
  fn quantization_monotonic(a in any::<u32>(), b in any::<u32>()) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    prop_assert!(quantize_round_up(lo) <= quantize_round_up(hi));
    prop_assert!(quantize_round_down(lo) <= quantize_round_down(hi));
  }

  /// Classes stay inside the bin table and the two roundings differ by at
  /// most one class.
  #[test]
  fn classes_in_range(size in any::<u32>()) {
    let up = quantize_round_up(size);
    let down = quantize_round_down(size);
    prop_assert!((up as usize) < NUM_LEAF_BINS);
    prop_assert!(down <= up && up - down <= 1);
    prop_assert_eq!(up == down, class_to_size(down) == size);
  }

  /// Round up wastes less than one mantissa step of the size.
  #[test]
  fn round_up_overhead_bounded(size in MANTISSA_VALUE..u32::MAX / 2) {
    let waste = (class_to_size(quantize_round_up(size)) - size) as u64;
    prop_assert!(waste * MANTISSA_VALUE as u64 <= size as u64);
  }
}

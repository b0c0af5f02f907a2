//! Size classes as tiny floating-point numbers.
//!
//! A class index packs an exponent and a `MANTISSA_BITS`-wide mantissa, with
//! the leading one bit implied like in an IEEE float. Values below
//! `MANTISSA_VALUE` are denormals and map to themselves. Every doubling is
//! split into `MANTISSA_VALUE` linear steps, so the rounding error of a class
//! stays below `1 / MANTISSA_VALUE` of the size at any magnitude.

/// Width of the stored mantissa.
pub const MANTISSA_BITS: u32 = 3;
/// First normalized value; also the number of classes per doubling.
pub const MANTISSA_VALUE: u32 = 1 << MANTISSA_BITS;
pub const MANTISSA_MASK: u32 = MANTISSA_VALUE - 1;

/// Number of top-level groups tracked by the bin bitmap.
pub const NUM_TOP_BINS: usize = 32;
/// Classes per top-level group (one bit each in a leaf byte).
pub const BINS_PER_LEAF: usize = 8;
pub const TOP_BINS_INDEX_SHIFT: u32 = 3;
pub const LEAF_BINS_INDEX_MASK: u32 = 0x7;
/// Total number of size classes.
pub const NUM_LEAF_BINS: usize = NUM_TOP_BINS * BINS_PER_LEAF;

const _: () = assert!(BINS_PER_LEAF == 1 << TOP_BINS_INDEX_SHIFT);
const _: () = assert!(LEAF_BINS_INDEX_MASK as usize == BINS_PER_LEAF - 1);
// The largest round-up class must still have a bin.
const _: () = assert!((quantize_round_up(u32::MAX) as usize) < NUM_LEAF_BINS);
const _: () = assert!(class_to_size(MANTISSA_VALUE) == MANTISSA_VALUE);

/// Split a normalized size into `(exponent, mantissa, low_bits_mask)`.
#[inline(always)]
const fn split_normalized(size: u32) -> (u32, u32, u32) {
  let highest_set_bit = 31 - size.leading_zeros();
  let mantissa_start_bit = highest_set_bit - MANTISSA_BITS;
  let exponent = mantissa_start_bit + 1;
  let mantissa = (size >> mantissa_start_bit) & MANTISSA_MASK;
  let low_bits_mask = (1 << mantissa_start_bit) - 1;
  (exponent, mantissa, low_bits_mask)
}

/// Smallest class whose representative size is `>= size`.
#[inline(always)]
pub const fn quantize_round_up(size: u32) -> u32 {
  if size < MANTISSA_VALUE {
    return size;
  }

  let (exponent, mut mantissa, low_bits_mask) = split_normalized(size);
  if size & low_bits_mask != 0 {
    mantissa += 1;
  }

  // `+` instead of `|`: a mantissa of MANTISSA_VALUE carries into the exponent.
  (exponent << MANTISSA_BITS) + mantissa
}

/// Largest class whose representative size is `<= size`.
#[inline(always)]
pub const fn quantize_round_down(size: u32) -> u32 {
  if size < MANTISSA_VALUE {
    return size;
  }

  let (exponent, mantissa, _) = split_normalized(size);
  (exponent << MANTISSA_BITS) | mantissa
}

/// Representative size of a class (inverse of both quantizers on exact sizes).
///
/// Classes above the round-up class of `u32::MAX` saturate at `u32::MAX`.
#[inline(always)]
pub const fn class_to_size(class: u32) -> u32 {
  let exponent = class >> MANTISSA_BITS;
  let mantissa = class & MANTISSA_MASK;
  if exponent == 0 {
    return mantissa;
  }

  let size = ((mantissa | MANTISSA_VALUE) as u64) << (exponent - 1);
  if size > u32::MAX as u64 {
    u32::MAX
  } else {
    size as u32
  }
}

/// Split a class into its top-level group and the bit within the group.
#[inline(always)]
pub const fn split_class(class: u32) -> (u32, u32) {
  (class >> TOP_BINS_INDEX_SHIFT, class & LEAF_BINS_INDEX_MASK)
}

//! Free-space summaries.

use crate::size_class::NUM_LEAF_BINS;

/// Cheap summary of the free space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageReport {
  /// Exact sum of all free spans.
  pub total_free_space: u32,
  /// Class size of the largest free span, rounded down. Never exceeds
  /// `total_free_space`.
  pub largest_free_region: u32,
}

/// Free nodes queued in one size class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
  /// Representative size of the class.
  pub size: u32,
  pub count: u32,
}

/// Histogram of free nodes over all size classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReportFull {
  pub free_regions: [Region; NUM_LEAF_BINS],
}

impl Default for StorageReportFull {
  fn default() -> Self {
    Self {
      free_regions: [Region::default(); NUM_LEAF_BINS],
    }
  }
}

impl StorageReportFull {
  /// `(class, region)` pairs with at least one free node.
  pub fn non_empty(&self) -> impl Iterator<Item = (usize, &Region)> + '_ {
    self
      .free_regions
      .iter()
      .enumerate()
      .filter(|(_, region)| region.count > 0)
  }

  /// Number of free nodes across all classes.
  pub fn free_node_count(&self) -> u32 {
    self.free_regions.iter().map(|region| region.count).sum()
  }
}

// serde only derives arrays up to 32 elements. Encoded as a plain sequence
// of one region per class.
#[cfg(feature = "serde")]
impl serde::Serialize for StorageReportFull {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.free_regions.iter())
  }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StorageReportFull {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let regions = Vec::<Region>::deserialize(deserializer)?;
    let len = regions.len();
    let free_regions = <[Region; NUM_LEAF_BINS]>::try_from(regions).map_err(|_| {
      serde::de::Error::invalid_length(len, &"one region per size class (256)")
    })?;
    Ok(Self { free_regions })
  }
}

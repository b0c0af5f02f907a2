use thiserror::Error;

/// Failures reported by the checked entry points.
///
/// Running out of nodes or space is not an error: `allocate` returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("max_allocs {requested} exceeds the {max} supported by this node index width")]
  CapacityTooLarge { requested: u32, max: u32 },
  #[error("allocator used before reset")]
  Uninitialized,
  #[error("node {node} is not a handle of this allocator")]
  InvalidHandle { node: u32 },
  /// Covers double frees and in-range slots that were never handed out.
  #[error("node {node} is not in use")]
  NotInUse { node: u32 },
}

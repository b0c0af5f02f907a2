//! Logging macros that vanish without the `tracing` feature.
//!
//! ```bash
//! # No logging code at all
//! cargo build --release
//!
//! # Node recycling and free-storage deltas as trace events
//! cargo test --features tracing
//! ```
//!
//! The allocator sits on hot paths of resource managers, so nothing here may
//! cost a branch when the feature is off.

#![allow(unused_macros, unused_imports)]

/// Per-node events (acquire, release, free-storage deltas).
#[cfg(feature = "tracing")]
macro_rules! trace_log {
  ($($arg:tt)*) => {
    tracing::trace!($($arg)*)
  };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
  ($($arg:tt)*) => {};
}

/// Per-operation events (reset, exhaustion).
#[cfg(feature = "tracing")]
macro_rules! debug_log {
  ($($arg:tt)*) => {
    tracing::debug!($($arg)*)
  };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
  ($($arg:tt)*) => {};
}

/// Contract violations caught by checked operations.
#[cfg(feature = "tracing")]
macro_rules! warn_log {
  ($($arg:tt)*) => {
    tracing::warn!($($arg)*)
  };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_log {
  ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
pub(crate) use warn_log;

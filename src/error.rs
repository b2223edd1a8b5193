//! Typed error taxonomy for callers that want a reason rather than a bare
//! `None`/no-op. The core's primary operations (`allocate`, `deallocate`,
//! `reallocate`) never return `Result` themselves — failures are surfaced
//! as an empty return value or a diagnostic (tracing) event, never a
//! panic or process exit — but [`crate::Heap::validate_busy_pointer`]
//! backs the `check`-feature rejection path with a typed reason, used by
//! `deallocate`'s own audit and by the shell's `f` command.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
  /// No free block large enough for the request. Non-fatal; the caller
  /// decides how to proceed.
  #[error("no free block large enough for the request")]
  OutOfSpace,

  /// A deallocation target did not correspond to a currently-busy block
  /// payload. Returned by [`crate::Heap::validate_busy_pointer`]; the
  /// crate's own `deallocate` audit and the shell's `f` command only
  /// consult it when the `check` feature is enabled.
  #[error("address at offset {offset} does not correspond to a busy block payload")]
  InvalidAddress { offset: usize },
}

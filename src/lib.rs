//! # fitheap — a single-region heap allocator
//!
//! Manages one fixed, statically-sized contiguous byte region and
//! services variable-size allocation, deallocation and in-place-preferred
//! reallocation against an address-ordered free list, selecting a free
//! block per request via one of three placement policies
//! ([`Policy::FirstFit`], [`Policy::BestFit`], [`Policy::WorstFit`]).
//! Deallocation coalesces eagerly with adjacent free neighbors.
//!
//! ## Crate structure
//!
//! ```text
//!   fitheap
//!   ├── align    - alignment macro
//!   ├── header   - the two block-header shapes (busy / free)
//!   ├── region   - the fixed backing byte buffer
//!   ├── policy   - first/best/worst-fit selection
//!   ├── freelist - address-ordered free-list plumbing
//!   ├── heap     - Heap<SIZE>: allocate/deallocate/reallocate/observers
//!   ├── error    - typed error taxonomy
//!   └── global   - GlobalAlloc override layer
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use fitheap::Heap;
//!
//! let heap = Heap::<{ 4 * 1024 }>::new();
//! let ptr = heap.allocate(64).expect("fits");
//! unsafe { ptr.as_ptr().write(0x42) };
//! heap.deallocate(ptr.as_ptr());
//! ```
//!
//! ## Thread safety
//!
//! None. Single-threaded, synchronous, no internal locking — see
//! [`Heap`]'s docs. Callers in multi-threaded contexts must serialize
//! externally.
//!
//! ## Diagnostics
//!
//! Enable the `info` feature for `tracing::debug!` events on every
//! allocate/deallocate/reallocate, and `check` to run the busy-block
//! validation audit before every deallocate. Both are off by default so
//! the hot path pays nothing for them.

pub mod align;
mod error;
mod freelist;
mod global;
mod header;
mod heap;
mod policy;
mod region;

pub use error::CoreError;
pub use global::GlobalHeap;
pub use header::{BUSY_HEADER_SIZE, BusyHeader, FREE_HEADER_SIZE, FreeHeader};
pub use heap::Heap;
pub use policy::Policy;

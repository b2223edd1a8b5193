//! Process-wide override layer: an `unsafe impl GlobalAlloc` over a
//! lazily self-initializing [`Heap`], so a consumer can replace the
//! standard allocation primitives with
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOCATOR: fitheap::GlobalHeap<{ 64 * 1024 }> = fitheap::GlobalHeap::new();
//! ```
//!
//! `Heap::allocate` already self-initializes on first call (mirroring the
//! original C implementation's `malloc()` lazy `init_flag` check), so
//! there is no ordering requirement on when `#[global_allocator]` first
//! gets used relative to an explicit `init()`.

use std::alloc::{GlobalAlloc, Layout};
use std::mem;
use std::ptr;

use crate::align;
use crate::heap::Heap;
use crate::policy::Policy;

/// `GlobalAlloc` adapter over a `Heap<SIZE>`. The placement policy is
/// chosen at compile time by the `first_fit`/`best_fit`/`worst_fit`
/// Cargo features (default `first_fit`, matching [`Policy::default`]).
pub struct GlobalHeap<const SIZE: usize> {
  inner: Heap<SIZE>,
}

impl<const SIZE: usize> GlobalHeap<SIZE> {
  pub const fn new() -> Self {
    let policy = if cfg!(feature = "best_fit") {
      Policy::BestFit
    } else if cfg!(feature = "worst_fit") {
      Policy::WorstFit
    } else {
      Policy::FirstFit
    };
    Self { inner: Heap::with_policy(policy) }
  }

  /// The wrapped heap, for observers (`fragmentation`, `leak_check`,
  /// the block dumps) that don't belong on the `GlobalAlloc` trait.
  pub fn heap(&self) -> &Heap<SIZE> {
    &self.inner
  }
}

impl<const SIZE: usize> Default for GlobalHeap<SIZE> {
  fn default() -> Self {
    Self::new()
  }
}

// Safety: this crate is deliberately not thread-safe (spec non-goal).
// Installing `GlobalHeap` as `#[global_allocator]` in a multi-threaded
// program is unsound unless the caller serializes all access externally
// — the same requirement `Heap`'s own docs state.
unsafe impl<const SIZE: usize> Sync for GlobalHeap<SIZE> {}

unsafe impl<const SIZE: usize> GlobalAlloc for GlobalHeap<SIZE> {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    debug_assert!(
      layout.align() <= mem::align_of::<usize>(),
      "fitheap only supports natural usize alignment, not {}",
      layout.align()
    );
    match self.inner.allocate(align!(layout.size())) {
      Some(p) => p.as_ptr(),
      None => ptr::null_mut(),
    }
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    self.inner.deallocate(ptr);
  }

  unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
    match self.inner.reallocate(ptr, align!(new_size)) {
      Some(p) => p.as_ptr(),
      None => ptr::null_mut(),
    }
  }
}

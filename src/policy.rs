//! Placement policies: first-fit, best-fit, worst-fit.
//!
//! Ported from `get_block_first_fit`/`get_block_best_worst_fit` in the
//! original C implementation, with the compile-time function pointer
//! replaced by an enum resolved once when a `Heap` is constructed and
//! matched inside a single `find` method — not a boxed trait object,
//! since the allocator cannot itself allocate a dispatch table.

use std::ptr;

use crate::header::{BUSY_HEADER_SIZE, FreeHeader};

/// Selects which free block satisfies a request. Default is [`Policy::FirstFit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
  /// The first eligible free block in address order.
  FirstFit,
  /// The eligible block minimizing leftover waste, ties to lowest address.
  BestFit,
  /// The eligible block maximizing leftover waste, ties to lowest address.
  WorstFit,
}

impl Default for Policy {
  fn default() -> Self {
    Policy::FirstFit
  }
}

impl Policy {
  /// Returns `(prev, block)`: the free-list predecessor of the chosen
  /// block (null if the block is the head) and the chosen block itself.
  /// Both are null when no eligible block exists.
  ///
  /// # Safety
  ///
  /// `head` must be null or point at a valid free header, and the free
  /// list reachable from it must be well-formed (address-ordered,
  /// null-terminated).
  pub(crate) unsafe fn find(
    &self,
    head: *mut FreeHeader,
    size: usize,
  ) -> (*mut FreeHeader, *mut FreeHeader) {
    unsafe {
      match self {
        Policy::FirstFit => find_first_fit(head, size),
        Policy::BestFit => find_extremal_fit(head, size, true),
        Policy::WorstFit => find_extremal_fit(head, size, false),
      }
    }
  }
}

/// `block.size - size - H_b`; negative means the block cannot host the
/// busy header plus the requested payload.
#[inline]
unsafe fn waste(block: *mut FreeHeader, size: usize) -> isize {
  unsafe { (*block).size as isize - size as isize - BUSY_HEADER_SIZE as isize }
}

unsafe fn find_first_fit(
  head: *mut FreeHeader,
  size: usize,
) -> (*mut FreeHeader, *mut FreeHeader) {
  unsafe {
    let mut prev: *mut FreeHeader = ptr::null_mut();
    let mut p = head;
    while !p.is_null() {
      if waste(p, size) >= 0 {
        return (prev, p);
      }
      prev = p;
      p = (*p).next;
    }
    (ptr::null_mut(), ptr::null_mut())
  }
}

unsafe fn find_extremal_fit(
  head: *mut FreeHeader,
  size: usize,
  best: bool,
) -> (*mut FreeHeader, *mut FreeHeader) {
  unsafe {
    let mut chosen_waste: isize = if best { isize::MAX } else { -1 };
    let mut chosen_prev: *mut FreeHeader = ptr::null_mut();
    let mut chosen: *mut FreeHeader = ptr::null_mut();

    let mut prev: *mut FreeHeader = ptr::null_mut();
    let mut p = head;
    while !p.is_null() {
      let diff = waste(p, size);
      if diff >= 0 {
        let better = if best { diff < chosen_waste } else { diff > chosen_waste };
        if better {
          chosen_waste = diff;
          chosen_prev = prev;
          chosen = p;
        }
      }
      prev = p;
      p = (*p).next;
    }
    (chosen_prev, chosen)
  }
}

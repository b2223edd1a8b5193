//! The allocation/deallocation/reallocation path and the validation and
//! fragmentation observers, wired on top of [`crate::region::Region`],
//! [`crate::freelist`] and [`crate::policy::Policy`].
//!
//! Ported from `memory_init`/`memory_alloc`/`memory_free`/
//! `calculate_fragmentation`/`is_memory_leak_exist`/`is_valid_busy_block`/
//! `print_busy_blocks` in the original C implementation.

use std::cell::Cell;
use std::mem;
use std::ptr;
use std::ptr::NonNull;

use crate::align;
use crate::error::CoreError;
use crate::freelist::{self, FreeListIter};
use crate::header::{BUSY_HEADER_SIZE, BusyHeader, FREE_HEADER_SIZE, FreeHeader};
use crate::policy::Policy;
use crate::region::Region;

/// The minimum payload size any busy block must be able to host, so that
/// a later deallocation always has room for a free header.
const MIN_PAYLOAD: usize = FREE_HEADER_SIZE - BUSY_HEADER_SIZE;

/// A single-region heap of `SIZE` bytes, serviced by `policy`.
///
/// # Safety / movement
///
/// Free-list and busy-block pointers are raw addresses into the embedded
/// region. A `Heap` must not be moved after [`Heap::init`] runs (directly
/// or via the first `allocate`) — same requirement as any self-referential
/// structure. In practice this means constructing it as a `'static` or
/// otherwise pinned value, which is how [`crate::GlobalHeap`] uses it.
pub struct Heap<const SIZE: usize> {
  region: Region<SIZE>,
  first_free: Cell<*mut FreeHeader>,
  initialized: Cell<bool>,
  policy: Policy,
}

impl<const SIZE: usize> Heap<SIZE> {
  /// Constructs a heap using the default placement policy ([`Policy::FirstFit`]).
  /// Does not touch the region; the first `allocate`/explicit `init` call
  /// establishes the initial free block.
  pub const fn new() -> Self {
    Self::with_policy(Policy::FirstFit)
  }

  /// Constructs a heap using an explicit placement policy.
  pub const fn with_policy(policy: Policy) -> Self {
    Self {
      region: Region::new(),
      first_free: Cell::new(ptr::null_mut()),
      initialized: Cell::new(false),
      policy,
    }
  }

  /// `B`: the stable base address of the region.
  #[inline]
  pub fn heap_base(&self) -> *mut u8 {
    self.region.base()
  }

  /// Establishes the single free block spanning the whole region.
  /// Idempotent is not required of callers — `allocate` self-initializes
  /// on first use — but calling this explicitly resets the heap to its
  /// initial state regardless of prior allocations.
  pub fn init(&self) {
    let base = self.heap_base();
    unsafe {
      let head = FreeHeader::at(base);
      (*head).size = self.region.len();
      (*head).next = ptr::null_mut();
    }
    self.first_free.set(base as *mut FreeHeader);
    self.initialized.set(true);
  }

  #[inline]
  fn ensure_init(&self) {
    if !self.initialized.get() {
      self.init();
    }
  }

  /// Rounds a requested payload size up to the minimum allocation floor,
  /// then up again to the machine word so every later split point
  /// (`block + BUSY_HEADER_SIZE + n`) stays `usize`-aligned. Without the
  /// second rounding, an odd-sized request shifts every block after it
  /// off the word boundary.
  #[inline]
  fn floor(size: usize) -> usize {
    align!(size.max(MIN_PAYLOAD))
  }

  /// Allocates `n` payload bytes. Returns `None` when no free block fits.
  pub fn allocate(&self, n: usize) -> Option<NonNull<u8>> {
    self.ensure_init();
    let n = Self::floor(n);

    let (prev, block) = unsafe { self.policy.find(self.first_free.get(), n) };
    if block.is_null() {
      return None;
    }

    unsafe {
      let next = (*block).next;
      let block_size = (*block).size;
      let rem = block_size - (n + BUSY_HEADER_SIZE);

      let (spliced, stamped_size) = if rem < FREE_HEADER_SIZE {
        // Absorb: the whole block becomes busy, residual bytes included.
        (next, block_size - BUSY_HEADER_SIZE)
      } else {
        // Split: carve a new free block out of the residual bytes.
        let node = FreeHeader::at((block as *mut u8).add(BUSY_HEADER_SIZE + n));
        (*node).size = rem;
        (*node).next = next;
        (node, n)
      };

      if prev.is_null() {
        self.first_free.set(spliced);
      } else {
        (*prev).next = spliced;
      }

      let busy = BusyHeader::at(block as *mut u8);
      (*busy).size = stamped_size;

      #[cfg(feature = "info")]
      tracing::debug!(
        offset = (block as usize) - (self.heap_base() as usize),
        size = stamped_size,
        "allocate",
      );

      NonNull::new((block as *mut u8).add(BUSY_HEADER_SIZE))
    }
  }

  /// Deallocates a block previously returned by `allocate`/`reallocate`.
  /// A null pointer is a silent no-op.
  pub fn deallocate(&self, p: *mut u8) {
    if p.is_null() {
      return;
    }

    #[cfg(feature = "check")]
    if let Err(err) = self.validate_busy_pointer(p) {
      tracing::warn!(%err, "rejected deallocate");
      return;
    }

    unsafe {
      let to_del = p.sub(BUSY_HEADER_SIZE);
      let busy = BusyHeader::at(to_del);
      let size = (*busy).size;
      let to_del_addr = to_del as usize;

      let first_free = self.first_free.get();

      #[cfg(feature = "info")]
      tracing::debug!(offset = to_del_addr - (self.heap_base() as usize), size, "deallocate");

      if first_free.is_null() || to_del_addr < (first_free as usize) {
        let prev_head = first_free;
        let new_head = FreeHeader::at(to_del);
        if !prev_head.is_null() && to_del_addr + size + BUSY_HEADER_SIZE == prev_head as usize {
          (*new_head).size = size + BUSY_HEADER_SIZE + (*prev_head).size;
          (*new_head).next = (*prev_head).next;
        } else {
          (*new_head).size = size + BUSY_HEADER_SIZE;
          (*new_head).next = prev_head;
        }
        self.first_free.set(new_head);
        return;
      }

      let prev = freelist::locate_predecessor(first_free, to_del_addr);
      let next = (*prev).next;

      let adj_prev = (prev as usize) + (*prev).size == to_del_addr;
      let adj_next = !next.is_null() && (next as usize) == to_del_addr + BUSY_HEADER_SIZE + size;

      if adj_prev && adj_next {
        (*prev).size += BUSY_HEADER_SIZE + size + (*next).size;
        (*prev).next = (*next).next;
      } else if adj_next {
        let curr = FreeHeader::at(to_del);
        (*curr).size = size + BUSY_HEADER_SIZE + (*next).size;
        (*curr).next = (*next).next;
        (*prev).next = curr;
      } else if adj_prev {
        (*prev).size += size + BUSY_HEADER_SIZE;
      } else {
        let curr = FreeHeader::at(to_del);
        (*curr).size = size + BUSY_HEADER_SIZE;
        (*curr).next = next;
        (*prev).next = curr;
      }
    }
  }

  /// Reallocates `p` to hold `new_size` payload bytes. A null `p` behaves
  /// as `allocate`. Shrinking (or same-size) in place always succeeds and
  /// returns `p` unchanged — no split is attempted on shrink. Growing
  /// allocates a fresh block, copies the old payload, frees the old
  /// block; on failure the original block is left untouched and `None`
  /// is returned.
  pub fn reallocate(&self, p: *mut u8, new_size: usize) -> Option<NonNull<u8>> {
    if p.is_null() {
      return self.allocate(new_size);
    }

    unsafe {
      let busy = BusyHeader::at(p.sub(BUSY_HEADER_SIZE));
      let old_size = (*busy).size;

      #[cfg(feature = "info")]
      tracing::debug!(
        offset = (p as usize) - (self.heap_base() as usize),
        old_size,
        new_size,
        "reallocate",
      );

      if new_size <= old_size {
        return NonNull::new(p);
      }

      let new_ptr = self.allocate(new_size)?;
      ptr::copy_nonoverlapping(p, new_ptr.as_ptr(), old_size);
      self.deallocate(p);
      Some(new_ptr)
    }
  }

  /// `1 - largest_free / total_free`, or `0` when there is no free space.
  pub fn fragmentation(&self) -> f64 {
    self.ensure_init();
    let mut total = 0usize;
    let mut max_size = 0usize;
    unsafe {
      for node in (FreeListIter(self.first_free.get())) {
        let sz = (*node).size;
        total += sz;
        if sz > max_size {
          max_size = sz;
        }
      }
    }
    let ratio = if total == 0 { 0.0 } else { 1.0 - (max_size as f64 / total as f64) };

    #[cfg(feature = "frag")]
    tracing::debug!(ratio, total_free = total, largest_free = max_size, "fragmentation");

    ratio
  }

  /// True iff the heap is not in its initial (fully-reclaimed) state: the
  /// head free block doesn't span the whole region, or isn't at the base.
  pub fn leak_check(&self) -> bool {
    self.ensure_init();
    let first = self.first_free.get();
    if first.is_null() {
      return true;
    }
    unsafe { (*first).size != self.region.len() || first as *mut u8 != self.heap_base() }
  }

  /// `(offset, size)` for every free block, in address order.
  pub fn free_blocks(&self) -> Vec<(usize, usize)> {
    self.ensure_init();
    let base = self.heap_base() as usize;
    unsafe {
      (FreeListIter(self.first_free.get()))
        .map(|node| (node as usize - base, (*node).size))
        .collect()
    }
  }

  /// `(offset, size)` for every busy block, found by walking the implicit
  /// busy runs between consecutive free nodes (and before the first one).
  pub fn busy_blocks(&self) -> Vec<(usize, usize)> {
    self.ensure_init();
    let base = self.heap_base() as usize;
    let mut out = Vec::new();
    unsafe {
      let end_of_region = self.heap_base().add(self.region.len());
      let mut r = self.heap_base();
      let mut p = self.first_free.get();
      loop {
        let bound = if p.is_null() { end_of_region } else { p as *mut u8 };
        while (r as usize) < (bound as usize) {
          let busy = BusyHeader::at(r);
          let sz = (*busy).size;
          out.push((r as usize - base, sz));
          r = r.add(BUSY_HEADER_SIZE + sz);
        }
        if p.is_null() {
          break;
        }
        r = (p as *mut u8).add((*p).size);
        p = (*p).next;
      }
    }
    out
  }

  /// Walks busy runs the same way `busy_blocks` does, but stops at the
  /// first block whose payload starts exactly at `ptr` rather than
  /// collecting every block — used by `deallocate`'s `check` audit, which
  /// must not allocate (it may itself be called from inside the global
  /// allocator), and exposed for callers that want the typed rejection
  /// reason rather than the no-op `deallocate` falls back to.
  pub fn validate_busy_pointer(&self, ptr: *mut u8) -> Result<(), CoreError> {
    self.ensure_init();
    unsafe {
      let end_of_region = self.heap_base().add(self.region.len());
      let mut r = self.heap_base();
      let mut p = self.first_free.get();
      loop {
        let bound = if p.is_null() { end_of_region } else { p as *mut u8 };
        while (r as usize) < (bound as usize) {
          let busy = BusyHeader::at(r);
          let sz = (*busy).size;
          if r.add(BUSY_HEADER_SIZE) == ptr {
            return Ok(());
          }
          r = r.add(BUSY_HEADER_SIZE + sz);
        }
        if p.is_null() {
          let offset = (ptr as usize).wrapping_sub(self.heap_base() as usize);
          return Err(CoreError::InvalidAddress { offset });
        }
        r = (p as *mut u8).add((*p).size);
        p = (*p).next;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const R: usize = 128 * 1024;

  #[test]
  fn initial_state_is_one_free_block_covering_region() {
    let heap = Heap::<R>::new();
    heap.init();
    assert_eq!(heap.free_blocks(), vec![(0, R)]);
    assert!(!heap.leak_check());
  }

  #[test]
  fn allocate_self_initializes() {
    let heap = Heap::<R>::new();
    let p = heap.allocate(16).expect("fits");
    assert_eq!((p.as_ptr() as usize) - (heap.heap_base() as usize), BUSY_HEADER_SIZE);
  }

  #[test]
  fn zero_byte_request_is_floored() {
    let heap = Heap::<R>::new();
    heap.init();
    let _ = heap.allocate(0).unwrap();
    let busy = heap.busy_blocks();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].1, FREE_HEADER_SIZE - BUSY_HEADER_SIZE);
  }

  #[test]
  fn allocate_then_immediately_deallocate_restores_shape() {
    let heap = Heap::<R>::new();
    heap.init();
    let before = heap.free_blocks();
    let p = heap.allocate(100).unwrap();
    heap.deallocate(p.as_ptr());
    assert_eq!(heap.free_blocks(), before);
  }

  #[test]
  fn non_adjacent_frees_are_not_coalesced() {
    let heap = Heap::<R>::new();
    heap.init();
    let a = heap.allocate(100).unwrap();
    let _b = heap.allocate(50).unwrap();
    heap.deallocate(a.as_ptr());
    assert_eq!(heap.free_blocks().len(), 2);
  }

  #[test]
  fn freeing_both_restores_initial_state() {
    let heap = Heap::<R>::new();
    heap.init();
    let a = heap.allocate(100).unwrap();
    let b = heap.allocate(50).unwrap();
    heap.deallocate(a.as_ptr());
    heap.deallocate(b.as_ptr());
    assert_eq!(heap.free_blocks(), vec![(0, R)]);
    assert!(!heap.leak_check());
  }

  #[test]
  fn reallocate_shrink_returns_same_pointer() {
    let heap = Heap::<R>::new();
    heap.init();
    let p = heap.allocate(100).unwrap();
    let p2 = heap.reallocate(p.as_ptr(), 40).unwrap();
    assert_eq!(p.as_ptr(), p2.as_ptr());
  }

  #[test]
  fn reallocate_grow_copies_and_frees_old_block() {
    let heap = Heap::<R>::new();
    heap.init();
    let p = heap.allocate(16).unwrap();
    unsafe {
      ptr::write_bytes(p.as_ptr(), 0xAB, 16);
    }
    let grown = heap.reallocate(p.as_ptr(), 256).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 16) };
    assert!(bytes.iter().all(|&b| b == 0xAB));
  }

  #[test]
  fn null_deallocate_is_noop() {
    let heap = Heap::<R>::new();
    heap.init();
    heap.deallocate(ptr::null_mut());
    assert_eq!(heap.free_blocks(), vec![(0, R)]);
  }

  #[test]
  fn fragmentation_is_zero_with_single_free_block() {
    let heap = Heap::<R>::new();
    heap.init();
    assert_eq!(heap.fragmentation(), 0.0);
  }

  #[test]
  fn out_of_space_returns_none() {
    let heap = Heap::<64>::new();
    heap.init();
    assert!(heap.allocate(1024).is_none());
  }

  // Run with `--features check` to exercise the validation audit path.
  #[test]
  #[cfg(feature = "check")]
  fn deallocate_rejects_non_busy_pointer_and_leaves_heap_untouched() {
    let heap = Heap::<R>::new();
    heap.init();
    let before = heap.free_blocks();

    // Offset 64 lies inside the single free block's payload, not at the
    // start of any busy block's payload.
    let bogus = unsafe { heap.heap_base().add(64) };
    assert_eq!(heap.validate_busy_pointer(bogus), Err(CoreError::InvalidAddress { offset: 64 }));

    heap.deallocate(bogus);
    assert_eq!(heap.free_blocks(), before);
  }
}

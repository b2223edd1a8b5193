//! The two block-header shapes that alternate through the region.
//!
//! A block's leading bytes are reinterpreted as one or the other only at
//! call sites where the block's busy/free status is already known from
//! control flow — there is no tag byte distinguishing them.

use std::mem;

/// Header stamped on a block handed to a caller. Payload follows
/// immediately.
#[repr(C)]
pub struct BusyHeader {
  /// Payload bytes, header excluded.
  pub size: usize,
}

/// Header stamped on a block tracked in the free list. Payload follows
/// immediately and may be reused to hold the next free header once the
/// block itself is split off of.
#[repr(C)]
pub struct FreeHeader {
  /// Header-plus-payload bytes, header included.
  pub size: usize,
  /// Next free block in address order, or null for the list tail.
  pub next: *mut FreeHeader,
}

pub const BUSY_HEADER_SIZE: usize = mem::size_of::<BusyHeader>();
pub const FREE_HEADER_SIZE: usize = mem::size_of::<FreeHeader>();

static_assertions::const_assert!(FREE_HEADER_SIZE > BUSY_HEADER_SIZE);

impl BusyHeader {
  /// Reinterprets `addr` as a busy header. Caller must know the block at
  /// `addr` is currently busy.
  #[inline]
  pub(crate) unsafe fn at(addr: *mut u8) -> *mut BusyHeader {
    addr as *mut BusyHeader
  }
}

impl FreeHeader {
  /// Reinterprets `addr` as a free header. Caller must know the block at
  /// `addr` is currently free.
  #[inline]
  pub(crate) unsafe fn at(addr: *mut u8) -> *mut FreeHeader {
    addr as *mut FreeHeader
  }
}

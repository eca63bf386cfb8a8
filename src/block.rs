//! Block header layout and the pointer arithmetic around it.
//!
//! Every conversion between a header and its data region goes through this
//! module, so the raw offset math stays in one place.
//!
//! ```text
//!   ┌──────────────────────┬──────────────────────────────┬───────────
//!   │ BlockHeader          │ data region (capacity bytes) │ next header
//!   │ magic | state        │ ┌──────────┬───────────────┐ │ ...
//!   │ size  | capacity     │ │ size     │ slack         │ │
//!   │ next  | prev         │ └──────────┴───────────────┘ │
//!   └──────────────────────┴──────────────────────────────┴───────────
//!   ▲                      ▲
//!   header                 data pointer handed to callers
//! ```

use std::{fmt, mem, ptr::NonNull};

use crate::align::{self, ALIGNMENT};

/// Tag stored in every header written by this crate.
pub(crate) const HEADER_MAGIC: u32 = 0xF17A_110C;

/// Bytes taken by a block header, rounded to [`ALIGNMENT`].
pub const HEADER_SIZE: usize = crate::align!(mem::size_of::<BlockHeader>());

/// Smallest data region a split is allowed to leave behind.
pub const MIN_CAPACITY: usize = ALIGNMENT;

const _: () = assert!(mem::align_of::<BlockHeader>() == ALIGNMENT);
const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);

/// Whether a block is handed out or available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockState {
  Used,
  Free,
}

impl fmt::Display for BlockState {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      BlockState::Used => f.write_str("used"),
      BlockState::Free => f.write_str("free"),
    }
  }
}

/// In-heap metadata placed in front of every data region.
#[repr(C)]
pub(crate) struct BlockHeader {
  pub magic: u32,
  pub state: BlockState,
  /// Logical bytes in use. Always 0 for a free block.
  pub size: usize,
  /// Usable bytes between the end of this header and the next header.
  pub capacity: usize,
  pub next: *mut BlockHeader,
  pub prev: *mut BlockHeader,
}

impl BlockHeader {
  /// Writes a header at `addr` and returns it.
  ///
  /// # Safety
  ///
  /// `addr` must be [`ALIGNMENT`] aligned and valid for writes of
  /// `HEADER_SIZE + capacity` bytes owned by the allocator.
  pub unsafe fn write(
    addr: *mut u8,
    capacity: usize,
    prev: *mut BlockHeader,
    next: *mut BlockHeader,
  ) -> *mut BlockHeader {
    debug_assert!(align::is_aligned(addr as usize));

    let block = addr.cast::<BlockHeader>();
    unsafe {
      block.write(BlockHeader {
        magic: HEADER_MAGIC,
        state: BlockState::Free,
        size: 0,
        capacity,
        next,
        prev,
      });
    }
    block
  }

  pub fn is_free(&self) -> bool {
    self.state == BlockState::Free
  }

  pub fn mark_used(
    &mut self,
    size: usize,
  ) {
    debug_assert!(size <= self.capacity);
    self.state = BlockState::Used;
    self.size = size;
  }

  pub fn mark_free(&mut self) {
    self.state = BlockState::Free;
    self.size = 0;
  }
}

/// Start of the data region of `block`.
///
/// # Safety
///
/// `block` must point at a live header inside the managed heap.
pub(crate) unsafe fn data_of(block: *mut BlockHeader) -> NonNull<u8> {
  unsafe { NonNull::new_unchecked(block.cast::<u8>().add(HEADER_SIZE)) }
}

/// Address right after the data region of `block`.
///
/// # Safety
///
/// `block` must point at a live header inside the managed heap.
pub(crate) unsafe fn end_of(block: *mut BlockHeader) -> *mut u8 {
  unsafe { data_of(block).as_ptr().add((*block).capacity) }
}

/// Maps a data pointer back to its header.
///
/// Returns `None` for pointers outside `[low + HEADER_SIZE, high)`, for
/// misaligned pointers and for headers without the crate's tag.
///
/// # Safety
///
/// `low..high` must be the memory currently owned by the allocator.
pub(crate) unsafe fn header_of(
  data: NonNull<u8>,
  low: *mut u8,
  high: *mut u8,
) -> Option<*mut BlockHeader> {
  let addr = data.as_ptr() as usize;
  let first_data = (low as usize).checked_add(HEADER_SIZE)?;

  if low.is_null() || addr < first_data || addr >= high as usize || !align::is_aligned(addr) {
    return None;
  }

  let block = unsafe { data.as_ptr().sub(HEADER_SIZE) }.cast::<BlockHeader>();
  let magic = unsafe { (*block).magic };

  (magic == HEADER_MAGIC).then_some(block)
}

//! Where the managed memory comes from.
//!
//! ```text
//!   low water mark                                         high water mark
//!   ▼                                                                    ▼
//!   ┌──────────────── grow #1 ───────────────┬──────── grow #2 ──────────┐
//!   │ hdr │ data │ hdr │ data ...            │ hdr │ data ...            │
//!   └────────────────────────────────────────┴───────────────────────────┘
//!                                                                        ▲
//!                                                        program break (sbrk)
//! ```
//!
//! Every growth call returns a region that starts exactly where the previous
//! one ended, so the allocator can treat everything between its water marks
//! as one tiled run of blocks.

use std::{mem, ptr::NonNull};

use libc::{c_void, intptr_t};

use crate::{
  align::{self, ALIGNMENT},
  block::HEADER_SIZE,
  diag::TARGET,
  error::AllocError,
};

/// A contiguous, growable supply of memory.
///
/// # Safety
///
/// Implementors must guarantee that a successful [`grow`](HeapSource::grow)
/// returns a pointer aligned to [`ALIGNMENT`] that is valid for reads and
/// writes of `bytes` bytes, that is not used by anyone else, and that starts
/// where the previous successful `grow` ended (until the next
/// [`release_to`](HeapSource::release_to)).
pub unsafe trait HeapSource {
  /// Extends the supply by `bytes`, a multiple of [`ALIGNMENT`].
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, AllocError>;

  /// Gives back everything from `low` upwards.
  ///
  /// # Safety
  ///
  /// `low` must be the start of the first region returned by `grow` since the
  /// last release, and nothing in the released memory may be used afterwards.
  unsafe fn release_to(
    &mut self,
    low: NonNull<u8>,
  );
}

/// Bytes to request for a block able to hold `capacity` data bytes: the
/// smallest multiple of `increment` covering a header plus `capacity`.
pub(crate) fn growth_size(
  capacity: usize,
  increment: usize,
) -> Option<usize> {
  let needed = capacity.checked_add(HEADER_SIZE)?;
  needed.div_ceil(increment).checked_mul(increment)
}

/// The process program break, moved with `sbrk(2)` and `brk(2)`.
pub struct Sbrk {
  end: *mut u8,
}

// SAFETY: the break is process wide; `Sbrk` only stores the address it
// expects the break to be at.
unsafe impl Send for Sbrk {}

impl Sbrk {
  /// # Safety
  ///
  /// Nothing else in the process may rely on memory above the break this
  /// source first claims, since [`HeapSource::release_to`] moves the break
  /// back down.
  pub const unsafe fn new() -> Self {
    Self {
      end: std::ptr::null_mut(),
    }
  }

  /// Current program break.
  pub fn program_break() -> *mut u8 {
    unsafe { libc::sbrk(0) }.cast::<u8>()
  }

  fn failed(address: *mut c_void) -> bool {
    address == usize::MAX as *mut c_void
  }

  /// Pads the break up to [`ALIGNMENT`] before the first region is handed out.
  fn align_break(&mut self) -> Result<(), AllocError> {
    let current = Self::program_break() as usize;
    let padding = align::align_up(current).ok_or(AllocError::SizeOverflow)? - current;

    if padding > 0 && Self::failed(unsafe { libc::sbrk(padding as intptr_t) }) {
      return Err(AllocError::OutOfMemory { requested: padding });
    }
    Ok(())
  }
}

unsafe impl HeapSource for Sbrk {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let increment = intptr_t::try_from(bytes).map_err(|_| AllocError::SizeOverflow)?;

    if self.end.is_null() {
      self.align_break()?;
    }

    let address = unsafe { libc::sbrk(increment) };
    if Self::failed(address) {
      return Err(AllocError::OutOfMemory { requested: bytes });
    }

    let start = address.cast::<u8>();
    let moved = !self.end.is_null() && start != self.end;
    if moved || !align::is_aligned(start as usize) {
      // Someone else moved the break; hand our increment back.
      unsafe { libc::sbrk(-increment) };
      return Err(AllocError::Discontiguous);
    }

    self.end = unsafe { start.add(bytes) };
    NonNull::new(start).ok_or(AllocError::OutOfMemory { requested: bytes })
  }

  unsafe fn release_to(
    &mut self,
    low: NonNull<u8>,
  ) {
    if unsafe { libc::brk(low.as_ptr().cast::<c_void>()) } != 0 {
      log::warn!(target: TARGET, "brk({:?}) failed while resetting the heap", low);
    }
    self.end = std::ptr::null_mut();
  }
}

/// A fixed-size block of memory that behaves like a private program break.
///
/// Growth fails with [`AllocError::OutOfMemory`] once the capacity given to
/// [`Arena::new`] is used up.
pub struct Arena {
  base: NonNull<usize>,
  words: usize,
  used: usize,
}

// SAFETY: the arena exclusively owns its buffer.
unsafe impl Send for Arena {}

impl Arena {
  /// Creates an arena able to hand out `capacity` bytes (rounded up to
  /// [`ALIGNMENT`]).
  pub fn new(capacity: usize) -> Self {
    let words = capacity.div_ceil(mem::size_of::<usize>());
    let buffer: Box<[usize]> = vec![0; words].into_boxed_slice();
    let base = NonNull::from(Box::leak(buffer)).cast::<usize>();

    Self { base, words, used: 0 }
  }

  pub fn capacity(&self) -> usize {
    self.words * mem::size_of::<usize>()
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.used
  }
}

unsafe impl HeapSource for Arena {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    debug_assert!(bytes % ALIGNMENT == 0);

    let remaining = self.capacity() - self.used;
    if bytes > remaining {
      return Err(AllocError::OutOfMemory { requested: bytes });
    }

    let start = unsafe { self.base.cast::<u8>().add(self.used) };
    self.used += bytes;
    Ok(start)
  }

  unsafe fn release_to(
    &mut self,
    low: NonNull<u8>,
  ) {
    let offset = low.as_ptr() as usize - self.base.as_ptr() as usize;
    debug_assert!(offset <= self.used);
    self.used = offset;
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    let slice = std::ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.words);
    // SAFETY: `base` came from `Box::leak` of a slice with `words` elements.
    drop(unsafe { Box::from_raw(slice) });
  }
}

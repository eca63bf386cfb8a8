//! Zero-filled allocation, reallocation and string duplication, built only on
//! [`Allocator::allocate`] and [`Allocator::release`].

use std::{ffi::CStr, ptr, ptr::NonNull};

use crate::{
  allocator::Allocator,
  diag::note,
  error::AllocError,
  heap::HeapSource,
};

impl<H: HeapSource> Allocator<H> {
  /// Allocates room for `count` elements of `size` bytes, all zeroed.
  ///
  /// A zero product yields `Ok(None)` like [`Allocator::allocate`].
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    let total = count.checked_mul(size).ok_or(AllocError::SizeOverflow)?;

    let data = self.allocate(total)?;
    if let Some(data) = data {
      // SAFETY: `allocate` handed out at least `total` bytes at `data`.
      unsafe { ptr::write_bytes(data.as_ptr(), 0, total) };
      note!(self.diag, "zero_allocate: {} x {} bytes zeroed", count, size);
    }
    Ok(data)
  }

  /// Resizes the block behind `ptr` to `new_size` bytes.
  ///
  /// - `None` behaves like [`Allocator::allocate`].
  /// - A zero `new_size` releases the block and yields `Ok(None)`.
  /// - A size that still fits the block's capacity is applied in place.
  /// - Otherwise a new block is allocated, the old logical size is copied
  ///   over and the old block is released. If that allocation fails the old
  ///   block is left untouched.
  ///
  /// Pointers that do not belong to this heap are not touched and yield
  /// `Ok(None)`.
  ///
  /// # Safety
  ///
  /// `ptr` must be `None` or a pointer obtained from this allocator. When the
  /// block moves, the old pointer must not be used anymore.
  pub unsafe fn reallocate(
    &mut self,
    ptr: Option<NonNull<u8>>,
    new_size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    let Some(data) = ptr else {
      return self.allocate(new_size);
    };

    if new_size == 0 {
      unsafe { self.release(Some(data)) };
      return Ok(None);
    }

    let Some(block) = (unsafe { self.block_of(data) }) else {
      note!(self.diag, "reallocate: {:p} is not a block of this heap", data);
      return Ok(None);
    };

    let (size, capacity) = unsafe { ((*block).size, (*block).capacity) };
    if new_size <= capacity {
      note!(self.diag, "reallocate: {} -> {} bytes in place", size, new_size);
      unsafe { (*block).mark_used(new_size) };
      return Ok(Some(data));
    }

    let Some(moved) = self.allocate(new_size)? else {
      return Ok(None);
    };

    // SAFETY: the blocks are distinct and both hold at least `size` bytes.
    unsafe {
      ptr::copy_nonoverlapping(data.as_ptr(), moved.as_ptr(), size);
      self.release(Some(data));
    }
    note!(self.diag, "reallocate: {} -> {} bytes moved to {:p}", size, new_size, moved);

    Ok(Some(moved))
  }

  /// Copies `s`, including its terminating nul, into a new block.
  pub fn duplicate_string(
    &mut self,
    s: &CStr,
  ) -> Result<NonNull<u8>, AllocError> {
    let bytes = s.to_bytes_with_nul();

    let data = self.allocate(bytes.len())?.ok_or(AllocError::SizeOverflow)?;
    // SAFETY: `data` holds at least `bytes.len()` bytes.
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), data.as_ptr(), bytes.len()) };

    Ok(data)
  }
}

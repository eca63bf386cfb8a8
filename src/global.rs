//! Process-wide use behind one lock.
//!
//! Splitting and coalescing rewrite the links of neighbouring blocks, so the
//! whole allocator is guarded by a single spin lock held for the duration of
//! each operation.
//!
//! ```rust,ignore
//! use fitalloc::{Allocator, LockedAllocator, Sbrk};
//!
//! #[global_allocator]
//! static GLOBAL: LockedAllocator<Sbrk> = LockedAllocator::new(Allocator::new(unsafe { Sbrk::new() }));
//! ```
//!
//! Keep verbose mode off for a global instance: diagnostic output may itself
//! allocate, which would re-enter the lock.

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use spin::{Mutex, MutexGuard};

use crate::{align::ALIGNMENT, allocator::Allocator, heap::HeapSource};

pub struct LockedAllocator<H: HeapSource> {
  inner: Mutex<Allocator<H>>,
}

impl<H: HeapSource> LockedAllocator<H> {
  pub const fn new(allocator: Allocator<H>) -> Self {
    Self {
      inner: Mutex::new(allocator),
    }
  }

  /// Exclusive access for configuration, inspection or reset.
  pub fn lock(&self) -> MutexGuard<'_, Allocator<H>> {
    self.inner.lock()
  }
}

unsafe impl<H: HeapSource + Send> GlobalAlloc for LockedAllocator<H> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return ptr::null_mut();
    }

    match self.inner.lock().allocate(layout.size()) {
      Ok(Some(data)) => data.as_ptr(),
      _ => ptr::null_mut(),
    }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return ptr::null_mut();
    }

    match self.inner.lock().zero_allocate(1, layout.size()) {
      Ok(Some(data)) => data.as_ptr(),
      _ => ptr::null_mut(),
    }
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.inner.lock().release(NonNull::new(ptr)) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return ptr::null_mut();
    }

    match unsafe { self.inner.lock().reallocate(NonNull::new(ptr), new_size) } {
      Ok(Some(data)) => data.as_ptr(),
      _ => ptr::null_mut(),
    }
  }
}

use std::{io::Write, marker::PhantomData, ptr, ptr::NonNull};

use crate::{
  align,
  block::{self, BlockHeader, BlockState, HEADER_MAGIC, HEADER_SIZE, MIN_CAPACITY},
  config::{self, Config},
  diag::{Diagnostics, note},
  error::{AllocError, HeapCorruption},
  fit::{self, FitAlgorithm},
  heap::{self, HeapSource},
};

/// Block list allocator over a growable [`HeapSource`].
///
/// Blocks tile the memory between the low and high water marks and are kept
/// in one address-ordered, doubly linked list. Free blocks are found with the
/// configured [`FitAlgorithm`], split when the leftover can hold another
/// block, and merged with free neighbours as soon as they are released.
pub struct Allocator<H: HeapSource> {
  source: H,
  head: *mut BlockHeader,
  tail: *mut BlockHeader,
  /// Last block chosen by a next-fit placement.
  cursor: *mut BlockHeader,
  low_water_mark: *mut u8,
  high_water_mark: *mut u8,
  growth_increment: usize,
  algorithm: FitAlgorithm,
  pub(crate) diag: Diagnostics,
}

// SAFETY: the block list lives in memory owned through `source`; moving the
// allocator moves that ownership with it.
unsafe impl<H: HeapSource + Send> Send for Allocator<H> {}

/// Read-only snapshot of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub header: *const u8,
  pub data: *const u8,
  /// Distance of the header from the low water mark.
  pub offset: usize,
  pub size: usize,
  pub capacity: usize,
  pub state: BlockState,
}

impl BlockInfo {
  pub fn is_free(&self) -> bool {
    self.state == BlockState::Free
  }
}

/// Aggregate view over the block list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub used_blocks: usize,
  pub free_blocks: usize,
  /// Sum of logical sizes of used blocks.
  pub used_bytes: usize,
  /// Sum of capacities of free blocks.
  pub free_bytes: usize,
  /// Capacity held by used blocks beyond their logical size.
  pub slack_bytes: usize,
  pub header_bytes: usize,
  pub largest_free: usize,
}

/// Iterator over [`BlockInfo`] in address order.
pub struct Blocks<'a> {
  current: *mut BlockHeader,
  low: *mut u8,
  _allocator: PhantomData<&'a ()>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    // SAFETY: the allocator is borrowed for `'a`, so the list cannot change.
    unsafe {
      let block = self.current;
      self.current = (*block).next;
      Some(BlockInfo {
        header: block.cast::<u8>(),
        data: block::data_of(block).as_ptr(),
        offset: block as usize - self.low as usize,
        size: (*block).size,
        capacity: (*block).capacity,
        state: (*block).state,
      })
    }
  }
}

impl<H: HeapSource> Allocator<H> {
  pub const fn new(source: H) -> Self {
    Self::with_config(source, Config::new())
  }

  pub const fn with_config(
    source: H,
    config: Config,
  ) -> Self {
    Self {
      source,
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      cursor: ptr::null_mut(),
      low_water_mark: ptr::null_mut(),
      high_water_mark: ptr::null_mut(),
      growth_increment: config::effective_growth(config.growth_increment),
      algorithm: config.algorithm,
      diag: Diagnostics::new(config.verbose),
    }
  }

  /// Allocates `size` bytes and returns the start of the data region.
  ///
  /// A zero `size` is not served and yields `Ok(None)`. The heap only grows
  /// when no free block is large enough; if growing fails the block list is
  /// left as it was.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    if size == 0 {
      note!(self.diag, "allocate: zero-size request ignored");
      return Ok(None);
    }

    let capacity = align::align_up(size).ok_or(AllocError::SizeOverflow)?;

    // SAFETY: head and cursor belong to the list maintained by `self`.
    let mut block = unsafe { fit::find_fit(self.algorithm, self.head, self.cursor, capacity) };
    if block.is_null() {
      block = self.grow(capacity)?;
    }

    // SAFETY: `block` is a free block of the list with at least `capacity` bytes.
    let data = unsafe {
      self.split(block, capacity);
      (*block).mark_used(size);
      block::data_of(block)
    };

    if self.algorithm == FitAlgorithm::Next {
      self.cursor = block;
    }

    note!(
      self.diag,
      "allocate: {} bytes at {:p} (offset {:#x}, capacity {})",
      size,
      data,
      self.offset_of(block.cast::<u8>()),
      unsafe { (*block).capacity }
    );

    Ok(Some(data))
  }

  /// Returns a block to the free list and merges it with free neighbours.
  ///
  /// `None`, already free blocks and pointers this allocator did not hand out
  /// are ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be `None` or a pointer obtained from this allocator, and the
  /// caller must not use the memory afterwards.
  pub unsafe fn release(
    &mut self,
    ptr: Option<NonNull<u8>>,
  ) {
    let Some(data) = ptr else {
      note!(self.diag, "release: null pointer ignored");
      return;
    };

    let Some(block) = (unsafe { self.block_of(data) }) else {
      note!(self.diag, "release: {:p} is not a block of this heap", data);
      return;
    };

    unsafe {
      if (*block).is_free() {
        note!(
          self.diag,
          "release: block is already free: offset {:#x}",
          self.offset_of(block.cast::<u8>())
        );
        return;
      }

      note!(
        self.diag,
        "release: {} bytes at offset {:#x}",
        (*block).size,
        self.offset_of(block.cast::<u8>())
      );

      (*block).mark_free();
      self.coalesce(block);
    }
  }

  /// Gives all claimed memory back to the heap source and forgets every block.
  ///
  /// # Safety
  ///
  /// No pointer handed out by this allocator may be used afterwards.
  pub unsafe fn reset(&mut self) {
    note!(self.diag, "reset: releasing {} bytes", self.heap_size());

    if let Some(low) = NonNull::new(self.low_water_mark) {
      unsafe { self.source.release_to(low) };
    }

    self.head = ptr::null_mut();
    self.tail = ptr::null_mut();
    self.cursor = ptr::null_mut();
    self.high_water_mark = self.low_water_mark;
  }

  /// Sets the minimum growth increment and returns the value in effect.
  ///
  /// `0` only queries. Values below two headers are raised to that floor and
  /// every value is rounded up to the header alignment.
  pub fn set_minimum_growth(
    &mut self,
    size: usize,
  ) -> usize {
    if size != 0 {
      self.growth_increment = config::effective_growth(size);
      note!(self.diag, "minimum growth set to {} bytes", self.growth_increment);
    }
    self.growth_increment
  }

  pub fn set_fit_algorithm(
    &mut self,
    algorithm: FitAlgorithm,
  ) {
    self.algorithm = algorithm;
    note!(self.diag, "{} fit selected", algorithm);
  }

  pub fn set_verbose(
    &mut self,
    verbose: bool,
  ) {
    self.diag.set_verbose(verbose);
  }

  /// Sends diagnostic lines to `sink` instead of the `log` facade.
  pub fn set_log_sink<W: Write + Send + 'static>(
    &mut self,
    sink: W,
  ) {
    self.diag.set_sink(Box::new(sink));
  }

  pub fn algorithm(&self) -> FitAlgorithm {
    self.algorithm
  }

  pub fn growth_increment(&self) -> usize {
    self.growth_increment
  }

  pub fn is_verbose(&self) -> bool {
    self.diag.is_verbose()
  }

  pub fn source(&self) -> &H {
    &self.source
  }

  /// First byte ever claimed from the heap source, or null before first use.
  pub fn low_water_mark(&self) -> *const u8 {
    self.low_water_mark
  }

  /// One past the last claimed byte.
  pub fn high_water_mark(&self) -> *const u8 {
    self.high_water_mark
  }

  /// Bytes currently claimed from the heap source.
  pub fn heap_size(&self) -> usize {
    self.high_water_mark as usize - self.low_water_mark as usize
  }

  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.head,
      low: self.low_water_mark,
      _allocator: PhantomData,
    }
  }

  pub fn stats(&self) -> HeapStats {
    self.blocks().fold(HeapStats::default(), |mut stats, info| {
      stats.blocks += 1;
      stats.header_bytes += HEADER_SIZE;
      if info.is_free() {
        stats.free_blocks += 1;
        stats.free_bytes += info.capacity;
        stats.largest_free = stats.largest_free.max(info.capacity);
      } else {
        stats.used_blocks += 1;
        stats.used_bytes += info.size;
        stats.slack_bytes += info.capacity - info.size;
      }
      stats
    })
  }

  /// Checks the block list invariants and reports the first violation.
  pub fn validate(&self) -> Result<(), HeapCorruption> {
    let mut prev: *mut BlockHeader = ptr::null_mut();
    let mut expected = self.low_water_mark;
    let mut block = self.head;

    // SAFETY: every block reached from `head` lies in `[low, high)` as long as
    // the ordering and tiling checks pass, which are made before following
    // the next link.
    unsafe {
      while !block.is_null() {
        let offset = self.offset_of(block.cast::<u8>());

        if !prev.is_null() && block <= prev {
          return Err(HeapCorruption::OutOfOrder { offset });
        }
        if block.cast::<u8>() != expected {
          let offset = if prev.is_null() { offset } else { self.offset_of(prev.cast::<u8>()) };
          return Err(HeapCorruption::Gap { offset });
        }
        if (*block).magic != HEADER_MAGIC {
          return Err(HeapCorruption::BadMagic { offset });
        }
        if (*block).prev != prev {
          return Err(HeapCorruption::BrokenBackLink { offset });
        }

        let (size, capacity) = ((*block).size, (*block).capacity);
        if size > capacity {
          return Err(HeapCorruption::SizeExceedsCapacity { offset, size, capacity });
        }
        if (*block).is_free() {
          if size != 0 {
            return Err(HeapCorruption::FreeWithSize { offset, size });
          }
          if !prev.is_null() && (*prev).is_free() {
            return Err(HeapCorruption::AdjacentFree {
              first: self.offset_of(prev.cast::<u8>()),
              second: offset,
            });
          }
        }

        expected = block::end_of(block);
        if expected > self.high_water_mark {
          return Err(HeapCorruption::Gap { offset });
        }

        prev = block;
        block = (*block).next;
      }
    }

    if self.tail != prev {
      return Err(HeapCorruption::TailMismatch);
    }
    if !prev.is_null() && expected != self.high_water_mark {
      return Err(HeapCorruption::Gap {
        offset: self.offset_of(prev.cast::<u8>()),
      });
    }
    Ok(())
  }

  /// Header of a data pointer handed out by this allocator.
  pub(crate) unsafe fn block_of(
    &self,
    data: NonNull<u8>,
  ) -> Option<*mut BlockHeader> {
    unsafe { block::header_of(data, self.low_water_mark, self.high_water_mark) }
  }

  fn offset_of(
    &self,
    addr: *const u8,
  ) -> usize {
    addr as usize - self.low_water_mark as usize
  }

  /// Claims a new region big enough for `capacity` data bytes and appends it
  /// as one free block.
  fn grow(
    &mut self,
    capacity: usize,
  ) -> Result<*mut BlockHeader, AllocError> {
    let bytes = heap::growth_size(capacity, self.growth_increment).ok_or(AllocError::SizeOverflow)?;

    let region = match self.source.grow(bytes) {
      Ok(region) => region,
      Err(err) => {
        note!(self.diag, "grow: {} bytes refused: {}", bytes, err);
        return Err(err);
      }
    };
    debug_assert!(self.head.is_null() || region.as_ptr() == self.high_water_mark);

    // SAFETY: the source hands out `bytes` aligned bytes starting at `region`.
    let block = unsafe { BlockHeader::write(region.as_ptr(), bytes - HEADER_SIZE, self.tail, ptr::null_mut()) };

    if self.head.is_null() {
      self.head = block;
      self.low_water_mark = region.as_ptr();
    } else {
      unsafe { (*self.tail).next = block };
    }
    self.tail = block;
    self.high_water_mark = unsafe { region.as_ptr().add(bytes) };

    note!(
      self.diag,
      "grow: {} bytes at offset {:#x}, high water mark {:p}",
      bytes,
      self.offset_of(region.as_ptr()),
      self.high_water_mark
    );

    Ok(block)
  }

  /// Carves `capacity` bytes out of `block` when the rest can hold another
  /// header and at least [`MIN_CAPACITY`] bytes.
  unsafe fn split(
    &mut self,
    block: *mut BlockHeader,
    capacity: usize,
  ) {
    unsafe {
      let leftover = (*block).capacity - capacity;
      if leftover < HEADER_SIZE + MIN_CAPACITY {
        return;
      }

      let next = (*block).next;
      let addr = block::data_of(block).as_ptr().add(capacity);
      let remainder = BlockHeader::write(addr, leftover - HEADER_SIZE, block, next);

      if next.is_null() {
        self.tail = remainder;
      } else {
        (*next).prev = remainder;
      }
      (*block).next = remainder;
      (*block).capacity = capacity;

      note!(
        self.diag,
        "split: offset {:#x} keeps {} bytes, {} bytes left free",
        self.offset_of(block.cast::<u8>()),
        capacity,
        leftover - HEADER_SIZE
      );
    }
  }

  /// Merges a freshly freed `block` with its free neighbours.
  unsafe fn coalesce(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let next = (*block).next;
      if !next.is_null() && (*next).is_free() {
        self.absorb_next(block);
      }

      let prev = (*block).prev;
      if !prev.is_null() && (*prev).is_free() {
        self.absorb_next(prev);
      }
    }
  }

  /// Folds the block following `block` into it.
  unsafe fn absorb_next(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let victim = (*block).next;
      let after = (*victim).next;

      (*block).capacity += HEADER_SIZE + (*victim).capacity;
      (*block).next = after;
      if after.is_null() {
        self.tail = block;
      } else {
        (*after).prev = block;
      }

      if self.cursor == victim {
        self.cursor = block;
      }
      (*victim).magic = 0;

      note!(
        self.diag,
        "coalesce: offset {:#x} absorbed offset {:#x}, capacity now {}",
        self.offset_of(block.cast::<u8>()),
        self.offset_of(victim.cast::<u8>()),
        (*block).capacity
      );
    }
  }
}

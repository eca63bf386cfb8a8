use thiserror::Error;

/// Failures reported by the allocating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The heap source refused to supply more memory.
  #[error("out of memory: the heap could not grow by {requested} bytes")]
  OutOfMemory { requested: usize },
  /// Size arithmetic (element count times element size, alignment or growth
  /// rounding) does not fit in `usize`.
  #[error("requested size overflows the address space")]
  SizeOverflow,
  /// The heap source returned memory that does not continue the managed region.
  #[error("heap growth was not contiguous with the managed region")]
  Discontiguous,
}

/// First invariant violation found by [`Allocator::validate`](crate::Allocator::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapCorruption {
  #[error("block at offset {offset:#x} has a bad header tag")]
  BadMagic { offset: usize },
  #[error("block at offset {offset:#x} does not follow its predecessor in address order")]
  OutOfOrder { offset: usize },
  #[error("block at offset {offset:#x} has a stale back link")]
  BrokenBackLink { offset: usize },
  #[error("blocks at offsets {first:#x} and {second:#x} are both free")]
  AdjacentFree { first: usize, second: usize },
  #[error("block at offset {offset:#x} holds {size} bytes in a capacity of {capacity}")]
  SizeExceedsCapacity {
    offset: usize,
    size: usize,
    capacity: usize,
  },
  #[error("free block at offset {offset:#x} reports a logical size of {size}")]
  FreeWithSize { offset: usize, size: usize },
  #[error("block at offset {offset:#x} does not end where the next block starts")]
  Gap { offset: usize },
  #[error("list tail does not match the last block")]
  TailMismatch,
}

/// Unknown fit algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fit algorithm `{0}` (expected first, best, worst or next)")]
pub struct ParseFitAlgorithmError(pub String);

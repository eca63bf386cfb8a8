//! # fitalloc - A Block List Memory Allocator
//!
//! This crate implements a classic **block list allocator** on top of the
//! process heap (`sbrk`), with a selectable placement policy: first fit,
//! best fit, worst fit or next fit.
//!
//! ## Overview
//!
//! Every region the allocator tracks starts with a header. The headers form
//! one doubly linked list in address order that covers the whole heap, used
//! and free blocks alike:
//!
//! ```text
//!   Block List:
//!
//!   low water mark                                           high water mark
//!   ▼                                                                      ▼
//!   ┌─────┬────────┬─────┬──────────────┬─────┬──────┬─────┬──────────────┐
//!   │ hdr │  used  │ hdr │     free     │ hdr │ used │ hdr │     free     │
//!   └─────┴────────┴─────┴──────────────┴─────┴──────┴─────┴──────────────┘
//!     │  ▲           │ ▲                  │ ▲            │ ▲
//!     └──┼───next───►┘ └──┼───next───────►┘ └─┼───next────►┘
//!        └────prev─────┘  └────prev──────────┘ └───prev─────┘
//! ```
//!
//! - **Allocation** picks a free block with the active [`FitAlgorithm`]. If
//!   the block is larger than needed and the rest can hold another header,
//!   the rest is split off as a new free block.
//! - **Growth** happens only when no free block fits. The heap is extended
//!   by a multiple of the growth increment and the new region is appended
//!   to the list.
//! - **Release** marks the block free and immediately merges it with free
//!   neighbours, so two free blocks are never adjacent.
//!
//! ```text
//!   Splitting a free block for a 32 byte request:
//!
//!   ┌─────┬──────────────────────────────┐      ┌─────┬────┬─────┬───────────┐
//!   │ hdr │        free (120)            │  ──► │ hdr │ 32 │ hdr │ free (48) │
//!   └─────┴──────────────────────────────┘      └─────┴────┴─────┴───────────┘
//!
//!   Releasing the middle block:
//!
//!   ┌─────┬──────┬─────┬──────┬─────┬──────┐    ┌─────┬────────────────────────┐
//!   │ hdr │ free │ hdr │ used │ hdr │ free │ ─► │ hdr │     free (merged)      │
//!   └─────┴──────┴─────┴──────┴─────┴──────┘    └─────┴────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   fitalloc
//!   ├── align      - Alignment helpers (align!, align_up)
//!   ├── block      - Block header layout and pointer conversions (internal)
//!   ├── heap       - HeapSource trait, Sbrk and Arena sources
//!   ├── fit        - FitAlgorithm and the shared fit search
//!   ├── allocator  - Allocator: allocate, release, reset, configuration
//!   ├── derived    - zero_allocate, reallocate, duplicate_string
//!   ├── dump       - Read-only heap map
//!   ├── global     - LockedAllocator, a GlobalAlloc adapter
//!   ├── config     - Initial settings
//!   ├── diag       - Opt-in diagnostic output (internal)
//!   └── error      - Error types
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use fitalloc::{Allocator, Arena, Config, FitAlgorithm};
//!
//! let config = Config::new().with_algorithm(FitAlgorithm::Best);
//! let mut allocator = Allocator::with_config(Arena::new(64 * 1024), config);
//!
//! let data = allocator.allocate(64).unwrap().unwrap();
//! unsafe {
//!     data.as_ptr().write_bytes(0x2A, 64);
//!     allocator.release(Some(data));
//! }
//!
//! assert_eq!(allocator.stats().used_blocks, 0);
//! println!("{}", allocator.dump());
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`Allocator`] needs `&mut self`; use
//!   [`LockedAllocator`] to share it.
//! - **Word alignment only**: data regions are aligned to [`align::ALIGNMENT`].
//! - **No trimming**: memory goes back to the OS only on [`Allocator::reset`].
//! - **Unix-only** for [`Sbrk`]: requires `libc`'s `sbrk`/`brk`.
//!
//! ## Safety
//!
//! Allocation is safe; everything that takes a pointer back (release,
//! reallocate) or invalidates pointers (reset) is `unsafe`.

pub mod align;
mod allocator;
mod block;
mod config;
mod derived;
mod diag;
mod dump;
mod error;
mod fit;
mod global;
mod heap;

pub use allocator::{Allocator, BlockInfo, Blocks, HeapStats};
pub use block::{BlockState, HEADER_SIZE, MIN_CAPACITY};
pub use config::{Config, DEFAULT_GROWTH, MIN_GROWTH};
pub use dump::HeapDump;
pub use error::{AllocError, HeapCorruption, ParseFitAlgorithmError};
pub use fit::FitAlgorithm;
pub use global::LockedAllocator;
pub use heap::{Arena, HeapSource, Sbrk};

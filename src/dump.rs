//! Human readable map of the heap.
//!
//! ```text
//! heap 0x5581e2a4f000..0x5581e2a50000 (4096 bytes, 3 blocks)
//!      offset  header          data            size  capacity  state
//!     0x00000  0x5581e2a4f000  0x5581e2a4f028   100       104  used
//!     ...
//! used 2 (164 bytes, 4 slack), free 1 (3872 bytes, largest 3872)
//! ```

use std::fmt;

use crate::{allocator::Allocator, heap::HeapSource};

/// Borrowed view rendering an [`Allocator`]'s blocks. Never mutates anything.
pub struct HeapDump<'a, H: HeapSource> {
  allocator: &'a Allocator<H>,
}

impl<H: HeapSource> Allocator<H> {
  pub fn dump(&self) -> HeapDump<'_, H> {
    HeapDump { allocator: self }
  }
}

impl<H: HeapSource> fmt::Display for HeapDump<'_, H> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let allocator = self.allocator;
    let stats = allocator.stats();

    writeln!(
      f,
      "heap {:p}..{:p} ({} bytes, {} blocks)",
      allocator.low_water_mark(),
      allocator.high_water_mark(),
      allocator.heap_size(),
      stats.blocks
    )?;

    if stats.blocks > 0 {
      writeln!(
        f,
        "  {:>9}  {:<16}  {:<16}  {:>8}  {:>8}  state",
        "offset", "header", "data", "size", "capacity"
      )?;
    }
    for info in allocator.blocks() {
      writeln!(
        f,
        "  {:>#9x}  {:<16p}  {:<16p}  {:>8}  {:>8}  {}",
        info.offset, info.header, info.data, info.size, info.capacity, info.state
      )?;
    }

    write!(
      f,
      "used {} ({} bytes, {} slack), free {} ({} bytes, largest {})",
      stats.used_blocks,
      stats.used_bytes,
      stats.slack_bytes,
      stats.free_blocks,
      stats.free_bytes,
      stats.largest_free
    )
  }
}

#[cfg(test)]
mod tests {
  use crate::{allocator::Allocator, config::Config, heap::Arena};

  #[test]
  fn test_empty_heap() {
    let allocator = Allocator::new(Arena::new(1024));
    let dump = allocator.dump().to_string();

    assert!(dump.contains("(0 bytes, 0 blocks)"));
    assert!(dump.ends_with("used 0 (0 bytes, 0 slack), free 0 (0 bytes, largest 0)"));
  }

  #[test]
  fn test_rows_per_block() {
    let mut allocator = Allocator::with_config(Arena::new(8192), Config::new().with_growth_increment(4096));
    let a = allocator.allocate(100).unwrap();
    allocator.allocate(20).unwrap();
    unsafe { allocator.release(a) };

    let before = allocator.blocks().collect::<Vec<_>>();
    let dump = allocator.dump().to_string();
    let lines: Vec<&str> = dump.lines().collect();

    // Title, column header, one row per block, summary.
    assert_eq!(lines.len(), 2 + before.len() + 1);
    assert!(lines[0].contains("4096 bytes, 3 blocks"));
    assert!(lines[2].ends_with("free"));
    assert!(lines[3].ends_with("used"));
    assert!(lines[3].contains(" 20 "));
    assert!(lines[5].starts_with("used 1 (20 bytes, 4 slack), free 2"));

    // Rendering leaves the heap alone.
    assert_eq!(allocator.blocks().collect::<Vec<_>>(), before);
  }
}

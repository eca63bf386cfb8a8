//! Placement policies.
//!
//! All four policies share one traversal; they only differ in where the walk
//! starts and in which fitting block wins.

use std::{fmt, ptr, str::FromStr};

use crate::{block::BlockHeader, error::ParseFitAlgorithmError};

/// Policy used to pick the free block that serves a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FitAlgorithm {
  /// First fitting block from the head of the list.
  #[default]
  First,
  /// Fitting block with the smallest capacity.
  Best,
  /// Fitting block with the largest capacity.
  Worst,
  /// First fitting block after the previous next-fit placement, wrapping
  /// around to the head.
  Next,
}

impl FitAlgorithm {
  pub const ALL: [FitAlgorithm; 4] = [
    FitAlgorithm::First,
    FitAlgorithm::Best,
    FitAlgorithm::Worst,
    FitAlgorithm::Next,
  ];

  fn rule(self) -> Rule {
    match self {
      FitAlgorithm::First | FitAlgorithm::Next => Rule::FirstMatch,
      FitAlgorithm::Best => Rule::Smallest,
      FitAlgorithm::Worst => Rule::Largest,
    }
  }
}

impl fmt::Display for FitAlgorithm {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let name = match self {
      FitAlgorithm::First => "first",
      FitAlgorithm::Best => "best",
      FitAlgorithm::Worst => "worst",
      FitAlgorithm::Next => "next",
    };
    f.write_str(name)
  }
}

impl FromStr for FitAlgorithm {
  type Err = ParseFitAlgorithmError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().trim_end_matches("-fit").trim_end_matches("_fit") {
      "first" => Ok(FitAlgorithm::First),
      "best" => Ok(FitAlgorithm::Best),
      "worst" => Ok(FitAlgorithm::Worst),
      "next" => Ok(FitAlgorithm::Next),
      _ => Err(ParseFitAlgorithmError(s.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
  FirstMatch,
  Smallest,
  Largest,
}

/// Address-order walk over `[current, stop)`.
struct Walk {
  current: *mut BlockHeader,
  stop: *mut BlockHeader,
}

impl Walk {
  /// # Safety
  ///
  /// Every block reachable from `current` must be a live header.
  unsafe fn new(
    current: *mut BlockHeader,
    stop: *mut BlockHeader,
  ) -> Self {
    Self { current, stop }
  }
}

impl Iterator for Walk {
  type Item = *mut BlockHeader;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() || self.current == self.stop {
      return None;
    }

    let block = self.current;
    // SAFETY: guaranteed by `Walk::new`.
    self.current = unsafe { (*block).next };
    Some(block)
  }
}

/// Picks a free block with at least `size` bytes of capacity, or null.
///
/// Ties are broken in favour of the block visited first.
///
/// # Safety
///
/// `head` must start a well formed block list and `cursor` must be null or
/// a block of that list.
pub(crate) unsafe fn find_fit(
  algorithm: FitAlgorithm,
  head: *mut BlockHeader,
  cursor: *mut BlockHeader,
  size: usize,
) -> *mut BlockHeader {
  unsafe {
    let order = if algorithm == FitAlgorithm::Next && !cursor.is_null() {
      let resume = (*cursor).next;
      Walk::new(resume, ptr::null_mut()).chain(Walk::new(head, resume))
    } else {
      Walk::new(head, ptr::null_mut()).chain(Walk::new(ptr::null_mut(), ptr::null_mut()))
    };

    let rule = algorithm.rule();
    let mut chosen: *mut BlockHeader = ptr::null_mut();

    for block in order {
      let candidate = &*block;
      if !candidate.is_free() || candidate.capacity < size {
        continue;
      }

      let better = chosen.is_null()
        || match rule {
          Rule::FirstMatch => false,
          Rule::Smallest => candidate.capacity < (*chosen).capacity,
          Rule::Largest => candidate.capacity > (*chosen).capacity,
        };

      if better {
        chosen = block;
        if rule == Rule::FirstMatch {
          break;
        }
      }
    }

    chosen
  }
}

#[cfg(test)]
mod tests {
  use std::mem;

  use super::*;
  use crate::block::{HEADER_SIZE, MIN_CAPACITY};

  /// Lays out blocks of the given `(capacity, free)` shape back to back.
  struct Layout {
    _memory: Vec<usize>,
    blocks: Vec<*mut BlockHeader>,
  }

  impl Layout {
    fn new(shape: &[(usize, bool)]) -> Self {
      let total: usize = shape.iter().map(|(capacity, _)| HEADER_SIZE + capacity).sum();
      let mut memory = vec![0usize; total / mem::size_of::<usize>()];
      let mut blocks: Vec<*mut BlockHeader> = Vec::new();
      let mut addr = memory.as_mut_ptr().cast::<u8>();

      unsafe {
        for &(capacity, free) in shape {
          let prev = blocks.last().copied().unwrap_or(ptr::null_mut());
          let block = BlockHeader::write(addr, capacity, prev, ptr::null_mut());
          if !free {
            (*block).mark_used(capacity);
          }
          if !prev.is_null() {
            (*prev).next = block;
          }
          blocks.push(block);
          addr = addr.add(HEADER_SIZE + capacity);
        }
      }

      Self { _memory: memory, blocks }
    }

    fn head(&self) -> *mut BlockHeader {
      self.blocks[0]
    }
  }

  const SMALL: usize = 2 * MIN_CAPACITY;
  const LARGE: usize = 7 * MIN_CAPACITY;
  const MEDIUM: usize = 4 * MIN_CAPACITY;
  const PAD: usize = MIN_CAPACITY;

  fn mixed() -> Layout {
    Layout::new(&[
      (SMALL, true),
      (PAD, false),
      (LARGE, true),
      (PAD, false),
      (MEDIUM, true),
      (PAD, false),
    ])
  }

  #[test]
  fn test_first_fit_takes_first_fitting() {
    let layout = mixed();
    let found = unsafe { find_fit(FitAlgorithm::First, layout.head(), ptr::null_mut(), SMALL) };
    assert_eq!(found, layout.blocks[0]);

    let found = unsafe { find_fit(FitAlgorithm::First, layout.head(), ptr::null_mut(), SMALL + 1) };
    assert_eq!(found, layout.blocks[2]);
  }

  #[test]
  fn test_best_fit_takes_smallest() {
    let layout = mixed();
    let found = unsafe { find_fit(FitAlgorithm::Best, layout.head(), ptr::null_mut(), SMALL) };
    assert_eq!(found, layout.blocks[0]);

    let found = unsafe { find_fit(FitAlgorithm::Best, layout.head(), ptr::null_mut(), SMALL + 1) };
    assert_eq!(found, layout.blocks[4]);
  }

  #[test]
  fn test_worst_fit_takes_largest() {
    let layout = mixed();
    let found = unsafe { find_fit(FitAlgorithm::Worst, layout.head(), ptr::null_mut(), SMALL) };
    assert_eq!(found, layout.blocks[2]);
  }

  #[test]
  fn test_ties_go_to_lowest_address() {
    let layout = Layout::new(&[(MEDIUM, true), (PAD, false), (MEDIUM, true)]);
    for algorithm in [FitAlgorithm::Best, FitAlgorithm::Worst] {
      let found = unsafe { find_fit(algorithm, layout.head(), ptr::null_mut(), SMALL) };
      assert_eq!(found, layout.blocks[0], "{algorithm}");
    }
  }

  #[test]
  fn test_next_fit_resumes_after_cursor() {
    let layout = mixed();
    let cursor = layout.blocks[3];
    let found = unsafe { find_fit(FitAlgorithm::Next, layout.head(), cursor, SMALL) };
    assert_eq!(found, layout.blocks[4]);
  }

  #[test]
  fn test_next_fit_wraps_around() {
    let layout = mixed();
    let cursor = layout.blocks[5];
    let found = unsafe { find_fit(FitAlgorithm::Next, layout.head(), cursor, SMALL) };
    assert_eq!(found, layout.blocks[0]);

    // The cursor block itself is the last one visited.
    let cursor = layout.blocks[2];
    let found = unsafe { find_fit(FitAlgorithm::Next, layout.head(), cursor, LARGE) };
    assert_eq!(found, layout.blocks[2]);
  }

  #[test]
  fn test_no_fit() {
    let layout = mixed();
    for algorithm in FitAlgorithm::ALL {
      let found = unsafe { find_fit(algorithm, layout.head(), layout.blocks[1], LARGE + 1) };
      assert!(found.is_null(), "{algorithm}");
    }
  }

  #[test]
  fn test_parse_and_display() {
    for algorithm in FitAlgorithm::ALL {
      assert_eq!(algorithm.to_string().parse::<FitAlgorithm>(), Ok(algorithm));
    }
    assert_eq!("Best-Fit".parse::<FitAlgorithm>(), Ok(FitAlgorithm::Best));
    assert_eq!("worst_fit".parse::<FitAlgorithm>(), Ok(FitAlgorithm::Worst));
    assert!("random".parse::<FitAlgorithm>().is_err());
  }
}

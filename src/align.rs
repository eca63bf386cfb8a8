use std::mem;

/// Alignment of every block header and every data region handed out.
///
/// Headers only hold machine words, so this is the natural word alignment.
pub const ALIGNMENT: usize = mem::align_of::<usize>();

/// Rounds the given size up to the allocator [`ALIGNMENT`].
///
/// Unchecked; meant for constants. Use [`align_up`] for caller supplied sizes.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use fitalloc::align;
///
/// match mem::align_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Rounds `value` up to the allocator [`ALIGNMENT`], or `None` on overflow.
pub const fn align_up(value: usize) -> Option<usize> {
  match value.checked_add(ALIGNMENT - 1) {
    Some(bumped) => Some(bumped & !(ALIGNMENT - 1)),
    None => None,
  }
}

pub const fn is_aligned(addr: usize) -> bool {
  addr & (ALIGNMENT - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), align_up(size));
      }
    }
  }

  #[test]
  fn test_align_up_overflow() {
    assert_eq!(align_up(0), Some(0));
    assert_eq!(align_up(usize::MAX), None);
    assert_eq!(align_up(usize::MAX - ALIGNMENT + 1), Some(usize::MAX - ALIGNMENT + 1));
  }

  #[test]
  fn test_is_aligned() {
    assert!(is_aligned(0));
    assert!(is_aligned(ALIGNMENT * 3));
    assert!(!is_aligned(ALIGNMENT + 1));
  }
}

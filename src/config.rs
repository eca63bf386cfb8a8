use crate::{align, block::HEADER_SIZE, fit::FitAlgorithm};

/// Growth increment used when none is configured.
pub const DEFAULT_GROWTH: usize = 1024;

/// Smallest accepted growth increment: room for two headers.
pub const MIN_GROWTH: usize = 2 * HEADER_SIZE;

/// Initial settings of an [`Allocator`](crate::Allocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// Minimum number of bytes requested from the heap source per growth.
  pub growth_increment: usize,
  pub algorithm: FitAlgorithm,
  pub verbose: bool,
}

impl Config {
  pub const fn new() -> Self {
    Self {
      growth_increment: DEFAULT_GROWTH,
      algorithm: FitAlgorithm::First,
      verbose: false,
    }
  }

  pub const fn with_growth_increment(
    mut self,
    growth_increment: usize,
  ) -> Self {
    self.growth_increment = growth_increment;
    self
  }

  pub const fn with_algorithm(
    mut self,
    algorithm: FitAlgorithm,
  ) -> Self {
    self.algorithm = algorithm;
    self
  }

  pub const fn with_verbose(
    mut self,
    verbose: bool,
  ) -> Self {
    self.verbose = verbose;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}

/// Clamps a requested growth increment to [`MIN_GROWTH`] and rounds it to the
/// allocator alignment.
pub(crate) const fn effective_growth(size: usize) -> usize {
  if size < MIN_GROWTH {
    return MIN_GROWTH;
  }
  match align::align_up(size) {
    Some(aligned) => aligned,
    None => usize::MAX & !(align::ALIGNMENT - 1),
  }
}

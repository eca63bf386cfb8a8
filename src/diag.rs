//! Opt-in diagnostic output.
//!
//! Nothing is emitted unless verbose mode is on. Lines go to the configured
//! sink, or to the `log` facade under the `fitalloc` target when no sink is
//! set. Output is best effort: write errors are dropped.

use std::{fmt, io::Write};

pub(crate) const TARGET: &str = "fitalloc";

/// Writes one diagnostic line if verbose mode is on.
macro_rules! note {
  ($diag:expr, $($arg:tt)+) => {
    $diag.note(format_args!($($arg)+))
  };
}

pub(crate) use note;

pub(crate) struct Diagnostics {
  verbose: bool,
  sink: Option<Box<dyn Write + Send>>,
}

impl Diagnostics {
  pub const fn new(verbose: bool) -> Self {
    Self { verbose, sink: None }
  }

  pub fn is_verbose(&self) -> bool {
    self.verbose
  }

  pub fn set_verbose(
    &mut self,
    verbose: bool,
  ) {
    self.verbose = verbose;
    self.note(format_args!("verbose enabled"));
  }

  pub fn set_sink(
    &mut self,
    sink: Box<dyn Write + Send>,
  ) {
    self.sink = Some(sink);
  }

  pub fn note(
    &mut self,
    args: fmt::Arguments<'_>,
  ) {
    if !self.verbose {
      return;
    }

    match self.sink.as_mut() {
      Some(sink) => {
        let _ = writeln!(sink, "{args}");
      }
      None => log::debug!(target: TARGET, "{args}"),
    }
  }
}

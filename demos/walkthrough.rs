use std::{io, io::Read};

use clap::Parser;
use fitalloc::{Allocator, Config, FitAlgorithm, Sbrk};

/// Steps through a scripted allocation sequence on the program break.
#[derive(Debug, Parser)]
struct Args {
  /// Placement policy: first, best, worst or next.
  #[arg(short, long, default_value_t = FitAlgorithm::First)]
  algorithm: FitAlgorithm,

  /// Minimum number of bytes requested per heap growth.
  #[arg(short, long, default_value_t = fitalloc::DEFAULT_GROWTH)]
  min_growth: usize,

  /// Print allocator diagnostics to stderr.
  #[arg(short, long)]
  verbose: bool,

  /// Wait for ENTER between steps (handy with `pmap` or `gdb`).
  #[arg(short, long)]
  pause: bool,
}

fn block_until_enter_pressed(pause: bool) {
  if pause {
    println!("\n>>> Press ENTER to continue...");
    let _ = io::stdin().bytes().next();
  }
}

fn show(
  label: &str,
  allocator: &Allocator<Sbrk>,
  pause: bool,
) {
  println!("\n[{}] program break = {:?}", label, Sbrk::program_break());
  println!("{}", allocator.dump());
  block_until_enter_pressed(pause);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let args = Args::parse();

  let config = Config::new()
    .with_algorithm(args.algorithm)
    .with_growth_increment(args.min_growth)
    .with_verbose(args.verbose);

  // SAFETY: this program never relies on memory above the break it claims.
  let mut allocator = Allocator::with_config(unsafe { Sbrk::new() }, config);
  allocator.set_log_sink(io::stderr());

  println!("fit algorithm: {}, growth increment: {}", allocator.algorithm(), allocator.set_minimum_growth(0));
  println!("[start] program break = {:?}", Sbrk::program_break());

  let first = allocator.allocate(4)?;
  let second = allocator.allocate(12)?;
  let third = allocator.allocate(200)?;
  let fourth = allocator.allocate(32)?;
  show("1: four allocations", &allocator, args.pause);

  unsafe {
    allocator.release(first);
    allocator.release(third);
  }
  show("2: released the first and third block", &allocator, args.pause);

  let fifth = allocator.allocate(2)?;
  println!("fifth block reuses the first one? {}", fifth == first);
  show("3: small allocation", &allocator, args.pause);

  let name = allocator.duplicate_string(c"walkthrough")?;
  let grown = unsafe { allocator.reallocate(second, 600)? };
  show("4: string copy and a moving reallocation", &allocator, args.pause);

  let big = allocator.allocate(64 * 1024)?;
  show("5: 64 KiB allocation grows the heap", &allocator, args.pause);

  unsafe {
    allocator.release(Some(name));
    allocator.release(grown);
    allocator.release(fourth);
    allocator.release(fifth);
    allocator.release(big);
  }
  allocator.validate()?;
  show("6: everything released", &allocator, args.pause);

  unsafe { allocator.reset() };
  println!("\n[7] reset, program break = {:?}", Sbrk::program_break());

  Ok(())
}

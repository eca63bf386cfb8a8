use std::{ptr, ptr::NonNull, slice};

use fitalloc::{AllocError, Allocator, Arena, Config, FitAlgorithm, HEADER_SIZE, MIN_CAPACITY};

fn allocator(algorithm: FitAlgorithm) -> Allocator<Arena> {
  let config = Config::new().with_growth_increment(2048).with_algorithm(algorithm);
  Allocator::with_config(Arena::new(256 * 1024), config)
}

fn alloc(
  allocator: &mut Allocator<Arena>,
  size: usize,
) -> NonNull<u8> {
  allocator.allocate(size).unwrap().unwrap()
}

fn assert_invariants(allocator: &Allocator<Arena>) {
  allocator.validate().unwrap();

  let blocks: Vec<_> = allocator.blocks().collect();
  for pair in blocks.windows(2) {
    assert!(pair[0].header < pair[1].header);
    assert!(!(pair[0].is_free() && pair[1].is_free()));
  }
  for info in &blocks {
    assert!(info.capacity >= info.size);
  }
}

#[test]
fn test_fit_policies_on_same_layout() {
  let expected = [
    (FitAlgorithm::First, 0),
    (FitAlgorithm::Best, 0),
    (FitAlgorithm::Worst, 1),
    (FitAlgorithm::Next, 0),
  ];

  for (algorithm, winner) in expected {
    let mut allocator = allocator(FitAlgorithm::First);

    let small = alloc(&mut allocator, 2 * MIN_CAPACITY);
    alloc(&mut allocator, MIN_CAPACITY);
    let large = alloc(&mut allocator, 8 * MIN_CAPACITY);
    alloc(&mut allocator, MIN_CAPACITY);
    let rest = allocator.blocks().last().unwrap().capacity;
    alloc(&mut allocator, rest);

    unsafe {
      allocator.release(Some(small));
      allocator.release(Some(large));
    }
    allocator.set_fit_algorithm(algorithm);

    let chosen = alloc(&mut allocator, MIN_CAPACITY);
    assert_eq!(chosen, [small, large][winner], "{algorithm}");
    assert_invariants(&allocator);
  }
}

#[test]
fn test_interleaved_workload() {
  for algorithm in FitAlgorithm::ALL {
    let mut allocator = allocator(algorithm);
    let mut live = Vec::new();

    for round in 0..50usize {
      for i in 0..6 {
        let size = 1 + (round * 37 + i * 101) % 700;
        let data = alloc(&mut allocator, size);
        unsafe { ptr::write_bytes(data.as_ptr(), (round + i) as u8, size) };
        live.push((data, size, (round + i) as u8));
      }

      // Drop every other survivor, oldest first.
      let mut index = 0;
      live.retain(|&(data, size, tag)| {
        index += 1;
        if index % 2 == 0 {
          return true;
        }
        let bytes = unsafe { slice::from_raw_parts(data.as_ptr(), size) };
        assert!(bytes.iter().all(|&b| b == tag));
        unsafe { allocator.release(Some(data)) };
        false
      });

      assert_invariants(&allocator);
    }

    for (data, _, _) in live.drain(..) {
      unsafe { allocator.release(Some(data)) };
    }

    let blocks: Vec<_> = allocator.blocks().collect();
    assert_eq!(blocks.len(), 1, "{algorithm}");
    assert_eq!(blocks[0].capacity, allocator.heap_size() - HEADER_SIZE);
  }
}

#[test]
fn test_realloc_chain_preserves_prefix() {
  let mut allocator = allocator(FitAlgorithm::Best);

  let mut data = alloc(&mut allocator, 8);
  unsafe { ptr::copy_nonoverlapping(b"fitalloc".as_ptr(), data.as_ptr(), 8) };

  for size in [16, 100, 1000, 5000] {
    data = unsafe { allocator.reallocate(Some(data), size) }.unwrap().unwrap();
    let prefix = unsafe { slice::from_raw_parts(data.as_ptr(), 8) };
    assert_eq!(prefix, b"fitalloc");
    assert_invariants(&allocator);
  }

  assert_eq!(allocator.stats().used_blocks, 1);
  assert_eq!(allocator.stats().used_bytes, 5000);
}

#[test]
fn test_strings_and_zeroed_arrays() {
  let mut allocator = allocator(FitAlgorithm::Worst);

  let name = allocator.duplicate_string(c"block list").unwrap();
  let table = allocator.zero_allocate(32, 4).unwrap().unwrap();

  let copied = unsafe { std::ffi::CStr::from_ptr(name.as_ptr().cast()) };
  assert_eq!(copied, c"block list");
  let zeros = unsafe { slice::from_raw_parts(table.as_ptr(), 128) };
  assert!(zeros.iter().all(|&b| b == 0));
  assert_invariants(&allocator);
}

#[test]
fn test_out_of_memory_is_recoverable() {
  let config = Config::new().with_growth_increment(1024);
  let mut allocator = Allocator::with_config(Arena::new(2048), config);

  let a = alloc(&mut allocator, 900);
  alloc(&mut allocator, 900);
  assert!(matches!(allocator.allocate(900), Err(AllocError::OutOfMemory { .. })));
  assert_invariants(&allocator);

  unsafe { allocator.release(Some(a)) };
  assert_eq!(alloc(&mut allocator, 900), a);
}

#[test]
fn test_reset_between_scenarios() {
  let mut allocator = allocator(FitAlgorithm::Next);

  for _ in 0..3 {
    for size in [10, 20, 30, 4000] {
      alloc(&mut allocator, size);
    }
    assert!(allocator.heap_size() > 0);
    assert_invariants(&allocator);

    unsafe { allocator.reset() };
    assert_eq!(allocator.blocks().count(), 0);
    assert_eq!(allocator.source().used(), 0);
    assert_eq!(allocator.low_water_mark(), allocator.high_water_mark());
  }
}

#[test]
fn test_dump_mentions_every_block() {
  let mut allocator = allocator(FitAlgorithm::First);
  alloc(&mut allocator, 10);
  let b = alloc(&mut allocator, 20);
  alloc(&mut allocator, 30);
  unsafe { allocator.release(Some(b)) };

  let dump = allocator.dump().to_string();
  let rows = dump.lines().filter(|line| line.ends_with("used") || line.ends_with("free"));

  assert_eq!(rows.count(), allocator.blocks().count());
}

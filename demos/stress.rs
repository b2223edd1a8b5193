//! Randomized allocate/free stress driver.
//!
//! Ported from `original_source/performance/stress_test.c`: a fixed-size
//! array of outstanding pointers, each iteration either frees a live slot
//! or allocates a random-sized block into an empty one. Uses `rand`
//! rather than a hand-rolled PRNG, matching the `rand` dev-dependency the
//! sibling `martician1-rusty_malloc` example carries for its own fuzz-ish
//! tests.

use fitheap::Heap;
use rand::Rng;

const SLOTS: usize = 1100;
const ITERATIONS: usize = 200_000;
const MAX_ALLOC_BYTES: usize = 10_000;
// Large enough to host ~1100 concurrent ~10 KB blocks, per spec section 6.
const REGION_SIZE: usize = 16 * 1024 * 1024;

fn main() {
  tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

  let heap = Heap::<REGION_SIZE>::new();
  heap.init();

  let mut slots: Vec<Option<*mut u8>> = vec![None; SLOTS];
  let mut rng = rand::thread_rng();

  for _ in 0..ITERATIONS {
    let idx = rng.gen_range(0..SLOTS);
    match slots[idx] {
      Some(ptr) => {
        heap.deallocate(ptr);
        slots[idx] = None;
      }
      None => {
        let size = rng.gen_range(3..MAX_ALLOC_BYTES);
        if let Some(ptr) = heap.allocate(size) {
          slots[idx] = Some(ptr.as_ptr());
        }
      }
    }
  }

  for slot in slots.into_iter().flatten() {
    heap.deallocate(slot);
  }

  println!("done, final fragmentation = {:.3}", heap.fragmentation());
  assert!(!heap.leak_check(), "stress run left the heap in a leaked state");
}

//! Multi-threaded workload matching `spec.md` §8 scenario 5: several
//! threads run a 20% insert / 79% lookup / 1% enumerate mix of randomly
//! generated even-valued pointers against a shared map, and every value
//! observed back out must be one of those originally-inserted even values.
//! An odd value, or any value never generated by this test, means a write
//! was lost or a stale table was read — exactly the corruption the
//! redirect/migration protocol and the deferred-free service exist to rule
//! out.
//!
//! The full-size run (growing the map past the original scenario's
//! 1,000,000-entry target) is gated behind the `slow` feature; the default
//! `cargo test` run exercises the same workload shape at a much smaller
//! target size.

use std::sync::Arc;
use std::sync::atomic::AtomicIsize;
use std::sync::atomic::Ordering;
use std::thread;

use cxhash::CMap;

/// xorshift64* — fast, deterministic, good enough for a workload generator.
/// No external dependency pulled in just to produce test inputs.
struct Rng(u64);

impl Rng {
  fn new(seed: u64) -> Self {
    Self(seed | 1)
  }

  fn next_u64(&mut self) -> u64 {
    let mut x = self.0;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    self.0 = x;
    x.wrapping_mul(0x2545_F491_4F6C_DD1D)
  }
}

fn run(target_size: usize, thread_count: usize) {
  let map: Arc<CMap> = Arc::new(CMap::new());
  // Distinct, monotonically increasing hashes: never `NO_HASH` (starts at 1).
  let next_hash = Arc::new(AtomicIsize::new(1));

  let handles: Vec<_> = (0..thread_count)
    .map(|thread_id| {
      let map = Arc::clone(&map);
      let next_hash = Arc::clone(&next_hash);

      thread::spawn(move || {
        let mut rng = Rng::new(0x9E37_79B9_7F4A_7C15 ^ thread_id as u64);

        while map.get_size() < target_size {
          match rng.next_u64() % 100 {
            // 20%: insert a fresh, distinct, even-valued pointer.
            0..=19 => {
              let hash = next_hash.fetch_add(1, Ordering::Relaxed);
              let value = even_value(&mut rng);
              let _ = map.insert(hash, value);
            }
            // 79%: look up some already-claimed hash; any value seen must
            // be even (or `0` for a since-removed/not-yet-landed entry).
            20..=98 => {
              let claimed = next_hash.load(Ordering::Relaxed);

              if claimed > 1 {
                let hash = 1 + (rng.next_u64() % (claimed as u64 - 1)) as isize;
                let value = map.lookup(hash);
                assert_eq!(value & 1, 0, "observed an odd value: corruption or lost update");
              }
            }
            // 1%: enumerate, checking every live value along the way.
            _ => {
              let mut enumerator = map.enumerate();

              loop {
                match enumerator.next() {
                  Ok(Some((_hash, value))) => {
                    assert_eq!(value & 1, 0, "observed an odd value during enumeration");
                  }
                  Ok(None) => break,
                  // A concurrent migration landed mid-scan; stop this pass.
                  Err(_canceled) => break,
                }
              }
            }
          }
        }
      })
    })
    .collect();

  for handle in handles {
    handle.join().unwrap();
  }

  assert!(map.get_size() >= target_size);
}

/// A nonzero, even value well below `usize::MAX` (`REDIRECT`) so it can
/// never collide with either reserved sentinel.
fn even_value(rng: &mut Rng) -> usize {
  let raw = (rng.next_u64() % (1 << 40)) as usize & !1usize;
  if raw == 0 { 2 } else { raw }
}

#[test]
fn concurrent_insert_lookup_enumerate_workload() {
  run(1 << 12, 8);
}

#[cfg_attr(not(feature = "slow"), ignore = "enable the 'slow' feature to run the full-size stress test")]
#[test]
fn concurrent_insert_lookup_enumerate_workload_at_scale() {
  run(1 << 20, 32);
}

//! A lock-free concurrent hash map keyed by signed machine-word hashes,
//! holding opaque pointer-sized values.
//!
//! `cxhash` provides [`CMap`], a concurrent hash map that transparently
//! grows: multiple threads may insert, remove, look up, and enumerate
//! entries without coarse locking, and progress of any one operation never
//! requires the others to quiesce. A companion [`PArray`] applies the same
//! redirect-steered migration idea to a simpler append-only pointer array.
//!
//! # Overview
//!
//! `CMap` stores `(hash, value)` pairs where both are machine words: the
//! hash is a signed integer the caller has already hashed its key into, and
//! the value is an opaque `usize` the map never dereferences, copies, or
//! frees. Once a table's load factor crosses one half, the next insertion
//! installs a larger table and cooperatively migrates the live entries into
//! it while concurrent readers and writers keep operating — a thread that
//! encounters a slot mid-migration helps finish the migration rather than
//! blocking on it.
//!
//! # Usage
//!
//! ```
//! use cxhash::CMap;
//!
//! let map: CMap = CMap::new();
//!
//! map.insert(1, 0x10).unwrap();
//! assert_eq!(map.lookup(1), 0x10);
//! assert_eq!(map.insert(1, 0x20), Err(cxhash::MapError::Exists));
//!
//! map.put(1, 0x20).unwrap();
//! assert_eq!(map.lookup(1), 0x20);
//!
//! map.remove(1, 0x20).unwrap();
//! assert_eq!(map.lookup(1), 0);
//! ```
//!
//! # Configuration
//!
//! `CMap<C>` is generic over the memory reclamation strategy used to free
//! retired tables once a migration has moved past them; see [`reclaim`] for
//! the available backends. The default, [`CMap::new`], uses the `sdd`-backed
//! collector when the `sdd` feature is enabled (the default) and falls back
//! to a collector that leaks retired tables otherwise:
//!
//! ```
//! use cxhash::CMap;
//! use cxhash::reclaim::collector::Leak;
//!
//! let map: CMap<Leak> = CMap::new();
//! map.insert(1, 0x10).unwrap();
//! ```
//!
//! Initial capacity is configured at construction time through
//! [`CMap::with_capacity`], rounded up to a power of two and clamped to the
//! range <code>[Capacity::MIN]..=[Capacity::MAX]</code>. Unlike a
//! fixed-capacity slab, `CMap` always grows past its initial capacity as
//! needed — there is no "full" state.
//!
//! # Concurrency
//!
//! All operations on [`CMap`] are thread-safe and lock-free:
//!
//! ```no_run
//! use cxhash::CMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map: Arc<CMap> = Arc::new(CMap::new());
//!
//! let handles: Vec<_> = (0..4)
//!   .map(|thread_id| {
//!     let map = Arc::clone(&map);
//!     thread::spawn(move || {
//!       for i in 1..100 {
//!         let hash = thread_id * 1000 + i;
//!         map.insert(hash, 0x10).unwrap();
//!         map.remove(hash, 0x10).unwrap();
//!       }
//!     })
//!   })
//!   .collect();
//!
//! for handle in handles {
//!   handle.join().unwrap();
//! }
//! ```
//!
//! ## Memory Reclamation
//!
//! Tables retired by a migration are reclaimed through the collector
//! selected by `C` (see [`reclaim`]). This ensures concurrent readers can
//! safely keep dereferencing a table they read before it was superseded,
//! even while another thread has already moved on to its successor.
//!
//! # Validation
//!
//! Every entry point rejects `hash == 0` (the reserved sentinel meaning
//! "never used") and `value` equal to `0` or `usize::MAX` (the reserved
//! "empty"/"redirected" sentinels, the latter doubling as the public
//! `INVALID_POINTER` value) with [`MapError::Invalid`].
//!
//! [ABA problem]: https://en.wikipedia.org/wiki/ABA_problem

mod array;
mod enumerator;
mod error;
mod map;
mod padded;
mod params;
mod sync;
mod table;

pub mod reclaim;

pub use self::array::ArrayEnumerator;
pub use self::array::PArray;
pub use self::enumerator::Enumerator;
pub use self::error::ArrayError;
pub use self::error::EnumError;
pub use self::error::MapError;
pub use self::map::CMap;
pub use self::params::CACHE_LINE;
pub use self::params::Capacity;
pub use self::table::NO_HASH;
pub use self::table::NO_POINTER;
pub use self::table::REDIRECT as INVALID_POINTER;

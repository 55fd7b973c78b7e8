//! The public concurrent hash map: two table pointers, migration
//! orchestration, and sentinel-validated entry points.

use core::marker::PhantomData;
use core::ptr;

use crate::enumerator::Enumerator;
use crate::error::MapError;
use crate::params::Capacity;
use crate::reclaim::CollectorWeak;
use crate::sync::atomic::AtomicPtr;
use crate::sync::atomic::Ordering;
use crate::table::InsertError;
use crate::table::NO_HASH;
use crate::table::NO_POINTER;
use crate::table::REDIRECT;
use crate::table::RemoveError;
use crate::table::Table;

#[cfg(feature = "sdd")]
pub(crate) type DefaultCollector = crate::reclaim::collector::Sdd;

#[cfg(not(feature = "sdd"))]
pub(crate) type DefaultCollector = crate::reclaim::collector::Leak;

/// A lock-free concurrent hash map keyed by signed machine-word hashes,
/// holding opaque pointer-sized values.
///
/// `CMap` transparently grows: once a table crosses its load-factor cap
/// (half capacity), the next insertion installs a larger table and
/// cooperatively migrates live entries into it while concurrent readers and
/// writers keep operating. See the crate documentation for the full
/// protocol.
///
/// `C` selects the reclamation strategy used to free retired tables; see
/// [`reclaim`](crate::reclaim) for the available backends. The default
/// depends on which of this crate's features are enabled.
///
/// # Validation
///
/// Every entry point rejects `hash == 0` (the reserved `NO_HASH` sentinel)
/// and `value` equal to `0` (`NO_POINTER`) or `usize::MAX` (`REDIRECT`, which
/// doubles as the public `INVALID_POINTER` sentinel) with
/// [`MapError::Invalid`].
///
/// # Examples
///
/// ```
/// use cxhash::CMap;
///
/// let map: CMap = CMap::new();
///
/// map.insert(1, 0x10).unwrap();
/// assert_eq!(map.lookup(1), 0x10);
/// assert_eq!(map.insert(1, 0x20), Err(cxhash::MapError::Exists));
///
/// map.remove(1, 0x10).unwrap();
/// assert_eq!(map.lookup(1), 0);
/// ```
pub struct CMap<C = DefaultCollector>
where
  C: CollectorWeak,
{
  current: AtomicPtr<Table>,
  next: AtomicPtr<Table>,
  phantom: PhantomData<C>,
}

// SAFETY: all mutable state lives behind `AtomicPtr`/`Table`'s own atomics;
// `C` is a zero-sized marker selecting a reclamation strategy, never stored.
unsafe impl<C: CollectorWeak> Send for CMap<C> {}
unsafe impl<C: CollectorWeak> Sync for CMap<C> {}

impl<C: CollectorWeak> Default for CMap<C> {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl<C: CollectorWeak> CMap<C> {
  /// Creates a map with the default initial capacity.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::with_capacity(Capacity::DEF.as_usize())
  }

  /// Creates a map with at least `capacity_hint` slots (rounded up to a
  /// power of two, clamped to a sane range).
  #[must_use]
  pub fn with_capacity(capacity_hint: usize) -> Self {
    let table = alloc_table(Capacity::new(capacity_hint));

    Self {
      current: AtomicPtr::new(table),
      next: AtomicPtr::new(table),
      phantom: PhantomData,
    }
  }

  /// Returns the capacity of the current table. A snapshot: concurrent
  /// migration may change it immediately after this call returns.
  #[must_use]
  pub fn get_size(&self) -> usize {
    let _guard = C::guard();

    // SAFETY: `current` always points at a live `Table`; the guard pins
    // this thread for the duration of the dereference.
    unsafe { &*self.current.load(Ordering::Acquire) }
      .capacity()
      .as_usize()
  }

  /// Looks up `hash`, returning its value or `0` (`NO_POINTER`) if absent.
  ///
  /// # Panics
  ///
  /// In debug builds, panics if `hash == 0`.
  #[must_use]
  pub fn lookup(&self, hash: isize) -> usize {
    debug_assert_ne!(hash, NO_HASH, "hash must not be the NO_HASH sentinel");

    let _guard = C::guard();
    let mut p = self.current.load(Ordering::Acquire);

    loop {
      // SAFETY: `p` was read from `current`/`next` under a live guard and
      // is never freed while any guard pinned before its retirement
      // remains alive.
      let value = unsafe { &*p }.lookup(hash);

      if value != REDIRECT {
        return value;
      }

      self.migrate(p);
      p = self.current.load(Ordering::Acquire);
    }
  }

  /// Add-if-absent. Fails with [`MapError::Exists`] if `hash` is already
  /// present.
  pub fn insert(&self, hash: isize, value: usize) -> Result<(), MapError> {
    self.validate(hash, value)?;

    let _guard = C::guard();
    let mut p = self.current.load(Ordering::Acquire);

    loop {
      // SAFETY: see `lookup`.
      let table = unsafe { &*p };

      // Mirrors the original: check the load factor and migrate+retry
      // *before* attempting a write, so a writer never keeps claiming slots
      // in a table that is already at its cap.
      if table.at_capacity() {
        self.migrate(p);
        p = self.current.load(Ordering::Acquire);
        continue;
      }

      match table.insert(hash, value) {
        Ok(()) => return Ok(()),
        Err(InsertError::Exists) => return Err(MapError::Exists),
        Err(InsertError::Redirect) => {
          self.migrate(p);
          p = self.current.load(Ordering::Acquire);
        }
      }
    }
  }

  /// Upsert: publishes `value` for `hash` regardless of prior presence.
  pub fn put(&self, hash: isize, value: usize) -> Result<(), MapError> {
    self.validate(hash, value)?;

    let _guard = C::guard();
    let mut p = self.current.load(Ordering::Acquire);

    loop {
      // SAFETY: see `lookup`.
      let table = unsafe { &*p };

      // See `insert`: check before write, not after.
      if table.at_capacity() {
        self.migrate(p);
        p = self.current.load(Ordering::Acquire);
        continue;
      }

      match table.put(hash, value) {
        Ok(()) => return Ok(()),
        Err(_redirect) => {
          self.migrate(p);
          p = self.current.load(Ordering::Acquire);
        }
      }
    }
  }

  /// Value-conditioned remove. Fails with [`MapError::NotFound`] if `hash`
  /// is absent or its current value does not equal `value`, or with
  /// [`MapError::Invalid`] if `hash`/`value` is a reserved sentinel.
  pub fn remove(&self, hash: isize, value: usize) -> Result<(), MapError> {
    self.validate(hash, value)?;

    let _guard = C::guard();
    let mut p = self.current.load(Ordering::Acquire);

    loop {
      // SAFETY: see `lookup`.
      let table = unsafe { &*p };

      match table.remove(hash, value) {
        Ok(()) => return Ok(()),
        Err(RemoveError::NotFound) => return Err(MapError::NotFound),
        Err(RemoveError::Redirect) => {
          self.migrate(p);
          p = self.current.load(Ordering::Acquire);
        }
      }
    }
  }

  /// Creates a best-effort enumerator over the map's current contents.
  #[must_use]
  pub fn enumerate(&self) -> Enumerator<'_, C> {
    Enumerator::new(self)
  }

  /// Returns the first `(hash, value)` pair a fresh enumeration yields, or
  /// `None` if the map is empty.
  #[must_use]
  pub fn lookup_any(&self) -> Option<usize> {
    loop {
      let mut enumerator = self.enumerate();

      match enumerator.next() {
        Ok(Some((_hash, value))) => return Some(value),
        Ok(None) => return None,
        // A fresh enumerator cannot yet have observed a migration, but if
        // one lands on its very first step, just start over.
        Err(_canceled) => continue,
      }
    }
  }

  /// Counts live entries. Best-effort: retries the whole enumeration if a
  /// migration is observed partway through.
  #[must_use]
  pub fn count(&self) -> usize {
    'restart: loop {
      let mut enumerator = self.enumerate();
      let mut n: usize = 0;

      loop {
        match enumerator.next() {
          Ok(Some(_)) => n += 1,
          Ok(None) => return n,
          Err(_canceled) => continue 'restart,
        }
      }
    }
  }

  fn validate(&self, hash: isize, value: usize) -> Result<(), MapError> {
    if hash == NO_HASH || value == NO_POINTER || value == REDIRECT {
      return Err(MapError::Invalid);
    }

    Ok(())
  }

  /// Drives one round of the migration protocol starting from the table
  /// the caller was operating on (`p`). Returns once `current` is known to
  /// point past `p` — the caller re-reads `current` and retries.
  pub(crate) fn migrate(&self, p: *mut Table) {
    let guard = C::guard();

    // SAFETY: `p` is still reachable (the caller just read it from
    // `current`/`next`), so it has not been retired yet.
    let p_ref = unsafe { &*p };

    // Step 1/2: read `next`; install a fresh table if no one has yet.
    let mut q = self.next.load(Ordering::Acquire);

    if ptr::eq(q, p) {
      let new_capacity = p_ref.capacity().doubled();
      let candidate = alloc_table(new_capacity);

      match self
        .next
        .compare_exchange(p, candidate, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => q = candidate,
        Err(observed) => {
          // Someone else already installed a successor. Our allocation
          // was never published to another thread, so free it directly.
          //
          // SAFETY: `candidate` came from `alloc_table` immediately above
          // and has not been shared.
          drop(unsafe { Box::from_raw(candidate) });
          q = observed;
        }
      }
    }

    // Step 3: cooperative copy.
    //
    // SAFETY: `q` was just published via a winning CAS above, or read from
    // `next`/`current`, so it is reachable and not yet retired.
    let q_ref = unsafe { &*q };

    for index in 0..p_ref.len() {
      p_ref.migrate_slot_into(index, q_ref);
    }

    // Step 4: publish.
    if self
      .current
      .compare_exchange(p, q, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      retire::<C>(&guard, p);
    }
  }

  #[inline]
  pub(crate) fn current(&self) -> *mut Table {
    self.current.load(Ordering::Acquire)
  }
}

impl<C: CollectorWeak> Drop for CMap<C> {
  fn drop(&mut self) {
    // `&mut self` already guarantees no concurrent readers remain, so
    // tables are freed directly rather than through the deferred-free
    // service — this is `done()` made unconditional by ownership.
    let current = *self.current.get_mut();
    let next = *self.next.get_mut();

    // SAFETY: `current` always points at a live, uniquely owned `Table`.
    drop(unsafe { Box::from_raw(current) });

    if !ptr::eq(current, next) {
      // SAFETY: `next` is distinct from `current` and likewise owned.
      drop(unsafe { Box::from_raw(next) });
    }
  }
}

fn alloc_table(capacity: Capacity) -> *mut Table {
  Box::into_raw(Box::new(Table::new(capacity)))
}

/// Hands a retired table to the collector for eventual reclamation at its
/// existing address — see [`CollectorWeak::retire`].
fn retire<C: CollectorWeak>(guard: &C::Guard, table: *mut Table) {
  // SAFETY: the caller just unlinked `table` from both `current` and
  // `next` via a winning CAS; no new reader can observe it from this map.
  // Readers that already hold this exact pointer from before the CAS may
  // still be dereferencing it, which is exactly what `C::retire` defers
  // against.
  let boxed = unsafe { Box::from_raw(table) };
  C::retire(guard, boxed);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scenario_basic_insert_lookup() {
    let map: CMap = CMap::with_capacity(4);
    map.insert(1, 0x10).unwrap();
    assert_eq!(map.lookup(1), 0x10);
    assert_eq!(map.lookup(2), NO_POINTER);
  }

  #[test]
  fn scenario_insert_existing_key() {
    let map: CMap = CMap::with_capacity(4);
    map.insert(1, 0x10).unwrap();
    map.insert(2, 0x20).unwrap();
    map.insert(3, 0x30).unwrap();
    assert_eq!(map.insert(2, 0x99), Err(MapError::Exists));
    assert_eq!(map.lookup(2), 0x20);
  }

  #[test]
  fn scenario_migration_grows_and_preserves_entries() {
    let map: CMap = CMap::with_capacity(4);

    for (hash, value) in [(1, 0x10), (2, 0x20), (3, 0x30), (4, 0x40)] {
      map.insert(hash, value).unwrap();
    }

    assert_eq!(map.get_size(), 8);

    for (hash, value) in [(1, 0x10), (2, 0x20), (3, 0x30), (4, 0x40)] {
      assert_eq!(map.lookup(hash), value);
    }
  }

  #[test]
  fn scenario_remove_then_reinsert() {
    let map: CMap = CMap::with_capacity(4);
    map.insert(1, 0x10).unwrap();
    assert_eq!(map.remove(1, 0x20), Err(MapError::NotFound));
    map.remove(1, 0x10).unwrap();
    assert_eq!(map.lookup(1), NO_POINTER);
    map.insert(1, 0x11).unwrap();
    assert_eq!(map.lookup(1), 0x11);
  }

  #[test]
  fn validation_rejects_sentinels() {
    let map: CMap = CMap::new();
    assert_eq!(map.insert(NO_HASH, 1), Err(MapError::Invalid));
    assert_eq!(map.insert(1, NO_POINTER), Err(MapError::Invalid));
    assert_eq!(map.insert(1, REDIRECT), Err(MapError::Invalid));
  }

  #[test]
  fn remove_also_rejects_sentinels() {
    let map: CMap = CMap::new();
    assert_eq!(map.remove(NO_HASH, 1), Err(MapError::Invalid));
    assert_eq!(map.remove(1, NO_POINTER), Err(MapError::Invalid));
    assert_eq!(map.remove(1, REDIRECT), Err(MapError::Invalid));
  }

  #[test]
  fn put_overwrites_and_upserts() {
    let map: CMap = CMap::with_capacity(4);
    map.put(1, 0x10).unwrap();
    assert_eq!(map.lookup(1), 0x10);
    map.put(1, 0x20).unwrap();
    assert_eq!(map.lookup(1), 0x20);
  }

  #[test]
  fn count_and_lookup_any() {
    let map: CMap = CMap::with_capacity(4);
    assert_eq!(map.count(), 0);
    assert_eq!(map.lookup_any(), None);

    map.insert(1, 0x10).unwrap();
    map.insert(2, 0x20).unwrap();

    assert_eq!(map.count(), 2);
    assert!(matches!(map.lookup_any(), Some(0x10 | 0x20)));
  }

  #[test]
  fn done_frees_distinct_current_and_next() {
    let map: CMap = CMap::with_capacity(4);
    for i in 1..=4_isize {
      map.insert(i, i as usize).unwrap();
    }
    // `current` and `next` have diverged by now; dropping must free both.
    drop(map);
  }
}

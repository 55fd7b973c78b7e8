//! The companion growable pointer array (§4.7): append-only, no hashing, no
//! removal — the same redirect-steered migration idea as [`crate::table`]
//! and [`crate::map`] applied to a simpler layout.
//!
//! Unlike the hash table, a slot's *position* carries meaning (the `i`th
//! append must forever answer `get(i)`), so migration may not reinsert by
//! hash: it copies slot `i` of the old table into slot `i` of the new one,
//! verbatim. A single monotonic reservation counter lives on [`PArray`]
//! itself rather than inside a table, so an index survives any number of
//! doublings.

use core::marker::PhantomData;
use core::ptr;

use crate::error::ArrayError;
use crate::padded::CachePadded;
use crate::params::Capacity;
use crate::reclaim::CollectorWeak;
use crate::sync::atomic::AtomicPtr;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering;
use crate::table::NO_POINTER;
use crate::table::REDIRECT;

/// A fixed-capacity array of atomically-accessible pointer-sized slots.
struct ArrayTable {
  capacity: Capacity,
  entries: Box<[AtomicUsize]>,
}

impl ArrayTable {
  fn new(capacity: Capacity) -> Self {
    let mut entries = Vec::with_capacity(capacity.as_usize());
    entries.resize_with(capacity.as_usize(), || AtomicUsize::new(NO_POINTER));

    Self {
      capacity,
      entries: entries.into_boxed_slice(),
    }
  }

  #[inline]
  fn capacity(&self) -> usize {
    self.capacity.as_usize()
  }

  /// Claims slot `index`, previously reserved by the caller, for `value`.
  ///
  /// `Ok` on success; `Err` if the slot was already redirected to a
  /// successor table, in which case the caller must migrate and retry
  /// against the fresh `current`.
  fn try_write(&self, index: usize, value: usize) -> Result<(), ()> {
    match self.entries[index].compare_exchange(NO_POINTER, value, Ordering::AcqRel, Ordering::Acquire) {
      Ok(_) => Ok(()),
      Err(REDIRECT) => Err(()),
      // Only the thread that reserved `index` ever writes it, so no other
      // outcome is possible.
      Err(_) => unreachable!("array slot claimed by someone other than its reserving writer"),
    }
  }

  fn read_at(&self, index: usize) -> usize {
    self.entries[index].load(Ordering::Acquire)
  }

  /// Copies slot `index` from `self` into the same index of `target`, then
  /// installs `REDIRECT` — forcing any writer that reserved this index
  /// before migration began to retry against `target` instead. Unlike
  /// the hash table's tombstones, an array slot has no re-insertion
  /// semantics, so every slot (populated or not) is redirected.
  fn migrate_slot_into(&self, index: usize, target: &ArrayTable) {
    let mut value = self.entries[index].load(Ordering::Acquire);

    loop {
      if value == REDIRECT {
        return;
      }

      if value != NO_POINTER {
        target.entries[index].store(value, Ordering::Release);
      }

      match self.entries[index].compare_exchange(value, REDIRECT, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => return,
        // A concurrent writer raced our read with its reservation claim;
        // carry the value it just installed forward on the next pass.
        Err(observed) => value = observed,
      }
    }
  }
}

/// A lock-free, append-only, growable array of opaque pointer-sized values,
/// indexed by insertion order.
///
/// `PArray` shares the redirect/migration machinery of [`crate::CMap`] but
/// has no hashing, no removal, and no in-place update: `append` is the only
/// writer. `C` selects the reclamation strategy for retired backing tables,
/// exactly as for [`crate::CMap`].
///
/// # Examples
///
/// ```
/// use cxhash::PArray;
///
/// let array: PArray = PArray::new();
///
/// let i = array.append(0x10).unwrap();
/// let j = array.append(0x20).unwrap();
///
/// assert_eq!(array.get(i), 0x10);
/// assert_eq!(array.get(j), 0x20);
/// assert_eq!(array.count(), 2);
/// ```
pub struct PArray<C = crate::map::DefaultCollector>
where
  C: CollectorWeak,
{
  current: AtomicPtr<ArrayTable>,
  next: AtomicPtr<ArrayTable>,
  reserved: CachePadded<AtomicUsize>,
  phantom: PhantomData<C>,
}

// SAFETY: all mutable state lives behind atomics; `C` is a zero-sized
// marker, never stored.
unsafe impl<C: CollectorWeak> Send for PArray<C> {}
unsafe impl<C: CollectorWeak> Sync for PArray<C> {}

impl<C: CollectorWeak> Default for PArray<C> {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl<C: CollectorWeak> PArray<C> {
  /// Creates an array with the default initial capacity.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::with_capacity(Capacity::DEF.as_usize())
  }

  /// Creates an array with at least `capacity_hint` slots (rounded up to a
  /// power of two, clamped to a sane range).
  #[must_use]
  pub fn with_capacity(capacity_hint: usize) -> Self {
    let table = alloc_table(Capacity::new(capacity_hint));

    Self {
      current: AtomicPtr::new(table),
      next: AtomicPtr::new(table),
      reserved: CachePadded::new(AtomicUsize::new(0)),
      phantom: PhantomData,
    }
  }

  /// Returns the capacity of the current backing table. A snapshot.
  #[must_use]
  pub fn get_size(&self) -> usize {
    let _guard = C::guard();

    // SAFETY: `current` always points at a live `ArrayTable`.
    unsafe { &*self.current.load(Ordering::Acquire) }.capacity()
  }

  /// Appends `value`, returning the stable index it now occupies.
  pub fn append(&self, value: usize) -> Result<usize, ArrayError> {
    if value == NO_POINTER || value == REDIRECT {
      return Err(ArrayError::Invalid);
    }

    let _guard = C::guard();
    let index = self.reserved.fetch_add(1, Ordering::AcqRel);
    let mut p = self.current.load(Ordering::Acquire);

    loop {
      // SAFETY: `p` was just read from `current`/`next` under a live guard.
      let table = unsafe { &*p };

      if index >= table.capacity() {
        self.migrate(p);
        p = self.current.load(Ordering::Acquire);
        continue;
      }

      match table.try_write(index, value) {
        Ok(()) => return Ok(index),
        Err(()) => {
          self.migrate(p);
          p = self.current.load(Ordering::Acquire);
        }
      }
    }
  }

  /// Returns the value at `index`, or `0` (`NO_POINTER`) if it has not yet
  /// been appended (or is out of range of every table observed so far).
  #[must_use]
  pub fn get(&self, index: usize) -> usize {
    let _guard = C::guard();
    let mut p = self.current.load(Ordering::Acquire);

    loop {
      // SAFETY: see `append`.
      let table = unsafe { &*p };

      if index >= table.capacity() {
        return NO_POINTER;
      }

      let value = table.read_at(index);

      if value != REDIRECT {
        return value;
      }

      self.migrate(p);
      p = self.current.load(Ordering::Acquire);
    }
  }

  /// Number of values appended so far (including any still racing to
  /// finish their write). Best-effort under concurrent `append`.
  #[must_use]
  pub fn count(&self) -> usize {
    self.reserved.load(Ordering::Acquire)
  }

  /// Creates an in-order enumerator over this array's contents.
  #[must_use]
  pub fn enumerate(&self) -> ArrayEnumerator<'_, C> {
    ArrayEnumerator {
      array: self,
      _guard: C::guard(),
      index: 0,
    }
  }

  fn migrate(&self, p: *mut ArrayTable) {
    let guard = C::guard();

    // SAFETY: `p` is still reachable; the caller just read it.
    let p_ref = unsafe { &*p };

    let mut q = self.next.load(Ordering::Acquire);

    if ptr::eq(q, p) {
      let new_capacity = Capacity::new(p_ref.capacity()).doubled();
      let candidate = alloc_table(new_capacity);

      match self
        .next
        .compare_exchange(p, candidate, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => q = candidate,
        Err(observed) => {
          // SAFETY: `candidate` was never shared with another thread.
          drop(unsafe { Box::from_raw(candidate) });
          q = observed;
        }
      }
    }

    // SAFETY: `q` was just published, or read from `next`/`current`.
    let q_ref = unsafe { &*q };

    for index in 0..p_ref.capacity() {
      p_ref.migrate_slot_into(index, q_ref);
    }

    if self
      .current
      .compare_exchange(p, q, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      retire::<C>(&guard, p);
    }
  }

  #[inline]
  fn current(&self) -> *mut ArrayTable {
    self.current.load(Ordering::Acquire)
  }
}

impl<C: CollectorWeak> Drop for PArray<C> {
  fn drop(&mut self) {
    let current = *self.current.get_mut();
    let next = *self.next.get_mut();

    // SAFETY: `&mut self` guarantees exclusive access; both pointers are
    // always live, uniquely owned tables.
    drop(unsafe { Box::from_raw(current) });

    if !ptr::eq(current, next) {
      // SAFETY: `next` is distinct and likewise owned.
      drop(unsafe { Box::from_raw(next) });
    }
  }
}

fn alloc_table(capacity: Capacity) -> *mut ArrayTable {
  Box::into_raw(Box::new(ArrayTable::new(capacity)))
}

/// Hands a retired array table to the collector for eventual reclamation at
/// its existing address — see [`crate::reclaim::CollectorWeak::retire`].
fn retire<C: CollectorWeak>(guard: &C::Guard, table: *mut ArrayTable) {
  // SAFETY: the caller just unlinked `table` from both `current` and
  // `next` via a winning CAS; readers that already hold this exact pointer
  // from before the CAS may still be dereferencing it, which is exactly
  // what `C::retire` defers against.
  let boxed = unsafe { Box::from_raw(table) };
  C::retire(guard, boxed);
}

/// An in-order iterator over a [`PArray`]'s contents, created by
/// [`PArray::enumerate`].
///
/// Like [`crate::Enumerator`], this is best-effort: it observes the array
/// as of each `next()` call rather than a frozen snapshot, and may restart
/// if it runs into an in-progress migration.
pub struct ArrayEnumerator<'array, C>
where
  C: CollectorWeak,
{
  array: &'array PArray<C>,
  _guard: C::Guard,
  index: usize,
}

impl<'array, C> ArrayEnumerator<'array, C>
where
  C: CollectorWeak,
{
  /// Returns the next value in insertion order, or `None` once every
  /// reserved index up to the array's current `count()` has been visited.
  pub fn next(&mut self) -> Option<usize> {
    loop {
      let limit = self.array.count();

      if self.index >= limit {
        return None;
      }

      // SAFETY: `self._guard` has pinned this thread since creation.
      let table = unsafe { &*self.array.current() };
      let index = self.index;

      if index >= table.capacity() {
        self.array.migrate(self.array.current());
        continue;
      }

      let value = table.read_at(index);

      if value == REDIRECT {
        self.array.migrate(self.array.current());
        continue;
      }

      if value == NO_POINTER {
        // Reserved by a writer that has not yet published its value; spin
        // until it lands rather than skipping it out of order.
        core::hint::spin_loop();
        continue;
      }

      self.index += 1;
      return Some(value);
    }
  }
}

//! Capacity arithmetic shared by the table and the pointer array.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use crate::padded::CachePadded;
use crate::sync::atomic::AtomicUsize;

// -----------------------------------------------------------------------------
// Cache-line Properties
// -----------------------------------------------------------------------------

/// The size of a cache line in bytes.
///
/// This value is used to align table data structures to minimize false
/// sharing between threads. On most modern x86-64 systems, this is 64 bytes.
pub const CACHE_LINE: usize = size_of::<CachePadded<u8>>();

const _: () = assert!(
  CACHE_LINE.is_multiple_of(size_of::<AtomicUsize>()),
  "invalid params: `CACHE_LINE` must be a multiple of pointer width",
);

const _: () = assert!(
  CACHE_LINE.is_power_of_two(),
  "invalid params: `CACHE_LINE` must be a power of two",
);

// -----------------------------------------------------------------------------
// Capacity
// -----------------------------------------------------------------------------

/// A validated table capacity: a power of two, clamped to a sane range.
///
/// Unlike a fixed-capacity slab, the map and the pointer array both grow at
/// run time, so `Capacity` is a plain value rather than a compile-time
/// parameter — each migration computes a fresh one by doubling.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(usize);

impl Capacity {
  /// The minimum supported capacity: 4 entries.
  ///
  /// A capacity of 4 is the smallest power of two for which `max_live =
  /// capacity - capacity / 2` is still positive.
  pub const MIN: Self = Self(4);

  /// The maximum supported capacity: 2²⁷ entries.
  pub const MAX: Self = Self(1 << 27);

  /// The default capacity used when no size hint is given: 16 entries.
  pub const DEF: Self = Self(16);

  /// Creates a new `Capacity` from an arbitrary value.
  ///
  /// The value is rounded up to the nearest power of two and clamped to
  /// [`MIN`]`..=`[`MAX`].
  ///
  /// [`MIN`]: Self::MIN
  /// [`MAX`]: Self::MAX
  #[inline]
  #[must_use]
  pub const fn new(value: usize) -> Self {
    let Some(capacity) = value.checked_next_power_of_two() else {
      return Self::MAX;
    };

    if capacity < Self::MIN.0 {
      Self::MIN
    } else if capacity > Self::MAX.0 {
      Self::MAX
    } else {
      Self(capacity)
    }
  }

  /// Doubles this capacity, clamping at [`MAX`].
  ///
  /// [`MAX`]: Self::MAX
  #[inline]
  #[must_use]
  pub const fn doubled(self) -> Self {
    if self.0 >= Self::MAX.0 {
      Self::MAX
    } else {
      Self(self.0 << 1)
    }
  }

  /// Returns the capacity as a [`usize`].
  #[inline]
  #[must_use]
  pub const fn as_usize(self) -> usize {
    self.0
  }

  /// Returns `capacity - 1`, used as the probe mask.
  #[inline]
  #[must_use]
  pub const fn mask(self) -> usize {
    self.0 - 1
  }

  /// Returns the maximum number of live-plus-tombstoned entries this
  /// capacity admits before migration must be triggered: `capacity -
  /// capacity / 2`.
  #[inline]
  #[must_use]
  pub const fn max_live(self) -> usize {
    self.0 - self.0 / 2
  }
}

impl Debug for Capacity {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&self.0, f)
  }
}

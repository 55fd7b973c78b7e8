//! Public error types.
//!
//! `BUSY` from the error taxonomy is deliberately absent here: it marks a
//! `REDIRECT` observed mid-probe ([`crate::table::Redirect`]), is always
//! caught internally, drives migration, and the operation is retried. It
//! never reaches a caller.
//!
//! `NOMEM` is kept in both public enums for parity with the taxonomy this
//! crate's algorithms were distilled from, but allocating a new table uses
//! the global allocator the ordinary way (`Box::new`), which aborts the
//! process on exhaustion rather than returning an error — so in practice
//! these variants are not constructed.

use core::fmt;

/// Errors returned by [`CMap`] operations.
///
/// [`CMap`]: crate::CMap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapError {
  /// The hash was `NO_HASH`, or the value was `NO_POINTER`/`REDIRECT`.
  Invalid,
  /// `insert` found the key already present.
  Exists,
  /// `remove` did not find a slot matching both the hash and the value.
  NotFound,
  /// Allocating a larger table during migration failed.
  NoMem,
}

impl fmt::Display for MapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Invalid => "invalid hash or value",
      Self::Exists => "key already exists",
      Self::NotFound => "key or value not found",
      Self::NoMem => "allocation failed while growing the table",
    })
  }
}

impl core::error::Error for MapError {}

/// Errors returned by [`Enumerator::next`].
///
/// [`Enumerator::next`]: crate::Enumerator::next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnumError {
  /// A migration was observed mid-enumeration; the caller may restart.
  Canceled,
  /// Allocating a larger table during a forced migration failed.
  NoMem,
}

impl fmt::Display for EnumError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Canceled => "enumeration canceled by a concurrent migration",
      Self::NoMem => "allocation failed while growing the table",
    })
  }
}

impl core::error::Error for EnumError {}

/// Errors returned by [`PArray`](crate::PArray) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArrayError {
  /// The value was `NO_POINTER`/`REDIRECT`.
  Invalid,
}

impl fmt::Display for ArrayError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Invalid => "invalid value",
    })
  }
}

impl core::error::Error for ArrayError {}

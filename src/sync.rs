//! Indirection over the atomic primitives so the `loom` concurrency model
//! checker can intercept them in `tests/loom.rs`. Everywhere else this is a
//! zero-cost re-export of `core::sync::atomic`.

#[cfg(not(loom))]
pub(crate) mod atomic {
  pub(crate) use ::core::sync::atomic::AtomicIsize;
  pub(crate) use ::core::sync::atomic::AtomicPtr;
  pub(crate) use ::core::sync::atomic::AtomicUsize;
  pub(crate) use ::core::sync::atomic::Ordering;
}

#[cfg(loom)]
pub(crate) mod atomic {
  pub(crate) use ::loom::sync::atomic::AtomicIsize;
  pub(crate) use ::loom::sync::atomic::AtomicPtr;
  pub(crate) use ::loom::sync::atomic::AtomicUsize;
  pub(crate) use ::loom::sync::atomic::Ordering;
}

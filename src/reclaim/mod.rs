//! Memory reclamation backends for tables retired by [`crate::CMap`] and
//! [`crate::PArray`] migrations.
//!
//! [`CollectorWeak`] is the trait a reclamation strategy implements; see
//! [`collector`] for the concrete backends shipped with this crate.

mod traits;

pub mod collector;

pub use self::traits::Atomic;
pub use self::traits::Collector;
pub use self::traits::CollectorWeak;
pub use self::traits::Shared;

// -----------------------------------------------------------------------------
// Sanity Check
// -----------------------------------------------------------------------------

const _: () = <collector::Leak as CollectorWeak>::ASSERT_ATOMIC;

#[cfg(feature = "sdd")]
const _: () = <collector::Sdd as CollectorWeak>::ASSERT_ATOMIC;

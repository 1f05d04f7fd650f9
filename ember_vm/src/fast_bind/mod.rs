//! Specialized construction call sites.
//!
//! When a call site constructs an instance of a user type, the binder tries
//! to produce a [`FastCallSite`]: a guard on the type's version plus the
//! pre-resolved `__new__` and `__init__` steps. Sites are shared through a
//! cache partitioned by native layout, and any mutation of a type's
//! attributes (or a base's) bumps its version so stale sites miss.
//!
//! Types whose construction cannot be specialized are reported as
//! ineligible and the call site runs the general protocol in
//! [`crate::fallback`].

mod allocator;
mod builder;
mod cache;
mod fast_site;
mod nested;
mod stats;

pub use allocator::NativeAllocator;
pub use builder::{BindResult, FastBinder, IneligibleReason, fast_binder};
pub use cache::FastBindCache;
pub use fast_site::{AllocateDelegate, FastCallSite};
pub use nested::NestedInvokeAdapter;
pub use stats::{FastBindStats, StatsSnapshot};

use crate::error::BindError;

/// Largest argument count with a specialized site shape.
pub const SPECIALIZATION_CAP: usize = 5;

/// Argument count of a specialized site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Arity {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl Arity {
    #[inline]
    pub const fn count(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Arity {
    type Error = BindError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        Ok(match n {
            0 => Arity::Zero,
            1 => Arity::One,
            2 => Arity::Two,
            3 => Arity::Three,
            4 => Arity::Four,
            5 => Arity::Five,
            _ => {
                return Err(BindError::UnsupportedArity {
                    arity: n,
                    cap: SPECIALIZATION_CAP,
                });
            }
        })
    }
}

//! Call sites for Ember with specialized constructor binding.
//!
//! An [`InvokeSite`] caches one target per call expression. When the callee
//! is a user type, the [`fast_bind`] subsystem tries to pre-resolve the
//! type's `__new__` and `__init__` into a version-guarded [`FastCallSite`];
//! otherwise calls go through the general protocol in [`fallback`].
#![deny(unsafe_op_in_unsafe_fn)]

pub mod binder;
pub mod call_site;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod fast_bind;

pub use binder::{ArgKind, CallSignature, InvokeBinder, ReceiverKind};
pub use call_site::{FunctionTarget, InvokeSite, SiteTarget};
pub use config::FastBindConfig;
pub use context::CodeContext;
pub use error::{BindError, VmError, VmResult};
pub use fast_bind::{
    AllocateDelegate, Arity, BindResult, FastBindCache, FastBindStats, FastBinder, FastCallSite,
    IneligibleReason, NativeAllocator, NestedInvokeAdapter, SPECIALIZATION_CAP, StatsSnapshot,
    fast_binder,
};

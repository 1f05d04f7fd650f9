//! Adapters forwarding a construction step to a user callable.

use crate::binder::InvokeBinder;
use crate::call_site::InvokeSite;
use crate::context::CodeContext;
use crate::error::VmResult;
use ember_runtime::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::OnceLock;

/// Invokes a resolved `__new__` or `__init__` through its own call site.
///
/// The binder already has the receiver slot in front of the outer call's
/// arguments. The inner site is created on first use and keeps its own
/// cached target for the callable.
pub struct NestedInvokeAdapter {
    callable: Value,
    binder: InvokeBinder,
    site: OnceLock<InvokeSite>,
}

impl NestedInvokeAdapter {
    /// Adapter calling `callable` through its own site bound by `binder`.
    pub fn new(callable: Value, binder: InvokeBinder) -> Self {
        Self {
            callable,
            binder,
            site: OnceLock::new(),
        }
    }

    #[inline]
    pub fn callable(&self) -> &Value {
        &self.callable
    }

    #[inline]
    pub fn binder(&self) -> &InvokeBinder {
        &self.binder
    }

    /// Call with `receiver` followed by `args`.
    pub fn invoke(&self, ctx: &CodeContext, receiver: Value, args: &[Value]) -> VmResult<Value> {
        let site = self.site.get_or_init(|| InvokeSite::new(self.binder.clone()));
        let mut full: SmallVec<[Value; 6]> = SmallVec::with_capacity(args.len() + 1);
        full.push(receiver);
        full.extend(args.iter().cloned());
        site.invoke(ctx, &self.callable, &full)
    }
}

impl fmt::Debug for NestedInvokeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedInvokeAdapter")
            .field("callable", &self.callable)
            .field("signature", self.binder.signature())
            .field("site_created", &self.site.get().is_some())
            .finish()
    }
}

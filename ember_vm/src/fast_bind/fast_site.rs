//! The specialized construction target.

use super::{Arity, NativeAllocator, NestedInvokeAdapter};
use crate::call_site::InvokeSite;
use crate::context::CodeContext;
use crate::error::VmResult;
use ember_runtime::{TypeObject, TypeVersion, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// How a fast site produces the new object.
#[derive(Debug, Clone)]
pub enum AllocateDelegate {
    /// `object.__new__`: allocate directly through the layout.
    Native(Arc<NativeAllocator>),
    /// User `__new__`, called with the type prepended.
    Nested(Arc<NestedInvokeAdapter>),
}

impl AllocateDelegate {
    #[inline]
    fn allocate(&self, ctx: &CodeContext, ty: &Arc<TypeObject>, args: &[Value]) -> VmResult<Value> {
        match self {
            AllocateDelegate::Native(allocator) => Ok(allocator.allocate(ty)?),
            AllocateDelegate::Nested(adapter) => {
                adapter.invoke(ctx, Value::Type(ty.clone()), args)
            }
        }
    }
}

/// Construction target valid for one version of one type.
#[derive(Debug)]
pub struct FastCallSite {
    version: TypeVersion,
    arity: Arity,
    allocate: AllocateDelegate,
    /// `None` when `__init__` is `object.__init__`.
    initialize: Option<Arc<NestedInvokeAdapter>>,
}

impl FastCallSite {
    /// Site guarded on `version` and `arity`.
    pub fn new(
        version: TypeVersion,
        arity: Arity,
        allocate: AllocateDelegate,
        initialize: Option<Arc<NestedInvokeAdapter>>,
    ) -> Self {
        Self {
            version,
            arity,
            allocate,
            initialize,
        }
    }

    #[inline]
    pub fn version(&self) -> TypeVersion {
        self.version
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    #[inline]
    pub fn allocate_delegate(&self) -> &AllocateDelegate {
        &self.allocate
    }

    /// Whether hits run a user `__init__` after allocation.
    #[inline]
    pub fn has_initializer(&self) -> bool {
        self.initialize.is_some()
    }

    /// Whether the guard accepts this callee and argument count.
    #[inline]
    pub fn matches(&self, callee: &Value, argc: usize) -> bool {
        match callee {
            Value::Type(ty) => ty.version() == self.version && argc == self.arity.count(),
            _ => false,
        }
    }

    /// Run the specialized path, or `None` when the guard fails.
    pub fn try_execute(
        &self,
        ctx: &CodeContext,
        callee: &Value,
        args: &[Value],
    ) -> VmResult<Option<Value>> {
        if !self.matches(callee, args.len()) {
            return Ok(None);
        }
        let Value::Type(ty) = callee else {
            return Ok(None);
        };
        ctx.fast_binder().stats().record_fast_hit();

        let instance = self.allocate.allocate(ctx, ty, args)?;
        if let Some(init) = &self.initialize {
            // A user __new__ may hand back something other than a fresh
            // instance of this layout; only such instances are initialized.
            if !instance.is_none() && instance.native_layout() == ty.layout_id() {
                init.invoke(ctx, instance.clone(), args)?;
            }
        }
        Ok(Some(instance))
    }

    /// Run the specialized path, handing guard failures to `site`.
    pub fn execute(
        &self,
        site: &InvokeSite,
        ctx: &CodeContext,
        callee: &Value,
        args: &[Value],
    ) -> VmResult<Value> {
        match self.try_execute(ctx, callee, args)? {
            Some(value) => Ok(value),
            None => {
                match callee {
                    Value::Type(ty) if ty.version() != self.version => debug!(
                        ty = %ty.name(),
                        captured = self.version,
                        current = ty.version(),
                        "fast construction site invalidated"
                    ),
                    _ => trace!(argc = args.len(), "construction guard missed"),
                }
                site.update(ctx, callee, args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_runtime::intern;

    fn site_for(ty: &TypeObject) -> FastCallSite {
        let allocator = NativeAllocator::for_layout(ty.layout()).unwrap();
        FastCallSite::new(
            ty.version(),
            Arity::One,
            AllocateDelegate::Native(Arc::new(allocator)),
            None,
        )
    }

    #[test]
    fn test_guard_checks_version_and_arity() {
        let ty = TypeObject::builder("Guarded").build().unwrap();
        let site = site_for(&ty);
        let callee = Value::Type(ty.clone());
        assert!(site.matches(&callee, 1));
        assert!(!site.matches(&callee, 2));
        assert!(!site.matches(&Value::Int(1), 1));

        ty.set_attr(intern("flag"), Value::Int(1));
        assert!(!site.matches(&callee, 1));
    }

    #[test]
    fn test_guard_rejects_other_type() {
        let ty = TypeObject::builder("Guarded").build().unwrap();
        let other = TypeObject::builder("Other").build().unwrap();
        let site = site_for(&ty);
        assert!(!site.matches(&Value::Type(other), 1));
    }
}

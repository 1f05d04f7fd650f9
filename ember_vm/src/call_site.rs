//! Dynamic call sites with a self-updating cached target.
//!
//! Each site remembers one target: a fast construction site for a type, or
//! a pre-bound plan for a user function. Readers load the target without
//! locking; a guard failure rebinds through [`InvokeSite::update`].

use crate::binder::{ArgKind, CallSignature, InvokeBinder};
use crate::context::CodeContext;
use crate::error::{BindError, VmResult};
use crate::fallback;
use crate::fast_bind::{BindResult, FastCallSite};
use arc_swap::ArcSwapOption;
use ember_runtime::{FunctionObject, Value};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Function Targets
// =============================================================================

/// Cached binding of a site's arguments to one function's parameters.
#[derive(Debug)]
pub struct FunctionTarget {
    func: Arc<FunctionObject>,
    /// For each parameter slot, the index of the site argument filling it.
    /// `None` when the call needs general binding (lists, varargs, errors).
    plan: Option<SmallVec<[usize; 6]>>,
}

impl FunctionTarget {
    /// Precompute the parameter plan for calls shaped like `signature`.
    pub fn new(func: Arc<FunctionObject>, signature: &CallSignature) -> Self {
        let plan = Self::plan(&func, signature);
        Self { func, plan }
    }

    fn plan(func: &FunctionObject, signature: &CallSignature) -> Option<SmallVec<[usize; 6]>> {
        if func.has_varargs()
            || signature.has_list()
            || signature.arity() != func.params().len()
        {
            return None;
        }
        if signature.is_simple() {
            return Some((0..signature.arity()).collect());
        }
        let mut slots: SmallVec<[Option<usize>; 6]> = SmallVec::from_elem(None, signature.arity());
        let mut next_positional = 0;
        for (arg, kind) in signature.kinds().iter().enumerate() {
            let slot = match kind {
                ArgKind::Simple => {
                    next_positional += 1;
                    next_positional - 1
                }
                ArgKind::Named(name) => func.param_index(name)?,
                ArgKind::List => return None,
            };
            if slots[slot].replace(arg).is_some() {
                return None;
            }
        }
        slots.into_iter().collect()
    }

    #[inline]
    pub fn func(&self) -> &Arc<FunctionObject> {
        &self.func
    }

    /// Whether calls skip general argument binding.
    #[inline]
    pub fn is_direct(&self) -> bool {
        self.plan.is_some()
    }

    /// Call with raw site arguments.
    pub fn call(&self, args: &[Value], signature: &CallSignature) -> VmResult<Value> {
        match &self.plan {
            Some(plan) => {
                let bound: SmallVec<[Value; 6]> = plan.iter().map(|&i| args[i].clone()).collect();
                Ok(self.func.invoke_bound(&bound)?)
            }
            None => Ok(self.func.call(&signature.to_call_args(args)?)?),
        }
    }
}

// =============================================================================
// Invoke Site
// =============================================================================

/// What a site currently dispatches to.
#[derive(Debug)]
pub enum SiteTarget {
    Construct(Arc<FastCallSite>),
    Function(FunctionTarget),
}

/// A call site with a fixed binder.
pub struct InvokeSite {
    binder: InvokeBinder,
    target: ArcSwapOption<SiteTarget>,
}

impl InvokeSite {
    /// Unbound site; the first call resolves a target.
    pub fn new(binder: InvokeBinder) -> Self {
        Self {
            binder,
            target: ArcSwapOption::empty(),
        }
    }

    #[inline]
    pub fn binder(&self) -> &InvokeBinder {
        &self.binder
    }

    /// Currently cached target.
    pub fn target(&self) -> Option<Arc<SiteTarget>> {
        self.target.load_full()
    }

    /// Call `callee` with `args` laid out per the site's signature.
    pub fn invoke(&self, ctx: &CodeContext, callee: &Value, args: &[Value]) -> VmResult<Value> {
        let expected = self.binder.signature().arity();
        if args.len() != expected {
            return Err(BindError::ArgumentCount {
                expected,
                got: args.len(),
            }
            .into());
        }

        match self.target.load_full().as_deref() {
            Some(SiteTarget::Construct(site)) if ctx.fast_binder().config().enabled => {
                site.execute(self, ctx, callee, args)
            }
            // Targets built under another binder stay cached but are not run.
            Some(SiteTarget::Construct(_)) => {
                ctx.fast_binder().stats().record_fallback();
                fallback::invoke(ctx, callee, self.binder.signature(), args)
            }
            Some(SiteTarget::Function(target)) => match callee {
                Value::Function(func) if Arc::ptr_eq(func, target.func()) => {
                    target.call(args, self.binder.signature())
                }
                _ => self.update(ctx, callee, args),
            },
            None => self.update(ctx, callee, args),
        }
    }

    /// Rebind after a guard failure and complete the call.
    pub fn update(&self, ctx: &CodeContext, callee: &Value, args: &[Value]) -> VmResult<Value> {
        let binder = ctx.fast_binder();
        binder.stats().record_miss();

        match callee {
            Value::Type(ty) => match binder.try_build(&self.binder, ty)? {
                BindResult::Built(site) => {
                    self.target
                        .store(Some(Arc::new(SiteTarget::Construct(site.clone()))));
                    if let Some(value) = site.try_execute(ctx, callee, args)? {
                        return Ok(value);
                    }
                    // The type changed again between build and execute.
                    debug!(ty = %ty.name(), "fast site stale on first use");
                }
                BindResult::Ineligible(_) => self.target.store(None),
            },
            Value::Function(func) => {
                let target = FunctionTarget::new(func.clone(), self.binder.signature());
                let result = target.call(args, self.binder.signature());
                self.target.store(Some(Arc::new(SiteTarget::Function(target))));
                return result;
            }
            _ => {}
        }

        binder.stats().record_fallback();
        fallback::invoke(ctx, callee, self.binder.signature(), args)
    }
}

impl fmt::Debug for InvokeSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeSite")
            .field("binder", &self.binder)
            .field("target", &self.target.load_full())
            .finish()
    }
}

//! Eligibility analysis and fast-site construction.

use super::cache::{BuildOutcome, FastBindCache, LayoutBucket, SiteKey};
use super::{AllocateDelegate, Arity, FastBindStats, FastCallSite};
use crate::binder::InvokeBinder;
use crate::config::FastBindConfig;
use crate::error::BindError;
use ember_runtime::{SlotBinding, SlotName, TypeObject, Value, resolve_slot};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

/// Why a type's construction was not specialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    Disabled,
    SystemType,
    MixedLegacy,
    /// The type defines `__del__`.
    Finalizer,
    ArityOverCap { arity: usize, cap: usize },
    /// The callee expression was statically typed.
    TypedReceiver,
    CustomMetaclass,
    /// Neither slot is overridden but arguments were passed; the general
    /// path raises the right error.
    ArgumentsWithoutSlots,
    UnsupportedInit,
    UnsupportedNew,
    /// `object.__new__` on a layout without a sole `(type)` constructor.
    NoNativeAllocator,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IneligibleReason::Disabled => f.write_str("fast binding disabled"),
            IneligibleReason::SystemType => f.write_str("system type"),
            IneligibleReason::MixedLegacy => f.write_str("mixes classic and new-style bases"),
            IneligibleReason::Finalizer => f.write_str("defines __del__"),
            IneligibleReason::ArityOverCap { arity, cap } => {
                write!(f, "{arity} arguments exceeds cap {cap}")
            }
            IneligibleReason::TypedReceiver => f.write_str("statically typed receiver"),
            IneligibleReason::CustomMetaclass => f.write_str("custom metaclass"),
            IneligibleReason::ArgumentsWithoutSlots => {
                f.write_str("arguments passed to default __new__ and __init__")
            }
            IneligibleReason::UnsupportedInit => f.write_str("unsupported __init__"),
            IneligibleReason::UnsupportedNew => f.write_str("unsupported __new__"),
            IneligibleReason::NoNativeAllocator => f.write_str("no direct native allocator"),
        }
    }
}

/// Result of a build request.
#[derive(Debug, Clone)]
pub enum BindResult {
    Built(Arc<FastCallSite>),
    Ineligible(IneligibleReason),
}

impl BindResult {
    /// The built site, if any.
    pub fn site(&self) -> Option<&Arc<FastCallSite>> {
        match self {
            BindResult::Built(site) => Some(site),
            BindResult::Ineligible(_) => None,
        }
    }
}

/// Builds and caches specialized construction sites.
pub struct FastBinder {
    config: FastBindConfig,
    cache: FastBindCache,
    stats: FastBindStats,
}

impl FastBinder {
    /// Binder with an empty cache, rejecting invalid configuration.
    pub fn new(config: FastBindConfig) -> Result<Self, BindError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: FastBindConfig) -> Self {
        Self {
            config,
            cache: FastBindCache::new(),
            stats: FastBindStats::new(),
        }
    }

    /// Settings fixed at construction.
    #[inline]
    pub fn config(&self) -> &FastBindConfig {
        &self.config
    }

    /// Counters shared by every site using this binder.
    #[inline]
    pub fn stats(&self) -> &FastBindStats {
        &self.stats
    }

    /// Memoized sites, allocators, and adapters.
    #[inline]
    pub fn cache(&self) -> &FastBindCache {
        &self.cache
    }

    /// Produce a fast site for constructing `ty` at a site bound by
    /// `binder`, reusing a cached one when its version is current.
    pub fn try_build(
        &self,
        binder: &InvokeBinder,
        ty: &Arc<TypeObject>,
    ) -> Result<BindResult, BindError> {
        if let Some(reason) = self.check_gates(binder, ty) {
            return Ok(self.reject(ty, reason));
        }

        let bucket = self.cache.bucket(ty.layout_id());
        let key = SiteKey {
            type_id: ty.type_id(),
            signature: binder.signature().clone(),
        };
        let outcome = bucket.get_or_build(key, ty.version(), &self.stats, || {
            self.build(binder, ty, &bucket)
        })?;

        Ok(match outcome {
            BuildOutcome::Built(site) => BindResult::Built(site),
            BuildOutcome::Rejected(reason) => self.reject(ty, reason),
        })
    }

    /// Gates that do not depend on slot resolution.
    fn check_gates(&self, binder: &InvokeBinder, ty: &TypeObject) -> Option<IneligibleReason> {
        let arity = binder.signature().arity();
        let cap = self.config.max_specialized_arity;
        if !self.config.enabled {
            Some(IneligibleReason::Disabled)
        } else if ty.is_system() {
            Some(IneligibleReason::SystemType)
        } else if ty.is_mixed_legacy() {
            Some(IneligibleReason::MixedLegacy)
        } else if resolve_slot(ty, SlotName::Del).is_found() {
            Some(IneligibleReason::Finalizer)
        } else if arity > cap {
            Some(IneligibleReason::ArityOverCap { arity, cap })
        } else if binder.is_statically_typed() {
            Some(IneligibleReason::TypedReceiver)
        } else if ty.metaclass().is_some() {
            Some(IneligibleReason::CustomMetaclass)
        } else {
            None
        }
    }

    fn build(
        &self,
        binder: &InvokeBinder,
        ty: &Arc<TypeObject>,
        bucket: &LayoutBucket,
    ) -> Result<BuildOutcome<IneligibleReason>, BindError> {
        // Read before resolving: a concurrent mutation then leaves this
        // site already stale rather than wrongly current.
        let version = ty.version();
        let arity = Arity::try_from(binder.signature().arity())?;
        let nested = binder.with_leading_receiver();

        let init = resolve_slot(ty, SlotName::Init);
        let new = resolve_slot(ty, SlotName::New);

        let initialize = match &init {
            SlotBinding::NativeDefault => {
                if arity != Arity::Zero && matches!(new, SlotBinding::NativeDefault) {
                    return Ok(BuildOutcome::Rejected(IneligibleReason::ArgumentsWithoutSlots));
                }
                None
            }
            SlotBinding::UserCallable(Value::Function(func)) => {
                Some(self.cache.adapter(func, &nested, &self.stats))
            }
            _ => return Ok(BuildOutcome::Rejected(IneligibleReason::UnsupportedInit)),
        };

        let allocate = match &new {
            SlotBinding::NativeDefault => match bucket.allocator(ty.layout(), &self.stats) {
                Some(allocator) => AllocateDelegate::Native(allocator),
                None => return Ok(BuildOutcome::Rejected(IneligibleReason::NoNativeAllocator)),
            },
            SlotBinding::UserCallable(Value::StaticMethod(sm)) => match sm.func() {
                Value::Function(func) => {
                    AllocateDelegate::Nested(self.cache.adapter(func, &nested, &self.stats))
                }
                _ => return Ok(BuildOutcome::Rejected(IneligibleReason::UnsupportedNew)),
            },
            _ => return Ok(BuildOutcome::Rejected(IneligibleReason::UnsupportedNew)),
        };

        self.stats.record_site_build();
        debug!(
            ty = %ty.name(),
            version,
            arity = arity.count(),
            native = matches!(allocate, AllocateDelegate::Native(_)),
            init = initialize.is_some(),
            "built fast construction site"
        );
        Ok(BuildOutcome::Built(Arc::new(FastCallSite::new(
            version, arity, allocate, initialize,
        ))))
    }

    fn reject(&self, ty: &TypeObject, reason: IneligibleReason) -> BindResult {
        self.stats.record_ineligible();
        trace!(ty = %ty.name(), %reason, "construction not specialized");
        BindResult::Ineligible(reason)
    }
}

impl fmt::Debug for FastBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastBinder")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

static FAST_BINDER: OnceLock<Arc<FastBinder>> = OnceLock::new();

/// Process-wide binder, configured from the environment on first use.
pub fn fast_binder() -> &'static Arc<FastBinder> {
    FAST_BINDER.get_or_init(|| {
        let config = FastBindConfig::from_env().unwrap_or_else(|err| {
            warn!(%err, "ignoring fast-binding environment settings");
            FastBindConfig::default()
        });
        Arc::new(FastBinder::from_validated(config))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::CallSignature;
    use ember_runtime::{FunctionObject, NativeLayout, StaticMethod, TypeFlags};

    fn binder() -> FastBinder {
        FastBinder::new(FastBindConfig::default()).unwrap()
    }

    fn noop(name: &str, params: &[&str]) -> Value {
        Value::Function(FunctionObject::new(name, params, |_| Ok(Value::None)))
    }

    fn reason(result: BindResult) -> IneligibleReason {
        match result {
            BindResult::Ineligible(reason) => reason,
            BindResult::Built(_) => panic!("expected ineligible"),
        }
    }

    #[test]
    fn test_plain_zero_arg_type_builds() {
        let ty = TypeObject::builder("Empty").build().unwrap();
        let result = binder()
            .try_build(&InvokeBinder::new(CallSignature::simple(0)), &ty)
            .unwrap();
        let site = result.site().unwrap();
        assert!(!site.has_initializer());
        assert_eq!(site.version(), ty.version());
    }

    #[test]
    fn test_args_without_slots_ineligible() {
        let ty = TypeObject::builder("Empty").build().unwrap();
        let result = binder()
            .try_build(&InvokeBinder::new(CallSignature::simple(1)), &ty)
            .unwrap();
        assert_eq!(reason(result), IneligibleReason::ArgumentsWithoutSlots);
    }

    #[test]
    fn test_gate_order() {
        let ty = TypeObject::builder("Final")
            .attr("__del__", noop("__del__", &["self"]))
            .build()
            .unwrap();
        let b = binder();
        // Finalizer is checked before the arity cap.
        let result = b
            .try_build(&InvokeBinder::new(CallSignature::simple(7)), &ty)
            .unwrap();
        assert_eq!(reason(result), IneligibleReason::Finalizer);
    }

    #[test]
    fn test_system_and_typed_receiver() {
        let b = binder();
        let sys = TypeObject::builder("Sys").system().build().unwrap();
        let sig = InvokeBinder::new(CallSignature::simple(0));
        assert_eq!(reason(b.try_build(&sig, &sys).unwrap()), IneligibleReason::SystemType);

        let ty = TypeObject::builder("T").build().unwrap();
        let typed = InvokeBinder::typed(CallSignature::simple(0));
        assert_eq!(reason(b.try_build(&typed, &ty).unwrap()), IneligibleReason::TypedReceiver);
        assert!(!ty.flags().contains(TypeFlags::SYSTEM));
    }

    #[test]
    fn test_unwrapped_new_is_rejected() {
        let ty = TypeObject::builder("T")
            .attr("__new__", noop("__new__", &["cls"]))
            .build()
            .unwrap();
        let result = binder()
            .try_build(&InvokeBinder::new(CallSignature::simple(0)), &ty)
            .unwrap();
        assert_eq!(reason(result), IneligibleReason::UnsupportedNew);
    }

    #[test]
    fn test_static_new_uses_nested_allocation() {
        let new = FunctionObject::new("__new__", &["cls"], |_| Ok(Value::None));
        let ty = TypeObject::builder("T")
            .attr("__new__", Value::StaticMethod(StaticMethod::new(Value::Function(new))))
            .build()
            .unwrap();
        let result = binder()
            .try_build(&InvokeBinder::new(CallSignature::simple(0)), &ty)
            .unwrap();
        assert!(matches!(
            result.site().unwrap().allocate_delegate(),
            AllocateDelegate::Nested(_)
        ));
    }

    #[test]
    fn test_layout_without_allocator_rejected() {
        let layout = NativeLayout::new("Opaque", Vec::new());
        let ty = TypeObject::builder("T").layout(layout).build().unwrap();
        let result = binder()
            .try_build(&InvokeBinder::new(CallSignature::simple(0)), &ty)
            .unwrap();
        assert_eq!(reason(result), IneligibleReason::NoNativeAllocator);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(FastBinder::new(FastBindConfig::default().with_max_arity(6)).is_err());
    }
}

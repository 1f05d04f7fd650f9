//! Type objects.
//!
//! A `TypeObject` describes one user-visible type: its name, bases, cached
//! MRO, class dictionary, and the native layout its instances use.
//!
//! # Versioning
//!
//! Every type carries a version tag drawn from one process-wide counter.
//! Any mutation of a class dictionary assigns a fresh tag to the type and
//! to every live subtype, so a cached version identifies a single
//! (type, state) pair. Call-site caches only need `version == captured` to
//! know both that the type is the same one and that nothing it resolves
//! through has changed.
//!
//! ```text
//! TypeObject
//! ├── type_id: TypeId
//! ├── name: InternedString
//! ├── bases / mro (tail, excludes self)
//! ├── layout: Arc<NativeLayout>
//! ├── flags: TypeFlags
//! ├── dict: RwLock<FxHashMap<..>>
//! ├── version: AtomicU64
//! └── subclasses: Weak links for invalidation
//! ```

use crate::error::{RuntimeError, RuntimeResult};
use crate::intern::{InternedString, intern};
use crate::object::layout::{LayoutId, NativeLayout};
use crate::object::mro::{Mro, compute_c3_mro};
use crate::object::registry::{global_registry, object_type};
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

// =============================================================================
// Type Id and Version
// =============================================================================

/// Unique identity of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The `object` root.
    pub const OBJECT: TypeId = TypeId(0);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Version tag of a type's resolution-relevant state.
pub type TypeVersion = u64;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_version() -> TypeVersion {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

// =============================================================================
// Type Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags describing how a type participates in the object model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TypeFlags: u32 {
        /// Built-in type provided by the runtime.
        const SYSTEM = 1 << 0;
        /// Legacy ("classic") object model.
        const CLASSIC = 1 << 1;
        /// Hierarchy mixes classic and modern types.
        const MIXED_LEGACY = 1 << 2;
    }
}

// =============================================================================
// Type Object
// =============================================================================

pub struct TypeObject {
    type_id: TypeId,
    name: InternedString,
    bases: SmallVec<[Arc<TypeObject>; 2]>,
    mro: Mro,
    layout: Arc<NativeLayout>,
    flags: TypeFlags,
    metaclass: Option<Arc<TypeObject>>,
    dict: RwLock<FxHashMap<InternedString, Value>>,
    version: AtomicU64,
    subclasses: Mutex<Vec<Weak<TypeObject>>>,
}

impl TypeObject {
    /// Start building a new type. Without explicit bases it derives from
    /// `object`.
    pub fn builder(name: &str) -> TypeBuilder {
        TypeBuilder::new(name)
    }

    /// Construct the root `object` type. Only the registry calls this.
    pub(crate) fn new_root(attrs: Vec<(InternedString, Value)>) -> Self {
        Self {
            type_id: TypeId::OBJECT,
            name: intern("object"),
            bases: SmallVec::new(),
            mro: Mro::new(),
            layout: NativeLayout::object(),
            flags: TypeFlags::SYSTEM,
            metaclass: None,
            dict: RwLock::new(attrs.into_iter().collect()),
            version: AtomicU64::new(next_version()),
            subclasses: Mutex::new(Vec::new()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn name(&self) -> &InternedString {
        &self.name
    }

    #[inline]
    pub fn bases(&self) -> &[Arc<TypeObject>] {
        &self.bases
    }

    /// Ancestors in resolution order, excluding this type.
    #[inline]
    pub fn mro(&self) -> &[Arc<TypeObject>] {
        &self.mro
    }

    #[inline]
    pub fn layout(&self) -> &Arc<NativeLayout> {
        &self.layout
    }

    #[inline]
    pub fn layout_id(&self) -> LayoutId {
        self.layout.id()
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.flags.contains(TypeFlags::SYSTEM)
    }

    #[inline]
    pub fn is_classic(&self) -> bool {
        self.flags.contains(TypeFlags::CLASSIC)
    }

    /// Classic and new-style bases mixed in one MRO.
    #[inline]
    pub fn is_mixed_legacy(&self) -> bool {
        self.flags.contains(TypeFlags::MIXED_LEGACY)
    }

    /// Metaclass, explicit or inherited; `None` when it is plain `type`.
    #[inline]
    pub fn metaclass(&self) -> Option<&Arc<TypeObject>> {
        self.metaclass.as_ref()
    }

    /// Current version tag. Readers need no lock: a stale value only
    /// makes a cache guard miss.
    #[inline]
    pub fn version(&self) -> TypeVersion {
        self.version.load(Ordering::Acquire)
    }

    /// `issubclass(self, other)`.
    pub fn is_subtype_of(&self, other: &TypeObject) -> bool {
        std::ptr::eq(self, other) || self.mro.iter().any(|t| std::ptr::eq(&**t, other))
    }

    // =========================================================================
    // Attribute Access
    // =========================================================================

    /// Attribute defined directly on this type.
    #[inline]
    pub fn get_own_attr(&self, name: &InternedString) -> Option<Value> {
        self.dict.read().get(name).cloned()
    }

    /// Resolve an attribute through this type and its MRO.
    pub fn lookup(&self, name: &InternedString) -> Option<Value> {
        if let Some(value) = self.get_own_attr(name) {
            return Some(value);
        }
        self.mro.iter().find_map(|ancestor| ancestor.get_own_attr(name))
    }

    /// Set a class attribute, invalidating caches keyed on this type.
    pub fn set_attr(&self, name: InternedString, value: Value) {
        self.dict.write().insert(name, value);
        self.invalidate();
    }

    /// Delete a class attribute.
    pub fn del_attr(&self, name: &InternedString) -> Option<Value> {
        let removed = self.dict.write().remove(name);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    /// Assign fresh versions to this type and every live subtype.
    pub fn invalidate(&self) {
        let version = next_version();
        self.version.store(version, Ordering::Release);
        tracing::trace!(ty = %self.name, version, "type version bumped");

        let subclasses: Vec<Arc<TypeObject>> = {
            let mut links = self.subclasses.lock();
            links.retain(|weak| weak.strong_count() > 0);
            links.iter().filter_map(Weak::upgrade).collect()
        };
        for sub in subclasses {
            sub.invalidate();
        }
    }

    fn add_subclass(&self, sub: &Arc<TypeObject>) {
        self.subclasses.lock().push(Arc::downgrade(sub));
    }
}

impl fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeObject")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .field("layout", &self.layout.id())
            .field("flags", &self.flags)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Type Builder
// =============================================================================

/// Builder for user-defined types.
pub struct TypeBuilder {
    name: InternedString,
    bases: Vec<Arc<TypeObject>>,
    layout: Option<Arc<NativeLayout>>,
    flags: TypeFlags,
    metaclass: Option<Arc<TypeObject>>,
    attrs: Vec<(InternedString, Value)>,
}

impl TypeBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: intern(name),
            bases: Vec::new(),
            layout: None,
            flags: TypeFlags::empty(),
            metaclass: None,
            attrs: Vec::new(),
        }
    }

    /// Append a base; bases are linearized in the order given.
    pub fn base(mut self, base: Arc<TypeObject>) -> Self {
        self.bases.push(base);
        self
    }

    /// Use a specific native layout instead of inheriting the first base's.
    pub fn layout(mut self, layout: Arc<NativeLayout>) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Mark as a runtime-provided type.
    pub fn system(mut self) -> Self {
        self.flags |= TypeFlags::SYSTEM;
        self
    }

    /// Mark as a legacy ("classic") class.
    pub fn classic(mut self) -> Self {
        self.flags |= TypeFlags::CLASSIC;
        self
    }

    /// Explicit metaclass. Bases' metaclasses still take part in
    /// resolution, and the most derived one wins.
    pub fn metaclass(mut self, meta: Arc<TypeObject>) -> Self {
        self.metaclass = Some(meta);
        self
    }

    /// Class-body attribute; later entries shadow earlier ones.
    pub fn attr(mut self, name: &str, value: Value) -> Self {
        self.attrs.push((intern(name), value));
        self
    }

    /// Create the type and register it for the rest of the process.
    pub fn build(self) -> RuntimeResult<Arc<TypeObject>> {
        let bases: SmallVec<[Arc<TypeObject>; 2]> = if self.bases.is_empty() {
            SmallVec::from_elem(object_type().clone(), 1)
        } else {
            self.bases.into_iter().collect()
        };
        let mro = compute_c3_mro(&bases)?;
        let metaclass = resolve_metaclass(self.metaclass, &bases)?;
        let layout = self.layout.unwrap_or_else(|| bases[0].layout().clone());

        let mut flags = self.flags;
        let classic_self = flags.contains(TypeFlags::CLASSIC);
        let ancestors = mro.iter().filter(|t| t.type_id() != TypeId::OBJECT);
        let (mut any_classic, mut any_modern) = (classic_self, !classic_self);
        for ancestor in ancestors {
            if ancestor.is_classic() {
                any_classic = true;
            } else {
                any_modern = true;
            }
        }
        if any_classic && any_modern {
            flags |= TypeFlags::MIXED_LEGACY;
        }

        let registry = global_registry();
        let ty = Arc::new(TypeObject {
            type_id: registry.allocate_type_id(),
            name: self.name,
            bases,
            mro,
            layout,
            flags,
            metaclass,
            dict: RwLock::new(self.attrs.into_iter().collect()),
            version: AtomicU64::new(next_version()),
            subclasses: Mutex::new(Vec::new()),
        });
        for base in ty.bases.iter() {
            base.add_subclass(&ty);
        }
        registry.register(ty.clone());
        Ok(ty)
    }
}

/// Most derived of the explicit metaclass and every base's metaclass.
///
/// `None` stands for plain `type`, which every metaclass derives from.
fn resolve_metaclass(
    explicit: Option<Arc<TypeObject>>,
    bases: &[Arc<TypeObject>],
) -> RuntimeResult<Option<Arc<TypeObject>>> {
    let mut winner = explicit;
    for candidate in bases.iter().filter_map(|b| b.metaclass()) {
        winner = match winner {
            None => Some(candidate.clone()),
            Some(current) if current.is_subtype_of(candidate) => Some(current),
            Some(current) if candidate.is_subtype_of(&current) => Some(candidate.clone()),
            Some(_) => return Err(RuntimeError::MetaclassConflict),
        };
    }
    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_is_object() {
        let ty = TypeObject::builder("Plain").build().unwrap();
        assert_eq!(ty.bases().len(), 1);
        assert_eq!(ty.bases()[0].type_id(), TypeId::OBJECT);
        assert_eq!(ty.layout_id(), LayoutId::OBJECT);
        assert!(!ty.is_system());
    }

    #[test]
    fn test_type_ids_unique() {
        let a = TypeObject::builder("A").build().unwrap();
        let b = TypeObject::builder("B").build().unwrap();
        assert_ne!(a.type_id(), b.type_id());
    }

    #[test]
    fn test_versions_are_globally_unique() {
        let a = TypeObject::builder("A").build().unwrap();
        let b = TypeObject::builder("B").build().unwrap();
        assert_ne!(a.version(), b.version());
    }

    #[test]
    fn test_set_attr_bumps_version() {
        let ty = TypeObject::builder("T").build().unwrap();
        let before = ty.version();
        ty.set_attr(intern("x"), Value::Int(1));
        assert!(ty.version() > before);
    }

    #[test]
    fn test_del_missing_attr_keeps_version() {
        let ty = TypeObject::builder("T").build().unwrap();
        let before = ty.version();
        assert!(ty.del_attr(&intern("missing")).is_none());
        assert_eq!(ty.version(), before);
    }

    #[test]
    fn test_base_mutation_invalidates_subclass() {
        let base = TypeObject::builder("Base").build().unwrap();
        let sub = TypeObject::builder("Sub").base(base.clone()).build().unwrap();
        let before = sub.version();
        base.set_attr(intern("__init__"), Value::None);
        assert_ne!(sub.version(), before);
    }

    #[test]
    fn test_lookup_walks_mro() {
        let base = TypeObject::builder("Base")
            .attr("greet", Value::Int(100))
            .build()
            .unwrap();
        let sub = TypeObject::builder("Sub").base(base.clone()).build().unwrap();
        assert_eq!(sub.lookup(&intern("greet")), Some(Value::Int(100)));

        sub.set_attr(intern("greet"), Value::Int(200));
        assert_eq!(sub.lookup(&intern("greet")), Some(Value::Int(200)));
        assert_eq!(base.lookup(&intern("greet")), Some(Value::Int(100)));
    }

    #[test]
    fn test_layout_inherited_from_first_base() {
        let layout = NativeLayout::instance_layout("Native");
        let base = TypeObject::builder("Base").layout(layout.clone()).build().unwrap();
        let sub = TypeObject::builder("Sub").base(base).build().unwrap();
        assert_eq!(sub.layout_id(), layout.id());
    }

    #[test]
    fn test_mixed_legacy_detection() {
        let classic = TypeObject::builder("Old").classic().build().unwrap();
        assert!(!classic.is_mixed_legacy());

        let modern = TypeObject::builder("New").build().unwrap();
        let mixed = TypeObject::builder("Mixed")
            .base(modern)
            .base(classic.clone())
            .build()
            .unwrap();
        assert!(mixed.is_mixed_legacy());

        let derived_classic = TypeObject::builder("OldChild")
            .classic()
            .base(classic)
            .build()
            .unwrap();
        assert!(!derived_classic.is_mixed_legacy());
    }

    #[test]
    fn test_is_subtype_of() {
        let base = TypeObject::builder("Base").build().unwrap();
        let sub = TypeObject::builder("Sub").base(base.clone()).build().unwrap();
        assert!(sub.is_subtype_of(&base));
        assert!(sub.is_subtype_of(object_type()));
        assert!(!base.is_subtype_of(&sub));
    }

    #[test]
    fn test_metaclass_inherited_from_base() {
        let meta = TypeObject::builder("Meta").build().unwrap();
        let base = TypeObject::builder("Base").metaclass(meta.clone()).build().unwrap();
        let sub = TypeObject::builder("Sub").base(base).build().unwrap();
        assert!(Arc::ptr_eq(sub.metaclass().unwrap(), &meta));
    }

    #[test]
    fn test_most_derived_metaclass_wins() {
        let meta = TypeObject::builder("Meta").build().unwrap();
        let sub_meta = TypeObject::builder("SubMeta").base(meta.clone()).build().unwrap();
        let base = TypeObject::builder("Base").metaclass(sub_meta.clone()).build().unwrap();
        let sub = TypeObject::builder("Sub")
            .metaclass(meta)
            .base(base)
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(sub.metaclass().unwrap(), &sub_meta));
    }

    #[test]
    fn test_metaclass_conflict_rejected() {
        let left = TypeObject::builder("LeftMeta").build().unwrap();
        let right = TypeObject::builder("RightMeta").build().unwrap();
        let a = TypeObject::builder("A").metaclass(left).build().unwrap();
        let b = TypeObject::builder("B").metaclass(right).build().unwrap();
        let err = TypeObject::builder("C").base(a).base(b).build().unwrap_err();
        assert_eq!(err, RuntimeError::MetaclassConflict);
    }
}

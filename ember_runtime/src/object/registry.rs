//! Type registry mapping `TypeId` to type objects.
//!
//! Types live for the rest of the process once registered. The registry
//! also owns the `object` root type and its builtin `__new__`/`__init__`.

use crate::intern::intern;
use crate::object::type_builtins::{object_init_builtin, object_new_builtin};
use crate::object::type_obj::{TypeId, TypeObject};
use crate::types::function::BuiltinFunction;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Global type registry.
pub struct TypeRegistry {
    types: RwLock<FxHashMap<TypeId, Arc<TypeObject>>>,
    next_id: AtomicU32,
}

impl TypeRegistry {
    /// First id handed to user-defined types.
    pub const FIRST_USER_TYPE: u32 = 256;

    /// An empty registry; user ids start at [`Self::FIRST_USER_TYPE`].
    pub fn new() -> Self {
        Self {
            types: RwLock::new(FxHashMap::default()),
            next_id: AtomicU32::new(Self::FIRST_USER_TYPE),
        }
    }

    /// Allocate a new TypeId for a user-defined type.
    pub fn allocate_type_id(&self) -> TypeId {
        TypeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Record `ty` under its id, replacing any earlier entry.
    pub fn register(&self, ty: Arc<TypeObject>) {
        self.types.write().insert(ty.type_id(), ty);
    }

    /// Look up a registered type.
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<Arc<TypeObject>> {
        self.types.read().get(&type_id).cloned()
    }

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.types.read().contains_key(&type_id)
    }

    /// Number of registered types, builtins included.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Global Access
// =============================================================================

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Get the global type registry.
pub fn global_registry() -> &'static TypeRegistry {
    GLOBAL_REGISTRY.get_or_init(TypeRegistry::new)
}

struct RootType {
    object: Arc<TypeObject>,
    new: Arc<BuiltinFunction>,
    init: Arc<BuiltinFunction>,
}

static ROOT: OnceLock<RootType> = OnceLock::new();

fn root() -> &'static RootType {
    ROOT.get_or_init(|| {
        let new = Arc::new(object_new_builtin());
        let init = Arc::new(object_init_builtin());
        let object = Arc::new(TypeObject::new_root(vec![
            (intern("__new__"), Value::Builtin(new.clone())),
            (intern("__init__"), Value::Builtin(init.clone())),
        ]));
        global_registry().register(object.clone());
        RootType { object, new, init }
    })
}

/// The `object` root type.
#[inline]
pub fn object_type() -> &'static Arc<TypeObject> {
    &root().object
}

/// The builtin `object.__new__`.
#[inline]
pub fn object_new() -> &'static Arc<BuiltinFunction> {
    &root().new
}

/// The builtin `object.__init__`.
#[inline]
pub fn object_init() -> &'static Arc<BuiltinFunction> {
    &root().init
}

/// Force creation of the root type.
pub fn init_builtin_types() {
    let _ = root();
}

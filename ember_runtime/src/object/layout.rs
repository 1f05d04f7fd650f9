//! Native storage layouts.
//!
//! Every type is backed by a `NativeLayout`: the host-side representation
//! its instances are allocated with, together with the native constructors
//! that can produce them. Several types may share one layout (every plain
//! subclass of `object` does), which is what lets constructor fast paths be
//! shared between them.

use crate::error::RuntimeResult;
use crate::object::instance::Instance;
use crate::object::type_obj::TypeObject;
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// Layout Id
// =============================================================================

/// Identity of a native layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(u32);

impl LayoutId {
    pub const NONE: LayoutId = LayoutId(0);
    pub const BOOL: LayoutId = LayoutId(1);
    pub const INT: LayoutId = LayoutId(2);
    pub const FLOAT: LayoutId = LayoutId(3);
    pub const STR: LayoutId = LayoutId(4);
    pub const TUPLE: LayoutId = LayoutId(5);
    pub const TYPE: LayoutId = LayoutId(6);
    pub const FUNCTION: LayoutId = LayoutId(7);
    /// Plain instances of `object` and its ordinary subclasses.
    pub const OBJECT: LayoutId = LayoutId(8);

    /// First id handed out to layouts created at runtime.
    pub const FIRST_DYNAMIC: u32 = 64;

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

static NEXT_LAYOUT_ID: AtomicU32 = AtomicU32::new(LayoutId::FIRST_DYNAMIC);

fn allocate_layout_id() -> LayoutId {
    LayoutId(NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed))
}

// =============================================================================
// Native Constructors
// =============================================================================

/// Parameter kinds a native constructor can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeParam {
    /// The type object being instantiated.
    Type,
    Int,
    Str,
    /// Any value.
    Object,
}

/// Native constructor body. Receives arguments matching the declared params.
pub type NativeCtorFn = dyn Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync;

/// One native constructor of a layout.
#[derive(Clone)]
pub struct NativeCtor {
    params: SmallVec<[NativeParam; 2]>,
    body: Arc<NativeCtorFn>,
}

impl NativeCtor {
    /// Constructor taking `params` after the type.
    pub fn new<F>(params: &[NativeParam], body: F) -> Self
    where
        F: Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Self {
            params: params.iter().copied().collect(),
            body: Arc::new(body),
        }
    }

    #[inline]
    pub fn params(&self) -> &[NativeParam] {
        &self.params
    }

    /// Whether this is the canonical "allocate given my type" shape.
    #[inline]
    pub fn is_type_allocator(&self) -> bool {
        self.params[..] == [NativeParam::Type]
    }

    /// Invoke the constructor.
    #[inline]
    pub fn construct(&self, args: &[Value]) -> RuntimeResult<Value> {
        (self.body)(args)
    }

    /// Whether `args` fit this constructor's declared parameters.
    pub fn accepts(&self, args: &[Value]) -> bool {
        args.len() == self.params.len()
            && self.params.iter().zip(args).all(|(param, arg)| match param {
                NativeParam::Type => matches!(arg, Value::Type(_)),
                NativeParam::Int => matches!(arg, Value::Int(_)),
                NativeParam::Str => matches!(arg, Value::Str(_)),
                NativeParam::Object => true,
            })
    }
}

impl fmt::Debug for NativeCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCtor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Native Layout
// =============================================================================

/// Host representation backing a type's instances.
#[derive(Debug)]
pub struct NativeLayout {
    id: LayoutId,
    name: String,
    ctors: Vec<NativeCtor>,
}

impl NativeLayout {
    /// Create a layout with an explicit constructor list.
    pub fn new(name: impl Into<String>, ctors: Vec<NativeCtor>) -> Arc<Self> {
        Arc::new(Self {
            id: allocate_layout_id(),
            name: name.into(),
            ctors,
        })
    }

    /// Create a layout whose only constructor allocates a plain instance
    /// tagged with this layout.
    pub fn instance_layout(name: impl Into<String>) -> Arc<Self> {
        let id = allocate_layout_id();
        Arc::new(Self {
            id,
            name: name.into(),
            ctors: vec![instance_ctor(id)],
        })
    }

    /// The layout backing `object` and ordinary classes.
    pub(crate) fn object() -> Arc<Self> {
        Arc::new(Self {
            id: LayoutId::OBJECT,
            name: "object".into(),
            ctors: vec![instance_ctor(LayoutId::OBJECT)],
        })
    }

    #[inline]
    pub fn id(&self) -> LayoutId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ctors(&self) -> &[NativeCtor] {
        &self.ctors
    }

    /// The single canonical `(type)` constructor, if that is the only one.
    ///
    /// Layouts with overloads return `None` even if one overload has the
    /// canonical shape: choosing between them is the general path's job.
    pub fn sole_type_allocator(&self) -> Option<&NativeCtor> {
        match self.ctors.as_slice() {
            [ctor] if ctor.is_type_allocator() => Some(ctor),
            _ => None,
        }
    }

    /// Allocate an instance of `ty` through overload resolution.
    pub fn allocate(&self, ty: &Arc<TypeObject>) -> Option<RuntimeResult<Value>> {
        let args = [Value::Type(ty.clone())];
        self.ctors
            .iter()
            .find(|ctor| ctor.accepts(&args))
            .map(|ctor| ctor.construct(&args))
    }
}

fn instance_ctor(layout: LayoutId) -> NativeCtor {
    NativeCtor::new(&[NativeParam::Type], move |args| match args {
        [Value::Type(ty)] => Ok(Value::Instance(Instance::new(ty.clone(), layout))),
        _ => Err(crate::error::RuntimeError::type_error(
            "native allocator expects a type argument",
        )),
    })
}

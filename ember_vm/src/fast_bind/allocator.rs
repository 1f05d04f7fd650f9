//! Direct allocation through a layout's canonical constructor.

use ember_runtime::{LayoutId, NativeCtor, NativeLayout, RuntimeResult, TypeObject, Value};
use std::sync::Arc;

/// Allocator bound to a layout's sole `(type)` constructor.
///
/// Skips overload resolution and argument checking: the constructor shape
/// was verified once when the allocator was created.
#[derive(Debug, Clone)]
pub struct NativeAllocator {
    layout: LayoutId,
    ctor: NativeCtor,
}

impl NativeAllocator {
    /// `None` unless the layout has exactly one constructor and it takes
    /// only the type.
    pub fn for_layout(layout: &NativeLayout) -> Option<Self> {
        layout.sole_type_allocator().map(|ctor| Self {
            layout: layout.id(),
            ctor: ctor.clone(),
        })
    }

    #[inline]
    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    /// Fresh instance of `ty` through the layout constructor.
    #[inline]
    pub fn allocate(&self, ty: &Arc<TypeObject>) -> RuntimeResult<Value> {
        self.ctor.construct(&[Value::Type(ty.clone())])
    }
}

//! Instances of user-defined types.

use crate::intern::InternedString;
use crate::object::layout::LayoutId;
use crate::object::type_obj::TypeObject;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A heap instance with a per-object attribute dictionary.
///
/// The layout is fixed at allocation time and is what constructor fast
/// paths compare against to decide whether `__init__` applies.
pub struct Instance {
    class: Arc<TypeObject>,
    layout: LayoutId,
    attrs: RwLock<FxHashMap<InternedString, Value>>,
}

impl Instance {
    /// Empty instance of `class` with the given native layout.
    pub fn new(class: Arc<TypeObject>, layout: LayoutId) -> Arc<Self> {
        Arc::new(Self {
            class,
            layout,
            attrs: RwLock::new(FxHashMap::default()),
        })
    }

    #[inline]
    pub fn class(&self) -> &Arc<TypeObject> {
        &self.class
    }

    #[inline]
    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    #[inline]
    pub fn get_attr(&self, name: &InternedString) -> Option<Value> {
        self.attrs.read().get(name).cloned()
    }

    #[inline]
    pub fn set_attr(&self, name: InternedString, value: Value) {
        self.attrs.write().insert(name, value);
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.read().len()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::intern;
    use crate::object::type_obj::TypeObject;

    #[test]
    fn test_instance_attrs() {
        let ty = TypeObject::builder("Thing").build().unwrap();
        let inst = Instance::new(ty, LayoutId::OBJECT);
        assert_eq!(inst.attr_count(), 0);

        inst.set_attr(intern("x"), Value::Int(3));
        assert_eq!(inst.get_attr(&intern("x")), Some(Value::Int(3)));
        assert_eq!(inst.get_attr(&intern("y")), None);
    }
}

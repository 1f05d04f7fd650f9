//! Slot resolution for the instantiation protocol.
//!
//! Resolves `__new__`, `__init__`, and `__del__` on a type through its MRO
//! and classifies what was found, so call-site builders can decide whether
//! a specialized path applies without knowing the lookup rules.

use crate::intern::{InternedString, intern};
use crate::object::registry::{object_init, object_new};
use crate::object::type_obj::TypeObject;
use crate::value::Value;
use std::sync::{Arc, OnceLock};

/// Slots participating in instance construction and lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    New,
    Init,
    Del,
    /// Looked up on the metaclass when a class is called.
    Call,
}

impl SlotName {
    const ALL: [SlotName; 4] = [SlotName::New, SlotName::Init, SlotName::Del, SlotName::Call];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotName::New => "__new__",
            SlotName::Init => "__init__",
            SlotName::Del => "__del__",
            SlotName::Call => "__call__",
        }
    }

    /// The slot's interned name, shared after first use.
    #[inline]
    pub fn interned(self) -> InternedString {
        static NAMES: OnceLock<[InternedString; 4]> = OnceLock::new();
        NAMES.get_or_init(|| SlotName::ALL.map(|slot| intern(slot.as_str())))[self as usize].clone()
    }
}

/// Outcome of resolving a slot.
#[derive(Debug, Clone)]
pub enum SlotBinding {
    /// Nothing in the MRO defines the slot.
    NotFound,
    /// Resolved to the runtime's own `object` implementation.
    NativeDefault,
    /// Resolved to a user callable in the form the slot expects: a plain
    /// function for `__init__`/`__del__`, a `staticmethod` wrapping a
    /// function for `__new__`.
    UserCallable(Value),
    /// Anything else (properties, class methods, foreign callables...).
    Unsupported(Value),
}

impl SlotBinding {
    #[inline]
    pub fn is_found(&self) -> bool {
        !matches!(self, SlotBinding::NotFound)
    }
}

/// Resolve `slot` on `ty`.
pub fn resolve_slot(ty: &TypeObject, slot: SlotName) -> SlotBinding {
    match ty.lookup(&slot.interned()) {
        None => SlotBinding::NotFound,
        Some(value) => classify(slot, value),
    }
}

fn classify(slot: SlotName, value: Value) -> SlotBinding {
    match (slot, &value) {
        (SlotName::New, Value::Builtin(b)) if Arc::ptr_eq(b, object_new()) => {
            SlotBinding::NativeDefault
        }
        (SlotName::Init, Value::Builtin(b)) if Arc::ptr_eq(b, object_init()) => {
            SlotBinding::NativeDefault
        }
        (SlotName::New, Value::StaticMethod(sm)) if matches!(sm.func(), Value::Function(_)) => {
            SlotBinding::UserCallable(value)
        }
        (SlotName::Init | SlotName::Del | SlotName::Call, Value::Function(_)) => {
            SlotBinding::UserCallable(value)
        }
        _ => SlotBinding::Unsupported(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::registry::object_type;
    use crate::types::function::{ClassMethod, FunctionObject, StaticMethod};

    fn noop(name: &str, params: &[&str]) -> Value {
        Value::Function(FunctionObject::new(name, params, |_| Ok(Value::None)))
    }

    #[test]
    fn test_object_slots_are_native_default() {
        assert!(matches!(
            resolve_slot(object_type(), SlotName::New),
            SlotBinding::NativeDefault
        ));
        assert!(matches!(
            resolve_slot(object_type(), SlotName::Init),
            SlotBinding::NativeDefault
        ));
        assert!(matches!(
            resolve_slot(object_type(), SlotName::Del),
            SlotBinding::NotFound
        ));
    }

    #[test]
    fn test_interned_names_shared() {
        for slot in SlotName::ALL {
            assert_eq!(slot.interned(), intern(slot.as_str()));
            assert_eq!(slot.interned().as_ptr(), slot.interned().as_ptr());
        }
        assert_eq!(SlotName::Call.interned().as_str(), "__call__");
    }

    #[test]
    fn test_inherited_defaults() {
        let ty = TypeObject::builder("Plain").build().unwrap();
        assert!(matches!(resolve_slot(&ty, SlotName::Init), SlotBinding::NativeDefault));
    }

    #[test]
    fn test_user_init() {
        let ty = TypeObject::builder("Point")
            .attr("__init__", noop("__init__", &["self", "x", "y"]))
            .build()
            .unwrap();
        assert!(matches!(resolve_slot(&ty, SlotName::Init), SlotBinding::UserCallable(_)));
    }

    #[test]
    fn test_static_wrapped_new() {
        let new = Value::StaticMethod(StaticMethod::new(noop("__new__", &["cls"])));
        let ty = TypeObject::builder("T").attr("__new__", new).build().unwrap();
        assert!(matches!(resolve_slot(&ty, SlotName::New), SlotBinding::UserCallable(_)));
    }

    #[test]
    fn test_unwrapped_new_is_unsupported() {
        let ty = TypeObject::builder("T")
            .attr("__new__", noop("__new__", &["cls"]))
            .build()
            .unwrap();
        assert!(matches!(resolve_slot(&ty, SlotName::New), SlotBinding::Unsupported(_)));
    }

    #[test]
    fn test_classmethod_init_is_unsupported() {
        let init = Value::ClassMethod(ClassMethod::new(noop("__init__", &["cls"])));
        let ty = TypeObject::builder("T").attr("__init__", init).build().unwrap();
        assert!(matches!(resolve_slot(&ty, SlotName::Init), SlotBinding::Unsupported(_)));
    }

    #[test]
    fn test_finalizer_found() {
        let ty = TypeObject::builder("T")
            .attr("__del__", noop("__del__", &["self"]))
            .build()
            .unwrap();
        assert!(resolve_slot(&ty, SlotName::Del).is_found());
    }
}

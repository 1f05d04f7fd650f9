//! Builtin `object.__new__` and `object.__init__`.
//!
//! These enforce the excess-argument rules of the hosted language: a class
//! that overrides neither slot accepts no constructor arguments, and each
//! default only tolerates extra arguments when the *other* slot is the one
//! that consumes them.

use crate::error::{RuntimeError, RuntimeResult};
use crate::object::registry::object_type;
use crate::object::slots::{SlotBinding, SlotName, resolve_slot};
use crate::object::type_obj::TypeObject;
use crate::types::function::{BuiltinFunction, CallArgs};
use crate::value::Value;
use std::sync::Arc;

#[inline]
fn overrides(ty: &TypeObject, slot: SlotName) -> bool {
    !matches!(resolve_slot(ty, slot), SlotBinding::NativeDefault)
}

/// `object.__new__(cls, *args, **kwargs)`.
pub(crate) fn object_new_builtin() -> BuiltinFunction {
    BuiltinFunction::new("__new__", |args: &CallArgs| {
        let Some(Value::Type(cls)) = args.positional.first() else {
            return Err(RuntimeError::type_error(
                "object.__new__(X): X is not a type object",
            ));
        };
        if args.len() > 1 {
            if overrides(cls, SlotName::New) {
                return Err(RuntimeError::type_error(
                    "object.__new__() takes exactly one argument (the type to instantiate)",
                ));
            }
            if !overrides(cls, SlotName::Init) {
                return Err(takes_no_arguments(cls));
            }
        }
        allocate(cls)
    })
}

/// `object.__init__(self, *args, **kwargs)`.
pub(crate) fn object_init_builtin() -> BuiltinFunction {
    BuiltinFunction::new("__init__", |args: &CallArgs| {
        let Some(receiver) = args.positional.first() else {
            return Err(RuntimeError::type_error(
                "descriptor '__init__' of 'object' object needs an argument",
            ));
        };
        if args.len() > 1 {
            let cls = match receiver {
                Value::Instance(inst) => inst.class().clone(),
                _ => object_type().clone(),
            };
            if overrides(&cls, SlotName::Init) {
                return Err(RuntimeError::type_error(
                    "object.__init__() takes exactly one argument (the instance to initialize)",
                ));
            }
            if !overrides(&cls, SlotName::New) {
                return Err(takes_no_arguments(&cls));
            }
        }
        Ok(Value::None)
    })
}

/// Allocate through the type's native layout.
pub fn allocate(cls: &Arc<TypeObject>) -> RuntimeResult<Value> {
    match cls.layout().allocate(cls) {
        Some(result) => result,
        None => Err(RuntimeError::NotInstantiable {
            type_name: cls.name().to_string(),
        }),
    }
}

fn takes_no_arguments(cls: &TypeObject) -> RuntimeError {
    RuntimeError::type_error(format!("{}() takes no arguments", cls.name()))
}

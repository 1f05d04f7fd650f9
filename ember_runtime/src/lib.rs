//! Object model runtime for Ember.
//!
//! This crate provides:
//! - Dynamic values (`Value`) and interned names
//! - Type objects with process-unique version tags and C3 MRO
//! - Native layouts describing how instances are allocated
//! - Slot resolution for the instantiation protocol
//! - User functions, method wrappers, and builtins

pub mod error;
pub mod intern;
pub mod object;
pub mod types;
pub mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use intern::{InternedString, intern};
pub use object::instance::Instance;
pub use object::layout::{LayoutId, NativeCtor, NativeLayout, NativeParam};
pub use object::registry::{
    TypeRegistry, global_registry, init_builtin_types, object_init, object_new, object_type,
};
pub use object::slots::{SlotBinding, SlotName, resolve_slot};
pub use object::type_obj::{TypeBuilder, TypeFlags, TypeId, TypeObject, TypeVersion};
pub use types::function::{
    BuiltinFunction, CallArgs, ClassMethod, FunctionObject, StaticMethod,
};
pub use value::Value;

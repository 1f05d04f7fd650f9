//! Object model: types, layouts, instances, and slot resolution.
//!
//! The pieces call-site caches depend on are deliberately small:
//!
//! - `TypeObject::version` for guards
//! - `TypeObject::layout` for native allocation and representation checks
//! - `slots::resolve_slot` for `__new__`/`__init__`/`__del__`

pub mod instance;
pub mod layout;
pub mod mro;
pub mod registry;
pub mod slots;
pub mod type_builtins;
pub mod type_obj;

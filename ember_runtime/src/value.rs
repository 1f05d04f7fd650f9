//! Dynamic values.
//!
//! Scalars are stored inline; every heap object is reference counted so a
//! value can be shared freely between call sites and threads.

use crate::object::instance::Instance;
use crate::object::layout::LayoutId;
use crate::object::registry::object_type;
use crate::object::type_obj::TypeObject;
use crate::types::function::{BuiltinFunction, ClassMethod, FunctionObject, StaticMethod};
use std::fmt;
use std::sync::Arc;

/// A dynamically typed value.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Tuple(Arc<[Value]>),
    Type(Arc<TypeObject>),
    Function(Arc<FunctionObject>),
    StaticMethod(Arc<StaticMethod>),
    ClassMethod(Arc<ClassMethod>),
    Builtin(Arc<BuiltinFunction>),
    Instance(Arc<Instance>),
}

impl Value {
    /// Build a string value.
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Build a tuple value.
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_type(&self) -> Option<&Arc<TypeObject>> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    #[inline]
    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    /// Name of the value's type as the hosted language reports it.
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "str".into(),
            Value::Tuple(_) => "tuple".into(),
            Value::Type(_) => "type".into(),
            Value::Function(_) => "function".into(),
            Value::StaticMethod(_) => "staticmethod".into(),
            Value::ClassMethod(_) => "classmethod".into(),
            Value::Builtin(_) => "builtin_function_or_method".into(),
            Value::Instance(inst) => inst.class().name().to_string(),
        }
    }

    /// Native storage layout backing this value.
    ///
    /// Instances report the layout they were allocated with; every other
    /// value kind has a fixed builtin layout.
    pub fn native_layout(&self) -> LayoutId {
        match self {
            Value::None => LayoutId::NONE,
            Value::Bool(_) => LayoutId::BOOL,
            Value::Int(_) => LayoutId::INT,
            Value::Float(_) => LayoutId::FLOAT,
            Value::Str(_) => LayoutId::STR,
            Value::Tuple(_) => LayoutId::TUPLE,
            Value::Type(_) => LayoutId::TYPE,
            Value::Function(_)
            | Value::StaticMethod(_)
            | Value::ClassMethod(_)
            | Value::Builtin(_) => LayoutId::FUNCTION,
            Value::Instance(inst) => inst.layout(),
        }
    }

    /// `isinstance(self, ty)`.
    pub fn is_instance_of(&self, ty: &TypeObject) -> bool {
        match self {
            Value::Instance(inst) => inst.class().is_subtype_of(ty),
            _ => std::ptr::eq(ty, Arc::as_ptr(object_type())),
        }
    }

    /// Identity comparison (`is`).
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Type(a), Value::Type(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::StaticMethod(a), Value::StaticMethod(b)) => Arc::ptr_eq(a, b),
            (Value::ClassMethod(a), Value::ClassMethod(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            _ => self.is_object() && other.is_object() && self.is(other),
        }
    }
}

impl Value {
    #[inline]
    fn is_object(&self) -> bool {
        !matches!(
            self,
            Value::None
                | Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Str(_)
                | Value::Tuple(_)
        )
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => f.debug_tuple("").field(items).finish(),
            Value::Type(ty) => write!(f, "<class '{}'>", ty.name()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::StaticMethod(_) => f.write_str("<staticmethod>"),
            Value::ClassMethod(_) => f.write_str("<classmethod>"),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
            Value::Instance(inst) => write!(f, "<{} object>", inst.class().name()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Arc<TypeObject>> for Value {
    fn from(ty: Arc<TypeObject>) -> Self {
        Value::Type(ty)
    }
}

impl From<Arc<FunctionObject>> for Value {
    fn from(func: Arc<FunctionObject>) -> Self {
        Value::Function(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_equality() {
        assert_eq!(Value::Int(3), Value::Int(3));
        assert_ne!(Value::Int(3), Value::Int(4));
        assert_ne!(Value::Int(1), Value::Bool(true));
        assert_eq!(Value::str("a"), Value::str("a"));
    }

    #[test]
    fn test_builtin_layouts() {
        assert_eq!(Value::None.native_layout(), LayoutId::NONE);
        assert_eq!(Value::Int(1).native_layout(), LayoutId::INT);
        assert_eq!(Value::tuple([]).native_layout(), LayoutId::TUPLE);
    }

    #[test]
    fn test_everything_is_an_object() {
        assert!(Value::Int(1).is_instance_of(object_type()));
    }
}

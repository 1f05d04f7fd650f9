//! Callable objects: user functions, method wrappers, and builtins.
//!
//! User functions carry a Rust closure standing in for compiled code. The
//! closure receives arguments already bound to the declared parameters, in
//! declaration order, with any `*args` collected into a trailing tuple.

use crate::error::{RuntimeError, RuntimeResult};
use crate::intern::{InternedString, intern};
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Call Arguments
// =============================================================================

/// Positional and keyword arguments of a general call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: SmallVec<[Value; 6]>,
    pub keywords: SmallVec<[(InternedString, Value); 2]>,
}

impl CallArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments only.
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: SmallVec::new(),
        }
    }

    /// Prepend a receiver (`self` or `cls`) to the positional arguments.
    pub fn with_receiver(mut self, receiver: Value) -> Self {
        self.positional.insert(0, receiver);
        self
    }

    /// Copy without the leading positional receiver.
    pub fn without_receiver(&self) -> Self {
        Self {
            positional: self.positional.iter().skip(1).cloned().collect(),
            keywords: self.keywords.clone(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Function Object
// =============================================================================

/// Function body receiving bound parameters.
pub type FunctionBody = dyn Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync;

/// User-defined function.
pub struct FunctionObject {
    name: InternedString,
    params: SmallVec<[InternedString; 4]>,
    varargs: bool,
    body: Arc<FunctionBody>,
}

impl FunctionObject {
    /// Create a function with the given positional parameter names.
    pub fn new<F>(name: &str, params: &[&str], body: F) -> Arc<Self>
    where
        F: Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: intern(name),
            params: params.iter().map(|p| intern(p)).collect(),
            varargs: false,
            body: Arc::new(body),
        })
    }

    /// Create a function that also accepts `*args`.
    pub fn with_varargs<F>(name: &str, params: &[&str], body: F) -> Arc<Self>
    where
        F: Fn(&[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: intern(name),
            params: params.iter().map(|p| intern(p)).collect(),
            varargs: true,
            body: Arc::new(body),
        })
    }

    #[inline]
    pub fn name(&self) -> &InternedString {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[InternedString] {
        &self.params
    }

    /// Whether the last parameter collects extra positionals.
    #[inline]
    pub fn has_varargs(&self) -> bool {
        self.varargs
    }

    /// Index of a named parameter.
    #[inline]
    pub fn param_index(&self, name: &InternedString) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }

    /// Number of slots the body receives.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.params.len() + usize::from(self.varargs)
    }

    /// Run the body on already-bound parameters.
    #[inline]
    pub fn invoke_bound(&self, bound: &[Value]) -> RuntimeResult<Value> {
        (self.body)(bound)
    }

    /// Bind general call arguments to parameter slots.
    pub fn bind(&self, args: &CallArgs) -> RuntimeResult<SmallVec<[Value; 6]>> {
        let declared = self.params.len();
        let given = args.positional.len();
        if given > declared && !self.varargs {
            return Err(RuntimeError::argument(
                self.name.as_str(),
                format!(
                    "takes {} positional argument{} but {} {} given",
                    declared,
                    if declared == 1 { "" } else { "s" },
                    given,
                    if given == 1 { "was" } else { "were" },
                ),
            ));
        }

        let mut slots: SmallVec<[Option<Value>; 6]> = SmallVec::from_elem(None, declared);
        for (slot, value) in slots.iter_mut().zip(args.positional.iter()) {
            *slot = Some(value.clone());
        }

        for (name, value) in args.keywords.iter() {
            let Some(index) = self.param_index(name) else {
                return Err(RuntimeError::argument(
                    self.name.as_str(),
                    format!("got an unexpected keyword argument '{}'", name),
                ));
            };
            if slots[index].is_some() {
                return Err(RuntimeError::argument(
                    self.name.as_str(),
                    format!("got multiple values for argument '{}'", name),
                ));
            }
            slots[index] = Some(value.clone());
        }

        let missing: Vec<&str> = self
            .params
            .iter()
            .zip(slots.iter())
            .filter(|(_, slot)| slot.is_none())
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() {
            let quoted: Vec<String> = missing.iter().map(|m| format!("'{}'", m)).collect();
            return Err(RuntimeError::argument(
                self.name.as_str(),
                format!(
                    "missing {} required positional argument{}: {}",
                    missing.len(),
                    if missing.len() == 1 { "" } else { "s" },
                    quoted.join(" and "),
                ),
            ));
        }

        let mut bound: SmallVec<[Value; 6]> = slots.into_iter().flatten().collect();
        if self.varargs {
            bound.push(Value::tuple(args.positional.iter().skip(declared).cloned()));
        }
        Ok(bound)
    }

    /// Bind and run.
    pub fn call(&self, args: &CallArgs) -> RuntimeResult<Value> {
        let bound = self.bind(args)?;
        self.invoke_bound(&bound)
    }
}

impl fmt::Debug for FunctionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionObject")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("varargs", &self.varargs)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Method Wrappers
// =============================================================================

/// `staticmethod(func)`.
#[derive(Debug)]
pub struct StaticMethod {
    func: Value,
}

impl StaticMethod {
    /// Wrap `func`; no receiver is bound.
    pub fn new(func: Value) -> Arc<Self> {
        Arc::new(Self { func })
    }

    #[inline]
    pub fn func(&self) -> &Value {
        &self.func
    }
}

/// `classmethod(func)`.
#[derive(Debug)]
pub struct ClassMethod {
    func: Value,
}

impl ClassMethod {
    /// Wrap `func`; the receiver becomes the class.
    pub fn new(func: Value) -> Arc<Self> {
        Arc::new(Self { func })
    }

    #[inline]
    pub fn func(&self) -> &Value {
        &self.func
    }
}

// =============================================================================
// Builtin Functions
// =============================================================================

/// Native function body.
pub type BuiltinBody = dyn Fn(&CallArgs) -> RuntimeResult<Value> + Send + Sync;

/// Function implemented by the runtime.
pub struct BuiltinFunction {
    name: &'static str,
    body: Box<BuiltinBody>,
}

impl BuiltinFunction {
    pub fn new<F>(name: &'static str, body: F) -> Self
    where
        F: Fn(&CallArgs) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Self {
            name,
            body: Box::new(body),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn call(&self, args: &CallArgs) -> RuntimeResult<Value> {
        (self.body)(args)
    }
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Arc<FunctionObject> {
        FunctionObject::new("pair", &["a", "b"], |args| {
            Ok(Value::tuple(args.iter().cloned()))
        })
    }

    #[test]
    fn test_bind_positional() {
        let f = pair();
        let out = f.call(&CallArgs::positional([Value::Int(1), Value::Int(2)])).unwrap();
        assert_eq!(out, Value::tuple([Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_bind_keyword() {
        let f = pair();
        let mut args = CallArgs::positional([Value::Int(1)]);
        args.keywords.push((intern("b"), Value::Int(9)));
        let out = f.call(&args).unwrap();
        assert_eq!(out, Value::tuple([Value::Int(1), Value::Int(9)]));
    }

    #[test]
    fn test_too_many_positional() {
        let f = pair();
        let err = f
            .call(&CallArgs::positional([Value::Int(1), Value::Int(2), Value::Int(3)]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: pair() takes 2 positional arguments but 3 were given"
        );
    }

    #[test]
    fn test_missing_argument() {
        let f = pair();
        let err = f.call(&CallArgs::positional([Value::Int(1)])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: pair() missing 1 required positional argument: 'b'"
        );
    }

    #[test]
    fn test_duplicate_keyword() {
        let f = pair();
        let mut args = CallArgs::positional([Value::Int(1)]);
        args.keywords.push((intern("a"), Value::Int(2)));
        let err = f.call(&args).unwrap_err();
        assert!(matches!(err, RuntimeError::ArgumentError { .. }));
    }

    #[test]
    fn test_unexpected_keyword() {
        let f = pair();
        let mut args = CallArgs::positional([Value::Int(1), Value::Int(2)]);
        args.keywords.push((intern("c"), Value::Int(3)));
        assert!(f.call(&args).is_err());
    }

    #[test]
    fn test_varargs_collects_extras() {
        let f = FunctionObject::with_varargs("f", &["a"], |args| Ok(args[1].clone()));
        let out = f
            .call(&CallArgs::positional([Value::Int(1), Value::Int(2), Value::Int(3)]))
            .unwrap();
        assert_eq!(out, Value::tuple([Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn test_receiver_helpers() {
        let args = CallArgs::positional([Value::Int(1)]).with_receiver(Value::None);
        assert_eq!(args.positional.len(), 2);
        assert!(args.positional[0].is_none());
        assert_eq!(args.without_receiver().positional.len(), 1);
    }
}

//! Call signatures and invoke binders.
//!
//! A call site is compiled with a fixed description of how its arguments
//! were written at the source level. The binder carries that description
//! and is what site caches are keyed on.

use crate::error::BindError;
use ember_runtime::{CallArgs, InternedString, RuntimeError, RuntimeResult, Value};
use smallvec::SmallVec;
use std::fmt;

// =============================================================================
// Argument Kinds
// =============================================================================

/// How one argument was passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// `f(x)`
    Simple,
    /// `f(name=x)`
    Named(InternedString),
    /// `f(*xs)`; the value is a tuple expanded into positionals.
    List,
}

// =============================================================================
// Call Signature
// =============================================================================

/// Ordered argument kinds of a call site.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    kinds: SmallVec<[ArgKind; 6]>,
}

impl CallSignature {
    /// `n` plain positional arguments.
    pub fn simple(n: usize) -> Self {
        Self {
            kinds: SmallVec::from_elem(ArgKind::Simple, n),
        }
    }

    /// Validate and build a signature.
    ///
    /// A list argument may only appear last, and a keyword may not repeat.
    pub fn new(kinds: impl IntoIterator<Item = ArgKind>) -> Result<Self, BindError> {
        let kinds: SmallVec<[ArgKind; 6]> = kinds.into_iter().collect();
        for (i, kind) in kinds.iter().enumerate() {
            match kind {
                ArgKind::List if i + 1 != kinds.len() => {
                    return Err(BindError::invalid_signature(
                        "list argument must be the last argument",
                    ));
                }
                ArgKind::Named(name) => {
                    let repeated = kinds[..i]
                        .iter()
                        .any(|k| matches!(k, ArgKind::Named(other) if other == name));
                    if repeated {
                        return Err(BindError::invalid_signature(format!(
                            "keyword argument repeated: {name}"
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(Self { kinds })
    }

    /// Number of values the site passes.
    #[inline]
    pub fn arity(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub fn kinds(&self) -> &[ArgKind] {
        &self.kinds
    }

    /// All arguments positional.
    #[inline]
    pub fn is_simple(&self) -> bool {
        self.kinds.iter().all(|k| matches!(k, ArgKind::Simple))
    }

    /// Ends in a `*args` expansion.
    #[inline]
    pub fn has_list(&self) -> bool {
        matches!(self.kinds.last(), Some(ArgKind::List))
    }

    /// Same signature with one positional receiver in front.
    pub fn with_leading_receiver(&self) -> Self {
        let mut kinds = SmallVec::with_capacity(self.kinds.len() + 1);
        kinds.push(ArgKind::Simple);
        kinds.extend(self.kinds.iter().cloned());
        Self { kinds }
    }

    /// Lay raw site arguments out as general call arguments.
    pub fn to_call_args(&self, args: &[Value]) -> RuntimeResult<CallArgs> {
        let mut out = CallArgs::new();
        for (kind, value) in self.kinds.iter().zip(args) {
            match kind {
                ArgKind::Simple => out.positional.push(value.clone()),
                ArgKind::Named(name) => out.keywords.push((name.clone(), value.clone())),
                ArgKind::List => match value {
                    Value::Tuple(items) => out.positional.extend(items.iter().cloned()),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "argument after * must be an iterable, not {}",
                            other.type_name()
                        )));
                    }
                },
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, kind) in self.kinds.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match kind {
                ArgKind::Simple => f.write_str("_")?,
                ArgKind::Named(name) => write!(f, "{name}=_")?,
                ArgKind::List => f.write_str("*_")?,
            }
        }
        f.write_str(")")
    }
}

// =============================================================================
// Invoke Binder
// =============================================================================

/// What the compiler knew about the callee expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    /// Only known at run time.
    Dynamic,
    /// Statically known to be a type object.
    TypeObject,
}

/// Binding strategy for one call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvokeBinder {
    signature: CallSignature,
    receiver: ReceiverKind,
}

impl InvokeBinder {
    /// Binder for an untyped receiver.
    pub fn new(signature: CallSignature) -> Self {
        Self {
            signature,
            receiver: ReceiverKind::Dynamic,
        }
    }

    /// Binder for a site whose callee is statically a type.
    pub fn typed(signature: CallSignature) -> Self {
        Self {
            signature,
            receiver: ReceiverKind::TypeObject,
        }
    }

    #[inline]
    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    #[inline]
    pub fn receiver(&self) -> ReceiverKind {
        self.receiver
    }

    #[inline]
    pub fn is_statically_typed(&self) -> bool {
        self.receiver == ReceiverKind::TypeObject
    }

    /// Binder for calling a slot with the receiver passed first.
    pub fn with_leading_receiver(&self) -> Self {
        Self {
            signature: self.signature.with_leading_receiver(),
            receiver: ReceiverKind::Dynamic,
        }
    }
}

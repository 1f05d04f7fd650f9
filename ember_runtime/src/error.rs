//! Runtime errors raised by the object model.
//!
//! These map onto the exceptions a dynamic program would observe
//! (`TypeError` and friends). Call-site layers wrap them rather than
//! inventing parallel variants.

use crate::object::mro::MroError;
use thiserror::Error;

/// Errors during object model operations and calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Generic type error (`TypeError` in the hosted language).
    #[error("TypeError: {message}")]
    TypeError { message: String },

    /// Argument binding failed for a callable.
    #[error("TypeError: {callable}() {message}")]
    ArgumentError { callable: String, message: String },

    /// Value is not callable.
    #[error("TypeError: '{type_name}' object is not callable")]
    NotCallable { type_name: String },

    /// `__init__` returned something other than None.
    #[error("TypeError: __init__() should return None, not '{type_name}'")]
    InitReturnedNonNone { type_name: String },

    /// Native layout has no constructor usable for plain allocation.
    #[error("TypeError: cannot create '{type_name}' instances")]
    NotInstantiable { type_name: String },

    /// Attribute lookup failed.
    #[error("AttributeError: '{type_name}' object has no attribute '{name}'")]
    AttributeError { type_name: String, name: String },

    /// Bases carry metaclasses where neither derives from the other.
    #[error(
        "TypeError: metaclass conflict: the metaclass of a derived class must be a \
         (non-strict) subclass of the metaclasses of all its bases"
    )]
    MetaclassConflict,

    /// Class creation failed to linearize its bases.
    #[error(transparent)]
    Mro(#[from] MroError),
}

impl RuntimeError {
    /// Build a `TypeError` from any message.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Build an argument binding error for the named callable.
    pub fn argument(callable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArgumentError {
            callable: callable.into(),
            message: message.into(),
        }
    }
}

/// Result type for object model operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

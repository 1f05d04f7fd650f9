//! Error types for call binding.

use ember_runtime::RuntimeError;
use thiserror::Error;

/// Failures of the binding machinery itself, as opposed to errors raised by
/// the code being called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// No specialized target shape exists for this many arguments.
    #[error("no specialized call target for {arity} arguments (supported up to {cap})")]
    UnsupportedArity { arity: usize, cap: usize },

    #[error("invalid fast-binding configuration: {message}")]
    InvalidConfig { message: String },

    #[error("invalid call signature: {message}")]
    InvalidSignature { message: String },

    /// A call site was invoked with a different argument count than its
    /// signature describes.
    #[error("call site expects {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
}

impl BindError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }
}

/// Error surfaced by call sites.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    /// Raised by user code or the runtime protocol.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

impl VmError {
    /// The runtime error, if this is one.
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            VmError::Runtime(err) => Some(err),
            VmError::Bind(_) => None,
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_is_transparent() {
        let err: VmError = RuntimeError::type_error("boom").into();
        assert_eq!(err.to_string(), RuntimeError::type_error("boom").to_string());
        assert!(err.as_runtime().is_some());
    }

    #[test]
    fn test_unsupported_arity_message() {
        let err = BindError::UnsupportedArity { arity: 6, cap: 5 };
        assert_eq!(
            err.to_string(),
            "no specialized call target for 6 arguments (supported up to 5)"
        );
    }
}

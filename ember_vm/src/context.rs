//! Per-module execution context.

use crate::fast_bind::{FastBinder, fast_binder};
use ember_runtime::{InternedString, intern};
use std::sync::Arc;

/// Context threaded through every call made on behalf of a module's code.
#[derive(Debug, Clone)]
pub struct CodeContext {
    module: InternedString,
    binder: Arc<FastBinder>,
}

impl CodeContext {
    /// Context using the process-wide binder.
    pub fn new(module: &str) -> Self {
        Self::with_binder(module, fast_binder().clone())
    }

    /// Context with its own binder, isolating caches and statistics.
    pub fn with_binder(module: &str, binder: Arc<FastBinder>) -> Self {
        Self {
            module: intern(module),
            binder,
        }
    }

    #[inline]
    pub fn module(&self) -> &InternedString {
        &self.module
    }

    /// Binder used by sites running in this context.
    #[inline]
    pub fn fast_binder(&self) -> &FastBinder {
        &self.binder
    }
}

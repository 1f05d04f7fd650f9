//! Callable value types.

pub mod function;

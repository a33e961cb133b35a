//! Traits da HAL

pub mod env;

pub use env::{ContextId, ExecEnv, CONTEXT_KERNEL};

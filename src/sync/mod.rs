//! # Synchronization Primitives
//!
//! - **Spinlock**: tabelas do pager (seções curtas, sem I/O)
//! - **spin::Mutex**: tabelas folha (stats por contexto, slots do backing
//!   store, sink de log)
//!
//! Ordem de lock: aspace -> frame table -> política. Nunca o contrário.

pub mod spinlock;

pub use spinlock::{Spinlock, SpinlockGuard};

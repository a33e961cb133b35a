//! Forge Pager Library.
//!
//! Motor de demand paging do Redstone OS: frame table, políticas de
//! eviction, backing store plugável e tratamento de page faults.
//!
//! Roda `no_std` + `alloc`. O ambiente (scheduler, IRQs, relógio) entra
//! pelo trait [`hal::ExecEnv`]; [`hal::HostEnv`] é a implementação
//! simulada usada nos testes.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (necessário para Vec/Box/Arc)
extern crate alloc;

// --- Infraestrutura ---
pub mod drivers; // Sink serial dos logs
pub mod logging; // Macros kinfo!/kwarn!/...
pub mod sync; // Spinlock

// --- Núcleo ---
pub mod hal; // Contrato com o ambiente de execução
pub mod klib; // Bitmap
pub mod mm; // Paginação

pub use hal::{ContextId, ExecEnv, HostEnv};
pub use mm::*;

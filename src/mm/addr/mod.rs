//! # Addr - Wrappers Type-Safe para Endereços
//!
//! Tipos distintos para PhysAddr (frames do pool) e VirtAddr (páginas das
//! arenas) evitando confusão.

mod phys;
mod virt;

pub use phys::PhysAddr;
pub use virt::VirtAddr;

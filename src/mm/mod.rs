//! # Memory Management Subsystem (MM)
//!
//! Motor de demand paging do Redstone OS. Arenas virtuais podem ser maiores
//! que a memória física: páginas são carregadas no primeiro acesso e
//! evictadas para um backing store quando os frames acabam.
//!
//! ## 🏗️ Arquitetura dos Módulos
//!
//! | Módulo    | Responsabilidade |
//! |-----------|------------------|
//! | `aspace`  | Janela virtual, arenas e estado de cada página. |
//! | `pfm`     | Frame table: flags, rmap e conteúdo de cada frame. |
//! | `reclaim` | Políticas de escolha de vítima (NRU, LRU). |
//! | `swap`    | Trait do backing store e implementações (RAM, bloco). |
//! | `pager`   | Orquestra fault, eviction, page_in/out e pin. |
//! | `fault`   | Entrada de faults vindos do trap handler. |
//! | `stats`   | Contadores globais e por contexto, histogramas de timing. |
//!
//! ## 🔒 Locking Hierárquico
//!
//! `aspace -> pfm -> reclaim`, com o conteúdo dos frames como folha.
//! O backing store é sempre chamado sem nenhum desses locks.

pub mod addr;
pub mod aspace;
pub mod config;
pub mod error;
pub mod fault;
pub mod pager;
pub mod pfm;
pub mod reclaim;
pub mod stats;
pub mod swap;

pub use addr::{PhysAddr, VirtAddr};
pub use aspace::{Arena, ArenaId, MapFlags, PageState};
pub use config::{HistogramConfig, PagerConfig, HISTOGRAM_BINS, PAGE_SIZE};
pub use error::{PagerError, PagerResult};
pub use fault::{AccessType, FatalReason, FaultOutcome, PageFaultInfo};
pub use pager::{PageInfo, Pager};
pub use pfm::{FrameFlags, FrameStats};
pub use reclaim::{EvictionPolicy, LruPolicy, NruPolicy};
pub use stats::{HistogramKind, HistogramRecord, PagingStats};
pub use swap::{
    BackingStore, BlockDevice, BlockStore, RamDisk, RamStore, StoreError, StoreResult, SwapSlot,
};

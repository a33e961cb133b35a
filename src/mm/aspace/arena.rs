//! # Arena
//!
//! Região contígua de páginas virtuais criada por `map`. Cada página tem
//! exatamente um estado ([`PageState`]).

use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::mm::addr::VirtAddr;
use crate::mm::config::PAGE_SIZE;
use crate::mm::fault::AccessType;
use crate::mm::pfm::FrameId;
use crate::mm::swap::SwapSlot;

/// Identificador único de uma arena (nunca reutilizado)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaId(pub u64);

bitflags! {
    /// Flags de mapeamento
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MapFlags: u32 {
        /// Escrita permitida (leitura é sempre permitida)
        const WRITE = 1 << 0;
        /// Execução permitida
        const EXEC = 1 << 1;
        /// Acessível em user mode
        const USER = 1 << 2;
        /// Páginas carregadas e pinadas já no map
        const LOCK = 1 << 3;
    }
}

/// Estado de uma página virtual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Reservada, nunca carregada: o primeiro acesso zera um frame
    Reserved,
    /// Em memória no frame indicado
    Resident(FrameId),
    /// Conteúdo no slot do backing store
    Evicted(SwapSlot),
    /// Page-in ou page-out em curso; faults nela esperam
    InTransit,
}

/// Handle de uma arena mapeada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
    id: ArenaId,
    base: VirtAddr,
    pages: usize,
    flags: MapFlags,
}

impl Arena {
    pub(crate) const fn new(id: ArenaId, base: VirtAddr, pages: usize, flags: MapFlags) -> Self {
        Self {
            id,
            base,
            pages,
            flags,
        }
    }

    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub fn base(&self) -> VirtAddr {
        self.base
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Tamanho em bytes
    pub fn size(&self) -> usize {
        self.pages * PAGE_SIZE
    }

    pub fn flags(&self) -> MapFlags {
        self.flags
    }

    /// Primeiro endereço depois da arena
    pub fn end(&self) -> VirtAddr {
        self.base.add(self.size() as u64)
    }

    pub fn contains(&self, addr: VirtAddr) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Índice da página que contém `addr`
    pub fn page_index(&self, addr: VirtAddr) -> Option<usize> {
        if self.contains(addr) {
            Some((addr.offset_from(self.base) / PAGE_SIZE as u64) as usize)
        } else {
            None
        }
    }

    pub fn page_addr(&self, index: usize) -> VirtAddr {
        self.base.add((index * PAGE_SIZE) as u64)
    }

    pub fn permits(&self, access: AccessType) -> bool {
        match access {
            AccessType::Read => true,
            AccessType::Write => self.flags.contains(MapFlags::WRITE),
            AccessType::Execute => self.flags.contains(MapFlags::EXEC),
        }
    }
}

/// Arena + estado de cada página (vive dentro do address space)
#[derive(Debug)]
pub struct ArenaEntry {
    pub arena: Arena,
    pub pages: Vec<PageState>,
}

impl ArenaEntry {
    pub(crate) fn new(arena: Arena) -> Self {
        Self {
            arena,
            pages: vec![PageState::Reserved; arena.pages()],
        }
    }

    pub fn has_pages_in_transit(&self) -> bool {
        self.pages.iter().any(|s| *s == PageState::InTransit)
    }
}

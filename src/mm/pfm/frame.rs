//! # Frame Info
//!
//! Metadados de um frame físico do pool paginável.

use bitflags::bitflags;

use crate::mm::addr::{PhysAddr, VirtAddr};
use crate::mm::config::PAGE_SIZE;
use crate::mm::swap::SwapSlot;

/// Índice do frame na tabela
pub type FrameId = usize;

// =============================================================================
// FRAME FLAGS
// =============================================================================

bitflags! {
    /// Flags de um frame físico
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u32 {
        /// Frame associado a uma página virtual
        const MAPPED = 1 << 0;
        /// Nunca selecionado para eviction
        const PINNED = 1 << 1;
        /// Em trânsito (page-in/page-out em curso)
        const BUSY = 1 << 2;
        /// Conteúdo difere da cópia no backing store
        const DIRTY = 1 << 3;
        /// Acessado desde a última varredura
        const ACCESSED = 1 << 4;
    }
}

// =============================================================================
// FRAME STATE
// =============================================================================

/// Estado de um frame físico, derivado das flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Free,
    Mapped,
    Pinned,
    Busy,
}

// =============================================================================
// RMAP
// =============================================================================

/// Mapeamento reverso: qual página virtual ocupa o frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRef {
    /// Base da arena dona
    pub arena: VirtAddr,
    /// Página dentro da arena
    pub index: usize,
}

impl PageRef {
    pub const fn new(arena: VirtAddr, index: usize) -> Self {
        Self { arena, index }
    }

    /// Endereço virtual da página
    pub const fn addr(&self) -> VirtAddr {
        self.arena.add((self.index * PAGE_SIZE) as u64)
    }
}

// =============================================================================
// FRAME INFO
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    phys: PhysAddr,
    flags: FrameFlags,
    owner: Option<PageRef>,
    /// Slot que guarda uma cópia do conteúdo (válida enquanto !DIRTY)
    slot: Option<SwapSlot>,
    /// Geração do último acesso (LRU)
    last_access: u64,
}

impl FrameInfo {
    pub const fn new(phys: PhysAddr) -> Self {
        Self {
            phys,
            flags: FrameFlags::empty(),
            owner: None,
            slot: None,
            last_access: 0,
        }
    }

    pub fn phys(&self) -> PhysAddr {
        self.phys
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    pub fn owner(&self) -> Option<PageRef> {
        self.owner
    }

    pub fn slot(&self) -> Option<SwapSlot> {
        self.slot
    }

    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    pub fn state(&self) -> FrameState {
        if !self.flags.contains(FrameFlags::MAPPED) {
            FrameState::Free
        } else if self.flags.contains(FrameFlags::BUSY) {
            FrameState::Busy
        } else if self.flags.contains(FrameFlags::PINNED) {
            FrameState::Pinned
        } else {
            FrameState::Mapped
        }
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.flags.contains(FrameFlags::MAPPED)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.flags.contains(FrameFlags::PINNED)
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.flags.contains(FrameFlags::BUSY)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(FrameFlags::DIRTY)
    }

    #[inline]
    pub fn is_accessed(&self) -> bool {
        self.flags.contains(FrameFlags::ACCESSED)
    }

    /// Candidato a eviction: mapeado, não pinado, não em trânsito
    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.is_mapped() && !self.is_pinned() && !self.is_busy() && self.owner.is_some()
    }

    /// Zera o bit de acesso (varredura das políticas)
    pub fn clear_accessed(&mut self) {
        self.flags.remove(FrameFlags::ACCESSED);
    }

    // -------------------------------------------------------------------------
    // Mutação (apenas a frame table, sob o lock)
    // -------------------------------------------------------------------------

    pub(crate) fn assign(&mut self, owner: PageRef, now: u64) {
        self.flags = FrameFlags::MAPPED | FrameFlags::BUSY;
        self.owner = Some(owner);
        self.slot = None;
        self.last_access = now;
    }

    pub(crate) fn reset(&mut self) -> Option<SwapSlot> {
        self.flags = FrameFlags::empty();
        self.owner = None;
        self.last_access = 0;
        self.slot.take()
    }

    pub(crate) fn insert_flags(&mut self, flags: FrameFlags) {
        self.flags.insert(flags);
    }

    pub(crate) fn remove_flags(&mut self, flags: FrameFlags) {
        self.flags.remove(flags);
    }

    pub(crate) fn set_slot(&mut self, slot: Option<SwapSlot>) {
        self.slot = slot;
    }

    pub(crate) fn take_slot(&mut self) -> Option<SwapSlot> {
        self.slot.take()
    }

    pub(crate) fn touch(&mut self, write: bool, now: u64) {
        self.flags.insert(FrameFlags::ACCESSED);
        if write {
            self.flags.insert(FrameFlags::DIRTY);
        }
        self.last_access = now;
    }
}

//! # Address Space
//!
//! Janela virtual do pager e as arenas reservadas nela. Reserva first-fit,
//! com páginas de guarda opcionais em volta de cada arena (nunca mapeadas:
//! acesso nelas é fault fatal).
//!
//! O address space não sabe nada de frames nem de backing store; ele só
//! guarda o estado de cada página. Protegido pelo lock mais externo do
//! pager.

pub mod arena;

use alloc::collections::BTreeMap;

use crate::mm::addr::VirtAddr;
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::{PagerError, PagerResult};
use crate::mm::pfm::PageRef;

pub use arena::{Arena, ArenaEntry, ArenaId, MapFlags, PageState};

pub struct AddressSpace {
    window_start: u64,
    window_end: u64,
    /// Bytes de guarda de cada lado da arena
    guard: u64,
    /// Arenas indexadas pela base
    arenas: BTreeMap<u64, ArenaEntry>,
    next_id: u64,
    committed_pages: usize,
}

impl AddressSpace {
    pub fn new(base: VirtAddr, size: usize, guard_pages: usize) -> Self {
        Self {
            window_start: base.as_u64(),
            window_end: base.as_u64() + size as u64,
            guard: (guard_pages * PAGE_SIZE) as u64,
            arenas: BTreeMap::new(),
            next_id: 1,
            committed_pages: 0,
        }
    }

    /// Páginas reservadas em todas as arenas
    pub fn committed_pages(&self) -> usize {
        self.committed_pages
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArenaEntry> {
        self.arenas.values()
    }

    /// Reserva `pages` páginas contíguas, todas Reserved
    pub fn reserve(&mut self, pages: usize, flags: MapFlags) -> PagerResult<Arena> {
        if pages == 0 {
            return Err(PagerError::InvalidSize);
        }
        let bytes = pages
            .checked_mul(PAGE_SIZE)
            .ok_or(PagerError::InvalidSize)? as u64;
        let base = self
            .find_free_region(bytes)
            .ok_or(PagerError::OutOfVirtualSpace)?;

        let arena = Arena::new(ArenaId(self.next_id), VirtAddr::new(base), pages, flags);
        self.next_id += 1;
        self.arenas.insert(base, ArenaEntry::new(arena));
        self.committed_pages += pages;
        Ok(arena)
    }

    /// First-fit. Cada arena ocupa [base - guard, fim + guard).
    fn find_free_region(&self, bytes: u64) -> Option<u64> {
        let needed = bytes.checked_add(2 * self.guard)?;
        let mut candidate = self.window_start;
        for (&base, entry) in &self.arenas {
            let lo = base - self.guard;
            let hi = base + entry.arena.size() as u64 + self.guard;
            if candidate.checked_add(needed)? <= lo {
                return Some(candidate + self.guard);
            }
            candidate = candidate.max(hi);
        }
        if candidate.checked_add(needed)? <= self.window_end {
            Some(candidate + self.guard)
        } else {
            None
        }
    }

    /// Entrada da arena, se o handle ainda for válido
    pub fn get(&self, arena: &Arena) -> Option<&ArenaEntry> {
        self.arenas
            .get(&arena.base().as_u64())
            .filter(|e| e.arena.id() == arena.id())
    }

    /// Remove a arena e devolve os estados das páginas
    pub fn remove(&mut self, arena: &Arena) -> PagerResult<ArenaEntry> {
        if self.get(arena).is_none() {
            return Err(PagerError::NotMapped);
        }
        let entry = self
            .arenas
            .remove(&arena.base().as_u64())
            .ok_or(PagerError::NotMapped)?;
        self.committed_pages -= entry.arena.pages();
        Ok(entry)
    }

    /// Arena que contém `addr` e o índice da página
    pub fn lookup(&self, addr: VirtAddr) -> Option<(&ArenaEntry, usize)> {
        let (_, entry) = self.arenas.range(..=addr.as_u64()).next_back()?;
        let index = entry.arena.page_index(addr)?;
        Some((entry, index))
    }

    pub fn lookup_mut(&mut self, addr: VirtAddr) -> Option<(&mut ArenaEntry, usize)> {
        let (_, entry) = self.arenas.range_mut(..=addr.as_u64()).next_back()?;
        let index = entry.arena.page_index(addr)?;
        Some((entry, index))
    }

    pub fn page_state(&self, addr: VirtAddr) -> Option<PageState> {
        self.lookup(addr).map(|(entry, index)| entry.pages[index])
    }

    /// Estado da página apontada pelo rmap de um frame
    pub fn page_mut(&mut self, page: PageRef) -> Option<&mut PageState> {
        self.arenas
            .get_mut(&page.arena.as_u64())
            .and_then(|e| e.pages.get_mut(page.index))
    }

    /// Todas as `pages` páginas a partir de `start` pertencem a arenas?
    pub fn covers(&self, start: VirtAddr, pages: usize) -> bool {
        (0..pages).all(|i| {
            start
                .checked_add(i * PAGE_SIZE)
                .is_some_and(|addr| self.lookup(addr).is_some())
        })
    }
}

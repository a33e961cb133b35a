//! Introspecção e auditoria das tabelas.

use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use super::Pager;
use crate::mm::addr::{PhysAddr, VirtAddr};
use crate::mm::aspace::{Arena, PageState};
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::{PagerError, PagerResult};
use crate::mm::pfm::{FrameStats, PageRef};
use crate::mm::swap::SwapSlot;

/// Visão externa do estado de uma página
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageInfo {
    Reserved,
    Resident {
        phys: PhysAddr,
        pinned: bool,
        dirty: bool,
        accessed: bool,
    },
    Evicted {
        slot: SwapSlot,
    },
    InTransit,
}

impl Pager {
    pub fn page_info(&self, addr: VirtAddr) -> PagerResult<PageInfo> {
        let aspace = self.aspace.lock();
        let state = aspace.page_state(addr).ok_or(PagerError::NotMapped)?;
        Ok(match state {
            PageState::Reserved => PageInfo::Reserved,
            PageState::InTransit => PageInfo::InTransit,
            PageState::Evicted(slot) => PageInfo::Evicted { slot },
            PageState::Resident(id) => {
                let frames = self.frames.lock();
                let frame = frames.frame(id)?;
                PageInfo::Resident {
                    phys: frame.phys(),
                    pinned: frame.is_pinned(),
                    dirty: frame.is_dirty(),
                    accessed: frame.is_accessed(),
                }
            }
        })
    }

    /// Arena que contém `addr`
    pub fn arena_of(&self, addr: VirtAddr) -> Option<Arena> {
        self.aspace.lock().lookup(addr).map(|(entry, _)| entry.arena)
    }

    /// Páginas reservadas em todas as arenas
    pub fn committed_pages(&self) -> usize {
        self.aspace.lock().committed_pages()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.frames.lock().stats()
    }

    /// Bytes em frames livres
    pub fn free_memory(&self) -> usize {
        self.frames.lock().free_count() * PAGE_SIZE
    }

    /// Verifica a consistência entre address space, frame table e slots.
    ///
    /// - todo Resident aponta para um frame MAPPED cujo rmap volta à página
    /// - nenhum frame é dono de duas páginas
    /// - todo frame MAPPED fora de trânsito pertence a alguma página
    /// - nenhum slot é referenciado duas vezes
    pub fn audit(&self) -> bool {
        let aspace = self.aspace.lock();
        let frames = self.frames.lock();
        let mut ok = true;
        let mut claimed: Vec<Option<PageRef>> = vec![None; frames.frame_count()];
        let mut slots = BTreeSet::new();

        for entry in aspace.iter() {
            for (index, state) in entry.pages.iter().enumerate() {
                let page = PageRef::new(entry.arena.base(), index);
                match *state {
                    PageState::Resident(id) => {
                        let Ok(frame) = frames.frame(id) else {
                            crate::kerror!("(AUDIT) Resident com frame inexistente: ", id);
                            ok = false;
                            continue;
                        };
                        if !frame.is_mapped() || frame.is_busy() || frame.owner() != Some(page) {
                            crate::kerror!("(AUDIT) rmap divergente na pagina ", page.addr().as_u64());
                            ok = false;
                        }
                        if claimed[id].replace(page).is_some() {
                            crate::kerror!("(AUDIT) Frame com dois donos: ", id);
                            ok = false;
                        }
                        if let Some(slot) = frame.slot() {
                            if !slots.insert(slot) {
                                crate::kerror!("(AUDIT) Slot duplicado: ", slot.0);
                                ok = false;
                            }
                        }
                    }
                    PageState::Evicted(slot) => {
                        if !slots.insert(slot) {
                            crate::kerror!("(AUDIT) Slot duplicado: ", slot.0);
                            ok = false;
                        }
                    }
                    PageState::Reserved | PageState::InTransit => {}
                }
            }
        }

        let mut free = 0;
        for (id, frame) in frames.frames().iter().enumerate() {
            if !frame.is_mapped() {
                free += 1;
                if frame.owner().is_some() || !frame.flags().is_empty() {
                    crate::kerror!("(AUDIT) Frame livre com estado: ", id);
                    ok = false;
                }
            } else if !frame.is_busy() && claimed[id].is_none() {
                crate::kerror!("(AUDIT) Frame mapeado sem pagina: ", id);
                ok = false;
            }
        }
        if free != frames.free_count() {
            crate::kerror!("(AUDIT) Contagem de livres divergente: ", free);
            ok = false;
        }
        if slots.len() > self.store.slots_in_use() {
            crate::kerror!("(AUDIT) Slots referenciados sem reserva: ", slots.len());
            ok = false;
        }
        ok
    }
}

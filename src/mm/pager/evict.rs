//! Eviction: escolha da vítima, write-back e page_out explícito.

use alloc::vec::Vec;

use super::Pager;
use crate::hal::ContextId;
use crate::mm::addr::VirtAddr;
use crate::mm::aspace::PageState;
use crate::mm::error::{PagerError, PagerResult};
use crate::mm::pfm::{FrameId, FrameInfo, PageRef};
use crate::mm::stats::HistogramKind;
use crate::mm::swap::{StoreError, SwapSlot};

/// Página que está saindo da memória (frame BUSY, página InTransit)
#[derive(Debug, Clone, Copy)]
pub(super) struct Victim {
    frame: FrameId,
    page: PageRef,
    dirty: bool,
    slot: Option<SwapSlot>,
}

impl Victim {
    fn from_frame(frame: FrameId, info: &FrameInfo) -> Option<Self> {
        Some(Self {
            frame,
            page: info.owner()?,
            dirty: info.is_dirty(),
            slot: info.slot(),
        })
    }
}

impl Pager {
    /// Libera um frame para `owner` evictando uma vítima.
    ///
    /// O frame da vítima é repassado direto ao novo dono (ainda BUSY), sem
    /// passar pelo pool livre.
    pub(super) fn evict_for(&self, owner: PageRef, context: ContextId) -> PagerResult<FrameId> {
        let started = self.env.now();

        // [lock] escolher a vítima e marcá-la em trânsito
        let victim = {
            let mut aspace = self.aspace.lock();
            let mut frames = self.frames.lock();
            let id = {
                let mut policy = self.policy.lock();
                frames.select_victim(&mut **policy, started)?
            };
            let victim = frames.frame(id).ok().and_then(|f| Victim::from_frame(id, f));
            let state = victim.and_then(|v| aspace.page_mut(v.page));
            match (victim, state) {
                (Some(victim), Some(state)) => {
                    *state = PageState::InTransit;
                    victim
                }
                _ => {
                    crate::kerror!("(EVICT) Frame sem pagina dona: ", id);
                    frames.clear_busy(id)?;
                    return Err(PagerError::OutOfMemory);
                }
            }
        };
        self.stats
            .record_timing(HistogramKind::Eviction, self.env.now().saturating_sub(started));

        // [unlock] write-back
        let dest = match self.write_back(&victim) {
            Ok(dest) => dest,
            Err(e) => {
                self.restore_victims(core::slice::from_ref(&victim));
                return Err(e);
            }
        };

        // [lock] vítima sai, novo dono entra
        {
            let mut aspace = self.aspace.lock();
            if let Some(state) = aspace.page_mut(victim.page) {
                *state = dest;
            }
            self.frames.lock().reassign(victim.frame, owner)?;
        }
        self.stats.record_eviction(context, victim.dirty);
        crate::ktrace!(
            "(EVICT) frame=",
            victim.frame,
            " pagina=",
            victim.page.addr().as_u64()
        );
        Ok(victim.frame)
    }

    /// Garante cópia válida no backing store. Retorna o estado final da página.
    fn write_back(&self, victim: &Victim) -> PagerResult<PageState> {
        if !victim.dirty {
            return Ok(victim
                .slot
                .map_or(PageState::Reserved, PageState::Evicted));
        }
        let (slot, fresh) = match victim.slot {
            Some(slot) => (slot, false),
            None => (self.acquire_slot()?, true),
        };
        if let Err(e) = self.write_slot_from(victim.frame, slot) {
            if fresh {
                self.store.free_slot(slot);
            }
            return Err(e);
        }
        Ok(PageState::Evicted(slot))
    }

    /// Slot livre; sem nenhum, rouba o slot de uma cópia em cache
    fn acquire_slot(&self) -> PagerResult<SwapSlot> {
        match self.store.allocate_slot() {
            Ok(slot) => Ok(slot),
            Err(StoreError::OutOfSlots) => {
                let stolen = self.frames.lock().take_cached_slot();
                match stolen {
                    Some(slot) => {
                        crate::ktrace!("(EVICT) Slot reaproveitado de cache: ", slot.0);
                        Ok(slot)
                    }
                    None => {
                        crate::kwarn!("(EVICT) Backing store sem slots");
                        Err(PagerError::OutOfSlots)
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_slot_from(&self, frame: FrameId, slot: SwapSlot) -> PagerResult<()> {
        let started = self.env.now();
        let result = self
            .frames
            .with_data(frame, |data| self.store.write_slot(slot, data));
        self.stats
            .record_timing(HistogramKind::PageOut, self.env.now().saturating_sub(started));
        result.map_err(|e| {
            crate::kwarn!("(EVICT) Falha de escrita no slot ", slot.0);
            PagerError::from(e)
        })
    }

    /// Desfaz a marcação: páginas voltam a Resident, frames saem de BUSY
    fn restore_victims(&self, victims: &[Victim]) {
        let mut aspace = self.aspace.lock();
        let mut frames = self.frames.lock();
        for victim in victims {
            if let Some(state) = aspace.page_mut(victim.page) {
                *state = PageState::Resident(victim.frame);
            }
            let _ = frames.clear_busy(victim.frame);
        }
    }

    /// Desfaz um page_out: slots novos voltam ao store, vítimas voltam a Resident.
    ///
    /// Um slot já existente pode ter sido regravado; a página continua DIRTY,
    /// então a cópia dele segue sem valor.
    fn abort_page_out(&self, victims: &[Victim], fresh: &[SwapSlot]) {
        for &slot in fresh {
            self.store.free_slot(slot);
        }
        self.restore_victims(victims);
    }

    // =========================================================================
    // PAGE OUT
    // =========================================================================

    /// Evicta as páginas residentes do intervalo.
    ///
    /// Pinadas, Reserved e Evicted são ignoradas. Se não houver slots para
    /// todas as páginas sujas, nada muda e retorna `OutOfSlots`.
    pub fn page_out(&self, addr: VirtAddr, size: usize) -> PagerResult<()> {
        self.ensure_blockable()?;
        let (start, pages) = Self::page_range(addr, size)?;
        let context = self.env.current_context();

        // [lock] marcar todas as vítimas
        let victims = loop {
            let mut aspace = self.aspace.lock();
            if !aspace.covers(start, pages) {
                return Err(PagerError::NotMapped);
            }
            let in_transit = (0..pages).any(|n| {
                aspace.page_state(Self::nth_page(start, n)) == Some(PageState::InTransit)
            });
            if in_transit {
                drop(aspace);
                self.env.relax();
                continue;
            }

            let mut frames = self.frames.lock();
            let mut victims = Vec::new();
            for n in 0..pages {
                let Some((entry, index)) = aspace.lookup_mut(Self::nth_page(start, n)) else {
                    continue;
                };
                let PageState::Resident(id) = entry.pages[index] else {
                    continue;
                };
                let victim = frames
                    .frame(id)
                    .ok()
                    .filter(|f| !f.is_pinned() && !f.is_busy())
                    .and_then(|f| Victim::from_frame(id, f));
                let Some(victim) = victim else {
                    continue;
                };
                if frames.mark_busy(id).is_err() {
                    continue;
                }
                entry.pages[index] = PageState::InTransit;
                victims.push(victim);
            }
            break victims;
        };

        // Reserva todos os slots antes de gravar qualquer coisa
        let needed = victims.iter().filter(|v| v.dirty && v.slot.is_none()).count();
        let mut fresh = Vec::with_capacity(needed);
        for _ in 0..needed {
            match self.store.allocate_slot() {
                Ok(slot) => fresh.push(slot),
                Err(e) => {
                    self.abort_page_out(&victims, &fresh);
                    crate::kwarn!("(PAGER) page_out sem slots. Necessarios=", needed);
                    return Err(e.into());
                }
            }
        }

        // [unlock] grava tudo; páginas seguem InTransit e frames BUSY
        let mut dests = Vec::with_capacity(victims.len());
        let mut unused = fresh.iter().copied();
        for victim in &victims {
            let dest = if victim.dirty {
                let slot = match victim.slot.or_else(|| unused.next()) {
                    Some(slot) => slot,
                    None => {
                        self.abort_page_out(&victims, &fresh);
                        return Err(PagerError::OutOfSlots);
                    }
                };
                if let Err(e) = self.write_slot_from(victim.frame, slot) {
                    self.abort_page_out(&victims, &fresh);
                    return Err(e);
                }
                PageState::Evicted(slot)
            } else {
                victim.slot.map_or(PageState::Reserved, PageState::Evicted)
            };
            dests.push(dest);
        }

        // [lock] tudo gravado: efetiva de uma vez
        {
            let mut aspace = self.aspace.lock();
            let mut frames = self.frames.lock();
            for (victim, dest) in victims.iter().zip(&dests) {
                if let Some(state) = aspace.page_mut(victim.page) {
                    *state = *dest;
                }
                if frames.release(victim.frame).is_err() {
                    crate::kerror!("(PAGER) page_out: frame inconsistente ", victim.frame);
                }
            }
        }
        for victim in &victims {
            self.stats.record_eviction(context, victim.dirty);
        }

        crate::kdebug!("(PAGER) page_out base=", start.as_u64(), " paginas=", pages);
        Ok(())
    }
}

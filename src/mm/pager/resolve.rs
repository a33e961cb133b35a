//! Resolução de faults, page_in e pin/unpin.

use alloc::vec::Vec;

use super::Pager;
use crate::hal::ContextId;
use crate::mm::addr::VirtAddr;
use crate::mm::aspace::PageState;
use crate::mm::error::{PagerError, PagerResult};
use crate::mm::fault::{AccessType, FatalReason};
use crate::mm::pfm::{FrameError, FrameId, PageRef};
use crate::mm::stats::HistogramKind;
use crate::mm::swap::SwapSlot;

/// O que a resolução fez com a página
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    /// Página carregada agora (false = já era residente)
    pub installed: bool,
    /// Frame passou a pinado nesta chamada
    pub newly_pinned: bool,
}

impl Pager {
    /// Torna a página de `addr` residente, opcionalmente pinada.
    pub(crate) fn resolve_fault(
        &self,
        addr: VirtAddr,
        access: AccessType,
        context: ContextId,
        pin: bool,
    ) -> PagerResult<Resolution> {
        // [lock] página -> InTransit (ou fault espúrio)
        let (page, source) = loop {
            let mut aspace = self.aspace.lock();
            let Some((entry, index)) = aspace.lookup_mut(addr) else {
                return Err(FatalReason::IllegalAccess(addr).into());
            };
            if !entry.arena.permits(access) {
                return Err(FatalReason::ProtectionViolation(addr).into());
            }
            let page = PageRef::new(entry.arena.base(), index);
            let state = entry.pages[index];
            match state {
                PageState::Resident(id) => {
                    let mut frames = self.frames.lock();
                    frames.touch(id, access.is_write())?;
                    let newly_pinned = if pin { frames.pin(id)? } else { false };
                    return Ok(Resolution {
                        installed: false,
                        newly_pinned,
                    });
                }
                PageState::InTransit => {
                    // Outro contexto está carregando ou evictando esta página
                    drop(aspace);
                    self.env.relax();
                }
                PageState::Reserved => {
                    entry.pages[index] = PageState::InTransit;
                    break (page, None);
                }
                PageState::Evicted(slot) => {
                    entry.pages[index] = PageState::InTransit;
                    break (page, Some(slot));
                }
            }
        };
        let previous = source.map_or(PageState::Reserved, PageState::Evicted);

        // [unlock] frame
        let frame = match self.obtain_frame(page, context) {
            Ok(frame) => frame,
            Err(e) => {
                self.set_page_state(page, previous);
                return Err(e);
            }
        };

        // [unlock] conteúdo
        if let Err(e) = self.fill_frame(frame, source) {
            let _ = self.frames.lock().release(frame);
            self.set_page_state(page, previous);
            return Err(e);
        }

        // [lock] instalar
        {
            let mut aspace = self.aspace.lock();
            if let Some(state) = aspace.page_mut(page) {
                *state = PageState::Resident(frame);
            }
            self.frames
                .lock()
                .finish_install(frame, source, access.is_write(), pin)?;
        }
        crate::ktrace!("(PAGER) page-in addr=", addr.as_u64(), " frame=", frame);
        Ok(Resolution {
            installed: true,
            newly_pinned: pin,
        })
    }

    /// Frame livre de menor endereço, ou o de uma vítima.
    ///
    /// Sem vítima (ou sem slot para ela) mas com frames em I/O, espera: eles
    /// voltam a ser evictáveis, livres ou donos de um slot roubável ao fim da
    /// operação.
    fn obtain_frame(&self, page: PageRef, context: ContextId) -> PagerResult<FrameId> {
        loop {
            let free = self.frames.lock().allocate_free_frame(page);
            let result = match free {
                Ok(frame) => return Ok(frame),
                Err(FrameError::NoFreeFrame) => self.evict_for(page, context),
                Err(e) => return Err(e.into()),
            };
            match result {
                Err(PagerError::OutOfMemory | PagerError::OutOfSlots)
                    if self.frames.lock().has_busy() =>
                {
                    self.env.relax();
                }
                other => return other,
            }
        }
    }

    /// Carrega do slot ou zera
    fn fill_frame(&self, frame: FrameId, source: Option<SwapSlot>) -> PagerResult<()> {
        let Some(slot) = source else {
            self.frames.with_data_mut(frame, |data| data.fill(0));
            return Ok(());
        };
        let started = self.env.now();
        let result = self
            .frames
            .with_data_mut(frame, |data| self.store.read_slot(slot, data));
        self.stats
            .record_timing(HistogramKind::PageIn, self.env.now().saturating_sub(started));
        result.map_err(|e| {
            crate::kwarn!("(PAGER) Falha de leitura no slot ", slot.0);
            PagerError::from(e)
        })
    }

    // =========================================================================
    // PAGE IN / PIN
    // =========================================================================

    /// Carrega antecipadamente as páginas do intervalo
    pub fn page_in(&self, addr: VirtAddr, size: usize) -> PagerResult<()> {
        self.ensure_blockable()?;
        let (start, pages) = self.mapped_range(addr, size)?;
        let context = self.env.current_context();
        for n in 0..pages {
            self.resolve_fault(Self::nth_page(start, n), AccessType::Read, context, false)?;
        }
        Ok(())
    }

    /// Carrega e pina as páginas do intervalo. Em caso de falha, os pins
    /// feitos por esta chamada são desfeitos.
    pub fn pin(&self, addr: VirtAddr, size: usize) -> PagerResult<()> {
        self.ensure_blockable()?;
        let (start, pages) = self.mapped_range(addr, size)?;
        let context = self.env.current_context();
        let mut pinned = Vec::new();
        for n in 0..pages {
            let page = Self::nth_page(start, n);
            match self.resolve_fault(page, AccessType::Read, context, true) {
                Ok(r) if r.newly_pinned => pinned.push(page),
                Ok(_) => {}
                Err(e) => {
                    for &page in &pinned {
                        self.unpin_page(page);
                    }
                    crate::kwarn!("(PAGER) pin falhou em ", page.as_u64());
                    return Err(e);
                }
            }
        }
        crate::kdebug!("(PAGER) pin base=", start.as_u64(), " paginas=", pages);
        Ok(())
    }

    /// Libera os pins do intervalo. Páginas não residentes são ignoradas.
    pub fn unpin(&self, addr: VirtAddr, size: usize) -> PagerResult<()> {
        let (start, pages) = self.mapped_range(addr, size)?;
        for n in 0..pages {
            self.unpin_page(Self::nth_page(start, n));
        }
        Ok(())
    }

    fn unpin_page(&self, addr: VirtAddr) {
        let aspace = self.aspace.lock();
        if let Some(PageState::Resident(id)) = aspace.page_state(addr) {
            let _ = self.frames.lock().unpin(id);
        }
    }
}

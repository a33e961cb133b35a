//! # Pager
//!
//! Motor de demand paging: arenas virtuais maiores que a memória física,
//! frames carregados sob demanda e evictados para o backing store.
//!
//! ## Hierarquia de locks
//!
//! ```text
//! aspace  ->  frame table  ->  política
//!                  \
//!                   conteúdo do frame (folha)
//! ```
//!
//! Nenhum lock é segurado durante I/O do backing store. Páginas em I/O
//! ficam `InTransit` (e o frame BUSY): faults na mesma página esperam,
//! faults em outras páginas seguem em paralelo.
//!
//! ## Ciclo de um fault
//!
//! ```text
//! [lock]   página -> InTransit
//! [unlock] frame livre, ou eviction de uma vítima (grava se dirty)
//! [unlock] carrega o slot ou zera o frame
//! [lock]   página -> Resident, frame sai de BUSY
//! ```

mod access;
mod evict;
mod inspect;
mod resolve;

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::hal::{ContextId, ExecEnv};
use crate::mm::addr::{PhysAddr, VirtAddr};
use crate::mm::aspace::{AddressSpace, Arena, MapFlags, PageState};
use crate::mm::config::{pages_for, PagerConfig, PAGE_SIZE};
use crate::mm::error::{PagerError, PagerResult};
use crate::mm::pfm::{FrameTable, PageRef};
use crate::mm::reclaim::{EvictionPolicy, NruPolicy};
use crate::mm::stats::{HistogramKind, HistogramRecord, PagingStats, StatsCollector};
use crate::mm::swap::BackingStore;
use crate::sync::Spinlock;

pub use inspect::PageInfo;

pub struct Pager {
    config: PagerConfig,
    aspace: Spinlock<AddressSpace>,
    frames: FrameTable,
    policy: Spinlock<Box<dyn EvictionPolicy>>,
    store: Box<dyn BackingStore>,
    stats: StatsCollector,
    env: Arc<dyn ExecEnv>,
}

impl Pager {
    /// Monta o motor com a política padrão (NRU)
    pub fn new(
        config: PagerConfig,
        store: Box<dyn BackingStore>,
        env: Arc<dyn ExecEnv>,
    ) -> PagerResult<Self> {
        Self::with_policy(config, store, env, Box::new(NruPolicy::default()))
    }

    pub fn with_policy(
        config: PagerConfig,
        store: Box<dyn BackingStore>,
        env: Arc<dyn ExecEnv>,
        policy: Box<dyn EvictionPolicy>,
    ) -> PagerResult<Self> {
        config.validate()?;

        crate::kinfo!("(PAGER) Inicializando. Frames=", config.frames);
        crate::kinfo!("(PAGER) Slots no backing store=", store.slot_capacity());
        crate::kdebug!(
            "(PAGER) Janela virtual base=",
            config.virt_base,
            " tamanho=",
            config.virt_size
        );

        Ok(Self {
            aspace: Spinlock::new(AddressSpace::new(
                VirtAddr::new(config.virt_base),
                config.virt_size,
                config.guard_size(),
            )),
            frames: FrameTable::new(config.frames, PhysAddr::new(config.phys_base)),
            policy: Spinlock::new(policy),
            store,
            stats: StatsCollector::new(&config.histogram),
            env,
            config,
        })
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn env(&self) -> &dyn ExecEnv {
        &*self.env
    }

    pub fn store(&self) -> &dyn BackingStore {
        &*self.store
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.lock().name()
    }

    // =========================================================================
    // MAP / UNMAP
    // =========================================================================

    /// Reserva uma arena de `size` bytes (arredondado para páginas).
    ///
    /// Nenhuma página é carregada, exceto com `MapFlags::LOCK`, que carrega e
    /// pina tudo antes de retornar.
    pub fn map(&self, size: usize, flags: MapFlags) -> PagerResult<Arena> {
        if size == 0 {
            return Err(PagerError::InvalidSize);
        }
        let pages = pages_for(size);
        let limit = self.commit_limit();

        let arena = {
            let mut aspace = self.aspace.lock();
            if aspace.committed_pages().saturating_add(pages) > limit {
                crate::kwarn!("(PAGER) map excede o limite de commit. Paginas=", pages);
                return Err(PagerError::OutOfSlots);
            }
            aspace.reserve(pages, flags)?
        };

        if flags.contains(MapFlags::LOCK) {
            if let Err(e) = self.pin(arena.base(), arena.size()) {
                crate::kwarn!("(PAGER) map LOCK falhou ao pinar. Base=", arena.base().as_u64());
                // Nada foi pinado (pin desfaz os próprios pins)
                let _ = self.unmap(&arena);
                return Err(e);
            }
        }

        crate::kinfo!("(PAGER) map base=", arena.base().as_u64(), " paginas=", pages);
        Ok(arena)
    }

    /// Desfaz uma arena: frames voltam ao pool e slots ao backing store,
    /// sem write-back.
    pub fn unmap(&self, arena: &Arena) -> PagerResult<()> {
        let entry = loop {
            let mut aspace = self.aspace.lock();
            let entry = aspace.get(arena).ok_or(PagerError::NotMapped)?;
            if entry.has_pages_in_transit() {
                drop(aspace);
                self.env.relax();
                continue;
            }
            let mut entry = aspace.remove(arena)?;

            // Frames liberados ainda sob o lock do aspace
            let mut frames = self.frames.lock();
            for state in entry.pages.iter_mut() {
                if let PageState::Resident(id) = *state {
                    match frames.release(id) {
                        Ok(slot) => *state = slot.map_or(PageState::Reserved, PageState::Evicted),
                        Err(e) => crate::kerror!("(PAGER) unmap: frame inconsistente: ", e as u64),
                    }
                }
            }
            break entry;
        };

        // Slots devolvidos fora dos locks
        for state in &entry.pages {
            if let PageState::Evicted(slot) = *state {
                self.store.free_slot(slot);
            }
        }
        crate::kdebug!("(PAGER) unmap base=", arena.base().as_u64());
        Ok(())
    }

    // =========================================================================
    // ESTATÍSTICAS
    // =========================================================================

    /// Totais de faults e evictions do motor
    pub fn paging_stats(&self) -> PagingStats {
        self.stats.global()
    }

    /// Totais de um contexto
    pub fn context_stats(&self, context: ContextId) -> PagingStats {
        self.stats.context(context)
    }

    pub fn histogram(&self, kind: HistogramKind) -> HistogramRecord {
        self.stats.histogram(kind)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Páginas que podem ser reservadas no total: frames + slots, menos um
    /// slot. A página em fault segura o próprio slot enquanto a vítima é
    /// gravada; o slot reservado garante destino para essa vítima.
    pub fn commit_limit(&self) -> usize {
        self.frames.frame_count() + self.store.slot_capacity().saturating_sub(1)
    }

    fn ensure_blockable(&self) -> PagerResult<()> {
        if self.env.in_isr() {
            crate::kwarn!("(PAGER) Operação bloqueante dentro de ISR");
            return Err(PagerError::FaultInNonBlockableContext);
        }
        Ok(())
    }

    /// Páginas tocadas por [addr, addr + size)
    fn page_range(addr: VirtAddr, size: usize) -> PagerResult<(VirtAddr, usize)> {
        if size == 0 {
            return Err(PagerError::InvalidSize);
        }
        let end = addr
            .checked_add(size)
            .ok_or(PagerError::InvalidAddress)?;
        let start = addr.page_base();
        let span = end.offset_from(start) as usize;
        Ok((start, pages_for(span)))
    }

    /// Como `page_range`, exigindo que tudo esteja dentro de arenas
    fn mapped_range(&self, addr: VirtAddr, size: usize) -> PagerResult<(VirtAddr, usize)> {
        let (start, pages) = Self::page_range(addr, size)?;
        if !self.aspace.lock().covers(start, pages) {
            return Err(PagerError::NotMapped);
        }
        Ok((start, pages))
    }

    fn set_page_state(&self, page: PageRef, state: PageState) {
        if let Some(s) = self.aspace.lock().page_mut(page) {
            *s = state;
        }
    }

    #[inline]
    fn nth_page(start: VirtAddr, n: usize) -> VirtAddr {
        start.add((n * PAGE_SIZE) as u64)
    }
}

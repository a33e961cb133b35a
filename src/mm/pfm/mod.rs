//! # Page Frame Manager (PFM)
//!
//! Tabela de frames do pool paginável. Cada frame tem metadados
//! ([`FrameInfo`]) protegidos pelo lock da tabela e um buffer de conteúdo
//! com lock próprio.
//!
//! O lock de conteúdo é o mais interno da hierarquia: nunca é segurado ao
//! adquirir outro lock. Só quem detém o frame (BUSY, ou página Resident com
//! o lock do aspace tomado) toca no conteúdo, então ele não disputa.

pub mod frame;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::mm::addr::PhysAddr;
use crate::mm::config::PAGE_SIZE;
use crate::mm::reclaim::EvictionPolicy;
use crate::mm::swap::SwapSlot;
use crate::sync::{Spinlock, SpinlockGuard};

pub use frame::{FrameFlags, FrameId, FrameInfo, FrameState, PageRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Nenhum frame livre no pool
    NoFreeFrame,
    /// Todos os frames mapeados estão pinados ou em trânsito
    NoEvictableFrame,
    /// Índice fora da tabela
    InvalidFrame,
    /// Operação exige frame mapeado
    NotMapped,
}

impl FrameError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFreeFrame => "Nenhum frame livre",
            Self::NoEvictableFrame => "Nenhum frame evictável",
            Self::InvalidFrame => "Frame inexistente",
            Self::NotMapped => "Frame não mapeado",
        }
    }
}

pub type PfmResult<T> = Result<T, FrameError>;

/// Fotografia da ocupação do pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub total_frames: usize,
    pub free_frames: usize,
    pub mapped_frames: usize,
    pub pinned_frames: usize,
    pub busy_frames: usize,
    pub dirty_frames: usize,
    pub allocations: u64,
    pub frees: u64,
}

// =============================================================================
// METADADOS (sob o lock da tabela)
// =============================================================================

pub struct PageFrameManager {
    frames: Vec<FrameInfo>,
    base_phys: PhysAddr,
    free_frames: usize,
    /// Relógio lógico de acessos (LRU)
    access_clock: u64,
    allocations: u64,
    frees: u64,
}

impl PageFrameManager {
    fn new(count: usize, base_phys: PhysAddr) -> Self {
        let frames = (0..count)
            .map(|i| FrameInfo::new(base_phys.frame(i)))
            .collect();
        Self {
            frames,
            base_phys,
            free_frames: count,
            access_clock: 0,
            allocations: 0,
            frees: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_frames
    }

    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    pub fn frame(&self, id: FrameId) -> PfmResult<&FrameInfo> {
        self.frames.get(id).ok_or(FrameError::InvalidFrame)
    }

    fn frame_mut(&mut self, id: FrameId) -> PfmResult<&mut FrameInfo> {
        self.frames.get_mut(id).ok_or(FrameError::InvalidFrame)
    }

    fn mapped_mut(&mut self, id: FrameId) -> PfmResult<&mut FrameInfo> {
        let frame = self.frame_mut(id)?;
        if !frame.is_mapped() {
            return Err(FrameError::NotMapped);
        }
        Ok(frame)
    }

    pub fn phys_to_index(&self, phys: PhysAddr) -> Option<FrameId> {
        let addr = phys.as_u64();
        let base = self.base_phys.as_u64();
        if addr < base {
            return None;
        }
        let index = ((addr - base) / PAGE_SIZE as u64) as usize;
        if index < self.frames.len() {
            Some(index)
        } else {
            None
        }
    }

    fn tick(&mut self) -> u64 {
        self.access_clock += 1;
        self.access_clock
    }

    /// Pega o frame livre de menor endereço e o entrega MAPPED|BUSY a `owner`
    pub fn allocate_free_frame(&mut self, owner: PageRef) -> PfmResult<FrameId> {
        if self.free_frames == 0 {
            return Err(FrameError::NoFreeFrame);
        }
        let id = self
            .frames
            .iter()
            .position(|f| !f.is_mapped())
            .ok_or(FrameError::NoFreeFrame)?;
        let now = self.tick();
        self.frames[id].assign(owner, now);
        self.free_frames -= 1;
        self.allocations += 1;
        Ok(id)
    }

    /// Devolve o frame ao pool sem write-back. Retorna o slot que ele guardava.
    pub fn release(&mut self, id: FrameId) -> PfmResult<Option<SwapSlot>> {
        let slot = self.mapped_mut(id)?.reset();
        self.free_frames += 1;
        self.frees += 1;
        Ok(slot)
    }

    /// Repassa um frame em trânsito (vítima recém evictada) a outra página
    pub fn reassign(&mut self, id: FrameId, owner: PageRef) -> PfmResult<()> {
        let now = self.tick();
        let frame = self.mapped_mut(id)?;
        frame.assign(owner, now);
        Ok(())
    }

    /// Retorna true se o frame não estava pinado
    pub fn pin(&mut self, id: FrameId) -> PfmResult<bool> {
        let frame = self.mapped_mut(id)?;
        let newly = !frame.is_pinned();
        frame.insert_flags(FrameFlags::PINNED);
        Ok(newly)
    }

    /// Retorna true se o frame estava pinado
    pub fn unpin(&mut self, id: FrameId) -> PfmResult<bool> {
        let frame = self.mapped_mut(id)?;
        let was = frame.is_pinned();
        frame.remove_flags(FrameFlags::PINNED);
        Ok(was)
    }

    /// Registra um acesso de leitura/escrita
    pub fn touch(&mut self, id: FrameId, write: bool) -> PfmResult<()> {
        let now = self.tick();
        self.mapped_mut(id)?.touch(write, now);
        Ok(())
    }

    pub fn mark_busy(&mut self, id: FrameId) -> PfmResult<()> {
        self.mapped_mut(id)?.insert_flags(FrameFlags::BUSY);
        Ok(())
    }

    pub fn clear_busy(&mut self, id: FrameId) -> PfmResult<()> {
        self.mapped_mut(id)?.remove_flags(FrameFlags::BUSY);
        Ok(())
    }

    /// Fecha um page-in: conteúdo carregado de `slot` (ou zerado)
    pub fn finish_install(
        &mut self,
        id: FrameId,
        slot: Option<SwapSlot>,
        write: bool,
        pin: bool,
    ) -> PfmResult<()> {
        let now = self.tick();
        let frame = self.mapped_mut(id)?;
        // Sem slot e limpo = página zerada; evictar volta para Reserved
        frame.set_slot(slot);
        frame.touch(write, now);
        if pin {
            frame.insert_flags(FrameFlags::PINNED);
        }
        frame.remove_flags(FrameFlags::BUSY);
        Ok(())
    }

    /// Consulta a política e marca a vítima BUSY
    pub fn select_victim(
        &mut self,
        policy: &mut dyn EvictionPolicy,
        now: u64,
    ) -> PfmResult<FrameId> {
        let picked = policy.select(&mut self.frames, now);
        let id = match picked {
            Some(id) if self.frames.get(id).is_some_and(FrameInfo::is_evictable) => id,
            Some(id) => {
                crate::kwarn!("(PFM) Política escolheu frame não evictável: ", id);
                self.frames
                    .iter()
                    .position(FrameInfo::is_evictable)
                    .ok_or(FrameError::NoEvictableFrame)?
            }
            None => return Err(FrameError::NoEvictableFrame),
        };
        self.frames[id].insert_flags(FrameFlags::BUSY);
        Ok(id)
    }

    /// Algum frame em I/O (fault ou eviction em andamento)
    pub fn has_busy(&self) -> bool {
        self.frames.iter().any(FrameInfo::is_busy)
    }

    /// Rouba o slot de uma cópia limpa em cache. Prefere páginas já sujas
    /// (a cópia delas é obsoleta). A página perde a cópia e vira DIRTY.
    pub fn take_cached_slot(&mut self) -> Option<SwapSlot> {
        let candidate = |f: &FrameInfo| f.is_mapped() && !f.is_busy() && f.slot().is_some();
        let id = self
            .frames
            .iter()
            .position(|f| candidate(f) && f.is_dirty())
            .or_else(|| self.frames.iter().position(candidate))?;
        let frame = &mut self.frames[id];
        frame.insert_flags(FrameFlags::DIRTY);
        frame.take_slot()
    }

    pub fn stats(&self) -> FrameStats {
        let mut stats = FrameStats {
            total_frames: self.frames.len(),
            free_frames: self.free_frames,
            allocations: self.allocations,
            frees: self.frees,
            ..FrameStats::default()
        };
        for f in &self.frames {
            match f.state() {
                FrameState::Free => {}
                FrameState::Mapped => stats.mapped_frames += 1,
                FrameState::Pinned => {
                    stats.mapped_frames += 1;
                    stats.pinned_frames += 1;
                }
                FrameState::Busy => {
                    stats.mapped_frames += 1;
                    stats.busy_frames += 1;
                }
            }
            if f.is_mapped() && f.is_dirty() {
                stats.dirty_frames += 1;
            }
        }
        stats
    }
}

// =============================================================================
// FRAME TABLE
// =============================================================================

/// Pool de frames: metadados + conteúdo
pub struct FrameTable {
    meta: Spinlock<PageFrameManager>,
    data: Box<[Spinlock<Box<[u8]>>]>,
    base_phys: PhysAddr,
}

impl FrameTable {
    pub fn new(count: usize, base_phys: PhysAddr) -> Self {
        let data = (0..count)
            .map(|_| Spinlock::new(vec![0u8; PAGE_SIZE].into_boxed_slice()))
            .collect();
        Self {
            meta: Spinlock::new(PageFrameManager::new(count, base_phys)),
            data,
            base_phys,
        }
    }

    /// Trava os metadados
    pub fn lock(&self) -> SpinlockGuard<'_, PageFrameManager> {
        self.meta.lock()
    }

    pub fn frame_count(&self) -> usize {
        self.data.len()
    }

    pub fn base_phys(&self) -> PhysAddr {
        self.base_phys
    }

    /// Lê o conteúdo do frame
    pub fn with_data<R>(&self, id: FrameId, f: impl FnOnce(&[u8]) -> R) -> R {
        let data = self.data[id].lock();
        f(&data)
    }

    /// Escreve no conteúdo do frame
    pub fn with_data_mut<R>(&self, id: FrameId, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.data[id].lock();
        f(&mut data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::addr::VirtAddr;
    use crate::mm::reclaim::LruPolicy;

    fn owner(index: usize) -> PageRef {
        PageRef::new(VirtAddr::new(0x4000_0000), index)
    }

    fn table(count: usize) -> FrameTable {
        FrameTable::new(count, PhysAddr::new(0x10_0000))
    }

    #[test]
    fn allocation_prefers_lowest_frame() {
        let t = table(3);
        let mut pfm = t.lock();
        assert_eq!(pfm.allocate_free_frame(owner(0)), Ok(0));
        assert_eq!(pfm.allocate_free_frame(owner(1)), Ok(1));
        pfm.release(0).unwrap();
        assert_eq!(pfm.allocate_free_frame(owner(2)), Ok(0));
        assert_eq!(pfm.free_count(), 1);
    }

    #[test]
    fn exhausted_pool_reports_no_free_frame() {
        let t = table(1);
        let mut pfm = t.lock();
        pfm.allocate_free_frame(owner(0)).unwrap();
        assert_eq!(pfm.allocate_free_frame(owner(1)), Err(FrameError::NoFreeFrame));
    }

    #[test]
    fn release_of_free_frame_fails() {
        let t = table(2);
        let mut pfm = t.lock();
        assert_eq!(pfm.release(1), Err(FrameError::NotMapped));
        assert_eq!(pfm.release(9), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn pin_and_unpin_report_transitions() {
        let t = table(1);
        let mut pfm = t.lock();
        let id = pfm.allocate_free_frame(owner(0)).unwrap();
        pfm.finish_install(id, None, false, false).unwrap();
        assert_eq!(pfm.pin(id), Ok(true));
        assert_eq!(pfm.pin(id), Ok(false));
        assert_eq!(pfm.unpin(id), Ok(true));
        assert_eq!(pfm.unpin(id), Ok(false));
    }

    #[test]
    fn zero_filled_install_is_clean_until_written() {
        let t = table(1);
        let mut pfm = t.lock();
        let id = pfm.allocate_free_frame(owner(0)).unwrap();
        pfm.finish_install(id, None, false, false).unwrap();
        assert!(!pfm.frame(id).unwrap().is_dirty());
        pfm.release(id).unwrap();
        let id2 = pfm.allocate_free_frame(owner(1)).unwrap();
        pfm.finish_install(id2, None, true, false).unwrap();
        assert!(pfm.frame(id2).unwrap().is_dirty());
    }

    #[test]
    fn install_from_slot_is_clean_until_written() {
        let t = table(1);
        let mut pfm = t.lock();
        let id = pfm.allocate_free_frame(owner(0)).unwrap();
        pfm.finish_install(id, Some(SwapSlot(4)), false, false).unwrap();
        let f = *pfm.frame(id).unwrap();
        assert!(!f.is_dirty());
        assert!(!f.is_busy());
        assert_eq!(f.slot(), Some(SwapSlot(4)));
        pfm.touch(id, true).unwrap();
        assert!(pfm.frame(id).unwrap().is_dirty());
    }

    #[test]
    fn victim_selection_skips_pinned_and_busy() {
        let t = table(3);
        let mut pfm = t.lock();
        for i in 0..3 {
            let id = pfm.allocate_free_frame(owner(i)).unwrap();
            pfm.finish_install(id, None, false, i == 0).unwrap();
        }
        pfm.mark_busy(1).unwrap();
        let mut lru = LruPolicy::new();
        assert_eq!(pfm.select_victim(&mut lru, 0), Ok(2));
        // A vítima agora está BUSY: não sobra ninguém
        assert_eq!(
            pfm.select_victim(&mut lru, 0),
            Err(FrameError::NoEvictableFrame)
        );
    }

    #[test]
    fn cached_slot_theft_prefers_dirty_pages() {
        let t = table(2);
        let mut pfm = t.lock();
        for (i, slot) in [(0, 10u32), (1, 11u32)] {
            let id = pfm.allocate_free_frame(owner(i)).unwrap();
            pfm.finish_install(id, Some(SwapSlot(slot)), false, false).unwrap();
        }
        pfm.touch(1, true).unwrap();
        assert_eq!(pfm.take_cached_slot(), Some(SwapSlot(11)));
        assert_eq!(pfm.take_cached_slot(), Some(SwapSlot(10)));
        assert!(pfm.frame(0).unwrap().is_dirty());
        assert_eq!(pfm.take_cached_slot(), None);
    }

    #[test]
    fn stats_count_states() {
        let t = table(4);
        let mut pfm = t.lock();
        let a = pfm.allocate_free_frame(owner(0)).unwrap();
        pfm.finish_install(a, None, false, true).unwrap();
        let _b = pfm.allocate_free_frame(owner(1)).unwrap();
        let s = pfm.stats();
        assert_eq!(s.total_frames, 4);
        assert_eq!(s.free_frames, 2);
        assert_eq!(s.mapped_frames, 2);
        assert_eq!(s.pinned_frames, 1);
        assert_eq!(s.busy_frames, 1);
        assert!(pfm.has_busy());
        assert_eq!(pfm.phys_to_index(PhysAddr::new(0x10_1000)), Some(1));
        assert_eq!(pfm.phys_to_index(PhysAddr::new(0x0F_F000)), None);
    }

    #[test]
    fn frame_content_is_private_per_frame() {
        let t = table(2);
        t.with_data_mut(0, |d| d.fill(0xAB));
        assert!(t.with_data(0, |d| d.iter().all(|&b| b == 0xAB)));
        assert!(t.with_data(1, |d| d.iter().all(|&b| b == 0)));
    }
}

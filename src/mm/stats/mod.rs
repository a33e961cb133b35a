//! # Estatísticas de Paginação
//!
//! Contadores globais (atômicos) e por contexto (tabela sob mutex folha),
//! mais os três histogramas de timing.

pub mod histogram;

use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::hal::ContextId;
use crate::mm::config::HistogramConfig;

pub use histogram::{Histogram, HistogramKind, HistogramRecord};

/// Contagem de faults por estado do contexto
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaultStats {
    pub count: u64,
    pub irq_locked: u64,
    pub irq_unlocked: u64,
    pub in_isr: u64,
}

/// Evictions por tipo de write-back
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvictionStats {
    /// Sem escrita no backing store
    pub clean: u64,
    /// Com escrita no backing store
    pub dirty: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PagingStats {
    pub faults: FaultStats,
    pub eviction: EvictionStats,
}

impl PagingStats {
    pub fn total_evictions(&self) -> u64 {
        self.eviction.clean.saturating_add(self.eviction.dirty)
    }

    fn add_fault(&mut self, irq_locked: bool, in_isr: bool) {
        self.faults.count = self.faults.count.saturating_add(1);
        if irq_locked {
            self.faults.irq_locked = self.faults.irq_locked.saturating_add(1);
        } else {
            self.faults.irq_unlocked = self.faults.irq_unlocked.saturating_add(1);
        }
        if in_isr {
            self.faults.in_isr = self.faults.in_isr.saturating_add(1);
        }
    }

    fn add_eviction(&mut self, dirty: bool) {
        if dirty {
            self.eviction.dirty = self.eviction.dirty.saturating_add(1);
        } else {
            self.eviction.clean = self.eviction.clean.saturating_add(1);
        }
    }
}

// =============================================================================
// CONTADORES GLOBAIS
// =============================================================================

struct GlobalCounters {
    faults: AtomicU64,
    irq_locked: AtomicU64,
    irq_unlocked: AtomicU64,
    in_isr: AtomicU64,
    evict_clean: AtomicU64,
    evict_dirty: AtomicU64,
}

impl GlobalCounters {
    const fn new() -> Self {
        Self {
            faults: AtomicU64::new(0),
            irq_locked: AtomicU64::new(0),
            irq_unlocked: AtomicU64::new(0),
            in_isr: AtomicU64::new(0),
            evict_clean: AtomicU64::new(0),
            evict_dirty: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> PagingStats {
        PagingStats {
            faults: FaultStats {
                count: self.faults.load(Ordering::Relaxed),
                irq_locked: self.irq_locked.load(Ordering::Relaxed),
                irq_unlocked: self.irq_unlocked.load(Ordering::Relaxed),
                in_isr: self.in_isr.load(Ordering::Relaxed),
            },
            eviction: EvictionStats {
                clean: self.evict_clean.load(Ordering::Relaxed),
                dirty: self.evict_dirty.load(Ordering::Relaxed),
            },
        }
    }
}

#[inline]
fn bump(counter: &AtomicU64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| c.checked_add(1));
}

// =============================================================================
// COLETOR
// =============================================================================

pub struct StatsCollector {
    global: GlobalCounters,
    contexts: Mutex<BTreeMap<ContextId, PagingStats>>,
    eviction: Histogram,
    page_in: Histogram,
    page_out: Histogram,
}

impl StatsCollector {
    pub fn new(config: &HistogramConfig) -> Self {
        Self {
            global: GlobalCounters::new(),
            contexts: Mutex::new(BTreeMap::new()),
            eviction: Histogram::new(config),
            page_in: Histogram::new(config),
            page_out: Histogram::new(config),
        }
    }

    pub fn record_fault(&self, context: ContextId, irq_locked: bool, in_isr: bool) {
        bump(&self.global.faults);
        bump(if irq_locked {
            &self.global.irq_locked
        } else {
            &self.global.irq_unlocked
        });
        if in_isr {
            bump(&self.global.in_isr);
        }
        self.contexts
            .lock()
            .entry(context)
            .or_default()
            .add_fault(irq_locked, in_isr);
    }

    pub fn record_eviction(&self, context: ContextId, dirty: bool) {
        bump(if dirty {
            &self.global.evict_dirty
        } else {
            &self.global.evict_clean
        });
        self.contexts
            .lock()
            .entry(context)
            .or_default()
            .add_eviction(dirty);
    }

    pub fn record_timing(&self, kind: HistogramKind, elapsed: u64) {
        self.histogram_for(kind).record(elapsed);
    }

    fn histogram_for(&self, kind: HistogramKind) -> &Histogram {
        match kind {
            HistogramKind::Eviction => &self.eviction,
            HistogramKind::PageIn => &self.page_in,
            HistogramKind::PageOut => &self.page_out,
        }
    }

    /// Totais do motor
    pub fn global(&self) -> PagingStats {
        self.global.snapshot()
    }

    /// Totais de um contexto (zeros se nunca registrado)
    pub fn context(&self, context: ContextId) -> PagingStats {
        self.contexts
            .lock()
            .get(&context)
            .copied()
            .unwrap_or_default()
    }

    /// Descarta os contadores de um contexto que terminou
    pub fn forget_context(&self, context: ContextId) {
        self.contexts.lock().remove(&context);
    }

    pub fn histogram(&self, kind: HistogramKind) -> HistogramRecord {
        self.histogram_for(kind).snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_are_split_by_irq_state() {
        let s = StatsCollector::new(&HistogramConfig::default());
        s.record_fault(1, false, false);
        s.record_fault(1, true, false);
        s.record_fault(2, true, true);
        let g = s.global();
        assert_eq!(g.faults.count, 3);
        assert_eq!(g.faults.irq_locked, 2);
        assert_eq!(g.faults.irq_unlocked, 1);
        assert_eq!(g.faults.in_isr, 1);
        assert_eq!(s.context(1).faults.count, 2);
        assert_eq!(s.context(2).faults.in_isr, 1);
    }

    #[test]
    fn evictions_are_split_by_write_back() {
        let s = StatsCollector::new(&HistogramConfig::default());
        s.record_eviction(3, true);
        s.record_eviction(3, false);
        s.record_eviction(4, false);
        assert_eq!(s.global().eviction, EvictionStats { clean: 2, dirty: 1 });
        assert_eq!(s.context(3).total_evictions(), 2);
    }

    #[test]
    fn unknown_context_reads_as_zero() {
        let s = StatsCollector::new(&HistogramConfig::default());
        assert_eq!(s.context(99), PagingStats::default());
        s.record_fault(99, false, false);
        s.forget_context(99);
        assert_eq!(s.context(99), PagingStats::default());
        // O global não esquece
        assert_eq!(s.global().faults.count, 1);
    }

    #[test]
    fn timings_go_to_their_histogram() {
        let s = StatsCollector::new(&HistogramConfig::default());
        s.record_timing(HistogramKind::PageIn, 3);
        s.record_timing(HistogramKind::PageIn, 7);
        s.record_timing(HistogramKind::PageOut, 7);
        assert_eq!(s.histogram(HistogramKind::PageIn).total(), 2);
        assert_eq!(s.histogram(HistogramKind::PageOut).total(), 1);
        assert_eq!(s.histogram(HistogramKind::Eviction).total(), 0);
    }
}

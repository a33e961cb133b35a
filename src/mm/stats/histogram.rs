//! # Histogramas de Timing
//!
//! Bins com limite superior inclusivo. Um valor cai no primeiro bin cujo
//! limite é >= valor; acima de todos os limites, no último bin.
//! Contadores saturam em `u64::MAX`.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::mm::config::{HistogramConfig, HISTOGRAM_BINS};

/// Qual fase do ciclo de paginação foi medida
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramKind {
    /// Seleção da vítima
    Eviction,
    /// Leitura do backing store
    PageIn,
    /// Escrita no backing store
    PageOut,
}

/// Fotografia de um histograma
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramRecord {
    pub bounds: [u64; HISTOGRAM_BINS],
    pub counts: [u64; HISTOGRAM_BINS],
}

impl HistogramRecord {
    /// Amostras registradas (saturado)
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, &c| acc.saturating_add(c))
    }
}

pub struct Histogram {
    bounds: [u64; HISTOGRAM_BINS],
    counts: [AtomicU64; HISTOGRAM_BINS],
}

impl Histogram {
    pub fn new(config: &HistogramConfig) -> Self {
        Self {
            bounds: config.bounds,
            counts: core::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Índice do bin de `value`
    pub fn bin_of(&self, value: u64) -> usize {
        self.bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(HISTOGRAM_BINS - 1)
    }

    pub fn record(&self, value: u64) {
        let bin = self.bin_of(value);
        // Err = já saturado
        let _ = self.counts[bin].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
            c.checked_add(1)
        });
    }

    pub fn snapshot(&self) -> HistogramRecord {
        HistogramRecord {
            bounds: self.bounds,
            counts: core::array::from_fn(|i| self.counts[i].load(Ordering::Relaxed)),
        }
    }

    #[cfg(test)]
    fn force_count(&self, bin: usize, value: u64) {
        self.counts[bin].store(value, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_bounds() -> HistogramConfig {
        HistogramConfig::new([1, 2, 4, 8, 16, 32, 64, 128, 256, 512])
    }

    #[test]
    fn values_land_in_first_bin_that_fits() {
        let h = Histogram::new(&small_bounds());
        assert_eq!(h.bin_of(0), 0);
        assert_eq!(h.bin_of(1), 0);
        assert_eq!(h.bin_of(2), 1);
        assert_eq!(h.bin_of(3), 2);
        assert_eq!(h.bin_of(512), 9);
    }

    #[test]
    fn overflow_goes_to_last_bin() {
        let h = Histogram::new(&small_bounds());
        h.record(1_000_000);
        let r = h.snapshot();
        assert_eq!(r.counts[HISTOGRAM_BINS - 1], 1);
        assert_eq!(r.total(), 1);
    }

    #[test]
    fn counters_saturate() {
        let h = Histogram::new(&small_bounds());
        h.force_count(0, u64::MAX);
        h.record(0);
        assert_eq!(h.snapshot().counts[0], u64::MAX);
        h.record(0);
        h.record(2);
        assert_eq!(h.snapshot().total(), u64::MAX);
    }

    #[test]
    fn snapshot_carries_bounds() {
        let cfg = small_bounds();
        let h = Histogram::new(&cfg);
        assert_eq!(h.snapshot().bounds, cfg.bounds);
    }
}

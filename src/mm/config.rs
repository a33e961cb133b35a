//! # Configuração do Pager
//!
//! Constantes de tamanho, layout padrão da janela virtual e a estrutura
//! [`PagerConfig`] passada na construção do motor.

use super::error::{PagerError, PagerResult};

// =============================================================================
// CONSTANTES DE TAMANHO
// =============================================================================

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Máscara para alinhar endereços a página
pub const PAGE_MASK: usize = !(PAGE_SIZE - 1);

/// Bits de offset dentro de uma página
pub const PAGE_OFFSET_BITS: usize = 12;

// =============================================================================
// LAYOUT PADRÃO
// =============================================================================

/// Base física do pool de frames paginável
pub const DEFAULT_PHYS_BASE: u64 = 0x0010_0000;

/// Base da janela virtual onde as arenas são reservadas
pub const DEFAULT_VIRT_BASE: u64 = 0x4000_0000;

/// Tamanho da janela virtual (64 MiB)
pub const DEFAULT_VIRT_SIZE: usize = 64 * 1024 * 1024;

/// Frames no pool padrão
pub const DEFAULT_FRAMES: usize = 64;

/// Período de varredura do NRU (em unidades do relógio do ambiente)
pub const DEFAULT_NRU_PERIOD: u64 = 100;

// =============================================================================
// HISTOGRAMAS
// =============================================================================

/// Número de bins de cada histograma de timing
pub const HISTOGRAM_BINS: usize = 10;

/// Limites superiores padrão (inclusivos). O último bin absorve o resto.
pub const DEFAULT_HISTOGRAM_BOUNDS: [u64; HISTOGRAM_BINS] =
    [1, 5, 10, 50, 100, 500, 1_000, 5_000, 10_000, u64::MAX];

/// Limites dos bins de timing (eviction, page-in, page-out)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramConfig {
    pub bounds: [u64; HISTOGRAM_BINS],
}

impl HistogramConfig {
    pub const fn new(bounds: [u64; HISTOGRAM_BINS]) -> Self {
        Self { bounds }
    }

    /// Limites precisam ser estritamente crescentes
    pub fn is_valid(&self) -> bool {
        self.bounds.windows(2).all(|w| w[0] < w[1])
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BOUNDS)
    }
}

// =============================================================================
// CONFIGURAÇÃO DO MOTOR
// =============================================================================

/// Parâmetros de construção do pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerConfig {
    /// Frames físicos no pool
    pub frames: usize,
    /// Endereço físico do primeiro frame
    pub phys_base: u64,
    /// Início da janela virtual
    pub virt_base: u64,
    /// Tamanho da janela virtual em bytes
    pub virt_size: usize,
    /// Reservar uma página de guarda antes e depois de cada arena
    pub guard_pages: bool,
    pub histogram: HistogramConfig,
}

impl PagerConfig {
    pub const fn new() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            phys_base: DEFAULT_PHYS_BASE,
            virt_base: DEFAULT_VIRT_BASE,
            virt_size: DEFAULT_VIRT_SIZE,
            guard_pages: true,
            histogram: HistogramConfig::new(DEFAULT_HISTOGRAM_BOUNDS),
        }
    }

    pub const fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub const fn with_phys_base(mut self, base: u64) -> Self {
        self.phys_base = base;
        self
    }

    pub const fn with_virt_window(mut self, base: u64, size: usize) -> Self {
        self.virt_base = base;
        self.virt_size = size;
        self
    }

    pub const fn with_guard_pages(mut self, enabled: bool) -> Self {
        self.guard_pages = enabled;
        self
    }

    pub const fn with_histogram(mut self, histogram: HistogramConfig) -> Self {
        self.histogram = histogram;
        self
    }

    /// Páginas de guarda por lado de cada arena
    pub const fn guard_size(&self) -> usize {
        if self.guard_pages {
            1
        } else {
            0
        }
    }

    /// Valida a configuração antes de montar o motor
    pub fn validate(&self) -> PagerResult<()> {
        if self.frames == 0 || self.virt_size == 0 {
            return Err(PagerError::InvalidConfig);
        }
        if !is_aligned(self.virt_base as usize, PAGE_SIZE)
            || !is_aligned(self.virt_size, PAGE_SIZE)
            || !is_aligned(self.phys_base as usize, PAGE_SIZE)
        {
            return Err(PagerError::NotAligned);
        }
        if self.virt_base.checked_add(self.virt_size as u64).is_none() {
            return Err(PagerError::InvalidConfig);
        }
        let pool_bytes = (self.frames as u64).checked_mul(PAGE_SIZE as u64);
        if pool_bytes.and_then(|b| self.phys_base.checked_add(b)).is_none() {
            return Err(PagerError::InvalidConfig);
        }
        if !self.histogram.is_valid() {
            return Err(PagerError::InvalidConfig);
        }
        Ok(())
    }
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// FUNÇÕES UTILITÁRIAS
// =============================================================================

/// Alinha valor para cima ao múltiplo de align
#[inline(always)]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Alinha valor para baixo ao múltiplo de align
#[inline(always)]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Verifica se valor está alinhado
#[inline(always)]
pub const fn is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}

/// Páginas necessárias para cobrir `bytes`
#[inline(always)]
pub const fn pages_for(bytes: usize) -> usize {
    bytes.div_ceil(PAGE_SIZE)
}

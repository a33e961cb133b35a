//! # Swap Subsystem
//!
//! Backing store para páginas evicted. O pager fala com o armazenamento
//! apenas pelo trait [`BackingStore`], em unidades de um slot por página.
//!
//! Implementações:
//! - [`RamStore`]: slots em memória (testes, zram-like)
//! - [`BlockStore`]: slots sobre um [`BlockDevice`] setorizado
//!
//! Nenhum lock do pager é segurado durante as chamadas deste trait.

pub mod block;
pub mod ram;

pub use block::{BlockDevice, BlockStore, RamDisk};
pub use ram::RamStore;

/// Slot de swap (índice no backing store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwapSlot(pub u32);

impl SwapSlot {
    /// Slot do índice `index` do bitmap. Índices acima de `u32::MAX` não
    /// cabem num slot.
    pub fn from_index(index: usize) -> StoreResult<Self> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| StoreError::InvalidSlot)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Erros do backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Todos os slots ocupados
    OutOfSlots,
    /// Índice fora da capacidade
    InvalidSlot,
    /// Leitura de slot que não foi alocado
    SlotNotAllocated,
    /// Buffer diferente de uma página
    BadBufferSize,
    /// Falha do dispositivo
    Io,
}

impl StoreError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfSlots => "Sem slots livres",
            Self::InvalidSlot => "Slot fora da capacidade",
            Self::SlotNotAllocated => "Slot não alocado",
            Self::BadBufferSize => "Buffer não tem tamanho de página",
            Self::Io => "Erro de I/O no dispositivo",
        }
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Armazenamento de páginas evicted
///
/// `write_slot`/`read_slot` podem bloquear. Buffers têm sempre `PAGE_SIZE`
/// bytes.
pub trait BackingStore: Send + Sync {
    /// Grava uma página no slot
    fn write_slot(&self, slot: SwapSlot, frame: &[u8]) -> StoreResult<()>;

    /// Lê o slot para dentro do frame
    fn read_slot(&self, slot: SwapSlot, frame: &mut [u8]) -> StoreResult<()>;

    /// Número total de slots
    fn slot_capacity(&self) -> usize;

    /// Reserva um slot livre
    fn allocate_slot(&self) -> StoreResult<SwapSlot>;

    /// Devolve o slot. Liberar slot livre é ignorado.
    fn free_slot(&self, slot: SwapSlot);

    /// Slots reservados no momento
    fn slots_in_use(&self) -> usize;

    fn slots_free(&self) -> usize {
        self.slot_capacity().saturating_sub(self.slots_in_use())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_index_must_fit_in_u32() {
        assert_eq!(SwapSlot::from_index(7), Ok(SwapSlot(7)));
        assert_eq!(
            SwapSlot::from_index(u32::MAX as usize),
            Ok(SwapSlot(u32::MAX))
        );
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            SwapSlot::from_index(u32::MAX as usize + 1),
            Err(StoreError::InvalidSlot)
        );
    }
}

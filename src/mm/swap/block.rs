//! Backing store sobre dispositivo de blocos
//!
//! Cada slot ocupa `PAGE_SIZE / sector_size` setores consecutivos a partir
//! de `start_sector`. A página é transferida setor a setor.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use super::{BackingStore, StoreError, StoreResult, SwapSlot};
use crate::klib::Bitmap;
use crate::mm::config::PAGE_SIZE;

/// Dispositivo de blocos setorizado
pub trait BlockDevice: Send + Sync {
    fn sector_size(&self) -> usize;
    fn sector_count(&self) -> u64;
    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> StoreResult<()>;
    fn write_sector(&self, sector: u64, buf: &[u8]) -> StoreResult<()>;
}

// =============================================================================
// BLOCK STORE
// =============================================================================

pub struct BlockStore<D: BlockDevice> {
    dev: D,
    start_sector: u64,
    sectors_per_slot: u64,
    slots: Mutex<Bitmap>,
}

impl<D: BlockDevice> BlockStore<D> {
    /// Usa o dispositivo a partir de `start_sector` até o fim
    pub fn new(dev: D, start_sector: u64) -> StoreResult<Self> {
        let sector_size = dev.sector_size();
        if sector_size == 0 || PAGE_SIZE % sector_size != 0 {
            return Err(StoreError::BadBufferSize);
        }
        let sectors_per_slot = (PAGE_SIZE / sector_size) as u64;
        let available = dev
            .sector_count()
            .checked_sub(start_sector)
            .ok_or(StoreError::InvalidSlot)?;
        let capacity = (available / sectors_per_slot) as usize;
        crate::kinfo!("(SWAP) BlockStore slots=", capacity, " setor0=", start_sector);
        Ok(Self {
            dev,
            start_sector,
            sectors_per_slot,
            slots: Mutex::new(Bitmap::new(capacity)),
        })
    }

    pub fn device(&self) -> &D {
        &self.dev
    }

    fn first_sector(&self, slot: SwapSlot, len: usize) -> StoreResult<u64> {
        if len != PAGE_SIZE {
            return Err(StoreError::BadBufferSize);
        }
        let slots = self.slots.lock();
        if slot.index() >= slots.len() {
            return Err(StoreError::InvalidSlot);
        }
        if !slots.test(slot.index()) {
            return Err(StoreError::SlotNotAllocated);
        }
        Ok(self.start_sector + slot.0 as u64 * self.sectors_per_slot)
    }
}

impl<D: BlockDevice> BackingStore for BlockStore<D> {
    fn write_slot(&self, slot: SwapSlot, frame: &[u8]) -> StoreResult<()> {
        let first = self.first_sector(slot, frame.len())?;
        let sector_size = self.dev.sector_size();
        for (i, chunk) in frame.chunks(sector_size).enumerate() {
            self.dev.write_sector(first + i as u64, chunk)?;
        }
        Ok(())
    }

    fn read_slot(&self, slot: SwapSlot, frame: &mut [u8]) -> StoreResult<()> {
        let first = self.first_sector(slot, frame.len())?;
        let sector_size = self.dev.sector_size();
        for (i, chunk) in frame.chunks_mut(sector_size).enumerate() {
            self.dev.read_sector(first + i as u64, chunk)?;
        }
        Ok(())
    }

    fn slot_capacity(&self) -> usize {
        self.slots.lock().len()
    }

    fn allocate_slot(&self) -> StoreResult<SwapSlot> {
        let mut slots = self.slots.lock();
        let index = slots.alloc().ok_or(StoreError::OutOfSlots)?;
        match SwapSlot::from_index(index) {
            Ok(slot) => Ok(slot),
            Err(e) => {
                slots.clear(index);
                Err(e)
            }
        }
    }

    fn free_slot(&self, slot: SwapSlot) {
        let mut slots = self.slots.lock();
        if slot.index() >= slots.len() || !slots.clear(slot.index()) {
            crate::kwarn!("(SWAP) free de slot não alocado: ", slot.0);
        }
    }

    fn slots_in_use(&self) -> usize {
        self.slots.lock().used()
    }
}

// =============================================================================
// RAM DISK
// =============================================================================

/// Disco em memória, com injeção de falhas para testes de I/O
pub struct RamDisk {
    sector_size: usize,
    sectors: Mutex<Vec<u8>>,
    failing: AtomicBool,
}

impl RamDisk {
    pub fn new(sector_size: usize, sector_count: u64) -> Self {
        Self {
            sector_size,
            sectors: Mutex::new(vec![0u8; sector_size * sector_count as usize]),
            failing: AtomicBool::new(false),
        }
    }

    /// Enquanto ligado, todo I/O retorna `StoreError::Io`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn range(&self, sector: u64, len: usize) -> StoreResult<core::ops::Range<usize>> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Io);
        }
        if len != self.sector_size || sector >= self.sector_count() {
            return Err(StoreError::Io);
        }
        let start = sector as usize * self.sector_size;
        Ok(start..start + self.sector_size)
    }
}

impl BlockDevice for RamDisk {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        if self.sector_size == 0 {
            return 0;
        }
        (self.sectors.lock().len() / self.sector_size) as u64
    }

    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> StoreResult<()> {
        let range = self.range(sector, buf.len())?;
        buf.copy_from_slice(&self.sectors.lock()[range]);
        Ok(())
    }

    fn write_sector(&self, sector: u64, buf: &[u8]) -> StoreResult<()> {
        let range = self.range(sector, buf.len())?;
        self.sectors.lock()[range].copy_from_slice(buf);
        Ok(())
    }
}

/// Permite compartilhar o disco com o teste que injeta falhas
impl<D: BlockDevice> BlockDevice for alloc::sync::Arc<D> {
    fn sector_size(&self) -> usize {
        (**self).sector_size()
    }

    fn sector_count(&self) -> u64 {
        (**self).sector_count()
    }

    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> StoreResult<()> {
        (**self).read_sector(sector, buf)
    }

    fn write_sector(&self, sector: u64, buf: &[u8]) -> StoreResult<()> {
        (**self).write_sector(sector, buf)
    }
}

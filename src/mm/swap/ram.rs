//! Backing store em RAM

use alloc::boxed::Box;
use alloc::vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use super::{BackingStore, StoreError, StoreResult, SwapSlot};
use crate::klib::Bitmap;
use crate::mm::config::PAGE_SIZE;

/// Slots mantidos em buffers na memória
pub struct RamStore {
    slots: Mutex<Bitmap>,
    area: Box<[Mutex<Box<[u8]>>]>,
    pages_written: AtomicU64,
    pages_read: AtomicU64,
}

impl RamStore {
    pub fn new(capacity: usize) -> Self {
        let area = (0..capacity)
            .map(|_| Mutex::new(vec![0u8; PAGE_SIZE].into_boxed_slice()))
            .collect();
        crate::kinfo!("(SWAP) RamStore slots=", capacity);
        Self {
            slots: Mutex::new(Bitmap::new(capacity)),
            area,
            pages_written: AtomicU64::new(0),
            pages_read: AtomicU64::new(0),
        }
    }

    /// (páginas gravadas, páginas lidas)
    pub fn io_counts(&self) -> (u64, u64) {
        (
            self.pages_written.load(Ordering::Relaxed),
            self.pages_read.load(Ordering::Relaxed),
        )
    }

    fn check(&self, slot: SwapSlot, len: usize) -> StoreResult<()> {
        if slot.index() >= self.area.len() {
            return Err(StoreError::InvalidSlot);
        }
        if len != PAGE_SIZE {
            return Err(StoreError::BadBufferSize);
        }
        if !self.slots.lock().test(slot.index()) {
            return Err(StoreError::SlotNotAllocated);
        }
        Ok(())
    }
}

impl BackingStore for RamStore {
    fn write_slot(&self, slot: SwapSlot, frame: &[u8]) -> StoreResult<()> {
        self.check(slot, frame.len())?;
        self.area[slot.index()].lock().copy_from_slice(frame);
        self.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read_slot(&self, slot: SwapSlot, frame: &mut [u8]) -> StoreResult<()> {
        self.check(slot, frame.len())?;
        frame.copy_from_slice(&self.area[slot.index()].lock());
        self.pages_read.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn slot_capacity(&self) -> usize {
        self.area.len()
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
        if slot.index() >= self.area.len() || !self.slots.lock().clear(slot.index()) {
            crate::kwarn!("(SWAP) free de slot não alocado: ", slot.0);
        }
    }

    fn slots_in_use(&self) -> usize {
        self.slots.lock().used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_returns_same_page() {
        let store = RamStore::new(2);
        let slot = store.allocate_slot().unwrap();
        let page = [0x5Au8; PAGE_SIZE];
        store.write_slot(slot, &page).unwrap();
        let mut out = [0u8; PAGE_SIZE];
        store.read_slot(slot, &mut out).unwrap();
        assert_eq!(out, page);
        assert_eq!(store.io_counts(), (1, 1));
    }

    #[test]
    fn capacity_is_enforced() {
        let store = RamStore::new(2);
        store.allocate_slot().unwrap();
        store.allocate_slot().unwrap();
        assert_eq!(store.allocate_slot(), Err(StoreError::OutOfSlots));
        assert_eq!(store.slots_in_use(), 2);
        assert_eq!(store.slots_free(), 0);
        store.free_slot(SwapSlot(0));
        assert_eq!(store.allocate_slot(), Ok(SwapSlot(0)));
    }

    #[test]
    fn unallocated_or_bad_slots_are_rejected() {
        let store = RamStore::new(1);
        let mut buf = [0u8; PAGE_SIZE];
        assert_eq!(
            store.read_slot(SwapSlot(0), &mut buf),
            Err(StoreError::SlotNotAllocated)
        );
        assert_eq!(
            store.read_slot(SwapSlot(5), &mut buf),
            Err(StoreError::InvalidSlot)
        );
        let slot = store.allocate_slot().unwrap();
        assert_eq!(
            store.write_slot(slot, &buf[..10]),
            Err(StoreError::BadBufferSize)
        );
    }

    #[test]
    fn double_free_is_ignored() {
        let store = RamStore::new(1);
        let slot = store.allocate_slot().unwrap();
        store.free_slot(slot);
        store.free_slot(slot);
        assert_eq!(store.slots_in_use(), 0);
    }
}

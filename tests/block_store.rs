//! Motor sobre um dispositivo de blocos, incluindo falhas de I/O.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use forge_pager::{
    BackingStore, BlockStore, ExecEnv, FatalReason, HostEnv, MapFlags, PageInfo, Pager,
    PagerConfig, PagerError, RamDisk, RamStore, StoreError, StoreResult, SwapSlot, VirtAddr,
    PAGE_SIZE,
};

const SECTOR: usize = 512;
const SECTORS_PER_SLOT: u64 = (PAGE_SIZE / SECTOR) as u64;

fn setup(frames: usize, slots: u64) -> (Pager, Arc<RamDisk>, Arc<HostEnv>) {
    let disk = Arc::new(RamDisk::new(SECTOR, slots * SECTORS_PER_SLOT));
    let store = BlockStore::new(disk.clone(), 0).unwrap();
    let env = Arc::new(HostEnv::new());
    let shared: Arc<dyn ExecEnv> = env.clone();
    let pager = Pager::new(PagerConfig::new().with_frames(frames), Box::new(store), shared).unwrap();
    (pager, disk, env)
}

fn page_addr(base: VirtAddr, page: usize) -> VirtAddr {
    base.add((page * PAGE_SIZE) as u64)
}

fn is_resident(pager: &Pager, addr: VirtAddr) -> bool {
    matches!(pager.page_info(addr), Ok(PageInfo::Resident { .. }))
}

#[test]
fn slots_are_carved_from_sectors() {
    let disk = RamDisk::new(SECTOR, 4 * SECTORS_PER_SLOT + 3);
    let store = BlockStore::new(disk, 3).unwrap();
    assert_eq!(store.slot_capacity(), 4);

    let short = RamDisk::new(SECTOR, 2);
    assert!(matches!(
        BlockStore::new(short, 5),
        Err(StoreError::InvalidSlot)
    ));
    assert!(matches!(
        BlockStore::new(RamDisk::new(1000, 64), 0),
        Err(StoreError::BadBufferSize)
    ));
}

#[test]
fn pages_round_trip_through_the_disk() {
    let (pager, _disk, _env) = setup(4, 16);
    let arena = pager.map(10 * PAGE_SIZE, MapFlags::WRITE).unwrap();

    for page in 0..10 {
        pager
            .fill(page_addr(arena.base(), page), PAGE_SIZE, 0x10 + page as u8)
            .unwrap();
    }
    let mut buf = vec![0u8; PAGE_SIZE];
    for page in 0..10 {
        pager.read(page_addr(arena.base(), page), &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0x10 + page as u8));
    }
    assert!(pager.paging_stats().eviction.dirty >= 6);
    assert!(pager.audit());
}

#[test]
fn failed_page_out_restores_every_page() {
    let (pager, disk, _env) = setup(6, 16);
    let arena = pager.map(4 * PAGE_SIZE, MapFlags::WRITE).unwrap();
    for page in 0..4 {
        pager
            .fill(page_addr(arena.base(), page), PAGE_SIZE, 0xA0 + page as u8)
            .unwrap();
    }

    disk.set_failing(true);
    assert_eq!(
        pager.page_out(arena.base(), arena.size()),
        Err(PagerError::Store(StoreError::Io))
    );
    disk.set_failing(false);

    for page in 0..4 {
        assert!(is_resident(&pager, page_addr(arena.base(), page)));
    }
    assert_eq!(pager.store().slots_in_use(), 0);
    assert_eq!(pager.paging_stats().total_evictions(), 0);
    assert!(pager.audit());

    pager.page_out(arena.base(), arena.size()).unwrap();
    for page in 0..4 {
        assert_eq!(
            pager.read_u8(page_addr(arena.base(), page).add(7)),
            Ok(0xA0 + page as u8)
        );
    }
}

#[test]
fn failed_page_in_is_fatal_and_keeps_the_slot() {
    let (pager, disk, env) = setup(2, 8);
    let arena = pager.map(2 * PAGE_SIZE, MapFlags::WRITE).unwrap();
    pager.write_u8(arena.base(), 0x77).unwrap();
    pager.page_out(arena.base(), PAGE_SIZE).unwrap();

    let before = pager.page_info(arena.base()).unwrap();
    assert!(matches!(before, PageInfo::Evicted { .. }));

    disk.set_failing(true);
    assert_eq!(
        pager.read_u8(arena.base()),
        Err(PagerError::Fatal(FatalReason::BackingStore(StoreError::Io)))
    );
    disk.set_failing(false);

    assert_eq!(pager.page_info(arena.base()), Ok(before));
    assert_eq!(
        env.fatal_errors(),
        vec![(0, FatalReason::BackingStore(StoreError::Io))]
    );
    assert_eq!(pager.frame_stats().free_frames, 2);
    assert_eq!(pager.read_u8(arena.base()), Ok(0x77));
    assert!(pager.audit());
}

#[test]
fn failed_eviction_leaves_the_victim_resident() {
    let (pager, disk, _env) = setup(2, 8);
    let arena = pager.map(3 * PAGE_SIZE, MapFlags::WRITE).unwrap();
    pager.write_u8(page_addr(arena.base(), 0), 1).unwrap();
    pager.write_u8(page_addr(arena.base(), 1), 2).unwrap();

    disk.set_failing(true);
    assert_eq!(
        pager.write_u8(page_addr(arena.base(), 2), 3),
        Err(PagerError::Fatal(FatalReason::BackingStore(StoreError::Io)))
    );
    disk.set_failing(false);

    assert!(is_resident(&pager, page_addr(arena.base(), 0)));
    assert!(is_resident(&pager, page_addr(arena.base(), 1)));
    assert_eq!(
        pager.page_info(page_addr(arena.base(), 2)),
        Ok(PageInfo::Reserved)
    );
    assert_eq!(pager.store().slots_in_use(), 0);
    assert!(pager.audit());

    pager.write_u8(page_addr(arena.base(), 2), 3).unwrap();
    for page in 0..3 {
        assert_eq!(
            pager.read_u8(page_addr(arena.base(), page)),
            Ok(page as u8 + 1)
        );
    }
}

/// Store em RAM que aceita só `writes_left` gravações antes de falhar
struct CountdownStore {
    inner: RamStore,
    writes_left: Arc<AtomicUsize>,
}

impl BackingStore for CountdownStore {
    fn write_slot(&self, slot: SwapSlot, frame: &[u8]) -> StoreResult<()> {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| StoreError::Io)?;
        self.inner.write_slot(slot, frame)
    }

    fn read_slot(&self, slot: SwapSlot, frame: &mut [u8]) -> StoreResult<()> {
        self.inner.read_slot(slot, frame)
    }

    fn slot_capacity(&self) -> usize {
        self.inner.slot_capacity()
    }

    fn allocate_slot(&self) -> StoreResult<SwapSlot> {
        self.inner.allocate_slot()
    }

    fn free_slot(&self, slot: SwapSlot) {
        self.inner.free_slot(slot)
    }

    fn slots_in_use(&self) -> usize {
        self.inner.slots_in_use()
    }
}

#[test]
fn page_out_failing_midway_evicts_nothing() {
    let writes_left = Arc::new(AtomicUsize::new(usize::MAX));
    let store = CountdownStore {
        inner: RamStore::new(16),
        writes_left: writes_left.clone(),
    };
    let env: Arc<dyn ExecEnv> = Arc::new(HostEnv::new());
    let pager = Pager::new(PagerConfig::new().with_frames(6), Box::new(store), env).unwrap();

    let arena = pager.map(4 * PAGE_SIZE, MapFlags::WRITE).unwrap();
    for page in 0..4 {
        pager
            .fill(page_addr(arena.base(), page), PAGE_SIZE, 0x30 + page as u8)
            .unwrap();
    }
    // Página 3 ganha uma cópia no store e volta limpa
    pager.page_out(page_addr(arena.base(), 3), PAGE_SIZE).unwrap();
    assert_eq!(pager.read_u8(page_addr(arena.base(), 3)), Ok(0x33));
    let evictions = pager.paging_stats().total_evictions();
    assert_eq!(pager.store().slots_in_use(), 1);

    // A segunda gravação falha
    writes_left.store(1, Ordering::SeqCst);
    assert_eq!(
        pager.page_out(arena.base(), arena.size()),
        Err(PagerError::Store(StoreError::Io))
    );

    for page in 0..4 {
        assert!(is_resident(&pager, page_addr(arena.base(), page)));
    }
    assert_eq!(pager.store().slots_in_use(), 1);
    assert_eq!(pager.paging_stats().total_evictions(), evictions);
    assert_eq!(pager.frame_stats().busy_frames, 0);
    assert!(pager.audit());

    writes_left.store(usize::MAX, Ordering::SeqCst);
    pager.page_out(arena.base(), arena.size()).unwrap();
    for page in 0..4 {
        assert_eq!(
            pager.read_u8(page_addr(arena.base(), page).add(9)),
            Ok(0x30 + page as u8)
        );
    }
    assert!(pager.audit());
}

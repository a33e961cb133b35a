//! # Not Recently Used
//!
//! Classifica frames pelos bits de acesso e dirty:
//!
//! | Classe | ACCESSED | DIRTY |
//! |--------|----------|-------|
//! | 0      | não      | não   |
//! | 1      | não      | sim   |
//! | 2      | sim      | não   |
//! | 3      | sim      | sim   |
//!
//! A vítima é o frame da menor classe. A cada `period` unidades de tempo
//! os bits de acesso são zerados.

use super::{min_evictable_by, EvictionPolicy};
use crate::mm::config::DEFAULT_NRU_PERIOD;
use crate::mm::pfm::{FrameId, FrameInfo};

pub struct NruPolicy {
    period: u64,
    last_sweep: u64,
    sweeps: u64,
}

impl NruPolicy {
    pub const fn new(period: u64) -> Self {
        Self {
            period,
            last_sweep: 0,
            sweeps: 0,
        }
    }

    /// Varreduras realizadas
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    fn class(frame: &FrameInfo) -> u8 {
        ((frame.is_accessed() as u8) << 1) | frame.is_dirty() as u8
    }
}

impl Default for NruPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_NRU_PERIOD)
    }
}

impl EvictionPolicy for NruPolicy {
    fn name(&self) -> &'static str {
        "nru"
    }

    fn select(&mut self, frames: &mut [FrameInfo], now: u64) -> Option<FrameId> {
        if now.saturating_sub(self.last_sweep) >= self.period {
            for frame in frames.iter_mut() {
                frame.clear_accessed();
            }
            self.last_sweep = now;
            self.sweeps += 1;
            crate::ktrace!("(NRU) Varredura em t=", now);
        }
        min_evictable_by(frames, Self::class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::addr::{PhysAddr, VirtAddr};
    use crate::mm::pfm::{FrameFlags, PageRef};

    fn frame(index: usize, flags: FrameFlags) -> FrameInfo {
        let mut f = FrameInfo::new(PhysAddr::new(0x10_0000).frame(index));
        f.assign(PageRef::new(VirtAddr::new(0x4000_0000), index), 0);
        f.remove_flags(FrameFlags::BUSY);
        f.insert_flags(flags);
        f
    }

    #[test]
    fn lowest_class_wins() {
        let mut frames = [
            frame(0, FrameFlags::ACCESSED | FrameFlags::DIRTY),
            frame(1, FrameFlags::DIRTY),
            frame(2, FrameFlags::ACCESSED),
        ];
        let mut nru = NruPolicy::new(u64::MAX);
        assert_eq!(nru.select(&mut frames, 1), Some(1));
    }

    #[test]
    fn ties_go_to_lowest_address() {
        let mut frames = [
            frame(0, FrameFlags::ACCESSED),
            frame(1, FrameFlags::empty()),
            frame(2, FrameFlags::empty()),
        ];
        let mut nru = NruPolicy::new(u64::MAX);
        assert_eq!(nru.select(&mut frames, 1), Some(1));
    }

    #[test]
    fn pinned_frames_are_never_chosen() {
        let mut frames = [
            frame(0, FrameFlags::PINNED),
            frame(1, FrameFlags::PINNED),
        ];
        let mut nru = NruPolicy::default();
        assert_eq!(nru.select(&mut frames, 0), None);
    }

    #[test]
    fn sweep_clears_access_bits_after_period() {
        let mut frames = [
            frame(0, FrameFlags::ACCESSED),
            frame(1, FrameFlags::DIRTY),
        ];
        let mut nru = NruPolicy::new(10);
        // Antes do período: frame 1 (classe 1) ganha do frame 0 (classe 2)
        assert_eq!(nru.select(&mut frames, 5), Some(1));
        assert_eq!(nru.sweeps(), 0);
        // Depois: frame 0 cai para classe 0
        assert_eq!(nru.select(&mut frames, 10), Some(0));
        assert_eq!(nru.sweeps(), 1);
        assert!(!frames[0].is_accessed());
    }
}

//! # Least Recently Used
//!
//! Usa a geração do último acesso registrada pela frame table. Não guarda
//! estado próprio.

use super::{min_evictable_by, EvictionPolicy};
use crate::mm::pfm::{FrameId, FrameInfo};

#[derive(Debug, Default)]
pub struct LruPolicy;

impl LruPolicy {
    pub const fn new() -> Self {
        Self
    }
}

impl EvictionPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn select(&mut self, frames: &mut [FrameInfo], _now: u64) -> Option<FrameId> {
        min_evictable_by(frames, FrameInfo::last_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::addr::{PhysAddr, VirtAddr};
    use crate::mm::pfm::{FrameFlags, PageRef};

    fn frame(index: usize, last_access: u64) -> FrameInfo {
        let mut f = FrameInfo::new(PhysAddr::new(0x10_0000).frame(index));
        f.assign(PageRef::new(VirtAddr::new(0x4000_0000), index), last_access);
        f.remove_flags(FrameFlags::BUSY);
        f
    }

    #[test]
    fn oldest_access_is_evicted() {
        let mut frames = [frame(0, 30), frame(1, 10), frame(2, 20)];
        assert_eq!(LruPolicy::new().select(&mut frames, 0), Some(1));
    }

    #[test]
    fn busy_frames_are_skipped() {
        let mut frames = [frame(0, 1), frame(1, 2)];
        frames[0].insert_flags(FrameFlags::BUSY);
        assert_eq!(LruPolicy::new().select(&mut frames, 0), Some(1));
    }

    #[test]
    fn empty_table_has_no_victim() {
        let mut frames: [FrameInfo; 0] = [];
        assert_eq!(LruPolicy::new().select(&mut frames, 0), None);
    }
}

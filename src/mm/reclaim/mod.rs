//! # Page Reclaim Subsystem
//!
//! Políticas de escolha de vítima para eviction. A política só escolhe;
//! quem grava no backing store e troca o dono do frame é o pager.
//!
//! Contrato mínimo de toda política:
//! - só devolve frames MAPPED, não PINNED, não BUSY
//! - devolve None se não houver candidato
//! - empates vão para o frame de menor endereço físico

pub mod lru;
pub mod nru;

pub use lru::LruPolicy;
pub use nru::NruPolicy;

use crate::mm::pfm::{FrameId, FrameInfo};

/// Política de eviction plugável
pub trait EvictionPolicy: Send {
    /// Nome para logs e diagnóstico
    fn name(&self) -> &'static str;

    /// Escolhe a vítima. Pode limpar bits de acesso (`clear_accessed`).
    fn select(&mut self, frames: &mut [FrameInfo], now: u64) -> Option<FrameId>;
}

/// Candidato de menor chave; empate pelo menor endereço físico
pub(crate) fn min_evictable_by<K: Ord>(
    frames: &[FrameInfo],
    key: impl Fn(&FrameInfo) -> K,
) -> Option<FrameId> {
    frames
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_evictable())
        .min_by_key(|(_, f)| (key(*f), f.phys()))
        .map(|(id, _)| id)
}

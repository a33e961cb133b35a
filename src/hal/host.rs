//! Ambiente de execução simulado
//!
//! Relógio determinístico (avança `tick_step` a cada leitura), flags de ISR
//! e profundidade de irq_lock controladas pelo chamador, e registro de
//! todos os erros fatais reportados.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use spin::Mutex;

use super::traits::{ContextId, ExecEnv, CONTEXT_KERNEL};
use crate::mm::fault::FatalReason;

pub struct HostEnv {
    context: AtomicU64,
    isr: AtomicBool,
    irq_depth: AtomicUsize,
    ticks: AtomicU64,
    tick_step: AtomicU64,
    fatals: Mutex<Vec<(ContextId, FatalReason)>>,
}

impl HostEnv {
    pub const fn new() -> Self {
        Self {
            context: AtomicU64::new(CONTEXT_KERNEL),
            isr: AtomicBool::new(false),
            irq_depth: AtomicUsize::new(0),
            ticks: AtomicU64::new(0),
            tick_step: AtomicU64::new(1),
            fatals: Mutex::new(Vec::new()),
        }
    }

    /// Troca o contexto corrente (simula o scheduler)
    pub fn set_context(&self, context: ContextId) {
        self.context.store(context, Ordering::Relaxed);
    }

    /// Entra/sai de um handler de interrupção
    pub fn set_in_isr(&self, in_isr: bool) {
        self.isr.store(in_isr, Ordering::Relaxed);
    }

    /// Mascara IRQs até o guard sair de escopo. Aninhável.
    pub fn irq_lock(&self) -> IrqLockGuard<'_> {
        self.irq_depth.fetch_add(1, Ordering::Relaxed);
        IrqLockGuard { env: self }
    }

    /// Avança o relógio manualmente
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Quanto o relógio anda a cada `now()`
    pub fn set_tick_step(&self, step: u64) {
        self.tick_step.store(step, Ordering::Relaxed);
    }

    /// Cópia dos erros fatais reportados até agora
    pub fn fatal_errors(&self) -> Vec<(ContextId, FatalReason)> {
        self.fatals.lock().clone()
    }
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecEnv for HostEnv {
    fn current_context(&self) -> ContextId {
        self.context.load(Ordering::Relaxed)
    }

    fn in_isr(&self) -> bool {
        self.isr.load(Ordering::Relaxed)
    }

    fn irqs_locked(&self) -> bool {
        self.irq_depth.load(Ordering::Relaxed) > 0
    }

    fn now(&self) -> u64 {
        let step = self.tick_step.load(Ordering::Relaxed);
        self.ticks.fetch_add(step, Ordering::Relaxed)
    }

    fn fatal_error(&self, context: ContextId, reason: FatalReason) {
        crate::kerror!("(HAL) Erro fatal no contexto ", context);
        self.fatals.lock().push((context, reason));
    }
}

/// Guard de irq_lock - restaura ao sair do escopo
pub struct IrqLockGuard<'a> {
    env: &'a HostEnv,
}

impl Drop for IrqLockGuard<'_> {
    fn drop(&mut self) {
        self.env.irq_depth.fetch_sub(1, Ordering::Relaxed);
    }
}

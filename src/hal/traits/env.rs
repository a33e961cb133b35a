//! Trait de ambiente de execução

use crate::mm::fault::FatalReason;

/// Identificador do contexto (thread) que causou um fault.
pub type ContextId = u64;

/// Contexto do próprio kernel (boot, workers sem thread dona).
pub const CONTEXT_KERNEL: ContextId = 0;

/// Abstração do ambiente onde o pager roda
///
/// O kernel implementa este trait sobre o scheduler e o controlador de
/// interrupções. `now()` deve ser monotônico; a unidade é livre (ticks,
/// ciclos) e aparece crua nos histogramas.
pub trait ExecEnv: Send + Sync {
    /// Thread corrente
    fn current_context(&self) -> ContextId;

    /// Executando dentro de um handler de interrupção?
    fn in_isr(&self) -> bool;

    /// IRQs mascaradas pelo chamador?
    fn irqs_locked(&self) -> bool;

    /// Relógio monotônico
    fn now(&self) -> u64;

    /// Cede a CPU enquanto espera uma página em trânsito
    fn relax(&self) {
        core::hint::spin_loop();
    }

    /// Fault sem solução: o kernel decide o destino do contexto
    fn fatal_error(&self, context: ContextId, reason: FatalReason) {
        let _ = (context, reason);
    }
}

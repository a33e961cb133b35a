//! # Page Fault Handler
//!
//! Ponto de entrada de faults vindos do trap handler (ou dos acessores
//! simulados do pager). Contabiliza o fault, recusa faults dentro de ISR
//! e entrega a resolução ao pager. Falhas viram [`FatalReason`] e são
//! reportadas ao ambiente via `fatal_error`.

use crate::hal::ContextId;
use crate::mm::addr::VirtAddr;
use crate::mm::error::PagerError;
use crate::mm::pager::Pager;
use crate::mm::swap::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
    Execute,
}

impl AccessType {
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Por que um fault não pôde ser resolvido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalReason {
    /// Endereço fora de qualquer arena (inclui páginas de guarda)
    IllegalAccess(VirtAddr),
    /// Escrita/execução numa arena sem a permissão
    ProtectionViolation(VirtAddr),
    /// Fault dentro de handler de interrupção
    NonBlockableContext,
    /// Sem frame evictável ou sem slot para a vítima
    OutOfMemory,
    /// Backing store falhou no page-in/page-out
    BackingStore(StoreError),
}

impl FatalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IllegalAccess(_) => "Acesso fora de qualquer arena",
            Self::ProtectionViolation(_) => "Violação de proteção",
            Self::NonBlockableContext => "Page fault em contexto não bloqueável",
            Self::OutOfMemory => "Sem memória para resolver o fault",
            Self::BackingStore(e) => e.as_str(),
        }
    }

    /// Traduz o erro da resolução para a razão reportada ao kernel
    pub fn from_error(error: PagerError, addr: VirtAddr) -> Self {
        match error {
            PagerError::Fatal(reason) => reason,
            PagerError::FaultInNonBlockableContext => Self::NonBlockableContext,
            PagerError::OutOfMemory | PagerError::OutOfSlots => Self::OutOfMemory,
            PagerError::Store(e) => Self::BackingStore(e),
            _ => Self::IllegalAccess(addr),
        }
    }
}

/// Resultado de um fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// Página residente; a instrução pode ser reexecutada
    Resolved,
    /// O contexto não pode continuar
    Fatal(FatalReason),
}

#[derive(Debug, Clone, Copy)]
pub struct PageFaultInfo {
    pub addr: VirtAddr,
    pub access: AccessType,
    pub context: ContextId,
}

impl PageFaultInfo {
    pub fn new(addr: VirtAddr, access: AccessType, context: ContextId) -> Self {
        Self {
            addr,
            access,
            context,
        }
    }

    /// Decodifica o error code de #PF do x86_64 (bit 1 = escrita, bit 4 = fetch)
    pub fn from_error_code(addr: u64, error_code: u64, context: ContextId) -> Self {
        let access = if error_code & 0x10 != 0 {
            AccessType::Execute
        } else if error_code & 0x02 != 0 {
            AccessType::Write
        } else {
            AccessType::Read
        };
        Self::new(VirtAddr::new(addr), access, context)
    }
}

impl Pager {
    /// Trata um page fault de `context` em `addr`
    pub fn on_page_fault(
        &self,
        addr: VirtAddr,
        access: AccessType,
        context: ContextId,
    ) -> FaultOutcome {
        self.handle_page_fault(PageFaultInfo::new(addr, access, context))
    }

    pub fn handle_page_fault(&self, info: PageFaultInfo) -> FaultOutcome {
        let env = self.env();
        let in_isr = env.in_isr();
        self.stats()
            .record_fault(info.context, env.irqs_locked(), in_isr);
        crate::ktrace!("(FAULT) addr=", info.addr.as_u64(), " ctx=", info.context);

        let result = if in_isr {
            Err(PagerError::FaultInNonBlockableContext)
        } else {
            self.resolve_fault(info.addr, info.access, info.context, false)
                .map(|_| ())
        };

        match result {
            Ok(()) => FaultOutcome::Resolved,
            Err(e) => {
                let reason = FatalReason::from_error(e, info.addr);
                crate::kerror!("(FAULT) Fault fatal em:", info.addr.as_u64());
                env.fatal_error(info.context, reason);
                FaultOutcome::Fatal(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_decoding() {
        assert_eq!(PageFaultInfo::from_error_code(0x1000, 0x00, 1).access, AccessType::Read);
        assert_eq!(PageFaultInfo::from_error_code(0x1000, 0x02, 1).access, AccessType::Write);
        assert_eq!(PageFaultInfo::from_error_code(0x1000, 0x12, 1).access, AccessType::Execute);
    }

    #[test]
    fn resolution_errors_map_to_reasons() {
        let addr = VirtAddr::new(0x5000);
        assert_eq!(
            FatalReason::from_error(PagerError::OutOfSlots, addr),
            FatalReason::OutOfMemory
        );
        assert_eq!(
            FatalReason::from_error(PagerError::Store(StoreError::Io), addr),
            FatalReason::BackingStore(StoreError::Io)
        );
        assert_eq!(
            FatalReason::from_error(PagerError::NotMapped, addr),
            FatalReason::IllegalAccess(addr)
        );
        assert_eq!(
            FatalReason::from_error(PagerError::Fatal(FatalReason::ProtectionViolation(addr)), addr),
            FatalReason::ProtectionViolation(addr)
        );
    }
}

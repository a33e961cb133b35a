//! Tipos de Erro do Pager
//!
//! Erros estruturados para diagnóstico preciso de falhas de paginação.
//! Os erros de camadas internas (frame table, backing store, fault) entram
//! aqui via `From`, permitindo `?` em todo o motor.

use super::fault::FatalReason;
use super::pfm::FrameError;
use super::swap::StoreError;

/// Erros do pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerError {
    /// Janela virtual sem espaço contíguo para a arena
    OutOfVirtualSpace,
    /// Backing store sem slots (ou limite de commit excedido)
    OutOfSlots,
    /// Nenhum frame livre nem evictável (tudo pinado ou ocupado)
    OutOfMemory,
    /// Endereço fora de qualquer arena / arena desconhecida
    NotMapped,
    /// Endereço inválido (overflow, fora da janela)
    InvalidAddress,
    /// Tamanho inválido (zero ou muito grande)
    InvalidSize,
    /// Endereço não alinhado a página
    NotAligned,
    /// Configuração inconsistente
    InvalidConfig,
    /// Operação bloqueante pedida de dentro de um ISR
    FaultInNonBlockableContext,
    /// Falha de I/O do backing store
    Store(StoreError),
    /// Acesso que termina em erro fatal para o contexto
    Fatal(FatalReason),
}

impl PagerError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfVirtualSpace => "Sem espaço virtual para a arena",
            Self::OutOfSlots => "Backing store sem slots livres",
            Self::OutOfMemory => "OOM: nenhum frame evictável",
            Self::NotMapped => "Região não mapeada",
            Self::InvalidAddress => "Endereço inválido",
            Self::InvalidSize => "Tamanho inválido",
            Self::NotAligned => "Endereço não alinhado a página",
            Self::InvalidConfig => "Configuração inválida",
            Self::FaultInNonBlockableContext => "Paginação pedida dentro de ISR",
            Self::Store(e) => e.as_str(),
            Self::Fatal(r) => r.as_str(),
        }
    }
}

impl core::fmt::Display for PagerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Store(_) => write!(f, "backing store: {}", self.as_str()),
            Self::Fatal(_) => write!(f, "fault fatal: {}", self.as_str()),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

impl From<StoreError> for PagerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfSlots => Self::OutOfSlots,
            other => Self::Store(other),
        }
    }
}

impl From<FrameError> for PagerError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::NoFreeFrame | FrameError::NoEvictableFrame => Self::OutOfMemory,
            FrameError::InvalidFrame | FrameError::NotMapped => Self::InvalidAddress,
        }
    }
}

impl From<FatalReason> for PagerError {
    fn from(r: FatalReason) -> Self {
        Self::Fatal(r)
    }
}

/// Tipo Result específico para operações do pager
pub type PagerResult<T> = Result<T, PagerError>;

//! Hardware Abstraction Layer (HAL)
//!
//! O pager não fala com CPU nem com o scheduler diretamente. Tudo que ele
//! precisa saber do ambiente (contexto atual, ISR, IRQs, relógio, como
//! reportar erro fatal) passa pelo trait [`ExecEnv`].
//!
//! - `traits`: contrato com o kernel hospedeiro
//! - `host`: ambiente simulado, usado em testes e ferramentas

pub mod host;
pub mod traits;

pub use host::{HostEnv, IrqLockGuard};
pub use traits::*;

//! Acessores de memória simulada.
//!
//! Fazem o papel da MMU: se a página está residente e o acesso é
//! permitido, o conteúdo é tocado direto (marcando ACCESSED/DIRTY); senão
//! geram um page fault e tentam de novo.

use super::Pager;
use crate::mm::addr::VirtAddr;
use crate::mm::aspace::PageState;
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::{PagerError, PagerResult};
use crate::mm::fault::{AccessType, FaultOutcome};

impl Pager {
    /// Executa `op` sobre o conteúdo da página de `addr`
    fn access_page<R>(
        &self,
        addr: VirtAddr,
        access: AccessType,
        op: impl FnOnce(&mut [u8]) -> R,
    ) -> PagerResult<R> {
        let mut op = Some(op);
        loop {
            {
                let aspace = self.aspace.lock();
                if let Some((entry, index)) = aspace.lookup(addr) {
                    if let PageState::Resident(id) = entry.pages[index] {
                        if entry.arena.permits(access) {
                            self.frames.lock().touch(id, access.is_write())?;
                            if let Some(op) = op.take() {
                                return Ok(self.frames.with_data_mut(id, op));
                            }
                        }
                    }
                }
            }

            // TLB miss
            let context = self.env.current_context();
            if let FaultOutcome::Fatal(reason) = self.on_page_fault(addr, access, context) {
                return Err(PagerError::Fatal(reason));
            }
        }
    }

    /// Copia `buf.len()` bytes a partir de `addr`
    pub fn read(&self, addr: VirtAddr, buf: &mut [u8]) -> PagerResult<()> {
        let mut done = 0;
        while done < buf.len() {
            let cur = addr.checked_add(done).ok_or(PagerError::InvalidAddress)?;
            let offset = cur.page_offset();
            let chunk = (PAGE_SIZE - offset).min(buf.len() - done);
            let dst = &mut buf[done..done + chunk];
            self.access_page(cur, AccessType::Read, |data| {
                dst.copy_from_slice(&data[offset..offset + chunk])
            })?;
            done += chunk;
        }
        Ok(())
    }

    /// Grava `src` a partir de `addr`
    pub fn write(&self, addr: VirtAddr, src: &[u8]) -> PagerResult<()> {
        let mut done = 0;
        while done < src.len() {
            let cur = addr.checked_add(done).ok_or(PagerError::InvalidAddress)?;
            let offset = cur.page_offset();
            let chunk = (PAGE_SIZE - offset).min(src.len() - done);
            let part = &src[done..done + chunk];
            self.access_page(cur, AccessType::Write, |data| {
                data[offset..offset + chunk].copy_from_slice(part)
            })?;
            done += chunk;
        }
        Ok(())
    }

    /// Preenche `len` bytes com `byte`
    pub fn fill(&self, addr: VirtAddr, len: usize, byte: u8) -> PagerResult<()> {
        let mut done = 0;
        while done < len {
            let cur = addr.checked_add(done).ok_or(PagerError::InvalidAddress)?;
            let offset = cur.page_offset();
            let chunk = (PAGE_SIZE - offset).min(len - done);
            self.access_page(cur, AccessType::Write, |data| {
                data[offset..offset + chunk].fill(byte)
            })?;
            done += chunk;
        }
        Ok(())
    }

    pub fn read_u8(&self, addr: VirtAddr) -> PagerResult<u8> {
        let offset = addr.page_offset();
        self.access_page(addr, AccessType::Read, |data| data[offset])
    }

    pub fn write_u8(&self, addr: VirtAddr, value: u8) -> PagerResult<()> {
        let offset = addr.page_offset();
        self.access_page(addr, AccessType::Write, |data| data[offset] = value)
    }

    /// Busca de instrução (exige arena EXEC)
    pub fn fetch_u8(&self, addr: VirtAddr) -> PagerResult<u8> {
        let offset = addr.page_offset();
        self.access_page(addr, AccessType::Execute, |data| data[offset])
    }
}

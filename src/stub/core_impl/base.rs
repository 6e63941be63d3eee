use log::{error, info, warn};

use super::prelude::*;
use crate::arch::{fetch_reg, modify_reg, CORE_REGS};
use crate::protocol::hex::{decode_hex_buf, parse_hex};
use crate::target::{GuestMem, Tid};

/// Everything the server advertises. Sent verbatim; clients key feature
/// probing off this string.
const SUPPORTED_FEATURES: &str = "multiprocess-;swbreak+;hwbreak-;qRelocInsn-;fork-events-;\
                                  vfork-events-;exec-events-;vContSupported+;QThreadEvents-;\
                                  no-resumed-;xmlRegisters=arm";

impl GdbStubImpl {
    pub(super) fn handle_supported(&mut self, res: &mut ResponseWriter) {
        res.write_str(SUPPORTED_FEATURES);
    }

    pub(super) fn handle_current_thread(&mut self, res: &mut ResponseWriter) {
        res.write_str("QC");
        res.write_u32_hex(self.current_thread as u32);
    }

    /// `H g tid` selects the thread for subsequent register/memory access.
    /// `H c tid` is the deprecated continue-thread form; accepted, ignored.
    pub(super) fn handle_set_thread<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        op: u8,
        tid: Tid,
    ) {
        let threads = target.kernel().threads();
        match op {
            b'c' => info!("deprecated continue-thread selection ignored"),
            b'g' => {
                self.current_thread = if tid == 0 {
                    threads.keys().next().copied().unwrap_or(-1)
                } else {
                    // no liveness check here; the next handler reports E00
                    // if the thread is already gone
                    tid
                };
            }
            op => warn!("unknown set-thread op {:?}", op as char),
        }
        res.write_str("OK");
    }

    pub(super) fn handle_thread_alive<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        tid: Tid,
    ) {
        if target.kernel().threads().contains_key(&tid) {
            res.write_str("OK");
        } else {
            res.write_str("E00");
        }
    }

    pub(super) fn handle_thread_info_first<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
    ) {
        let threads = target.kernel().threads();
        self.thread_info_index = 0;

        match threads.keys().next() {
            Some(&first) => {
                res.write(b'm');
                res.write_u32_hex(first as u32);
            }
            None => res.write(b'l'),
        }
    }

    pub(super) fn handle_thread_info_next<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
    ) {
        let threads = target.kernel().threads();
        self.thread_info_index += 1;

        match threads.keys().nth(self.thread_info_index) {
            Some(&tid) => {
                res.write(b'm');
                res.write_u32_hex(tid as u32);
            }
            None => res.write(b'l'),
        }
    }

    /// `g` carries the core set (r0-r15) only; float and status registers
    /// go through `p`.
    pub(super) fn handle_read_registers<T: Target>(&mut self, res: &mut ResponseWriter, target: &T) {
        let kernel = target.kernel();
        let threads = kernel.threads();
        let thread = match threads.get(&self.current_thread) {
            Some(thread) if self.current_thread != -1 => thread,
            _ => return res.write_str("E00"),
        };

        let cpu = thread.cpu();
        for reg in 0..CORE_REGS {
            res.write_u32_be_hex(fetch_reg(&*cpu, reg));
        }
    }

    pub(super) fn handle_write_registers<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        hex: &[u8],
    ) {
        let kernel = target.kernel();
        let threads = kernel.threads();
        let thread = match threads.get(&self.current_thread) {
            Some(thread) if self.current_thread != -1 => thread,
            _ => return res.write_str("E00"),
        };

        let mut cpu = thread.cpu();
        for (reg, chunk) in hex.chunks_exact(8).enumerate() {
            modify_reg(&mut *cpu, reg as u32, parse_hex(chunk));
        }
        res.write_str("OK");
    }

    pub(super) fn handle_read_memory<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        addr: u32,
        len: u32,
    ) {
        let mem = target.mem().lock();

        let end = match addr.checked_add(len) {
            Some(end) => end,
            None => return res.write_str("EAA"),
        };
        if !mem.is_valid_range(addr, end) {
            error!(
                "debugger attempted to read invalid memory range {:#010x}-{:#010x}",
                addr, end
            );
            return res.write_str("EAA");
        }
        if !check_memory_region(&*mem, addr, len) {
            return res.write_str("EAA");
        }

        for a in addr..end {
            res.write_hex(mem.read_byte(a));
        }
    }

    pub(super) fn handle_write_memory<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        addr: u32,
        len: u32,
        data: &[u8],
    ) {
        let mut mem = target.mem().lock();

        if addr.checked_add(len).is_none()
            || !check_memory_region(&*mem, addr, len)
            || data.len() != len as usize * 2
        {
            return res.write_str("EAA");
        }

        let mut decoded = data.to_vec();
        let bytes = match decode_hex_buf(&mut decoded) {
            Ok(bytes) => bytes,
            Err(_) => return res.write_str("EAA"),
        };
        for (a, &b) in (addr..).zip(bytes.iter()) {
            mem.write_byte(a, b);
        }
        res.write_str("OK");
    }
}

/// Page-by-page validity walk over `[addr, addr + len)`. Address zero is
/// never writable guest memory.
pub(super) fn check_memory_region<M: GuestMem>(mem: &M, addr: u32, len: u32) -> bool {
    if addr == 0 {
        return false;
    }

    let mut page = addr;
    let end = addr.saturating_add(len);
    while page < end {
        if !mem.is_valid_addr(page) {
            return false;
        }
        page = match page.checked_add(mem.page_size()) {
            Some(next) => next,
            None => break,
        };
    }
    true
}

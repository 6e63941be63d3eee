use super::prelude::*;
use crate::arch::{fetch_reg, modify_reg};

impl GdbStubImpl {
    /// `p reg` — unlike `g`, this path covers the float and status set
    /// (indices 16-25) as well.
    pub(super) fn handle_read_register<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        reg: u32,
    ) {
        let kernel = target.kernel();
        let threads = kernel.threads();
        let thread = match threads.get(&self.current_thread) {
            Some(thread) if self.current_thread != -1 => thread,
            _ => return res.write_str("E00"),
        };

        res.write_u32_be_hex(fetch_reg(&*thread.cpu(), reg));
    }

    pub(super) fn handle_write_register<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        reg: u32,
        value: u32,
    ) {
        let kernel = target.kernel();
        let threads = kernel.threads();
        let thread = match threads.get(&self.current_thread) {
            Some(thread) if self.current_thread != -1 => thread,
            _ => return res.write_str("E00"),
        };

        modify_reg(&mut *thread.cpu(), reg, value);
        res.write_str("OK");
    }
}

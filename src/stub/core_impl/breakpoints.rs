use log::{info, warn};

use super::prelude::*;
use crate::protocol::commands::Breakpoint;
use crate::target::GuestMem;

/// ARM breakpoint kind 2 selects the Thumb (16-bit) trap encoding; every
/// other kind installs the 32-bit one.
const KIND_THUMB: u32 = 2;

impl GdbStubImpl {
    /// `Z type,addr,kind`. Only software breakpoints exist here, so `type`
    /// is logged and otherwise ignored.
    pub(super) fn handle_insert_breakpoint<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        bp: Breakpoint,
    ) {
        let mut mem = target.mem().lock();

        if !mem.is_valid_addr(bp.addr) {
            warn!(
                "debugger attempted to add breakpoint at invalid address {:#010x} ({}, {})",
                bp.addr, bp.type_, bp.kind
            );
            return res.write_str("EAA");
        }

        info!(
            "new breakpoint at {:#010x} ({}, {})",
            bp.addr, bp.type_, bp.kind
        );
        target.add_breakpoint(&mut *mem, bp.addr, bp.kind == KIND_THUMB);
        res.write_str("OK");
    }

    /// `z type,addr,kind`; kind is not consulted on removal.
    pub(super) fn handle_remove_breakpoint<T: Target>(
        &mut self,
        res: &mut ResponseWriter,
        target: &T,
        bp: Breakpoint,
    ) {
        let mut mem = target.mem().lock();

        if !mem.is_valid_addr(bp.addr) {
            warn!(
                "debugger attempted to remove breakpoint at invalid address {:#010x} ({}, {})",
                bp.addr, bp.type_, bp.kind
            );
            return res.write_str("EAA");
        }

        info!(
            "removed breakpoint at {:#010x} ({}, {})",
            bp.addr, bp.type_, bp.kind
        );
        target.remove_breakpoint(&mut *mem, bp.addr);
        res.write_str("OK");
    }
}

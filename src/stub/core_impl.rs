use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

use crate::protocol::commands::Command;
use crate::protocol::ResponseWriter;
use crate::target::{Target, Tid};

/// Common imports used by most handler modules.
mod prelude {
    pub(super) use crate::protocol::ResponseWriter;
    pub(super) use crate::stub::core_impl::GdbStubImpl;
    pub(super) use crate::target::Target;
}

mod base;
mod breakpoints;
mod resume;
mod single_register_access;

/// Per-session command state and handlers.
///
/// Handlers run synchronously on the session thread; the `vCont` handler
/// is the only one that blocks for guest time.
pub(crate) struct GdbStubImpl {
    /// Thread addressed by register/memory commands. -1 until a client
    /// selects one (or a stop selects the inferior).
    pub(crate) current_thread: Tid,
    /// Thread that last hit a breakpoint; 0 until the first stop.
    pub(crate) inferior_thread: Tid,
    /// Cursor for `qfThreadInfo`/`qsThreadInfo` paging.
    thread_info_index: usize,
    /// Shared shutdown flag; set by `k` and polled by the controller.
    die: Arc<AtomicBool>,
}

impl GdbStubImpl {
    pub fn new(die: Arc<AtomicBool>) -> GdbStubImpl {
        GdbStubImpl {
            current_thread: -1,
            inferior_thread: 0,
            thread_info_index: 0,
            die,
        }
    }

    pub fn server_die(&self) -> bool {
        self.die.load(Ordering::Relaxed)
    }

    /// Dispatch one parsed command, producing the reply body.
    pub fn handle_command<T: Target>(&mut self, target: &T, cmd: Command<'_>) -> Vec<u8> {
        let mut res = ResponseWriter::new();
        match cmd {
            Command::HaltReason => res.write_str("S05"),
            Command::Supported => self.handle_supported(&mut res),
            Command::Attached => res.write_str("1"),
            Command::TraceStatus => res.write_str("T0"),
            Command::CurrentThread => self.handle_current_thread(&mut res),
            Command::SetThread { op, tid } => self.handle_set_thread(&mut res, target, op, tid),
            Command::ThreadAlive(tid) => self.handle_thread_alive(&mut res, target, tid),
            Command::ThreadInfoFirst => self.handle_thread_info_first(&mut res, target),
            Command::ThreadInfoNext => self.handle_thread_info_next(&mut res, target),

            Command::ReadRegisters => self.handle_read_registers(&mut res, target),
            Command::WriteRegisters(hex) => self.handle_write_registers(&mut res, target, hex),
            Command::ReadRegister(reg) => self.handle_read_register(&mut res, target, reg),
            Command::WriteRegister { reg, value } => {
                self.handle_write_register(&mut res, target, reg, value)
            }
            Command::ReadMemory { addr, len } => self.handle_read_memory(&mut res, target, addr, len),
            Command::WriteMemory { addr, len, data } => {
                self.handle_write_memory(&mut res, target, addr, len, data)
            }

            Command::InsertBreakpoint(bp) => self.handle_insert_breakpoint(&mut res, target, bp),
            Command::RemoveBreakpoint(bp) => self.handle_remove_breakpoint(&mut res, target, bp),

            Command::ContSupported => res.write_str("vCont;c;C;s;S;t;r"),
            Command::Cont(actions) => self.handle_vcont(&mut res, target, actions),

            Command::Detach => res.write_str("OK"),
            Command::VKill => res.write_str("OK"),
            Command::Kill => self.die.store(true, Ordering::Relaxed),
            Command::MustReplyEmpty => {}

            Command::Unimplemented(body) => {
                info!("unimplemented packet: {:?}", String::from_utf8_lossy(body));
            }
            Command::Deprecated(body) => {
                info!("deprecated packet: {:?}", String::from_utf8_lossy(body));
            }
            Command::Unknown(body) => {
                info!("unrecognized packet: {:?}", String::from_utf8_lossy(body));
            }
        }
        res.into_body()
    }
}

//! An implementation of the [GDB Remote Serial Protocol] for the emulated
//! ARM guest, served over TCP.
//!
//! The emulator hands the server a [`Target`] — its kernel thread table,
//! guest memory, and breakpoint installer — and calls
//! [`DebugServer::spawn`]. A connected debugger can then read and write
//! registers and guest memory, enumerate guest threads, plant software
//! breakpoints, and continue or single-step the guest. `continue` is
//! stop-the-world: every guest thread is resumed, the server waits for one
//! of them to park on a breakpoint, and the rest are driven back to
//! suspension before the stop reason is reported.
//!
//! Protocol notes:
//!
//! - Acknowledgement mode is always on (no `QStartNoAckMode`); a packet is
//!   acked before its reply is transmitted, and a NACK retransmits the
//!   previous reply verbatim.
//! - One client at a time; the session ends on disconnect or `k`, the
//!   emulator keeps running.
//! - Binary downloads (`X`), hardware breakpoints, watchpoints, and
//!   non-stop mode are not supported.
//!
//! [GDB Remote Serial Protocol]:
//!     https://sourceware.org/gdb/current/onlinedocs/gdb/Remote-Protocol.html

pub mod arch;
pub mod conn;
pub mod protocol;
pub mod stub;
pub mod target;

pub use conn::Connection;
pub use stub::{DebugServer, SessionError, DEFAULT_PORT};
pub use target::{
    Cpu, GuestMem, GuestThread, Kernel, Target, ThreadControl, ThreadStatus, Tid,
};

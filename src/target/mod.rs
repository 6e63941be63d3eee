//! The interfaces the server consumes from the rest of the emulator: the
//! CPU core, the guest memory subsystem, the kernel thread table, and the
//! kernel debugger's breakpoint installer.

mod cpu;
mod kernel;
mod mem;

pub use cpu::Cpu;
pub use kernel::{GuestThread, Kernel, ThreadControl, ThreadStatus, Tid};
pub use mem::GuestMem;

use parking_lot::Mutex;

/// Hooks the debug server into a concrete emulator.
///
/// One value of this type is shared (via `Arc`) between the emulator and
/// the server thread; everything behind it carries its own locking.
pub trait Target: Send + Sync + 'static {
    type Cpu: Cpu;
    type Mem: GuestMem;

    /// The guest kernel's thread table.
    fn kernel(&self) -> &Kernel<Self::Cpu>;

    /// The guest memory subsystem.
    fn mem(&self) -> &Mutex<Self::Mem>;

    /// Install a software breakpoint: replace the instruction at `addr`
    /// with a trap pattern, remembering the original bytes. `thumb`
    /// selects the 16-bit encoding.
    fn add_breakpoint(&self, mem: &mut Self::Mem, addr: u32, thumb: bool);

    /// Remove the breakpoint at `addr`, restoring the original bytes.
    fn remove_breakpoint(&self, mem: &mut Self::Mem, addr: u32);
}

/// Register-level view of one emulated ARM core.
///
/// Float registers are exposed as `f32`; the wire format carries their raw
/// bit pattern (`f32::to_bits`/`from_bits` at the boundary).
pub trait Cpu: Send + 'static {
    /// Read general-purpose register r0-r12.
    fn reg(&self, idx: u8) -> u32;
    fn set_reg(&mut self, idx: u8, value: u32);

    fn sp(&self) -> u32;
    fn set_sp(&mut self, value: u32);

    fn lr(&self) -> u32;
    fn set_lr(&mut self, value: u32);

    fn pc(&self) -> u32;
    fn set_pc(&mut self, value: u32);

    /// Read single-precision float register 0-7.
    fn fpr(&self, idx: u8) -> f32;
    fn set_fpr(&mut self, idx: u8, value: f32);

    fn fpscr(&self) -> u32;
    fn set_fpscr(&mut self, value: u32);

    fn cpsr(&self) -> u32;
    fn set_cpsr(&mut self, value: u32);

    /// True when this core is parked on a software breakpoint.
    fn hit_breakpoint(&self) -> bool;
}

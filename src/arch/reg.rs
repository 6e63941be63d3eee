use log::warn;

use crate::target::Cpu;

/// Number of registers a `g` packet carries (r0-r12, sp, lr, pc).
pub const CORE_REGS: u32 = 16;

/// 32-bit ARM register identifier, by wire index.
///
/// Index numbers are part of the protocol and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmRegId {
    /// General purpose registers (R0-R12)
    Gpr(u8),
    /// Stack Pointer (R13)
    Sp,
    /// Link Register (R14)
    Lr,
    /// Program Counter (R15)
    Pc,
    /// Single-precision float registers (F0-F7)
    Fpr(u8),
    /// Floating point status
    Fps,
    /// Current Program Status Register
    Cpsr,
}

impl ArmRegId {
    pub fn from_raw_id(id: u32) -> Option<ArmRegId> {
        match id {
            0..=12 => Some(ArmRegId::Gpr(id as u8)),
            13 => Some(ArmRegId::Sp),
            14 => Some(ArmRegId::Lr),
            15 => Some(ArmRegId::Pc),
            16..=23 => Some(ArmRegId::Fpr((id - 16) as u8)),
            24 => Some(ArmRegId::Fps),
            25 => Some(ArmRegId::Cpsr),
            _ => None,
        }
    }
}

/// Read the register at wire index `reg`. Unknown indices read as zero.
pub fn fetch_reg<C: Cpu>(cpu: &C, reg: u32) -> u32 {
    match ArmRegId::from_raw_id(reg) {
        Some(ArmRegId::Gpr(r)) => cpu.reg(r),
        Some(ArmRegId::Sp) => cpu.sp(),
        Some(ArmRegId::Lr) => cpu.lr(),
        Some(ArmRegId::Pc) => cpu.pc(),
        Some(ArmRegId::Fpr(r)) => cpu.fpr(r).to_bits(),
        Some(ArmRegId::Fps) => cpu.fpscr(),
        Some(ArmRegId::Cpsr) => cpu.cpsr(),
        None => {
            warn!("debugger queried invalid register {}", reg);
            0
        }
    }
}

/// Write the register at wire index `reg`. Unknown indices are ignored.
pub fn modify_reg<C: Cpu>(cpu: &mut C, reg: u32, value: u32) {
    match ArmRegId::from_raw_id(reg) {
        Some(ArmRegId::Gpr(r)) => cpu.set_reg(r, value),
        Some(ArmRegId::Sp) => cpu.set_sp(value),
        Some(ArmRegId::Lr) => cpu.set_lr(value),
        Some(ArmRegId::Pc) => cpu.set_pc(value),
        Some(ArmRegId::Fpr(r)) => cpu.set_fpr(r, f32::from_bits(value)),
        Some(ArmRegId::Fps) => cpu.set_fpscr(value),
        Some(ArmRegId::Cpsr) => cpu.set_cpsr(value),
        None => warn!("debugger modified invalid register {}", reg),
    }
}

//! ARM register-file numbering as it appears on the wire.

pub mod reg;

pub use reg::{fetch_reg, modify_reg, ArmRegId, CORE_REGS};

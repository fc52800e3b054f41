//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.17 SMMU_GERRORN
//!
//! ## Purpose
//! Acknowledges global errors latched in SMMU_GERROR. Software toggles
//! the bit corresponding to an error it has handled; SMMU_GERROR's bit
//! clears once it matches SMMU_GERRORN.
//!
//! ## Attributes
//! SMMU_GERRORN is a 32-bit register, same bit layout as SMMU_GERROR.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

register_bitfields! {u32,
    pub GERRORN [
        /// Bits [31:9] Reserved, RES0.
        Reserved9 OFFSET(9) NUMBITS(23) [],
        /// Mirrors SMMU_GERROR.SFM_ERR.
        SFM_ERR OFFSET(8) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.MSI_GERROR_ABT_ERR.
        MSI_GERROR_ABT_ERR OFFSET(7) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.MSI_PRIQ_ABT_ERR.
        MSI_PRIQ_ABT_ERR OFFSET(6) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.MSI_EVENTQ_ABT_ERR.
        MSI_EVENTQ_ABT_ERR OFFSET(5) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.MSI_CMDQ_ABT_ERR.
        MSI_CMDQ_ABT_ERR OFFSET(4) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.PRIQ_ABT_ERR.
        PRIQ_ABT_ERR OFFSET(3) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.EVENTQ_ABT_ERR.
        EVENTQ_ABT_ERR OFFSET(2) NUMBITS(1) [],
        /// Bit [1] Reserved, RES0.
        Reserved1 OFFSET(1) NUMBITS(1) [],
        /// Mirrors SMMU_GERROR.CMDQ_ERR.
        CMDQ_ERR OFFSET(0) NUMBITS(1) []
    ]
}

/// SMMU_GERRORN register, read-write.
pub type GerrorNReg = ReadWrite<u32, GERRORN::Register>;

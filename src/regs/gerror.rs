//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.16 SMMU_GERROR
//!
//! ## Purpose
//! Global Error status register. Any bit set here after the SMMU is
//! enabled is a fatal device error (§7).
//!
//! ## Attributes
//! SMMU_GERROR is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadOnly;

register_bitfields! {u32,
    pub GERROR [
        /// Bits [31:9] Reserved, RES0.
        Reserved9 OFFSET(9) NUMBITS(23) [],
        /// SFM_ERR, bit [8] Service Failure Mode.
        SFM_ERR OFFSET(8) NUMBITS(1) [],
        /// MSI_GERROR_ABT_ERR, bit [7].
        MSI_GERROR_ABT_ERR OFFSET(7) NUMBITS(1) [],
        /// MSI_PRIQ_ABT_ERR, bit [6].
        MSI_PRIQ_ABT_ERR OFFSET(6) NUMBITS(1) [],
        /// MSI_EVENTQ_ABT_ERR, bit [5].
        MSI_EVENTQ_ABT_ERR OFFSET(5) NUMBITS(1) [],
        /// MSI_CMDQ_ABT_ERR, bit [4].
        MSI_CMDQ_ABT_ERR OFFSET(4) NUMBITS(1) [],
        /// PRIQ_ABT_ERR, bit [3].
        PRIQ_ABT_ERR OFFSET(3) NUMBITS(1) [],
        /// EVENTQ_ABT_ERR, bit [2].
        EVENTQ_ABT_ERR OFFSET(2) NUMBITS(1) [],
        /// Bit [1] Reserved, RES0.
        Reserved1 OFFSET(1) NUMBITS(1) [],
        /// CMDQ_ERR, bit [0] Command Queue error.
        CMDQ_ERR OFFSET(0) NUMBITS(1) []
    ]
}

/// SMMU_GERROR register, read-only. Acknowledged by toggling the
/// matching bit in [`super::GERRORN`].
pub type GerrorReg = ReadOnly<u32, GERROR::Register>;

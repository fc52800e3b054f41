//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.15 SMMU_CR2
//!
//! ## Purpose
//! Non-secure SMMU programming interface control and configuration
//! register: Stage-2-only invalidation/translation-regime behavior.
//!
//! ## Attributes
//! SMMU_CR2 is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

register_bitfields! {u32,
    pub CR2 [
        /// Bits [31:3] Reserved, RES0.
        Reserved3 OFFSET(3) NUMBITS(29) [],
        /// PTM, bit [2] Private TLB Maintenance.
        /// - 0b0 The SMMU participates in broadcast TLB maintenance.
        /// - 0b1 The SMMU does not participate in broadcast TLB
        ///   maintenance; software must explicitly invalidate via the
        ///   command queue. Set when SMMU_IDR0.BTM == 0.
        PTM OFFSET(2) NUMBITS(1) [
            Participate = 0,
            DoNotParticipate = 1
        ],
        /// RECINVSID, bit [1] Record invalidation by StreamID.
        /// - 0b1 CMD_CFGI_STE/CMD_CFGI_ALL additionally invalidate any
        ///   STE-derived TLB entries tagged with the affected
        ///   StreamIDs.
        RECINVSID OFFSET(1) NUMBITS(1) [
            Disable = 0,
            Enable = 1
        ],
        /// E2H, bit [0] EL2-and-EL0 translation regime.
        /// - 0b0 EL2 translation regime (this driver's only supported
        ///   mode).
        E2H OFFSET(0) NUMBITS(1) [
            El2 = 0,
            El2AndEl0 = 1
        ]
    ]
}

/// CR2 register, read-write.
pub type Cr2Reg = ReadWrite<u32, CR2::Register>;

//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.14 SMMU_GBPA
//!
//! ## Purpose
//! Global Bypass Attribute register — what happens to streams that are
//! not checked against the stream table, either because SMMU_CR0.SMMUEN
//! is 0 or because global abort is in effect.
//!
//! ## Attributes
//! SMMU_GBPA is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

register_bitfields! {u32,
    pub GBPA [
        /// UPDATE, bit [31]
        /// Initiates a transition of the other fields in this register.
        /// Software writes 1 to this bit to request a change; hardware
        /// clears it once the change has taken effect.
        UPDATE OFFSET(31) NUMBITS(1) [],
        /// Bits [30:21] Reserved, RES0.
        Reserved21 OFFSET(21) NUMBITS(10) [],
        /// ABORT, bit [20]
        /// - 0b0 Bypass: transactions from streams not covered by the
        ///   stream table are allowed to pass, with attributes from the
        ///   other fields of this register.
        /// - 0b1 Abort: such transactions are terminated.
        ABORT OFFSET(20) NUMBITS(1) [
            Bypass = 0,
            Abort = 1
        ],
        /// Bits [19:0] Reserved, RES0 (memory-attribute override fields
        /// not used by this driver, which only toggles ABORT/UPDATE).
        Reserved0 OFFSET(0) NUMBITS(20) []
    ]
}

/// SMMU_GBPA register, read-write.
pub type GbpaReg = ReadWrite<u32, GBPA::Register>;

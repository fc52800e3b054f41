//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.30 SMMU_EVENTQ_CONS
//!
//! ## Purpose
//! Event queue consumer read index. Page-1 register (base + 0x10000).
//!
//! ## Attributes
//! SMMU_EVENTQ_CONS is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

register_bitfields! {u32,
    pub EVENTQ_CONS [
        /// OVACKFLG, bit [31] Overflow Acknowledge flag.
        /// Software toggles this to match EVENTQ_PROD.OVFLG to acknowledge an overflow.
        OVACKFLG OFFSET(31) NUMBITS(1) [],
        /// Bits [30:20] Reserved, RES0.
        Reserved20 OFFSET(20) NUMBITS(11) [],
        /// RD, bits [19:0]
        /// Event queue read index.
        ///
        /// This field is treated as two sub-fields, depending on the configured queue size:
        /// - **Bit [QS]: RD_WRAP** - Event queue read index wrap flag.
        /// - **Bits [QS-1:0]: RD** - Event queue read index.
        ///     - Updated by software (consumer) to point at the entry after the one it has just consumed.
        RD OFFSET(0) NUMBITS(20) []
    ]
}

/// SMMU_EVENTQ_CONS register, read-write.
pub type EventQConsReg = ReadWrite<u32, EVENTQ_CONS::Register>;

//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.29 SMMU_EVENTQ_PROD
//!
//! ## Purpose
//! Allows Event queue producer (the SMMU) to update the write index.
//! Page-1 register (base + 0x10000).
//!
//! ## Attributes
//! SMMU_EVENTQ_PROD is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

register_bitfields! {u32,
    pub EVENTQ_PROD [
        /// OVFLG, bit [31] Overflow flag.
        OVFLG OFFSET(31) NUMBITS(1) [],
        /// Bits [30:20] Reserved, RES0.
        Reserved20 OFFSET(20) NUMBITS(11) [],
        /// WR, bits [19:0]
        /// Event queue write index.
        ///
        /// This field is treated as two sub-fields, depending on the configured queue size:
        /// - **Bit [QS]: WR_WRAP** - Event queue write index wrap flag.
        /// - **Bits [QS-1:0]: WR** - Event queue write index.
        ///     - Updated by the SMMU (producer) indicating the next empty space in the queue after the entry it just wrote.
        WR OFFSET(0) NUMBITS(20) []
    ]
}

/// SMMU_EVENTQ_PROD register, read-write.
pub type EventQProdReg = ReadWrite<u32, EVENTQ_PROD::Register>;

//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.6 SMMU_IDR5
//!
//! ## Purpose
//! Provides information on stage 2 output address size and the
//! translation granules supported.
//!
//! ## Attributes
//! SMMU_IDR5 is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadOnly;

register_bitfields! {u32,
    pub IDR5 [
        /// Bits [31:6] Reserved, RES0 for fields this driver does not
        /// consume (VAX, STALL_MAX).
        Reserved6 OFFSET(6) NUMBITS(26) [],
        /// GRAN64K, bit [5]. 64 KiB granule support — a non-goal for
        /// this driver, which only programs 4 KiB granules.
        GRAN64K OFFSET(5) NUMBITS(1) [],
        /// GRAN16K, bit [4]. 16 KiB granule support — a non-goal.
        GRAN16K OFFSET(4) NUMBITS(1) [],
        /// GRAN4K, bit [3]. 4 KiB granule support, required by this
        /// driver.
        GRAN4K OFFSET(3) NUMBITS(1) [
            NotSupported = 0,
            Supported = 1
        ],
        /// OAS, bits [2:0] Output Address Size.
        OAS OFFSET(0) NUMBITS(3) [
            Bits32 = 0b000,
            Bits36 = 0b001,
            Bits40 = 0b010,
            Bits42 = 0b011,
            Bits44 = 0b100,
            Bits48 = 0b101,
            Bits52 = 0b110
        ]
    ]
}

/// SMMU_IDR5 register, read-only.
pub type IDR5Reg = ReadOnly<u32, IDR5::Register>;

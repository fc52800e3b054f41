//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.12 SMMU_IRQ_CTRL
//!
//! ## Purpose
//! Interrupt control register.
//!
//! ## Attributes
//! SMMU_IRQ_CTRL is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadWrite;

register_bitfields! {u32,
    pub IRQ_CTRL [
        /// Bits [31:3] Reserved, RES0.
        Reserved3 OFFSET(3) NUMBITS(29) [],
        /// EVENTQ_IRQEN, bit [2] Event queue interrupt enable.
        EVENTQ_IRQEN OFFSET(2) NUMBITS(1) [
            Disable = 0,
            Enable = 1
        ],
        /// PRI_IRQEN, bit [1] PRI queue interrupt enable. Reserved RES0
        /// when SMMU_IDR0.PRI == 0 (always true for this driver — PRI
        /// is a non-goal).
        PRI_IRQEN OFFSET(1) NUMBITS(1) [
            Disable = 0,
            Enable = 1
        ],
        /// GERROR_IRQEN, bit [0] Global Error interrupt enable.
        GERROR_IRQEN OFFSET(0) NUMBITS(1) [
            Disable = 0,
            Enable = 1
        ]
    ]
}

/// SMMU_IRQ_CTRL register, read-write. Each field has a matching field
/// in [`super::IRQ_CTRLACK`]; software must poll the ack register after
/// a write to confirm the transition took effect.
pub type IrqCtrlReg = ReadWrite<u32, IRQ_CTRL::Register>;

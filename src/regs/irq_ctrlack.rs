//! Chapter 6. Memory map and registers
//! 6.3. Register formats
//! 6.3.13 SMMU_IRQ_CTRLACK
//!
//! ## Purpose
//! Provides acknowledgment of changes requested via SMMU_IRQ_CTRL.
//!
//! ## Attributes
//! SMMU_IRQ_CTRLACK is a 32-bit register.

use tock_registers::register_bitfields;
use tock_registers::registers::ReadOnly;

register_bitfields! {u32,
    pub IRQ_CTRLACK [
        /// Bits [31:3] Reserved, RES0.
        Reserved3 OFFSET(3) NUMBITS(29) [],
        /// Mirrors SMMU_IRQ_CTRL.EVENTQ_IRQEN once applied.
        EVENTQ_IRQEN OFFSET(2) NUMBITS(1) [],
        /// Mirrors SMMU_IRQ_CTRL.PRI_IRQEN once applied.
        PRI_IRQEN OFFSET(1) NUMBITS(1) [],
        /// Mirrors SMMU_IRQ_CTRL.GERROR_IRQEN once applied.
        GERROR_IRQEN OFFSET(0) NUMBITS(1) []
    ]
}

/// SMMU_IRQ_CTRLACK register, read-only.
pub type IrqCtrlAckReg = ReadOnly<u32, IRQ_CTRLACK::Register>;

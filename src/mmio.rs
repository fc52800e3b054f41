//! §4.1 MMIO & polling primitive.
//!
//! Typed register access is `tock_registers`' job (the `Readable`/
//! `Writeable` traits on the fields generated by
//! `tock_registers::register_structs!` in [`crate::SMMUv3Regs`]); this
//! module supplies only the one piece `tock_registers` doesn't: the
//! bounded poll used everywhere the SMMU requires software to observe a
//! hardware acknowledgement (CR0ACK, IRQ_CTRLACK, GBPA.UPDATE, CONS).

use tock_registers::interfaces::Readable;

use crate::error::{Result, SmmuError};
use crate::hal::SmmuHal;

/// The bound used by every poll loop in this driver: 10 reads, 10 µs
/// apart, i.e. up to 100 µs total. See §9's open question about this
/// being hard-coded rather than configurable.
pub const POLL_ITERATIONS: u32 = 10;
/// Spacing between polls, in microseconds.
pub const POLL_INTERVAL_US: u32 = 10;

/// Poll `reg` up to [`POLL_ITERATIONS`] times, [`POLL_INTERVAL_US`]
/// apart, until `(value & mask) == expected`. Returns
/// [`SmmuError::Timeout`] if the bound is reached without a match.
pub fn poll_register<H, R>(reg: &R, mask: u32, expected: u32, what: &'static str) -> Result<()>
where
    H: SmmuHal,
    R: Readable<T = u32>,
{
    for i in 0..POLL_ITERATIONS {
        if reg.get() & mask == expected {
            return Ok(());
        }
        if i + 1 < POLL_ITERATIONS {
            H::delay_us(POLL_INTERVAL_US);
        }
    }
    Err(SmmuError::Timeout(what))
}

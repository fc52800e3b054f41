//! The closed error taxonomy shared by every fallible operation in this
//! crate. See §7 of the driver specification.

/// Every primitive in this crate either succeeds or fails with one of
/// these kinds. There is no richer error type: the driver runs in a
/// pre-boot environment where a stack trace is not actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SmmuError {
    /// The caller violated a precondition: a null pointer, a zero
    /// length, page-table flags above bit 11, a physical address of
    /// zero, or an access-bit combination outside READ/WRITE.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A page or pool allocation request returned `None`. Any
    /// page-table state already written is left in place; it is still
    /// a valid (if partial) tree.
    #[error("out of resources while {0}")]
    OutOfResources(&'static str),

    /// A bounded poll loop (CR0ACK, IRQ_CTRLACK, GBPA.UPDATE, CONS, or
    /// command-queue drain) never observed the expected value.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// `GERROR` was non-zero after enabling the SMMU. Fatal: the
    /// caller must tear the driver down.
    #[error("device error: GERROR=0x{gerror:x}")]
    DeviceError {
        /// The raw `GERROR` register value observed.
        gerror: u32,
    },

    /// The platform configuration descriptor's version does not match
    /// the version this driver was built against. Fatal: the driver
    /// never installs the DMA-mapping callbacks.
    #[error(
        "incompatible SMMU_CONFIG version: expected {expected_major}.{expected_minor}, got {got_major}.{got_minor}"
    )]
    IncompatibleVersion {
        /// Version this driver requires.
        expected_major: u32,
        /// Version this driver requires.
        expected_minor: u32,
        /// Version the platform actually supplied.
        got_major: u32,
        /// Version the platform actually supplied.
        got_minor: u32,
    },

    /// A required host service (the platform configuration descriptor,
    /// the ACPI table host) was not present. Fatal.
    #[error("required host service not found: {0}")]
    NotFound(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SmmuError>;

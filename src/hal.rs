//! The low-level, platform-owned primitives this driver is built on top
//! of. Every side effect that is not a register access or a memory write
//! into driver-owned structures goes through [`SmmuHal`]: page
//! allocation, the microsecond delay used by the bounded poll, and the
//! data synchronisation barrier. None of these are implemented in this
//! crate — see §1 of the specification for why they are out of scope.

use memory_addr::{PhysAddr, VirtAddr};

/// The platform-supplied services this driver calls out to. A single
/// implementation is instantiated once per boot and threaded through
/// every `Smmu<H>` as a type parameter, the same way
/// `bullhh_smmuv3::hal::PagingHandler` threads its host through
/// `SMMUv3<H>`.
pub trait SmmuHal: Sized {
    /// Allocate `num_pages` contiguous, zeroed 4 KiB physical pages.
    /// Returns `None` on exhaustion; callers report this as
    /// [`crate::error::SmmuError::OutOfResources`].
    fn alloc_pages(num_pages: usize) -> Option<PhysAddr>;

    /// Free physical pages previously returned by [`Self::alloc_pages`].
    fn dealloc_pages(paddr: PhysAddr, num_pages: usize);

    /// Returns a virtual address through which `paddr` can be read or
    /// written directly. Used to access page-table nodes, the stream
    /// table, and queue rings without a separate MMU mapping step.
    fn phys_to_virt(paddr: PhysAddr) -> VirtAddr;

    /// Busy-wait for approximately `us` microseconds.
    fn delay_us(us: u32);

    /// Issue a data synchronisation barrier: every preceding write to
    /// memory this driver owns must be visible to the SMMU's table
    /// walker before this call returns, and every preceding MMIO write
    /// must have completed.
    fn barrier();
}

//! The DMA mapping facade (§4.6): `Map`/`Unmap`/`SetAttribute`/
//! `AllocateBuffer`/`FreeBuffer`. Absent from the teacher entirely (its
//! only device-facing entry point is `add_device`, a single-STE
//! convenience wrapper with no page-table interaction); grounded instead
//! in `ArmPkg/Drivers/SmmuDxe/IoMmu.c`'s `IoMmuMap`/`IoMmuUnmap`/
//! `IoMmuSetAttribute`/`IoMmuAllocateBuffer`/`IoMmuFreeBuffer`, expressed
//! over [`crate::page_table::PageTable`] and [`crate::queue::Queue`]
//! instead of a raw EDK II protocol.

use memory_addr::PhysAddr;

use crate::error::{Result, SmmuError};
use crate::hal::SmmuHal;
use crate::page_table::{
    PageTable, PAGE_TABLE_ACCESS_FLAG, PAGE_TABLE_DESCRIPTOR, PAGE_TABLE_READ_BIT,
    PAGE_TABLE_WRITE_BIT,
};
use crate::queue::{Cmd, Queue, QueueRegisters};

/// `EDKII_IOMMU_ACCESS_READ`.
pub const ACCESS_READ: u64 = 1 << 0;
/// `EDKII_IOMMU_ACCESS_WRITE`.
pub const ACCESS_WRITE: u64 = 1 << 1;

/// An opaque mapping handle, as returned by [`map`] and consumed by
/// [`unmap`]/[`set_attribute`]. Identity-mapped, so `device_addr` always
/// equals `host_addr`.
///
/// **[EXPANDED]** beyond the teacher/original `IOMMU_MAP_INFO`: also
/// records the page-table flags installed at `Map` time, so `Unmap` and
/// `SetAttribute` never need to recompute `ACCESS_FLAG | DESCRIPTOR`.
#[derive(Clone, Copy, Debug)]
pub struct IommuMapInfo {
    pub bytes: usize,
    pub device_addr: usize,
    pub host_addr: usize,
    pub flags: u64,
}

/// Map `bytes` starting at `host_addr` for device access, per §4.6.
///
/// Rejects a null host address or a zero length (mirrors
/// `IoMmuMap`'s parameter check); the page-table engine itself rejects a
/// zero *physical* address, but `host_addr == 0` is caught here first so
/// the error names the DMA-facing parameter.
pub fn map<H: SmmuHal>(root: PhysAddr, host_addr: usize, bytes: usize) -> Result<IommuMapInfo> {
    if host_addr == 0 || bytes == 0 {
        return Err(SmmuError::InvalidParameter("map: null address or zero length"));
    }

    let flags = PAGE_TABLE_ACCESS_FLAG | PAGE_TABLE_DESCRIPTOR;
    PageTable::<H>::update_page_table(root, host_addr, bytes, flags, true, false)?;

    debug!("mapped host=0x{:x} bytes=0x{:x}", host_addr, bytes);

    Ok(IommuMapInfo {
        bytes,
        device_addr: host_addr,
        host_addr,
        flags,
    })
}

/// Unmap a mapping returned by [`map`], per §4.6: clear VALID on every
/// covered leaf, then invalidate the TLB and drain the invalidation with
/// `TLBI_NSNH_ALL`, `TLBI_EL2_ALL`, `CMD_SYNC` in that order (matching
/// `IoMmuUnmap`).
pub fn unmap<H: SmmuHal, R: QueueRegisters>(
    root: PhysAddr,
    cmdq: &mut Queue<H, Cmd>,
    cmdq_regs: &R,
    mapping: &IommuMapInfo,
) -> Result<()> {
    PageTable::<H>::update_page_table(root, mapping.host_addr, mapping.bytes, 0, false, false)?;

    cmdq.send_command(cmdq_regs, Cmd::cmd_tlbi_nsnh_all())?;
    cmdq.send_command(cmdq_regs, Cmd::cmd_tlbi_el2_all())?;
    cmdq.send_command(cmdq_regs, Cmd::cmd_sync())?;

    debug!(
        "unmapped host=0x{:x} bytes=0x{:x}",
        mapping.host_addr, mapping.bytes
    );
    Ok(())
}

/// Grant or revoke R/W access on an existing mapping, per §4.6: VALID
/// and the physical address are never touched (mirrors `IoMmuSetAttribute`
/// / `PAGE_TABLE_READ_WRITE_FROM_IOMMU_ACCESS`).
pub fn set_attribute<H: SmmuHal>(
    root: PhysAddr,
    mapping: &IommuMapInfo,
    access_bits: u64,
) -> Result<()> {
    if access_bits & !(ACCESS_READ | ACCESS_WRITE) != 0 {
        return Err(SmmuError::InvalidParameter("set_attribute: access bits outside READ|WRITE"));
    }

    let mut flags = 0u64;
    if access_bits & ACCESS_READ != 0 {
        flags |= PAGE_TABLE_READ_BIT;
    }
    if access_bits & ACCESS_WRITE != 0 {
        flags |= PAGE_TABLE_WRITE_BIT;
    }

    PageTable::<H>::update_page_table(root, mapping.host_addr, mapping.bytes, flags, false, true)
}

/// Thin wrapper over [`SmmuHal::alloc_pages`]: no SMMU state changes, per
/// §4.6 (mirrors `IoMmuAllocateBuffer`).
pub fn allocate_buffer<H: SmmuHal>(pages: usize) -> Result<PhysAddr> {
    H::alloc_pages(pages).ok_or(SmmuError::OutOfResources("allocating DMA buffer"))
}

/// Reverse of [`allocate_buffer`] (mirrors `IoMmuFreeBuffer`).
pub fn free_buffer<H: SmmuHal>(host_addr: PhysAddr, pages: usize) {
    H::dealloc_pages(host_addr, pages);
}

#[cfg(test)]
mod test {
    use core::cell::Cell;

    use memory_addr::{pa, va, PhysAddr, VirtAddr, PAGE_SIZE_4K};

    use super::*;

    const POOL_PAGES: usize = 16;
    static mut POOL: [[u8; PAGE_SIZE_4K]; POOL_PAGES] = [[0; PAGE_SIZE_4K]; POOL_PAGES];
    static mut NEXT: usize = 0;

    struct DummyHal;

    impl SmmuHal for DummyHal {
        fn alloc_pages(num_pages: usize) -> Option<PhysAddr> {
            unsafe {
                if NEXT + num_pages > POOL_PAGES {
                    return None;
                }
                let p = pa!(core::ptr::addr_of_mut!(POOL[NEXT]) as usize);
                NEXT += num_pages;
                Some(p)
            }
        }
        fn dealloc_pages(_paddr: PhysAddr, _num_pages: usize) {}
        fn phys_to_virt(paddr: PhysAddr) -> VirtAddr {
            va!(paddr.as_usize())
        }
        fn delay_us(_us: u32) {}
        fn barrier() {}
    }

    fn reset() {
        unsafe {
            NEXT = 0;
            for page in POOL.iter_mut() {
                page.fill(0);
            }
        }
    }

    struct DummyRegs {
        prod: Cell<u32>,
        cons: Cell<u32>,
    }

    impl QueueRegisters for DummyRegs {
        fn read_prod(&self) -> u32 {
            self.prod.get()
        }
        fn write_prod(&self, v: u32) {
            self.prod.set(v);
            // Simulate hardware draining the command instantly.
            self.cons.set(v);
        }
        fn read_cons(&self) -> u32 {
            self.cons.get()
        }
        fn write_cons(&self, v: u32) {
            self.cons.set(v);
        }
    }

    fn leaf_of(root: PhysAddr, virt_addr: usize) -> u64 {
        let mut table_pa = root;
        for level in 0..3 {
            let idx = (virt_addr >> (12 + 9 * (3 - level))) & 0x1FF;
            let entries = unsafe {
                &*(DummyHal::phys_to_virt(table_pa).as_usize() as *const [u64; 512])
            };
            table_pa = pa!((entries[idx] & !0xFFF) as usize);
        }
        let idx = (virt_addr >> 12) & 0x1FF;
        let entries =
            unsafe { &*(DummyHal::phys_to_virt(table_pa).as_usize() as *const [u64; 512]) };
        entries[idx]
    }

    #[test]
    fn map_then_unmap_clears_valid() {
        reset();
        let root = PageTable::<DummyHal>::alloc_zeroed().unwrap();
        let info = map::<DummyHal>(root, 0x1_0000, 0x2000).unwrap();
        assert_eq!(info.device_addr, 0x1_0000);
        assert_eq!(leaf_of(root, 0x1_0000) & 0x1, 0x1);
        assert_eq!(leaf_of(root, 0x1_1000) & 0x1, 0x1);

        let mut cmdq = Queue::<DummyHal, Cmd>::uninit();
        cmdq.init(4).unwrap();
        let regs = DummyRegs { prod: Cell::new(0), cons: Cell::new(0) };
        unmap(root, &mut cmdq, &regs, &info).unwrap();

        assert_eq!(leaf_of(root, 0x1_0000) & 0x1, 0);
        assert_eq!(leaf_of(root, 0x1_1000) & 0x1, 0);
    }

    #[test]
    fn map_rejects_null_host_address() {
        reset();
        let root = PageTable::<DummyHal>::alloc_zeroed().unwrap();
        let err = map::<DummyHal>(root, 0, 0x1000).unwrap_err();
        assert_eq!(err, SmmuError::InvalidParameter("map: null address or zero length"));
    }

    #[test]
    fn set_attribute_transitions_never_touch_valid() {
        reset();
        let root = PageTable::<DummyHal>::alloc_zeroed().unwrap();
        let info = map::<DummyHal>(root, 0x3000, 0x1000).unwrap();

        set_attribute::<DummyHal>(root, &info, ACCESS_READ).unwrap();
        let leaf = leaf_of(root, 0x3000);
        assert_eq!(leaf & PAGE_TABLE_READ_BIT, PAGE_TABLE_READ_BIT);
        assert_eq!(leaf & PAGE_TABLE_WRITE_BIT, 0);
        assert_eq!(leaf & 0x1, 0x1);

        set_attribute::<DummyHal>(root, &info, ACCESS_READ | ACCESS_WRITE).unwrap();
        let leaf = leaf_of(root, 0x3000);
        assert_eq!(leaf & PAGE_TABLE_READ_BIT, PAGE_TABLE_READ_BIT);
        assert_eq!(leaf & PAGE_TABLE_WRITE_BIT, PAGE_TABLE_WRITE_BIT);

        set_attribute::<DummyHal>(root, &info, 0).unwrap();
        let leaf = leaf_of(root, 0x3000);
        assert_eq!(leaf & (PAGE_TABLE_READ_BIT | PAGE_TABLE_WRITE_BIT), 0);
        assert_eq!(leaf & 0x1, 0x1);
    }

    #[test]
    fn set_attribute_rejects_bits_outside_read_write() {
        reset();
        let root = PageTable::<DummyHal>::alloc_zeroed().unwrap();
        let info = map::<DummyHal>(root, 0x4000, 0x1000).unwrap();
        let err = set_attribute::<DummyHal>(root, &info, 1 << 5).unwrap_err();
        assert_eq!(
            err,
            SmmuError::InvalidParameter("set_attribute: access bits outside READ|WRITE")
        );
    }

    #[test]
    fn allocate_then_free_buffer_roundtrips() {
        reset();
        let addr = allocate_buffer::<DummyHal>(1).unwrap();
        free_buffer::<DummyHal>(addr, 1);
    }
}

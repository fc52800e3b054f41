//! ARM System Memory Management Unit (SMMU) v3 pre-boot firmware driver
//! written in Rust: Stage-2-only identity translation shared by every
//! StreamID, brought up once per boot from a platform-supplied IORT
//! configuration blob.

#![no_std]

#[macro_use]
extern crate log;

use core::ptr::NonNull;

use memory_addr::PhysAddr;
use tock_registers::interfaces::Readable;
use tock_registers::register_structs;
use tock_registers::registers::{ReadOnly, ReadWrite};

mod bringup;
mod config;
mod error;
mod hal;
mod iort;
mod mapping;
mod mmio;
mod page_table;
mod queue;
mod regs;
mod stream_table;

pub use config::{
    IdMapping, IoRemappingStructure, ItsNode, RcNode, SmmuConfig, SmmuV3Node,
    CURRENT_SMMU_CONFIG_VERSION_MAJOR, CURRENT_SMMU_CONFIG_VERSION_MINOR,
};
pub use error::{Result, SmmuError};
pub use hal::SmmuHal;
pub use iort::{AcpiTableHost, DmaProtocolHost, IORT_TABLE_MAX_LEN};
pub use mapping::{IommuMapInfo, ACCESS_READ, ACCESS_WRITE};
pub use regs::*;

pub use queue::{Cmd, Event};

use bringup::{CmdQRegs, EvtQRegs};
use queue::Queue;
use stream_table::LinearStreamTable;

register_structs! {
    /// Chapter 6. Memory map and registers 6.2.
    /// SMMU registers occupy two consecutive 64KB pages starting from an at least 64KB-aligned boundary.
    /// The following registers are accessible from the SMMU page 0 and page 1 region.
    /// - 0x00000-0x0FFFF SMMU registers, Page 0
    /// - 0x10000-0x1FFFF SMMU registers, Page 1
    #[allow(non_snake_case)]
    pub SMMUv3Regs  {
        (0x0000 => IDR0: IDR0Reg),
        (0x0004 => IDR1: IDR1Reg),
        (0x0008 => IDR2: ReadOnly<u32>),
        (0x000C => IDR3: ReadOnly<u32>),
        (0x0010 => IDR4: ReadOnly<u32>),
        (0x0014 => IDR5: IDR5Reg),
        (0x0018 => IIDR: ReadOnly<u32>),
        (0x001C => AIDR: AIDRReg),
        (0x0020 => CR0: Cr0Reg),
        (0x0024 => CR0ACK: Cr0AckReg),
        (0x0028 => CR1: Cr1Reg),
        (0x002c => CR2: Cr2Reg),
        (0x0030 => _reserved0),
        (0x0044 => GBPA: GbpaReg),
        (0x0048 => _reserved0b),
        (0x0050 => IRQ_CTRL: IrqCtrlReg),
        (0x0054 => IRQ_CTRLACK: IrqCtrlAckReg),
        (0x0058 => _reserved1),
        (0x0060 => GERROR: GerrorReg),
        (0x0064 => GERRORN: GerrorNReg),
        (0x0068 => GERROR_IRQ_CFG0: ReadWrite<u64>),
        (0x0070 => _reserved2),
        (0x0080 => STRTAB_BASE: StrtabBaseReg),
        (0x0088 => STRTAB_BASE_CFG: StrtabBaseCfgReg),
        (0x008c => _reserved3),
        (0x0090 => CMDQ_BASE: CmdQBaseReg),
        (0x0098 => CMDQ_PROD: CmdQProdReg),
        (0x009c => CMDQ_CONS: CmdQConsReg),
        (0x00a0 => EVENTQ_BASE: EventQBaseReg),
        (0x00a8 => _reserved4),
        (0x00b0 => EVENTQ_IRQ_CFG0: ReadWrite<u64>),
        (0x00b8 => EVENTQ_IRQ_CFG1: ReadWrite<u32>),
        (0x00bc => EVENTQ_IRQ_CFG2: ReadWrite<u32>),
        (0x00c0 => _reserved5),
        (0x100a8 => EVENTQ_PROD: EventQProdReg),
        (0x100ac => EVENTQ_CONS: EventQConsReg),
        (0x100b0 => _reserved6),
        (0x20000 => @END),
    }
}

/// Stage-2-only identity-translation SMMUv3 driver: a linear stream
/// table whose every entry shares one Stage-2 page table, brought up
/// once per boot from a platform [`SmmuConfig`] and torn down either on
/// bring-up failure or explicitly via [`Smmu::exit_boot`].
pub struct Smmu<H: SmmuHal> {
    base: NonNull<SMMUv3Regs>,
    stream_table: LinearStreamTable<H>,
    page_table_root: PhysAddr,
    cmdq: Queue<H, Cmd>,
    evtq: Queue<H, Event>,
    vmid: u16,
}

unsafe impl<H: SmmuHal> Send for Smmu<H> {}
unsafe impl<H: SmmuHal> Sync for Smmu<H> {}

impl<H: SmmuHal> Smmu<H> {
    /// Run the §4.5 bring-up sequence against the SMMUv3 register page
    /// pair at `base`, using `config` to shape the shared Stage-2 STE
    /// template. On success, the SMMU is enabled and every StreamID up
    /// to the platform's ID-map is translating identity Stage-2 through
    /// a freshly built page table. On failure, every resource bring-up
    /// allocated has already been freed and the SMMU is left aborting
    /// (see [`bringup::bring_up`]'s rollback).
    pub fn bring_up(base: *mut u8, config: &SmmuConfig) -> Result<Self> {
        let base: NonNull<SMMUv3Regs> = NonNull::new(base)
            .ok_or(SmmuError::InvalidParameter("bring_up: null MMIO base"))?
            .cast();
        let regs = unsafe { base.as_ref() };

        let guard = bringup::bring_up::<H>(regs, config)?;
        let vmid = guard.vmid();
        let page_table_root = guard.page_table_root();
        let parts = guard.disarm();

        info!(
            "SMMUv3 {} enabled: vmid={} page_table_root={:?}",
            Self::version_of(regs),
            vmid,
            page_table_root
        );

        Ok(Self {
            base,
            stream_table: parts.stream_table,
            page_table_root,
            cmdq: parts.cmdq,
            evtq: parts.evtq,
            vmid: parts.vmid,
        })
    }

    /// Get the SMMUv3 registers.
    pub const fn regs(&self) -> &SMMUv3Regs {
        unsafe { self.base.as_ref() }
    }

    fn version_of(regs: &SMMUv3Regs) -> &'static str {
        match regs.AIDR.read_as_enum(AIDR::ArchMinorRev) {
            Some(AIDR::ArchMinorRev::Value::SMMUv3_0) => "SMMUv3.0",
            Some(AIDR::ArchMinorRev::Value::SMMUv3_1) => "SMMUv3.1",
            Some(AIDR::ArchMinorRev::Value::SMMUv3_2) => "SMMUv3.2",
            Some(AIDR::ArchMinorRev::Value::SMMUv3_3) => "SMMUv3.3",
            Some(AIDR::ArchMinorRev::Value::SMMUv3_4) => "SMMUv3.4",
            _ => "Unknown",
        }
    }

    /// Get the SMMUv3 version.
    pub fn version(&self) -> &'static str {
        Self::version_of(self.regs())
    }

    /// The physical root of the shared Stage-2 page table.
    pub fn page_table_root(&self) -> PhysAddr {
        self.page_table_root
    }

    /// The VMID every STE's S2VMID field carries.
    pub fn vmid(&self) -> u16 {
        self.vmid
    }

    /// Map `bytes` at `host_addr` for device access. See
    /// [`mapping::map`].
    pub fn map(&mut self, host_addr: usize, bytes: usize) -> Result<IommuMapInfo> {
        let result = mapping::map::<H>(self.page_table_root, host_addr, bytes);
        self.log_errors();
        result
    }

    /// Unmap a mapping returned by [`Self::map`]. See
    /// [`mapping::unmap`].
    pub fn unmap(&mut self, info: &IommuMapInfo) -> Result<()> {
        let cmdq_regs = CmdQRegs(self.regs());
        let result = mapping::unmap::<H, _>(self.page_table_root, &mut self.cmdq, &cmdq_regs, info);
        self.log_errors();
        result
    }

    /// Grant or revoke R/W access on an existing mapping. See
    /// [`mapping::set_attribute`].
    pub fn set_attribute(&mut self, info: &IommuMapInfo, access_bits: u64) -> Result<()> {
        let result = mapping::set_attribute::<H>(self.page_table_root, info, access_bits);
        self.log_errors();
        result
    }

    /// Drain the event queue and log a non-zero GERROR, discarding both:
    /// called at the tail of every map/unmap/set-attribute so faults
    /// surface in the log without ever changing the operation's result
    /// (mirrors the original's `SmmuV3LogErrors`).
    fn log_errors(&mut self) {
        let evtq_regs = EvtQRegs(self.regs());
        while let Some(event) = self.evtq.consume_event(&evtq_regs) {
            warn!(
                "SMMUv3 event: type=0x{:02x} raw={:x?}",
                event.event_type(),
                event.raw()
            );
        }
        let gerror = self.regs().GERROR.get();
        if gerror != 0 {
            error!("SMMUv3 GERROR=0x{:x}", gerror);
        }
    }

    /// Allocate a DMA buffer. See [`mapping::allocate_buffer`].
    pub fn allocate_buffer(&self, pages: usize) -> Result<PhysAddr> {
        mapping::allocate_buffer::<H>(pages)
    }

    /// Free a buffer returned by [`Self::allocate_buffer`]. See
    /// [`mapping::free_buffer`].
    pub fn free_buffer(&self, host_addr: PhysAddr, pages: usize) {
        mapping::free_buffer::<H>(host_addr, pages)
    }

    /// Build and install the ACPI IORT table describing this
    /// configuration, then publish the DMA-mapping callback table so
    /// platform code (e.g. a PCI bus driver) can start calling
    /// [`Self::map`]/[`Self::unmap`]/etc.
    pub fn publish(
        &self,
        config: &SmmuConfig,
        acpi_host: &dyn AcpiTableHost,
        dma_host: &dyn DmaProtocolHost,
    ) -> Result<()> {
        let mut buf = [0u8; IORT_TABLE_MAX_LEN];
        let len = iort::build_iort_table(config, &mut buf)?;
        acpi_host.install_acpi_table(&buf[..len])?;
        dma_host.install_dma_protocol()
    }

    /// Drain a single pending fault event, if any. See
    /// [`queue::Queue::consume_event`].
    pub fn consume_event(&mut self) -> Option<Event> {
        let evtq_regs = EvtQRegs(self.regs());
        self.evtq.consume_event(&evtq_regs)
    }

    /// Hand the SMMU off to whatever runs after this boot stage:
    /// disable translation, then bypass (rather than abort) streams not
    /// covered by the stream table, since no software downstream of
    /// this call may have an SMMU driver installed yet.
    pub fn exit_boot(self) -> Result<()> {
        bringup::exit_boot::<H>(self.regs())
    }
}

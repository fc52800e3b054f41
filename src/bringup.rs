//! Bring-up/teardown orchestrator (§4.5): the 14-step sequence that
//! takes a freshly-reset SMMUv3 from disabled to a single Stage-2
//! identity-translation regime shared by every StreamID, plus the
//! reverse teardown and the exit-boot hook.
//!
//! Grounded in `bullhh-smmuv3::SMMUv3::init`/`enable`/`stream_table_init`
//! for register-sequencing style (read IDR1 queue-size fields, program
//! CMDQ_BASE/CMDQ_PROD/CMDQ_CONS, then loop CR0/CR0ACK to enable),
//! extended with the CR2/GBPA/IRQ_CTRL handling and the
//! CFGI_ALL/TLBI_NSNH_ALL/TLBI_EL2_ALL/CMD_SYNC drain the teacher's
//! narrower driver never performed.

use memory_addr::PhysAddr;
use tock_registers::interfaces::{Readable, ReadWriteable, Writeable};

use crate::config::SmmuConfig;
use crate::error::{Result, SmmuError};
use crate::hal::SmmuHal;
use crate::mmio::poll_register;
use crate::page_table::PageTable;
use crate::queue::{Cmd, Event, Queue, QueueRegisters};
use crate::regs::*;
use crate::stream_table::{LinearStreamTable, Stage2Attributes};
use crate::SMMUv3Regs;

/// S2VMID programmed into every STE: a single shared VMID, since this
/// driver only ever installs one Stage-2 identity template (§4.5).
const VMID: u16 = 1;

/// Binds [`Queue`]'s generic PROD/CONS access to the command queue's
/// pair of registers.
pub(crate) struct CmdQRegs<'a>(pub &'a SMMUv3Regs);

impl<'a> QueueRegisters for CmdQRegs<'a> {
    fn read_prod(&self) -> u32 {
        self.0.CMDQ_PROD.read(CMDQ_PROD::WR)
    }
    fn write_prod(&self, value: u32) {
        self.0.CMDQ_PROD.write(CMDQ_PROD::WR.val(value));
    }
    fn read_cons(&self) -> u32 {
        self.0.CMDQ_CONS.read(CMDQ_CONS::RD)
    }
    fn write_cons(&self, value: u32) {
        self.0.CMDQ_CONS.write(CMDQ_CONS::RD.val(value));
    }
}

/// Binds [`Queue`]'s generic PROD/CONS access to the event queue's pair
/// of (page-1) registers.
pub(crate) struct EvtQRegs<'a>(pub &'a SMMUv3Regs);

impl<'a> QueueRegisters for EvtQRegs<'a> {
    fn read_prod(&self) -> u32 {
        self.0.EVENTQ_PROD.read(EVENTQ_PROD::WR)
    }
    fn write_prod(&self, value: u32) {
        self.0.EVENTQ_PROD.write(EVENTQ_PROD::WR.val(value));
    }
    fn read_cons(&self) -> u32 {
        self.0.EVENTQ_CONS.read(EVENTQ_CONS::RD)
    }
    fn write_cons(&self, value: u32) {
        self.0.EVENTQ_CONS.write(EVENTQ_CONS::RD.val(value));
    }
}

/// Smallest `sid_bits` such that `1 << sid_bits > max_sid`, i.e. enough
/// linear stream-table entries to address every StreamID up to and
/// including `max_sid`.
fn sid_bits_for_max_sid(max_sid: u32) -> u32 {
    if max_sid == 0 {
        0
    } else {
        32 - max_sid.leading_zeros()
    }
}

/// Decode `SMMU_IDR5.OAS` into `(width_bits, clamped_encoding)`, clamping
/// any output address size above 48 bits down to 48 (this driver's
/// 48-bit non-goal boundary), per §4.5's STE template rule.
fn oas_width_and_encoding(oas_raw: u32) -> (u32, u64) {
    match oas_raw {
        0 => (32, 0),
        1 => (36, 1),
        2 => (40, 2),
        3 => (42, 3),
        4 => (44, 4),
        _ => (48, 5),
    }
}

/// Disable translation and queue processing, then wait for CR0ACK to
/// confirm. Step 1 of bring-up; also the first step of teardown and of
/// the exit-boot hook.
fn disable_translation<H: SmmuHal>(regs: &SMMUv3Regs) -> Result<()> {
    regs.CR0.set(0);
    poll_register::<H, _>(&regs.CR0ACK, 0b1111, 0, "CR0ACK to clear on disable")
}

/// Drive global abort: set GBPA.ABORT and GBPA.UPDATE, then wait for
/// UPDATE to clear. Used on the teardown path; errors are not
/// actionable there; the caller is already unwinding.
fn global_abort<H: SmmuHal>(regs: &SMMUv3Regs) {
    regs.GBPA.write(GBPA::UPDATE.val(1) + GBPA::ABORT::Abort);
    let _ = poll_register::<H, _>(&regs.GBPA, 1 << 31, 0, "GBPA.UPDATE to clear (abort)");
}

/// Owns whatever bring-up has allocated so far; frees it all on `Drop`
/// unless every field has been taken. This is what makes bring-up's
/// early-return-on-error path (`?`) a rollback instead of a leak.
struct Partial<H: SmmuHal> {
    stream_table: Option<LinearStreamTable<H>>,
    page_table_root: Option<PhysAddr>,
    cmdq: Option<Queue<H, Cmd>>,
    evtq: Option<Queue<H, Event>>,
}

impl<H: SmmuHal> Partial<H> {
    fn new() -> Self {
        Self {
            stream_table: None,
            page_table_root: None,
            cmdq: None,
            evtq: None,
        }
    }
}

impl<H: SmmuHal> Drop for Partial<H> {
    fn drop(&mut self) {
        if let Some(cmdq) = self.cmdq.take() {
            cmdq.free();
        }
        if let Some(evtq) = self.evtq.take() {
            evtq.free();
        }
        if let Some(stream_table) = self.stream_table.take() {
            stream_table.free();
        }
        if let Some(root) = self.page_table_root.take() {
            PageTable::<H>::teardown(root);
            H::dealloc_pages(root, 1);
        }
    }
}

/// Everything [`bring_up`] allocated, handed out by [`BringupGuard::disarm`]
/// once bring-up has fully succeeded.
pub struct BringupParts<H: SmmuHal> {
    pub stream_table: LinearStreamTable<H>,
    pub page_table_root: PhysAddr,
    pub cmdq: Queue<H, Cmd>,
    pub evtq: Queue<H, Event>,
    pub vmid: u16,
}

/// RAII handle over a single bring-up attempt. On `Drop`, unless
/// [`Self::disarm`] has already run, disables translation, drives
/// global abort, and frees every resource bring-up allocated — the
/// "rolling back on first error" behaviour required by §4.5, expressed
/// the same way whether the failure is bring-up's own `?` or the
/// caller discarding a successfully-built guard without disarming it.
pub struct BringupGuard<'a, H: SmmuHal> {
    regs: &'a SMMUv3Regs,
    stream_table: LinearStreamTable<H>,
    page_table_root: PhysAddr,
    cmdq: Queue<H, Cmd>,
    evtq: Queue<H, Event>,
    vmid: u16,
    disarmed: bool,
}

impl<'a, H: SmmuHal> BringupGuard<'a, H> {
    pub fn page_table_root(&self) -> PhysAddr {
        self.page_table_root
    }

    pub fn vmid(&self) -> u16 {
        self.vmid
    }

    pub(crate) fn cmdq_regs(&self) -> CmdQRegs<'a> {
        CmdQRegs(self.regs)
    }

    pub(crate) fn evtq_regs(&self) -> EvtQRegs<'a> {
        EvtQRegs(self.regs)
    }

    /// Take ownership of everything this guard owns and disable the
    /// rollback `Drop` would otherwise perform. Called once bring-up
    /// has fully succeeded and the caller (`Smmu::bring_up`) is ready to
    /// own these resources for the lifetime of the driver.
    pub fn disarm(mut self) -> BringupParts<H> {
        self.disarmed = true;
        BringupParts {
            stream_table: core::mem::replace(&mut self.stream_table, LinearStreamTable::uninit()),
            page_table_root: self.page_table_root,
            cmdq: core::mem::replace(&mut self.cmdq, Queue::uninit()),
            evtq: core::mem::replace(&mut self.evtq, Queue::uninit()),
            vmid: self.vmid,
        }
    }
}

impl<'a, H: SmmuHal> Drop for BringupGuard<'a, H> {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        let _ = disable_translation::<H>(self.regs);
        global_abort::<H>(self.regs);
        self.cmdq.free();
        self.evtq.free();
        self.stream_table.free();
        PageTable::<H>::teardown(self.page_table_root);
        H::dealloc_pages(self.page_table_root, 1);
    }
}

/// Run the full 14-step bring-up sequence described in §4.5 against
/// `regs`, using `config` to shape the STE template and pick VMID/SID
/// span. On success, returns a [`BringupGuard`] owning every resource
/// allocated; on failure, everything already allocated has been freed
/// before the error is returned.
pub fn bring_up<H: SmmuHal>(regs: &SMMUv3Regs, config: &SmmuConfig) -> Result<BringupGuard<'_, H>> {
    config.check_version()?;

    // Step 1: disable translation.
    disable_translation::<H>(regs)?;

    // Step 2: disable IRQs; best-effort clear of any latched GERROR.
    regs.IRQ_CTRL.set(0);
    poll_register::<H, _>(&regs.IRQ_CTRLACK, 0b111, 0, "IRQ_CTRLACK to clear")?;
    let latched = regs.GERROR.get();
    if latched != 0 {
        regs.GERRORN.set(latched);
    }

    let mut partial = Partial::<H>::new();

    // Step 3: allocate the linear stream table, sized off the Root
    // Complex's ID map.
    let rc = &config.config.rc_node;
    let max_sid = rc
        .id_mapping
        .output_base
        .saturating_add(rc.id_mapping.num_ids)
        .saturating_sub(1);
    let sid_bits = sid_bits_for_max_sid(max_sid);
    let mut stream_table = LinearStreamTable::<H>::uninit();
    stream_table.init(sid_bits)?;
    partial.stream_table = Some(stream_table);

    // Step 4: allocate the page-table root.
    let page_table_root = PageTable::<H>::alloc_zeroed()?;
    partial.page_table_root = Some(page_table_root);

    // Step 5: build the template STE and fill every slot with it.
    let protected_table_walk =
        regs.IDR0.read(IDR0::S1P) == 1 && regs.IDR0.read(IDR0::S2P) == 1;
    let (input_size, s2ps_encoded) = oas_width_and_encoding(regs.IDR5.read(IDR5::OAS));
    let attrs = Stage2Attributes {
        protected_table_walk,
        s2ps_encoded,
        input_size,
        coherent_table_walks: config.config.smmu_node.coherent_table_walks(),
        attr_types_overridable: regs.IDR1.read(IDR1::ATTR_TYPES_OVR) == 1,
        rc_cache_coherent: rc.cache_coherent(),
        rc_coherent_path_to_memory: rc.coherent_path_to_memory(),
        rc_device_attrs_cacheable_shareable: rc.device_attrs_cacheable_shareable(),
    };
    let cohac = attrs.coherent_table_walks;
    let stream_table_ref = partial.stream_table.as_ref().unwrap();
    for sid in 0..stream_table_ref.entry_count() {
        stream_table_ref.set_s2_identity_ste(sid, VMID, page_table_root, attrs);
    }

    // Step 6: allocate command/event queues.
    let cmdqs = u32::min(regs.IDR1.read(IDR1::CMDQS), 8);
    let eventqs = u32::min(regs.IDR1.read(IDR1::EVENTQS), 7);
    let mut cmdq = Queue::<H, Cmd>::uninit();
    cmdq.init(cmdqs)?;
    partial.cmdq = Some(cmdq);
    let mut evtq = Queue::<H, Event>::uninit();
    evtq.init(eventqs)?;
    partial.evtq = Some(evtq);

    // Step 7: program STRTAB_BASE(_CFG), CMDQ_BASE, EVENTQ_BASE, and
    // reset PROD/CONS for both queues.
    let cmdq_ref = partial.cmdq.as_ref().unwrap();
    let evtq_ref = partial.evtq.as_ref().unwrap();

    regs.STRTAB_BASE_CFG
        .write(STRTAB_BASE_CFG::FMT::Linear + STRTAB_BASE_CFG::LOG2SIZE.val(sid_bits));
    regs.STRTAB_BASE.write(
        (if cohac { STRTAB_BASE::RA::Enable } else { STRTAB_BASE::RA::Disable })
            + STRTAB_BASE::ADDR.val(stream_table_ref.base_addr().as_usize() as u64 >> 6),
    );

    regs.CMDQ_BASE.write(
        (if cohac { CMDQ_BASE::RA::ReadAllocate } else { CMDQ_BASE::RA::NoReadAllocate })
            + CMDQ_BASE::ADDR.val(cmdq_ref.phys_base_addr().as_usize() as u64 >> 5)
            + CMDQ_BASE::LOG2SIZE.val(cmdq_ref.log2_size() as u64),
    );
    regs.CMDQ_PROD.write(CMDQ_PROD::WR.val(cmdq_ref.prod_value()));
    regs.CMDQ_CONS.write(CMDQ_CONS::RD.val(cmdq_ref.cons_value()));

    regs.EVENTQ_BASE.write(
        (if cohac { EVENTQ_BASE::WA::WriteAllocate } else { EVENTQ_BASE::WA::NoWriteAllocate })
            + EVENTQ_BASE::ADDR.val(evtq_ref.phys_base_addr().as_usize() as u64 >> 5)
            + EVENTQ_BASE::LOG2SIZE.val(evtq_ref.log2_size() as u64),
    );
    regs.EVENTQ_PROD.write(EVENTQ_PROD::WR.val(evtq_ref.prod_value()));
    regs.EVENTQ_CONS.write(EVENTQ_CONS::RD.val(evtq_ref.cons_value()));

    // Step 8: enable IRQs (global-error + event-queue; PRI is a
    // non-goal and is left disabled).
    regs.IRQ_CTRL
        .write(IRQ_CTRL::GERROR_IRQEN::Enable + IRQ_CTRL::EVENTQ_IRQEN::Enable);
    poll_register::<H, _>(&regs.IRQ_CTRLACK, 0b101, 0b101, "IRQ_CTRLACK to enable")?;

    // Step 9: program CR1's queue-access attributes from COHAC; table
    // fields are left RES0 per §4.5 (only Queue* is specified).
    if cohac {
        regs.CR1.write(
            CR1::QUEUE_IC::WriteBackCacheable
                + CR1::QUEUE_OC::WriteBackCacheable
                + CR1::QUEUE_SH::InnerShareable,
        );
    } else {
        regs.CR1.write(
            CR1::QUEUE_IC::NonCacheable + CR1::QUEUE_OC::NonCacheable + CR1::QUEUE_SH::NonShareable,
        );
    }

    // Step 10: program CR2. PTM is set (SMMU does not participate in
    // broadcast TLB maintenance) exactly when IDR0.BTM is clear.
    let ptm: u32 = if regs.IDR0.read(IDR0::BTM) == 0 { 1 } else { 0 };
    regs.CR2
        .write(CR2::E2H::El2 + CR2::RECINVSID::Enable + CR2::PTM.val(ptm));

    // Step 11: enable the command/event queues and wait for CR0ACK.
    H::barrier();
    regs.CR0.write(CR0::CMDQEN::Enable + CR0::EVENTQEN::Enable);
    poll_register::<H, _>(&regs.CR0ACK, 0b1100, 0b1100, "CR0ACK CMDQEN/EVENTQEN")?;

    // Step 12: invalidate everything the SMMU might have cached from a
    // prior boot stage.
    {
        let cmdq_regs = CmdQRegs(regs);
        let cmdq_mut = partial.cmdq.as_mut().unwrap();
        cmdq_mut.send_command(&cmdq_regs, Cmd::cmd_cfgi_all())?;
        cmdq_mut.send_command(&cmdq_regs, Cmd::cmd_tlbi_nsnh_all())?;
        cmdq_mut.send_command(&cmdq_regs, Cmd::cmd_tlbi_el2_all())?;
        cmdq_mut.send_command(&cmdq_regs, Cmd::cmd_sync())?;
    }

    // Step 13: enable translation. ATS is a non-goal, so ATSCHK is
    // never set.
    H::barrier();
    regs.CR0.modify(CR0::SMMUEN::Enable);
    poll_register::<H, _>(&regs.CR0ACK, 0b1, 0b1, "CR0ACK SMMUEN")?;

    // Step 14: a non-zero GERROR after enable is a fatal device error.
    H::barrier();
    let gerror = regs.GERROR.get();
    if gerror != 0 {
        return Err(SmmuError::DeviceError { gerror });
    }

    let stream_table = partial.stream_table.take().unwrap();
    let page_table_root = partial.page_table_root.take().unwrap();
    let cmdq = partial.cmdq.take().unwrap();
    let evtq = partial.evtq.take().unwrap();

    Ok(BringupGuard {
        regs,
        stream_table,
        page_table_root,
        cmdq,
        evtq,
        vmid: VMID,
        disarmed: false,
    })
}

/// Disable translation then clear GBPA.ABORT (keeping GBPA.UPDATE set)
/// so in-flight streams bypass the SMMU rather than being aborted by
/// whatever inherits this hardware next (typically an OS that has not
/// loaded its own SMMU driver yet).
pub fn exit_boot<H: SmmuHal>(regs: &SMMUv3Regs) -> Result<()> {
    disable_translation::<H>(regs)?;
    regs.GBPA.write(GBPA::UPDATE.val(1) + GBPA::ABORT::Bypass);
    poll_register::<H, _>(&regs.GBPA, 1 << 31, 0, "GBPA.UPDATE to clear (exit-boot)")
}

#[cfg(test)]
mod test {
    use memory_addr::{pa, va, PhysAddr, VirtAddr, PAGE_SIZE_4K};

    use super::*;

    #[test]
    fn sid_bits_covers_max_sid() {
        assert_eq!(sid_bits_for_max_sid(0), 0);
        assert_eq!(sid_bits_for_max_sid(1), 1);
        assert_eq!(sid_bits_for_max_sid(127), 7);
        assert_eq!(sid_bits_for_max_sid(128), 8);
    }

    #[test]
    fn oas_encoding_clamps_above_48_bits() {
        assert_eq!(oas_width_and_encoding(0), (32, 0));
        assert_eq!(oas_width_and_encoding(4), (44, 4));
        assert_eq!(oas_width_and_encoding(5), (48, 5));
        assert_eq!(oas_width_and_encoding(6), (48, 5), "52-bit OAS must clamp to 48");
    }

    #[repr(align(8))]
    struct RegBuf([u8; 0x2_0000]);
    static mut REG_BUF: RegBuf = RegBuf([0; 0x2_0000]);

    fn fake_regs() -> &'static SMMUv3Regs {
        unsafe { &*(core::ptr::addr_of!(REG_BUF) as *const SMMUv3Regs) }
    }

    /// Bypass a register's typed read-only-ness to let the test harness
    /// simulate a hardware acknowledgement. Test-only.
    unsafe fn force_write_u32<T>(reg: &T, value: u32) {
        let ptr = reg as *const T as *mut u32;
        ptr.write_volatile(value);
    }

    #[test]
    fn cmdq_regs_adapter_round_trips_through_memory() {
        unsafe {
            REG_BUF = RegBuf([0; 0x2_0000]);
        }
        let adapter = CmdQRegs(fake_regs());
        adapter.write_prod(0x123);
        assert_eq!(adapter.read_prod(), 0x123);
        adapter.write_cons(0x45);
        assert_eq!(adapter.read_cons(), 0x45);
    }

    #[test]
    fn evtq_regs_adapter_round_trips_through_memory() {
        unsafe {
            REG_BUF = RegBuf([0; 0x2_0000]);
        }
        let adapter = EvtQRegs(fake_regs());
        adapter.write_prod(0x77);
        assert_eq!(adapter.read_prod(), 0x77);
        adapter.write_cons(0x11);
        assert_eq!(adapter.read_cons(), 0x11);
    }

    const POOL_PAGES: usize = 32;
    static mut POOL: [[u8; PAGE_SIZE_4K]; POOL_PAGES] = [[0; PAGE_SIZE_4K]; POOL_PAGES];
    static mut NEXT: usize = 0;

    struct TestHal;

    impl SmmuHal for TestHal {
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
        fn delay_us(_us: u32) {
            // Simulate hardware: CR0ACK mirrors CR0, and GBPA.UPDATE
            // clears the instant it is observed, the same way real
            // SMMUv3 hardware acknowledges a transition almost
            // immediately on an idle bus.
            let regs = fake_regs();
            unsafe {
                force_write_u32(&regs.CR0ACK, regs.CR0.get());
                force_write_u32(&regs.GBPA, regs.GBPA.get() & !(1u32 << 31));
            }
        }
        fn barrier() {}
    }

    fn reset() {
        unsafe {
            NEXT = 0;
            for page in POOL.iter_mut() {
                page.fill(0);
            }
            REG_BUF = RegBuf([0; 0x2_0000]);
        }
    }

    #[test]
    fn disable_translation_waits_for_cr0ack_to_clear() {
        reset();
        let regs = fake_regs();
        unsafe {
            force_write_u32(&regs.CR0, 0b1111);
            force_write_u32(&regs.CR0ACK, 0b1111);
        }
        assert!(disable_translation::<TestHal>(regs).is_ok());
        assert_eq!(regs.CR0ACK.get(), 0);
    }

    fn build_guard(regs: &'static SMMUv3Regs) -> BringupGuard<'static, TestHal> {
        let page_table_root = PageTable::<TestHal>::alloc_zeroed().unwrap();
        let mut stream_table = LinearStreamTable::<TestHal>::uninit();
        stream_table.init(1).unwrap();
        let mut cmdq = Queue::<TestHal, Cmd>::uninit();
        cmdq.init(1).unwrap();
        let mut evtq = Queue::<TestHal, Event>::uninit();
        evtq.init(1).unwrap();

        BringupGuard {
            regs,
            stream_table,
            page_table_root,
            cmdq,
            evtq,
            vmid: 7,
            disarmed: false,
        }
    }

    #[test]
    fn guard_drop_disables_translation_and_drives_global_abort() {
        reset();
        let regs = fake_regs();
        let guard = build_guard(regs);
        drop(guard);

        assert_eq!(regs.CR0.get() & 0b1111, 0, "translation must be disabled");
        assert_eq!(regs.GBPA.read(GBPA::ABORT), 1, "global abort must be driven");
        assert_eq!(regs.GBPA.read(GBPA::UPDATE), 0, "UPDATE must have been observed to clear");
    }

    #[test]
    fn disarm_transfers_ownership_without_teardown() {
        reset();
        let regs = fake_regs();
        let guard = build_guard(regs);
        let page_table_root = guard.page_table_root();
        let parts = guard.disarm();

        assert_eq!(parts.vmid, 7);
        assert_eq!(parts.page_table_root, page_table_root);
        // No rollback: CR0/GBPA are untouched since construction.
        assert_eq!(regs.CR0.get(), 0);
        assert_eq!(regs.GBPA.get(), 0);
    }

    #[test]
    fn exit_boot_clears_abort_but_keeps_bypassing() {
        reset();
        let regs = fake_regs();
        unsafe {
            force_write_u32(&regs.CR0, 0b1111);
            force_write_u32(&regs.CR0ACK, 0b1111);
        }
        assert!(exit_boot::<TestHal>(regs).is_ok());
        assert_eq!(regs.GBPA.read(GBPA::ABORT), 0, "exit-boot must bypass, not abort");
    }
}

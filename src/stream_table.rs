use core::marker::PhantomData;

use memory_addr::{pa, PhysAddr, PAGE_SIZE_4K};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::error::{Result, SmmuError};
use crate::hal::SmmuHal;

const STRTAB_STE_DWORDS_BITS: usize = 3;
const STRTAB_STE_DWORDS: usize = 1 << STRTAB_STE_DWORDS_BITS;
const STRTAB_STE_SIZE: usize = STRTAB_STE_DWORDS << 3;

register_bitfields! {u64,
    /// Stream Table Entry, word 0.
    pub STRTAB_STE_0 [
        /// V, bit [0]. Structure contents are valid.
        V OFFSET(0) NUMBITS(1) [],
        /// Config, bits [3:1]. Stream configuration.
        CFG OFFSET(1) NUMBITS(3) [
            AbortNoEvent = 0b000,
            BypassBypass = 0b100,
            BypassTranslate = 0b110
        ]
    ]
}

register_bitfields! {u64,
    /// Stream Table Entry, word 1.
    pub STRTAB_STE_1 [
        /// MemAttr, bits [99:96]. Only consulted when MTCFG is set.
        MEMATTR OFFSET(32) NUMBITS(4) [
            InnerOuterWriteBackCacheable = 0xF
        ],
        /// MTCFG, bit [100]. Override the incoming memory type with
        /// MEMATTR instead of passing it through.
        MTCFG OFFSET(36) NUMBITS(1) [],
        /// SHCFG, bits [109:108]. Shareability configuration.
        SHCFG OFFSET(44) NUMBITS(2) [
            NonShareable = 0b00,
            Incoming = 0b01,
            Outer = 0b10,
            Inner = 0b11
        ]
    ]
}

register_bitfields! {u64,
    /// Stream Table Entry, word 2.
    pub STRTAB_STE_2 [
        /// S2VMID, bits [143:128].
        S2VMID OFFSET(0) NUMBITS(16) [],
        /// S2T0SZ, bits [165:160]. Size of the IPA input region.
        S2T0SZ OFFSET(32) NUMBITS(6) [],
        /// S2SL0, bits [167:166]. Starting level of the Stage 2 walk.
        S2SL0 OFFSET(38) NUMBITS(2) [
            StartAtLevel0 = 0b10
        ],
        /// S2IR0, bits [169:168]. Inner cacheability of the table walk.
        S2IR0 OFFSET(40) NUMBITS(2) [
            NonCacheable = 0b00,
            WriteBackWriteAllocate = 0b01
        ],
        /// S2OR0, bits [171:170]. Outer cacheability of the table walk.
        S2OR0 OFFSET(42) NUMBITS(2) [
            NonCacheable = 0b00,
            WriteBackWriteAllocate = 0b01
        ],
        /// S2SH0, bits [173:172]. Shareability of the table walk.
        S2SH0 OFFSET(44) NUMBITS(2) [
            NonShareable = 0b00,
            Outer = 0b10,
            Inner = 0b11
        ],
        /// S2TG, bits [175:174]. Translation granule.
        S2TG OFFSET(46) NUMBITS(2) [
            Granule4KiB = 0b00
        ],
        /// S2PS, bits [178:176]. Output address size, same encoding as
        /// SMMU_IDR5.OAS.
        S2PS OFFSET(48) NUMBITS(3) [],
        /// S2AA64, bit [179]. VMSAv8-64 descriptor format.
        S2AA64 OFFSET(51) NUMBITS(1) [],
        /// S2PTW, bit [182]. Protected table walk.
        S2PTW OFFSET(54) NUMBITS(1) [],
        /// S2S, bit [185]. Stage 2 fault behaviour: stall.
        S2S OFFSET(57) NUMBITS(1) [],
        /// S2R, bit [186]. Stage 2 fault behaviour: record.
        S2R OFFSET(58) NUMBITS(1) []
    ]
}

register_bitfields! {u64,
    /// Stream Table Entry, word 3.
    pub STRTAB_STE_3 [
        /// S2TTB, bits [243:196]. Stage 2 translation table base,
        /// aligned down to its required granularity by this field's
        /// own offset.
        S2TTB OFFSET(4) NUMBITS(48) []
    ]
}

/// The handful of facts about the SMMU, the platform's IORT, and its
/// PCI root complex entry that shape the computed Stage-2 STE template:
/// capability bits read from IDR0/IDR1/IDR5, and the coherency knobs
/// carried in the SMMU_CONFIG blob (see [`crate::config`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct Stage2Attributes {
    /// IDR0.S1P && IDR0.S2P: whether a Stage 1 walk or CD fetch that
    /// lands on a Stage-2 Device mapping should be terminated
    /// (S2PTW).
    pub protected_table_walk: bool,
    /// IDR5.OAS, already clamped to 48 bits per this driver's 48-bit
    /// non-goal, and encoded the same way SMMU_IDR5.OAS is (0 = 32-bit
    /// ... 5 = 48-bit).
    pub s2ps_encoded: u64,
    /// Input address size in bits, i.e. `64 - S2T0SZ`. Equal to the
    /// decoded output address width for an identity mapping.
    pub input_size: u32,
    /// IORT SMMUv3 node Flags.COHAC_OVERRIDE: coherent table walks.
    pub coherent_table_walks: bool,
    /// IDR1.ATTR_TYPES_OVR: whether incoming memory attributes can be
    /// overridden at all.
    pub attr_types_overridable: bool,
    /// The root complex node's CacheCoherent == fully coherent.
    pub rc_cache_coherent: bool,
    /// The root complex node's MemoryAccessFlags.CPM (Coherent Path to
    /// Memory).
    pub rc_coherent_path_to_memory: bool,
    /// The root complex node's MemoryAccessFlags.DACS (Device
    /// Attributes Cacheable and Shareable) — when this is already true
    /// the incoming attributes need no override.
    pub rc_device_attrs_cacheable_shareable: bool,
}

#[allow(unused)]
pub struct StreamTableEntry([u64; STRTAB_STE_DWORDS]);

impl StreamTableEntry {
    pub fn bypass_entry() -> Self {
        let mut dw0 = LocalRegisterCopy::<u64, STRTAB_STE_0::Register>::new(0);
        dw0.write(STRTAB_STE_0::V.val(1) + STRTAB_STE_0::CFG::BypassBypass);

        let mut dw1 = LocalRegisterCopy::<u64, STRTAB_STE_1::Register>::new(0);
        dw1.write(STRTAB_STE_1::SHCFG::Incoming);

        Self([dw0.get(), dw1.get(), 0, 0, 0, 0, 0, 0])
    }

    /// Build the Stage-2-only, Stage-1-bypass STE template described in
    /// §4.5: every bit other than S2VMID/S2TTB is derived from
    /// `attrs`, not hardcoded, so the same template construction covers
    /// whatever OAS/coherency combination the platform reports.
    pub fn s2_identity_entry(vmid: u16, s2pt_base: PhysAddr, attrs: Stage2Attributes) -> Self {
        let mut dw0 = LocalRegisterCopy::<u64, STRTAB_STE_0::Register>::new(0);
        dw0.write(STRTAB_STE_0::V.val(1) + STRTAB_STE_0::CFG::BypassTranslate);

        let mut dw1 = LocalRegisterCopy::<u64, STRTAB_STE_1::Register>::new(0);
        dw1.write(STRTAB_STE_1::SHCFG::Incoming);
        if attrs.attr_types_overridable
            && attrs.rc_cache_coherent
            && attrs.rc_coherent_path_to_memory
            && !attrs.rc_device_attrs_cacheable_shareable
        {
            dw1.write(
                STRTAB_STE_1::MTCFG.val(1)
                    + STRTAB_STE_1::MEMATTR::InnerOuterWriteBackCacheable
                    + STRTAB_STE_1::SHCFG::Inner,
            );
        }

        let (ir0, or0, sh0) = if attrs.coherent_table_walks {
            (
                STRTAB_STE_2::S2IR0::WriteBackWriteAllocate,
                STRTAB_STE_2::S2OR0::WriteBackWriteAllocate,
                STRTAB_STE_2::S2SH0::Inner,
            )
        } else {
            (
                STRTAB_STE_2::S2IR0::NonCacheable,
                STRTAB_STE_2::S2OR0::NonCacheable,
                STRTAB_STE_2::S2SH0::Outer,
            )
        };

        let mut dw2 = LocalRegisterCopy::<u64, STRTAB_STE_2::Register>::new(0);
        dw2.write(
            STRTAB_STE_2::S2VMID.val(vmid as u64)
                + STRTAB_STE_2::S2T0SZ.val(64 - attrs.input_size as u64)
                + STRTAB_STE_2::S2SL0::StartAtLevel0
                + STRTAB_STE_2::S2TG::Granule4KiB
                + STRTAB_STE_2::S2PS.val(attrs.s2ps_encoded)
                + STRTAB_STE_2::S2AA64.val(1)
                + STRTAB_STE_2::S2R.val(1)
                + ir0
                + or0
                + sh0,
        );
        if attrs.protected_table_walk {
            dw2.modify(STRTAB_STE_2::S2PTW.val(1));
        }

        let mut dw3 = LocalRegisterCopy::<u64, STRTAB_STE_3::Register>::new(0);
        dw3.write(STRTAB_STE_3::S2TTB.val(s2pt_base.as_usize() as u64 >> 4));

        Self([dw0.get(), dw1.get(), dw2.get(), dw3.get(), 0, 0, 0, 0])
    }
}

pub struct LinearStreamTable<H: SmmuHal> {
    base: PhysAddr,
    entry_count: usize,
    _phantom: PhantomData<H>,
}

impl<H: SmmuHal> LinearStreamTable<H> {
    pub const fn uninit() -> Self {
        Self {
            base: pa!(0xdead_beef),
            entry_count: 0,
            _phantom: PhantomData,
        }
    }

    pub fn init(&mut self, sid_bits: u32) -> Result<()> {
        self.entry_count = 1 << sid_bits;
        let size = self.entry_count * STRTAB_STE_SIZE;
        let num_pages = memory_addr::align_up_4k(size) / PAGE_SIZE_4K;
        let base =
            H::alloc_pages(num_pages).ok_or(SmmuError::OutOfResources("allocating stream table"))?;
        self.base = base;
        debug!(
            "stream table base {:?}, entry_count {}, size {}",
            self.base, self.entry_count, size
        );
        for sid in 0..self.entry_count {
            self.set_bypass_ste(sid);
        }
        Ok(())
    }

    pub fn base_addr(&self) -> PhysAddr {
        self.base
    }

    fn ste(&self, sid: usize) -> &mut StreamTableEntry {
        let base = self.base + sid * STRTAB_STE_SIZE;
        unsafe { &mut *(base.as_usize() as *mut StreamTableEntry) }
    }

    pub fn set_bypass_ste(&self, sid: usize) {
        let tab = self.ste(sid);
        *tab = StreamTableEntry::bypass_entry();
    }

    /// Program `sid` with the Stage-2-identity-translated template,
    /// per §4.5's bring-up sequence.
    pub fn set_s2_identity_ste(
        &self,
        sid: usize,
        vmid: u16,
        s2pt_base: PhysAddr,
        attrs: Stage2Attributes,
    ) {
        let entry = self.ste(sid);
        *entry = StreamTableEntry::s2_identity_entry(vmid, s2pt_base, attrs);
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Free the backing pages allocated by [`Self::init`], per §4.5's
    /// teardown step (aligned-free of the stream table).
    pub fn free(&self) {
        let size = self.entry_count * STRTAB_STE_SIZE;
        let num_pages = memory_addr::align_up_4k(size) / PAGE_SIZE_4K;
        H::dealloc_pages(self.base, num_pages);
    }
}

#[cfg(test)]
mod test {
    use memory_addr::pa;

    use super::{Stage2Attributes, StreamTableEntry};

    #[test]
    fn bypass_entry_is_valid_and_bypasses_both_stages() {
        let ste = StreamTableEntry::bypass_entry();
        assert_eq!(ste.0[0] & 0b1, 1, "V must be set");
        assert_eq!((ste.0[0] >> 1) & 0b111, 0b100, "CFG must be bypass/bypass");
    }

    #[test]
    fn identity_entry_encodes_stage2_translate_config() {
        let attrs = Stage2Attributes {
            protected_table_walk: true,
            s2ps_encoded: 0b101, // 48-bit
            input_size: 48,
            coherent_table_walks: false,
            attr_types_overridable: false,
            rc_cache_coherent: false,
            rc_coherent_path_to_memory: false,
            rc_device_attrs_cacheable_shareable: false,
        };
        let ste = StreamTableEntry::s2_identity_entry(1, pa!(0x8000_0000), attrs);
        assert_eq!(ste.0[0] & 0b1, 1);
        assert_eq!((ste.0[0] >> 1) & 0b111, 0b110, "CFG must be bypass/translate");
        assert_eq!((ste.0[2] >> 51) & 1, 1, "S2AA64 must be set");
        assert_eq!((ste.0[2] >> 54) & 1, 1, "S2PTW must follow protected_table_walk");
        assert_eq!((ste.0[2] >> 58) & 1, 1, "S2R must always record faults");
        assert_eq!((ste.0[2]) & 0xffff, 1, "S2VMID must match the vmid argument");
        assert_eq!(
            (ste.0[3] >> 4) & 0xffff_ffff_ffff,
            0x8000_0000u64 >> 4,
            "S2TTB must match the page table root"
        );
    }

    #[test]
    fn attribute_override_applies_only_when_all_three_conditions_hold() {
        let mut attrs = Stage2Attributes {
            protected_table_walk: false,
            s2ps_encoded: 0b101,
            input_size: 48,
            coherent_table_walks: false,
            attr_types_overridable: true,
            rc_cache_coherent: true,
            rc_coherent_path_to_memory: true,
            rc_device_attrs_cacheable_shareable: false,
        };
        let overridden = StreamTableEntry::s2_identity_entry(1, pa!(0x1000), attrs);
        assert_eq!((overridden.0[1] >> 36) & 1, 1, "MTCFG should be forced on");

        attrs.rc_device_attrs_cacheable_shareable = true;
        let not_overridden = StreamTableEntry::s2_identity_entry(1, pa!(0x1000), attrs);
        assert_eq!(
            (not_overridden.0[1] >> 36) & 1,
            0,
            "MTCFG should stay off once DACS is already set"
        );
    }
}

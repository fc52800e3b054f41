//! Platform-supplied SMMU/IORT configuration blob, modelled field-for-field
//! on `ArmPkg/Include/Guid/SmmuConfig.h` and the IORT node layouts it
//! references (ACPI IORT spec, DEN0049). The firmware host builds one of
//! these once per boot (usually straight out of a platform HOB) and hands
//! it to [`crate::Smmu::bring_up`].

use crate::error::{Result, SmmuError};

/// `CURRENT_SMMU_CONFIG_VERSION_MAJOR` in the original header. A change
/// here means the layout below has changed incompatibly.
pub const CURRENT_SMMU_CONFIG_VERSION_MAJOR: u32 = 0;
/// `CURRENT_SMMU_CONFIG_VERSION_MINOR` in the original header.
pub const CURRENT_SMMU_CONFIG_VERSION_MINOR: u32 = 7;

/// IORT SMMUv3 node `Flags` bit indicating the platform overrides the
/// coherent-access-capable bit, i.e. table walks should be programmed
/// cacheable/shareable rather than the architectural default.
pub const IORT_SMMU_V3_FLAG_COHAC_OVERRIDE: u32 = 1 << 0;

/// Root complex node `MemoryAccessFlags` bits referenced by the STE
/// template rule in §4.5.
pub const RC_MEMORY_ACCESS_FLAGS_CPM: u8 = 1 << 0;
pub const RC_MEMORY_ACCESS_FLAGS_DACS: u8 = 1 << 1;

/// A single `{input, output}` StreamID/DeviceID mapping, as carried by
/// an `EFI_ACPI_6_0_IO_REMAPPING_ID_TABLE` entry.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct IdMapping {
    pub input_base: u32,
    pub num_ids: u32,
    pub output_base: u32,
    pub output_reference: u32,
    pub flags: u32,
}

/// The platform's ITS node, as referenced by the root complex's ID
/// mapping. This driver never talks to the ITS itself (MSI/ATS/PRI are
/// non-goals); it only needs to know the node exists so it can be
/// reproduced in the published IORT.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct ItsNode {
    pub identifiers: u32,
}

/// The platform's SMMUv3 IORT node.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct SmmuV3Node {
    /// MMIO base address of the SMMUv3 register page pair.
    pub base_address: u64,
    /// IORT `Flags`, see [`IORT_SMMU_V3_FLAG_COHAC_OVERRIDE`].
    pub flags: u32,
    pub event_gsiv: u32,
    pub pri_gsiv: u32,
    pub gerror_gsiv: u32,
    pub sync_gsiv: u32,
    pub id_mapping: IdMapping,
}

impl SmmuV3Node {
    /// Whether the platform asserts coherent table walks (IORT
    /// `Flags.COHAC_OVERRIDE`).
    pub fn coherent_table_walks(&self) -> bool {
        self.flags & IORT_SMMU_V3_FLAG_COHAC_OVERRIDE != 0
    }
}

/// The platform's PCI root complex IORT node.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct RcNode {
    /// `CacheCoherent`: 1 if the root complex is fully coherent.
    pub cache_coherent: u32,
    /// `MemoryAccessFlags`, see [`RC_MEMORY_ACCESS_FLAGS_CPM`]/
    /// [`RC_MEMORY_ACCESS_FLAGS_DACS`].
    pub memory_access_flags: u8,
    pub ats_attribute: u32,
    pub pci_segment_number: u32,
    pub id_mapping: IdMapping,
}

impl RcNode {
    pub fn cache_coherent(&self) -> bool {
        self.cache_coherent != 0
    }

    pub fn coherent_path_to_memory(&self) -> bool {
        self.memory_access_flags & RC_MEMORY_ACCESS_FLAGS_CPM != 0
    }

    pub fn device_attrs_cacheable_shareable(&self) -> bool {
        self.memory_access_flags & RC_MEMORY_ACCESS_FLAGS_DACS != 0
    }
}

/// `PLATFORM_IO_REMAPPING_STRUCTURE` in the original header: the IORT
/// table header plus the ITS/SMMUv3/RC node triple this driver needs to
/// both bring up the hardware and publish the IORT ACPI table.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct IoRemappingStructure {
    pub num_nodes: u32,
    pub its_node: ItsNode,
    pub smmu_node: SmmuV3Node,
    pub rc_node: RcNode,
}

/// `SMMU_CONFIG` in the original header: the whole versioned blob handed
/// from platform code to this driver.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct SmmuConfig {
    pub version_major: u32,
    pub version_minor: u32,
    pub config: IoRemappingStructure,
}

impl SmmuConfig {
    /// Reject a config blob from a platform built against an
    /// incompatible version of this structure, per §7's
    /// `IncompatibleVersion` error.
    pub fn check_version(&self) -> Result<()> {
        if self.version_major != CURRENT_SMMU_CONFIG_VERSION_MAJOR
            || self.version_minor != CURRENT_SMMU_CONFIG_VERSION_MINOR
        {
            return Err(SmmuError::IncompatibleVersion {
                expected_major: CURRENT_SMMU_CONFIG_VERSION_MAJOR,
                expected_minor: CURRENT_SMMU_CONFIG_VERSION_MINOR,
                got_major: self.version_major,
                got_minor: self.version_minor,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn current_version_passes_check() {
        let cfg = SmmuConfig {
            version_major: CURRENT_SMMU_CONFIG_VERSION_MAJOR,
            version_minor: CURRENT_SMMU_CONFIG_VERSION_MINOR,
            ..Default::default()
        };
        assert!(cfg.check_version().is_ok());
    }

    #[test]
    fn mismatched_minor_is_rejected() {
        let cfg = SmmuConfig {
            version_major: CURRENT_SMMU_CONFIG_VERSION_MAJOR,
            version_minor: CURRENT_SMMU_CONFIG_VERSION_MINOR + 1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.check_version(),
            Err(SmmuError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn rc_node_flag_accessors_decode_the_bitfield() {
        let rc = RcNode {
            memory_access_flags: RC_MEMORY_ACCESS_FLAGS_CPM,
            ..Default::default()
        };
        assert!(rc.coherent_path_to_memory());
        assert!(!rc.device_attrs_cacheable_shareable());
    }
}

//! ACPI IORT table builder and the two host services this driver calls
//! out to once bring-up has succeeded: installing the table itself, and
//! publishing the firmware-visible DMA protocol callback table. Layout
//! follows `PLATFORM_IO_REMAPPING_STRUCTURE` /
//! `ArmPkg/Include/Guid/SmmuConfig.h` and the ACPI IORT specification
//! (DEN0049).

use crate::config::SmmuConfig;
use crate::error::{Result, SmmuError};

const ACPI_HEADER_LEN: usize = 36;
const IORT_HEADER_LEN: usize = 8; // NumIortNodes + NodeOffset
const ITS_NODE_LEN: usize = 8 + 4; // common node header fragment + Identifiers
const SMMU_NODE_LEN: usize = 8 + 8 + 4 + 4 + 4 + 4 + 4 + 20; // header + fields + inline id map
const RC_NODE_LEN: usize = 8 + 4 + 1 + 4 + 4 + 20; // header + fields + inline id map

/// Upper bound on the serialized IORT table this driver ever builds:
/// one ITS node, one SMMUv3 node, one root complex node, each with a
/// single inline ID mapping. Large enough with slack for alignment.
pub const IORT_TABLE_MAX_LEN: usize = 256;

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn write_id_mapping(buf: &mut [u8], offset: usize, map: &crate::config::IdMapping) {
    write_u32(buf, offset, map.input_base);
    write_u32(buf, offset + 4, map.num_ids);
    write_u32(buf, offset + 8, map.output_base);
    write_u32(buf, offset + 12, map.output_reference);
    write_u32(buf, offset + 16, map.flags);
}

/// ACPI node type codes (IORT §3).
mod node_type {
    pub const ITS_GROUP: u8 = 0x00;
    pub const SMMU_V3: u8 = 0x04;
    pub const ROOT_COMPLEX: u8 = 0x02;
}

/// Serialize `config` into `buf` as a standalone ACPI IORT table,
/// patching `Length` once the final size is known and computing the
/// standard 8-bit two's-complement checksum so the sum of every byte in
/// the table is `0 mod 256`. Returns the number of bytes written.
pub fn build_iort_table(config: &SmmuConfig, buf: &mut [u8; IORT_TABLE_MAX_LEN]) -> Result<usize> {
    buf.fill(0);

    let nodes_offset = ACPI_HEADER_LEN + IORT_HEADER_LEN;
    let its_offset = nodes_offset;
    let smmu_offset = its_offset + ITS_NODE_LEN;
    let rc_offset = smmu_offset + SMMU_NODE_LEN;
    let total_len = rc_offset + RC_NODE_LEN;

    if total_len > IORT_TABLE_MAX_LEN {
        return Err(SmmuError::OutOfResources("IORT table buffer too small"));
    }

    // ACPI standard header.
    buf[0..4].copy_from_slice(b"IORT");
    write_u32(buf, 4, total_len as u32); // Length, patched below to the real value (same here)
    buf[8] = 0; // Revision (E.g. IORT revision 0: pre-E.d; this driver predates newer revisions)
    buf[9] = 0; // Checksum placeholder
    buf[10..16].copy_from_slice(b"RFWIRT"); // OEMID
    buf[16..24].copy_from_slice(b"SMMUV3TB"); // OEM Table ID
    write_u32(buf, 24, 1); // OEM Revision
    buf[28..32].copy_from_slice(b"RFSM"); // Creator ID
    write_u32(buf, 32, 1); // Creator Revision

    // IORT-specific header.
    write_u32(buf, 36, 3); // NumIortNodes: ITS + SMMUv3 + RC
    write_u32(buf, 40, nodes_offset as u32); // NodeOffset

    // ITS Group node: Type, Length, Revision, Reserved(u32), then
    // Identifiers count + one ID.
    buf[its_offset] = node_type::ITS_GROUP;
    write_u32(buf, its_offset + 1, ITS_NODE_LEN as u32);
    write_u32(buf, its_offset + 8, config.config.its_node.identifiers);

    // SMMUv3 node.
    buf[smmu_offset] = node_type::SMMU_V3;
    write_u32(buf, smmu_offset + 1, SMMU_NODE_LEN as u32);
    let smmu = &config.config.smmu_node;
    write_u64(buf, smmu_offset + 8, smmu.base_address);
    write_u32(buf, smmu_offset + 16, smmu.flags);
    write_u32(buf, smmu_offset + 20, smmu.event_gsiv);
    write_u32(buf, smmu_offset + 24, smmu.pri_gsiv);
    write_u32(buf, smmu_offset + 28, smmu.gerror_gsiv);
    write_u32(buf, smmu_offset + 32, smmu.sync_gsiv);
    write_id_mapping(buf, smmu_offset + 36, &smmu.id_mapping);

    // Root complex node.
    buf[rc_offset] = node_type::ROOT_COMPLEX;
    write_u32(buf, rc_offset + 1, RC_NODE_LEN as u32);
    let rc = &config.config.rc_node;
    write_u32(buf, rc_offset + 8, rc.cache_coherent);
    buf[rc_offset + 12] = rc.memory_access_flags;
    write_u32(buf, rc_offset + 13, rc.ats_attribute);
    write_u32(buf, rc_offset + 17, rc.pci_segment_number);
    write_id_mapping(buf, rc_offset + 21, &rc.id_mapping);

    let checksum = acpi_checksum(&buf[..total_len]);
    buf[9] = checksum;

    Ok(total_len)
}

/// The standard ACPI table checksum: the two's-complement byte that
/// makes the sum of every byte in the table equal `0 mod 256`.
fn acpi_checksum(table: &[u8]) -> u8 {
    let sum: u8 = table.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (0u8).wrapping_sub(sum)
}

/// Installs a finished ACPI table (e.g. into the firmware's ACPI
/// reclaim memory / table list). This crate only calls it.
pub trait AcpiTableHost {
    fn install_acpi_table(&self, table: &[u8]) -> Result<()>;
}

/// Publishes the firmware-visible DMA/IOMMU protocol callback table once
/// bring-up has succeeded, so that platform code (e.g. a PCI bus driver)
/// can discover and call into [`crate::mapping`]. This crate only calls
/// it; the concrete vtable shape is owned by the firmware host.
pub trait DmaProtocolHost {
    fn install_dma_protocol(&self) -> Result<()>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checksum_invariant_holds() {
        let config = SmmuConfig {
            version_major: crate::config::CURRENT_SMMU_CONFIG_VERSION_MAJOR,
            version_minor: crate::config::CURRENT_SMMU_CONFIG_VERSION_MINOR,
            ..Default::default()
        };
        let mut buf = [0u8; IORT_TABLE_MAX_LEN];
        let len = build_iort_table(&config, &mut buf).unwrap();
        let sum: u8 = buf[..len].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(sum, 0, "ACPI checksum invariant must hold");
    }

    #[test]
    fn length_field_matches_bytes_written() {
        let config = SmmuConfig::default();
        let mut buf = [0u8; IORT_TABLE_MAX_LEN];
        let len = build_iort_table(&config, &mut buf).unwrap();
        let length_field = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        assert_eq!(length_field as usize, len);
    }
}

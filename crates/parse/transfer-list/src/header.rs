//! Transfer List header and entry header layouts, plus well-known tags.

use ember_binparse::{AsBytes, FromBytes};

/// Signature of a Transfer List handed off between 64-bit stages.
pub const TRANSFER_LIST_SIGNATURE_64: u32 = 0x4a0f_b10b;

/// Signature of a Transfer List handed off between 32-bit stages.
pub const TRANSFER_LIST_SIGNATURE_32: u32 = 0x000f_b10b;

/// Transfer List format version produced and fully understood by this crate.
pub const TRANSFER_LIST_VERSION: u8 = 1;

/// `flags` bit: the list carries a valid checksum.
pub const TRANSFER_LIST_FLAG_HAS_CHECKSUM: u32 = 1 << 0;

/// Default log2 alignment for new lists (8 bytes).
pub const TRANSFER_LIST_DEFAULT_ALIGNMENT: u8 = 3;

/// Size of [`TransferListHeader`] in bytes.
pub const LIST_HEADER_SIZE: usize = core::mem::size_of::<TransferListHeader>();

/// Size of [`TransferEntryHeader`] in bytes.
pub const ENTRY_HEADER_SIZE: usize = core::mem::size_of::<TransferEntryHeader>();

/// Raw Transfer List header as laid out at the start of the list.
#[derive(Clone, Copy, Debug, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct TransferListHeader {
    /// [`TRANSFER_LIST_SIGNATURE_64`] or [`TRANSFER_LIST_SIGNATURE_32`].
    pub signature: u32,
    /// Makes the bytes in `[0, used_size)` sum to zero when the checksum flag is set.
    pub checksum: u8,
    /// Format version.
    pub version: u8,
    /// Size of this header; entries start after it, aligned.
    pub header_size: u8,
    /// Log2 of the entry alignment.
    pub alignment: u8,
    /// Bytes in use, header included.
    pub used_size: u32,
    /// Bytes available to the list.
    pub total_size: u32,
    /// `TRANSFER_LIST_FLAG_*` bits.
    pub flags: u32,
    /// Must be zero.
    pub reserved: u32,
}

/// Raw Transfer Entry header preceding each entry's payload.
#[derive(Clone, Copy, Debug, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct TransferEntryHeader {
    /// Identifies the payload, see [`tag`].
    pub tag_id: u16,
    /// Must be zero for a valid entry.
    pub reserved0: u8,
    /// Size of this header; the payload starts right after it.
    pub header_size: u8,
    /// Size of the payload in bytes.
    pub data_size: u32,
}

/// Well-known Transfer Entry tag IDs.
pub mod tag {
    /// Void entry, left behind by removal.
    pub const EMPTY: u16 = 0;
    /// Flattened device tree blob.
    pub const FDT: u16 = 1;
    /// A single HOB block.
    pub const HOB_BLOCK: u16 = 2;
    /// A complete HOB list.
    pub const HOB_LIST: u16 = 3;
    /// Concatenated ACPI tables.
    pub const ACPI_TABLE_AGGREGATE: u16 = 4;
    /// TPM event log.
    pub const TPM_EVENT_LOG: u16 = 5;
    /// TPM CRB base address.
    pub const TPM_CRB_BASE: u16 = 6;
    /// OP-TEE pageable part address.
    pub const OPTEE_PAGEABLE_PART: u16 = 0x100;
    /// SPMC manifest device tree.
    pub const DT_SPMC_MANIFEST: u16 = 0x101;
    /// 64-bit entry point info of the next image.
    pub const EXEC_EP_INFO64: u16 = 0x102;
    /// 64-bit SRAM layout.
    pub const SRAM_LAYOUT64: u16 = 0x104;

    /// Human-readable name of a well-known tag.
    #[must_use]
    pub fn name(tag: u16) -> Option<&'static str> {
        Some(match tag {
            EMPTY => "EMPTY",
            FDT => "FDT",
            HOB_BLOCK => "HOB_BLOCK",
            HOB_LIST => "HOB_LIST",
            ACPI_TABLE_AGGREGATE => "ACPI_TABLE_AGGREGATE",
            TPM_EVENT_LOG => "TPM_EVENT_LOG",
            TPM_CRB_BASE => "TPM_CRB_BASE",
            OPTEE_PAGEABLE_PART => "OPTEE_PAGEABLE_PART",
            DT_SPMC_MANIFEST => "DT_SPMC_MANIFEST",
            EXEC_EP_INFO64 => "EXEC_EP_INFO64",
            SRAM_LAYOUT64 => "SRAM_LAYOUT64",
            _ => return None,
        })
    }
}

const _: () = assert!(LIST_HEADER_SIZE == 24);
const _: () = assert!(ENTRY_HEADER_SIZE == 8);

//! System Description Table (SDT) header and checksum utilities.

use ember_binparse::{AsBytes, FromBytes};

use crate::AcpiError;

/// Standard ACPI System Description Table header.
///
/// This 36-byte header is present at the start of every ACPI table,
/// including the DSDT and SSDTs that carry AML.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    /// Revision of the table structure.
    pub revision: u8,
    /// Checksum byte. The entire table, including the header, must sum to zero.
    pub checksum: u8,
    /// OEM-supplied identification string.
    pub oem_id: [u8; 6],
    /// OEM-supplied table identification string.
    pub oem_table_id: [u8; 8],
    /// OEM-supplied revision number.
    pub oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    pub creator_id: u32,
    /// Revision of the utility that created the table.
    pub creator_revision: u32,
}

impl SdtHeader {
    /// The size of an SDT header in bytes.
    pub const SIZE: usize = 36;

    /// Offset of the checksum byte within a table.
    pub const CHECKSUM_OFFSET: usize = 9;

    /// Read an [`SdtHeader`] from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than [`SdtHeader::SIZE`] bytes.
    #[must_use]
    pub fn read_from_bytes(data: &[u8]) -> Option<Self> {
        Self::read_from(data)
    }

    /// Returns the 4-byte signature.
    #[must_use]
    pub fn signature(&self) -> [u8; 4] {
        self.signature
    }

    /// Returns the total length of this table (header included).
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }
}

const _: () = assert!(core::mem::size_of::<SdtHeader>() == SdtHeader::SIZE);

/// Reads and checks the header of the table at the start of `data`.
///
/// The declared length must fit in `data` and cover at least a header, the
/// checksum must validate, and, if given, the signature must match.
///
/// # Errors
///
/// Returns [`AcpiError::TruncatedData`], [`AcpiError::InvalidSignature`] or
/// [`AcpiError::InvalidChecksum`] accordingly.
pub fn validate_table(
    data: &[u8],
    expected_signature: Option<&[u8; 4]>,
) -> Result<SdtHeader, AcpiError> {
    let header = SdtHeader::read_from_bytes(data).ok_or(AcpiError::TruncatedData)?;

    if let Some(expected) = expected_signature {
        if &header.signature() != expected {
            return Err(AcpiError::InvalidSignature);
        }
    }

    let len = header.length() as usize;
    if len < SdtHeader::SIZE {
        return Err(AcpiError::TruncatedData);
    }
    let table = data.get(..len).ok_or(AcpiError::TruncatedData)?;

    if !validate_checksum(table) {
        return Err(AcpiError::InvalidChecksum);
    }

    Ok(header)
}

/// Validate the checksum of a byte slice.
///
/// ACPI tables are designed so that the sum of all bytes in the table equals
/// zero (mod 256).
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    byte_sum(data) == 0
}

/// Returns the byte that makes `data` sum to zero when added to it.
///
/// The checksum field of `data` must be zero when this is computed.
#[must_use]
pub fn compute_checksum(data: &[u8]) -> u8 {
    0u8.wrapping_sub(byte_sum(data))
}

/// Recomputes and stores the checksum of a complete table in place.
///
/// Tables shorter than a header are left untouched.
pub fn update_checksum(table: &mut [u8]) {
    if table.len() < SdtHeader::SIZE {
        return;
    }
    table[SdtHeader::CHECKSUM_OFFSET] = 0;
    table[SdtHeader::CHECKSUM_OFFSET] = compute_checksum(table);
}

fn byte_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> [u8; 40] {
        let mut t = [0u8; 40];
        t[..4].copy_from_slice(b"SSDT");
        t[4] = 40;
        t[8] = 2;
        t[10..16].copy_from_slice(b"EMBER ");
        t[36..].copy_from_slice(&[0x10, 0x03, 0x5C, 0x00]);
        t
    }

    #[test]
    fn checksum_round_trip() {
        let mut t = table();
        assert!(!validate_checksum(&t));
        update_checksum(&mut t);
        assert!(validate_checksum(&t));
        assert_eq!(validate_table(&t, Some(b"SSDT")).map(|h| h.length()), Ok(40));
    }

    #[test]
    fn validate_rejects_bad_tables() {
        let mut t = table();
        update_checksum(&mut t);
        assert_eq!(
            validate_table(&t, Some(b"DSDT")).err(),
            Some(AcpiError::InvalidSignature)
        );
        assert_eq!(
            validate_table(&t[..39], None).err(),
            Some(AcpiError::TruncatedData)
        );
        t[37] ^= 1;
        assert_eq!(
            validate_table(&t, None).err(),
            Some(AcpiError::InvalidChecksum)
        );
    }
}

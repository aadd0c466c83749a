//! Buffers handed to PRM handlers at runtime.
//!
//! A handler receives a [`PrmContextBuffer`] (`'PRMC'`) naming its GUID and
//! pointing at an optional static data buffer (`'PRMD'`, see
//! [`PrmDataBuffer`]) and at the list of MMIO ranges the OS mapped for the
//! module (see [`MmioRanges`]). Addresses are carried as `u64` so the
//! structures keep their packed layout on any host.

use core::mem::size_of;

use ember_binparse::{AsBytes, FromBytes};
use ember_uefi::{EfiGuid, EfiPhysicalAddress};

use crate::PrmError;

/// `'PRMC'` as a little-endian `u32`.
pub const PRM_CONTEXT_BUFFER_SIGNATURE: u32 = u32::from_le_bytes(*b"PRMC");

/// Interface version of [`PrmContextBuffer`].
pub const PRM_CONTEXT_BUFFER_INTERFACE_VERSION: u16 = 1;

/// `'PRMD'` as a little-endian `u32`.
pub const PRM_DATA_BUFFER_HEADER_SIGNATURE: u32 = u32::from_le_bytes(*b"PRMD");

/// Per-handler context passed to every invocation.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmContextBuffer {
    /// [`PRM_CONTEXT_BUFFER_SIGNATURE`].
    pub signature: u32,
    /// [`PRM_CONTEXT_BUFFER_INTERFACE_VERSION`].
    pub version: u16,
    /// Must be zero.
    pub reserved: u16,
    /// GUID of the handler this context belongs to.
    pub handler_guid: EfiGuid,
    /// Address of the handler's static data buffer, or 0.
    pub static_data_buffer: EfiPhysicalAddress,
    /// Address of the module's runtime MMIO ranges, or 0.
    pub runtime_mmio_ranges: EfiPhysicalAddress,
}

impl PrmContextBuffer {
    /// Size of the context buffer in bytes.
    pub const SIZE: usize = 40;

    /// Creates a context for `handler_guid` with no attached buffers.
    #[must_use]
    pub const fn new(handler_guid: EfiGuid) -> Self {
        Self {
            signature: PRM_CONTEXT_BUFFER_SIGNATURE,
            version: PRM_CONTEXT_BUFFER_INTERFACE_VERSION,
            reserved: 0,
            handler_guid,
            static_data_buffer: 0,
            runtime_mmio_ranges: 0,
        }
    }

    /// Checks the signature and version.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::InvalidSignature`] or
    /// [`PrmError::UnsupportedRevision`].
    pub fn validate(&self) -> Result<(), PrmError> {
        if self.signature != PRM_CONTEXT_BUFFER_SIGNATURE {
            return Err(PrmError::InvalidSignature);
        }
        if self.version > PRM_CONTEXT_BUFFER_INTERFACE_VERSION {
            return Err(PrmError::UnsupportedRevision);
        }
        Ok(())
    }
}

const _: () = assert!(size_of::<PrmContextBuffer>() == PrmContextBuffer::SIZE);

/// Header of a PRM data buffer.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmDataBufferHeader {
    /// [`PRM_DATA_BUFFER_HEADER_SIGNATURE`].
    pub signature: u32,
    /// Length of the whole buffer, header included.
    pub length: u32,
}

impl PrmDataBufferHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;
}

/// A validated `'PRMD'` data buffer.
#[derive(Debug, Clone, Copy)]
pub struct PrmDataBuffer<'a> {
    data: &'a [u8],
}

impl<'a> PrmDataBuffer<'a> {
    /// Validates the data buffer at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::InvalidSignature`] or
    /// [`PrmError::TruncatedData`] if the declared length does not fit.
    pub fn parse(data: &'a [u8]) -> Result<Self, PrmError> {
        let header = PrmDataBufferHeader::read_from(data).ok_or(PrmError::TruncatedData)?;
        if header.signature != PRM_DATA_BUFFER_HEADER_SIGNATURE {
            return Err(PrmError::InvalidSignature);
        }
        let length = header.length as usize;
        if length < PrmDataBufferHeader::SIZE {
            return Err(PrmError::TruncatedData);
        }
        let data = data.get(..length).ok_or(PrmError::TruncatedData)?;
        Ok(Self { data })
    }

    /// The payload following the header.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[PrmDataBufferHeader::SIZE..]
    }

    /// Writes a data buffer holding `payload` into `out`, returning its size.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::BufferTooSmall`] if `out` cannot hold it and
    /// [`PrmError::TooManyHandlers`] if the payload exceeds 4 GiB.
    pub fn write(payload: &[u8], out: &mut [u8]) -> Result<usize, PrmError> {
        let total = PrmDataBufferHeader::SIZE + payload.len();
        let header = PrmDataBufferHeader {
            signature: PRM_DATA_BUFFER_HEADER_SIGNATURE,
            length: u32::try_from(total).map_err(|_| PrmError::TooManyHandlers)?,
        };
        let out = out.get_mut(..total).ok_or(PrmError::BufferTooSmall)?;
        out[..PrmDataBufferHeader::SIZE].copy_from_slice(header.as_bytes());
        out[PrmDataBufferHeader::SIZE..].copy_from_slice(payload);
        Ok(total)
    }
}

/// One MMIO range mapped for the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmRuntimeMmioRange {
    /// Physical base address.
    pub physical_base_address: EfiPhysicalAddress,
    /// Virtual address the OS mapped the range at.
    pub virtual_base_address: u64,
    /// Length in bytes.
    pub length: u32,
}

impl PrmRuntimeMmioRange {
    /// Size of one range entry in bytes.
    pub const SIZE: usize = 20;

    /// Translates a physical address inside this range.
    #[must_use]
    pub fn translate(&self, physical: EfiPhysicalAddress) -> Option<u64> {
        let offset = physical.checked_sub(self.physical_base_address)?;
        if offset >= u64::from(self.length) {
            return None;
        }
        self.virtual_base_address.checked_add(offset)
    }
}

/// A validated runtime MMIO range list: a `u64` count followed by the
/// ranges.
#[derive(Debug, Clone, Copy)]
pub struct MmioRanges<'a> {
    data: &'a [u8],
    count: usize,
}

impl<'a> MmioRanges<'a> {
    /// Validates the range list at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::TruncatedData`] if the ranges do not fit.
    pub fn parse(data: &'a [u8]) -> Result<Self, PrmError> {
        let count = u64::read_from(data).ok_or(PrmError::TruncatedData)?;
        let count = usize::try_from(count).map_err(|_| PrmError::TruncatedData)?;
        let size = count
            .checked_mul(PrmRuntimeMmioRange::SIZE)
            .and_then(|s| s.checked_add(size_of::<u64>()))
            .ok_or(PrmError::TruncatedData)?;
        let data = data.get(..size).ok_or(PrmError::TruncatedData)?;
        Ok(Self { data, count })
    }

    /// Number of ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterates over the ranges.
    pub fn iter(&self) -> impl Iterator<Item = PrmRuntimeMmioRange> + use<'a> {
        let data = self.data;
        (0..self.count).filter_map(move |i| {
            PrmRuntimeMmioRange::read_at(data, size_of::<u64>() + i * PrmRuntimeMmioRange::SIZE)
        })
    }

    /// Translates `physical` through the first range containing it.
    #[must_use]
    pub fn translate(&self, physical: EfiPhysicalAddress) -> Option<u64> {
        self.iter().find_map(|r| r.translate(physical))
    }

    /// Writes a range list into `out`, returning its size.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::BufferTooSmall`] if `out` cannot hold it.
    pub fn write(ranges: &[PrmRuntimeMmioRange], out: &mut [u8]) -> Result<usize, PrmError> {
        let total = size_of::<u64>() + ranges.len() * PrmRuntimeMmioRange::SIZE;
        let out = out.get_mut(..total).ok_or(PrmError::BufferTooSmall)?;
        (ranges.len() as u64)
            .write_at(out, 0)
            .ok_or(PrmError::BufferTooSmall)?;
        for (i, range) in ranges.iter().enumerate() {
            range
                .write_at(out, size_of::<u64>() + i * PrmRuntimeMmioRange::SIZE)
                .ok_or(PrmError::BufferTooSmall)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLER: EfiGuid = EfiGuid::new(0x1234, 5, 6, [7; 8]);

    #[test]
    fn context_buffer_layout() {
        let ctx = PrmContextBuffer::new(HANDLER);
        let bytes = ctx.as_bytes();
        assert_eq!(bytes.len(), PrmContextBuffer::SIZE);
        assert_eq!(&bytes[..4], b"PRMC");
        assert_eq!(&bytes[4..6], &[1, 0]);
        assert_eq!(&bytes[8..24], HANDLER.as_bytes());
        assert!(ctx.validate().is_ok());

        let mut bad = ctx;
        bad.signature = 0;
        assert_eq!(bad.validate(), Err(PrmError::InvalidSignature));
        let mut newer = ctx;
        newer.version = 2;
        assert_eq!(newer.validate(), Err(PrmError::UnsupportedRevision));
    }

    #[test]
    fn data_buffer() {
        let mut buf = [0u8; 16];
        assert_eq!(PrmDataBuffer::write(&[1, 2, 3], &mut buf), Ok(11));
        assert_eq!(&buf[..4], b"PRMD");
        let parsed = PrmDataBuffer::parse(&buf).unwrap();
        assert_eq!(parsed.payload(), &[1, 2, 3]);

        assert_eq!(
            PrmDataBuffer::write(&[0; 9], &mut buf),
            Err(PrmError::BufferTooSmall)
        );
        buf[4] = 0x40;
        assert_eq!(PrmDataBuffer::parse(&buf).unwrap_err(), PrmError::TruncatedData);
    }

    #[test]
    fn mmio_ranges() {
        let ranges = [
            PrmRuntimeMmioRange {
                physical_base_address: 0xFED0_0000,
                virtual_base_address: 0xFFFF_8000_0000_0000,
                length: 0x1000,
            },
            PrmRuntimeMmioRange {
                physical_base_address: 0xFEE0_0000,
                virtual_base_address: 0xFFFF_8000_0010_0000,
                length: 0x100,
            },
        ];
        let mut buf = [0u8; 64];
        let len = MmioRanges::write(&ranges, &mut buf).unwrap();
        assert_eq!(len, 8 + 2 * 20);

        let parsed = MmioRanges::parse(&buf[..len]).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.iter().nth(1), Some(ranges[1]));
        assert_eq!(parsed.translate(0xFED0_0010), Some(0xFFFF_8000_0000_0010));
        assert_eq!(parsed.translate(0xFEE0_0100), None);
        assert!(MmioRanges::parse(&buf[..len - 1]).is_err());
    }
}

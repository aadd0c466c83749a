//! PRM module export descriptor.
//!
//! The descriptor is packed and bit-exact: the OS loader reads it straight
//! out of the module image.

use core::fmt;
use core::mem::size_of;

use ember_binparse::{AsBytes, FromBytes};
use ember_uefi::EfiGuid;

use crate::PrmError;

/// `"PRM_MEDT"` as a little-endian `u64`.
pub const PRM_MODULE_EXPORT_DESCRIPTOR_SIGNATURE: u64 = u64::from_le_bytes(*b"PRM_MEDT");

/// Revision of the export descriptor layout produced by this crate.
pub const PRM_MODULE_EXPORT_REVISION: u16 = 0;

/// Size of the handler name field, terminating NUL included.
pub const PRM_HANDLER_NAME_MAXIMUM_LENGTH: usize = 128;

/// Fixed part of a module export descriptor.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmModuleExportDescriptorHeader {
    /// [`PRM_MODULE_EXPORT_DESCRIPTOR_SIGNATURE`].
    pub signature: u64,
    /// Layout revision.
    pub revision: u16,
    /// Number of handler descriptors that follow.
    pub number_prm_handlers: u16,
    /// Platform the module was built for.
    pub platform_guid: EfiGuid,
    /// Identity of the module.
    pub module_guid: EfiGuid,
}

impl PrmModuleExportDescriptorHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 44;
}

const _: () = assert!(size_of::<PrmModuleExportDescriptorHeader>() == PrmModuleExportDescriptorHeader::SIZE);

/// One exported handler: its GUID and the NUL-padded name of its entry
/// point.
#[derive(Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmHandlerExportDescriptor {
    /// GUID the OS uses to invoke the handler.
    pub handler_guid: EfiGuid,
    /// ASCII export name of the handler function, NUL-padded.
    pub handler_name: [u8; PRM_HANDLER_NAME_MAXIMUM_LENGTH],
}

impl PrmHandlerExportDescriptor {
    /// Size of a handler descriptor in bytes.
    pub const SIZE: usize = 144;

    /// Builds a descriptor in const context.
    ///
    /// # Panics
    ///
    /// Panics (failing the build when used in a `static`) if `name` is not
    /// 1 to 127 printable ASCII characters.
    #[must_use]
    pub const fn new(handler_guid: EfiGuid, name: &str) -> Self {
        match encode_handler_name(name) {
            Ok(handler_name) => Self {
                handler_guid,
                handler_name,
            },
            Err(_) => panic!("PRM handler names must be 1 to 127 printable ASCII characters"),
        }
    }

    /// Builds a descriptor, validating `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::InvalidName`] if `name` is not 1 to 127
    /// printable ASCII characters.
    pub const fn try_new(handler_guid: EfiGuid, name: &str) -> Result<Self, PrmError> {
        match encode_handler_name(name) {
            Ok(handler_name) => Ok(Self {
                handler_guid,
                handler_name,
            }),
            Err(e) => Err(e),
        }
    }

    /// Returns the handler GUID.
    #[must_use]
    pub fn guid(&self) -> EfiGuid {
        self.handler_guid
    }

    /// Returns the handler name, or `None` if the field is not a valid
    /// NUL-terminated ASCII name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        let len = self.handler_name.iter().position(|&b| b == 0)?;
        let name = &self.handler_name[..len];
        if name.is_empty() || !name.iter().all(u8::is_ascii_graphic) {
            return None;
        }
        core::str::from_utf8(name).ok()
    }
}

impl fmt::Debug for PrmHandlerExportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrmHandlerExportDescriptor")
            .field("handler_guid", &self.guid())
            .field("handler_name", &self.name())
            .finish()
    }
}

const _: () = assert!(size_of::<PrmHandlerExportDescriptor>() == PrmHandlerExportDescriptor::SIZE);

/// Encodes a handler name into its NUL-padded field.
const fn encode_handler_name(name: &str) -> Result<[u8; PRM_HANDLER_NAME_MAXIMUM_LENGTH], PrmError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= PRM_HANDLER_NAME_MAXIMUM_LENGTH {
        return Err(PrmError::InvalidName);
    }
    let mut out = [0u8; PRM_HANDLER_NAME_MAXIMUM_LENGTH];
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_graphic() {
            return Err(PrmError::InvalidName);
        }
        out[i] = bytes[i];
        i += 1;
    }
    Ok(out)
}

/// Const GUID comparison. Takes the GUIDs by value since they are read out
/// of packed descriptors.
const fn guid_eq(a: EfiGuid, b: EfiGuid) -> bool {
    if a.data1 != b.data1 || a.data2 != b.data2 || a.data3 != b.data3 {
        return false;
    }
    let mut i = 0;
    while i < a.data4.len() {
        if a.data4[i] != b.data4[i] {
            return false;
        }
        i += 1;
    }
    true
}

/// A complete export descriptor with `N` handlers, laid out exactly as
/// the OS expects it.
///
/// Usually created by [`prm_module_export!`](crate::prm_module_export).
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct PrmModuleExportDescriptor<const N: usize> {
    /// Fixed header.
    pub header: PrmModuleExportDescriptorHeader,
    /// Handler table.
    pub handlers: [PrmHandlerExportDescriptor; N],
}

// SAFETY: packed struct of packed, padding-free fields.
unsafe impl<const N: usize> AsBytes for PrmModuleExportDescriptor<N> {}

impl<const N: usize> PrmModuleExportDescriptor<N> {
    /// Total size of the descriptor in bytes.
    pub const SIZE: usize = PrmModuleExportDescriptorHeader::SIZE + N * PrmHandlerExportDescriptor::SIZE;

    /// Builds the descriptor in const context.
    ///
    /// # Panics
    ///
    /// Panics (failing the build when used in a `static`) if there are more
    /// than `u16::MAX` handlers or two handlers share a GUID.
    #[must_use]
    pub const fn new(
        platform_guid: EfiGuid,
        module_guid: EfiGuid,
        handlers: [PrmHandlerExportDescriptor; N],
    ) -> Self {
        assert!(N <= u16::MAX as usize, "too many PRM handlers");
        let mut i = 0;
        while i < N {
            let mut j = i + 1;
            while j < N {
                assert!(
                    !guid_eq(handlers[i].handler_guid, handlers[j].handler_guid),
                    "duplicate PRM handler GUID"
                );
                j += 1;
            }
            i += 1;
        }
        Self {
            header: PrmModuleExportDescriptorHeader {
                signature: PRM_MODULE_EXPORT_DESCRIPTOR_SIGNATURE,
                revision: PRM_MODULE_EXPORT_REVISION,
                number_prm_handlers: N as u16,
                platform_guid,
                module_guid,
            },
            handlers,
        }
    }
}

/// A validated view of an export descriptor read from a module image.
#[derive(Debug, Clone, Copy)]
pub struct ExportDescriptor<'a> {
    header: PrmModuleExportDescriptorHeader,
    data: &'a [u8],
}

impl<'a> ExportDescriptor<'a> {
    /// Validates the descriptor at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::InvalidSignature`], [`PrmError::UnsupportedRevision`],
    /// [`PrmError::TruncatedData`] if the handler table does not fit, or
    /// [`PrmError::InvalidName`] if a handler name is malformed.
    pub fn parse(data: &'a [u8]) -> Result<Self, PrmError> {
        let header = PrmModuleExportDescriptorHeader::read_from(data).ok_or(PrmError::TruncatedData)?;
        if header.signature != PRM_MODULE_EXPORT_DESCRIPTOR_SIGNATURE {
            return Err(PrmError::InvalidSignature);
        }
        let revision = header.revision;
        if revision > PRM_MODULE_EXPORT_REVISION {
            log::warn!("prm: export descriptor revision {revision} is not supported");
            return Err(PrmError::UnsupportedRevision);
        }
        let size = PrmModuleExportDescriptorHeader::SIZE
            + usize::from(header.number_prm_handlers) * PrmHandlerExportDescriptor::SIZE;
        let data = data.get(..size).ok_or(PrmError::TruncatedData)?;

        let descriptor = Self { header, data };
        if let Some(bad) = descriptor.handlers().position(|h| h.name().is_none()) {
            log::warn!("prm: handler {bad} has a malformed name");
            return Err(PrmError::InvalidName);
        }
        Ok(descriptor)
    }

    /// Returns the header.
    #[must_use]
    pub fn header(&self) -> PrmModuleExportDescriptorHeader {
        self.header
    }

    /// Platform GUID of the module.
    #[must_use]
    pub fn platform_guid(&self) -> EfiGuid {
        self.header.platform_guid
    }

    /// Module GUID.
    #[must_use]
    pub fn module_guid(&self) -> EfiGuid {
        self.header.module_guid
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.header.number_prm_handlers)
    }

    /// Returns `true` if the module exports no handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the descriptor in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Handler descriptor `index`.
    #[must_use]
    pub fn handler(&self, index: usize) -> Option<PrmHandlerExportDescriptor> {
        if index >= self.len() {
            return None;
        }
        let offset = PrmModuleExportDescriptorHeader::SIZE + index * PrmHandlerExportDescriptor::SIZE;
        PrmHandlerExportDescriptor::read_at(self.data, offset)
    }

    /// Iterates over the handler descriptors in table order.
    pub fn handlers(&self) -> impl Iterator<Item = PrmHandlerExportDescriptor> + use<'a> {
        let this = *self;
        (0..self.len()).filter_map(move |i| this.handler(i))
    }

    /// Finds the handler with GUID `guid`.
    #[must_use]
    pub fn find(&self, guid: &EfiGuid) -> Option<PrmHandlerExportDescriptor> {
        self.handlers().find(|h| h.guid() == *guid)
    }

    /// Finds the handler exported under `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<PrmHandlerExportDescriptor> {
        self.handlers().find(|h| h.name() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    const PLATFORM: EfiGuid = EfiGuid::new(0x1111_2222, 0x3333, 0x4444, [5; 8]);
    const MODULE: EfiGuid = EfiGuid::new(0xaaaa_bbbb, 0xcccc, 0xdddd, [0xee; 8]);
    const H1: EfiGuid = EfiGuid::new(1, 0, 0, [0; 8]);
    const H2: EfiGuid = EfiGuid::new(2, 0, 0, [0; 8]);

    static TABLE: PrmModuleExportDescriptor<2> = PrmModuleExportDescriptor::new(
        PLATFORM,
        MODULE,
        [
            PrmHandlerExportDescriptor::new(H1, "DumpAddressTranslation"),
            PrmHandlerExportDescriptor::new(H2, "CheckParamBufferPrmHandler"),
        ],
    );

    #[test]
    fn layout_is_bit_exact() {
        let bytes = TABLE.as_bytes();
        assert_eq!(bytes.len(), 44 + 2 * 144);
        assert_eq!(PrmModuleExportDescriptor::<2>::SIZE, bytes.len());
        assert_eq!(&bytes[..8], b"PRM_MEDT");
        assert_eq!(&bytes[8..10], &[0, 0]);
        assert_eq!(&bytes[10..12], &[2, 0]);
        assert_eq!(&bytes[12..28], PLATFORM.as_bytes());
        assert_eq!(&bytes[28..44], MODULE.as_bytes());
        assert_eq!(&bytes[44..60], H1.as_bytes());
        assert_eq!(&bytes[60..82], b"DumpAddressTranslation");
        assert!(bytes[82..188].iter().all(|&b| b == 0));
    }

    #[test]
    fn reads_back() {
        let desc = ExportDescriptor::parse(TABLE.as_bytes()).unwrap();
        assert_eq!(desc.len(), 2);
        assert_eq!(desc.module_guid(), MODULE);
        let names: Vec<_> = desc.handlers().map(|h| h.handler_name).collect();
        assert_eq!(names.len(), 2);
        assert_eq!(desc.find(&H2).unwrap().name(), Some("CheckParamBufferPrmHandler"));
        assert_eq!(desc.find_by_name("DumpAddressTranslation").unwrap().guid(), H1);
        assert!(desc.find(&EfiGuid::ZERO).is_none());
        assert!(desc.handler(2).is_none());
    }

    #[test]
    fn distinct_guids_pass_the_const_check() {
        let desc = PrmModuleExportDescriptor::new(
            PLATFORM,
            MODULE,
            [
                PrmHandlerExportDescriptor::new(H1, "First"),
                PrmHandlerExportDescriptor::new(H2, "Second"),
                PrmHandlerExportDescriptor::new(EfiGuid::new(1, 0, 0, [0, 0, 0, 0, 0, 0, 0, 1]), "Third"),
            ],
        );
        assert_eq!(ExportDescriptor::parse(desc.as_bytes()).unwrap().len(), 3);
    }

    #[test]
    #[should_panic(expected = "duplicate PRM handler GUID")]
    fn duplicate_guids_are_rejected() {
        let _ = PrmModuleExportDescriptor::new(
            PLATFORM,
            MODULE,
            [
                PrmHandlerExportDescriptor::new(H1, "First"),
                PrmHandlerExportDescriptor::new(H2, "Second"),
                PrmHandlerExportDescriptor::new(H1, "Third"),
            ],
        );
    }

    #[test]
    fn rejects_bad_descriptors() {
        let bytes = TABLE.as_bytes().to_vec();
        assert_eq!(
            ExportDescriptor::parse(&bytes[..100]).unwrap_err(),
            PrmError::TruncatedData
        );

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert_eq!(ExportDescriptor::parse(&bad).unwrap_err(), PrmError::InvalidSignature);

        let mut bad = bytes.clone();
        bad[8] = 1;
        assert_eq!(
            ExportDescriptor::parse(&bad).unwrap_err(),
            PrmError::UnsupportedRevision
        );

        let mut bad = bytes;
        bad[60] = 0;
        assert_eq!(ExportDescriptor::parse(&bad).unwrap_err(), PrmError::InvalidName);
    }

    #[test]
    fn name_validation() {
        assert!(PrmHandlerExportDescriptor::try_new(H1, "").is_err());
        assert!(PrmHandlerExportDescriptor::try_new(H1, "has space").is_err());
        let long = "a".repeat(128);
        assert_eq!(
            PrmHandlerExportDescriptor::try_new(H1, &long).unwrap_err(),
            PrmError::InvalidName
        );
        let max = "a".repeat(127);
        let desc = PrmHandlerExportDescriptor::try_new(H1, &max).unwrap();
        assert_eq!(desc.name(), Some(max.as_str()));
    }
}

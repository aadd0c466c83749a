//! The `PRMT` ACPI table.
//!
//! The loader collects the export descriptors of every PRM module it
//! loaded, resolves the handler addresses and publishes them to the OS in a
//! single table:
//!
//! ```text
//! SdtHeader        "PRMT", revision 0
//! GUID             platform GUID
//! u32              offset of the first module info structure
//! u32              module count
//! module info      { rev, length, GUID, major, minor, handler count,
//!                    handler offset, runtime MMIO ranges } (38 bytes)
//!   handler info   { rev, length, GUID, address, static data,
//!                    ACPI parameter buffer } (44 bytes) x count
//! ... repeated for every module
//! ```

use alloc::vec::Vec;
use core::mem::size_of;

use ember_acpi::sdt::{self, SdtHeader};
use ember_binparse::{AsBytes, FromBytes};
use ember_uefi::{EfiGuid, EfiPhysicalAddress};

use crate::{ExportDescriptor, PrmError, PrmHandlerExportDescriptor};

/// Table signature.
pub const PRMT_SIGNATURE: [u8; 4] = *b"PRMT";

/// Revision written to the table header.
pub const PRMT_REVISION: u8 = 0;

/// Revision of the module and handler info structures.
pub const PRMT_STRUCTURE_REVISION: u16 = 0;

/// Fields after the SDT header.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
struct PrmtPlatformHeader {
    platform_guid: EfiGuid,
    module_info_offset: u32,
    module_info_count: u32,
}

/// Offset of the first module info structure.
pub const PRMT_MODULE_INFO_OFFSET: usize = SdtHeader::SIZE + size_of::<PrmtPlatformHeader>();

/// Fixed part of a module info structure.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmtModuleInfo {
    /// [`PRMT_STRUCTURE_REVISION`].
    pub structure_revision: u16,
    /// Length including the handler info structures.
    pub structure_length: u16,
    /// Module GUID.
    pub identifier: EfiGuid,
    /// Module major revision.
    pub major_revision: u16,
    /// Module minor revision.
    pub minor_revision: u16,
    /// Number of handler info structures.
    pub handler_info_count: u16,
    /// Offset of the first handler info, from the start of this structure.
    pub handler_info_offset: u32,
    /// Address of the module's runtime MMIO ranges, or 0.
    pub runtime_mmio_ranges: EfiPhysicalAddress,
}

impl PrmtModuleInfo {
    /// Size of the fixed part in bytes.
    pub const SIZE: usize = 38;
}

/// One handler info structure.
#[derive(Debug, Clone, Copy, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct PrmtHandlerInfo {
    /// [`PRMT_STRUCTURE_REVISION`].
    pub structure_revision: u16,
    /// [`PrmtHandlerInfo::SIZE`].
    pub structure_length: u16,
    /// Handler GUID.
    pub identifier: EfiGuid,
    /// Address of the handler entry point.
    pub physical_address: EfiPhysicalAddress,
    /// Address of the handler's static data buffer, or 0.
    pub static_data_buffer: EfiPhysicalAddress,
    /// Address of the handler's ACPI parameter buffer, or 0.
    pub acpi_parameter_buffer: EfiPhysicalAddress,
}

impl PrmtHandlerInfo {
    /// Size in bytes.
    pub const SIZE: usize = 44;
}

const _: () = assert!(size_of::<PrmtPlatformHeader>() == 24);
const _: () = assert!(size_of::<PrmtModuleInfo>() == PrmtModuleInfo::SIZE);
const _: () = assert!(size_of::<PrmtHandlerInfo>() == PrmtHandlerInfo::SIZE);

/// Table-wide identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrmtConfig {
    /// Platform every module must have been built for.
    pub platform_guid: EfiGuid,
    /// OEM ID.
    pub oem_id: [u8; 6],
    /// OEM table ID.
    pub oem_table_id: [u8; 8],
    /// OEM revision.
    pub oem_revision: u32,
    /// Creator ID.
    pub creator_id: [u8; 4],
    /// Creator revision.
    pub creator_revision: u32,
}

impl PrmtConfig {
    /// A configuration with ember's default identification strings.
    #[must_use]
    pub const fn new(platform_guid: EfiGuid) -> Self {
        Self {
            platform_guid,
            oem_id: *b"EMBER ",
            oem_table_id: *b"EMBERPRM",
            oem_revision: 1,
            creator_id: *b"EMBR",
            creator_revision: 1,
        }
    }
}

/// A resolved handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrmtHandler {
    /// Handler GUID.
    pub guid: EfiGuid,
    /// Entry point address.
    pub physical_address: EfiPhysicalAddress,
    /// Static data buffer address, or 0.
    pub static_data_buffer: EfiPhysicalAddress,
    /// ACPI parameter buffer address, or 0.
    pub acpi_parameter_buffer: EfiPhysicalAddress,
}

/// A loaded module and its resolved handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrmtModule {
    /// Platform the module was built for.
    pub platform_guid: EfiGuid,
    /// Module GUID.
    pub module_guid: EfiGuid,
    /// Major revision of the module image.
    pub major_revision: u16,
    /// Minor revision of the module image.
    pub minor_revision: u16,
    /// Runtime MMIO ranges address, or 0.
    pub runtime_mmio_ranges: EfiPhysicalAddress,
    /// Handlers in export order.
    pub handlers: Vec<PrmtHandler>,
}

impl PrmtModule {
    /// Builds a module from its export descriptor, resolving every handler
    /// to its entry point address with `resolve`.
    ///
    /// # Errors
    ///
    /// Returns [`PrmError::NotFound`] if a handler does not resolve.
    pub fn from_descriptor(
        descriptor: &ExportDescriptor<'_>,
        mut resolve: impl FnMut(&PrmHandlerExportDescriptor) -> Option<EfiPhysicalAddress>,
    ) -> Result<Self, PrmError> {
        let handlers = descriptor
            .handlers()
            .map(|h| {
                let Some(physical_address) = resolve(&h) else {
                    log::warn!("prmt: handler {:?} does not resolve", h.name());
                    return Err(PrmError::NotFound);
                };
                Ok(PrmtHandler {
                    guid: h.guid(),
                    physical_address,
                    static_data_buffer: 0,
                    acpi_parameter_buffer: 0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            platform_guid: descriptor.platform_guid(),
            module_guid: descriptor.module_guid(),
            major_revision: 0,
            minor_revision: 0,
            runtime_mmio_ranges: 0,
            handlers,
        })
    }

    fn info_length(&self) -> Result<u16, PrmError> {
        self.handlers
            .len()
            .checked_mul(PrmtHandlerInfo::SIZE)
            .and_then(|n| n.checked_add(PrmtModuleInfo::SIZE))
            .and_then(|n| u16::try_from(n).ok())
            .ok_or(PrmError::TooManyHandlers)
    }
}

/// Builds the `PRMT` table for `modules`.
///
/// # Errors
///
/// Returns [`PrmError::PlatformMismatch`] if a module was built for another
/// platform and [`PrmError::TooManyHandlers`] if a count or length overflows
/// its field.
pub fn build(config: &PrmtConfig, modules: &[PrmtModule]) -> Result<Vec<u8>, PrmError> {
    let mut body = Vec::new();
    for module in modules {
        if module.platform_guid != config.platform_guid {
            log::warn!(
                "prmt: module {} targets {}, not {}",
                module.module_guid,
                module.platform_guid,
                config.platform_guid
            );
            return Err(PrmError::PlatformMismatch);
        }
        let info = PrmtModuleInfo {
            structure_revision: PRMT_STRUCTURE_REVISION,
            structure_length: module.info_length()?,
            identifier: module.module_guid,
            major_revision: module.major_revision,
            minor_revision: module.minor_revision,
            handler_info_count: u16::try_from(module.handlers.len())
                .map_err(|_| PrmError::TooManyHandlers)?,
            handler_info_offset: PrmtModuleInfo::SIZE as u32,
            runtime_mmio_ranges: module.runtime_mmio_ranges,
        };
        body.extend_from_slice(info.as_bytes());
        for handler in &module.handlers {
            let info = PrmtHandlerInfo {
                structure_revision: PRMT_STRUCTURE_REVISION,
                structure_length: PrmtHandlerInfo::SIZE as u16,
                identifier: handler.guid,
                physical_address: handler.physical_address,
                static_data_buffer: handler.static_data_buffer,
                acpi_parameter_buffer: handler.acpi_parameter_buffer,
            };
            body.extend_from_slice(info.as_bytes());
        }
    }

    let length = u32::try_from(PRMT_MODULE_INFO_OFFSET + body.len())
        .map_err(|_| PrmError::TooManyHandlers)?;
    let header = SdtHeader {
        signature: PRMT_SIGNATURE,
        length,
        revision: PRMT_REVISION,
        checksum: 0,
        oem_id: config.oem_id,
        oem_table_id: config.oem_table_id,
        oem_revision: config.oem_revision,
        creator_id: u32::from_le_bytes(config.creator_id),
        creator_revision: config.creator_revision,
    };
    let platform = PrmtPlatformHeader {
        platform_guid: config.platform_guid,
        module_info_offset: PRMT_MODULE_INFO_OFFSET as u32,
        module_info_count: u32::try_from(modules.len()).map_err(|_| PrmError::TooManyHandlers)?,
    };

    let mut table = Vec::with_capacity(length as usize);
    table.extend_from_slice(header.as_bytes());
    table.extend_from_slice(platform.as_bytes());
    table.extend_from_slice(&body);
    sdt::update_checksum(&mut table);
    log::debug!(
        "prmt: {} modules, {} bytes",
        modules.len(),
        table.len()
    );
    Ok(table)
}

/// Reads a `PRMT` table back into its platform GUID and modules.
///
/// # Errors
///
/// Returns [`PrmError::InvalidSignature`] if the header or checksum does not
/// validate, [`PrmError::UnsupportedRevision`] for newer structures and
/// [`PrmError::TruncatedData`] if a structure runs past the table.
pub fn parse(data: &[u8]) -> Result<(EfiGuid, Vec<PrmtModule>), PrmError> {
    let header = sdt::validate_table(data, Some(&PRMT_SIGNATURE)).map_err(|e| match e {
        ember_acpi::AcpiError::TruncatedData => PrmError::TruncatedData,
        _ => PrmError::InvalidSignature,
    })?;
    let table = &data[..header.length() as usize];
    let platform =
        PrmtPlatformHeader::read_at(table, SdtHeader::SIZE).ok_or(PrmError::TruncatedData)?;
    let platform_guid = platform.platform_guid;

    let mut modules = Vec::new();
    let mut offset = platform.module_info_offset as usize;
    for _ in 0..platform.module_info_count {
        let info = PrmtModuleInfo::read_at(table, offset).ok_or(PrmError::TruncatedData)?;
        if info.structure_revision > PRMT_STRUCTURE_REVISION {
            return Err(PrmError::UnsupportedRevision);
        }
        let mut handler_offset = offset + info.handler_info_offset as usize;
        let mut handlers = Vec::with_capacity(usize::from(info.handler_info_count));
        for _ in 0..info.handler_info_count {
            let h = PrmtHandlerInfo::read_at(table, handler_offset)
                .ok_or(PrmError::TruncatedData)?;
            handlers.push(PrmtHandler {
                guid: h.identifier,
                physical_address: h.physical_address,
                static_data_buffer: h.static_data_buffer,
                acpi_parameter_buffer: h.acpi_parameter_buffer,
            });
            handler_offset += usize::from(h.structure_length).max(PrmtHandlerInfo::SIZE);
        }
        modules.push(PrmtModule {
            platform_guid,
            module_guid: info.identifier,
            major_revision: info.major_revision,
            minor_revision: info.minor_revision,
            runtime_mmio_ranges: info.runtime_mmio_ranges,
            handlers,
        });
        offset += usize::from(info.structure_length).max(PrmtModuleInfo::SIZE);
    }
    Ok((platform_guid, modules))
}

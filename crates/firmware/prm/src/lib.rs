//! `ember-prm` --- Platform Runtime Mechanism building blocks.
//!
//! A PRM module is a firmware image whose handlers the OS calls at runtime.
//! The OS learns about the handlers from a *module export descriptor*, a
//! bit-exact table exported under the symbol `PrmModuleExportDescriptor`:
//!
//! ```text
//! +0   u64   signature      "PRM_MEDT"
//! +8   u16   revision
//! +10  u16   handler count
//! +12  GUID  platform GUID
//! +28  GUID  module GUID
//! +44  { GUID handler, [u8; 128] name } x count
//! ```
//!
//! - [`descriptor`]: the table layout, a `const` constructor and a reader.
//! - [`prm_module_export!`]: builds the table at compile time and exports it.
//! - [`context`]: the `PRMC` context buffer, `PRMD` data buffers and the
//!   runtime MMIO range list passed to handlers.
//! - [`handler`]: the [`PrmHandler`] capability trait.
//! - [`prmt`] (feature `alloc`): the loader-side `PRMT` ACPI table builder.

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod context;
pub mod descriptor;
mod export;
pub mod handler;
#[cfg(feature = "alloc")]
pub mod prmt;

pub use context::{
    MmioRanges, PrmContextBuffer, PrmDataBuffer, PrmDataBufferHeader, PrmRuntimeMmioRange,
};
pub use descriptor::{
    ExportDescriptor, PrmHandlerExportDescriptor, PrmModuleExportDescriptor,
    PrmModuleExportDescriptorHeader,
};
pub use handler::{NullPrmHandler, PrmHandler, PrmHandlerFn};

use core::fmt;

use ember_uefi::EfiStatus;

/// Errors produced while building or reading PRM structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrmError {
    /// A structure signature did not match.
    InvalidSignature,
    /// The structure revision is newer than this crate understands.
    UnsupportedRevision,
    /// A structure is shorter than its header claims.
    TruncatedData,
    /// A handler name is empty, not ASCII, or too long.
    InvalidName,
    /// More handlers or modules than the format can count.
    TooManyHandlers,
    /// A module was built for a different platform.
    PlatformMismatch,
    /// The requested handler or module is not present.
    NotFound,
    /// An output buffer is too small.
    BufferTooSmall,
}

impl fmt::Display for PrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidSignature => "bad PRM signature",
            Self::UnsupportedRevision => "unsupported PRM revision",
            Self::TruncatedData => "PRM structure is truncated",
            Self::InvalidName => "invalid PRM handler name",
            Self::TooManyHandlers => "too many PRM handlers",
            Self::PlatformMismatch => "PRM module platform GUID mismatch",
            Self::NotFound => "PRM handler not found",
            Self::BufferTooSmall => "buffer too small",
        })
    }
}

impl core::error::Error for PrmError {}

impl From<PrmError> for EfiStatus {
    fn from(e: PrmError) -> Self {
        match e {
            PrmError::UnsupportedRevision => EfiStatus::UNSUPPORTED,
            PrmError::TooManyHandlers => EfiStatus::OUT_OF_RESOURCES,
            PrmError::NotFound => EfiStatus::NOT_FOUND,
            PrmError::BufferTooSmall => EfiStatus::BUFFER_TOO_SMALL,
            PrmError::InvalidSignature
            | PrmError::TruncatedData
            | PrmError::InvalidName
            | PrmError::PlatformMismatch => EfiStatus::INVALID_PARAMETER,
        }
    }
}

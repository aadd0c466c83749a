//! `ember-acpi` --- a `no_std` toolkit for ACPI definition blocks.
//!
//! The crate has three layers:
//!
//! - [`sdt`]: the common System Description Table header and the table
//!   checksum rules.
//! - [`resource`]: decoding and encoding of the Resource Data descriptors
//!   found in `ResourceTemplate()` buffers (`_CRS`, `_PRS`, ...).
//! - [`aml`] (feature `alloc`, on by default): an editable AML object tree.
//!   A DSDT or SSDT is parsed into an arena of nodes, modified through
//!   structural edits and code-generation helpers, and serialized back with
//!   every PkgLength, the table length and the checksum kept consistent.
//!
//! # Usage
//!
//! ```ignore
//! let mut tree = AmlTree::parse(&ssdt_bytes)?;
//! let crs = tree.find_node(AmlTree::ROOT, "\\_SB.COM0._CRS")?;
//! tree.code_gen_rd_interrupt(InterruptFlags::CONSUMER, &[42], Some(crs))?;
//! let patched = tree.serialize()?;
//! ```

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
pub mod aml;
pub mod resource;
pub mod sdt;

pub use resource::{AcpiResource, InterruptFlags, ResourceIter};
pub use sdt::SdtHeader;

use core::fmt;

use ember_uefi::EfiStatus;

/// Errors that can occur while validating an ACPI table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiError {
    /// The checksum of a table did not validate (sum != 0).
    InvalidChecksum,
    /// The table signature did not match the expected value.
    InvalidSignature,
    /// A table or structure was too short to contain the expected data.
    TruncatedData,
}

impl fmt::Display for AcpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidChecksum => "ACPI table checksum mismatch",
            Self::InvalidSignature => "unexpected ACPI table signature",
            Self::TruncatedData => "ACPI table is truncated",
        })
    }
}

impl core::error::Error for AcpiError {}

impl From<AcpiError> for EfiStatus {
    fn from(e: AcpiError) -> Self {
        match e {
            AcpiError::InvalidChecksum => EfiStatus::CRC_ERROR,
            AcpiError::InvalidSignature | AcpiError::TruncatedData => EfiStatus::INVALID_PARAMETER,
        }
    }
}

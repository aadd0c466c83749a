//! Core UEFI types shared by the ember firmware libraries.
//!
//! Only the vocabulary the hand-off, AML and PRM crates need is carried
//! here:
//! - [`status`] - the `EFI_STATUS` word and its fixed set of codes
//! - [`guid`] - the GUID type and the well-known protocol/table GUIDs
//!
//! Boot and runtime service tables are out of scope; protocols are only
//! ever referred to by their GUID.

#![no_std]

pub mod guid;
pub mod status;

pub use guid::EfiGuid;
pub use status::EfiStatus;

/// A physical memory address.
pub type EfiPhysicalAddress = u64;

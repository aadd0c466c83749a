//! `ember-transfer-list` --- a `no_std` reader and builder for Firmware
//! Handoff Transfer Lists.
//!
//! A Transfer List is a self-describing blob passed between boot stages: a
//! 24-byte header followed by tagged, variable-length entries, each aligned
//! to the power of two declared in the header. The blob usually comes from
//! an earlier, less trusted stage, so every walk is bounds-checked against
//! `used_size` and never follows an entry that does not fit.
//!
//! Entries are addressed by their offset from the start of the list. The
//! list itself is required to sit at an address aligned to its declared
//! alignment, which makes offset alignment and address alignment the same.
//!
//! # Usage
//!
//! ```ignore
//! let tl = TransferList::new(blob)?;
//! if tl.check_header() == TransferListOps::Invalid {
//!     return Err(...);
//! }
//! if let Some(fdt) = tl.fdt() {
//!     // ...
//! }
//! for entry in tl.entries() {
//!     log::debug!("tag {:#x}: {} bytes", entry.tag_id(), entry.data_size());
//! }
//! ```

#![no_std]

pub mod builder;
pub mod header;

pub use builder::TransferListBuilder;
pub use header::{TransferEntryHeader, TransferListHeader, tag};

use core::fmt;

use ember_binparse::{FromBytes, align_up};
use ember_uefi::EfiStatus;
use header::{
    ENTRY_HEADER_SIZE, LIST_HEADER_SIZE, TRANSFER_LIST_FLAG_HAS_CHECKSUM,
    TRANSFER_LIST_SIGNATURE_32, TRANSFER_LIST_SIGNATURE_64, TRANSFER_LIST_VERSION,
};

/// Errors from constructing or editing a Transfer List.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferListError {
    /// The data is shorter than the header or a declared size.
    TruncatedData,
    /// The signature is not a Transfer List signature.
    InvalidSignature,
    /// The header failed validation (see [`TransferList::check_header`]).
    InvalidHeader,
    /// The declared alignment cannot be represented.
    InvalidAlignment,
    /// The list has no room for the requested entry.
    OutOfSpace,
    /// No valid entry starts at the given offset.
    EntryNotFound,
}

impl fmt::Display for TransferListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TruncatedData => "transfer list data is truncated",
            Self::InvalidSignature => "transfer list signature is invalid",
            Self::InvalidHeader => "transfer list header is invalid",
            Self::InvalidAlignment => "transfer list alignment is out of range",
            Self::OutOfSpace => "transfer list has no room for the entry",
            Self::EntryNotFound => "no transfer entry at the given offset",
        })
    }
}

impl core::error::Error for TransferListError {}

impl From<TransferListError> for EfiStatus {
    fn from(e: TransferListError) -> Self {
        match e {
            TransferListError::TruncatedData
            | TransferListError::InvalidSignature
            | TransferListError::InvalidHeader
            | TransferListError::InvalidAlignment => EfiStatus::INVALID_PARAMETER,
            TransferListError::OutOfSpace => EfiStatus::BUFFER_TOO_SMALL,
            TransferListError::EntryNotFound => EfiStatus::NOT_FOUND,
        }
    }
}

/// What a consumer may do with a list, as decided by [`TransferList::check_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferListOps {
    /// The list must not be used.
    Invalid,
    /// Same version as ours: read and modify.
    ReadWrite,
    /// Newer version: entries may be read but the list must not be modified.
    ReadOnly,
    /// Older version: only entries the consumer explicitly understands may be used.
    Custom,
}

/// A read-only view of a Transfer List.
#[derive(Clone, Copy)]
pub struct TransferList<'a> {
    data: &'a [u8],
    header: TransferListHeader,
}

impl<'a> TransferList<'a> {
    /// Wraps `data`, reading the list header.
    ///
    /// Only the presence of a header is checked here; use
    /// [`check_header`](Self::check_header) before trusting its fields.
    ///
    /// # Errors
    ///
    /// Returns [`TransferListError::TruncatedData`] if `data` is shorter than
    /// a list header.
    pub fn new(data: &'a [u8]) -> Result<Self, TransferListError> {
        let header = TransferListHeader::read_from(data).ok_or(TransferListError::TruncatedData)?;
        Ok(Self { data, header })
    }

    /// Returns a copy of the list header.
    #[must_use]
    pub fn header(&self) -> TransferListHeader {
        self.header
    }

    /// Bytes in use, as declared by the header.
    #[must_use]
    pub fn used_size(&self) -> usize {
        self.header.used_size as usize
    }

    /// Bytes available, as declared by the header.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.header.total_size as usize
    }

    /// Entry alignment in bytes, or `None` if the log2 value is out of range.
    #[must_use]
    pub fn alignment(&self) -> Option<usize> {
        1usize.checked_shl(u32::from(self.header.alignment))
    }

    /// The bytes covered by `used_size`, or `None` if it exceeds the data.
    #[must_use]
    pub fn used_bytes(&self) -> Option<&'a [u8]> {
        self.data.get(..self.used_size())
    }

    /// Returns `true` if the checksum covers the used bytes correctly.
    ///
    /// A list without [`TRANSFER_LIST_FLAG_HAS_CHECKSUM`] always verifies.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        if self.header.flags & TRANSFER_LIST_FLAG_HAS_CHECKSUM == 0 {
            return true;
        }
        self.used_bytes()
            .is_some_and(|bytes| bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)) == 0)
    }

    /// Classifies the header and decides how the list may be used.
    #[must_use]
    pub fn check_header(&self) -> TransferListOps {
        let hdr = &self.header;
        let signature = hdr.signature;

        if signature != TRANSFER_LIST_SIGNATURE_64 && signature != TRANSFER_LIST_SIGNATURE_32 {
            log::warn!("transfer list: bad signature {signature:#x}");
            return TransferListOps::Invalid;
        }
        if hdr.total_size == 0 {
            log::warn!("transfer list: zero total size");
            return TransferListOps::Invalid;
        }
        if hdr.used_size > hdr.total_size {
            log::warn!(
                "transfer list: used size {} exceeds total size {}",
                { hdr.used_size },
                { hdr.total_size }
            );
            return TransferListOps::Invalid;
        }
        if usize::from(hdr.header_size) != LIST_HEADER_SIZE {
            log::warn!("transfer list: unexpected header size {}", hdr.header_size);
            return TransferListOps::Invalid;
        }
        if !self.verify_checksum() {
            log::warn!("transfer list: checksum mismatch");
            return TransferListOps::Invalid;
        }

        match hdr.version {
            0 => TransferListOps::Invalid,
            TRANSFER_LIST_VERSION => TransferListOps::ReadWrite,
            v if v > TRANSFER_LIST_VERSION => TransferListOps::ReadOnly,
            _ => TransferListOps::Custom,
        }
    }

    /// Reads the entry at `offset`, provided it lies entirely within `used_size`.
    pub(crate) fn entry_at(&self, offset: usize) -> Option<TransferEntry<'a>> {
        let used = self.used_bytes()?;

        let header_end = offset.checked_add(ENTRY_HEADER_SIZE)?;
        if header_end > used.len() {
            return None;
        }

        let header = TransferEntryHeader::read_at(used, offset)?;
        // A header smaller than the fixed layout would let the walk stall.
        if usize::from(header.header_size) < ENTRY_HEADER_SIZE {
            return None;
        }

        let entry_end = offset
            .checked_add(usize::from(header.header_size))?
            .checked_add(header.data_size as usize)?;
        if entry_end > used.len() {
            return None;
        }

        Some(TransferEntry {
            list: used,
            offset,
            header,
        })
    }

    /// Returns the first entry, placed right after the list header, aligned.
    #[must_use]
    pub fn first_entry(&self) -> Option<TransferEntry<'a>> {
        let offset = align_up(usize::from(self.header.header_size), self.alignment()?)?;
        self.entry_at(offset)
    }

    /// Returns the entry following `current`, or the first entry for `None`.
    ///
    /// Returns `None` at the end of the list and whenever the next entry's
    /// position overflows or its header or payload would extend past
    /// `used_size`.
    #[must_use]
    pub fn next_entry(&self, current: Option<&TransferEntry<'_>>) -> Option<TransferEntry<'a>> {
        let Some(current) = current else {
            return self.first_entry();
        };

        let end = current
            .offset
            .checked_add(usize::from(current.header.header_size))?
            .checked_add(current.header.data_size as usize)?;
        let offset = align_up(end, self.alignment()?)?;
        self.entry_at(offset)
    }

    /// Returns the first valid entry carrying `tag_id`.
    #[must_use]
    pub fn find_first_entry(&self, tag_id: u16) -> Option<TransferEntry<'a>> {
        self.find_next_entry(None, tag_id)
    }

    /// Returns the next valid entry after `current` carrying `tag_id`.
    ///
    /// Entries with a non-zero reserved byte never match.
    #[must_use]
    pub fn find_next_entry(
        &self,
        current: Option<&TransferEntry<'_>>,
        tag_id: u16,
    ) -> Option<TransferEntry<'a>> {
        let mut entry = self.next_entry(current)?;
        loop {
            if entry.tag_id() == tag_id && entry.reserved() == 0 {
                return Some(entry);
            }
            entry = self.next_entry(Some(&entry))?;
        }
    }

    /// Returns the payload of `entry`; `None` for no entry or an empty payload.
    #[must_use]
    pub fn entry_data(entry: Option<&TransferEntry<'a>>) -> Option<&'a [u8]> {
        entry?.data()
    }

    /// Iterates over all entries in storage order.
    #[must_use]
    pub fn entries(&self) -> EntryIter<'a> {
        EntryIter {
            list: *self,
            next: self.first_entry(),
        }
    }

    /// Iterates over the valid entries carrying `tag_id`.
    pub fn entries_with_tag(&self, tag_id: u16) -> impl Iterator<Item = TransferEntry<'a>> + use<'a> {
        self.entries()
            .filter(move |e| e.tag_id() == tag_id && e.reserved() == 0)
    }

    /// Payload of the first flattened device tree entry.
    #[must_use]
    pub fn fdt(&self) -> Option<&'a [u8]> {
        Self::entry_data(self.find_first_entry(tag::FDT).as_ref())
    }

    /// Payload of the first HOB list entry.
    #[must_use]
    pub fn hob_list(&self) -> Option<&'a [u8]> {
        Self::entry_data(self.find_first_entry(tag::HOB_LIST).as_ref())
    }

    /// Payload of the first ACPI table aggregate entry.
    #[must_use]
    pub fn acpi_tables(&self) -> Option<&'a [u8]> {
        Self::entry_data(self.find_first_entry(tag::ACPI_TABLE_AGGREGATE).as_ref())
    }

    /// Logs the header and every entry at `info` level.
    pub fn dump(&self) {
        let h = &self.header;
        log::info!("Transfer list:");
        log::info!("  signature   {:#010x}", { h.signature });
        log::info!("  checksum    {:#04x}", h.checksum);
        log::info!("  version     {}", h.version);
        log::info!("  header size {}", h.header_size);
        log::info!("  alignment   {}", h.alignment);
        log::info!("  used size   {:#x}", { h.used_size });
        log::info!("  total size  {:#x}", { h.total_size });
        log::info!("  flags       {:#x}", { h.flags });
        for (i, entry) in self.entries().enumerate() {
            log::info!(
                "  entry {i}: tag {:#x} ({}) at {:#x}, header {} bytes, data {:#x} bytes",
                entry.tag_id(),
                tag::name(entry.tag_id()).unwrap_or("UNKNOWN"),
                entry.offset(),
                entry.header_size(),
                entry.data_size()
            );
        }
    }
}

impl fmt::Debug for TransferList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferList")
            .field("header", &self.header)
            .field("len", &self.data.len())
            .finish()
    }
}

/// One entry of a [`TransferList`], validated to lie within `used_size`.
#[derive(Clone, Copy)]
pub struct TransferEntry<'a> {
    /// The list's used bytes.
    list: &'a [u8],
    offset: usize,
    header: TransferEntryHeader,
}

impl<'a> TransferEntry<'a> {
    /// Offset of the entry header from the start of the list.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Tag identifying the payload.
    #[must_use]
    pub fn tag_id(&self) -> u16 {
        self.header.tag_id
    }

    /// Reserved byte; non-zero marks the entry as invalid.
    #[must_use]
    pub fn reserved(&self) -> u8 {
        self.header.reserved0
    }

    /// Size of the entry header.
    #[must_use]
    pub fn header_size(&self) -> u8 {
        self.header.header_size
    }

    /// Size of the payload.
    #[must_use]
    pub fn data_size(&self) -> u32 {
        self.header.data_size
    }

    /// The payload, starting `header_size` bytes into the entry.
    ///
    /// Returns `None` when the payload is empty.
    #[must_use]
    pub fn data(&self) -> Option<&'a [u8]> {
        if self.header.data_size == 0 {
            return None;
        }
        let start = self.offset + usize::from(self.header.header_size);
        // In bounds: `entry_at` checked the whole entry against `used_size`.
        self.list.get(start..start + self.header.data_size as usize)
    }
}

impl fmt::Debug for TransferEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEntry")
            .field("offset", &self.offset)
            .field("tag_id", &self.tag_id())
            .field("header_size", &self.header_size())
            .field("data_size", &self.data_size())
            .finish()
    }
}

/// Iterator over every entry of a [`TransferList`], in storage order.
pub struct EntryIter<'a> {
    list: TransferList<'a>,
    next: Option<TransferEntry<'a>>,
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = TransferEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = self.list.next_entry(Some(&current));
        Some(current)
    }
}

#[cfg(test)]
extern crate alloc;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use header::TRANSFER_LIST_DEFAULT_ALIGNMENT;

    // ---- Blob builder helpers -----------------------------------------------

    fn emit_header(v: &mut Vec<u8>, header_size: u8, alignment: u8, flags: u32) {
        v.extend_from_slice(&TRANSFER_LIST_SIGNATURE_64.to_le_bytes());
        v.push(0); // checksum
        v.push(TRANSFER_LIST_VERSION);
        v.push(header_size);
        v.push(alignment);
        v.extend_from_slice(&0u32.to_le_bytes()); // used_size, patched later
        v.extend_from_slice(&0u32.to_le_bytes()); // total_size, patched later
        v.extend_from_slice(&flags.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.resize(usize::from(header_size).max(LIST_HEADER_SIZE), 0);
    }

    fn pad_to(v: &mut Vec<u8>, align: usize) {
        while v.len() % align != 0 {
            v.push(0);
        }
    }

    fn emit_entry(v: &mut Vec<u8>, tag_id: u16, reserved: u8, data: &[u8]) {
        pad_to(v, 8);
        v.extend_from_slice(&tag_id.to_le_bytes());
        v.push(reserved);
        v.push(ENTRY_HEADER_SIZE as u8);
        v.extend_from_slice(&(data.len() as u32).to_le_bytes());
        v.extend_from_slice(data);
    }

    fn patch_sizes(v: &mut [u8], used: u32, total: u32) {
        v[8..12].copy_from_slice(&used.to_le_bytes());
        v[12..16].copy_from_slice(&total.to_le_bytes());
    }

    fn fix_checksum(v: &mut [u8]) {
        v[4] = 0;
        let used = u32::from_le_bytes([v[8], v[9], v[10], v[11]]) as usize;
        let sum = v[..used].iter().fold(0u8, |s, &b| s.wrapping_add(b));
        v[4] = 0u8.wrapping_sub(sum);
    }

    /// Header + FDT (5 bytes) + HOB list (8 bytes) + FDT (3 bytes).
    fn build_test_list() -> Vec<u8> {
        let mut v = Vec::new();
        emit_header(
            &mut v,
            LIST_HEADER_SIZE as u8,
            TRANSFER_LIST_DEFAULT_ALIGNMENT,
            TRANSFER_LIST_FLAG_HAS_CHECKSUM,
        );
        emit_entry(&mut v, tag::FDT, 0, b"\xd0\x0d\xfe\xed\x01");
        emit_entry(&mut v, tag::HOB_LIST, 0, &[0xAA; 8]);
        emit_entry(&mut v, tag::FDT, 0, &[1, 2, 3]);
        let used = v.len() as u32;
        v.resize(256, 0);
        patch_sizes(&mut v, used, 256);
        fix_checksum(&mut v);
        v
    }

    // ---- Walk tests ---------------------------------------------------------

    #[test]
    fn walk_visits_every_entry_once() {
        let blob = build_test_list();
        let tl = TransferList::new(&blob).unwrap();

        let first = tl.next_entry(None).unwrap();
        assert_eq!(first.offset(), 24);
        let second = tl.next_entry(Some(&first)).unwrap();
        assert_eq!(second.offset(), 40);
        let third = tl.next_entry(Some(&second)).unwrap();
        assert_eq!(third.offset(), 56);
        assert!(tl.next_entry(Some(&third)).is_none());

        let tags: Vec<u16> = tl.entries().map(|e| e.tag_id()).collect();
        assert_eq!(tags, &[tag::FDT, tag::HOB_LIST, tag::FDT]);
    }

    #[test]
    fn single_empty_entry_at_end_of_list() {
        // used_size 40, 8-byte alignment, header padded to 32 bytes,
        // one entry at 32 with an empty payload.
        let mut v = Vec::new();
        emit_header(&mut v, 32, 3, 0);
        emit_entry(&mut v, 0x42, 0, &[]);
        assert_eq!(v.len(), 40);
        patch_sizes(&mut v, 40, 64);
        v.resize(64, 0);

        let tl = TransferList::new(&v).unwrap();
        let first = tl.first_entry().unwrap();
        assert_eq!(first.offset(), 32);
        assert_eq!(first.header_size(), 8);
        assert_eq!(first.data_size(), 0);
        assert!(tl.next_entry(Some(&first)).is_none());
        assert!(first.data().is_none());
    }

    #[test]
    fn oversized_data_size_yields_none() {
        let mut v = Vec::new();
        emit_header(&mut v, LIST_HEADER_SIZE as u8, 3, 0);
        emit_entry(&mut v, tag::FDT, 0, &[0; 4]);
        // Last entry claims an enormous payload.
        pad_to(&mut v, 8);
        let bad = v.len();
        emit_entry(&mut v, tag::HOB_LIST, 0, &[]);
        v[bad + 4..bad + 8].copy_from_slice(&u32::MAX.to_le_bytes());
        let used = v.len() as u32;
        patch_sizes(&mut v, used, used);

        let tl = TransferList::new(&v).unwrap();
        let first = tl.first_entry().unwrap();
        assert!(tl.next_entry(Some(&first)).is_none());
        assert_eq!(tl.entries().count(), 1);
    }

    #[test]
    fn entry_header_past_used_size_yields_none() {
        let mut v = Vec::new();
        emit_header(&mut v, LIST_HEADER_SIZE as u8, 3, 0);
        emit_entry(&mut v, tag::FDT, 0, &[0; 8]);
        emit_entry(&mut v, tag::HOB_LIST, 0, &[0; 8]);
        // Cut used_size in the middle of the second entry's header.
        let total = v.len() as u32;
        patch_sizes(&mut v, 44, total);

        let tl = TransferList::new(&v).unwrap();
        let first = tl.first_entry().unwrap();
        assert!(tl.next_entry(Some(&first)).is_none());
    }

    #[test]
    fn used_size_past_data_yields_nothing() {
        let mut v = build_test_list();
        patch_sizes(&mut v, 4096, 4096);
        let tl = TransferList::new(&v).unwrap();
        assert!(tl.first_entry().is_none());
        assert!(!tl.verify_checksum());
    }

    #[test]
    fn huge_alignment_yields_nothing() {
        let mut v = build_test_list();
        v[7] = 200;
        let tl = TransferList::new(&v).unwrap();
        assert!(tl.alignment().is_none());
        assert!(tl.first_entry().is_none());
    }

    #[test]
    fn zero_sized_entry_header_stops_walk() {
        let mut v = Vec::new();
        emit_header(&mut v, LIST_HEADER_SIZE as u8, 3, 0);
        emit_entry(&mut v, tag::FDT, 0, &[]);
        v[24 + 3] = 0; // header_size = 0
        let used = v.len() as u32;
        patch_sizes(&mut v, used, used);

        let tl = TransferList::new(&v).unwrap();
        assert!(tl.first_entry().is_none());
    }

    // ---- Find tests ---------------------------------------------------------

    #[test]
    fn find_returns_matching_subsequence() {
        let blob = build_test_list();
        let tl = TransferList::new(&blob).unwrap();

        let first = tl.find_first_entry(tag::FDT).unwrap();
        assert_eq!(first.offset(), 24);
        let second = tl.find_next_entry(Some(&first), tag::FDT).unwrap();
        assert_eq!(second.offset(), 56);
        assert!(tl.find_next_entry(Some(&second), tag::FDT).is_none());

        assert_eq!(tl.entries_with_tag(tag::HOB_LIST).count(), 1);
        assert!(tl.find_first_entry(tag::TPM_EVENT_LOG).is_none());
    }

    #[test]
    fn find_skips_reserved_entries() {
        let mut v = Vec::new();
        emit_header(&mut v, LIST_HEADER_SIZE as u8, 3, 0);
        emit_entry(&mut v, tag::FDT, 1, &[9; 4]);
        emit_entry(&mut v, tag::FDT, 0, &[7; 4]);
        let used = v.len() as u32;
        patch_sizes(&mut v, used, used);

        let tl = TransferList::new(&v).unwrap();
        let found = tl.find_first_entry(tag::FDT).unwrap();
        assert_eq!(found.offset(), 40);
        assert_eq!(tl.fdt(), Some(&[7u8; 4][..]));
    }

    // ---- Data tests ---------------------------------------------------------

    #[test]
    fn entry_data_offsets() {
        let blob = build_test_list();
        let tl = TransferList::new(&blob).unwrap();

        assert!(TransferList::entry_data(None).is_none());
        let hob = tl.find_first_entry(tag::HOB_LIST).unwrap();
        let data = TransferList::entry_data(Some(&hob)).unwrap();
        assert_eq!(data, &[0xAA; 8]);
        assert_eq!(
            data.as_ptr() as usize - blob.as_ptr() as usize,
            hob.offset() + usize::from(hob.header_size())
        );
        assert_eq!(tl.hob_list().map(<[u8]>::len), Some(8));
        assert_eq!(tl.fdt(), Some(&b"\xd0\x0d\xfe\xed\x01"[..]));
        assert!(tl.acpi_tables().is_none());
    }

    // ---- Header checks ------------------------------------------------------

    #[test]
    fn check_header_valid() {
        let blob = build_test_list();
        let tl = TransferList::new(&blob).unwrap();
        assert!(tl.verify_checksum());
        assert_eq!(tl.check_header(), TransferListOps::ReadWrite);
    }

    #[test]
    fn check_header_versions() {
        let mut blob = build_test_list();
        blob[5] = TRANSFER_LIST_VERSION + 1;
        fix_checksum(&mut blob);
        assert_eq!(
            TransferList::new(&blob).unwrap().check_header(),
            TransferListOps::ReadOnly
        );

        blob[5] = 0;
        fix_checksum(&mut blob);
        assert_eq!(
            TransferList::new(&blob).unwrap().check_header(),
            TransferListOps::Invalid
        );
    }

    #[test]
    fn check_header_rejects_corruption() {
        let mut blob = build_test_list();
        blob[33] ^= 0xFF; // corrupt a payload byte
        assert_eq!(
            TransferList::new(&blob).unwrap().check_header(),
            TransferListOps::Invalid
        );

        let mut blob = build_test_list();
        blob[0] = 0;
        assert_eq!(
            TransferList::new(&blob).unwrap().check_header(),
            TransferListOps::Invalid
        );

        let mut blob = build_test_list();
        patch_sizes(&mut blob, 300, 256);
        assert_eq!(
            TransferList::new(&blob).unwrap().check_header(),
            TransferListOps::Invalid
        );
    }

    #[test]
    fn truncated_header() {
        let blob = build_test_list();
        assert_eq!(
            TransferList::new(&blob[..10]).unwrap_err(),
            TransferListError::TruncatedData
        );
    }

    #[test]
    fn errors_map_to_status() {
        assert_eq!(
            EfiStatus::from(TransferListError::OutOfSpace),
            EfiStatus::BUFFER_TOO_SMALL
        );
        assert_eq!(
            EfiStatus::from(TransferListError::EntryNotFound),
            EfiStatus::NOT_FOUND
        );
    }
}

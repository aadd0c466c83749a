//! In-place construction and editing of a Transfer List.

use ember_binparse::{AsBytes, FromBytes, align_up};

use crate::header::{
    ENTRY_HEADER_SIZE, LIST_HEADER_SIZE, TRANSFER_LIST_FLAG_HAS_CHECKSUM,
    TRANSFER_LIST_SIGNATURE_64, TRANSFER_LIST_VERSION, TransferEntryHeader, TransferListHeader,
    tag,
};
use crate::{TransferList, TransferListError, TransferListOps};

/// Builds a Transfer List inside a caller-provided buffer.
///
/// The whole buffer becomes the list's `total_size`. Every mutation keeps
/// the checksum current, so the buffer is a valid list between calls.
pub struct TransferListBuilder<'a> {
    buf: &'a mut [u8],
    header: TransferListHeader,
}

impl<'a> TransferListBuilder<'a> {
    /// Zeroes `buf` and writes an empty list header into it.
    ///
    /// `alignment` is the log2 of the entry alignment.
    ///
    /// # Errors
    ///
    /// - [`TransferListError::TruncatedData`] if `buf` cannot hold a header
    ///   or is larger than a `u32` can describe.
    /// - [`TransferListError::InvalidAlignment`] if `1 << alignment` does
    ///   not fit in a `usize`.
    pub fn init(buf: &'a mut [u8], alignment: u8) -> Result<Self, TransferListError> {
        let total = u32::try_from(buf.len()).map_err(|_| TransferListError::TruncatedData)?;
        if buf.len() < LIST_HEADER_SIZE {
            return Err(TransferListError::TruncatedData);
        }
        if 1usize.checked_shl(u32::from(alignment)).is_none() {
            return Err(TransferListError::InvalidAlignment);
        }

        buf.fill(0);
        let header = TransferListHeader {
            signature: TRANSFER_LIST_SIGNATURE_64,
            checksum: 0,
            version: TRANSFER_LIST_VERSION,
            header_size: LIST_HEADER_SIZE as u8,
            alignment,
            used_size: LIST_HEADER_SIZE as u32,
            total_size: total,
            flags: TRANSFER_LIST_FLAG_HAS_CHECKSUM,
            reserved: 0,
        };
        let mut builder = Self { buf, header };
        builder.update_checksum();
        Ok(builder)
    }

    /// Reopens an existing list for editing.
    ///
    /// # Errors
    ///
    /// Returns [`TransferListError::InvalidHeader`] unless the list is valid
    /// and of our own version, and [`TransferListError::TruncatedData`] if
    /// its declared total size exceeds `buf`.
    pub fn open(buf: &'a mut [u8]) -> Result<Self, TransferListError> {
        let list = TransferList::new(buf)?;
        if list.check_header() != TransferListOps::ReadWrite {
            return Err(TransferListError::InvalidHeader);
        }
        if list.total_size() > buf.len() {
            return Err(TransferListError::TruncatedData);
        }
        let header = list.header();
        Ok(Self { buf, header })
    }

    fn write_header(&mut self) {
        // Cannot fail: the buffer holds at least a header.
        let _ = self.header.write_at(self.buf, 0);
    }

    /// Appends an entry, returning its offset from the start of the list.
    ///
    /// The entry header starts at the next aligned offset after the used
    /// area; padding bytes are zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferListError::OutOfSpace`] if the entry does not fit
    /// in `total_size`, and [`TransferListError::InvalidAlignment`] if the
    /// list's alignment is unusable.
    pub fn add_entry(&mut self, tag_id: u16, data: &[u8]) -> Result<usize, TransferListError> {
        let header = self.header;
        let align = 1usize
            .checked_shl(u32::from(header.alignment))
            .ok_or(TransferListError::InvalidAlignment)?;
        let data_size = u32::try_from(data.len()).map_err(|_| TransferListError::OutOfSpace)?;

        let used = header.used_size as usize;
        let offset = align_up(used, align).ok_or(TransferListError::OutOfSpace)?;
        let data_start = offset
            .checked_add(ENTRY_HEADER_SIZE)
            .ok_or(TransferListError::OutOfSpace)?;
        let end = data_start
            .checked_add(data.len())
            .ok_or(TransferListError::OutOfSpace)?;
        if end > header.total_size as usize || end > self.buf.len() {
            log::debug!(
                "transfer list: entry {tag_id:#x} of {} bytes does not fit",
                data.len()
            );
            return Err(TransferListError::OutOfSpace);
        }

        self.buf[used..offset].fill(0);
        let entry = TransferEntryHeader {
            tag_id,
            reserved0: 0,
            header_size: ENTRY_HEADER_SIZE as u8,
            data_size,
        };
        entry
            .write_at(self.buf, offset)
            .ok_or(TransferListError::OutOfSpace)?;
        self.buf[data_start..end].copy_from_slice(data);

        // `end <= total_size`, which is a u32.
        self.header.used_size = end as u32;
        self.update_checksum();
        Ok(offset)
    }

    /// Marks the entry at `offset` as void by retagging it [`tag::EMPTY`].
    ///
    /// The space is not reclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferListError::EntryNotFound`] if no valid entry header
    /// lies at `offset`.
    pub fn remove_entry(&mut self, offset: usize) -> Result<(), TransferListError> {
        let entry = self
            .as_list()?
            .entries()
            .find(|e| e.offset() == offset)
            .ok_or(TransferListError::EntryNotFound)?;

        let mut header = TransferEntryHeader::read_at(self.buf, entry.offset())
            .ok_or(TransferListError::EntryNotFound)?;
        header.tag_id = tag::EMPTY;
        header
            .write_at(self.buf, offset)
            .ok_or(TransferListError::EntryNotFound)?;
        self.update_checksum();
        Ok(())
    }

    /// Recomputes the checksum so the used bytes sum to zero.
    ///
    /// Does nothing when the list does not carry a checksum.
    pub fn update_checksum(&mut self) {
        self.header.checksum = 0;
        self.write_header();
        if self.header.flags & TRANSFER_LIST_FLAG_HAS_CHECKSUM == 0 {
            return;
        }

        let used = (self.header.used_size as usize).min(self.buf.len());
        let sum = self.buf[..used]
            .iter()
            .fold(0u8, |s, &b| s.wrapping_add(b));
        self.header.checksum = 0u8.wrapping_sub(sum);
        self.write_header();
    }

    /// Returns a read-only view of the list as built so far.
    ///
    /// # Errors
    ///
    /// Only fails if the buffer no longer holds a header, which the builder
    /// never allows.
    pub fn as_list(&self) -> Result<TransferList<'_>, TransferListError> {
        TransferList::new(self.buf)
    }

    /// Consumes the builder, returning the used bytes of the list.
    #[must_use]
    pub fn finish(self) -> &'a [u8] {
        let used = (self.header.used_size as usize).min(self.buf.len());
        let buf: &'a [u8] = self.buf;
        &buf[..used]
    }
}

//! `ember-binparse` --- zero-copy helpers for firmware binary formats.
//!
//! Firmware hand-off blobs, ACPI tables and PRM export tables are all packed
//! little-endian records. This crate provides:
//!
//! - [`FromBytes`]: read a plain-old-data record out of a byte slice at any
//!   offset (unaligned, bounds-checked).
//! - [`AsBytes`]: view a padding-free record as bytes, or write it into a
//!   buffer.
//! - [`BinaryReader`]: a forward cursor over a byte slice.
//! - [`align_up`]: overflow-checked power-of-two alignment.
//!
//! Both traits can be derived with `#[derive(FromBytes, AsBytes)]`.
//!
//! All records are interpreted in host byte order; the formats handled by
//! this workspace are little-endian and so are the hosts it targets.

#![no_std]

// Lets the derive macros refer to `ember_binparse::...` from inside this crate.
extern crate self as ember_binparse;

mod reader;

pub use ember_binparse_macros::{AsBytes, FromBytes};
pub use reader::BinaryReader;

use core::mem::size_of;

/// Marker for types that can be created from any byte pattern.
///
/// # Safety
///
/// Implementors must be `Copy`, have a stable layout (`#[repr(C)]`,
/// `#[repr(C, packed)]` or `#[repr(transparent)]`), and every bit pattern of
/// `size_of::<Self>()` bytes must be a valid value.
pub unsafe trait FromBytes: Copy {
    /// Reads `Self` from the start of `data`.
    ///
    /// Returns `None` if `data` is shorter than `size_of::<Self>()`.
    #[must_use]
    fn read_from(data: &[u8]) -> Option<Self> {
        Self::read_at(data, 0)
    }

    /// Reads `Self` from `data` at byte `offset`.
    ///
    /// Returns `None` if the record does not fit, including when
    /// `offset + size_of::<Self>()` overflows.
    #[must_use]
    fn read_at(data: &[u8], offset: usize) -> Option<Self> {
        let end = offset.checked_add(size_of::<Self>())?;
        let bytes = data.get(offset..end)?;
        // SAFETY: `bytes` holds exactly `size_of::<Self>()` readable bytes and
        // the trait contract guarantees any bit pattern is a valid `Self`.
        Some(unsafe { core::ptr::read_unaligned(bytes.as_ptr().cast::<Self>()) })
    }
}

/// Marker for types whose in-memory representation is exactly their bytes.
///
/// # Safety
///
/// Implementors must be `Copy`, have a stable layout and contain no padding
/// bytes, so every byte of the value is initialized.
pub unsafe trait AsBytes: Copy {
    /// Returns the raw bytes of this value.
    #[must_use]
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: the trait contract guarantees `size_of::<Self>()` initialized
        // bytes with no padding.
        unsafe {
            core::slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>())
        }
    }

    /// Writes this value into `buf` at byte `offset`.
    ///
    /// Returns `None` (leaving `buf` untouched) if the record does not fit.
    fn write_at(&self, buf: &mut [u8], offset: usize) -> Option<()> {
        let end = offset.checked_add(size_of::<Self>())?;
        buf.get_mut(offset..end)?.copy_from_slice(self.as_bytes());
        Some(())
    }
}

macro_rules! impl_primitives {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive integers accept every bit pattern and have no padding.
            unsafe impl FromBytes for $ty {}
            // SAFETY: as above.
            unsafe impl AsBytes for $ty {}
        )*
    };
}

impl_primitives!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

// SAFETY: an array of `FromBytes` elements is valid for every bit pattern.
unsafe impl<T: FromBytes, const N: usize> FromBytes for [T; N] {}
// SAFETY: arrays have no padding between elements beyond what `T` carries.
unsafe impl<T: AsBytes, const N: usize> AsBytes for [T; N] {}

/// Rounds `value` up to a multiple of `align`, which must be a power of two.
///
/// Returns `None` on overflow or if `align` is not a power of two.
#[must_use]
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    if !align.is_power_of_two() {
        return None;
    }
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, AsBytes)]
    #[repr(C, packed)]
    struct Record {
        tag: u16,
        flags: u8,
        size: u8,
        value: u32,
    }

    #[test]
    fn read_unaligned_record() {
        let data = [0xFF, 0x01, 0x00, 0x02, 0x08, 0x44, 0x33, 0x22, 0x11];
        let rec = Record::read_at(&data, 1).unwrap();
        assert_eq!({ rec.tag }, 1);
        assert_eq!(rec.flags, 2);
        assert_eq!(rec.size, 8);
        assert_eq!({ rec.value }, 0x1122_3344);
    }

    #[test]
    fn read_out_of_bounds() {
        let data = [0u8; 7];
        assert!(Record::read_from(&data).is_none());
        assert!(u32::read_at(&data, 4).is_none());
        assert!(u8::read_at(&data, usize::MAX).is_none());
    }

    #[test]
    fn write_and_reread() {
        let rec = Record {
            tag: 0x0304,
            flags: 0,
            size: 8,
            value: 0xDEAD_BEEF,
        };
        let mut buf = [0u8; 10];
        rec.write_at(&mut buf, 2).unwrap();
        assert_eq!(&buf[2..4], &[0x04, 0x03]);
        assert_eq!(Record::read_at(&buf, 2), Some(rec));
        assert!(rec.write_at(&mut buf, 3).is_none());
    }

    #[test]
    fn align_up_values() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(24, 8), Some(24));
        assert_eq!(align_up(25, 8), Some(32));
        assert_eq!(align_up(40, 1), Some(40));
        assert_eq!(align_up(usize::MAX, 8), None);
        assert_eq!(align_up(8, 3), None);
    }
}

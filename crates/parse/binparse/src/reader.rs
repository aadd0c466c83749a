//! Forward-only cursor over a byte slice.

use crate::FromBytes;

/// A bounds-checked cursor over a byte slice.
///
/// Reads never panic: a read past the end returns `None` and leaves the
/// position unchanged, and [`skip`](Self::skip) clamps at the end of the data.
#[derive(Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads a `T` at the current position and advances past it.
    pub fn read<T: FromBytes>(&mut self) -> Option<T> {
        let value = T::read_at(self.data, self.pos)?;
        self.pos += core::mem::size_of::<T>();
        Some(value)
    }

    /// Reads a `T` at the current position without advancing.
    #[must_use]
    pub fn peek<T: FromBytes>(&self) -> Option<T> {
        T::read_at(self.data, self.pos)
    }

    /// Reads `len` bytes and advances past them.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Advances by `n` bytes, stopping at the end of the data.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    /// Current offset from the start of the data.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying data.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once every byte has been consumed.
    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }

    /// The whole underlying slice.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }
}

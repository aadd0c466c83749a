//! PkgLength encoding.
//!
//! A PkgLength is 1 to 4 bytes long and its value counts its own bytes plus
//! everything that follows it up to the end of the enclosing object. A
//! value below `0x40` fits the single-byte form; otherwise bits 7:6 of the
//! lead byte give the number of extra bytes, the lead byte carries the low
//! nibble and each extra byte the next 8 bits.

use ember_binparse::BinaryReader;

use super::AmlError;

/// Largest value a PkgLength can encode.
pub const MAX_PKG_LEN: u32 = 0x0FFF_FFFF;

/// Number of bytes needed to encode the PkgLength value `total`.
///
/// Returns `None` above [`MAX_PKG_LEN`].
#[must_use]
pub const fn encoding_width(total: u32) -> Option<usize> {
    match total {
        0..0x40 => Some(1),
        0x40..0x1000 => Some(2),
        0x1000..0x10_0000 => Some(3),
        0x10_0000..0x1000_0000 => Some(4),
        _ => None,
    }
}

/// Computes the PkgLength value for an object whose content after the
/// PkgLength is `content` bytes long.
///
/// Returns `None` if the result does not fit in a PkgLength.
#[must_use]
pub fn total_for_content(content: usize) -> Option<u32> {
    (1..=4).find_map(|width| {
        let total = u32::try_from(content.checked_add(width)?).ok()?;
        (encoding_width(total)? == width).then_some(total)
    })
}

/// Encodes `total`, returning the bytes and how many of them are used.
#[must_use]
pub fn encode(total: u32) -> Option<([u8; 4], usize)> {
    let width = encoding_width(total)?;
    let mut out = [0u8; 4];
    if width == 1 {
        out[0] = total as u8;
    } else {
        out[0] = (((width - 1) as u8) << 6) | (total & 0x0F) as u8;
        for (i, byte) in out[1..width].iter_mut().enumerate() {
            *byte = (total >> (4 + 8 * i)) as u8;
        }
    }
    Some((out, width))
}

/// Decodes a PkgLength, returning its value and encoded width.
///
/// # Errors
///
/// Returns [`AmlError::UnexpectedEnd`] if the encoding is truncated and
/// [`AmlError::InvalidAml`] if the reserved lead-byte bits are set or the
/// value is smaller than the encoding itself.
pub fn decode(reader: &mut BinaryReader<'_>) -> Result<(u32, usize), AmlError> {
    let lead = reader.read::<u8>().ok_or(AmlError::UnexpectedEnd)?;
    let extra = usize::from(lead >> 6);

    if extra == 0 {
        let total = u32::from(lead & 0x3F);
        if total < 1 {
            return Err(AmlError::InvalidAml);
        }
        return Ok((total, 1));
    }

    if lead & 0x30 != 0 {
        return Err(AmlError::InvalidAml);
    }

    let mut total = u32::from(lead & 0x0F);
    for i in 0..extra {
        let b = reader.read::<u8>().ok_or(AmlError::UnexpectedEnd)?;
        total |= u32::from(b) << (4 + i * 8);
    }

    let width = 1 + extra;
    if (total as usize) < width {
        return Err(AmlError::InvalidAml);
    }
    Ok((total, width))
}

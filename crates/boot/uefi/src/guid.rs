//! UEFI Globally Unique Identifier (GUID) type and well-known constants.
//!
//! Every protocol, PPI, configuration table and PRM handler is named by a
//! 128-bit [`EfiGuid`]. The in-memory layout is the UEFI mixed-endian one
//! (`data1..data3` little-endian, `data4` as bytes), so a GUID can be read
//! straight out of a table with [`FromBytes`].

use core::fmt;

use ember_binparse::{AsBytes, FromBytes};

/// A UEFI Globally Unique Identifier.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, FromBytes)]
pub struct EfiGuid {
    /// The first 32 bits of the GUID.
    pub data1: u32,
    /// The next 16 bits of the GUID.
    pub data2: u16,
    /// The next 16 bits of the GUID.
    pub data3: u16,
    /// The remaining 64 bits of the GUID.
    pub data4: [u8; 8],
}

// SAFETY: `repr(C)` with fields 4 + 2 + 2 + 8 bytes at natural offsets; there
// is no padding (checked below).
unsafe impl AsBytes for EfiGuid {}

#[expect(
    clippy::unreadable_literal,
    reason = "GUID bytes are inherently opaque"
)]
impl EfiGuid {
    /// The all-zero GUID.
    pub const ZERO: Self = Self::new(0, 0, 0, [0; 8]);

    /// Creates a new GUID from its component parts.
    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    // ── Protocol GUIDs ───────────────────────────────────────────────

    /// Framework SMM Software Dispatch Protocol.
    pub const SMM_SW_DISPATCH_PROTOCOL: Self = Self::new(
        0xe541b773,
        0xdd11,
        0x420c,
        [0xb0, 0x26, 0xdf, 0x99, 0x36, 0x53, 0xf8, 0xbf],
    );

    /// PI SMM Software Dispatch 2 Protocol.
    pub const SMM_SW_DISPATCH2_PROTOCOL: Self = Self::new(
        0x18a3c6dc,
        0x5eea,
        0x48c8,
        [0xa1, 0xc1, 0xb5, 0x33, 0x89, 0xf9, 0x89, 0x99],
    );

    /// Framework ACPI Support Protocol.
    pub const ACPI_SUPPORT_PROTOCOL: Self = Self::new(
        0xdbff9d55,
        0x89b7,
        0x46da,
        [0xbd, 0xdf, 0x67, 0x7d, 0x3d, 0xc0, 0x24, 0x1d],
    );

    /// ACPI Table Protocol.
    pub const ACPI_TABLE_PROTOCOL: Self = Self::new(
        0xffe06bdd,
        0x6107,
        0x46a6,
        [0x7b, 0xb2, 0x5a, 0x9c, 0x7e, 0xc5, 0x27, 0x5c],
    );

    // ── Configuration Table GUIDs ────────────────────────────────────

    /// HOB list configuration table.
    pub const HOB_LIST: Self = Self::new(
        0x7739f24c,
        0x93d7,
        0x11d4,
        [0x9a, 0x3a, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
    );

    /// ACPI 2.0 Table GUID.
    pub const ACPI_20_TABLE: Self = Self::new(
        0x8868e871,
        0xe4f1,
        0x11d3,
        [0xbc, 0x22, 0x00, 0x80, 0xc7, 0x3c, 0x88, 0x81],
    );

    /// ACPI 1.0 Table GUID.
    pub const ACPI_TABLE: Self = Self::new(
        0xeb9d2d30,
        0x2d88,
        0x11d3,
        [0x9a, 0x16, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
    );

    /// Device Tree Table GUID.
    pub const DEVICE_TREE_TABLE: Self = Self::new(
        0xb1b621d5,
        0xf19c,
        0x41a5,
        [0x83, 0x0b, 0xd9, 0x15, 0x2c, 0x69, 0xaa, 0xe0],
    );

    /// Parses a GUID in registry format, `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
    ///
    /// Braces around the GUID are accepted. Returns `None` on any other input.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(s);
        let b = s.as_bytes();
        if b.len() != 36 || b[8] != b'-' || b[13] != b'-' || b[18] != b'-' || b[23] != b'-' {
            return None;
        }

        let data1 = u32::from_str_radix(s.get(0..8)?, 16).ok()?;
        let data2 = u16::from_str_radix(s.get(9..13)?, 16).ok()?;
        let data3 = u16::from_str_radix(s.get(14..18)?, 16).ok()?;

        let mut data4 = [0u8; 8];
        let tail = [19, 21, 24, 26, 28, 30, 32, 34];
        for (byte, start) in data4.iter_mut().zip(tail) {
            *byte = u8::from_str_radix(s.get(start..start + 2)?, 16).ok()?;
        }

        Some(Self::new(data1, data2, data3, data4))
    }
}

impl fmt::Debug for EfiGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EfiGuid({self})")
    }
}

impl fmt::Display for EfiGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7],
        )
    }
}

const _: () = assert!(core::mem::size_of::<EfiGuid>() == 16);

#[cfg(test)]
mod tests {
    extern crate std;
    use std::string::ToString;

    use super::*;

    #[test]
    fn display_round_trips_through_parse() {
        let text = EfiGuid::ACPI_TABLE_PROTOCOL.to_string();
        assert_eq!(text, "ffe06bdd-6107-46a6-7bb2-5a9c7ec5275c");
        assert_eq!(EfiGuid::parse(&text), Some(EfiGuid::ACPI_TABLE_PROTOCOL));
        assert_eq!(
            EfiGuid::parse("{7739F24C-93D7-11D4-9A3A-0090273FC14D}"),
            Some(EfiGuid::HOB_LIST)
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(EfiGuid::parse(""), None);
        assert_eq!(EfiGuid::parse("ffe06bdd-6107-46a6-7bb2-5a9c7ec5275"), None);
        assert_eq!(EfiGuid::parse("ffe06bdd_6107-46a6-7bb2-5a9c7ec5275c"), None);
        assert_eq!(EfiGuid::parse("gfe06bdd-6107-46a6-7bb2-5a9c7ec5275c"), None);
    }

    #[test]
    fn byte_layout_is_mixed_endian() {
        let bytes = EfiGuid::HOB_LIST.as_bytes();
        assert_eq!(&bytes[..4], &[0x4c, 0xf2, 0x39, 0x77]);
        assert_eq!(&bytes[8..], &[0x9a, 0x3a, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d]);
        assert_eq!(EfiGuid::read_from(bytes), Some(EfiGuid::HOB_LIST));
    }
}

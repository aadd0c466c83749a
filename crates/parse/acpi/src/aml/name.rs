//! AML name segments and NameStrings.
//!
//! ACPI names are composed of 4-byte segments. In AML a NameString is an
//! optional root (`\`) or parent (`^`) prefix followed by a NullName, a
//! single segment, a DualNamePath (`0x2E`) or a MultiNamePath (`0x2F`,
//! count). In ASL the same name is written `\_SB.PCI0` with segments
//! shorter than four characters padded with `_`.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::AmlError;

const ROOT_CHAR: u8 = b'\\';
const PARENT_PREFIX_CHAR: u8 = b'^';
const NULL_NAME: u8 = 0x00;
const DUAL_NAME_PREFIX: u8 = 0x2E;
const MULTI_NAME_PREFIX: u8 = 0x2F;

/// A 4-byte AML name segment (e.g., `_SB_`, `PCI0`, `_HID`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSeg(pub [u8; 4]);

impl NameSeg {
    /// Create a `NameSeg` from a 4-byte slice.
    ///
    /// Returns `None` if the slice is shorter than 4 bytes or is not a
    /// valid segment.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let seg = Self(bytes.get(..4)?.try_into().ok()?);
        seg.is_valid().then_some(seg)
    }

    /// Builds a segment from its ASL spelling, upper-casing and padding
    /// with `_` up to four characters.
    #[must_use]
    pub fn from_asl(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return None;
        }
        let mut seg = [b'_'; 4];
        for (dst, src) in seg.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        let seg = Self(seg);
        seg.is_valid().then_some(seg)
    }

    /// Returns `true` if the segment only uses the characters ACPI allows:
    /// a lead of `A-Z` or `_`, then `A-Z`, `0-9` or `_`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_lead_name_char(self.0[0])
            && self.0[1..]
                .iter()
                .all(|&c| is_lead_name_char(c) || c.is_ascii_digit())
    }

    /// Returns the name as a string (ACPI names are always ASCII).
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("")
    }

    /// Returns the ASL spelling, without trailing `_` padding.
    #[must_use]
    pub fn asl_str(&self) -> &str {
        let s = self.as_str();
        let trimmed = s.trim_end_matches('_');
        if trimmed.is_empty() { &s[..1] } else { trimmed }
    }
}

impl fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameSeg(\"{}\")", self.as_str())
    }
}

impl fmt::Display for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `true` for the characters that may start a name segment.
#[must_use]
pub fn is_lead_name_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c == b'_'
}

/// Returns `true` if `c` can start an AML NameString.
#[must_use]
pub fn starts_name_string(c: u8) -> bool {
    is_lead_name_char(c)
        || matches!(
            c,
            ROOT_CHAR | PARENT_PREFIX_CHAR | DUAL_NAME_PREFIX | MULTI_NAME_PREFIX
        )
}

/// A decoded NameString.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameString {
    /// Starts at the namespace root.
    pub root: bool,
    /// Number of `^` prefixes (always zero when `root` is set).
    pub parent_prefixes: usize,
    /// The name segments, outermost first.
    pub segments: Vec<NameSeg>,
}

impl NameString {
    /// Decodes the AML NameString at the start of `bytes`, returning it with
    /// the number of bytes it occupies.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::UnexpectedEnd`] on truncation and
    /// [`AmlError::InvalidAml`] on an invalid segment or prefix.
    pub fn parse_aml(bytes: &[u8]) -> Result<(Self, usize), AmlError> {
        let mut name = Self::default();
        let mut pos = 0;

        match bytes.first() {
            Some(&ROOT_CHAR) => {
                name.root = true;
                pos = 1;
            }
            Some(_) => {
                while bytes.get(pos) == Some(&PARENT_PREFIX_CHAR) {
                    pos += 1;
                }
                name.parent_prefixes = pos;
            }
            None => return Err(AmlError::UnexpectedEnd),
        }

        let count = match *bytes.get(pos).ok_or(AmlError::UnexpectedEnd)? {
            NULL_NAME => {
                pos += 1;
                0
            }
            DUAL_NAME_PREFIX => {
                pos += 1;
                2
            }
            MULTI_NAME_PREFIX => {
                let count = *bytes.get(pos + 1).ok_or(AmlError::UnexpectedEnd)?;
                pos += 2;
                usize::from(count)
            }
            c if is_lead_name_char(c) => 1,
            _ => return Err(AmlError::InvalidAml),
        };

        for _ in 0..count {
            let raw = bytes.get(pos..pos + 4).ok_or(AmlError::UnexpectedEnd)?;
            name.segments
                .push(NameSeg::from_bytes(raw).ok_or(AmlError::InvalidAml)?);
            pos += 4;
        }

        Ok((name, pos))
    }

    /// Parses an ASL name such as `\_SB.PCI0`, `^^DEV0` or `_CRS`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] for an empty or malformed
    /// name, or one with more than 255 segments.
    pub fn from_asl(s: &str) -> Result<Self, AmlError> {
        let mut name = Self::default();
        let mut rest = s;

        if let Some(r) = rest.strip_prefix('\\') {
            name.root = true;
            rest = r;
        } else {
            while let Some(r) = rest.strip_prefix('^') {
                name.parent_prefixes += 1;
                rest = r;
            }
        }

        if !rest.is_empty() {
            for seg in rest.split('.') {
                name.segments
                    .push(NameSeg::from_asl(seg).ok_or(AmlError::InvalidParameter)?);
            }
        } else if !name.root && name.parent_prefixes == 0 {
            return Err(AmlError::InvalidParameter);
        }

        if name.segments.len() > usize::from(u8::MAX) {
            return Err(AmlError::InvalidParameter);
        }
        Ok(name)
    }

    /// Encodes the name in AML form.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if there are more than 255
    /// segments.
    pub fn to_aml(&self) -> Result<Vec<u8>, AmlError> {
        let mut out = Vec::with_capacity(2 + self.parent_prefixes + 4 * self.segments.len());
        if self.root {
            out.push(ROOT_CHAR);
        }
        out.extend(core::iter::repeat_n(PARENT_PREFIX_CHAR, self.parent_prefixes));

        match self.segments.len() {
            0 => out.push(NULL_NAME),
            1 => {}
            2 => out.push(DUAL_NAME_PREFIX),
            n => {
                out.push(MULTI_NAME_PREFIX);
                out.push(u8::try_from(n).map_err(|_| AmlError::InvalidParameter)?);
            }
        }
        for seg in &self.segments {
            out.extend_from_slice(&seg.0);
        }
        Ok(out)
    }

    /// Returns `true` if the name starts at the namespace root.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.root
    }

    /// The last segment, which names the object itself.
    #[must_use]
    pub fn last_segment(&self) -> Option<NameSeg> {
        self.segments.last().copied()
    }

    /// Applies this name to the scope `scope`, returning the absolute path.
    ///
    /// Returns `None` if the `^` prefixes climb above the root.
    #[must_use]
    pub fn resolve(&self, scope: &[NameSeg]) -> Option<Vec<NameSeg>> {
        let mut path = if self.root {
            Vec::new()
        } else {
            let keep = scope.len().checked_sub(self.parent_prefixes)?;
            scope[..keep].to_vec()
        };
        path.extend_from_slice(&self.segments);
        Some(path)
    }
}

impl fmt::Display for NameString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root {
            f.write_str("\\")?;
        }
        for _ in 0..self.parent_prefixes {
            f.write_str("^")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg.asl_str())?;
        }
        Ok(())
    }
}

/// Converts an ASL name to its AML NameString encoding.
///
/// # Errors
///
/// Returns [`AmlError::InvalidParameter`] if `asl` is not a valid name.
pub fn asl_to_aml_name(asl: &str) -> Result<Vec<u8>, AmlError> {
    NameString::from_asl(asl)?.to_aml()
}

/// Converts an AML NameString to its ASL spelling.
///
/// The whole of `aml` must be consumed by the NameString.
///
/// # Errors
///
/// Returns [`AmlError::InvalidParameter`] if `aml` is not exactly one
/// valid NameString.
pub fn aml_to_asl_name(aml: &[u8]) -> Result<String, AmlError> {
    let (name, len) = NameString::parse_aml(aml).map_err(|_| AmlError::InvalidParameter)?;
    if len != aml.len() {
        return Err(AmlError::InvalidParameter);
    }
    Ok(alloc::format!("{name}"))
}

/// Size in bytes of the AML NameString at the start of `aml`.
#[must_use]
pub fn name_string_len(aml: &[u8]) -> Option<usize> {
    NameString::parse_aml(aml).ok().map(|(_, len)| len)
}

/// Formats an absolute path as ASL, e.g. `\_SB.PCI0`.
#[must_use]
pub fn path_to_asl(path: &[NameSeg]) -> String {
    let name = NameString {
        root: true,
        parent_prefixes: 0,
        segments: path.to_vec(),
    };
    alloc::format!("{name}")
}

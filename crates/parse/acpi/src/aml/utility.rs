//! Integer and resource-list helpers over an [`AmlTree`].

use alloc::vec::Vec;

use super::AmlError;
use super::grammar::{
    self, AmlOpcode, BUFFER_OP, BYTE_PREFIX, DWORD_PREFIX, NAME_OP, ONE_OP, ONES_OP, QWORD_PREFIX,
    WORD_PREFIX, ZERO_OP,
};
use super::node::{DataType, NodeId};
use super::tree::AmlTree;
use crate::resource::{END_TAG_LEN, is_end_tag};

const BYTE: &AmlOpcode = grammar::entry(BYTE_PREFIX, false);
const WORD: &AmlOpcode = grammar::entry(WORD_PREFIX, false);
const DWORD: &AmlOpcode = grammar::entry(DWORD_PREFIX, false);
const QWORD: &AmlOpcode = grammar::entry(QWORD_PREFIX, false);

/// Picks the narrowest prefixed encoding of `value`.
pub(crate) fn integer_encoding(value: u64) -> (&'static AmlOpcode, Vec<u8>) {
    let bytes = value.to_le_bytes();
    let (opcode, width) = match value {
        0..=0xFF => (BYTE, 1),
        0x100..=0xFFFF => (WORD, 2),
        0x1_0000..=0xFFFF_FFFF => (DWORD, 4),
        _ => (QWORD, 8),
    };
    (opcode, bytes[..width].to_vec())
}

impl AmlTree {
    /// Whether integers in this table are 64 bits wide.
    ///
    /// Definition blocks below revision 2 use 32-bit integers.
    #[must_use]
    pub fn has_64bit_integers(&self) -> bool {
        self.header().revision >= 2
    }

    /// Largest integer the table can hold; also the value of `Ones`.
    pub(crate) fn integer_max(&self) -> u64 {
        if self.has_64bit_integers() {
            u64::MAX
        } else {
            u64::from(u32::MAX)
        }
    }

    /// Returns the value of an integer object: `Zero`, `One`, `Ones` or a
    /// `Byte`/`Word`/`DWord`/`QWord` constant.
    ///
    /// In a table with 32-bit integers `Ones` reads as `0xFFFF_FFFF` and a
    /// `QWord` is truncated to its low 32 bits.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `node` is not an integer
    /// object, and [`AmlError::InvalidAml`] if its payload has the wrong
    /// width.
    pub fn integer_value(&self, node: NodeId) -> Result<u64, AmlError> {
        let obj = self.object(node)?;
        if !grammar::is_integer(obj.opcode) {
            return Err(AmlError::InvalidParameter);
        }
        match obj.opcode.op {
            ZERO_OP => Ok(0),
            ONE_OP => Ok(1),
            ONES_OP => Ok(self.integer_max()),
            _ => {
                let data = obj.fixed_args.first().ok_or(AmlError::InvalidAml)?;
                let bytes = &self.data(*data)?.bytes;
                if obj.opcode.fixed_args[0].int_width() != Some(bytes.len()) {
                    return Err(AmlError::InvalidAml);
                }
                le_value(bytes)
                    .map(|v| v & self.integer_max())
                    .ok_or(AmlError::InvalidAml)
            }
        }
    }

    /// Encoded size of `value` in its narrowest prefixed form.
    pub(crate) fn integer_size(&self, value: u64) -> Result<usize, AmlError> {
        if value > self.integer_max() {
            return Err(AmlError::InvalidParameter);
        }
        let (opcode, bytes) = integer_encoding(value);
        Ok(opcode.op_len() + bytes.len())
    }

    /// Rewrites an integer object in its narrowest encoding without
    /// propagating, returning its old and new sizes.
    pub(crate) fn write_integer(&mut self, node: NodeId, value: u64) -> Result<(usize, usize), AmlError> {
        let obj = self.object(node)?;
        if !grammar::is_integer(obj.opcode) {
            return Err(AmlError::InvalidParameter);
        }
        let existing = obj.fixed_args.first().copied();
        let old_size = self.compute_size(node)?;
        let new_size = self.integer_size(value)?;

        let (opcode, bytes) = integer_encoding(value);
        match existing {
            Some(data) => self.data_mut(data)?.bytes = bytes,
            None => {
                let data = self.new_data_node(DataType::UInt, bytes)?;
                self.node_mut(data)?.parent = Some(node);
                self.object_mut(node)?.fixed_args.push(data);
            }
        }
        self.object_mut(node)?.opcode = opcode;
        Ok((old_size, new_size))
    }

    /// Sets the value of an integer object.
    ///
    /// The object is re-encoded in the narrowest of `Byte`, `Word`, `DWord`
    /// and `QWord` that holds `value`, growing or shrinking as needed, and
    /// the size change is propagated to the ancestors. `Zero`, `One` and
    /// `Ones` are unfolded into a prefixed constant. Nothing is modified if
    /// the propagation fails.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `node` is not an integer
    /// object or `value` does not fit the table's integer width, or a
    /// propagation error.
    pub fn set_integer_value(&mut self, node: NodeId, value: u64) -> Result<(), AmlError> {
        if !grammar::is_integer(self.object(node)?.opcode) {
            return Err(AmlError::InvalidParameter);
        }
        let old_size = self.compute_size(node)?;
        let new_size = self.integer_size(value)?;
        let sizes = match self.parent(node) {
            Some(parent) if old_size != new_size => {
                let delta = new_size as i64 - old_size as i64;
                self.plan_size(parent, delta, Some(node))?
            }
            _ => Vec::new(),
        };
        self.write_integer(node, value)?;
        self.apply_sizes(sizes)
    }

    /// Resolves `node` to a Buffer object: either the Buffer itself or a
    /// `Name` whose value is one.
    pub(crate) fn resource_buffer(&self, node: NodeId) -> Result<NodeId, AmlError> {
        let target = if self.node(node)?.has_opcode(NAME_OP, false) {
            self.fixed_arg(node, 1).ok_or(AmlError::InvalidAml)?
        } else {
            node
        };
        if !self.node(target)?.has_opcode(BUFFER_OP, false) {
            return Err(AmlError::InvalidParameter);
        }
        Ok(target)
    }

    /// Returns the End Tag node of a resource template buffer.
    pub(crate) fn end_tag(&self, buffer: NodeId) -> Result<NodeId, AmlError> {
        let buffer = self.resource_buffer(buffer)?;
        self.var_args(buffer)
            .iter()
            .copied()
            .find(|&id| {
                self.data(id)
                    .is_ok_and(|d| d.data_type == DataType::ResourceData && is_end_tag(&d.bytes))
            })
            .ok_or(AmlError::NotFound)
    }

    /// Computes the End Tag checksum that makes the resource list of
    /// `buffer` sum to zero.
    ///
    /// `buffer` may be the Buffer object or the `Name` holding it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NotFound`] if the list has no End Tag.
    pub fn rd_list_checksum(&self, buffer: NodeId) -> Result<u8, AmlError> {
        let end = self.end_tag(buffer)?;
        let buffer = self.resource_buffer(buffer)?;
        let mut sum = 0u8;
        for &id in self.var_args(buffer) {
            let bytes = &self.data(id)?.bytes;
            let bytes = if id == end { &bytes[..END_TAG_LEN - 1] } else { bytes };
            sum = bytes.iter().fold(sum, |acc, &b| acc.wrapping_add(b));
        }
        Ok(0u8.wrapping_sub(sum))
    }

    /// Stores `checksum` in the End Tag of the resource list of `buffer`.
    ///
    /// A checksum of zero tells the OS to skip verification.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NotFound`] if the list has no End Tag and
    /// [`AmlError::InvalidParameter`] if `buffer` is not a Buffer or a
    /// `Name` of one.
    pub fn set_rd_list_checksum(&mut self, buffer: NodeId, checksum: u8) -> Result<(), AmlError> {
        let end = self.end_tag(buffer)?;
        let tag = self.data_mut(end)?;
        tag.bytes[END_TAG_LEN - 1] = checksum;
        Ok(())
    }
}

/// Decodes a little-endian integer payload of at most 8 bytes.
pub(crate) fn le_value(bytes: &[u8]) -> Option<u64> {
    let mut raw = [0u8; 8];
    raw.get_mut(..bytes.len())?.copy_from_slice(bytes);
    Some(u64::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::aml::grammar::{PACKAGE_OP, entry};
    use crate::resource::{END_TAG, encode_end_tag};
    use crate::sdt::SdtHeader;

    fn tree() -> AmlTree {
        AmlTree::new(SdtHeader {
            signature: *b"SSDT",
            length: 0,
            revision: 2,
            checksum: 0,
            oem_id: *b"EMBER ",
            oem_table_id: *b"UTIL    ",
            oem_revision: 1,
            creator_id: 0,
            creator_revision: 0,
        })
    }

    fn integer_in_package(tree: &mut AmlTree, opcode: &'static AmlOpcode, bytes: &[u8]) -> (NodeId, NodeId) {
        let count = tree.new_data_node(DataType::UInt, vec![0]).unwrap();
        let pkg = tree
            .new_object_node(entry(PACKAGE_OP, false), vec![count])
            .unwrap();
        tree.attach_var_arg(AmlTree::ROOT, pkg).unwrap();
        let args = if opcode.fixed_args.is_empty() {
            vec![]
        } else {
            vec![tree.new_data_node(DataType::UInt, bytes.to_vec()).unwrap()]
        };
        let int = tree.new_object_node(opcode, args).unwrap();
        tree.attach_var_arg(pkg, int).unwrap();
        (pkg, int)
    }

    #[test]
    fn reads_every_integer_form() {
        let mut t = tree();
        let (_, zero) = integer_in_package(&mut t, entry(ZERO_OP, false), &[]);
        let (_, ones) = integer_in_package(&mut t, entry(ONES_OP, false), &[]);
        let (_, word) = integer_in_package(&mut t, WORD, &[0x34, 0x12]);
        let (pkg, _) = integer_in_package(&mut t, QWORD, &[1, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_eq!(t.integer_value(zero), Ok(0));
        assert_eq!(t.integer_value(ones), Ok(u64::MAX));
        assert_eq!(t.integer_value(word), Ok(0x1234));
        assert_eq!(t.integer_value(pkg), Err(AmlError::InvalidParameter));
    }

    #[test]
    fn revision_one_tables_use_32bit_integers() {
        let mut t = tree();
        let mut header = t.header();
        header.revision = 1;
        t.set_header(header);
        assert!(!t.has_64bit_integers());

        let (_, ones) = integer_in_package(&mut t, entry(ONES_OP, false), &[]);
        let (_, qword) = integer_in_package(&mut t, QWORD, &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(t.integer_value(ones), Ok(0xFFFF_FFFF));
        assert_eq!(t.integer_value(qword), Ok(1));

        assert_eq!(
            t.set_integer_value(ones, 0x1_0000_0000),
            Err(AmlError::InvalidParameter)
        );
        assert!(t.node(ones).unwrap().has_opcode(ONES_OP, false));
        t.set_integer_value(ones, 0xFFFF_FFFF).unwrap();
        assert_eq!(t.integer_value(ones), Ok(0xFFFF_FFFF));
        assert_eq!(t.verify_sizes(), Ok(None));
        assert_eq!(t.new_integer(0x1_0000_0000), Err(AmlError::InvalidParameter));
    }

    #[test]
    fn set_grows_and_shrinks() {
        let mut t = tree();
        let (pkg, int) = integer_in_package(&mut t, BYTE, &[5]);
        // Package: op + PkgLength + NumElements + Byte(2)
        assert_eq!(t.header().length() as usize, SdtHeader::SIZE + 5);

        t.set_integer_value(int, 0x1_0000).unwrap();
        assert_eq!(t.object(int).unwrap().opcode.name, "DWord");
        assert_eq!(t.integer_value(int), Ok(0x1_0000));
        assert_eq!(t.object(pkg).unwrap().pkg_len, Some(1 + 1 + 5));
        assert_eq!(t.header().length() as usize, SdtHeader::SIZE + 8);

        t.set_integer_value(int, 7).unwrap();
        assert_eq!(t.object(int).unwrap().opcode.name, "Byte");
        assert_eq!(t.header().length() as usize, SdtHeader::SIZE + 5);
        assert_eq!(t.verify_sizes(), Ok(None));
    }

    #[test]
    fn set_unfolds_constant_opcodes() {
        let mut t = tree();
        let (_, one) = integer_in_package(&mut t, entry(ONE_OP, false), &[]);
        t.set_integer_value(one, 0xAB).unwrap();
        assert_eq!(t.object(one).unwrap().opcode.name, "Byte");
        assert_eq!(t.compute_size(one), Ok(2));
        assert_eq!(t.integer_value(one), Ok(0xAB));
        assert_eq!(t.verify_sizes(), Ok(None));
    }

    #[test]
    fn end_tag_checksum() {
        let mut t = tree();
        let size = t.new_data_node(DataType::UInt, vec![5]).unwrap();
        let size = t.new_object_node(BYTE, vec![size]).unwrap();
        let buf = t
            .new_object_node(entry(BUFFER_OP, false), vec![size])
            .unwrap();
        let irq = t
            .new_data_node(DataType::ResourceData, vec![0x22, 0x10, 0x00])
            .unwrap();
        t.attach_var_arg(buf, irq).unwrap();
        assert_eq!(t.set_rd_list_checksum(buf, 1), Err(AmlError::NotFound));

        let end = t
            .new_data_node(DataType::ResourceData, encode_end_tag(0).to_vec())
            .unwrap();
        t.attach_var_arg(buf, end).unwrap();

        let sum = t.rd_list_checksum(buf).unwrap();
        assert_eq!(sum, 0u8.wrapping_sub(0x22 + 0x10 + END_TAG));
        t.set_rd_list_checksum(buf, sum).unwrap();
        assert_eq!(t.data(end).unwrap().bytes, vec![END_TAG, sum]);
    }

    #[test]
    fn narrowest_encoding() {
        assert_eq!(integer_encoding(0).0.name, "Byte");
        assert_eq!(integer_encoding(0x100).1, vec![0, 1]);
        assert_eq!(integer_encoding(0xFFFF_FFFF).0.name, "DWord");
        assert_eq!(integer_encoding(u64::MAX).1.len(), 8);
        assert_eq!(le_value(&[0x34, 0x12]), Some(0x1234));
    }
}

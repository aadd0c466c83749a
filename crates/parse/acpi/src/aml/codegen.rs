//! Generation of common AML objects.
//!
//! Each `code_gen_*` helper builds an object and, when `parent` is given,
//! appends it to that scope with sizes propagated. Without a parent the
//! object is returned detached.

use alloc::vec;
use alloc::vec::Vec;

use super::AmlError;
use super::grammar::{
    self, AmlOpcode, BUFFER_OP, DEVICE_OP, NAME_OP, ONE_OP, PACKAGE_OP, SCOPE_OP, STRING_PREFIX,
    ZERO_OP,
};
use super::name::asl_to_aml_name;
use super::node::{DataType, NodeId};
use super::tree::AmlTree;
use super::utility::integer_encoding;
use crate::resource::encode_end_tag;
use crate::sdt::SdtHeader;

const SCOPE: &AmlOpcode = grammar::entry(SCOPE_OP, false);
const DEVICE: &AmlOpcode = grammar::entry(DEVICE_OP, true);
const NAME: &AmlOpcode = grammar::entry(NAME_OP, false);
const STRING: &AmlOpcode = grammar::entry(STRING_PREFIX, false);
const BUFFER: &AmlOpcode = grammar::entry(BUFFER_OP, false);
const PACKAGE: &AmlOpcode = grammar::entry(PACKAGE_OP, false);
const ZERO: &AmlOpcode = grammar::entry(ZERO_OP, false);
const ONE: &AmlOpcode = grammar::entry(ONE_OP, false);

/// Revision written to generated definition block headers.
pub const DEFINITION_BLOCK_REVISION: u8 = 2;

/// Creator ID of generated tables, `"EMBR"`.
pub const CREATOR_ID: u32 = u32::from_le_bytes(*b"EMBR");

/// Creator revision of generated tables.
pub const CREATOR_REVISION: u32 = 1;

/// Identification fields of a definition block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableIds {
    /// Table signature, `DSDT` or `SSDT`.
    pub signature: [u8; 4],
    /// OEM ID.
    pub oem_id: [u8; 6],
    /// OEM table ID.
    pub oem_table_id: [u8; 8],
    /// OEM revision.
    pub oem_revision: u32,
}

impl AmlTree {
    /// Creates an empty definition block.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if an ID field is not
    /// printable ASCII.
    pub fn definition_block(ids: TableIds) -> Result<Self, AmlError> {
        let printable = |bytes: &[u8]| bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ');
        if !printable(&ids.signature) || !printable(&ids.oem_id) || !printable(&ids.oem_table_id) {
            return Err(AmlError::InvalidParameter);
        }
        Ok(Self::new(SdtHeader {
            signature: ids.signature,
            length: 0,
            revision: DEFINITION_BLOCK_REVISION,
            checksum: 0,
            oem_id: ids.oem_id,
            oem_table_id: ids.oem_table_id,
            oem_revision: ids.oem_revision,
            creator_id: CREATOR_ID,
            creator_revision: CREATOR_REVISION,
        }))
    }

    fn name_node(&mut self, asl: &str) -> Result<NodeId, AmlError> {
        let aml = asl_to_aml_name(asl)?;
        self.new_data_node(DataType::NameString, aml)
    }

    /// Attaches a freshly built `node` to `parent`, deleting it on failure.
    fn place(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        if let Some(parent) = parent {
            if let Err(e) = self.attach_var_arg(parent, node) {
                self.delete(node)?;
                return Err(e);
            }
        }
        Ok(node)
    }

    /// Builds an integer constant: `Zero`, `One`, or the narrowest prefixed
    /// form.
    pub(crate) fn new_integer(&mut self, value: u64) -> Result<NodeId, AmlError> {
        if value > self.integer_max() {
            return Err(AmlError::InvalidParameter);
        }
        match value {
            0 => self.new_object_node(ZERO, Vec::new()),
            1 => self.new_object_node(ONE, Vec::new()),
            _ => {
                let (opcode, bytes) = integer_encoding(value);
                let data = self.new_data_node(DataType::UInt, bytes)?;
                self.new_object_node(opcode, vec![data])
            }
        }
    }

    /// Generates `Scope(name) {}`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] for a bad name or a parent
    /// that cannot hold a scope.
    pub fn code_gen_scope(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let name = self.name_node(name)?;
        let scope = self.new_object_node(SCOPE, vec![name])?;
        self.place(scope, parent)
    }

    /// Generates `Device(name) {}`.
    ///
    /// # Errors
    ///
    /// As [`code_gen_scope`](Self::code_gen_scope).
    pub fn code_gen_device(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let name = self.name_node(name)?;
        let device = self.new_object_node(DEVICE, vec![name])?;
        self.place(device, parent)
    }

    fn code_gen_name(
        &mut self,
        name: &str,
        value: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        let name = match self.name_node(name) {
            Ok(name) => name,
            Err(e) => {
                self.delete(value)?;
                return Err(e);
            }
        };
        let node = self.new_object_node(NAME, vec![name, value])?;
        self.place(node, parent)
    }

    /// Generates `Name(name, value)` with an integer value.
    ///
    /// # Errors
    ///
    /// As [`code_gen_scope`](Self::code_gen_scope); also
    /// [`AmlError::InvalidParameter`] if `value` exceeds the table's integer
    /// width.
    pub fn code_gen_name_integer(
        &mut self,
        name: &str,
        value: u64,
        parent: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        let value = self.new_integer(value)?;
        self.code_gen_name(name, value, parent)
    }

    /// Generates `Name(name, "value")`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `value` holds a NUL or a
    /// non-ASCII character.
    pub fn code_gen_name_string(
        &mut self,
        name: &str,
        value: &str,
        parent: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        if !value.bytes().all(|b| b.is_ascii() && b != 0) {
            return Err(AmlError::InvalidParameter);
        }
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        let string = self.new_data_node(DataType::String, bytes)?;
        let string = self.new_object_node(STRING, vec![string])?;
        self.code_gen_name(name, string, parent)
    }

    /// Generates `Name(name, ResourceTemplate() {})`: a buffer holding only
    /// an End Tag with a zero checksum.
    ///
    /// # Errors
    ///
    /// As [`code_gen_scope`](Self::code_gen_scope).
    pub fn code_gen_name_resource_template(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        let end_tag = encode_end_tag(0);
        let size = self.new_integer(end_tag.len() as u64)?;
        let buffer = self.new_object_node(BUFFER, vec![size])?;
        let end = self.new_data_node(DataType::ResourceData, end_tag.to_vec())?;
        // BufferSize already counts the End Tag.
        self.link_var_arg(buffer, end)?;
        self.refresh_pkg_len(buffer)?;
        self.code_gen_name(name, buffer, parent)
    }

    /// Generates `Name(name, Package() {})`.
    ///
    /// Elements appended later with
    /// [`attach_var_arg`](Self::attach_var_arg) update NumElements.
    ///
    /// # Errors
    ///
    /// As [`code_gen_scope`](Self::code_gen_scope).
    pub fn code_gen_name_package(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let count = self.new_data_node(DataType::UInt, vec![0])?;
        let package = self.new_object_node(PACKAGE, vec![count])?;
        self.code_gen_name(name, package, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aml::parser::tests::{com0_body, ssdt};

    fn ids() -> TableIds {
        TableIds {
            signature: *b"SSDT",
            oem_id: *b"EMBER ",
            oem_table_id: *b"PARSER  ",
            oem_revision: 0,
        }
    }

    #[test]
    fn generates_the_com0_table() {
        let mut tree = AmlTree::definition_block(ids()).unwrap();
        let sb = tree.code_gen_scope("\\_SB", Some(AmlTree::ROOT)).unwrap();
        let dev = tree.code_gen_device("COM0", Some(sb)).unwrap();
        let crs = tree.code_gen_name_resource_template("_CRS", Some(dev)).unwrap();
        tree.code_gen_name_integer("_UID", 1, Some(dev)).unwrap();

        // Reproduce the IO descriptor of the hand-written fixture.
        let io = vec![0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08];
        let io = tree.new_data_node(DataType::ResourceData, io).unwrap();
        let end = tree.end_tag(crs).unwrap();
        tree.insert_var_arg_before(end, io).unwrap();

        let mut expected = ssdt(&com0_body());
        // The fixture carries its own creator fields.
        expected[24..36].copy_from_slice(&[0; 12]);
        let mut out = tree.serialize().unwrap();
        out[24..36].copy_from_slice(&[0; 12]);
        out[9] = 0;
        expected[9] = 0;
        assert_eq!(out, expected);
        assert_eq!(tree.verify_sizes(), Ok(None));
    }

    #[test]
    fn detached_objects() {
        let mut tree = AmlTree::definition_block(ids()).unwrap();
        let name = tree.code_gen_name_string("_HID", "PNP0501", None).unwrap();
        assert_eq!(tree.parent(name), None);
        assert_eq!(
            tree.serialize_node(name).unwrap(),
            b"\x08_HID\x0dPNP0501\x00".to_vec()
        );
        assert_eq!(tree.header().length() as usize, SdtHeader::SIZE);
    }

    #[test]
    fn integer_forms() {
        let mut tree = AmlTree::definition_block(ids()).unwrap();
        let zero = tree.code_gen_name_integer("ZERO", 0, None).unwrap();
        let big = tree.code_gen_name_integer("BIG_", 0x1_0000_0000, None).unwrap();
        assert_eq!(tree.serialize_node(zero).unwrap(), b"\x08ZERO\x00".to_vec());
        assert_eq!(tree.compute_size(big), Ok(1 + 4 + 9));
    }

    #[test]
    fn package_counts_elements() {
        let mut tree = AmlTree::definition_block(ids()).unwrap();
        let name = tree.code_gen_name_package("PKG0", Some(AmlTree::ROOT)).unwrap();
        let pkg = tree.fixed_arg(name, 1).unwrap();
        for v in [5, 0x300] {
            let int = tree.new_integer(v).unwrap();
            tree.attach_var_arg(pkg, int).unwrap();
        }
        assert_eq!(
            tree.serialize_node(name).unwrap(),
            b"\x08PKG0\x12\x07\x02\x0a\x05\x0b\x00\x03".to_vec()
        );
        assert_eq!(tree.verify_sizes(), Ok(None));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(
            AmlTree::definition_block(TableIds {
                signature: [0, 0, 0, 0],
                ..ids()
            })
            .is_err()
        );
        let mut tree = AmlTree::definition_block(ids()).unwrap();
        let before = tree.len();
        assert_eq!(
            tree.code_gen_name_string("_STR", "caf\u{e9}", None),
            Err(AmlError::InvalidParameter)
        );
        assert_eq!(
            tree.code_gen_name_integer("toolong", 1, None),
            Err(AmlError::InvalidParameter)
        );
        // A Name cannot hold another Name.
        let name = tree.code_gen_name_integer("INT0", 3, None).unwrap();
        assert_eq!(
            tree.code_gen_device("DEV0", Some(name)),
            Err(AmlError::InvalidParameter)
        );
        tree.delete(name).unwrap();
        assert_eq!(tree.len(), before);
    }
}

//! Serialization of an [`AmlTree`] back to table bytes.

use alloc::vec::Vec;

use ember_binparse::AsBytes;

use super::AmlError;
use super::grammar::EXT_OP_PREFIX;
use super::node::{NodeId, NodeKind};
use super::pkglen;
use super::tree::AmlTree;
use crate::sdt::update_checksum;

impl AmlTree {
    /// Serializes the whole table.
    ///
    /// The header length is rewritten from the tree and the checksum is
    /// recomputed, so the result always validates.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfResources`] if the table exceeds 4 GiB and
    /// [`AmlError::InvalidAml`] if a cached PkgLength is stale.
    pub fn serialize(&self) -> Result<Vec<u8>, AmlError> {
        let size = self.compute_size(Self::ROOT)?;
        let mut header = self.header();
        header.length = u32::try_from(size).map_err(|_| AmlError::OutOfResources)?;
        header.checksum = 0;

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(header.as_bytes());
        for &child in self.var_args(Self::ROOT) {
            self.write_node(child, &mut out)?;
        }
        if out.len() != size {
            log::warn!("aml: serialized {:#x} bytes, expected {size:#x}", out.len());
            return Err(AmlError::InvalidAml);
        }
        update_checksum(&mut out);
        Ok(out)
    }

    /// Serializes the table into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::BufferTooSmall`] if `buf` cannot hold the table.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<usize, AmlError> {
        let table = self.serialize()?;
        buf.get_mut(..table.len())
            .ok_or(AmlError::BufferTooSmall)?
            .copy_from_slice(&table);
        Ok(table.len())
    }

    /// Serializes a single subtree, which may be detached.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] for the root; use
    /// [`serialize`](Self::serialize) for the whole table.
    pub fn serialize_node(&self, id: NodeId) -> Result<Vec<u8>, AmlError> {
        if id == Self::ROOT {
            return Err(AmlError::InvalidParameter);
        }
        let mut out = Vec::with_capacity(self.compute_size(id)?);
        self.write_node(id, &mut out)?;
        Ok(out)
    }

    fn write_node(&self, id: NodeId, out: &mut Vec<u8>) -> Result<(), AmlError> {
        match &self.node(id)?.kind {
            NodeKind::Root(_) => Err(AmlError::InvalidParameter),
            NodeKind::Data(data) => {
                out.extend_from_slice(&data.bytes);
                Ok(())
            }
            NodeKind::Object(obj) => {
                if obj.opcode.extended {
                    out.push(EXT_OP_PREFIX);
                }
                out.push(obj.opcode.op);
                if let Some(total) = obj.pkg_len {
                    let (bytes, width) = pkglen::encode(total).ok_or(AmlError::OutOfResources)?;
                    out.extend_from_slice(&bytes[..width]);
                }
                for &child in obj.fixed_args.iter().chain(&obj.var_args) {
                    self.write_node(child, out)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::aml::parser::tests::{com0_body, ssdt};
    use crate::sdt::{SdtHeader, validate_table};

    #[test]
    fn unmodified_table_is_reproduced() {
        let table = ssdt(&com0_body());
        let tree = AmlTree::parse(&table).unwrap();
        assert_eq!(tree.serialize().unwrap(), table);
    }

    #[test]
    fn edits_keep_the_table_valid() {
        let table = ssdt(&com0_body());
        let mut tree = AmlTree::parse(&table).unwrap();
        let scope = tree.var_args(AmlTree::ROOT)[0];
        let device = tree.var_args(scope)[0];
        let uid = tree.var_args(device)[1];
        let value = tree.fixed_arg(uid, 1).unwrap();
        tree.set_integer_value(value, 0x1234_5678).unwrap();

        let out = tree.serialize().unwrap();
        assert_eq!(out.len(), table.len() + 4);
        let header = validate_table(&out, Some(b"SSDT")).unwrap();
        assert_eq!(header.length() as usize, out.len());

        let reparsed = AmlTree::parse(&out).unwrap();
        assert_eq!(reparsed.serialize().unwrap(), out);
    }

    #[test]
    fn serialize_into_checks_room() {
        let tree = AmlTree::parse(&ssdt(&[])).unwrap();
        let mut small = [0u8; 8];
        assert_eq!(tree.serialize_into(&mut small), Err(AmlError::BufferTooSmall));
        let mut buf = vec![0u8; 64];
        assert_eq!(tree.serialize_into(&mut buf), Ok(SdtHeader::SIZE));
    }

    #[test]
    fn subtree_bytes() {
        let tree = AmlTree::parse(&ssdt(&com0_body())).unwrap();
        let scope = tree.var_args(AmlTree::ROOT)[0];
        assert_eq!(tree.serialize_node(scope).unwrap(), com0_body());
        assert_eq!(
            tree.serialize_node(AmlTree::ROOT),
            Err(AmlError::InvalidParameter)
        );
    }
}

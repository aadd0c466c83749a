//! Parsing of a definition block into an [`AmlTree`].
//!
//! Objects are decoded following the [`grammar`] table. Fixed arguments of
//! kind `Object` are either a name reference or a nested object; opaque
//! bodies are captured whole. Every object carrying a PkgLength must end
//! exactly where its PkgLength says.

use alloc::vec::Vec;

use ember_binparse::BinaryReader;

use super::AmlError;
use super::grammar::{self, ArgKind, EXT_OP_PREFIX, VarList};
use super::name::{name_string_len, starts_name_string};
use super::node::{DataType, NodeId};
use super::pkglen;
use super::tree::AmlTree;
use crate::resource::{descriptors, is_well_terminated};
use crate::sdt::{self, SdtHeader};

/// Cursor over one table's bytes, building nodes into `tree`.
struct Parser<'t, 'a> {
    tree: &'t mut AmlTree,
    data: &'a [u8],
    /// Objects enclosing the current position.
    depth: usize,
}

impl AmlTree {
    /// Parses a complete DSDT or SSDT.
    ///
    /// The header length bounds the bytecode. A bad checksum is logged but
    /// not fatal, since the table is rewritten with a fresh checksum on
    /// [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::UnexpectedEnd`] if the table is truncated,
    /// [`AmlError::InvalidAml`] for malformed bytecode or an opcode outside
    /// the supported grammar or nested deeper than
    /// [`MAX_NESTING_DEPTH`](Self::MAX_NESTING_DEPTH).
    pub fn parse(table: &[u8]) -> Result<Self, AmlError> {
        let header = SdtHeader::read_from_bytes(table).ok_or(AmlError::UnexpectedEnd)?;
        let length = header.length() as usize;
        if length < SdtHeader::SIZE {
            return Err(AmlError::InvalidAml);
        }
        let data = table.get(..length).ok_or(AmlError::UnexpectedEnd)?;
        if !sdt::validate_checksum(data) {
            let sig = header.signature();
            log::warn!(
                "aml: {} checksum does not validate, continuing",
                core::str::from_utf8(&sig).unwrap_or("????")
            );
        }

        let mut tree = Self::new(header);
        let mut parser = Parser {
            tree: &mut tree,
            data,
            depth: 0,
        };
        parser.term_list(Self::ROOT, SdtHeader::SIZE, length, false)?;
        tree.sync_table_length()?;

        if tree.header().length() as usize != length {
            log::debug!(
                "aml: table re-encodes to {:#x} bytes (was {length:#x})",
                tree.header().length()
            );
        }
        Ok(tree)
    }
}

impl Parser<'_, '_> {
    /// Parses objects in `[start, end)` into the variable list of `parent`.
    fn term_list(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
        allow_names: bool,
    ) -> Result<(), AmlError> {
        let mut pos = start;
        while pos < end {
            let (child, len) = if allow_names && self.at_name(pos) {
                self.name_string(pos, end)?
            } else {
                self.object(pos, end)?
            };
            self.tree.link_var_arg(parent, child)?;
            pos += len;
        }
        Ok(())
    }

    fn at_name(&self, pos: usize) -> bool {
        self.data.get(pos).copied().is_some_and(starts_name_string)
    }

    /// Parses one object at `pos`, returning it and its encoded size.
    fn object(&mut self, pos: usize, end: usize) -> Result<(NodeId, usize), AmlError> {
        if self.depth >= AmlTree::MAX_NESTING_DEPTH {
            log::debug!(
                "aml: objects nest deeper than {} at {pos:#x}",
                AmlTree::MAX_NESTING_DEPTH
            );
            return Err(AmlError::InvalidAml);
        }
        self.depth += 1;
        let object = self.decode_object(pos, end);
        self.depth -= 1;
        object
    }

    fn decode_object(&mut self, pos: usize, end: usize) -> Result<(NodeId, usize), AmlError> {
        let data = self.data;
        let bytes = data.get(pos..end).ok_or(AmlError::UnexpectedEnd)?;
        let mut reader = BinaryReader::new(bytes);

        let lead = reader.read::<u8>().ok_or(AmlError::UnexpectedEnd)?;
        let (op, extended) = if lead == EXT_OP_PREFIX {
            (reader.read::<u8>().ok_or(AmlError::UnexpectedEnd)?, true)
        } else {
            (lead, false)
        };
        let Some(opcode) = grammar::lookup(op, extended) else {
            log::debug!(
                "aml: unsupported opcode {}{op:#04x} at {pos:#x}",
                if extended { "0x5b " } else { "" }
            );
            return Err(AmlError::InvalidAml);
        };

        let obj_end = if opcode.has_pkg_len {
            let at = pos + reader.position();
            let (total, _) = pkglen::decode(&mut reader)?;
            let obj_end = at + total as usize;
            if obj_end > end {
                return Err(AmlError::UnexpectedEnd);
            }
            obj_end
        } else {
            end
        };

        let mut cursor = pos + reader.position();
        let mut fixed_args = Vec::with_capacity(opcode.fixed_args.len());
        for &kind in opcode.fixed_args {
            let (arg, len) = self.fixed_arg(kind, cursor, obj_end)?;
            fixed_args.push(arg);
            cursor += len;
        }
        let id = self.tree.new_object_node(opcode, fixed_args)?;

        if opcode.has_pkg_len {
            self.var_list(id, opcode.var_list, cursor, obj_end)?;
            self.tree.refresh_pkg_len(id)?;
            cursor = obj_end;
        }
        Ok((id, cursor - pos))
    }

    fn fixed_arg(&mut self, kind: ArgKind, pos: usize, end: usize) -> Result<(NodeId, usize), AmlError> {
        let data = self.data;
        let rest = data.get(pos..end).ok_or(AmlError::UnexpectedEnd)?;
        match kind {
            ArgKind::UInt8 | ArgKind::UInt16 | ArgKind::UInt32 | ArgKind::UInt64 => {
                let width = kind.int_width().ok_or(AmlError::InvalidAml)?;
                let bytes = rest.get(..width).ok_or(AmlError::UnexpectedEnd)?;
                Ok((self.tree.new_data_node(DataType::UInt, bytes.to_vec())?, width))
            }
            ArgKind::Name => self.name_string(pos, end),
            ArgKind::String => {
                let nul = rest
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(AmlError::UnexpectedEnd)?;
                let bytes = &rest[..=nul];
                Ok((self.tree.new_data_node(DataType::String, bytes.to_vec())?, bytes.len()))
            }
            ArgKind::Object => {
                if self.at_name(pos) {
                    self.name_string(pos, end)
                } else {
                    self.object(pos, end)
                }
            }
        }
    }

    fn name_string(&mut self, pos: usize, end: usize) -> Result<(NodeId, usize), AmlError> {
        let data = self.data;
        let rest = data.get(pos..end).ok_or(AmlError::UnexpectedEnd)?;
        let len = name_string_len(rest).ok_or(AmlError::InvalidAml)?;
        let id = self
            .tree
            .new_data_node(DataType::NameString, rest[..len].to_vec())?;
        Ok((id, len))
    }

    fn var_list(&mut self, id: NodeId, kind: VarList, start: usize, end: usize) -> Result<(), AmlError> {
        if start > end {
            log::debug!("aml: fixed arguments of node {id} overrun its PkgLength");
            return Err(AmlError::InvalidAml);
        }
        let data = self.data;
        let bytes = &data[start..end];
        match kind {
            VarList::None if bytes.is_empty() => Ok(()),
            VarList::None => Err(AmlError::InvalidAml),
            VarList::Terms => self.term_list(id, start, end, false),
            VarList::Elements => self.term_list(id, start, end, true),
            VarList::Bytes if is_well_terminated(bytes) => {
                for desc in descriptors(bytes) {
                    let rd = self.tree.new_data_node(DataType::ResourceData, desc.to_vec())?;
                    self.tree.link_var_arg(id, rd)?;
                }
                Ok(())
            }
            VarList::Bytes | VarList::Opaque => {
                if !bytes.is_empty() {
                    let raw = self.tree.new_data_node(DataType::Raw, bytes.to_vec())?;
                    self.tree.link_var_arg(id, raw)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloc::vec;

    use super::*;
    use crate::aml::grammar::{BUFFER_OP, DEVICE_OP, METHOD_OP, NAME_OP, PACKAGE_OP, SCOPE_OP};
    use crate::sdt::update_checksum;

    /// Wraps `body` in an SSDT header with a valid checksum.
    pub(crate) fn ssdt(body: &[u8]) -> Vec<u8> {
        let mut table = vec![0u8; SdtHeader::SIZE];
        table[..4].copy_from_slice(b"SSDT");
        let len = (SdtHeader::SIZE + body.len()) as u32;
        table[4..8].copy_from_slice(&len.to_le_bytes());
        table[8] = 2;
        table[10..16].copy_from_slice(b"EMBER ");
        table[16..24].copy_from_slice(b"PARSER  ");
        table.extend_from_slice(body);
        update_checksum(&mut table);
        table
    }

    /// Scope(\_SB) { Device(COM0) { Name(_CRS, ResourceTemplate() {
    ///     IO(Decode16, 0x3F8, 0x3F8, 1, 8) }) Name(_UID, One) } }
    pub(crate) fn com0_body() -> Vec<u8> {
        let io = [0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08];
        let mut buffer = vec![BUFFER_OP, 0x0D, 0x0A, 0x0A];
        buffer.extend_from_slice(&io);
        buffer.extend_from_slice(&[0x79, 0x00]);

        let mut crs = vec![NAME_OP];
        crs.extend_from_slice(b"_CRS");
        crs.extend_from_slice(&buffer);

        let mut uid = vec![NAME_OP];
        uid.extend_from_slice(b"_UID");
        uid.push(0x01);

        let mut device_body = b"COM0".to_vec();
        device_body.extend_from_slice(&crs);
        device_body.extend_from_slice(&uid);
        let mut device = vec![EXT_OP_PREFIX, DEVICE_OP, (device_body.len() + 1) as u8];
        device.extend_from_slice(&device_body);

        let mut scope_body = b"\\_SB_".to_vec();
        scope_body.extend_from_slice(&device);
        let mut scope = vec![SCOPE_OP, (scope_body.len() + 1) as u8];
        scope.extend_from_slice(&scope_body);
        scope
    }

    /// `Name(PKG0, Package(1) { Package(1) { ... Package(0) {} } })` with
    /// `levels` Packages.
    pub(crate) fn nested_packages(levels: usize) -> Vec<u8> {
        let mut headers = Vec::with_capacity(levels);
        let mut inner = 0;
        for i in 0..levels {
            let total = pkglen::total_for_content(1 + inner).unwrap();
            let (len, width) = pkglen::encode(total).unwrap();
            let mut header = vec![PACKAGE_OP];
            header.extend_from_slice(&len[..width]);
            header.push(u8::from(i > 0));
            inner += header.len();
            headers.push(header);
        }
        let mut body = vec![NAME_OP, b'P', b'K', b'G', b'0'];
        for header in headers.iter().rev() {
            body.extend_from_slice(header);
        }
        body
    }

    #[test]
    fn parses_nested_scopes() {
        let table = ssdt(&com0_body());
        let tree = AmlTree::parse(&table).unwrap();

        let top = tree.var_args(AmlTree::ROOT);
        assert_eq!(top.len(), 1);
        let scope = top[0];
        assert!(tree.node(scope).unwrap().has_opcode(SCOPE_OP, false));
        let device = tree.var_args(scope)[0];
        assert!(tree.node(device).unwrap().has_opcode(DEVICE_OP, true));
        assert_eq!(tree.var_args(device).len(), 2);

        let crs = tree.var_args(device)[0];
        let buffer = tree.fixed_arg(crs, 1).unwrap();
        let rds = tree.var_args(buffer);
        assert_eq!(rds.len(), 2);
        assert!(rds.iter().all(|&rd| tree.data(rd).unwrap().data_type == DataType::ResourceData));

        assert_eq!(tree.header().length() as usize, table.len());
        assert_eq!(tree.verify_sizes(), Ok(None));
    }

    #[test]
    fn keeps_opaque_bodies() {
        // Method(_STA) { Return (0x0F) }
        let body = [METHOD_OP, 0x09, b'_', b'S', b'T', b'A', 0x00, 0xA4, 0x0A, 0x0F];
        let tree = AmlTree::parse(&ssdt(&body)).unwrap();
        let method = tree.var_args(AmlTree::ROOT)[0];
        let raw = tree.var_args(method);
        assert_eq!(raw.len(), 1);
        assert_eq!(tree.data(raw[0]).unwrap().bytes, vec![0xA4, 0x0A, 0x0F]);
        assert_eq!(tree.data(raw[0]).unwrap().data_type, DataType::Raw);
    }

    #[test]
    fn raw_buffers_and_packages() {
        // Name(BUF0, Buffer(3) { 1, 2, 3 })
        // Name(PKG0, Package(2) { One, \_SB })
        let mut body = vec![NAME_OP, b'B', b'U', b'F', b'0', BUFFER_OP, 0x06, 0x0A, 0x03, 1, 2, 3];
        body.extend_from_slice(&[NAME_OP, b'P', b'K', b'G', b'0', PACKAGE_OP, 0x08, 0x02, 0x01]);
        body.extend_from_slice(b"\\_SB_");
        let tree = AmlTree::parse(&ssdt(&body)).unwrap();

        let buf = tree.fixed_arg(tree.var_args(AmlTree::ROOT)[0], 1).unwrap();
        let raw = tree.var_args(buf)[0];
        assert_eq!(tree.data(raw).unwrap().data_type, DataType::Raw);

        let pkg = tree.fixed_arg(tree.var_args(AmlTree::ROOT)[1], 1).unwrap();
        let elems = tree.var_args(pkg);
        assert_eq!(elems.len(), 2);
        assert_eq!(tree.data(elems[1]).unwrap().data_type, DataType::NameString);
        assert_eq!(tree.verify_sizes(), Ok(None));
    }

    #[test]
    fn rejects_malformed_tables() {
        assert_eq!(AmlTree::parse(&[0u8; 10]).unwrap_err(), AmlError::UnexpectedEnd);

        // PkgLength runs past the table.
        let body = [SCOPE_OP, 0x20, b'_', b'S', b'B', b'_'];
        assert_eq!(AmlTree::parse(&ssdt(&body)).unwrap_err(), AmlError::UnexpectedEnd);

        // Store() is not part of the grammar.
        let body = [0x70, 0x0A, 0x01, 0x60];
        assert_eq!(AmlTree::parse(&ssdt(&body)).unwrap_err(), AmlError::InvalidAml);
    }

    #[test]
    fn nesting_depth_is_bounded() {
        // The Name and its Packages each add one level.
        let deepest = ssdt(&nested_packages(AmlTree::MAX_NESTING_DEPTH - 1));
        let tree = AmlTree::parse(&deepest).unwrap();
        assert_eq!(tree.verify_sizes(), Ok(None));
        assert_eq!(tree.serialize().unwrap(), deepest);

        let too_deep = ssdt(&nested_packages(AmlTree::MAX_NESTING_DEPTH));
        assert_eq!(AmlTree::parse(&too_deep).unwrap_err(), AmlError::InvalidAml);

        let hostile = ssdt(&nested_packages(20_000));
        assert_eq!(AmlTree::parse(&hostile).unwrap_err(), AmlError::InvalidAml);
    }

    #[test]
    fn bad_checksum_still_parses() {
        let mut table = ssdt(&com0_body());
        table[9] = table[9].wrapping_add(1);
        assert!(AmlTree::parse(&table).is_ok());
    }
}

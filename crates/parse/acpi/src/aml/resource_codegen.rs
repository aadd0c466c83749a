//! Generation of Resource Data descriptors inside resource templates.

use alloc::vec;

use super::AmlError;
use super::grammar::NAME_OP;
use super::node::{DataType, NodeId};
use super::tree::AmlTree;
use crate::resource::{InterruptFlags, encode_extended_interrupt, encode_generic_register, extended_interrupt_len};

impl AmlTree {
    /// Places a new descriptor node.
    ///
    /// With a `Name(XXXX, ResourceTemplate() {...})` node the descriptor is
    /// inserted right before the End Tag and the End Tag checksum is reset
    /// to zero; otherwise it is left detached.
    fn place_rd(&mut self, rd: NodeId, name_op: Option<NodeId>) -> Result<NodeId, AmlError> {
        let Some(name_op) = name_op else {
            return Ok(rd);
        };
        let end = match self.node(name_op) {
            Ok(node) if node.has_opcode(NAME_OP, false) => self.end_tag(name_op),
            Ok(_) => Err(AmlError::InvalidParameter),
            Err(e) => Err(e),
        };
        let placed = end.and_then(|end| self.insert_var_arg_before(end, rd));
        if let Err(e) = placed {
            self.delete(rd)?;
            return Err(e);
        }
        self.set_rd_list_checksum(name_op, 0)?;
        Ok(rd)
    }

    /// Generates an `Interrupt()` (Extended Interrupt) descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `irqs` is empty or holds
    /// more than 255 interrupts, or `name_op` is not a `Name` of a
    /// resource template; [`AmlError::NotFound`] if the template lacks an
    /// End Tag.
    pub fn code_gen_rd_interrupt(
        &mut self,
        flags: InterruptFlags,
        irqs: &[u32],
        name_op: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        let mut bytes = vec![0u8; extended_interrupt_len(irqs.len())];
        encode_extended_interrupt(flags, irqs, &mut bytes).ok_or(AmlError::InvalidParameter)?;
        let rd = self.new_data_node(DataType::ResourceData, bytes)?;
        self.place_rd(rd, name_op)
    }

    /// Generates a `Register()` (Generic Register) descriptor.
    ///
    /// # Errors
    ///
    /// As [`code_gen_rd_interrupt`](Self::code_gen_rd_interrupt), for
    /// `name_op`.
    pub fn code_gen_rd_register(
        &mut self,
        space_id: u8,
        bit_width: u8,
        bit_offset: u8,
        access_size: u8,
        address: u64,
        name_op: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        let bytes = encode_generic_register(space_id, bit_width, bit_offset, access_size, address);
        let rd = self.new_data_node(DataType::ResourceData, bytes.to_vec())?;
        self.place_rd(rd, name_op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aml::codegen::TableIds;
    use crate::resource::{AcpiResource, GENERIC_REGISTER_LEN, parse_resource_template};

    fn tree_with_crs() -> (AmlTree, NodeId) {
        let mut tree = AmlTree::definition_block(TableIds {
            signature: *b"SSDT",
            oem_id: *b"EMBER ",
            oem_table_id: *b"RDGEN   ",
            oem_revision: 1,
        })
        .unwrap();
        let dev = tree.code_gen_device("\\_SB.UAR0", Some(AmlTree::ROOT)).unwrap();
        let crs = tree.code_gen_name_resource_template("_CRS", Some(dev)).unwrap();
        (tree, crs)
    }

    fn template_bytes(tree: &AmlTree, name: NodeId) -> alloc::vec::Vec<u8> {
        let buffer = tree.fixed_arg(name, 1).unwrap();
        tree.var_args(buffer)
            .iter()
            .flat_map(|&rd| tree.data(rd).unwrap().bytes.clone())
            .collect()
    }

    #[test]
    fn interrupt_lands_before_end_tag() {
        let (mut tree, crs) = tree_with_crs();
        let buffer = tree.fixed_arg(crs, 1).unwrap();
        tree.set_rd_list_checksum(crs, 0x55).unwrap();

        let flags = InterruptFlags::CONSUMER | InterruptFlags::EDGE;
        let rd = tree.code_gen_rd_interrupt(flags, &[40, 41], Some(crs)).unwrap();
        assert_eq!(tree.var_args(buffer)[0], rd);

        let bytes = template_bytes(&tree, crs);
        let resources: alloc::vec::Vec<_> = parse_resource_template(&bytes).collect();
        assert_eq!(
            resources,
            [
                AcpiResource::ExtendedIrq { gsi: 40, flags },
                AcpiResource::ExtendedIrq { gsi: 41, flags },
            ]
        );
        // Checksum reset, BufferSize follows the list.
        assert_eq!(bytes[bytes.len() - 1], 0);
        let size = tree.fixed_arg(buffer, 0).unwrap();
        assert_eq!(tree.integer_value(size), Ok(bytes.len() as u64));
        assert_eq!(tree.verify_sizes(), Ok(None));
    }

    #[test]
    fn register_descriptor() {
        let (mut tree, crs) = tree_with_crs();
        tree.code_gen_rd_register(0, 32, 0, 3, 0xFED4_0000, Some(crs))
            .unwrap();
        let bytes = template_bytes(&tree, crs);
        assert_eq!(bytes.len(), GENERIC_REGISTER_LEN + 2);
        assert_eq!(
            parse_resource_template(&bytes).next(),
            Some(AcpiResource::GenericRegister {
                space_id: 0,
                bit_width: 32,
                bit_offset: 0,
                access_size: 3,
                address: 0xFED4_0000,
            })
        );
        assert!(tree.serialize().is_ok());
    }

    #[test]
    fn detached_and_invalid_targets() {
        let (mut tree, crs) = tree_with_crs();
        let rd = tree
            .code_gen_rd_interrupt(InterruptFlags::CONSUMER, &[9], None)
            .unwrap();
        assert_eq!(tree.parent(rd), None);
        assert_eq!(tree.data(rd).unwrap().bytes.len(), extended_interrupt_len(1));

        let before = tree.len();
        assert_eq!(
            tree.code_gen_rd_interrupt(InterruptFlags::CONSUMER, &[], Some(crs)),
            Err(AmlError::InvalidParameter)
        );
        let dev = tree.parent(crs).unwrap();
        assert_eq!(
            tree.code_gen_rd_register(0, 8, 0, 1, 0, Some(dev)),
            Err(AmlError::InvalidParameter)
        );
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn missing_end_tag() {
        let (mut tree, crs) = tree_with_crs();
        let buffer = tree.fixed_arg(crs, 1).unwrap();
        let end = tree.var_args(buffer)[0];
        tree.delete(end).unwrap();
        assert_eq!(
            tree.code_gen_rd_interrupt(InterruptFlags::CONSUMER, &[1], Some(crs)),
            Err(AmlError::NotFound)
        );
    }
}

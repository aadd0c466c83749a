//! Namespace lookups over an [`AmlTree`].
//!
//! Paths are resolved against the scopes opened by `Scope`, `Device`,
//! `Method`, `Processor`, `PowerResource` and `ThermalZone` objects. A
//! single-segment relative name follows the ACPI search rules and is looked
//! up in every enclosing scope up to the root.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::AmlError;
use super::grammar::VarList;
use super::name::{NameSeg, NameString, path_to_asl};
use super::node::{DataType, NodeId};
use super::tree::AmlTree;
use crate::resource::is_end_tag;

impl AmlTree {
    /// Returns the NameString of a named object, as written in the table.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<NameString> {
        let obj = self.object(id).ok()?;
        if !obj.opcode.is_named() {
            return None;
        }
        let name = self.data(*obj.fixed_args.first()?).ok()?;
        NameString::parse_aml(&name.bytes).ok().map(|(name, _)| name)
    }

    /// Absolute path of the scope that `id` lives in.
    fn enclosing_scope(&self, id: NodeId) -> Result<Vec<NameSeg>, AmlError> {
        let mut ancestor = self.parent(id);
        while let Some(a) = ancestor {
            if a == Self::ROOT {
                break;
            }
            if self.object(a)?.opcode.opens_scope {
                return self.node_path(a);
            }
            ancestor = self.parent(a);
        }
        Ok(Vec::new())
    }

    /// Absolute namespace path of `id`; empty for the root.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `id` is not a named object
    /// or its name climbs above the root.
    pub fn node_path(&self, id: NodeId) -> Result<Vec<NameSeg>, AmlError> {
        if id == Self::ROOT {
            return Ok(Vec::new());
        }
        let name = self.node_name(id).ok_or(AmlError::InvalidParameter)?;
        let scope = self.enclosing_scope(id)?;
        name.resolve(&scope).ok_or(AmlError::InvalidParameter)
    }

    /// [`node_path`](Self::node_path) formatted as ASL, e.g. `\_SB.COM0`.
    ///
    /// # Errors
    ///
    /// As [`node_path`](Self::node_path).
    pub fn node_path_asl(&self, id: NodeId) -> Result<String, AmlError> {
        Ok(path_to_asl(&self.node_path(id)?))
    }

    /// Finds the object at `path`, resolved from the scope of `reference`.
    ///
    /// `path` is an ASL name: absolute (`\_SB.COM0._CRS`), with parent
    /// prefixes (`^PCI0`) or relative (`COM0._CRS`, `_CRS`). When
    /// `reference` opens a scope, relative names start inside it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NotFound`] if nothing matches and
    /// [`AmlError::InvalidParameter`] for a malformed path.
    pub fn find_node(&self, reference: NodeId, path: &str) -> Result<NodeId, AmlError> {
        let name = NameString::from_asl(path)?;
        let scope = if reference == Self::ROOT {
            Vec::new()
        } else if self.object(reference)?.opcode.opens_scope {
            self.node_path(reference)?
        } else {
            self.enclosing_scope(reference)?
        };

        let search_up = !name.root && name.parent_prefixes == 0 && name.segments.len() == 1;
        let mut base = scope.as_slice();
        loop {
            let target = name.resolve(base).ok_or(AmlError::NotFound)?;
            if target.is_empty() {
                return Ok(Self::ROOT);
            }
            if let Some(found) = self.find_absolute(&target) {
                return Ok(found);
            }
            match base.split_last() {
                Some((_, outer)) if search_up => base = outer,
                _ => return Err(AmlError::NotFound),
            }
        }
    }

    /// Walks the attached tree for the named object at `target`.
    fn find_absolute(&self, target: &[NameSeg]) -> Option<NodeId> {
        let mut stack = vec![(Self::ROOT, Vec::new())];
        while let Some((id, scope)) = stack.pop() {
            // Visit children in table order.
            for &child in self.var_args(id).iter().rev() {
                let Ok(obj) = self.object(child) else {
                    continue;
                };
                let path = self.node_name(child).and_then(|n| n.resolve(&scope));
                if path.as_deref() == Some(target) {
                    return Some(child);
                }
                if obj.opcode.var_list == VarList::Terms {
                    let inner = match path {
                        Some(path) if obj.opcode.opens_scope => path,
                        _ => scope.clone(),
                    };
                    stack.push((child, inner));
                }
            }
        }
        None
    }

    /// First resource descriptor of the template held by `name_op`,
    /// skipping the End Tag.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `name_op` is not a `Name`
    /// of a Buffer.
    pub fn name_op_first_rd(&self, name_op: NodeId) -> Result<Option<NodeId>, AmlError> {
        let buffer = self.resource_buffer(name_op)?;
        Ok(self.var_args(buffer).first().copied().filter(|&rd| self.is_descriptor(rd)))
    }

    /// Descriptor following `rd` in its template, `None` at the End Tag.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `rd` is not part of a
    /// resource template.
    pub fn next_rd(&self, rd: NodeId) -> Result<Option<NodeId>, AmlError> {
        if self.data(rd)?.data_type != DataType::ResourceData {
            return Err(AmlError::InvalidParameter);
        }
        let buffer = self.parent(rd).ok_or(AmlError::InvalidParameter)?;
        let siblings = self.var_args(buffer);
        let index = siblings
            .iter()
            .position(|&id| id == rd)
            .ok_or(AmlError::InvalidParameter)?;
        Ok(siblings
            .get(index + 1)
            .copied()
            .filter(|&next| self.is_descriptor(next)))
    }

    fn is_descriptor(&self, id: NodeId) -> bool {
        self.data(id)
            .is_ok_and(|d| d.data_type == DataType::ResourceData && !is_end_tag(&d.bytes))
    }
}

//! Human-readable rendering of an [`AmlTree`].

use core::fmt;

use super::name::NameString;
use super::node::{DataType, NodeId, NodeKind};
use super::tree::AmlTree;
use super::utility::le_value;
use crate::resource::parse_resource_template;

/// Displays a tree, one node per line, indented by depth.
///
/// Returned by [`AmlTree::display`].
pub struct TreeDisplay<'t> {
    tree: &'t AmlTree,
    root: NodeId,
}

impl AmlTree {
    /// Returns a [`Display`](fmt::Display) adapter for the whole tree.
    #[must_use]
    pub fn display(&self) -> TreeDisplay<'_> {
        TreeDisplay {
            tree: self,
            root: Self::ROOT,
        }
    }

    /// Returns a [`Display`](fmt::Display) adapter for the subtree at `id`.
    #[must_use]
    pub fn display_node(&self, id: NodeId) -> TreeDisplay<'_> {
        TreeDisplay { tree: self, root: id }
    }
}

impl TreeDisplay<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let Ok(node) = self.tree.node(id) else {
            return writeln!(f, "{:indent$}{id} <deleted>", "", indent = depth * 2);
        };
        write!(f, "{:indent$}{id} ", "", indent = depth * 2)?;

        match &node.kind {
            NodeKind::Root(root) => {
                let sig = root.header.signature();
                writeln!(
                    f,
                    "{} length={:#x}",
                    core::str::from_utf8(&sig).unwrap_or("????"),
                    root.header.length()
                )?;
            }
            NodeKind::Object(obj) => {
                write!(f, "{}", obj.opcode.name)?;
                if let Some(name) = self.tree.node_name(id) {
                    write!(f, " {name}")?;
                }
                if let Ok(value) = self.tree.integer_value(id) {
                    write!(f, " {value:#x}")?;
                }
                if let Some(pkg_len) = obj.pkg_len {
                    write!(f, " pkglen={pkg_len:#x}")?;
                }
                writeln!(f)?;
            }
            NodeKind::Data(data) => {
                match data.data_type {
                    DataType::NameString => match NameString::parse_aml(&data.bytes) {
                        Ok((name, _)) => write!(f, "name {name}")?,
                        Err(_) => write!(f, "name <invalid>")?,
                    },
                    DataType::String => {
                        let text = data.bytes.strip_suffix(&[0]).unwrap_or(data.bytes.as_slice());
                        write!(f, "string {:?}", core::str::from_utf8(text).unwrap_or("<binary>"))?;
                    }
                    DataType::UInt => match le_value(&data.bytes) {
                        Some(v) => write!(f, "uint{} {v:#x}", data.bytes.len() * 8)?,
                        None => write!(f, "uint <invalid>")?,
                    },
                    DataType::Raw => write!(f, "raw {} bytes", data.bytes.len())?,
                    DataType::ResourceData => {
                        write!(f, "rd tag={:#04x}", data.bytes.first().copied().unwrap_or(0))?;
                        if let Some(res) = parse_resource_template(&data.bytes).next() {
                            write!(f, " {res:?}")?;
                        }
                    }
                }
                writeln!(f)?;
                return Ok(());
            }
        }

        if let NodeKind::Object(obj) = &node.kind {
            // The name is already shown on the object line.
            let skip = usize::from(self.tree.node_name(id).is_some());
            for &arg in obj.fixed_args.iter().skip(skip) {
                self.write_node(f, arg, depth + 1)?;
            }
        }
        for &child in self.tree.var_args(id) {
            self.write_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root, 0)
    }
}

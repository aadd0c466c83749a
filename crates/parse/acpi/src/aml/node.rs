//! Node types of the AML object tree.

use alloc::vec::Vec;

use super::grammar::AmlOpcode;
use crate::sdt::SdtHeader;

/// Index of a node in an [`AmlTree`](super::AmlTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type of the payload held by a data node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// An encoded AML NameString.
    NameString,
    /// A NUL-terminated string, terminator included.
    String,
    /// A little-endian integer of 1, 2, 4 or 8 bytes.
    UInt,
    /// Opaque bytes.
    Raw,
    /// One complete resource descriptor.
    ResourceData,
}

/// The root of a definition block.
#[derive(Debug, Clone)]
pub struct RootNode {
    /// The table header; `length` tracks the serialized size.
    pub header: SdtHeader,
    /// Top-level objects of the TermList.
    pub var_args: Vec<NodeId>,
}

/// An AML object: an opcode with its arguments.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// Grammar entry of the encoding.
    pub opcode: &'static AmlOpcode,
    /// Cached PkgLength value, for encodings that carry one.
    pub pkg_len: Option<u32>,
    /// Fixed arguments, one per slot of the grammar entry.
    pub fixed_args: Vec<NodeId>,
    /// Variable arguments.
    pub var_args: Vec<NodeId>,
}

/// A leaf carrying bytes.
#[derive(Debug, Clone)]
pub struct DataNode {
    /// How the bytes are interpreted.
    pub data_type: DataType,
    /// The payload, exactly as serialized.
    pub bytes: Vec<u8>,
}

/// The three node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The definition block root.
    Root(RootNode),
    /// An opcode-bearing object.
    Object(ObjectNode),
    /// A data leaf.
    Data(DataNode),
}

/// A node and its link to its parent.
#[derive(Debug, Clone)]
pub struct Node {
    /// The parent, or `None` for the root and for detached nodes.
    pub parent: Option<NodeId>,
    /// Node contents.
    pub kind: NodeKind,
}

impl Node {
    /// Returns the object contents, if this is an object node.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns the data contents, if this is a data node.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataNode> {
        match &self.kind {
            NodeKind::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Returns `true` if this is an object node with opcode `op`.
    #[must_use]
    pub fn has_opcode(&self, op: u8, extended: bool) -> bool {
        self.as_object()
            .is_some_and(|obj| obj.opcode.op == op && obj.opcode.extended == extended)
    }

    /// Returns the variable argument list, if the node has one.
    #[must_use]
    pub fn var_args(&self) -> Option<&[NodeId]> {
        match &self.kind {
            NodeKind::Root(root) => Some(&root.var_args),
            NodeKind::Object(obj) => Some(&obj.var_args),
            NodeKind::Data(_) => None,
        }
    }
}

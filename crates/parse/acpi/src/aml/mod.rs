//! An editable tree of AML (ACPI Machine Language) objects.
//!
//! [`AmlTree::parse`] turns a DSDT or SSDT into an arena of nodes:
//!
//! - the **root** owns the table header and the top-level TermList,
//! - **object** nodes carry an opcode from the [`grammar`] table, the
//!   PkgLength cached when the encoding has one, fixed arguments and a
//!   variable argument list,
//! - **data** nodes carry bytes: names, strings, integers, raw bodies and
//!   individual resource descriptors.
//!
//! Edits go through [`AmlTree`] methods that keep every PkgLength, Buffer
//! size, Package element count and the table length in step with the tree,
//! so [`AmlTree::serialize`] always produces a consistent table.
//!
//! Method, Field and control-flow bodies are not decoded; they are kept as
//! one opaque node and copied through unchanged.

pub mod codegen;
pub mod display;
pub mod grammar;
pub mod name;
pub mod namespace;
pub mod node;
pub mod parser;
pub mod pkglen;
pub mod resource_codegen;
pub mod serialize;
pub mod tree;
pub mod utility;

pub use grammar::{AmlOpcode, ArgKind, VarList};
pub use name::{NameSeg, NameString, aml_to_asl_name, asl_to_aml_name, name_string_len};
pub use node::{DataNode, DataType, Node, NodeId, NodeKind, ObjectNode, RootNode};
pub use codegen::TableIds;
pub use display::TreeDisplay;
pub use tree::{AmlTree, CachedField, Mismatch};

use core::fmt;

use ember_uefi::EfiStatus;

/// Errors produced while parsing, editing or generating AML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmlError {
    /// An argument is malformed, of the wrong type, or not allowed where it
    /// was placed.
    InvalidParameter,
    /// A size or count outgrew its encoding.
    OutOfResources,
    /// The requested path, node or End Tag does not exist.
    NotFound,
    /// The bytecode ended in the middle of an object.
    UnexpectedEnd,
    /// The bytecode does not follow the AML grammar.
    InvalidAml,
    /// An output buffer is too small.
    BufferTooSmall,
}

impl fmt::Display for AmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidParameter => "invalid AML parameter",
            Self::OutOfResources => "AML object too large",
            Self::NotFound => "AML object not found",
            Self::UnexpectedEnd => "unexpected end of AML",
            Self::InvalidAml => "malformed AML",
            Self::BufferTooSmall => "buffer too small",
        })
    }
}

impl core::error::Error for AmlError {}

impl From<AmlError> for EfiStatus {
    fn from(e: AmlError) -> Self {
        match e {
            AmlError::OutOfResources => EfiStatus::OUT_OF_RESOURCES,
            AmlError::NotFound => EfiStatus::NOT_FOUND,
            AmlError::BufferTooSmall => EfiStatus::BUFFER_TOO_SMALL,
            AmlError::InvalidParameter | AmlError::UnexpectedEnd | AmlError::InvalidAml => {
                EfiStatus::INVALID_PARAMETER
            }
        }
    }
}

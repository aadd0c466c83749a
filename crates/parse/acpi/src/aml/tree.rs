//! The AML tree arena and its structural operations.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]; the
//! root is always [`AmlTree::ROOT`]. Every object node carrying a PkgLength
//! caches its value and the root caches the table length. Any edit that
//! changes a subtree's size or element count is followed by
//! [`propagate_information`](AmlTree::propagate_information), which keeps
//! the cached values equal to what [`compute_size`](AmlTree::compute_size)
//! would recompute from scratch.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use super::AmlError;
use super::grammar::{self, AmlOpcode, BUFFER_OP, PACKAGE_OP, VarList};
use super::node::{DataNode, DataType, Node, NodeId, NodeKind, ObjectNode, RootNode};
use super::pkglen;
use crate::sdt::SdtHeader;

/// An editable AML definition block.
#[derive(Debug, Clone)]
pub struct AmlTree {
    nodes: Vec<Option<Node>>,
}

/// Which cached field disagreed in [`AmlTree::verify_sizes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedField {
    /// An object's PkgLength.
    PkgLength,
    /// The table length in the root's header.
    TableLength,
    /// A Package's NumElements.
    ElementCount,
}

/// A cached value that no longer matches the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// The node holding the stale value.
    pub node: NodeId,
    /// The stale field.
    pub field: CachedField,
    /// The cached value.
    pub cached: u64,
    /// The value recomputed from the subtree.
    pub computed: u64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}: cached {:?} {:#x} but subtree gives {:#x}",
            self.node, self.field, self.cached, self.computed
        )
    }
}

impl core::error::Error for Mismatch {}

fn to_delta(size: usize) -> Result<i64, AmlError> {
    i64::try_from(size).map_err(|_| AmlError::OutOfResources)
}

/// A cached value rewritten by a size change.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SizeUpdate {
    TableLength(u32),
    PkgLength(NodeId, u32),
    BufferSize(NodeId, u64),
}

impl AmlTree {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Deepest nesting of objects a tree may hold.
    ///
    /// Parsing rejects deeper bytecode and edits that would exceed it fail,
    /// which bounds the recursion of every walk over the tree.
    pub const MAX_NESTING_DEPTH: usize = 64;

    /// Creates a tree holding only a root with `header`.
    ///
    /// The header length is reset to the size of the empty table.
    #[must_use]
    pub fn new(mut header: SdtHeader) -> Self {
        header.length = SdtHeader::SIZE as u32;
        Self {
            nodes: vec![Some(Node {
                parent: None,
                kind: NodeKind::Root(RootNode {
                    header,
                    var_args: Vec::new(),
                }),
            })],
        }
    }

    /// Returns the node `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `id` was deleted or never
    /// existed.
    pub fn node(&self, id: NodeId) -> Result<&Node, AmlError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(AmlError::InvalidParameter)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AmlError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(AmlError::InvalidParameter)
    }

    /// Returns the object contents of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `id` is not an object node.
    pub fn object(&self, id: NodeId) -> Result<&ObjectNode, AmlError> {
        self.node(id)?.as_object().ok_or(AmlError::InvalidParameter)
    }

    pub(crate) fn object_mut(&mut self, id: NodeId) -> Result<&mut ObjectNode, AmlError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Object(obj) => Ok(obj),
            _ => Err(AmlError::InvalidParameter),
        }
    }

    /// Returns the data contents of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `id` is not a data node.
    pub fn data(&self, id: NodeId) -> Result<&DataNode, AmlError> {
        self.node(id)?.as_data().ok_or(AmlError::InvalidParameter)
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> Result<&mut DataNode, AmlError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Data(data) => Ok(data),
            _ => Err(AmlError::InvalidParameter),
        }
    }

    fn root(&self) -> &RootNode {
        match self.nodes.first() {
            Some(Some(Node {
                kind: NodeKind::Root(root),
                ..
            })) => root,
            // The arena is created with the root at index 0 and it can
            // never be deleted.
            _ => unreachable!("AML tree without a root"),
        }
    }

    fn root_mut(&mut self) -> &mut RootNode {
        match self.nodes.first_mut() {
            Some(Some(Node {
                kind: NodeKind::Root(root),
                ..
            })) => root,
            _ => unreachable!("AML tree without a root"),
        }
    }

    /// Returns a copy of the table header.
    #[must_use]
    pub fn header(&self) -> SdtHeader {
        self.root().header
    }

    /// Updates the identification fields of the table header.
    ///
    /// The length and checksum stay under the tree's control.
    pub fn set_header(&mut self, header: SdtHeader) {
        let root = self.root_mut();
        let length = root.header.length;
        root.header = header;
        root.header.length = length;
    }

    /// Parent of `id`, or `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    /// Fixed argument `index` of the object `id`.
    #[must_use]
    pub fn fixed_arg(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.object(id).ok()?.fixed_args.get(index).copied()
    }

    /// Variable arguments of `id`; empty for data nodes.
    #[must_use]
    pub fn var_args(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .ok()
            .and_then(Node::var_args)
            .unwrap_or(&[])
    }

    /// Number of live nodes, detached ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Always `false`: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    fn alloc(&mut self, node: Node) -> Result<NodeId, AmlError> {
        let id = u32::try_from(self.nodes.len()).map_err(|_| AmlError::OutOfResources)?;
        self.nodes.push(Some(node));
        Ok(NodeId(id))
    }

    /// Creates a detached data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfResources`] if the arena is full.
    pub fn new_data_node(&mut self, data_type: DataType, bytes: Vec<u8>) -> Result<NodeId, AmlError> {
        self.alloc(Node {
            parent: None,
            kind: NodeKind::Data(DataNode { data_type, bytes }),
        })
    }

    /// Creates a detached object node with the given fixed arguments and
    /// an empty variable argument list.
    ///
    /// The fixed arguments must be detached nodes matching the grammar
    /// entry's slots; they become children of the new node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if the arguments do not match
    /// the grammar, or [`AmlError::OutOfResources`] if the object is too
    /// large for a PkgLength.
    pub fn new_object_node(
        &mut self,
        opcode: &'static AmlOpcode,
        fixed_args: Vec<NodeId>,
    ) -> Result<NodeId, AmlError> {
        if fixed_args.len() != opcode.fixed_args.len() {
            return Err(AmlError::InvalidParameter);
        }
        let mut content = 0usize;
        for (&arg, &kind) in fixed_args.iter().zip(opcode.fixed_args) {
            let node = self.node(arg)?;
            if node.parent.is_some() || arg == Self::ROOT || !self.fits_fixed_slot(node, kind) {
                return Err(AmlError::InvalidParameter);
            }
            content += self.compute_size(arg)?;
            if self.object_height(arg)? >= Self::MAX_NESTING_DEPTH {
                return Err(AmlError::InvalidParameter);
            }
        }
        let pkg_len = if opcode.has_pkg_len {
            Some(pkglen::total_for_content(content).ok_or(AmlError::OutOfResources)?)
        } else {
            None
        };

        let id = self.alloc(Node {
            parent: None,
            kind: NodeKind::Object(ObjectNode {
                opcode,
                pkg_len,
                fixed_args: fixed_args.clone(),
                var_args: Vec::new(),
            }),
        })?;
        for arg in fixed_args {
            self.node_mut(arg)?.parent = Some(id);
        }
        Ok(id)
    }

    fn fits_fixed_slot(&self, node: &Node, kind: grammar::ArgKind) -> bool {
        use grammar::ArgKind;
        match (&node.kind, kind) {
            (NodeKind::Data(d), ArgKind::UInt8 | ArgKind::UInt16 | ArgKind::UInt32 | ArgKind::UInt64) => {
                d.data_type == DataType::UInt && Some(d.bytes.len()) == kind.int_width()
            }
            (NodeKind::Data(d), ArgKind::Name) => d.data_type == DataType::NameString,
            (NodeKind::Data(d), ArgKind::String) => d.data_type == DataType::String,
            (NodeKind::Data(d), ArgKind::Object) => d.data_type == DataType::NameString,
            (NodeKind::Object(_), ArgKind::Object) => true,
            _ => false,
        }
    }

    /// Returns the full serialized size of the subtree rooted at `id`,
    /// recomputed without using any cached value.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] for a dangling id and
    /// [`AmlError::OutOfResources`] if an object outgrows its PkgLength.
    pub fn compute_size(&self, id: NodeId) -> Result<usize, AmlError> {
        match &self.node(id)?.kind {
            NodeKind::Root(root) => {
                let mut size = SdtHeader::SIZE;
                for &child in &root.var_args {
                    size += self.compute_size(child)?;
                }
                Ok(size)
            }
            NodeKind::Data(data) => Ok(data.bytes.len()),
            NodeKind::Object(obj) => {
                let content = self.content_size(obj)?;
                let pkg_width = if obj.opcode.has_pkg_len {
                    let total = pkglen::total_for_content(content).ok_or(AmlError::OutOfResources)?;
                    pkglen::encoding_width(total).ok_or(AmlError::OutOfResources)?
                } else {
                    0
                };
                Ok(obj.opcode.op_len() + pkg_width + content)
            }
        }
    }

    /// Size of an object's arguments, the bytes a PkgLength would cover.
    fn content_size(&self, obj: &ObjectNode) -> Result<usize, AmlError> {
        let mut content = 0;
        for &child in obj.fixed_args.iter().chain(&obj.var_args) {
            content += self.compute_size(child)?;
        }
        Ok(content)
    }

    /// Propagates a change of `size_delta` bytes and `count_delta` elements
    /// in the arguments of `node` up to the root.
    ///
    /// `node` is the object (or root) whose argument list changed. Every
    /// PkgLength on the way up is re-encoded and any change of its own width
    /// is added to the delta carried further. A Buffer's BufferSize integer
    /// follows the size of its byte list, a Package's NumElements follows
    /// `count_delta` (only at `node` itself), and the root's table length
    /// absorbs the final delta.
    ///
    /// Every new value is computed before any is stored, so on error the
    /// tree is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `node` is a data node or a
    /// count would leave its valid range, and [`AmlError::OutOfResources`]
    /// if a size overflows.
    pub fn propagate_information(
        &mut self,
        node: NodeId,
        size_delta: i64,
        count_delta: i64,
    ) -> Result<(), AmlError> {
        let count = self.plan_count(node, count_delta)?;
        let sizes = self.plan_size(node, size_delta, None)?;
        self.apply_count(count)?;
        self.apply_sizes(sizes)
    }

    /// Computes the new NumElements of `node` if it is a Package.
    fn plan_count(&self, node: NodeId, count_delta: i64) -> Result<Option<(NodeId, u8)>, AmlError> {
        if count_delta == 0 || !self.node(node)?.has_opcode(PACKAGE_OP, false) {
            return Ok(None);
        }
        let num_elements = self.fixed_arg(node, 0).ok_or(AmlError::InvalidAml)?;
        let old = self.data(num_elements)?.bytes.first().copied().ok_or(AmlError::InvalidAml)?;
        let new = i64::from(old) + count_delta;
        let new = u8::try_from(new).map_err(|_| {
            if new < 0 {
                AmlError::InvalidParameter
            } else {
                AmlError::OutOfResources
            }
        })?;
        Ok(Some((num_elements, new)))
    }

    fn apply_count(&mut self, count: Option<(NodeId, u8)>) -> Result<(), AmlError> {
        if let Some((num_elements, value)) = count {
            let data = self.data_mut(num_elements)?;
            let byte = data.bytes.first_mut().ok_or(AmlError::InvalidAml)?;
            *byte = value;
        }
        Ok(())
    }

    /// Walks from `start` to the root computing the cached values a size
    /// change of `delta` bytes rewrites.
    ///
    /// `from` is the child of `start` whose size changed, when known; a
    /// change coming from a Buffer's BufferSize argument itself does not
    /// feed back into BufferSize.
    pub(crate) fn plan_size(
        &self,
        start: NodeId,
        mut delta: i64,
        mut from: Option<NodeId>,
    ) -> Result<Vec<SizeUpdate>, AmlError> {
        let mut updates = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if delta == 0 {
                break;
            }
            let node = self.node(id)?;

            match &node.kind {
                NodeKind::Data(_) => return Err(AmlError::InvalidParameter),
                NodeKind::Root(root) => {
                    let length = i64::from(root.header.length) + delta;
                    let length = u32::try_from(length).map_err(|_| AmlError::OutOfResources)?;
                    updates.push(SizeUpdate::TableLength(length));
                    break;
                }
                NodeKind::Object(obj) => {
                    let is_buffer = !obj.opcode.extended && obj.opcode.op == BUFFER_OP;
                    let buffer_size = obj.fixed_args.first().copied();
                    if is_buffer && from != buffer_size {
                        if let Some(size_arg) = buffer_size {
                            if let Some((value, growth)) = self.plan_buffer_size(size_arg, delta)? {
                                updates.push(SizeUpdate::BufferSize(size_arg, value));
                                delta += growth;
                            }
                        }
                    }

                    if let Some(old) = obj.pkg_len {
                        let old_width = pkglen::encoding_width(old).ok_or(AmlError::InvalidAml)?;
                        let content = i64::from(old) - to_delta(old_width)? + delta;
                        let content = usize::try_from(content).map_err(|_| AmlError::InvalidParameter)?;
                        let new = pkglen::total_for_content(content).ok_or(AmlError::OutOfResources)?;
                        let new_width = pkglen::encoding_width(new).ok_or(AmlError::OutOfResources)?;
                        updates.push(SizeUpdate::PkgLength(id, new));
                        delta += to_delta(new_width)? - to_delta(old_width)?;
                    }
                }
            }

            from = Some(id);
            current = node.parent;
        }
        Ok(updates)
    }

    /// New value of a Buffer's BufferSize integer after its byte list grew
    /// by `delta`, with how much the integer's own encoding grows.
    ///
    /// Returns `None` when BufferSize is not a constant.
    fn plan_buffer_size(&self, size_arg: NodeId, delta: i64) -> Result<Option<(u64, i64)>, AmlError> {
        let Ok(old) = self.integer_value(size_arg) else {
            log::debug!("aml: BufferSize of node {size_arg} is not a constant, left as is");
            return Ok(None);
        };
        let new = i128::from(old) + i128::from(delta);
        let new = u64::try_from(new).map_err(|_| AmlError::InvalidParameter)?;
        let old_size = self.compute_size(size_arg)?;
        let new_size = self.integer_size(new)?;
        Ok(Some((new, to_delta(new_size)? - to_delta(old_size)?)))
    }

    /// Stores values computed by [`plan_size`](Self::plan_size).
    pub(crate) fn apply_sizes(&mut self, updates: Vec<SizeUpdate>) -> Result<(), AmlError> {
        for update in updates {
            match update {
                SizeUpdate::TableLength(length) => self.root_mut().header.length = length,
                SizeUpdate::PkgLength(id, total) => self.object_mut(id)?.pkg_len = Some(total),
                SizeUpdate::BufferSize(id, value) => {
                    self.write_integer(id, value)?;
                }
            }
        }
        Ok(())
    }

    /// Number of objects on the path from the root down to `id`, `id`
    /// included.
    fn object_depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = Some(id);
        while let Some(n) = current {
            if self.object(n).is_ok() {
                depth += 1;
            }
            current = self.parent(n);
        }
        depth
    }

    /// Length of the longest chain of nested objects starting at `id`.
    fn object_height(&self, id: NodeId) -> Result<usize, AmlError> {
        let mut height = 0;
        let mut stack = vec![(id, 1)];
        while let Some((n, depth)) = stack.pop() {
            if let NodeKind::Object(obj) = &self.node(n)?.kind {
                height = height.max(depth);
                stack.extend(obj.fixed_args.iter().chain(&obj.var_args).map(|&c| (c, depth + 1)));
            }
        }
        Ok(height)
    }

    /// Checks that `child` may be placed in the variable arguments of `parent`.
    fn check_var_arg(&self, parent: NodeId, child: NodeId) -> Result<(), AmlError> {
        let child_node = self.node(child)?;
        if child == Self::ROOT || child_node.parent.is_some() {
            return Err(AmlError::InvalidParameter);
        }

        let child_is_object = child_node.as_object().is_some();
        let child_data = child_node.as_data().map(|d| d.data_type);
        let ok = match &self.node(parent)?.kind {
            NodeKind::Root(_) => child_is_object,
            NodeKind::Data(_) => false,
            NodeKind::Object(obj) => match obj.opcode.var_list {
                VarList::None => false,
                VarList::Terms => child_is_object,
                VarList::Bytes => {
                    matches!(child_data, Some(DataType::Raw | DataType::ResourceData))
                }
                VarList::Elements => child_is_object || child_data == Some(DataType::NameString),
                VarList::Opaque => obj.var_args.is_empty() && child_data == Some(DataType::Raw),
            },
        };
        if !ok {
            return Err(AmlError::InvalidParameter);
        }

        // Attaching a node below itself would create a cycle.
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(AmlError::InvalidParameter);
            }
            ancestor = self.parent(a);
        }

        if self.object_depth(parent) + self.object_height(child)? > Self::MAX_NESTING_DEPTH {
            log::debug!("aml: node {child} would nest deeper than {} objects", Self::MAX_NESTING_DEPTH);
            return Err(AmlError::InvalidParameter);
        }
        Ok(())
    }

    fn var_args_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>, AmlError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Root(root) => Ok(&mut root.var_args),
            NodeKind::Object(obj) => Ok(&mut obj.var_args),
            NodeKind::Data(_) => Err(AmlError::InvalidParameter),
        }
    }

    fn insert_var_arg(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), AmlError> {
        self.check_var_arg(parent, child)?;
        let size = to_delta(self.compute_size(child)?)?;
        let count = self.plan_count(parent, 1)?;
        let sizes = self.plan_size(parent, size, None).inspect_err(|e| {
            log::warn!("aml: attaching node {child} to {parent} failed: {e}");
        })?;

        self.var_args_mut(parent)?.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.apply_count(count)?;
        self.apply_sizes(sizes)
    }

    /// Links `child` under `parent` without touching any cached value.
    ///
    /// Used while building a tree whose sizes are fixed up afterwards.
    pub(crate) fn link_var_arg(&mut self, parent: NodeId, child: NodeId) -> Result<(), AmlError> {
        self.check_var_arg(parent, child)?;
        self.var_args_mut(parent)?.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Recomputes the cached PkgLength of `id` from its arguments.
    pub(crate) fn refresh_pkg_len(&mut self, id: NodeId) -> Result<(), AmlError> {
        let obj = self.object(id)?;
        if obj.pkg_len.is_none() {
            return Ok(());
        }
        let content = self.content_size(obj)?;
        let total = pkglen::total_for_content(content).ok_or(AmlError::OutOfResources)?;
        self.object_mut(id)?.pkg_len = Some(total);
        Ok(())
    }

    /// Recomputes the table length from the whole tree.
    pub(crate) fn sync_table_length(&mut self) -> Result<(), AmlError> {
        let size = self.compute_size(Self::ROOT)?;
        self.root_mut().header.length = u32::try_from(size).map_err(|_| AmlError::OutOfResources)?;
        Ok(())
    }

    /// Appends the detached node `child` to the variable arguments of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `child` is attached, is the
    /// root, an ancestor of `parent`, or not allowed in `parent`'s list.
    pub fn attach_var_arg(&mut self, parent: NodeId, child: NodeId) -> Result<(), AmlError> {
        let index = self.var_args(parent).len();
        self.insert_var_arg(parent, index, child)
    }

    /// Inserts the detached node `child` right before the variable argument
    /// `sibling`.
    ///
    /// # Errors
    ///
    /// As [`attach_var_arg`](Self::attach_var_arg); also fails if `sibling`
    /// is not a variable argument.
    pub fn insert_var_arg_before(&mut self, sibling: NodeId, child: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(sibling).ok_or(AmlError::InvalidParameter)?;
        let index = self
            .var_args(parent)
            .iter()
            .position(|&id| id == sibling)
            .ok_or(AmlError::InvalidParameter)?;
        self.insert_var_arg(parent, index, child)
    }

    /// Detaches the variable argument `node` from its parent.
    ///
    /// The subtree stays in the arena and can be attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] if `node` is not attached as a
    /// variable argument.
    pub fn detach(&mut self, node: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(node).ok_or(AmlError::InvalidParameter)?;
        let index = self
            .var_args(parent)
            .iter()
            .position(|&id| id == node)
            .ok_or(AmlError::InvalidParameter)?;
        let size = to_delta(self.compute_size(node)?)?;

        self.propagate_information(parent, -size, -1)?;
        self.var_args_mut(parent)?.remove(index);
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    /// Deletes `node` and its whole subtree, detaching it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidParameter`] for the root, a dangling id,
    /// or a fixed argument.
    pub fn delete(&mut self, node: NodeId) -> Result<(), AmlError> {
        if node == Self::ROOT {
            return Err(AmlError::InvalidParameter);
        }
        if self.parent(node).is_some() {
            self.detach(node)?;
        } else {
            self.node(node)?;
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                if let Some(Node {
                    kind: NodeKind::Object(obj),
                    ..
                }) = slot.take()
                {
                    stack.extend(obj.fixed_args);
                    stack.extend(obj.var_args);
                }
            }
        }
        Ok(())
    }

    /// Recomputes every cached size and count reachable from the root and
    /// reports the first one that is stale.
    ///
    /// # Errors
    ///
    /// Fails only if the tree is structurally broken, for example an
    /// object too large for a PkgLength.
    pub fn verify_sizes(&self) -> Result<Option<Mismatch>, AmlError> {
        let computed = self.compute_size(Self::ROOT)?;
        let cached = self.header().length();
        if cached as usize != computed {
            return Ok(Some(Mismatch {
                node: Self::ROOT,
                field: CachedField::TableLength,
                cached: u64::from(cached),
                computed: computed as u64,
            }));
        }

        let mut stack: Vec<NodeId> = self.var_args(Self::ROOT).to_vec();
        while let Some(id) = stack.pop() {
            let Ok(obj) = self.object(id) else {
                continue;
            };
            if let Some(cached) = obj.pkg_len {
                let content = self.content_size(obj)?;
                let computed = pkglen::total_for_content(content).ok_or(AmlError::OutOfResources)?;
                if cached != computed {
                    return Ok(Some(Mismatch {
                        node: id,
                        field: CachedField::PkgLength,
                        cached: u64::from(cached),
                        computed: u64::from(computed),
                    }));
                }
            }
            if !obj.opcode.extended && obj.opcode.op == PACKAGE_OP {
                let count = self
                    .fixed_arg(id, 0)
                    .and_then(|n| self.data(n).ok())
                    .and_then(|d| d.bytes.first().copied())
                    .ok_or(AmlError::InvalidAml)?;
                // NumElements may exceed the initialized elements, never the reverse.
                if usize::from(count) < obj.var_args.len() {
                    return Ok(Some(Mismatch {
                        node: id,
                        field: CachedField::ElementCount,
                        cached: u64::from(count),
                        computed: obj.var_args.len() as u64,
                    }));
                }
            }
            stack.extend(obj.fixed_args.iter().chain(&obj.var_args));
        }
        Ok(None)
    }
}

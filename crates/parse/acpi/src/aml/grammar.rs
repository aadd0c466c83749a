//! The AML opcode grammar understood by the object tree.
//!
//! Each [`AmlOpcode`] entry describes how one encoding is laid out: its
//! opcode bytes, the ordered kinds of its fixed arguments, whether a
//! PkgLength follows the opcode, and what its variable argument list holds.

/// Prefix byte of the two-byte extended opcodes.
pub const EXT_OP_PREFIX: u8 = 0x5B;

/// The kind of one fixed argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Little-endian integer of 1 byte.
    UInt8,
    /// Little-endian integer of 2 bytes.
    UInt16,
    /// Little-endian integer of 4 bytes.
    UInt32,
    /// Little-endian integer of 8 bytes.
    UInt64,
    /// An AML NameString.
    Name,
    /// A NUL-terminated ASCII string.
    String,
    /// A nested object or a name reference (TermArg / DataRefObject).
    Object,
}

impl ArgKind {
    /// Width in bytes of the integer kinds.
    #[must_use]
    pub const fn int_width(self) -> Option<usize> {
        match self {
            Self::UInt8 => Some(1),
            Self::UInt16 => Some(2),
            Self::UInt32 => Some(4),
            Self::UInt64 => Some(8),
            _ => None,
        }
    }
}

/// What the variable argument list of an object holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarList {
    /// No variable arguments.
    None,
    /// A TermList of objects.
    Terms,
    /// The byte list of a Buffer: raw bytes or resource descriptors.
    Bytes,
    /// Package elements: objects or name references.
    Elements,
    /// An opaque body kept as a single raw data node.
    Opaque,
}

/// Grammar entry for one AML encoding.
#[derive(Debug, PartialEq, Eq)]
pub struct AmlOpcode {
    /// Display name, matching the ASL keyword where one exists.
    pub name: &'static str,
    /// Opcode byte (second byte for extended opcodes).
    pub op: u8,
    /// `true` for `0x5B`-prefixed opcodes.
    pub extended: bool,
    /// Fixed arguments, in encoding order.
    pub fixed_args: &'static [ArgKind],
    /// Whether a PkgLength follows the opcode.
    pub has_pkg_len: bool,
    /// Contents of the variable argument list.
    pub var_list: VarList,
    /// Whether the object opens a namespace scope named by fixed arg 0.
    pub opens_scope: bool,
}

impl AmlOpcode {
    /// Size of the opcode in bytes.
    #[must_use]
    pub const fn op_len(&self) -> usize {
        if self.extended { 2 } else { 1 }
    }

    /// Whether fixed argument 0 names the object in the namespace.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.fixed_args.first() == Some(&ArgKind::Name) && self.op != ALIAS_OP
    }
}

macro_rules! opcodes {
    ($(
        $const:ident = $name:literal, $ext:literal, $op:literal,
            [$($arg:ident),*], $pkg:literal, $var:ident, $scope:literal;
    )*) => {
        $(
            #[doc = concat!("Opcode byte of `", $name, "`.")]
            pub const $const: u8 = $op;
        )*

        /// Every encoding the tree can represent.
        pub const OPCODES: &[AmlOpcode] = &[
            $(
                AmlOpcode {
                    name: $name,
                    op: $op,
                    extended: $ext,
                    fixed_args: &[$(ArgKind::$arg),*],
                    has_pkg_len: $pkg,
                    var_list: VarList::$var,
                    opens_scope: $scope,
                },
            )*
        ];
    };
}

opcodes! {
    ZERO_OP         = "Zero",        false, 0x00, [],                                false, None,     false;
    ONE_OP          = "One",         false, 0x01, [],                                false, None,     false;
    ALIAS_OP        = "Alias",       false, 0x06, [Name, Name],                      false, None,     false;
    NAME_OP         = "Name",        false, 0x08, [Name, Object],                    false, None,     false;
    BYTE_PREFIX     = "Byte",        false, 0x0A, [UInt8],                           false, None,     false;
    WORD_PREFIX     = "Word",        false, 0x0B, [UInt16],                          false, None,     false;
    DWORD_PREFIX    = "DWord",       false, 0x0C, [UInt32],                          false, None,     false;
    STRING_PREFIX   = "String",      false, 0x0D, [String],                          false, None,     false;
    QWORD_PREFIX    = "QWord",       false, 0x0E, [UInt64],                          false, None,     false;
    SCOPE_OP        = "Scope",       false, 0x10, [Name],                            true,  Terms,    true;
    BUFFER_OP       = "Buffer",      false, 0x11, [Object],                          true,  Bytes,    false;
    PACKAGE_OP      = "Package",     false, 0x12, [UInt8],                           true,  Elements, false;
    METHOD_OP       = "Method",      false, 0x14, [Name, UInt8],                     true,  Opaque,   true;
    EXTERNAL_OP     = "External",    false, 0x15, [Name, UInt8, UInt8],              false, None,     false;
    IF_OP           = "If",          false, 0xA0, [],                                true,  Opaque,   false;
    ELSE_OP         = "Else",        false, 0xA1, [],                                true,  Opaque,   false;
    WHILE_OP        = "While",       false, 0xA2, [],                                true,  Opaque,   false;
    RETURN_OP       = "Return",      false, 0xA4, [Object],                          false, None,     false;
    ONES_OP         = "Ones",        false, 0xFF, [],                                false, None,     false;
    MUTEX_OP        = "Mutex",       true,  0x01, [Name, UInt8],                     false, None,     false;
    EVENT_OP        = "Event",       true,  0x02, [Name],                            false, None,     false;
    OP_REGION_OP    = "OperationRegion", true, 0x80, [Name, UInt8, Object, Object],  false, None,     false;
    FIELD_OP        = "Field",       true,  0x81, [Name, UInt8],                     true,  Opaque,   false;
    DEVICE_OP       = "Device",      true,  0x82, [Name],                            true,  Terms,    true;
    PROCESSOR_OP    = "Processor",   true,  0x83, [Name, UInt8, UInt32, UInt8],      true,  Terms,    true;
    POWER_RES_OP    = "PowerResource", true, 0x84, [Name, UInt8, UInt16],           true,  Terms,    true;
    THERMAL_ZONE_OP = "ThermalZone", true,  0x85, [Name],                            true,  Terms,    true;
}

/// Looks up the grammar entry of an opcode.
#[must_use]
pub fn lookup(op: u8, extended: bool) -> Option<&'static AmlOpcode> {
    OPCODES
        .iter()
        .find(|entry| entry.op == op && entry.extended == extended)
}

/// Looks up a grammar entry in const context, so a missing entry fails the build.
pub(crate) const fn entry(op: u8, extended: bool) -> &'static AmlOpcode {
    let mut i = 0;
    while i < OPCODES.len() {
        if OPCODES[i].op == op && OPCODES[i].extended == extended {
            return &OPCODES[i];
        }
        i += 1;
    }
    panic!("opcode missing from the grammar table");
}

/// Returns `true` for the integer-valued encodings.
#[must_use]
pub fn is_integer(opcode: &AmlOpcode) -> bool {
    !opcode.extended
        && matches!(
            opcode.op,
            ZERO_OP | ONE_OP | ONES_OP | BYTE_PREFIX | WORD_PREFIX | DWORD_PREFIX | QWORD_PREFIX
        )
}

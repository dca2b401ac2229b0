//! # Compiled call descriptors
//!
//! The output of compiling one architecture. Every argument, field and return
//! value is an [`ArgType`]: a common header (name, direction, optionality) plus
//! one [`TypeKind`] out of a closed set of constructs. Struct and union usages
//! are references into the [`StructTable`](super::structs::StructTable) arena.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Direction of data flow relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Into the target
    In,
    /// Out of the target
    Out,
    /// Both ways
    InOut,
}

impl Direction {
    /// All directions, in registration order
    pub const ALL: [Direction; 3] = [Direction::In, Direction::Out, Direction::InOut];

    /// Parse `in`, `out` or `inout`
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "inout" => Ok(Direction::InOut),
            _ => Err(Error::BadDirection(token.to_string())),
        }
    }

    /// Description token of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header shared by every compiled node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCommon {
    /// Field or argument name (empty for anonymous inner types)
    pub name: String,
    /// Data flow direction
    pub dir: Direction,
    /// May be omitted (null pointer, zero value)
    pub optional: bool,
}

/// Integer flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntKind {
    /// Any value
    Plain,
    /// Value in `[begin, end]`
    Range {
        /// Lower bound
        begin: u64,
        /// Upper bound
        end: u64,
    },
    /// File offset
    FileOffset,
    /// Signal number
    Signal,
}

/// Buffer flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BufferKind {
    /// Random bytes of random length
    BlobRand,
    /// Random bytes, length in `[begin, end]`
    BlobRange {
        /// Minimum length
        begin: u64,
        /// Maximum length
        end: u64,
    },
    /// String drawn from enumerated values
    String {
        /// String set name the values came from
        sub_kind: Option<String>,
        /// Null-terminated (and padded, when fixed-length) values
        values: Vec<Vec<u8>>,
    },
    /// Crypto algorithm type name
    AlgType,
    /// Crypto algorithm instance name
    AlgName,
    /// File name
    Filename,
}

/// How an array's length is chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrayLen {
    /// Any length
    Rand,
    /// Length in `[begin, end]`
    Range {
        /// Minimum element count
        begin: u64,
        /// Maximum element count
        end: u64,
    },
}

/// Unit a length field counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LenUnit {
    /// Number of elements of the referenced field
    Elements,
    /// Number of N-byte units (1, 2, 4 or 8)
    Bytes(u8),
}

/// Identity of one struct or union instance
///
/// The same type embedded under a different field name, or used in a
/// different direction, is a different instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StructKey {
    /// Struct or union type name
    pub name: String,
    /// Enclosing field name, empty for top-level usage
    pub field: String,
    /// Usage direction
    pub dir: Direction,
}

impl StructKey {
    /// Build a key
    pub fn new(name: &str, field: &str, dir: Direction) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            dir,
        }
    }
}

impl fmt::Display for StructKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {} {}}}", self.name, self.field, self.dir)
    }
}

/// Index of an instance in the struct arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StructId(pub usize);

/// Reference to a struct or union instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructRef {
    /// Instance identity
    pub key: StructKey,
    /// Arena slot of the instance
    pub id: StructId,
}

/// Construct-specific part of a compiled node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeKind {
    /// Integer
    Int {
        /// Width in bytes
        size: u64,
        /// Big-endian encoding
        big_endian: bool,
        /// Flavor
        kind: IntKind,
    },
    /// Opaque memory
    Buffer(BufferKind),
    /// Pointer; the pointee carries its own direction
    Ptr {
        /// Pointee
        elem: Box<ArgType>,
    },
    /// Element-wise array
    Array {
        /// Element type
        elem: Box<ArgType>,
        /// Length choice
        len: ArrayLen,
    },
    /// Length of another field
    Len {
        /// Name of the measured field
        buf: String,
        /// Width in bytes
        size: u64,
        /// Big-endian encoding
        big_endian: bool,
        /// Counting unit
        unit: LenUnit,
    },
    /// Combination of flag values
    Flags {
        /// Width in bytes
        size: u64,
        /// Big-endian encoding
        big_endian: bool,
        /// Values resolved for this architecture
        values: Vec<u64>,
    },
    /// Fixed value
    Const {
        /// Width in bytes
        size: u64,
        /// Big-endian encoding
        big_endian: bool,
        /// Value, 0 if the symbol was unresolved
        value: u64,
    },
    /// Per-executor-instance value range
    Proc {
        /// Width in bytes
        size: u64,
        /// Big-endian encoding
        big_endian: bool,
        /// First value
        start: i64,
        /// Values reserved per instance
        per_proc: i64,
    },
    /// Virtual memory area
    Vma {
        /// Lower page-count bound
        begin: u64,
        /// Upper page-count bound
        end: u64,
    },
    /// Struct instance
    Struct(StructRef),
    /// Union instance
    Union(StructRef),
    /// Resource handle
    Resource {
        /// Resource name
        desc: String,
    },
}

/// One compiled argument, field or return value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgType {
    /// Name, direction, optionality
    pub common: TypeCommon,
    /// Construct
    pub kind: TypeKind,
}

impl ArgType {
    /// Field or argument name
    pub fn name(&self) -> &str {
        &self.common.name
    }

    /// Direction
    pub fn dir(&self) -> Direction {
        self.common.dir
    }

    /// Optionality
    pub fn optional(&self) -> bool {
        self.common.optional
    }

    /// Pointee, if this is a pointer
    pub fn pointee(&self) -> Option<&ArgType> {
        match &self.kind {
            TypeKind::Ptr { elem } => Some(elem),
            _ => None,
        }
    }

    /// Struct or union reference, if any
    pub fn struct_ref(&self) -> Option<&StructRef> {
        match &self.kind {
            TypeKind::Struct(r) | TypeKind::Union(r) => Some(r),
            _ => None,
        }
    }
}

/// A resolved resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDesc {
    /// Resource name
    pub name: String,
    /// Inheritance chain, furthest ancestor first, self last
    pub kind: Vec<String>,
    /// Underlying integer
    #[serde(rename = "type")]
    pub ty: ArgType,
    /// Interesting values, ancestors first; never empty
    pub values: Vec<u64>,
}

/// Why a call cannot be invoked on an architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unavailable {
    /// The call symbol has no number
    NoCallNumber,
    /// A `const` argument names an undefined symbol
    MissingConst {
        /// Undefined symbol
        symbol: String,
    },
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NoCallNumber => f.write_str("no call number"),
            Unavailable::MissingConst { symbol } => write!(f, "missing const {}", symbol),
        }
    }
}

/// One compiled call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallDesc {
    /// Variant name
    pub name: String,
    /// Real call symbol
    pub call_name: String,
    /// Number on this architecture; `None` if the call is unavailable
    pub nr: Option<u64>,
    /// Why the call is unavailable
    pub unavailable: Option<Unavailable>,
    /// Return value
    pub ret: Option<ArgType>,
    /// Arguments in declaration order
    pub args: Vec<ArgType>,
}

impl CallDesc {
    /// Value used when no number is available
    pub const UNAVAILABLE_NR: i64 = -1;

    /// True if the call may be invoked on this architecture
    pub fn is_available(&self) -> bool {
        self.nr.is_some()
    }

    /// Number, or [`CallDesc::UNAVAILABLE_NR`]
    pub fn nr_or_sentinel(&self) -> i64 {
        self.nr
            .and_then(|nr| i64::try_from(nr).ok())
            .unwrap_or(Self::UNAVAILABLE_NR)
    }
}

//! # Argument type compiler
//!
//! Turns one type reference (type name plus positional parameters) into an
//! [`ArgType`]. The type name is first classified into a [`Construct`]; each
//! construct declares how many parameters it takes, which depends on whether
//! it is compiled as a struct field (size and endianness spelled out) or as a
//! call argument/return (pointer-width, native endianness), and whether it may
//! appear directly as a call argument.
//!
//! ```text
//! flags[open_flags]            call argument: 1 parameter
//! flags[open_flags, int32be]   struct field:  2 parameters
//! ```

use super::types::{
    ArgType, ArrayLen, BufferKind, Direction, IntKind, LenUnit, StructId, StructKey, StructRef,
    TypeCommon, TypeKind,
};
use crate::consts::ConstTable;
use crate::error::{Error, Result};
use crate::schema::{Description, TypeSpec};
use crate::token::{byte_size_multiplier, is_identifier, parse_literal, split_range, IntType};
use std::collections::BTreeMap;

/// Prefix of inline anonymous type names
pub const UNNAMED_PREFIX: &str = "unnamed";

/// Parameter marking a value as optional
pub const OPT_MARKER: &str = "opt";

/// Largest fixed length a `string` may be padded to
pub const MAX_FIXED_STRING_LEN: usize = 1 << 20;

/// Integer type names usable directly as a type
const INT_TYPES: [&str; 9] = [
    "int8", "int16", "int32", "int64", "intptr", "int16be", "int32be", "int64be", "intptrbe",
];

/// The closed set of type constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct<'d> {
    /// `fileoff`
    FileOff,
    /// `buffer[dir]`
    Buffer,
    /// `string[value-or-set, size]`
    String,
    /// `salg_type`
    AlgType,
    /// `salg_name`
    AlgName,
    /// `vma[range]`
    Vma,
    /// `len` or `bytesize*`
    Len(LenUnit),
    /// `flags[set]`
    Flags,
    /// `const[value]`
    Const,
    /// `proc[start, per_proc]`
    Proc,
    /// `int8`..`intptrbe`, optionally with a range
    Int(&'d str),
    /// `signalno`
    Signal,
    /// `filename`
    Filename,
    /// `array[elem, range]`
    Array,
    /// `ptr[dir, elem]`
    Ptr,
    /// Inline anonymous type
    Unnamed(&'d TypeSpec),
    /// Struct or union name
    Struct {
        /// Union rather than struct
        is_union: bool,
    },
    /// Resource name
    Resource,
}

/// Accepted parameter counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly N
    Exact(usize),
    /// Either of two counts
    Either(usize, usize),
    /// Anything from `lo` to `hi`
    Between(usize, usize),
    /// Not checked here
    Unchecked,
}

impl Arity {
    fn accepts(&self, got: usize) -> bool {
        match *self {
            Arity::Exact(n) => got == n,
            Arity::Either(a, b) => got == a || got == b,
            Arity::Between(lo, hi) => (lo..=hi).contains(&got),
            Arity::Unchecked => true,
        }
    }

    fn describe(&self) -> String {
        match *self {
            Arity::Exact(n) => n.to_string(),
            Arity::Either(a, b) => format!("{} or {}", a, b),
            Arity::Between(lo, hi) => format!("{}-{}", lo, hi),
            Arity::Unchecked => "any".to_string(),
        }
    }

    /// Fail with an arity error unless `got` parameters are accepted
    pub fn check(&self, construct: &str, name: &str, got: usize) -> Result<()> {
        if self.accepts(got) {
            return Ok(());
        }
        Err(Error::Arity {
            construct: construct.to_string(),
            name: name.to_string(),
            want: self.describe(),
            got,
        })
    }
}

impl<'d> Construct<'d> {
    /// Classify a type name
    pub fn classify(typ: &'d str, desc: &'d Description) -> Result<Self> {
        let construct = match typ {
            "fileoff" => Construct::FileOff,
            "buffer" => Construct::Buffer,
            "string" => Construct::String,
            "salg_type" => Construct::AlgType,
            "salg_name" => Construct::AlgName,
            "vma" => Construct::Vma,
            "len" => Construct::Len(LenUnit::Elements),
            "flags" => Construct::Flags,
            "const" => Construct::Const,
            "proc" => Construct::Proc,
            "signalno" => Construct::Signal,
            "filename" => Construct::Filename,
            "array" => Construct::Array,
            "ptr" => Construct::Ptr,
            _ if INT_TYPES.contains(&typ) => Construct::Int(typ),
            _ => {
                if let Some(unit) = byte_size_multiplier(typ) {
                    Construct::Len(LenUnit::Bytes(unit))
                } else if typ.starts_with(UNNAMED_PREFIX) {
                    let spec = desc
                        .unnamed
                        .get(typ)
                        .ok_or_else(|| Error::UnknownUnnamed(typ.to_string()))?;
                    Construct::Unnamed(spec)
                } else if let Some(def) = desc.structs.get(typ) {
                    Construct::Struct {
                        is_union: def.is_union,
                    }
                } else if desc.resources.contains_key(typ) {
                    Construct::Resource
                } else {
                    return Err(Error::UnknownType {
                        typ: typ.to_string(),
                        name: String::new(),
                    });
                }
            }
        };
        Ok(construct)
    }

    /// Parameter counts accepted in the given context
    pub fn arity(&self, is_field: bool) -> Arity {
        // Fields spell out the integer type, arguments use the pointer width
        let sized = |arg: usize| {
            if is_field {
                Arity::Exact(arg + 1)
            } else {
                Arity::Exact(arg)
            }
        };
        match self {
            Construct::FileOff => sized(0),
            Construct::Len(_) | Construct::Flags | Construct::Const => sized(1),
            Construct::Proc => sized(2),
            Construct::Buffer => Arity::Exact(1),
            Construct::String => Arity::Between(0, 2),
            Construct::AlgType | Construct::AlgName | Construct::Signal | Construct::Filename => {
                Arity::Exact(0)
            }
            Construct::Vma | Construct::Int(_) => Arity::Either(0, 1),
            Construct::Array => Arity::Either(1, 2),
            Construct::Ptr => Arity::Exact(2),
            Construct::Unnamed(_) | Construct::Struct { .. } | Construct::Resource => {
                Arity::Unchecked
            }
        }
    }

    /// May be passed directly as a call argument or returned
    pub fn eligible_as_arg(&self) -> bool {
        !matches!(
            self,
            Construct::String
                | Construct::AlgType
                | Construct::AlgName
                | Construct::Array
                | Construct::Unnamed(_)
                | Construct::Struct { .. }
        )
    }
}

/// Context a type is compiled in
#[derive(Debug, Clone, Copy)]
pub struct Usage<'u> {
    /// Owning struct name, empty outside structs
    pub parent: &'u str,
    /// Field or argument name
    pub name: &'u str,
    /// Direction requested by the user of the type
    pub dir: Direction,
    /// Top-level call argument or return value
    pub is_arg: bool,
    /// Field form: sized constructs carry their integer type
    pub is_field: bool,
}

impl<'u> Usage<'u> {
    /// Top-level call argument (or return) usage
    pub fn arg(name: &'u str, dir: Direction) -> Self {
        Self {
            parent: "",
            name,
            dir,
            is_arg: true,
            is_field: false,
        }
    }

    /// Struct field usage
    pub fn field(parent: &'u str, name: &'u str, dir: Direction) -> Self {
        Self {
            parent,
            name,
            dir,
            is_arg: false,
            is_field: true,
        }
    }

    /// Anonymous inner type (pointee, array element)
    fn inner(dir: Direction) -> Self {
        Self::field("", "", dir)
    }

    fn display_name(&self) -> String {
        if self.parent.is_empty() {
            format!("\"{}\"", self.name)
        } else {
            format!("\"{}.{}\"", self.parent, self.name)
        }
    }
}

/// Symbols of `const` values that had no definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnresolvedConsts {
    symbols: Vec<String>,
}

impl UnresolvedConsts {
    fn push(&mut self, symbol: &str) {
        if !self.symbols.iter().any(|s| s == symbol) {
            self.symbols.push(symbol.to_string());
        }
    }

    /// Symbols in first-seen order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// True if every `const` resolved
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Compiles type references against one architecture
#[derive(Debug, Clone, Copy)]
pub struct TypeCompiler<'a> {
    /// Description being compiled
    pub desc: &'a Description,
    /// Constant table of the architecture
    pub consts: &'a ConstTable,
    /// Flag sets resolved for the architecture
    pub flags: &'a BTreeMap<String, Vec<u64>>,
    /// Struct instance identities registered so far
    pub structs: &'a BTreeMap<StructKey, StructId>,
    /// Pointer width in bytes
    pub ptr_size: u64,
    /// Concurrent executor instances `proc` values must cover
    pub max_procs: u64,
}

impl<'a> TypeCompiler<'a> {
    /// Compile one type reference
    ///
    /// Unresolved `const` symbols are recorded in `unresolved` and encoded as 0.
    pub fn compile(
        &self,
        usage: Usage<'_>,
        typ: &str,
        params: &[String],
        unresolved: &mut UnresolvedConsts,
    ) -> Result<ArgType> {
        let mut params: Vec<&str> = params.iter().map(String::as_str).collect();
        let mut optional = false;
        if let Some(pos) = params.iter().position(|p| *p == OPT_MARKER) {
            params.remove(pos);
            optional = true;
        }

        let name = usage.display_name();
        let construct = Construct::classify(typ, self.desc).map_err(|e| match e {
            Error::UnknownType { typ, .. } => Error::UnknownType {
                typ,
                name: name.clone(),
            },
            other => other,
        })?;
        construct.arity(usage.is_field).check(typ, &name, params.len())?;
        if usage.is_arg && !construct.eligible_as_arg() {
            return Err(Error::NotArgument {
                name,
                typ: typ.to_string(),
            });
        }

        let common = TypeCommon {
            name: usage.name.to_string(),
            dir: usage.dir,
            optional,
        };
        let node = |common: TypeCommon, kind: TypeKind| ArgType { common, kind };
        let sized = |token: Option<&&str>| -> Result<IntType> {
            match token {
                Some(t) if usage.is_field => IntType::decode(t, self.ptr_size),
                _ => Ok(IntType::pointer(self.ptr_size)),
            }
        };

        let compiled = match construct {
            Construct::FileOff => {
                let int = sized(params.first())?;
                node(common, int_kind(int, IntKind::FileOffset))
            }
            Construct::Buffer => {
                // The pointer keeps the usage header, the bytes get the declared direction
                let inner = TypeCommon {
                    dir: Direction::parse(params[0])?,
                    optional: false,
                    ..common.clone()
                };
                pointer_to(common, node(inner, TypeKind::Buffer(BufferKind::BlobRand)))
            }
            Construct::String => node(common, self.string(&params, &name)?),
            Construct::AlgType => node(common, TypeKind::Buffer(BufferKind::AlgType)),
            Construct::AlgName => node(common, TypeKind::Buffer(BufferKind::AlgName)),
            Construct::Vma => {
                let (begin, end) = match params.first() {
                    Some(range) => self.range(range, &name)?,
                    None => (0, 0),
                };
                node(common, TypeKind::Vma { begin, end })
            }
            Construct::Len(unit) => {
                let int = sized(params.get(1))?;
                node(
                    common,
                    TypeKind::Len {
                        buf: params[0].to_string(),
                        size: int.size,
                        big_endian: int.big_endian,
                        unit,
                    },
                )
            }
            Construct::Flags => {
                let int = sized(params.get(1))?;
                let values = self
                    .flags
                    .get(params[0])
                    .ok_or_else(|| Error::UnknownFlags(params[0].to_string()))?;
                if values.is_empty() {
                    node(common, int_kind(int, IntKind::Plain))
                } else {
                    node(
                        common,
                        TypeKind::Flags {
                            size: int.size,
                            big_endian: int.big_endian,
                            values: values.clone(),
                        },
                    )
                }
            }
            Construct::Const => {
                let int = sized(params.get(1))?;
                let token = params[0];
                let value = match self.consts.get(token) {
                    Some(v) => v,
                    None if is_identifier(token) => {
                        unresolved.push(token);
                        0
                    }
                    None => {
                        parse_literal(token).ok_or_else(|| Error::InvalidLiteral(token.to_string()))?
                    }
                };
                node(
                    common,
                    TypeKind::Const {
                        size: int.size,
                        big_endian: int.big_endian,
                        value,
                    },
                )
            }
            Construct::Proc => {
                let (int, start, per_proc) = if usage.is_field {
                    (sized(params.first())?, params[1], params[2])
                } else {
                    (sized(None)?, params[0], params[1])
                };
                node(common, self.proc(int, start, per_proc)?)
            }
            Construct::Int(token) => {
                let int = IntType::decode(token, self.ptr_size)?;
                let kind = match params.first() {
                    Some(range) => {
                        let (begin, end) = self.range(range, &name)?;
                        IntKind::Range { begin, end }
                    }
                    None => IntKind::Plain,
                };
                node(common, int_kind(int, kind))
            }
            Construct::Signal => node(
                common,
                TypeKind::Int {
                    size: 4,
                    big_endian: false,
                    kind: IntKind::Signal,
                },
            ),
            Construct::Filename => {
                let inner = TypeCommon {
                    dir: Direction::In,
                    optional: false,
                    ..common.clone()
                };
                pointer_to(common, node(inner, TypeKind::Buffer(BufferKind::Filename)))
            }
            Construct::Array => {
                let elem_typ = params[0];
                let range = match params.get(1) {
                    Some(range) => Some(self.range(range, &name)?),
                    None => None,
                };
                // Byte arrays are opaque blobs
                let kind = if elem_typ == "int8" {
                    TypeKind::Buffer(match range {
                        Some((begin, end)) => BufferKind::BlobRange { begin, end },
                        None => BufferKind::BlobRand,
                    })
                } else {
                    let elem = self.compile(Usage::inner(usage.dir), elem_typ, &[], unresolved)?;
                    TypeKind::Array {
                        elem: Box::new(elem),
                        len: match range {
                            Some((begin, end)) => ArrayLen::Range { begin, end },
                            None => ArrayLen::Rand,
                        },
                    }
                };
                node(common, kind)
            }
            Construct::Ptr => {
                let pointee_dir = Direction::parse(params[0])?;
                let elem = self.compile(Usage::inner(pointee_dir), params[1], &[], unresolved)?;
                let common = TypeCommon {
                    dir: Direction::In,
                    ..common
                };
                pointer_to(common, elem)
            }
            Construct::Unnamed(spec) => {
                let inner = Usage {
                    parent: "",
                    name: "",
                    dir: usage.dir,
                    is_arg: false,
                    is_field: usage.is_field,
                };
                self.compile(inner, &spec.typ, &spec.params, unresolved)?
            }
            Construct::Struct { is_union } => {
                if !params.is_empty() {
                    return Err(Error::StructHasArgs(typ.to_string()));
                }
                let key = StructKey::new(typ, usage.name, usage.dir);
                let id = *self
                    .structs
                    .get(&key)
                    .ok_or_else(|| Error::UnregisteredStruct {
                        key: key.to_string(),
                    })?;
                let r = StructRef { key, id };
                node(
                    common,
                    if is_union {
                        TypeKind::Union(r)
                    } else {
                        TypeKind::Struct(r)
                    },
                )
            }
            Construct::Resource => {
                if !params.is_empty() {
                    return Err(Error::ResourceHasArgs(typ.to_string()));
                }
                node(
                    common,
                    TypeKind::Resource {
                        desc: typ.to_string(),
                    },
                )
            }
        };
        Ok(compiled)
    }

    /// Resolve a `lo:hi` or single-value range
    fn range(&self, token: &str, name: &str) -> Result<(u64, u64)> {
        let (lo, hi) = split_range(token)?;
        let bound = |t: &str| {
            self.consts
                .resolve(t)
                .ok_or_else(|| Error::UnresolvedConst {
                    symbol: t.to_string(),
                    name: name.to_string(),
                })
        };
        Ok((bound(lo)?, bound(hi)?))
    }

    fn string(&self, params: &[&str], name: &str) -> Result<TypeKind> {
        let mut sub_kind = None;
        let mut values: Vec<Vec<u8>> = Vec::new();
        if let Some(first) = params.first() {
            if first.starts_with('"') {
                let literal = first
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .ok_or_else(|| Error::InvalidLiteral(first.to_string()))?;
                values.push(literal.as_bytes().to_vec());
            } else {
                let set = self
                    .desc
                    .str_flags
                    .get(*first)
                    .ok_or_else(|| Error::UnknownStrFlags(first.to_string()))?;
                values.extend(set.iter().map(|s| s.as_bytes().to_vec()));
                sub_kind = Some(first.to_string());
            }
        }
        for v in values.iter_mut() {
            v.push(0);
        }

        if let Some(len) = params.get(1) {
            let size = match self.consts.get(len) {
                Some(v) => v,
                None => len.parse::<u64>().map_err(|_| Error::BadStringLength {
                    token: len.to_string(),
                    name: name.to_string(),
                })?,
            };
            let padded = usize::try_from(size)
                .ok()
                .filter(|s| *s <= MAX_FIXED_STRING_LEN)
                .ok_or_else(|| Error::BadStringLength {
                    token: len.to_string(),
                    name: name.to_string(),
                })?;
            for v in values.iter_mut() {
                if v.len() > padded {
                    return Err(Error::StringTooLong {
                        value: String::from_utf8_lossy(v).into_owned(),
                        size,
                        name: name.to_string(),
                    });
                }
                v.resize(padded, 0);
            }
        }

        Ok(TypeKind::Buffer(BufferKind::String { sub_kind, values }))
    }

    fn proc(&self, int: IntType, start: &str, per_proc: &str) -> Result<TypeKind> {
        let parse = |token: &str| {
            token.parse::<i64>().map_err(|_| Error::BadProcValue {
                value: token.to_string(),
                reason: "couldn't parse as int64".to_string(),
            })
        };
        let start_v = parse(start)?;
        let per_proc_v = parse(per_proc)?;
        if per_proc_v < 1 {
            return Err(Error::BadProcValue {
                value: per_proc.to_string(),
                reason: "values per proc should be >= 1".to_string(),
            });
        }

        let space = int.value_space() as i128;
        if start_v as i128 >= space {
            return Err(Error::BadProcValue {
                value: start.to_string(),
                reason: format!("overflows desired type of size '{}'", int.size),
            });
        }
        if start_v as i128 + self.max_procs as i128 * per_proc_v as i128 >= space {
            return Err(Error::ProcOverflow {
                start: start_v,
                per_proc: per_proc_v,
                size: int.size,
                procs: self.max_procs,
            });
        }

        Ok(TypeKind::Proc {
            size: int.size,
            big_endian: int.big_endian,
            start: start_v,
            per_proc: per_proc_v,
        })
    }
}

fn int_kind(int: IntType, kind: IntKind) -> TypeKind {
    TypeKind::Int {
        size: int.size,
        big_endian: int.big_endian,
        kind,
    }
}

fn pointer_to(common: TypeCommon, elem: ArgType) -> ArgType {
    ArgType {
        common,
        kind: TypeKind::Ptr {
            elem: Box::new(elem),
        },
    }
}

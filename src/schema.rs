//! # Architecture-independent description model
//!
//! This is what the description parser hands to the compiler: calls, structs
//! and unions, resources, flag sets, string sets and inline (unnamed) types.
//! Every type reference is kept as raw tokens, a type name followed by its
//! positional parameters, exactly as written in the description source.
//!
//! ```text
//! open(file filename, flags flags[open_flags], mode flags[open_mode]) fd
//! ```
//!
//! becomes a [`Syscall`] with three [`FieldSpec`] arguments and a `fd`
//! return [`TypeSpec`].
//!
//! The model derives `serde` so a description can be exchanged as JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A type reference: type name plus positional parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Type name (`int32`, `ptr`, a struct name, ...)
    #[serde(rename = "type")]
    pub typ: String,
    /// Positional parameters, possibly including the `opt` marker
    #[serde(default)]
    pub params: Vec<String>,
}

impl TypeSpec {
    /// Build a type reference from a name and parameters
    pub fn new(typ: &str, params: &[&str]) -> Self {
        Self {
            typ: typ.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Build from a token list: type name first, parameters after
    pub fn from_tokens(tokens: &[&str]) -> Option<Self> {
        let (typ, params) = tokens.split_first()?;
        Some(Self::new(typ, params))
    }
}

/// A named field or call argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field or argument name
    pub name: String,
    /// Type name
    #[serde(rename = "type")]
    pub typ: String,
    /// Positional parameters
    #[serde(default)]
    pub params: Vec<String>,
}

impl FieldSpec {
    /// Build a field from name, type and parameters
    pub fn new(name: &str, typ: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            typ: typ.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// One call entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syscall {
    /// Name, possibly a `$`-suffixed variant (`ioctl$FIONREAD`)
    pub name: String,
    /// Real call symbol used to find the number (`ioctl`)
    pub call_name: String,
    /// Arguments in declaration order
    #[serde(default)]
    pub args: Vec<FieldSpec>,
    /// Return type, if the call returns a resource
    #[serde(default)]
    pub ret: Option<TypeSpec>,
}

impl Syscall {
    /// Create a call; the call symbol is the name up to the first `$`
    pub fn new(name: &str) -> Self {
        let call_name = name.split('$').next().unwrap_or(name);
        Self {
            name: name.to_string(),
            call_name: call_name.to_string(),
            args: Vec::new(),
            ret: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, name: &str, typ: &str, params: &[&str]) -> Self {
        self.args.push(FieldSpec::new(name, typ, params));
        self
    }

    /// Set the return type
    pub fn returns(mut self, typ: &str, params: &[&str]) -> Self {
        self.ret = Some(TypeSpec::new(typ, params));
        self
    }
}

/// A struct or union definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    /// Type name
    pub name: String,
    /// Fields (structs) or options (unions) in declaration order
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Union rather than struct
    #[serde(default)]
    pub is_union: bool,
    /// No padding between fields
    #[serde(default)]
    pub packed: bool,
    /// Variable-length (unions only)
    #[serde(default)]
    pub varlen: bool,
    /// Explicit alignment in bytes
    #[serde(default)]
    pub align: Option<u64>,
}

impl StructDef {
    /// Empty struct definition
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            is_union: false,
            packed: false,
            varlen: false,
            align: None,
        }
    }

    /// Empty union definition
    pub fn union(name: &str) -> Self {
        Self {
            is_union: true,
            ..Self::new(name)
        }
    }

    /// Append a field
    pub fn field(mut self, name: &str, typ: &str, params: &[&str]) -> Self {
        self.fields.push(FieldSpec::new(name, typ, params));
        self
    }
}

/// A resource (handle type) definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Resource name
    pub name: String,
    /// Parent resource or primitive integer kind
    pub base: String,
    /// Interesting values, literal or symbolic
    #[serde(default)]
    pub values: Vec<String>,
}

impl ResourceDef {
    /// Build a resource definition
    pub fn new(name: &str, base: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            base: base.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Complete architecture-independent description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Calls in declaration order
    #[serde(default)]
    pub syscalls: Vec<Syscall>,
    /// Structs and unions by name
    #[serde(default)]
    pub structs: BTreeMap<String, StructDef>,
    /// Resources by name
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDef>,
    /// Integer flag sets by name
    #[serde(default)]
    pub flags: BTreeMap<String, Vec<String>>,
    /// String sets by name
    #[serde(default)]
    pub str_flags: BTreeMap<String, Vec<String>>,
    /// Inline anonymous types by synthetic name
    #[serde(default)]
    pub unnamed: BTreeMap<String, TypeSpec>,
}

impl Description {
    /// Empty description
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a description from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidDescription(e.to_string()))
    }

    /// Add a call
    pub fn syscall(mut self, call: Syscall) -> Self {
        self.syscalls.push(call);
        self
    }

    /// Add a struct or union
    pub fn structure(mut self, def: StructDef) -> Self {
        self.structs.insert(def.name.clone(), def);
        self
    }

    /// Add a resource
    pub fn resource(mut self, def: ResourceDef) -> Self {
        self.resources.insert(def.name.clone(), def);
        self
    }

    /// Add a flag set
    pub fn flag_set(mut self, name: &str, values: &[&str]) -> Self {
        self.flags
            .insert(name.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Add a string set
    pub fn str_set(mut self, name: &str, values: &[&str]) -> Self {
        self.str_flags
            .insert(name.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Add an inline type
    pub fn unnamed_type(mut self, name: &str, typ: &str, params: &[&str]) -> Self {
        self.unnamed.insert(name.to_string(), TypeSpec::new(typ, params));
        self
    }

    /// True if the name is a struct or union
    pub fn is_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    /// True if the name is a resource
    pub fn is_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_call_name() {
        let call = Syscall::new("ioctl$FIONREAD");
        assert_eq!(call.name, "ioctl$FIONREAD");
        assert_eq!(call.call_name, "ioctl");
        assert_eq!(Syscall::new("read").call_name, "read");
    }

    #[test]
    fn test_from_json() {
        let desc = Description::from_json(
            r#"{
                "syscalls": [
                    {"name": "close", "call_name": "close",
                     "args": [{"name": "fd", "type": "fd"}]}
                ],
                "resources": {"fd": {"name": "fd", "base": "int32"}},
                "flags": {"open_flags": ["O_RDONLY", "2"]}
            }"#,
        )
        .unwrap();
        assert_eq!(desc.syscalls[0].args[0], FieldSpec::new("fd", "fd", &[]));
        assert!(desc.is_resource("fd"));
        assert_eq!(desc.flags["open_flags"], vec!["O_RDONLY", "2"]);
        assert!(desc.structs.is_empty());
    }

    #[test]
    fn test_bad_json_is_reported() {
        assert!(matches!(
            Description::from_json("{\"syscalls\": 3}"),
            Err(Error::InvalidDescription(_))
        ));
    }

    #[test]
    fn test_type_spec_from_tokens() {
        assert_eq!(
            TypeSpec::from_tokens(&["ptr", "in", "stat"]),
            Some(TypeSpec::new("ptr", &["in", "stat"]))
        );
        assert_eq!(TypeSpec::from_tokens(&[]), None);
    }
}

//! # Struct and union instancing
//!
//! A struct type is instanced once per usage context: top level (empty field
//! name) and once for every field of every struct that embeds it, each in all
//! three directions. Identities are registered for every struct before any
//! field is compiled, so fields may refer to structs declared later or to
//! each other.
//!
//! Instances live in an arena ([`StructTable`]) addressed by [`StructId`];
//! compiled fields refer to other instances through [`StructRef`](super::types::StructRef).

use super::args::{TypeCompiler, UnresolvedConsts, Usage};
use super::types::{ArgType, Direction, StructId, StructKey};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::schema::Description;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One struct or union instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructInstance {
    /// Identity
    pub key: StructKey,
    /// Display name: the enclosing field name, or the type name at top level
    pub name: String,
    /// Union rather than struct
    pub is_union: bool,
    /// No padding between fields
    pub packed: bool,
    /// Variable-length union
    pub varlen: bool,
    /// Explicit alignment
    pub align: Option<u64>,
    /// Fields (structs) or options (unions) in declaration order
    pub fields: Vec<ArgType>,
}

impl StructInstance {
    /// Direction of the instance
    pub fn dir(&self) -> Direction {
        self.key.dir
    }
}

/// Arena of struct and union instances of one architecture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructTable {
    instances: Vec<StructInstance>,
    #[serde(skip)]
    index: BTreeMap<StructKey, StructId>,
}

impl StructTable {
    /// Register every instance identity of a description, fields left empty
    ///
    /// Ids follow ascending key order.
    pub fn register(desc: &Description) -> Self {
        let mut keys = BTreeSet::new();
        for def in desc.structs.values() {
            for dir in Direction::ALL {
                keys.insert(StructKey::new(&def.name, "", dir));
            }
            for field in &def.fields {
                if desc.is_struct(&field.typ) {
                    for dir in Direction::ALL {
                        keys.insert(StructKey::new(&field.typ, &field.name, dir));
                    }
                }
            }
        }

        let mut table = Self::default();
        for key in keys {
            // Every key was built from a struct name present in the description
            let Some(def) = desc.structs.get(&key.name) else {
                continue;
            };
            let id = StructId(table.instances.len());
            let name = if key.field.is_empty() {
                key.name.clone()
            } else {
                key.field.clone()
            };
            table.instances.push(StructInstance {
                key: key.clone(),
                name,
                is_union: def.is_union,
                packed: def.packed,
                varlen: def.varlen,
                align: def.align,
                fields: Vec::new(),
            });
            table.index.insert(key, id);
        }
        table
    }

    /// Identity index used to resolve struct references
    pub fn index(&self) -> &BTreeMap<StructKey, StructId> {
        &self.index
    }

    /// Look up an instance by key
    pub fn get(&self, key: &StructKey) -> Option<&StructInstance> {
        self.index.get(key).map(|id| &self.instances[id.0])
    }

    /// Look up an instance by id
    pub fn instance(&self, id: StructId) -> Option<&StructInstance> {
        self.instances.get(id.0)
    }

    /// Id of a key
    pub fn id_of(&self, key: &StructKey) -> Option<StructId> {
        self.index.get(key).copied()
    }

    /// All instances in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = &StructInstance> {
        self.instances.iter()
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True if there are no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Compile the fields of every registered instance
    ///
    /// Returns the field lists by instance id; [`StructTable::fill`] installs
    /// them once nothing borrows the index any more.
    pub fn compile_fields(
        &self,
        desc: &Description,
        compiler: &TypeCompiler<'_>,
        diags: &mut Diagnostics,
    ) -> Result<Vec<Vec<ArgType>>> {
        let mut all = Vec::with_capacity(self.instances.len());
        for inst in &self.instances {
            let Some(def) = desc.structs.get(&inst.key.name) else {
                all.push(Vec::new());
                continue;
            };
            tracing::debug!(key = %inst.key, "compile struct fields");
            let mut unresolved = UnresolvedConsts::default();
            let fields = def
                .fields
                .iter()
                .map(|f| {
                    compiler.compile(
                        Usage::field(&def.name, &f.name, inst.key.dir),
                        &f.typ,
                        &f.params,
                        &mut unresolved,
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            for symbol in unresolved.symbols() {
                diags.report(Diagnostic::UnresolvedConst {
                    symbol: symbol.clone(),
                });
            }
            all.push(fields);
        }
        Ok(all)
    }

    /// Install compiled field lists, indexed by instance id
    pub fn fill(&mut self, fields: Vec<Vec<ArgType>>) {
        for (inst, fields) in self.instances.iter_mut().zip(fields) {
            inst.fields = fields;
        }
    }
}

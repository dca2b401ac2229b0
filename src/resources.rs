//! Resource inheritance resolution
//!
//! A resource names its parent in `base`; the chain ends at a primitive
//! integer kind. Every resource along the chain contributes its interesting
//! values, ancestors first.

use crate::consts::ConstTable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::schema::ResourceDef;
use crate::token::{is_identifier, parse_literal, PRIMITIVE_KINDS};
use std::collections::{BTreeMap, HashSet};

/// A resource with its chain walked down to the primitive kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// Resource name
    pub name: String,
    /// Primitive integer kind at the root of the chain
    pub underlying: String,
    /// Furthest ancestor first, self last
    pub kind: Vec<String>,
    /// Values of all ancestors, ancestors first; `[0]` if none resolved
    pub values: Vec<u64>,
}

/// Walk a resource's ancestor chain
pub fn resolve_resource(
    def: &ResourceDef,
    resources: &BTreeMap<String, ResourceDef>,
    consts: &ConstTable,
    diags: &mut Diagnostics,
) -> Result<ResolvedResource> {
    let name = def.name.as_str();
    let mut kind = vec![name.to_string()];
    let mut values: Vec<u64> = Vec::new();
    let mut visited = HashSet::from([name]);
    let mut current = def;

    let underlying = loop {
        // Ancestor values go in front of what has been collected so far
        let mut own = resolve_values(current, consts, diags);
        own.append(&mut values);
        values = own;

        let base = current.base.as_str();
        if PRIMITIVE_KINDS.contains(&base) {
            break base.to_string();
        }
        let parent = resources.get(base).ok_or_else(|| Error::UnknownParent {
            resource: name.to_string(),
            parent: base.to_string(),
        })?;
        if !visited.insert(base) {
            return Err(Error::ResourceCycle {
                resource: name.to_string(),
                through: base.to_string(),
            });
        }
        kind.insert(0, base.to_string());
        current = parent;
    };

    if values.is_empty() {
        values.push(0);
    }
    Ok(ResolvedResource {
        name: name.to_string(),
        underlying,
        kind,
        values,
    })
}

fn resolve_values(def: &ResourceDef, consts: &ConstTable, diags: &mut Diagnostics) -> Vec<u64> {
    def.values
        .iter()
        .filter_map(|token| {
            if let Some(v) = consts.get(token) {
                return Some(v);
            }
            if is_identifier(token) {
                diags.report(Diagnostic::UnresolvedResourceValue {
                    resource: def.name.clone(),
                    symbol: token.clone(),
                });
                return None;
            }
            parse_literal(token)
        })
        .collect()
}

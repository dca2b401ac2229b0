//! Projection of flag sets through a constant table

use crate::consts::ConstTable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::token::{is_identifier, parse_literal};
use std::collections::BTreeMap;

/// Resolve one flag set for an architecture
///
/// Symbols are looked up in the table and dropped (with a diagnostic) when
/// missing. Literals pass through. Order of surviving values is preserved.
pub fn resolve_flag_set(
    name: &str,
    values: &[String],
    consts: &ConstTable,
    diags: &mut Diagnostics,
) -> Vec<u64> {
    let mut resolved = Vec::with_capacity(values.len());
    for token in values {
        if is_identifier(token) {
            match consts.get(token) {
                Some(v) => resolved.push(v),
                None => {
                    diags.report(Diagnostic::UnsupportedFlag {
                        symbol: token.clone(),
                    });
                }
            }
        } else {
            match parse_literal(token) {
                Some(v) => resolved.push(v),
                None => {
                    diags.report(Diagnostic::MalformedFlagLiteral {
                        flags: name.to_string(),
                        token: token.clone(),
                    });
                }
            }
        }
    }
    resolved
}

/// Resolve every flag set of a description
pub fn resolve_flags(
    flags: &BTreeMap<String, Vec<String>>,
    consts: &ConstTable,
    diags: &mut Diagnostics,
) -> BTreeMap<String, Vec<u64>> {
    flags
        .iter()
        .map(|(name, values)| (name.clone(), resolve_flag_set(name, values, consts, diags)))
        .collect()
}

//! # Per-architecture constant tables
//!
//! Each architecture has its own values for flag symbols, structure sizes and
//! call numbers. The builder merges every const source of one architecture into
//! a single [`ConstTable`] and then injects the fixed call-number table under
//! the `__NR_` prefix.
//!
//! ## Const source format
//!
//! ```text
//! # AUTOGENERATED
//! O_RDONLY = 0
//! O_WRONLY = 1
//! PAGE_SIZE = 0x1000
//! ```

use crate::error::{Error, Result};
use crate::token::{is_identifier, parse_literal};
use serde::Serialize;
use std::collections::BTreeMap;

/// Prefix under which call numbers live in the constant table
pub const CALL_NUMBER_PREFIX: &str = "__NR_";

/// Constant symbol holding the number of a call
pub fn call_number_symbol(call_name: &str) -> String {
    format!("{}{}", CALL_NUMBER_PREFIX, call_name)
}

/// Immutable name to value table of one architecture
///
/// Iteration is in ascending name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConstTable {
    values: BTreeMap<String, u64>,
}

impl ConstTable {
    /// Look up a symbol
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// True if the symbol is defined
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of a call, if known on this architecture
    pub fn call_number(&self, call_name: &str) -> Option<u64> {
        self.get(&call_number_symbol(call_name))
    }

    /// Resolve a token that is either a defined symbol or a numeric literal
    pub fn resolve(&self, token: &str) -> Option<u64> {
        self.get(token).or_else(|| parse_literal(token))
    }

    /// All constants sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of constants
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if there are no constants
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, u64)> for ConstTable {
    /// Collect without conflict checking; later entries win
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Merges const sources of one architecture
#[derive(Debug, Clone)]
pub struct ConstTableBuilder {
    arch: String,
    values: BTreeMap<String, u64>,
    call_numbers: BTreeMap<String, u64>,
}

impl ConstTableBuilder {
    /// Start an empty table for an architecture
    pub fn new(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            values: BTreeMap::new(),
            call_numbers: BTreeMap::new(),
        }
    }

    /// Add one definition
    ///
    /// Redefinition with the same value is accepted, with a different value it
    /// is fatal.
    pub fn define(&mut self, name: &str, value: u64) -> Result<&mut Self> {
        if let Some(&old) = self.values.get(name) {
            if old != value {
                return Err(Error::ConstConflict {
                    arch: self.arch.clone(),
                    name: name.to_string(),
                    old,
                    new: value,
                });
            }
            return Ok(self);
        }
        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    /// Add every pair of a source, in order
    pub fn extend<I, S>(&mut self, pairs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        for (name, value) in pairs {
            self.define(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Parse a const source and add its definitions
    pub fn add_source(&mut self, source_name: &str, text: &str) -> Result<&mut Self> {
        let pairs = parse_const_text(source_name, text)?;
        self.extend(pairs)
    }

    /// Register the fixed call-number table (call symbol to number)
    ///
    /// These entries are inserted last and override any source definition.
    pub fn call_numbers<I, S>(&mut self, numbers: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        for (name, nr) in numbers {
            self.call_numbers.insert(name.as_ref().to_string(), nr);
        }
        self
    }

    /// Finish the table
    pub fn build(&self) -> ConstTable {
        let mut values = self.values.clone();
        for (name, &nr) in &self.call_numbers {
            values.insert(call_number_symbol(name), nr);
        }
        tracing::debug!(arch = %self.arch, consts = values.len(), "built const table");
        ConstTable { values }
    }
}

/// Parse `NAME = VALUE` lines
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_const_text(source_name: &str, text: &str) -> Result<Vec<(String, u64)>> {
    let malformed = |line: &str, reason: &str| Error::MalformedConst {
        source_name: source_name.to_string(),
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let mut pairs = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (name, value) = trimmed
            .split_once('=')
            .ok_or_else(|| malformed(line, "no '='"))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(malformed(line, "bad name"));
        }
        // Negative values have no place in a const source
        let value = value.trim();
        if value.starts_with('-') {
            return Err(malformed(line, "bad value"));
        }
        let value = parse_literal(value).ok_or_else(|| malformed(line, "bad value"))?;
        pairs.push((name.to_string(), value));
    }
    Ok(pairs)
}

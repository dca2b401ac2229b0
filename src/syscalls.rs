//! Cross-architecture call number table
//!
//! The executor needs every call with its number on every architecture it
//! supports. Built from the per-architecture outputs after compilation.

use crate::compiler::ArchOutput;
use serde::Serialize;
use std::collections::BTreeMap;

/// One call with its number on every architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyscallEntry {
    /// Variant name
    pub name: String,
    /// Real call symbol
    pub call_name: String,
    /// Number by architecture; `None` where unavailable
    pub numbers: BTreeMap<String, Option<u64>>,
}

impl SyscallEntry {
    /// Number on an architecture, if available there
    pub fn number(&self, arch: &str) -> Option<u64> {
        self.numbers.get(arch).copied().flatten()
    }

    /// True if the call is unavailable everywhere
    pub fn is_unavailable_everywhere(&self) -> bool {
        self.numbers.values().all(Option::is_none)
    }
}

/// Calls in description order with per-architecture numbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyscallTable {
    archs: Vec<String>,
    entries: Vec<SyscallEntry>,
}

impl SyscallTable {
    /// Collect call numbers from compiled architectures
    pub fn build(outputs: &[ArchOutput]) -> Self {
        let mut table = Self {
            archs: outputs.iter().map(|o| o.arch.name.clone()).collect(),
            entries: Vec::new(),
        };
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();

        for out in outputs {
            for call in &out.calls {
                let pos = *positions.entry(call.name.clone()).or_insert_with(|| {
                    table.entries.push(SyscallEntry {
                        name: call.name.clone(),
                        call_name: call.call_name.clone(),
                        numbers: BTreeMap::new(),
                    });
                    table.entries.len() - 1
                });
                table.entries[pos]
                    .numbers
                    .insert(out.arch.name.clone(), call.nr);
            }
        }

        // Calls missing from an architecture's output count as unavailable there
        for entry in &mut table.entries {
            for arch in &table.archs {
                entry.numbers.entry(arch.clone()).or_insert(None);
            }
        }
        table
    }

    /// Architectures covered, in compilation order
    pub fn archs(&self) -> &[String] {
        &self.archs
    }

    /// Entries in description order
    pub fn entries(&self) -> &[SyscallEntry] {
        &self.entries
    }

    /// Find an entry by variant name
    pub fn get(&self, name: &str) -> Option<&SyscallEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

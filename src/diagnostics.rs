//! Degrade-level diagnostics
//!
//! Problems that do not abort an architecture: a flag value with no constant,
//! a resource value with no constant, a call with no number. Each is logged
//! through `tracing` and kept so callers can inspect what was dropped.

use crate::error::Severity;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A recoverable problem found while compiling one architecture
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Flag value symbol with no constant; the value was dropped
    UnsupportedFlag {
        /// Unresolved symbol
        symbol: String,
    },
    /// Flag value that is neither a symbol nor a number; the value was dropped
    MalformedFlagLiteral {
        /// Flag set name
        flags: String,
        /// Offending token
        token: String,
    },
    /// Resource value symbol with no constant; the value was dropped
    UnresolvedResourceValue {
        /// Resource declaring the value
        resource: String,
        /// Unresolved symbol
        symbol: String,
    },
    /// Call whose number is not known on this architecture
    UnsupportedCall {
        /// Real call symbol
        call_name: String,
    },
    /// Call marked unavailable for a reason other than its number
    UnavailableCall {
        /// Call variant name
        call: String,
        /// Why
        reason: String,
    },
    /// `const` value symbol with no constant, outside any call
    UnresolvedConst {
        /// Unresolved symbol
        symbol: String,
    },
}

impl Diagnostic {
    /// Severity of the diagnostic
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnsupportedCall { .. } | Diagnostic::UnavailableCall { .. } => {
                Severity::CallUnavailable
            }
            _ => Severity::Degrade,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedFlag { symbol } => write!(f, "unsupported flag: {}", symbol),
            Diagnostic::MalformedFlagLiteral { flags, token } => {
                write!(f, "malformed value '{}' in flags {}", token, flags)
            }
            Diagnostic::UnresolvedResourceValue { resource, symbol } => {
                write!(f, "unsupported value {} of resource {}", symbol, resource)
            }
            Diagnostic::UnsupportedCall { call_name } => {
                write!(f, "unsupported syscall: {}", call_name)
            }
            Diagnostic::UnavailableCall { call, reason } => {
                write!(f, "unsupported syscall: {} due to {}", call, reason)
            }
            Diagnostic::UnresolvedConst { symbol } => write!(f, "missing const {}", symbol),
        }
    }
}

/// Per-architecture diagnostic sink
///
/// Repeated reports of the same diagnostic are suppressed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    arch: String,
    seen: HashSet<Diagnostic>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink for an architecture
    pub fn new(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            ..Default::default()
        }
    }

    /// Record a diagnostic; returns false if it was already reported
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        if !self.seen.insert(diagnostic.clone()) {
            return false;
        }
        tracing::warn!(arch = %self.arch, "{}", diagnostic);
        self.entries.push(diagnostic);
        true
    }

    /// Diagnostics in report order
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Take the collected diagnostics
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

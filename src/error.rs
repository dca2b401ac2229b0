//! Error types for the description compiler

use thiserror::Error;

/// Fatal compilation errors
///
/// Any of these aborts the compilation of the architecture it was raised in.
/// Recoverable problems are not errors; they are reported as
/// [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Constant table errors
    /// Symbol defined twice with different values
    ///
    /// **Triggered by:** Two const sources of one architecture disagreeing on a symbol
    /// **Example:** `O_RDONLY = 0` in one file and `O_RDONLY = 1` in another
    #[error("const {name} has different values for {arch}: {old} vs {new}")]
    ConstConflict {
        /// Architecture the table is being built for
        arch: String,
        /// Conflicting symbol
        name: String,
        /// Value seen first
        old: u64,
        /// Value seen later
        new: u64,
    },

    /// Malformed line in a const source
    #[error("malformed const source {source_name}: {reason} in '{line}'")]
    MalformedConst {
        /// Name of the source (usually a file name)
        source_name: String,
        /// Offending line
        line: String,
        /// What is wrong with it
        reason: String,
    },

    /// Description that could not be loaded
    #[error("invalid description: {0}")]
    InvalidDescription(String),

    // Type compiler errors
    /// Construct used with the wrong number of parameters
    ///
    /// **Triggered by:** `flags[open_flags]` as a struct field (needs the int type too)
    #[error("wrong number of arguments for {construct} arg {name}, want {want}, got {got}")]
    Arity {
        /// Construct name (`flags`, `ptr`, ...)
        construct: String,
        /// Field or argument name
        name: String,
        /// Accepted parameter counts, rendered (`2`, `0-2`, `1 or 2`)
        want: String,
        /// Parameter count received
        got: usize,
    },

    /// Type token that is not a construct, struct, union, resource or unnamed type
    #[error("unknown arg type \"{typ}\" for {name}")]
    UnknownType {
        /// Offending type token
        typ: String,
        /// Field or argument name
        name: String,
    },

    /// Integer type token that cannot be decoded into size and endianness
    #[error("unknown int type {0}")]
    UnknownIntType(String),

    /// Reference to a flag set missing from the description
    #[error("unknown flag {0}")]
    UnknownFlags(String),

    /// Reference to a string set missing from the description
    #[error("unknown string flags {0}")]
    UnknownStrFlags(String),

    /// Reference to an inline type missing from the unnamed table
    #[error("unknown unnamed type '{0}'")]
    UnknownUnnamed(String),

    /// Struct or union reference carrying parameters
    #[error("struct '{0}' has args")]
    StructHasArgs(String),

    /// Resource reference carrying parameters
    #[error("resource '{0}' has args")]
    ResourceHasArgs(String),

    /// Struct reference whose instance was never registered
    #[error("struct instance {key} was not registered")]
    UnregisteredStruct {
        /// Rendered struct key
        key: String,
    },

    /// Construct that cannot be passed directly to a call
    #[error("{name} {typ} can't be syscall argument/return")]
    NotArgument {
        /// Argument name
        name: String,
        /// Type token
        typ: String,
    },

    /// Direction token other than `in`, `out`, `inout`
    #[error("bad direction {0}")]
    BadDirection(String),

    /// Range token with more than two bounds
    #[error("bad range: {0}")]
    BadRange(String),

    /// Symbol that must resolve to a number but is not in the constant table
    #[error("unresolved constant {symbol} for {name}")]
    UnresolvedConst {
        /// Symbol that could not be resolved
        symbol: String,
        /// Field or argument name
        name: String,
    },

    /// Token expected to be a numeric literal
    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),

    /// String literal longer than its fixed buffer
    #[error("string value {value:?} exceeds buffer length {size} for arg {name}")]
    StringTooLong {
        /// Null-terminated value
        value: String,
        /// Fixed buffer length
        size: u64,
        /// Field or argument name
        name: String,
    },

    /// Fixed string length that is neither a constant nor a decimal number
    #[error("failed to parse string length {token} for {name}")]
    BadStringLength {
        /// Length token
        token: String,
        /// Field or argument name
        name: String,
    },

    /// `proc` start value or stride that cannot be parsed or is out of domain
    #[error("bad proc value '{value}': {reason}")]
    BadProcValue {
        /// Offending value token
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// `proc` value space that does not fit the integer width
    #[error("not enough values starting from '{start}' with step '{per_proc}' and type size '{size}' for {procs} procs")]
    ProcOverflow {
        /// First value
        start: i64,
        /// Values per logical instance
        per_proc: i64,
        /// Integer width in bytes
        size: u64,
        /// Number of logical instances
        procs: u64,
    },

    // Resource errors
    /// Resource whose base is neither a primitive kind nor a known resource
    #[error("resource '{resource}' has unknown parent resource '{parent}'")]
    UnknownParent {
        /// Resource being resolved
        resource: String,
        /// Unknown base
        parent: String,
    },

    /// Resource inheritance loop
    #[error("resource '{resource}' has cyclic parent chain through '{through}'")]
    ResourceCycle {
        /// Resource being resolved
        resource: String,
        /// Resource reached twice
        through: String,
    },

    /// Worker pool for parallel compilation could not be started
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),

    /// Any fatal error, tagged with the call being compiled
    #[error("{call}: {source}")]
    InCall {
        /// Call variant name
        call: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Any fatal error, tagged with the architecture it was raised for
    #[error("{arch}: {source}")]
    InArch {
        /// Architecture name
        arch: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Aborts the whole architecture
    Fatal,
    /// Offending symbol dropped, compilation continues
    Degrade,
    /// A single call is marked unavailable on one architecture
    CallUnavailable,
}

impl Error {
    /// Wrap the error with the architecture it was raised for
    pub fn in_arch(self, arch: impl Into<String>) -> Self {
        match self {
            // Already tagged
            Error::InArch { .. } => self,
            other => Error::InArch {
                arch: arch.into(),
                source: Box::new(other),
            },
        }
    }

    /// Wrap the error with the call it was raised for
    pub fn in_call(self, call: impl Into<String>) -> Self {
        Error::InCall {
            call: call.into(),
            source: Box::new(self),
        }
    }

    /// Architecture the error was raised for, if tagged
    pub fn arch(&self) -> Option<&str> {
        match self {
            Error::InArch { arch, .. } => Some(arch),
            _ => None,
        }
    }

    /// Strip the architecture tag
    pub fn root(&self) -> &Error {
        match self {
            Error::InArch { source, .. } | Error::InCall { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify error severity
    pub fn classify(&self) -> Severity {
        Severity::Fatal
    }
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_arch_tags_once() {
        let err = Error::UnknownFlags("open_flags".to_string())
            .in_arch("amd64")
            .in_arch("arm64");
        assert_eq!(err.arch(), Some("amd64"));
        assert_eq!(err.root(), &Error::UnknownFlags("open_flags".to_string()));
        assert_eq!(err.to_string(), "amd64: unknown flag open_flags");
    }

    #[test]
    fn test_root_strips_call_and_arch() {
        let err = Error::BadDirection("up".to_string())
            .in_call("pipe")
            .in_arch("amd64");
        assert_eq!(err.to_string(), "amd64: pipe: bad direction up");
        assert_eq!(err.root(), &Error::BadDirection("up".to_string()));
    }

    #[test]
    fn test_conflict_message_names_both_values() {
        let err = Error::ConstConflict {
            arch: "amd64".to_string(),
            name: "O_RDONLY".to_string(),
            old: 0,
            new: 1,
        };
        assert_eq!(
            err.to_string(),
            "const O_RDONLY has different values for amd64: 0 vs 1"
        );
        assert_eq!(err.classify(), Severity::Fatal);
    }
}

//! # Per-architecture description compiler
//!
//! Projects one architecture-independent [`Description`] through the constant
//! table of each target architecture.
//!
//! ## Pipeline
//!
//! ```text
//! ConstTable → flag sets → resources → struct identities → struct fields → calls
//! ```
//!
//! Each stage consumes the finished output of the previous one. Struct
//! identities are registered for every struct before any field is compiled.
//!
//! ## Usage
//!
//! ```
//! use sysdesc::compiler::{Arch, ArchTarget, CompileOptions, Compiler};
//! use sysdesc::consts::ConstTableBuilder;
//! use sysdesc::schema::{Description, ResourceDef, Syscall};
//!
//! let desc = Description::new()
//!     .resource(ResourceDef::new("fd", "int32", &[]))
//!     .syscall(Syscall::new("close").arg("fd", "fd", &[]));
//!
//! let mut consts = ConstTableBuilder::new("amd64");
//! consts.call_numbers([("close", 3)]);
//! let target = ArchTarget::new(Arch::new("amd64"), consts.build());
//!
//! let out = Compiler::new(CompileOptions::default()).compile_arch(&desc, &target)?;
//! assert_eq!(out.calls[0].nr, Some(3));
//! # Ok::<(), sysdesc::Error>(())
//! ```

pub mod args;
pub mod calls;
pub mod structs;
pub mod types;

pub use args::{Construct, TypeCompiler, Usage};
pub use calls::assemble_call;
pub use structs::{StructInstance, StructTable};
pub use types::{
    ArgType, ArrayLen, BufferKind, CallDesc, Direction, IntKind, LenUnit, ResourceDesc, StructId,
    StructKey, StructRef, TypeCommon, TypeKind, Unavailable,
};

use crate::consts::ConstTable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::flags::resolve_flags;
use crate::parallel::{compile_parallel, ParallelConfig};
use crate::resources::resolve_resource;
use crate::schema::Description;
use args::UnresolvedConsts;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pointer width used when an architecture does not say otherwise
pub const DEFAULT_PTR_SIZE: u64 = 8;

/// Concurrent executor instances `proc` values must leave room for
pub const DEFAULT_MAX_PROCS: u64 = 32;

/// What to do with a call whose `const` argument names an undefined symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedConstPolicy {
    /// Encode 0 and mark the call unavailable on the architecture
    #[default]
    MarkUnavailable,
    /// Encode 0 and leave the call available
    EncodeZero,
}

/// Compilation options
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Handling of unresolved `const` values in call arguments
    pub unresolved_const: UnresolvedConstPolicy,
    /// Executor instances `proc` value ranges must cover
    pub max_procs: u64,
    /// Parallelism for [`Compiler::compile_all`]
    pub parallel: ParallelConfig,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            unresolved_const: UnresolvedConstPolicy::default(),
            max_procs: DEFAULT_MAX_PROCS,
            parallel: ParallelConfig::default(),
        }
    }
}

/// A target architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arch {
    /// Architecture name (`amd64`, `arm64`, ...)
    pub name: String,
    /// Pointer width in bytes
    pub ptr_size: u64,
}

impl Arch {
    /// Architecture with the default pointer width
    pub fn new(name: &str) -> Self {
        Self::with_ptr_size(name, DEFAULT_PTR_SIZE)
    }

    /// Architecture with an explicit pointer width
    pub fn with_ptr_size(name: &str, ptr_size: u64) -> Self {
        Self {
            name: name.to_string(),
            ptr_size,
        }
    }
}

/// An architecture together with its merged constant table
#[derive(Debug, Clone)]
pub struct ArchTarget {
    /// Architecture
    pub arch: Arch,
    /// Constants (including call numbers) of the architecture
    pub consts: ConstTable,
}

impl ArchTarget {
    /// Pair an architecture with its table
    pub fn new(arch: Arch, consts: ConstTable) -> Self {
        Self { arch, consts }
    }
}

/// Everything compiled for one architecture
#[derive(Debug, Clone, Serialize)]
pub struct ArchOutput {
    /// Architecture
    pub arch: Arch,
    /// Resources by name
    pub resources: BTreeMap<String, ResourceDesc>,
    /// Struct and union instances
    pub structs: StructTable,
    /// Calls in description order
    pub calls: Vec<CallDesc>,
    /// Constants sorted by name
    pub consts: ConstTable,
    /// Degrade-level problems found
    pub diagnostics: Vec<Diagnostic>,
}

impl ArchOutput {
    /// Find a call by variant name
    pub fn call(&self, name: &str) -> Option<&CallDesc> {
        self.calls.iter().find(|c| c.name == name)
    }

    /// Calls that may be invoked on this architecture
    pub fn available_calls(&self) -> impl Iterator<Item = &CallDesc> {
        self.calls.iter().filter(|c| c.is_available())
    }
}

/// Description compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile the description for one architecture
    ///
    /// Fatal errors are tagged with the architecture name.
    pub fn compile_arch(&self, desc: &Description, target: &ArchTarget) -> Result<ArchOutput> {
        self.compile_arch_inner(desc, target)
            .map_err(|e| e.in_arch(&target.arch.name))
    }

    /// Compile the description for every target, in parallel
    ///
    /// Outputs follow the order of `targets`. Any fatal error fails the run.
    pub fn compile_all(&self, desc: &Description, targets: &[ArchTarget]) -> Result<Vec<ArchOutput>> {
        compile_parallel(targets, |t| self.compile_arch(desc, t), &self.options.parallel)
    }

    fn compile_arch_inner(&self, desc: &Description, target: &ArchTarget) -> Result<ArchOutput> {
        let arch = &target.arch;
        let consts = &target.consts;
        tracing::info!(arch = %arch.name, "generating {}...", arch.name);
        let mut diags = Diagnostics::new(&arch.name);

        let flags = resolve_flags(&desc.flags, consts, &mut diags);
        let mut structs = StructTable::register(desc);

        let (resources, fields, calls) = {
            let compiler = TypeCompiler {
                desc,
                consts,
                flags: &flags,
                structs: structs.index(),
                ptr_size: arch.ptr_size,
                max_procs: self.options.max_procs,
            };

            let mut resources = BTreeMap::new();
            for def in desc.resources.values() {
                let resolved = resolve_resource(def, &desc.resources, consts, &mut diags)?;
                let ty = compiler.compile(
                    Usage {
                        parent: "",
                        name: "resource-type",
                        dir: Direction::InOut,
                        is_arg: true,
                        is_field: true,
                    },
                    &resolved.underlying,
                    &[],
                    &mut UnresolvedConsts::default(),
                )?;
                resources.insert(
                    resolved.name.clone(),
                    ResourceDesc {
                        name: resolved.name,
                        kind: resolved.kind,
                        ty,
                        values: resolved.values,
                    },
                );
            }

            let fields = structs.compile_fields(desc, &compiler, &mut diags)?;

            let calls = desc
                .syscalls
                .iter()
                .map(|call| {
                    assemble_call(call, &compiler, self.options.unresolved_const, &mut diags)
                })
                .collect::<Result<Vec<_>>>()?;
            (resources, fields, calls)
        };
        structs.fill(fields);

        let unavailable = calls.iter().filter(|c| !c.is_available()).count();
        tracing::info!(
            arch = %arch.name,
            calls = calls.len(),
            unavailable,
            structs = structs.len(),
            resources = resources.len(),
            "compiled"
        );

        Ok(ArchOutput {
            arch: arch.clone(),
            resources,
            structs,
            calls,
            consts: consts.clone(),
            diagnostics: diags.into_entries(),
        })
    }
}

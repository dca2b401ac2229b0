//! # sysdesc - Syscall Description Compiler
//!
//! Compiles an architecture-independent description of an operating system's
//! call surface (calls, structs and unions, resources, flag sets, string sets)
//! into per-architecture typed call descriptors for a fuzzing executor.
//!
//! Each architecture has its own constants: call numbers, flag values, sizes.
//! The compiler projects the single description through each architecture's
//! constant table and produces one self-consistent set of descriptors per
//! architecture.
//!
//! ## Quick Start
//!
//! ```rust
//! use sysdesc::{Arch, ArchTarget, Compiler, ConstTableBuilder, Description};
//! use sysdesc::schema::{ResourceDef, Syscall};
//!
//! # fn main() -> sysdesc::Result<()> {
//! let desc = Description::new()
//!     .resource(ResourceDef::new("fd", "int32", &["AT_FDCWD"]))
//!     .flag_set("open_flags", &["O_RDONLY", "O_WRONLY", "O_CLOEXEC"])
//!     .syscall(
//!         Syscall::new("open")
//!             .arg("file", "filename", &[])
//!             .arg("flags", "flags", &["open_flags"])
//!             .returns("fd", &[]),
//!     );
//!
//! let mut consts = ConstTableBuilder::new("amd64");
//! consts.add_source("fs_amd64.const", "AT_FDCWD = 0xffffff9c\nO_RDONLY = 0\nO_WRONLY = 1\n")?;
//! consts.call_numbers([("open", 2)]);
//! let target = ArchTarget::new(Arch::new("amd64"), consts.build());
//!
//! let out = Compiler::default().compile_arch(&desc, &target)?;
//! let open = out.call("open").unwrap();
//! assert_eq!(open.nr, Some(2));
//! assert_eq!(open.args.len(), 2);
//! assert_eq!(out.resources["fd"].values, vec![0xffffff9c]);
//! // O_CLOEXEC has no value on this architecture and was dropped
//! assert_eq!(out.diagnostics.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! const sources ─┐
//!                ├─► ConstTable ─► flags ─► resources ─► structs ─► calls ─► ArchOutput
//! Description ───┘
//! ```
//!
//! ### Main Components
//!
//! - [`ConstTableBuilder`] - merges const sources, detects conflicting values
//! - [`flags`] - projects flag sets, dropping unknown symbols
//! - [`resources`] - walks resource inheritance chains
//! - [`compiler::StructTable`] - struct/union instance arena
//! - [`compiler::TypeCompiler`] - compiles one type reference
//! - [`compiler::assemble_call`] - compiles one call and decides availability
//! - [`Compiler`] - drives all of the above per architecture, in parallel
//!
//! ## Error Handling
//!
//! Contract violations in the description (unknown type, wrong parameter
//! count, conflicting constant, ...) are fatal [`Error`]s for the architecture.
//! Unknown symbols in flag sets and resource values are dropped and reported
//! as [`Diagnostic`]s; calls that cannot be used on an architecture are kept
//! but marked unavailable.

pub mod compiler;
pub mod consts;
pub mod diagnostics;
pub mod error;
pub mod flags;
pub mod parallel;
pub mod resources;
pub mod schema;
pub mod syscalls;
pub mod token;

/// Version of the compiler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types
pub use compiler::{
    Arch, ArchOutput, ArchTarget, CompileOptions, Compiler, UnresolvedConstPolicy,
};
pub use consts::{ConstTable, ConstTableBuilder};
pub use diagnostics::Diagnostic;
pub use error::{Error, Result};
pub use schema::Description;
pub use syscalls::SyscallTable;

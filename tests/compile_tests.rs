//! End-to-end compilation: calls, resources, availability and multiple architectures

use sysdesc::compiler::{BufferKind, Direction, IntKind, TypeKind, Unavailable};
use sysdesc::parallel::ParallelConfig;
use sysdesc::schema::{ResourceDef, StructDef, Syscall};
use sysdesc::{
    Arch, ArchOutput, ArchTarget, CompileOptions, Compiler, ConstTableBuilder, Description,
    Diagnostic, Error, SyscallTable, UnresolvedConstPolicy,
};

fn target(arch: &str, consts: &[(&str, u64)], calls: &[(&str, u64)]) -> ArchTarget {
    let mut builder = ConstTableBuilder::new(arch);
    builder.extend(consts.iter().copied()).unwrap();
    builder.call_numbers(calls.iter().copied());
    ArchTarget::new(Arch::new(arch), builder.build())
}

fn compile(desc: &Description, target: &ArchTarget) -> ArchOutput {
    Compiler::default().compile_arch(desc, target).unwrap()
}

fn fs_desc() -> Description {
    Description::new()
        .resource(ResourceDef::new("fd", "int32", &[]))
        .flag_set("open_flags", &["O_RDONLY", "O_WRONLY", "O_RDWR"])
        .syscall(
            Syscall::new("open")
                .arg("file", "filename", &[])
                .arg("flags", "flags", &["open_flags"])
                .returns("fd", &[]),
        )
        .syscall(
            Syscall::new("read")
                .arg("fd", "fd", &[])
                .arg("buf", "buffer", &["out"])
                .arg("count", "len", &["buf"]),
        )
        .syscall(
            Syscall::new("read$variant")
                .arg("fd", "fd", &[])
                .arg("buf", "buffer", &["out"])
                .arg("count", "len", &["buf"]),
        )
}

// ====================
// Resources and flags
// ====================

#[test]
fn test_plain_resource() {
    let out = compile(&fs_desc(), &target("amd64", &[], &[]));
    let fd = &out.resources["fd"];
    assert_eq!(fd.name, "fd");
    assert_eq!(fd.kind, vec!["fd"]);
    assert_eq!(fd.values, vec![0]);
    assert_eq!(
        fd.ty.kind,
        TypeKind::Int {
            size: 4,
            big_endian: false,
            kind: IntKind::Plain
        }
    );
}

#[test]
fn test_resource_chain_values() {
    let desc = Description::new()
        .resource(ResourceDef::new("fd", "int32", &["AT_FDCWD", "MAX_FD"]))
        .resource(ResourceDef::new("sock", "fd", &["3"]))
        .resource(ResourceDef::new("sock_tcp", "sock", &["16", "NO_SUCH"]));
    let out = compile(
        &desc,
        &target("amd64", &[("AT_FDCWD", 0xffffff9c), ("MAX_FD", 1024)], &[]),
    );
    let tcp = &out.resources["sock_tcp"];
    assert_eq!(tcp.kind, vec!["fd", "sock", "sock_tcp"]);
    assert_eq!(tcp.values, vec![0xffffff9c, 1024, 3, 16]);
    assert_eq!(tcp.ty.dir(), Direction::InOut);
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::UnresolvedResourceValue {
            resource: "sock_tcp".to_string(),
            symbol: "NO_SUCH".to_string(),
        }]
    );
}

#[test]
fn test_resource_errors_are_fatal() {
    let unknown = Description::new().resource(ResourceDef::new("h", "handle", &[]));
    let err = Compiler::default()
        .compile_arch(&unknown, &target("arm64", &[], &[]))
        .unwrap_err();
    assert_eq!(err.arch(), Some("arm64"));
    assert!(matches!(err.root(), Error::UnknownParent { parent, .. } if parent == "handle"));

    let cyclic = Description::new()
        .resource(ResourceDef::new("a", "b", &[]))
        .resource(ResourceDef::new("b", "a", &[]));
    let err = Compiler::default()
        .compile_arch(&cyclic, &target("arm64", &[], &[]))
        .unwrap_err();
    assert!(matches!(err.root(), Error::ResourceCycle { .. }));
}

#[test]
fn test_open_flags() {
    let out = compile(
        &fs_desc(),
        &target("amd64", &[("O_RDONLY", 0), ("O_WRONLY", 1), ("O_RDWR", 2)], &[("open", 2)]),
    );
    let open = out.call("open").unwrap();
    assert_eq!(
        open.args[1].kind,
        TypeKind::Flags {
            size: 8,
            big_endian: false,
            values: vec![0, 1, 2],
        }
    );
    let file = open.args[0].pointee().unwrap();
    assert_eq!(file.kind, TypeKind::Buffer(BufferKind::Filename));
}

// ====================
// Calls
// ====================

#[test]
fn test_call_shapes() {
    let out = compile(&fs_desc(), &target("amd64", &[], &[("open", 2), ("read", 0)]));
    let open = out.call("open").unwrap();
    let ret = open.ret.as_ref().unwrap();
    assert_eq!(ret.name(), "ret");
    assert_eq!(ret.dir(), Direction::Out);
    assert_eq!(ret.kind, TypeKind::Resource { desc: "fd".to_string() });

    let read = out.call("read").unwrap();
    assert_eq!(read.nr, Some(0));
    assert!(read.ret.is_none());
    let names: Vec<&str> = read.args.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["fd", "buf", "count"]);
    assert!(read.args.iter().all(|a| a.dir() == Direction::In));
    assert_eq!(read.args[1].pointee().unwrap().dir(), Direction::Out);
}

#[test]
fn test_calls_keep_description_order() {
    let out = compile(&fs_desc(), &target("amd64", &[], &[("read", 0)]));
    let names: Vec<&str> = out.calls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["open", "read", "read$variant"]);
    let available: Vec<&str> = out.available_calls().map(|c| c.name.as_str()).collect();
    assert_eq!(available, vec!["read", "read$variant"]);
}

#[test]
fn test_variant_without_number_stays_in_output() {
    let desc = Description::new()
        .resource(ResourceDef::new("fd", "int32", &[]))
        .syscall(
            Syscall::new("read$variant")
                .arg("fd", "fd", &[])
                .arg("buf", "buffer", &["out"])
                .arg("count", "len", &["buf"]),
        );
    let out = compile(&desc, &target("amd64", &[], &[]));
    let call = out.call("read$variant").unwrap();
    assert_eq!(call.call_name, "read");
    assert_eq!(call.nr, None);
    assert_eq!(call.nr_or_sentinel(), -1);
    assert_eq!(call.unavailable, Some(Unavailable::NoCallNumber));
    assert_eq!(call.args.len(), 3);
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::UnsupportedCall {
            call_name: "read".to_string()
        }]
    );
}

#[test]
fn test_unsupported_call_reported_once_per_symbol() {
    let out = compile(&fs_desc(), &target("amd64", &[], &[("open", 2)]));
    let unsupported: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::UnsupportedCall { .. }))
        .collect();
    assert_eq!(unsupported.len(), 1);
}

#[test]
fn test_top_level_array_is_rejected() {
    let desc = Description::new().syscall(Syscall::new("writev").arg("vec", "array", &["int32"]));
    let err = Compiler::default()
        .compile_arch(&desc, &target("amd64", &[], &[("writev", 20)]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "amd64: writev: \"vec\" array can't be syscall argument/return"
    );
}

#[test]
fn test_pointer_wrapped_struct_is_accepted() {
    let desc = Description::new()
        .structure(StructDef::new("timespec").field("sec", "int64", &[]))
        .syscall(Syscall::new("nanosleep").arg("req", "ptr", &["in", "timespec"]))
        .syscall(Syscall::new("bad").arg("req", "timespec", &[]));
    let ok = Description {
        syscalls: desc.syscalls[..1].to_vec(),
        ..desc.clone()
    };
    assert!(Compiler::default()
        .compile_arch(&ok, &target("amd64", &[], &[("nanosleep", 35)]))
        .is_ok());
    let err = Compiler::default()
        .compile_arch(&desc, &target("amd64", &[], &[("nanosleep", 35)]))
        .unwrap_err();
    assert!(matches!(err.root(), Error::NotArgument { typ, .. } if typ == "timespec"));
}

#[test]
fn test_arity_error_names_call() {
    let desc = Description::new()
        .flag_set("f", &["1"])
        .syscall(Syscall::new("fcntl").arg("cmd", "flags", &["f", "int32"]));
    let err = Compiler::default()
        .compile_arch(&desc, &target("amd64", &[], &[("fcntl", 72)]))
        .unwrap_err();
    assert!(matches!(
        &err,
        Error::InArch { source, .. } if matches!(source.as_ref(), Error::InCall { call, .. } if call == "fcntl")
    ));
    assert!(matches!(err.root(), Error::Arity { want, got: 2, .. } if want == "1"));
}

// ====================
// Unresolved const policy
// ====================

fn socket_desc() -> Description {
    Description::new().syscall(
        Syscall::new("socket$vsock")
            .arg("domain", "const", &["AF_VSOCK"])
            .arg("type", "const", &["1"]),
    )
}

#[test]
fn test_unresolved_const_marks_call_unavailable() {
    let out = compile(&socket_desc(), &target("386", &[], &[("socket", 359)]));
    let call = out.call("socket$vsock").unwrap();
    assert_eq!(call.nr, None);
    assert_eq!(
        call.unavailable,
        Some(Unavailable::MissingConst {
            symbol: "AF_VSOCK".to_string()
        })
    );
    assert!(matches!(call.args[0].kind, TypeKind::Const { value: 0, .. }));
    assert!(matches!(call.args[1].kind, TypeKind::Const { value: 1, .. }));
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::UnavailableCall {
            call: "socket$vsock".to_string(),
            reason: "missing const AF_VSOCK".to_string(),
        }]
    );
}

#[test]
fn test_unresolved_const_encode_zero() {
    let options = CompileOptions {
        unresolved_const: UnresolvedConstPolicy::EncodeZero,
        ..CompileOptions::default()
    };
    let out = Compiler::new(options)
        .compile_arch(&socket_desc(), &target("386", &[], &[("socket", 359)]))
        .unwrap();
    let call = out.call("socket$vsock").unwrap();
    assert_eq!(call.nr, Some(359));
    assert_eq!(call.unavailable, None);
    assert!(matches!(call.args[0].kind, TypeKind::Const { value: 0, .. }));
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::UnresolvedConst {
            symbol: "AF_VSOCK".to_string()
        }]
    );
}

#[test]
fn test_missing_number_wins_over_missing_const() {
    let out = compile(&socket_desc(), &target("386", &[], &[]));
    let call = out.call("socket$vsock").unwrap();
    assert_eq!(call.unavailable, Some(Unavailable::NoCallNumber));
}

// ====================
// Multiple architectures
// ====================

fn targets() -> Vec<ArchTarget> {
    let amd64 = target(
        "amd64",
        &[("O_RDONLY", 0), ("O_WRONLY", 1), ("O_RDWR", 2)],
        &[("open", 2), ("read", 0)],
    );
    let mut i386 = target("386", &[("O_RDONLY", 0), ("O_WRONLY", 1)], &[("open", 5), ("read", 3)]);
    i386.arch = Arch::with_ptr_size("386", 4);
    let arm64 = target("arm64", &[("O_RDONLY", 0)], &[("read", 63)]);
    vec![amd64, i386, arm64]
}

#[test]
fn test_compile_all_keeps_target_order() {
    let outputs = Compiler::default().compile_all(&fs_desc(), &targets()).unwrap();
    let archs: Vec<&str> = outputs.iter().map(|o| o.arch.name.as_str()).collect();
    assert_eq!(archs, vec!["amd64", "386", "arm64"]);

    // Pointer-width arguments follow the architecture
    let len_size = |out: &ArchOutput| match out.call("read").unwrap().args[2].kind {
        TypeKind::Len { size, .. } => size,
        ref other => panic!("not a len: {:?}", other),
    };
    assert_eq!(len_size(&outputs[0]), 8);
    assert_eq!(len_size(&outputs[1]), 4);

    let flags = |out: &ArchOutput| match &out.call("open").unwrap().args[1].kind {
        TypeKind::Flags { values, .. } => values.clone(),
        other => panic!("not flags: {:?}", other),
    };
    assert_eq!(flags(&outputs[0]), vec![0, 1, 2]);
    assert_eq!(flags(&outputs[1]), vec![0, 1]);
}

#[test]
fn test_syscall_table() {
    let outputs = Compiler::default().compile_all(&fs_desc(), &targets()).unwrap();
    let table = SyscallTable::build(&outputs);
    assert_eq!(table.archs(), &["amd64", "386", "arm64"]);
    assert_eq!(table.entries().len(), 3);

    let open = table.get("open").unwrap();
    assert_eq!(open.number("amd64"), Some(2));
    assert_eq!(open.number("386"), Some(5));
    assert_eq!(open.number("arm64"), None);
    assert!(!open.is_unavailable_everywhere());

    let variant = table.get("read$variant").unwrap();
    assert_eq!(variant.call_name, "read");
    assert_eq!(variant.number("arm64"), Some(63));
}

#[test]
fn test_compile_all_fails_with_arch() {
    let desc = Description::new().syscall(
        Syscall::new("mmap").arg("len", "proc", &["4294967290", "1"]),
    );
    let mut small = target("386", &[], &[("mmap", 90)]);
    small.arch = Arch::with_ptr_size("386", 4);
    let targets = vec![target("amd64", &[], &[("mmap", 9)]), small];
    let options = CompileOptions {
        parallel: ParallelConfig {
            max_parallelism: 2,
            fail_fast: false,
        },
        ..CompileOptions::default()
    };
    let err = Compiler::new(options).compile_all(&desc, &targets).unwrap_err();
    assert_eq!(err.arch(), Some("386"));
    assert!(matches!(err.root(), Error::ProcOverflow { size: 4, .. }));
}

// ====================
// Serialization
// ====================

#[test]
fn test_json_description_round_trip_to_output() {
    let desc = Description::from_json(
        r#"{
            "syscalls": [
                {"name": "close", "call_name": "close", "args": [{"name": "fd", "type": "fd"}]}
            ],
            "resources": {"fd": {"name": "fd", "base": "int32", "values": ["AT_FDCWD"]}}
        }"#,
    )
    .unwrap();
    let out = compile(&desc, &target("amd64", &[("AT_FDCWD", 0xffffff9c)], &[("close", 3)]));
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["arch"]["name"], "amd64");
    assert_eq!(json["calls"][0]["nr"], 3);
    assert_eq!(json["resources"]["fd"]["values"][0], 0xffffff9cu64);
    assert_eq!(json["consts"]["__NR_close"], 3);
}

//! Call assembly
//!
//! Every call of the description yields a descriptor on every architecture,
//! available or not. A call is unavailable when its number is unknown, or
//! (depending on [`UnresolvedConstPolicy`]) when one of its `const` values
//! names an undefined symbol.

use super::args::{TypeCompiler, UnresolvedConsts, Usage};
use super::types::{CallDesc, Direction, Unavailable};
use super::UnresolvedConstPolicy;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::schema::Syscall;

/// Name given to compiled return values
pub const RET_NAME: &str = "ret";

/// Compile one call for the compiler's architecture
pub fn assemble_call(
    call: &Syscall,
    compiler: &TypeCompiler<'_>,
    policy: UnresolvedConstPolicy,
    diags: &mut Diagnostics,
) -> Result<CallDesc> {
    tracing::debug!(call = %call.name, "assemble call");
    let in_call = |e: Error| e.in_call(&call.name);

    let mut nr = compiler.consts.call_number(&call.call_name);
    let mut unavailable = None;
    if nr.is_none() {
        diags.report(Diagnostic::UnsupportedCall {
            call_name: call.call_name.clone(),
        });
        unavailable = Some(Unavailable::NoCallNumber);
    }

    let mut unresolved = UnresolvedConsts::default();
    let ret = match &call.ret {
        Some(ret) => Some(
            compiler
                .compile(
                    Usage::arg(RET_NAME, Direction::Out),
                    &ret.typ,
                    &ret.params,
                    &mut unresolved,
                )
                .map_err(in_call)?,
        ),
        None => None,
    };
    let args = call
        .args
        .iter()
        .map(|a| {
            compiler.compile(
                Usage::arg(&a.name, Direction::In),
                &a.typ,
                &a.params,
                &mut unresolved,
            )
        })
        .collect::<Result<Vec<_>>>()
        .map_err(in_call)?;

    if let Some(symbol) = unresolved.symbols().first() {
        match policy {
            UnresolvedConstPolicy::MarkUnavailable => {
                let reason = Unavailable::MissingConst {
                    symbol: symbol.clone(),
                };
                diags.report(Diagnostic::UnavailableCall {
                    call: call.name.clone(),
                    reason: reason.to_string(),
                });
                nr = None;
                unavailable.get_or_insert(reason);
            }
            UnresolvedConstPolicy::EncodeZero => {
                for symbol in unresolved.symbols() {
                    diags.report(Diagnostic::UnresolvedConst {
                        symbol: symbol.clone(),
                    });
                }
            }
        }
    }

    Ok(CallDesc {
        name: call.name.clone(),
        call_name: call.call_name.clone(),
        nr,
        unavailable,
        ret,
        args,
    })
}

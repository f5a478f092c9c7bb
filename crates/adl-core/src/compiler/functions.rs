//! Function stage: header lookup, prototype decoding and shims
//!
//! ```text
//! function dR            header deltaR.h:
//!   arg eta1               double deltaR(double eta1, double phi1,
//!   arg phi1                             double eta2, double phi2);
//!   ...
//!   code deltaR.h
//! ```
//!
//! Each resolved function is cached in the context (return type for
//! `apply`, header for `#include`) and gets a forwarding shim.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::ast::{Block, BlockKind, Document, Keyword};
use crate::context::{CompilationContext, FunctionInfo};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::emit::{FunctionShim, ShimParam};
use crate::error::{CompileError, Result};
use crate::signature::{find_declaration, FunctionSignature};
use crate::symbols::mangle;

/// Parameters the shim receives as `TEParticle` and copies element-wise
static LORENTZ_VECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vector\s*<\s*TLorentzVector\s*>").unwrap());

const PARTICLE_VECTOR: &str = "vector<TEParticle>&";

/// `code` operand announcing inline C++ rather than a header
const INLINE_CODE: &str = "c++";

pub(crate) fn process(
    document: &Document,
    ctx: &mut CompilationContext<'_>,
) -> Result<Vec<FunctionShim>> {
    let mut shims = Vec::new();

    for block in document.blocks_of(BlockKind::Function) {
        let Some(header_name) = header_name(block, ctx) else {
            continue;
        };

        let header = ctx.resolver.resolve(header_name).ok_or_else(|| {
            CompileError::resolution(format!(
                "unable to locate header {} for function {}",
                header_name, block.name
            ))
        })?;
        let text = ctx.resolver.read(&header).map_err(|err| {
            CompileError::resolution(format!(
                "unable to read header {} for function {}: {}",
                header.path.display(),
                block.name,
                err
            ))
        })?;

        let wanted = block.name.rsplit('.').next().unwrap_or(&block.name);
        let signature = find_declaration(&text, wanted)?.ok_or_else(|| {
            CompileError::resolution(format!(
                "no declaration of {} found in {}",
                wanted, header.include
            ))
        })?;
        debug!(function = %block.name, ?signature, "decoded");

        let args = argument_names(block, ctx);
        check_arity(block, &args, &signature)?;

        let info = FunctionInfo {
            dsl_name: block.name.clone(),
            internal_name: mangle(BlockKind::Function, &block.name),
            external_name: block.name.replace('.', "::"),
            signature,
            header,
        };
        info!(
            "function {} -> {} from {}",
            info.dsl_name, info.external_name, info.header.include
        );

        shims.push(shim(&info, &args));
        ctx.add_header(&info.header);
        ctx.functions.insert(info.dsl_name.clone(), info);
    }

    Ok(shims)
}

/// Header named by the block's `code` statement; `None` (with a warning)
/// when the block cannot be resolved from a header.
fn header_name<'d>(block: &'d Block, ctx: &mut CompilationContext<'_>) -> Option<&'d str> {
    let code = block.statements(Keyword::Code).next();
    match code.and_then(|stmt| stmt.first_word().map(|word| (stmt.line, word))) {
        None => {
            ctx.warn(
                Diagnostic::warning(
                    DiagnosticCode::MissingFunctionCode,
                    format!("function {} has no code statement and is skipped", block.name),
                )
                .at_line(block.line),
            );
            None
        }
        Some((line, word)) if word.eq_ignore_ascii_case(INLINE_CODE) => {
            ctx.warn(
                Diagnostic::warning(
                    DiagnosticCode::UnsupportedInlineCode,
                    format!("inline C++ in function {} is not supported; skipped", block.name),
                )
                .at_line(line),
            );
            None
        }
        Some((_, word)) => Some(word),
    }
}

/// Names of the `arg` statements; unnamed ones are reported and not counted
fn argument_names<'d>(block: &'d Block, ctx: &mut CompilationContext<'_>) -> Vec<&'d str> {
    let mut args = Vec::new();
    for stmt in block.statements(Keyword::Arg) {
        match stmt.first_word() {
            Some(word) => args.push(word),
            None => ctx.warn(
                Diagnostic::warning(
                    DiagnosticCode::EmptyArgument,
                    format!(
                        "function {} has an arg statement without a name; it is not counted",
                        block.name
                    ),
                )
                .at_line(stmt.line),
            ),
        }
    }
    args
}

fn check_arity(block: &Block, args: &[&str], signature: &FunctionSignature) -> Result<()> {
    if args.len() == signature.arity() {
        return Ok(());
    }
    Err(CompileError::semantic(
        block.line,
        format!(
            "argument count mismatch in function {}: {} expects {} ({}) but the ADL file lists {} ({})",
            block.name,
            signature.name,
            signature.arity(),
            signature.param_types.join(", "),
            args.len(),
            args.join(", ")
        ),
    ))
}

fn shim(info: &FunctionInfo, args: &[&str]) -> FunctionShim {
    let params = info
        .signature
        .param_types
        .iter()
        .zip(args)
        .map(|(ty, name)| {
            let base_copy = LORENTZ_VECTOR.is_match(ty);
            ShimParam {
                ty: if base_copy {
                    PARTICLE_VECTOR.to_string()
                } else {
                    ty.clone()
                },
                name: name.to_string(),
                base_copy,
            }
        })
        .collect();

    FunctionShim {
        dsl_name: info.dsl_name.clone(),
        return_type: info.signature.return_type.clone(),
        internal_name: info.internal_name.clone(),
        external_name: info.external_name.clone(),
        params,
    }
}

//! Object stage
//!
//! ## Steps
//!
//! 1. order object blocks so producers come before consumers
//! 2. check the `take` rule and record undeclared sources as external
//!    event inputs
//! 3. infer singletons in dependency order (a block taking from a
//!    singleton is one too)
//! 4. build one [`ObjectUnit`] per block
//!
//! Inside a collection block every `apply` is checked for an implicit loop;
//! its result name is local to the block and later conditions use it as is.
//! Conditions themselves may not iterate over another collection.

use tracing::{debug, info};

use crate::ast::{Block, BlockKind, Document, Keyword, Statement};
use crate::context::CompilationContext;
use crate::dag::order_blocks;
use crate::diagnostics::ignored_statement;
use crate::emit::{ExternalObject, FilterKind, FilterStep, ObjectBody, ObjectUnit};
use crate::error::{CompileError, Result};
use crate::lexer::identifiers;
use crate::loops::implicit_loop;
use crate::rewrite::{ExpressionRewriter, RewriteContext};
use crate::symbols::looks_singleton;

pub(crate) fn process(
    document: &Document,
    ctx: &mut CompilationContext<'_>,
) -> Result<(Vec<ExternalObject>, Vec<ObjectUnit>)> {
    let blocks: Vec<&Block> = document.blocks_of(BlockKind::Object).collect();
    let ordered = order_blocks(BlockKind::Object, &blocks)?;

    let mut sources = Vec::with_capacity(ordered.len());
    for &block in &ordered {
        let source = take_source(block)?;
        infer_singleton(block, source, ctx);
        sources.push(source);
    }

    let externals = ctx
        .registry
        .externals()
        .iter()
        .map(|name| ExternalObject {
            name: name.clone(),
            singleton: ctx.registry.is_singleton(name),
        })
        .collect();

    let mut units = Vec::with_capacity(ordered.len());
    for (block, source) in ordered.iter().zip(sources) {
        let unit = if ctx.registry.is_singleton(&block.name) {
            singleton(block, source, ctx)
        } else {
            collection(block, source, ctx)?
        };
        info!(
            object = %unit.name,
            singleton = unit.is_singleton(),
            "object from {}",
            source
        );
        units.push(unit);
    }

    Ok((externals, units))
}

/// The single source of an object block, which must be its first statement.
fn take_source(block: &Block) -> Result<&str> {
    let first = block.body.first().ok_or_else(|| {
        CompileError::semantic(
            block.line,
            format!("object {} is empty; it must take a source", block.name),
        )
    })?;
    if !first.is(Keyword::Take) {
        return Err(CompileError::semantic(
            first.line,
            format!(
                "object {} must take its source before any other statement",
                block.name
            ),
        ));
    }

    let takes = block.statements(Keyword::Take).count();
    if takes != 1 {
        return Err(CompileError::semantic(
            block.line,
            format!(
                "object {} takes {} sources; exactly one is supported",
                block.name, takes
            ),
        ));
    }

    match first.operand.split_whitespace().collect::<Vec<_>>().as_slice() {
        [source] => Ok(*source),
        _ => Err(CompileError::semantic(
            first.line,
            format!("object {} must take exactly one named source", block.name),
        )),
    }
}

fn infer_singleton(block: &Block, source: &str, ctx: &mut CompilationContext<'_>) {
    let registry = &mut ctx.registry;
    if !registry.is_declared(BlockKind::Object, source) {
        registry.mark_external(source);
        if looks_singleton(source) {
            registry.mark_singleton(source);
        }
    }
    if (registry.is_singleton(source) || looks_singleton(&block.name))
        && registry.mark_singleton(&block.name)
    {
        debug!(object = %block.name, source, "singleton");
    }
}

fn singleton(block: &Block, source: &str, ctx: &mut CompilationContext<'_>) -> ObjectUnit {
    for stmt in block.body.iter().skip(1) {
        ctx.warn(ignored_statement(&block.name, &stmt.text(), stmt.line));
    }
    ObjectUnit {
        name: block.name.clone(),
        body: ObjectBody::Singleton {
            source: source.to_string(),
        },
    }
}

fn collection(
    block: &Block,
    source: &str,
    ctx: &mut CompilationContext<'_>,
) -> Result<ObjectUnit> {
    let mut steps = Vec::new();
    // every apply result, and the subset filled by an implicit loop
    let mut locals: Vec<String> = Vec::new();
    let mut loop_results: Vec<String> = Vec::new();

    for stmt in block.body.iter().skip(1) {
        let filter = stmt.keyword.and_then(FilterKind::from_keyword);
        match (stmt.keyword, filter) {
            (Some(Keyword::Apply), _) => {
                let step = compute(block, source, stmt, &locals, ctx)?;
                if let FilterStep::Compute {
                    result,
                    implicit_loop,
                    ..
                } = &step
                {
                    if implicit_loop.is_some() {
                        loop_results.push(result.clone());
                    }
                    locals.push(result.clone());
                }
                steps.push(step);
            }
            (_, Some(kind)) => {
                check_condition_loop(block, source, stmt, ctx)?;
                let condition = ExpressionRewriter::new(&ctx.registry, RewriteContext::Object)
                    .with_source(source)
                    .with_loop_results(locals.iter().cloned())
                    .rewrite(&stmt.operand);
                let referenced = identifiers(&stmt.operand);
                steps.push(FilterStep::Filter {
                    kind,
                    condition,
                    loop_results: loop_results
                        .iter()
                        .filter(|name| referenced.contains(&name.as_str()))
                        .cloned()
                        .collect(),
                });
            }
            _ => ctx.warn(ignored_statement(&block.name, &stmt.text(), stmt.line)),
        }
    }

    Ok(ObjectUnit {
        name: block.name.clone(),
        body: ObjectBody::Collection {
            source: source.to_string(),
            steps,
        },
    })
}

/// A condition is evaluated per element of the source only; iterating over
/// another collection needs an `apply` whose result the condition tests.
fn check_condition_loop(
    block: &Block,
    source: &str,
    stmt: &Statement,
    ctx: &CompilationContext<'_>,
) -> Result<()> {
    match implicit_loop(stmt, &ctx.registry, &[source, block.name.as_str()])? {
        Some(object) => Err(CompileError::semantic(
            stmt.line,
            format!(
                "'{}' in object {} refers to every element of {}; compute it with an apply and test the result",
                stmt.text(),
                block.name,
                object
            ),
        )),
        None => Ok(()),
    }
}

/// `apply f(args) result` inside a collection block
fn compute(
    block: &Block,
    source: &str,
    stmt: &Statement,
    locals: &[String],
    ctx: &CompilationContext<'_>,
) -> Result<FilterStep> {
    let (call, result) = split_result(&stmt.operand).ok_or_else(|| {
        CompileError::semantic(
            stmt.line,
            format!(
                "'{}' in object {}: perhaps you're missing a return value",
                stmt.text(),
                block.name
            ),
        )
    })?;

    let function = call.split('(').next().unwrap_or_default().trim();
    if !ctx.registry.is_declared(BlockKind::Function, function) {
        return Err(CompileError::semantic(
            stmt.line,
            format!(
                "object {} applies {}; please use a function block to declare function {}",
                block.name, function, function
            ),
        ));
    }
    let info = ctx.function(function).ok_or_else(|| {
        CompileError::semantic(
            stmt.line,
            format!(
                "object {} uses the function {}, but the latter may not have been defined",
                block.name, function
            ),
        )
    })?;

    let call_stmt = Statement::new(Keyword::Apply, call, stmt.line);
    let loop_object = implicit_loop(&call_stmt, &ctx.registry, &[source, block.name.as_str()])?;
    let call = ExpressionRewriter::new(&ctx.registry, RewriteContext::Apply)
        .with_source(source)
        .with_loop_object(loop_object.as_deref())
        .with_loop_results(locals.iter().cloned())
        .rewrite(call);

    if let Some(object) = &loop_object {
        debug!(object = %block.name, result, loop_object = %object, "implicit loop");
    }

    Ok(FilterStep::Compute {
        result: result.to_string(),
        value_type: info.signature.return_type.clone(),
        call,
        implicit_loop: loop_object,
    })
}

/// `f(a, b) r` -> (`f(a, b)`, `r`)
fn split_result(operand: &str) -> Option<(&str, &str)> {
    let close = operand.rfind(')')?;
    let (call, rest) = operand.split_at(close + 1);
    let result = rest.trim();
    let valid = !result.is_empty()
        && result.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !result.starts_with(|c: char| c.is_ascii_digit())
        && call.contains('(');
    valid.then(|| (call.trim(), result))
}

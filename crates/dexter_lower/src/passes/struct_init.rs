//! Struct locals are references on the target, so every mutable struct local
//! that is read gets a default instance before the first statement.

use std::collections::BTreeSet;

use dexter_ast::{visit, AstCode, MethodBody, Node, VariableId};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::SourceLocation;

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::after_base_constructor;
use crate::passes::structs::struct_default;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let read: BTreeSet<VariableId> = visit::expressions(body, |e| e.is(AstCode::Ldloc) || e.is(AstCode::Ldloca))
    .into_iter()
    .filter_map(|id| body.expr(id).operand.as_variable())
    .collect();

  let mut prologue = Vec::new();
  for variable in read {
    let var = body.variable(variable);
    if var.is_parameter() || var.is_this() {
      continue;
    }
    let ty = var.ty.clone();
    if !ctx.types.is_struct(&ty) || ctx.types.is_immutable_struct(&ty) {
      continue;
    }

    let location = SourceLocation::NONE;
    let value = struct_default(body, ctx, &ty, location)?;
    prologue.push(build::stloc(body, location, variable, value));
    trace_dbg!(ctx, DebugTrace::Struct, "default instance for local {}", body.variable(variable).name);
  }

  if !prologue.is_empty() {
    let at = after_base_constructor(body, ctx);
    body.root.body.splice(at..at, prologue.into_iter().map(Node::Expr));
  }
  Ok(())
}

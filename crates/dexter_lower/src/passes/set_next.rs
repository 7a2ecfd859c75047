//! Debugger "restart from the beginning" scaffolding.
//!
//! The debugger sets `$restart` and moves the instruction pointer onto the
//! nearest guard, which branches back to `$restart_target`. Guards sit only
//! between top-level statements, never inside protected regions or switch
//! bodies.

use dexter_ast::{AstCode, ExprId, MethodBody, Node, Operand, VariableId};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::{SourceLocation, TypeRef};

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::after_base_constructor;

pub const RESTART_VARIABLE: &str = "$restart";
pub const RESTART_LABEL: &str = "$restart_target";

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let location = SourceLocation::NONE;
  let flag = body.new_temporary(RESTART_VARIABLE, TypeRef::bool());
  let label = body.new_label(RESTART_LABEL);
  let start = after_base_constructor(body, ctx);

  let existing = body.root.body.split_off(start);
  let mut guarded = Vec::with_capacity(existing.len() * 2 + 3);

  let clear = clear_flag(body, flag);
  guarded.push(Node::Expr(clear));
  guarded.push(Node::Label(label));
  let reset = clear_flag(body, flag);
  guarded.push(Node::Expr(reset));

  let mut guards = 0;
  for node in existing {
    let real = node.as_expr().is_some_and(|id| !body.expr(id).location.is_special());
    if real {
      let load = build::ldloc(body, location, flag);
      let guard = body.new_typed(location, AstCode::Brtrue, Operand::Label(label), vec![load], TypeRef::void());
      guarded.push(Node::Expr(guard));
      guards += 1;
    }
    guarded.push(node);
  }

  body.root.body.extend(guarded);
  trace_dbg!(ctx, DebugTrace::Pipeline, "{} restart guards in {}", guards, ctx.method_name());
  Ok(())
}

fn clear_flag(
  body: &mut MethodBody,
  flag: VariableId,
) -> ExprId {
  let location = SourceLocation::NONE;
  let zero = build::ldc_i4(body, location, 0);
  body.set_type(zero, TypeRef::bool());
  build::stloc(body, location, flag, zero)
}

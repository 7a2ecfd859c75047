//! Recognizes `x = x op y` on fields, statics and array elements.
//!
//! Locals are left alone: the target updates registers in place anyway.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;

use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let candidates = visit::expressions(body, |e| {
    matches!(e.code, AstCode::Stfld | AstCode::Stsfld) || e.code.is_stelem()
  });

  for id in candidates {
    let Some((load, operand, compound)) = match_store(body, ctx, id) else {
      continue;
    };

    let ty = result_type(body, ctx, load);
    body.rewrite(id, compound, Operand::None, vec![load, operand]);
    if let Some(ty) = ty {
      body.set_type(id, ty);
    }
    trace_dbg!(ctx, DebugTrace::Pipeline, "{} at {}", compound.name(), body.expr(id).location);
  }
  Ok(())
}

/// Load of the stored location, the other operand and the compound code.
fn match_store(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> Option<(ExprId, ExprId, AstCode)> {
  let store = body.expr(id);
  let (value, targets, load_code) = match store.code {
    AstCode::Stfld => (store.arg(1)?, &store.arguments[..1], AstCode::Ldfld),
    AstCode::Stsfld => (store.arg(0)?, &store.arguments[..0], AstCode::Ldsfld),
    code if code.is_stelem() => (store.arg(2)?, &store.arguments[..2], AstCode::LdelemAny),
    _ => return None,
  };

  let stored_type = match store.code {
    AstCode::Stfld | AstCode::Stsfld => store.operand.as_field()?.field_type().clone(),
    _ => result_type(body, ctx, store.arg(0)?)?.element_type()?.clone(),
  };
  if ctx.types.is_enum(&stored_type) {
    return None;
  }

  let op = body.expr(value);
  let compound = op.code.compound()?;
  if op.arguments.len() != 2 {
    return None;
  }

  let is_load = |candidate: ExprId| {
    let load = body.expr(candidate);
    let code_matches = if load_code == AstCode::LdelemAny {
      load.code.is_ldelem()
    } else {
      load.code == load_code
    };
    code_matches
      && load.operand == store.operand
      && load.arguments.len() == targets.len()
      && load
        .arguments
        .iter()
        .zip(targets)
        .all(|(&a, &b)| body.same_tree(a, b) && body.is_side_effect_free(a))
  };

  let (left, right) = (op.arguments[0], op.arguments[1]);
  if is_load(left) {
    Some((left, right, compound))
  } else if op.code.is_commutative() && is_load(right) {
    Some((right, left, compound))
  } else {
    None
  }
}

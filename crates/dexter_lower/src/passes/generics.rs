//! Generic parameters are erased to `Object` on the target.

use dexter_ast::{visit, AstCode, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::TypeRef;

use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let nodes = visit::expressions(body, |e| {
    matches!(
      e.code,
      AstCode::UnboxAny | AstCode::Box | AstCode::Castclass | AstCode::LdelemAny | AstCode::StelemAny
    )
  });

  for id in nodes {
    let code = body.code(id);
    let operand_type = body.expr(id).operand.as_type().cloned();
    let generic = operand_type.as_ref().is_some_and(TypeRef::is_generic_parameter);
    let location = body.expr(id).location;

    match code {
      AstCode::UnboxAny if generic => {
        body.expr_mut(id).code = AstCode::UnboxFromGeneric;
        trace_dbg!(ctx, DebugTrace::Generics, "unbox from generic at {}", location);
      },
      AstCode::Box | AstCode::Castclass if generic => {
        let Some(value) = body.expr(id).arg(0) else {
          continue;
        };
        body.copy_from(id, value);
        trace_dbg!(ctx, DebugTrace::Generics, "{} of generic parameter dropped at {}", code.name(), location);
      },
      AstCode::LdelemAny | AstCode::StelemAny => {
        let array = body.arg(id, 0);
        let element = operand_type
          .or_else(|| result_type(body, ctx, array).and_then(|a| a.element_type().cloned()))
          .unwrap_or_else(|| ctx.types.object());
        let element = if element.is_generic_parameter() {
          ctx.types.object()
        } else {
          element
        };
        let specific = if code == AstCode::LdelemAny {
          AstCode::ldelem_for(&element)
        } else {
          AstCode::stelem_for(&element)
        };
        let expr = body.expr_mut(id);
        expr.code = specific;
        expr.operand = Operand::None;
        trace_dbg!(ctx, DebugTrace::Generics, "{} as {} at {}", code.name(), specific.name(), location);
      },
      _ => {},
    }
  }
  Ok(())
}

use dexter_ast::{visit, AstCode, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;

use crate::context::LoweringContext;
use crate::error::LoweringResult;

/// `call Type::GetTypeFromHandle(ldtoken T)` becomes `typeof[T]`.
pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let types = ctx.types;

  for id in visit::expressions(body, |e| e.is(AstCode::Call)) {
    let expr = body.expr(id);
    let from_handle = expr
      .operand
      .as_method()
      .is_some_and(|m| m.name() == "GetTypeFromHandle" && types.is_system_type(m.declaring_type()));
    if !from_handle || expr.arguments.len() != 1 {
      continue;
    }

    let token = body.expr(expr.arguments[0]);
    let Some(ty) = token.operand.as_type().filter(|_| token.is(AstCode::Ldtoken)).cloned() else {
      continue;
    };

    trace_dbg!(ctx, DebugTrace::Generics, "typeof({}) at {}", types.type_name(&ty), expr.location);
    body.rewrite(id, AstCode::TypeOf, Operand::Type(ty), Vec::new());
    body.set_type(id, types.system_type());
  }
  Ok(())
}

//! `newobj D::.ctor(target, ldftn m)` into a single `Delegate` node.

use dexter_ast::{visit, AstCode, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::trace_dbg;

use crate::context::LoweringContext;
use crate::error::LoweringResult;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for id in visit::expressions(body, |e| e.is(AstCode::Newobj) && e.arguments.len() == 2) {
    let Some(ctor) = body.expr(id).operand.as_method() else {
      continue;
    };
    let delegate_type = ctor.declaring_type().clone();
    if !ctx.types.is_delegate(&delegate_type) {
      continue;
    }
    let (target, pointer) = (body.arg(id, 0), body.arg(id, 1));
    if !matches!(body.code(pointer), AstCode::Ldftn | AstCode::Ldvirtftn) {
      continue;
    }
    let Some(method) = body.expr(pointer).operand.as_method().cloned() else {
      continue;
    };
    if ctx.types.resolve_method(&method).is_none() {
      return Err(ctx.error_at(
        body,
        id,
        DiagnosticMessage::UnresolvableMethod {
          method: format!("{}::{}", ctx.type_name(method.declaring_type()), method.name()),
        },
      ));
    }

    // Static targets are bound to `ldnull`.
    let arguments = if body.code(target) == AstCode::Ldnull {
      Vec::new()
    } else {
      vec![target]
    };
    trace_dbg!(ctx, DebugTrace::Pipeline, "delegate {} to {}", ctx.type_name(&delegate_type), method.name());
    body.rewrite(
      id,
      AstCode::Delegate,
      Operand::Delegate {
        delegate_type: delegate_type.clone(),
        method,
      },
      arguments,
    );
    body.set_type(id, delegate_type);
  }
  Ok(())
}

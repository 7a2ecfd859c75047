//! Pointer-sized handles are plain object references on the target.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_type::{PrimitiveType, TypeRef};

use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

fn is_handle(ty: &TypeRef) -> bool {
  ty.as_primitive().is_some_and(PrimitiveType::is_handle)
}

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for id in visit::expressions(body, |_| true) {
    let expr = body.expr(id);
    match expr.code {
      AstCode::Ldsfld => {
        let zero = expr
          .operand
          .as_field()
          .is_some_and(|f| f.name() == "Zero" && is_handle(f.declaring_type()));
        if zero {
          to_null(body, id);
        }
      },
      AstCode::DefaultValue => {
        if expr.operand.as_type().is_some_and(is_handle) {
          to_null(body, id);
        }
      },
      AstCode::Call => {
        let Some(method) = expr.operand.as_method() else {
          continue;
        };
        if !is_handle(method.declaring_type()) || expr.arguments.len() != 2 {
          continue;
        }
        let code = match method.name() {
          "op_Equality" => AstCode::Ceq,
          "op_Inequality" => AstCode::Cne,
          _ => continue,
        };
        let args = expr.arguments.clone();
        body.rewrite(id, code, Operand::None, args);
        body.set_type(id, TypeRef::bool());
      },
      AstCode::ConvI | AstCode::ConvU => {
        let arg = body.arg(id, 0);
        if result_type(body, ctx, arg).is_some_and(|ty| ty.is_dex_object()) {
          body.copy_from(id, arg);
        }
      },
      _ => {},
    }
  }
  Ok(())
}

fn to_null(
  body: &mut MethodBody,
  id: ExprId,
) {
  let ty = body
    .expr(id)
    .type_hint()
    .cloned()
    .unwrap_or_else(|| TypeRef::primitive(PrimitiveType::IntPtr));
  body.rewrite(id, AstCode::Ldnull, Operand::None, Vec::new());
  body.set_type(id, ty);
}

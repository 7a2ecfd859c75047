//! Peepholes over the conversions enum lowering leaves behind.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
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
  let nodes: Vec<ExprId> = visit::expressions(body, |_| true).into_iter().rev().collect();

  for id in nodes {
    match body.code(id) {
      AstCode::EnumToInt | AstCode::EnumToLong => collapse_round_trip(body, ctx, id),
      AstCode::ConvI4 | AstCode::ConvI8 => drop_redundant_conversion(body, ctx, id),
      AstCode::Ceq | AstCode::Cne => harmonize_widths(body, ctx, id),
      _ => {},
    }
  }
  Ok(())
}

fn is_wide_code(code: AstCode) -> bool {
  matches!(code, AstCode::EnumToLong | AstCode::LongToEnum)
}

/// `EnumToX(XToEnum(x))` and `EnumToX(ldsfld constant)`.
fn collapse_round_trip(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  let Some(inner) = body.expr(id).arg(0) else {
    return;
  };
  let wide = is_wide_code(body.code(id));
  let location = body.expr(id).location;

  match body.code(inner) {
    AstCode::IntToEnum | AstCode::LongToEnum => {
      let Some(value) = body.expr(inner).arg(0) else {
        return;
      };
      if is_wide_code(body.code(inner)) == wide {
        body.copy_from(id, value);
      } else {
        let (code, ty) = if wide {
          (AstCode::ConvI8, TypeRef::int64())
        } else {
          (AstCode::ConvI4, TypeRef::int32())
        };
        body.rewrite(id, code, Operand::None, vec![value]);
        body.set_type(id, ty);
      }
      trace_dbg!(ctx, DebugTrace::Enum, "enum round trip removed at {}", location);
    },
    AstCode::Ldsfld => {
      let constant = body
        .expr(inner)
        .operand
        .as_field()
        .and_then(|f| ctx.types.resolve_field(f))
        .filter(|f| f.is_literal())
        .and_then(|f| f.constant)
        .and_then(|c| c.as_int());
      let Some(value) = constant else {
        return;
      };
      if wide {
        body.rewrite(id, AstCode::LdcI8, Operand::Long(value), Vec::new());
        body.set_type(id, TypeRef::int64());
      } else {
        body.rewrite(id, AstCode::LdcI4, Operand::Int(value as i32), Vec::new());
        body.set_type(id, TypeRef::int32());
      }
      trace_dbg!(ctx, DebugTrace::Enum, "enum constant {} folded at {}", value, location);
    },
    _ => {},
  }
}

/// `ConvI4(EnumToInt x)` and `ConvI8(EnumToLong x)` keep only the enum conversion.
fn drop_redundant_conversion(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  let Some(inner) = body.expr(id).arg(0) else {
    return;
  };
  let redundant = matches!(
    (body.code(id), body.code(inner)),
    (AstCode::ConvI4, AstCode::EnumToInt) | (AstCode::ConvI8, AstCode::EnumToLong)
  );
  if redundant {
    let location = body.expr(id).location;
    body.copy_from(id, inner);
    trace_dbg!(ctx, DebugTrace::Enum, "redundant conversion dropped at {}", location);
  }
}

/// In `ceq`/`cne` the 32-bit side of a mixed comparison is widened.
fn harmonize_widths(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  if body.args(id).len() != 2 {
    return;
  }
  let (left, right) = (body.arg(id, 0), body.arg(id, 1));
  let involves_enum = |code: AstCode| matches!(code, AstCode::EnumToInt | AstCode::EnumToLong);
  if !involves_enum(body.code(left)) && !involves_enum(body.code(right)) {
    return;
  }

  let width = |id: ExprId| result_type(body, ctx, id).and_then(|ty| ty.as_primitive());
  let narrow = match (width(left), width(right)) {
    (Some(l), Some(r)) if l.is_wide() && !r.is_wide() && r.is_integer() => right,
    (Some(l), Some(r)) if r.is_wide() && !l.is_wide() && l.is_integer() => left,
    _ => return,
  };

  if let Some(value) = body.int_constant(narrow) {
    body.rewrite(narrow, AstCode::LdcI8, Operand::Long(value), Vec::new());
    body.set_type(narrow, TypeRef::int64());
  } else {
    body.wrap(narrow, AstCode::ConvI8, Operand::None, TypeRef::int64());
  }
  trace_dbg!(ctx, DebugTrace::Enum, "comparison widened at {}", body.expr(id).location);
}
